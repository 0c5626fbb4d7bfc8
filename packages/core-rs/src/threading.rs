use std::env;
use std::sync::OnceLock;

const THREAD_ENV: &str = "ACCU_CPU_THREADS";
const DISABLE_ENV: &str = "ACCU_DISABLE_PARALLEL";
const MIN_ROWS_ENV: &str = "ACCU_PARALLEL_MIN_ROWS";
const MIN_FLOPS_ENV: &str = "ACCU_PARALLEL_MIN_FLOPS";

const DEFAULT_MIN_ROWS: usize = 4;
const DEFAULT_MIN_FLOPS: usize = 64 * 64 * 64;

static THREAD_OVERRIDE: OnceLock<Option<usize>> = OnceLock::new();
static DISABLE_PARALLEL: OnceLock<bool> = OnceLock::new();
static MIN_ROWS: OnceLock<usize> = OnceLock::new();
static MIN_FLOPS: OnceLock<usize> = OnceLock::new();

fn parse_threads(raw: Option<&str>) -> Option<usize> {
    match raw.map(str::trim) {
        None | Some("") => None,
        Some(value) => match value.parse::<usize>() {
            Ok(0) | Err(_) => None,
            Ok(n) => Some(n),
        },
    }
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|value| value.trim().to_ascii_lowercase()),
        Some(ref value) if value == "1" || value == "true" || value == "yes"
    )
}

fn parse_threshold(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|&value| value > 0)
        .unwrap_or(default)
}

/// Worker count requested through `ACCU_CPU_THREADS`, if any.
pub fn thread_override() -> Option<usize> {
    *THREAD_OVERRIDE.get_or_init(|| parse_threads(env::var(THREAD_ENV).ok().as_deref()))
}

pub fn parallel_disabled() -> bool {
    *DISABLE_PARALLEL.get_or_init(|| parse_flag(env::var(DISABLE_ENV).ok().as_deref()))
}

fn min_rows_threshold() -> usize {
    *MIN_ROWS.get_or_init(|| {
        parse_threshold(env::var(MIN_ROWS_ENV).ok().as_deref(), DEFAULT_MIN_ROWS)
    })
}

fn min_flops_threshold() -> usize {
    *MIN_FLOPS.get_or_init(|| {
        parse_threshold(env::var(MIN_FLOPS_ENV).ok().as_deref(), DEFAULT_MIN_FLOPS)
    })
}

/// Whether a K-fold product with an `m x n` left and `n x p` right operand
/// is worth splitting across threads. Always false without the `parallel`
/// feature.
pub fn should_parallelize(m: usize, n: usize, p: usize) -> bool {
    if !cfg!(feature = "parallel") || parallel_disabled() {
        return false;
    }
    let flops = m.saturating_mul(n).saturating_mul(p);
    m >= min_rows_threshold() && flops >= min_flops_threshold()
}

#[cfg(feature = "parallel")]
use std::sync::Once;

#[cfg(feature = "parallel")]
static INIT_RAYON: Once = Once::new();

#[cfg(feature = "parallel")]
pub fn ensure_rayon_pool() {
    use rayon::ThreadPoolBuilder;
    INIT_RAYON.call_once(|| {
        let builder = match thread_override() {
            Some(threads) => ThreadPoolBuilder::new().num_threads(threads),
            None => ThreadPoolBuilder::new(),
        };
        // A host application may already own the global pool.
        if let Err(err) = builder.build_global() {
            tracing::debug!(%err, "keeping existing rayon global pool");
        }
    });
}

#[cfg(not(feature = "parallel"))]
pub fn ensure_rayon_pool() {}
