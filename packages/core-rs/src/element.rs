use num_traits::Float;
use std::fmt::Debug;

/// Floating-point scalar accepted by every kernel in this crate.
pub trait Element: Float + Debug + Send + Sync + 'static {
    /// Veltkamp splitting factor `2^ceil(p/2) + 1` for a `p`-bit significand.
    const SPLIT_FACTOR: Self;
    const NAME: &'static str;
}

macro_rules! impl_element {
    ($t:ty, $split:expr, $name:expr) => {
        impl Element for $t {
            const SPLIT_FACTOR: Self = $split;
            const NAME: &'static str = $name;
        }
    };
}

impl_element!(f32, 4_097.0, "float32");
impl_element!(f64, 134_217_729.0, "float64");
