use accu_rs_core::{cond_dot, dot_kfold, dot_kfold_1d, fdot_1d, kdot_1d, naive_layer, Element};
use ndarray::{array, Axis};

fn main() {
    // x.y = 1e16 + 1 - 1e16 + 1 with every product exact.
    let x = array![1.0e16_f64, 1.0, -1.0e16, 1.0];
    let y = array![1.0_f64, 1.0, 1.0, 1.0];

    let tensor = dot_kfold_1d(x.view(), y.view()).expect("error tensor");
    println!("error tensor ({}):\n{tensor}", f64::NAME);

    let naive = x.dot(&y);
    println!("naive       : {naive}");
    for folds in 1..=3 {
        let value = kdot_1d(x.view(), y.view(), folds).expect("kdot");
        println!("kdot K={folds}    : {value}");
    }
    println!("fdot        : {}", fdot_1d(x.view(), y.view()).expect("fdot"));
    println!("cond        : {:e}", cond_dot(x.view(), y.view()).expect("cond"));

    let matrix_tensor = dot_kfold(
        x.view().insert_axis(Axis(0)),
        y.view().insert_axis(Axis(1)),
    )
    .expect("matrix error tensor");
    let layer = naive_layer(&matrix_tensor).expect("naive layer");
    println!("naive layer : {layer}");
}
