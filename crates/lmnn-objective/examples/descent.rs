use lmnn_objective::{LmnnConfig, LmnnFunction, SeparableObjective, SquaredEuclidean};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Three classes on a 3-feature grid. The third feature is pure noise with
    // a large spread, so plain Euclidean neighbors mix the classes.
    let mut rng = StdRng::seed_from_u64(42);
    let per_class = 20;
    let centers = [[0.0, 0.0], [2.0, 0.0], [1.0, 2.0]];
    let n = per_class * centers.len();

    let mut dataset = Array2::<f64>::zeros((3, n));
    let mut labels = Array1::<usize>::zeros(n);
    for (class, center) in centers.iter().enumerate() {
        for p in 0..per_class {
            let i = class * per_class + p;
            dataset[[0, i]] = center[0] + rng.gen_range(-0.4..0.4);
            dataset[[1, i]] = center[1] + rng.gen_range(-0.4..0.4);
            dataset[[2, i]] = rng.gen_range(-5.0..5.0);
            labels[i] = class;
        }
    }

    println!("Synthetic dataset shape: {:?}", dataset.shape());

    let config = LmnnConfig::new(3, 0.5, 5).with_seed(7);
    let mut lmnn = LmnnFunction::new(dataset, labels, &config, SquaredEuclidean)?;

    let mut transformation = lmnn.initial_point();
    let step = 1e-3;
    let batch_size = 10;

    for epoch in 0..30 {
        lmnn.shuffle()?;
        let mut epoch_cost = 0.0;
        for begin in (0..lmnn.num_functions()).step_by(batch_size) {
            let size = batch_size.min(lmnn.num_functions() - begin);
            let (cost, gradient) = lmnn.evaluate_with_gradient_batch(&transformation, begin, size)?;
            epoch_cost += cost;
            transformation = transformation - gradient * step;
        }
        if epoch % 5 == 0 {
            println!("epoch {:>3}: summed batch cost = {:.4}", epoch, epoch_cost);
        }
    }

    let final_cost = lmnn.evaluate(&transformation)?;
    println!("Final cost = {:.4}", final_cost);
    println!("Learned transformation:\n{:.3}", transformation);
    println!("Triplet cache cells in use: {}", lmnn.eval_cache().filled());

    Ok(())
}
