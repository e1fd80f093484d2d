use divan::Bencher;
use faer::sparse::Triplet;
use faer::Col;
use lp_presolve::{LpModel, Presolve, SilentHandler, E, PRESOLVE_INF};

/// Chain of equality rows `x_i + x_{i+1} = 2` with every fourth variable
/// fixed; keeps the doubleton and substitution machinery busy.
fn chain_lp(n: usize) -> LpModel {
    let mut triplets = Vec::with_capacity(2 * (n - 1));
    for i in 0..n - 1 {
        triplets.push(Triplet::new(i, i, 1.0));
        triplets.push(Triplet::new(i, i + 1, 1.0));
    }
    let lower = Col::from_fn(n, |j| if j % 4 == 0 { 1.0 } else { 0.0 });
    let upper = Col::from_fn(n, |j| if j % 4 == 0 { 1.0 } else { 10.0 });
    LpModel::try_from_triplets(
        n - 1,
        n,
        &triplets,
        Col::from_fn(n, |_| 1.0),
        Col::from_fn(n - 1, |_| 2.0),
        Col::from_fn(n - 1, |_| 2.0),
        lower,
        upper,
    )
    .unwrap()
}

/// Wide inequality rows with duplicate columns and forcing structure.
fn wide_lp(n: usize) -> LpModel {
    let mut triplets = Vec::new();
    for j in 0..n {
        triplets.push(Triplet::new(j / 8, j, 1.0 + ((j % 3) as E)));
    }
    let nrows = n / 8 + 1;
    LpModel::try_from_triplets(
        nrows,
        n,
        &triplets,
        Col::from_fn(n, |j| (j % 5) as E),
        Col::from_fn(nrows, |_| 0.0),
        Col::from_fn(nrows, |_| PRESOLVE_INF),
        Col::zeros(n),
        Col::from_fn(n, |_| 4.0),
    )
    .unwrap()
}

#[divan::bench(args = [128, 1024, 8192])]
fn presolve_chain(bencher: Bencher, n: usize) {
    bencher.with_inputs(|| chain_lp(n)).bench_values(|mut model| {
        let mut engine = Presolve::new(&mut model);
        engine.set_message_handler(Box::new(SilentHandler));
        engine.presolved_model(1e-8, true, 5).unwrap().is_some()
    });
}

#[divan::bench(args = [256, 2048])]
fn presolve_wide(bencher: Bencher, n: usize) {
    bencher.with_inputs(|| wide_lp(n)).bench_values(|mut model| {
        let mut engine = Presolve::new(&mut model);
        engine.set_message_handler(Box::new(SilentHandler));
        engine.presolved_model(1e-8, true, 5).unwrap().is_some()
    });
}

fn main() {
    divan::main();
}
