use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Number of examples that go to validation: `ceil(n * ratio)`, but never so
/// many that training ends up empty.
pub fn validation_size(n: usize, ratio: f64) -> usize {
    if n < 2 || ratio <= 0.0 {
        return 0;
    }
    let wanted = (n as f64 * ratio).ceil() as usize;
    wanted.min(n - 1)
}

/// Seeded shuffle split into `(train, validation)`. The same seed, ratio and
/// input order always give the same partition.
pub fn train_val_split<T>(items: Vec<T>, ratio: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let n_val = validation_size(items.len(), ratio);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.shuffle(&mut rng);

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut take = |idx: &usize| slots[*idx].take();

    let val: Vec<T> = order[..n_val].iter().filter_map(&mut take).collect();
    let train: Vec<T> = order[n_val..].iter().filter_map(&mut take).collect();
    (train, val)
}
