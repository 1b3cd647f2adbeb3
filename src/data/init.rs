use num_traits::{Float, FromPrimitive, ToPrimitive};
use rand::{
    rngs::StdRng,
    {Rng, SeedableRng},
};

/// Default half-width of the random initialisation box
pub const RANDOM_RANGE: f64 = 10.0;

/// Random uniform initialisation of a row-major embedding
///
/// Draws every coordinate uniformly from `[-range, range)`. The result is a
/// flat buffer of `n_samples * n_comp` values where point `i` occupies
/// `[i * n_comp, (i + 1) * n_comp)`.
///
/// ### Params
///
/// * `n_samples` - Number of samples to initialise
/// * `n_comp` - Dimensionality of the embedding
/// * `seed` - Random seed
/// * `range` - Optional half-width of the box. Defaults to `10.0`.
///
/// ### Returns
///
/// Flat, row-major embedding coordinates
pub fn random_layout<T>(n_samples: usize, n_comp: usize, seed: u64, range: Option<T>) -> Vec<T>
where
    T: Float + FromPrimitive + ToPrimitive,
{
    let range = range
        .and_then(|r| r.to_f64())
        .unwrap_or(RANDOM_RANGE);
    let mut rng = StdRng::seed_from_u64(seed);

    (0..n_samples * n_comp)
        .map(|_| T::from_f64(rng.random_range(-range..range)).unwrap_or_else(T::zero))
        .collect()
}
