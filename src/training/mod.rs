pub mod callback;
pub mod embedding;
pub mod gradients;
pub mod optimiser;
pub mod sampler;
pub mod schedule;

use num_traits::{Float, FromPrimitive};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{LayoutError, Result};
use crate::training::callback::EpochCallback;
use crate::training::sampler::epoch_seed;

/////////////
// Globals //
/////////////

/// Epoch budget for graphs with up to [`SMALL_GRAPH_LIMIT`] vertices
pub const SMALL_GRAPH_EPOCHS: usize = 500;
/// Epoch budget for larger graphs
pub const LARGE_GRAPH_EPOCHS: usize = 200;
/// Vertex count up to which a graph counts as small
pub const SMALL_GRAPH_LIMIT: usize = 10_000;

/// Default negative samples per positive sample
const NEG_SAMPLE_RATE: usize = 5;

//////////////////////////
// Structures and Enums //
//////////////////////////

/// Where the per-epoch negative sampling seeds come from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SeedPolicy {
    /// Fresh wall-clock derived seed every epoch
    #[default]
    Clock,
    /// Reproducible seeds derived from a fixed run seed
    Fixed(u64),
}

impl SeedPolicy {
    /// Seed to use for `epoch`
    ///
    /// ### Params
    ///
    /// * `epoch` - Current epoch
    ///
    /// ### Returns
    ///
    /// The seed handed to the batch optimiser
    pub fn seed_for_epoch(&self, epoch: usize) -> u64 {
        match self {
            SeedPolicy::Fixed(seed) => epoch_seed(*seed, epoch),
            SeedPolicy::Clock => {
                let micros = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_micros() as u64)
                    .unwrap_or(0);
                epoch_seed(micros, epoch)
            }
        }
    }
}

/// Layout optimisation parameters
///
/// ### Fields
///
/// * `n_components` - Dimensionality of the embedding
/// * `a` - Curve parameter a (~1.58 for `min_dist = 0.1`, `spread = 1.0`)
/// * `b` - Curve parameter b (~0.9 for `min_dist = 0.1`, `spread = 1.0`)
/// * `initial_alpha` - Initial learning rate (typically 1.0)
/// * `gamma` - Repulsion strength
/// * `negative_sample_rate` - Number of negative samples per positive sample
///   (typically 5)
/// * `n_epochs` - Number of optimisation epochs, `0` picks 500 for graphs up
///   to 10,000 vertices and 200 above
/// * `seed` - Seed policy for the negative sampling
/// * `n_threads` - Optional size of the worker pool. `None` uses the rayon
///   default.
/// * `verbose` - Controls verbosity
/// * `callback` - Optional hook called with the head embedding after every
///   epoch
#[derive(Clone)]
pub struct LayoutParams<T> {
    pub n_components: usize,
    pub a: T,
    pub b: T,
    pub initial_alpha: T,
    pub gamma: T,
    pub negative_sample_rate: usize,
    pub n_epochs: usize,
    pub seed: SeedPolicy,
    pub n_threads: Option<usize>,
    pub verbose: bool,
    pub callback: Option<Arc<dyn EpochCallback<T>>>,
}

impl<T> LayoutParams<T>
where
    T: Float + FromPrimitive,
{
    /// Default parameters for 2D embedding
    ///
    /// ### Returns
    ///
    /// Self with the curve of `min_dist = 0.1` and `spread = 1.0`, automatic
    /// epoch budget and clock seeding.
    pub fn default_2d() -> Self {
        Self {
            n_components: 2,
            a: T::from_f64(1.577).unwrap(),
            b: T::from_f64(0.8951).unwrap(),
            initial_alpha: T::one(),
            gamma: T::one(),
            negative_sample_rate: NEG_SAMPLE_RATE,
            n_epochs: 0,
            seed: SeedPolicy::Clock,
            n_threads: None,
            verbose: false,
            callback: None,
        }
    }

    /// Params from specified minimum distance and spread
    ///
    /// ### Params
    ///
    /// * `min_dist` - Minimum distance parameter
    /// * `spread` - Effective scale of embedded points
    /// * `n_components` - Dimensionality. Defaults to `2`.
    /// * `initial_alpha` - Initial learning rate. Defaults to `1.0`.
    /// * `gamma` - Repulsion strength. Defaults to `1.0`.
    /// * `n_epochs` - Number of epochs. Defaults to `0` (automatic).
    /// * `negative_sample_rate` - Negative samples per positive sample.
    ///   Defaults to `5`.
    ///
    /// ### Return
    ///
    /// Self with `a` and `b` fitted to the requested curve
    pub fn from_min_dist_spread(
        min_dist: T,
        spread: T,
        n_components: Option<usize>,
        initial_alpha: Option<T>,
        gamma: Option<T>,
        n_epochs: Option<usize>,
        negative_sample_rate: Option<usize>,
    ) -> Self {
        let (a, b) = Self::fit_params(min_dist, spread, None);

        Self {
            n_components: n_components.unwrap_or(2),
            a,
            b,
            initial_alpha: initial_alpha.unwrap_or(T::one()),
            gamma: gamma.unwrap_or(T::one()),
            negative_sample_rate: negative_sample_rate.unwrap_or(NEG_SAMPLE_RATE),
            n_epochs: n_epochs.unwrap_or(0),
            ..Self::default_2d()
        }
    }

    /// Use a fixed seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = SeedPolicy::Fixed(seed);
        self
    }

    /// Attach an epoch callback
    pub fn with_callback(mut self, callback: Arc<dyn EpochCallback<T>>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Fit curve parameters from min_dist and spread
    ///
    /// Fits `f(x) = 1 / (1 + a * x^(2b))` such that `f(x) ca. 1.0` below
    /// `min_dist` and decays like `exp(-(x - min_dist) / spread)` above it.
    ///
    /// ### Params
    ///
    /// * `min_dist` - Minimum distance parameter
    /// * `spread` - Effective scale of embedded points
    /// * `n_iter` - Number of gradient descent iterations (default: 300)
    ///
    /// ### Returns
    ///
    /// Tuple of `(a, b)`
    pub fn fit_params(min_dist: T, spread: T, n_iter: Option<usize>) -> (T, T) {
        let n_iter = n_iter.unwrap_or(300);
        let n_points = 300;

        let three = T::from_f64(3.0).unwrap();
        let max_x = spread * three;
        let step = max_x / T::from_usize(n_points - 1).unwrap();

        let (xv, yv): (Vec<T>, Vec<T>) = (0..n_points)
            .map(|i| {
                let x = step * T::from_usize(i).unwrap();
                let y = if x < min_dist {
                    T::one()
                } else {
                    (-(x - min_dist) / spread).exp()
                };
                (x, y)
            })
            .unzip();

        let mut a = T::one();
        let mut b = T::one();
        let two = T::from_f64(2.0).unwrap();
        let n_points_t = T::from_usize(n_points).unwrap();

        for _ in 0..n_iter {
            let mut grad_a = T::zero();
            let mut grad_b = T::zero();

            for (&x, &y_target) in xv.iter().zip(&yv) {
                if x <= T::zero() {
                    continue;
                }

                let x_2b = x.powf(two * b);
                let denom = T::one() + a * x_2b;
                let err = T::one() / denom - y_target;

                grad_a = grad_a + err * (-x_2b / (denom * denom));
                grad_b = grad_b + err * (-two * a * x_2b * x.ln() / (denom * denom));
            }

            a = a - grad_a / n_points_t;
            b = b - grad_b / n_points_t;

            a = a
                .max(T::from_f64(0.001).unwrap())
                .min(T::from_f64(10.0).unwrap());
            b = b
                .max(T::from_f64(0.1).unwrap())
                .min(T::from_f64(2.0).unwrap());
        }

        (a, b)
    }

    /// Check the parameters for values the optimiser cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.n_components == 0 {
            return Err(LayoutError::InvalidParameter(
                "n_components must be larger than 0".into(),
            ));
        }
        if self.negative_sample_rate == 0 {
            return Err(LayoutError::InvalidParameter(
                "negative_sample_rate must be larger than 0".into(),
            ));
        }
        if !(self.a > T::zero() && self.a.is_finite()) || !(self.b > T::zero() && self.b.is_finite())
        {
            return Err(LayoutError::InvalidParameter(
                "curve parameters a and b must be positive and finite".into(),
            ));
        }
        if !(self.initial_alpha >= T::zero() && self.initial_alpha.is_finite()) {
            return Err(LayoutError::InvalidParameter(
                "initial_alpha must be non-negative and finite".into(),
            ));
        }
        if !(self.gamma >= T::zero() && self.gamma.is_finite()) {
            return Err(LayoutError::InvalidParameter(
                "gamma must be non-negative and finite".into(),
            ));
        }
        if self.n_threads == Some(0) {
            return Err(LayoutError::InvalidParameter(
                "n_threads must be larger than 0".into(),
            ));
        }
        Ok(())
    }
}

impl<T> LayoutParams<T> {
    /// Epoch budget for a graph with `n_vertices` vertices
    ///
    /// Returns `n_epochs` if set, otherwise 500 for up to 10,000 vertices
    /// and 200 for larger graphs.
    pub fn resolve_n_epochs(&self, n_vertices: usize) -> usize {
        if self.n_epochs > 0 {
            self.n_epochs
        } else if n_vertices <= SMALL_GRAPH_LIMIT {
            SMALL_GRAPH_EPOCHS
        } else {
            LARGE_GRAPH_EPOCHS
        }
    }
}

impl<T> Default for LayoutParams<T>
where
    T: Float + FromPrimitive,
{
    /// Returns sensible defaults for the optimiser (assuming 2D)
    fn default() -> Self {
        LayoutParams::default_2d()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for LayoutParams<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutParams")
            .field("n_components", &self.n_components)
            .field("a", &self.a)
            .field("b", &self.b)
            .field("initial_alpha", &self.initial_alpha)
            .field("gamma", &self.gamma)
            .field("negative_sample_rate", &self.negative_sample_rate)
            .field("n_epochs", &self.n_epochs)
            .field("seed", &self.seed)
            .field("n_threads", &self.n_threads)
            .field("verbose", &self.verbose)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

///////////
// Tests //
///////////
