use num_traits::{Float, FromPrimitive};
use rayon::prelude::*;

/// Epochs-per-sample value of an edge that never fires
pub const NEVER_SAMPLED: f64 = -1.0;

///////////////////////
// Epochs per sample //
///////////////////////

/// Number of epochs between two positive samples of every edge
///
/// With `w_max` the largest weight, edge `i` is sampled `n_epochs * w_i /
/// w_max` times over the whole run, i.e. once every `n_epochs / n_i` epochs.
/// The heaviest edge fires every epoch. Edges that would be sampled zero
/// times get [`NEVER_SAMPLED`].
///
/// ### Params
///
/// * `weights` - Edge weights of the (pruned) graph
/// * `n_epochs` - Total epoch budget
///
/// ### Returns
///
/// One epochs-per-sample value per edge
pub fn make_epochs_per_sample<T>(weights: &[T], n_epochs: usize) -> Vec<T>
where
    T: Float + FromPrimitive + Send + Sync,
{
    let max_weight = weights
        .iter()
        .copied()
        .fold(T::zero(), |acc, w| if w > acc { w } else { acc });
    let n_epochs_t = T::from_usize(n_epochs).unwrap();
    let never = T::from_f64(NEVER_SAMPLED).unwrap();

    weights
        .par_iter()
        .map(|&w| {
            let n_samples = n_epochs_t * (w / max_weight);
            // NaN (all-zero weights) compares false and ends up as sentinel
            if n_samples > T::zero() {
                n_epochs_t / n_samples
            } else {
                never
            }
        })
        .collect()
}

/// Learning rate of a given epoch
///
/// Linear decay: `initial_alpha * (1 - epoch / n_epochs)`.
#[inline]
pub fn learning_rate<T>(initial_alpha: T, epoch: usize, n_epochs: usize) -> T
where
    T: Float + FromPrimitive,
{
    if n_epochs == 0 {
        return initial_alpha;
    }
    let frac = T::from_usize(epoch).unwrap() / T::from_usize(n_epochs).unwrap();
    initial_alpha * (T::one() - frac)
}

////////////////////
// Edge schedules //
////////////////////

/// Mutable per-edge sampling state
///
/// ### Fields
///
/// * `next_sample` - Epoch at which the edge fires its next positive sample
/// * `next_negative_sample` - Epoch up to which negative samples were drawn
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeCounters<T> {
    pub next_sample: T,
    pub next_negative_sample: T,
}

/// Sampling schedule for all edges of one optimisation run
///
/// ### Fields
///
/// * `epochs_per_sample` - Static positive sampling cadence per edge
/// * `epochs_per_negative_sample` - Static negative sampling cadence per edge,
///   i.e. `epochs_per_sample / negative_sample_rate`
/// * `counters` - Mutable per-edge state, advanced by the optimiser
#[derive(Clone, Debug)]
pub struct EdgeSchedule<T> {
    pub epochs_per_sample: Vec<T>,
    pub epochs_per_negative_sample: Vec<T>,
    pub counters: Vec<EdgeCounters<T>>,
}

impl<T> EdgeSchedule<T>
where
    T: Float + FromPrimitive,
{
    /// Generate the schedule from the epochs-per-sample values
    ///
    /// ### Params
    ///
    /// * `epochs_per_sample` - Output of [`make_epochs_per_sample`]
    /// * `negative_sample_rate` - Negative samples per positive sample (> 0)
    ///
    /// ### Returns
    ///
    /// Initialised schedule; every counter starts at its own cadence.
    pub fn new(epochs_per_sample: Vec<T>, negative_sample_rate: usize) -> Self {
        let nsr = T::from_usize(negative_sample_rate.max(1)).unwrap();

        let epochs_per_negative_sample: Vec<T> =
            epochs_per_sample.iter().map(|&eps| eps / nsr).collect();

        let counters = epochs_per_sample
            .iter()
            .zip(&epochs_per_negative_sample)
            .map(|(&eps, &epns)| EdgeCounters {
                next_sample: eps,
                next_negative_sample: epns,
            })
            .collect();

        Self {
            epochs_per_sample,
            epochs_per_negative_sample,
            counters,
        }
    }

    /// Number of edges covered by the schedule
    pub fn len(&self) -> usize {
        self.epochs_per_sample.len()
    }

    /// Returns `true` if no edge is scheduled
    pub fn is_empty(&self) -> bool {
        self.epochs_per_sample.is_empty()
    }
}

/// Does an edge fire a positive sample in `epoch`
///
/// Edges carrying the [`NEVER_SAMPLED`] sentinel never fire.
#[inline(always)]
pub(crate) fn is_due<T: Float>(epochs_per_sample: T, counters: &EdgeCounters<T>, epoch: T) -> bool {
    epochs_per_sample > T::zero() && counters.next_sample <= epoch
}

/// Number of negative samples owed by an edge in `epoch`
///
/// `floor((epoch - next_negative_sample) / epochs_per_negative_sample)`,
/// never below zero. Catches up if the edge skipped several epochs.
#[inline(always)]
pub(crate) fn n_negative_samples<T: Float>(
    epochs_per_negative_sample: T,
    counters: &EdgeCounters<T>,
    epoch: T,
) -> usize {
    ((epoch - counters.next_negative_sample) / epochs_per_negative_sample)
        .floor()
        .to_usize()
        .unwrap_or(0)
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test_schedule {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_epochs_per_sample_proportional() {
        let eps = make_epochs_per_sample(&[1.0_f64, 0.5, 0.25, 0.0], 200);

        assert_relative_eq!(eps[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(eps[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(eps[2], 4.0, epsilon = 1e-12);
        assert_eq!(eps[3], -1.0);
    }

    #[test]
    fn test_epochs_per_sample_at_least_one() {
        let weights = [0.3_f32, 0.9, 0.01, 0.45, 0.9];
        let eps = make_epochs_per_sample(&weights, 50);

        for (&w, &e) in weights.iter().zip(&eps) {
            if w > 0.0 {
                assert!(e >= 1.0, "w = {}, eps = {}", w, e);
            }
        }
    }

    #[test]
    fn test_epochs_per_sample_all_zero_is_all_sentinel() {
        let eps = make_epochs_per_sample(&[0.0_f64, 0.0, 0.0], 100);
        assert!(eps.iter().all(|&e| e == NEVER_SAMPLED));
    }

    #[test]
    fn test_schedule_initialisation() {
        let sched = EdgeSchedule::new(vec![1.0_f64, 4.0], 5);

        assert_eq!(sched.len(), 2);
        assert_relative_eq!(sched.epochs_per_negative_sample[0], 0.2, epsilon = 1e-12);
        assert_relative_eq!(sched.epochs_per_negative_sample[1], 0.8, epsilon = 1e-12);
        assert_eq!(sched.counters[1].next_sample, 4.0);
        assert_relative_eq!(sched.counters[1].next_negative_sample, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_sentinel_never_due() {
        let sched = EdgeSchedule::new(vec![-1.0_f64, 1.0], 5);

        for epoch in 0..1000 {
            assert!(!is_due(sched.epochs_per_sample[0], &sched.counters[0], epoch as f64));
        }
        assert!(!is_due(sched.epochs_per_sample[1], &sched.counters[1], 0.0));
        assert!(is_due(sched.epochs_per_sample[1], &sched.counters[1], 1.0));
    }

    #[test]
    fn test_negative_sample_catch_up() {
        let counters = EdgeCounters {
            next_sample: 3.0_f64,
            next_negative_sample: 0.5,
        };

        // (3 - 0.5) / 0.5 = 5
        assert_eq!(n_negative_samples(0.5, &counters, 3.0), 5);
        // epoch before the counter never yields a negative count
        assert_eq!(n_negative_samples(0.5, &counters, 0.0), 0);
    }

    #[test]
    fn test_learning_rate_decay() {
        let n_epochs = 100;
        let mut prev = f64::INFINITY;
        for epoch in 0..=n_epochs {
            let alpha = learning_rate(1.0_f64, epoch, n_epochs);
            assert!(alpha <= prev);
            prev = alpha;
        }

        assert_eq!(learning_rate(1.0_f64, 0, n_epochs), 1.0);
        assert_relative_eq!(learning_rate(1.0_f64, n_epochs, n_epochs), 0.0, epsilon = 1e-12);
        assert_relative_eq!(learning_rate(0.5_f64, 50, n_epochs), 0.25, epsilon = 1e-12);
    }
}
