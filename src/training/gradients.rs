//! Distance and gradient model of the low-dimensional embedding.
//!
//! The embedding similarity curve is `1 / (1 + a * d^(2b))`; the functions
//! here are the coefficients of its cross-entropy gradient with respect to
//! the squared distance between two points.

use num_traits::{Float, FromPrimitive};

/// Gradient magnitude bound applied to every component update
pub const CLIP_VALUE: f64 = 4.0;
/// Offset in the repulsive denominator, keeps `d2 = 0` finite
pub const REPULSION_EPS: f64 = 0.001;

/////////////
// Helpers //
/////////////

#[inline(always)]
fn lit<T: FromPrimitive>(x: f64) -> T {
    T::from_f64(x).unwrap()
}

/// Squared Euclidean distance between two vectors
///
/// Takes the components as iterators so rows can be streamed straight out of
/// a shared embedding without copying them first.
///
/// ### Params
///
/// * `x` - Components of the first vector
/// * `y` - Components of the second vector (same length as `x`)
///
/// ### Returns
///
/// `sum_d (x_d - y_d)^2`
#[inline(always)]
pub fn squared_dist<T, I, J>(x: I, y: J) -> T
where
    T: Float,
    I: IntoIterator<Item = T>,
    J: IntoIterator<Item = T>,
{
    x.into_iter().zip(y).fold(T::zero(), |acc, (a, b)| {
        let diff = a - b;
        acc + diff * diff
    })
}

/// Clamp a value into `[lb, ub]`
#[inline(always)]
pub fn clip<T: Float>(val: T, lb: T, ub: T) -> T {
    if val > ub {
        ub
    } else if val < lb {
        lb
    } else {
        val
    }
}

/// Attractive gradient coefficient
///
/// `-2ab * d2^(b - 1) / (a * d2^b + 1)`. Only defined for `d2 > 0`; callers
/// treat `d2 == 0` as no force.
///
/// ### Params
///
/// * `dist_sq` - Squared distance between the two points
/// * `a` - Curve parameter a
/// * `b` - Curve parameter b
///
/// ### Returns
///
/// The (negative) coefficient to multiply each component difference with
#[inline(always)]
pub fn attractive_grad<T: Float + FromPrimitive>(dist_sq: T, a: T, b: T) -> T {
    let two: T = lit(2.0);
    let coeff = -two * a * b * dist_sq.powf(b - T::one());
    coeff / (a * dist_sq.powf(b) + T::one())
}

/// Repulsive gradient coefficient
///
/// `2 * gamma * b / ((0.001 + d2) * (a * d2^b + 1))`.
///
/// ### Params
///
/// * `dist_sq` - Squared distance between the point and its negative sample
/// * `gamma` - Repulsion strength
/// * `a` - Curve parameter a
/// * `b` - Curve parameter b
///
/// ### Returns
///
/// The (positive) coefficient to multiply each component difference with
#[inline(always)]
pub fn repulsive_grad<T: Float + FromPrimitive>(dist_sq: T, gamma: T, a: T, b: T) -> T {
    let two: T = lit(2.0);
    let coeff = two * gamma * b;
    coeff / ((lit::<T>(REPULSION_EPS) + dist_sq) * (a * dist_sq.powf(b) + T::one()))
}

/// Precomputed constants for one optimisation run
///
/// ### Fields
///
/// * `a` - The a parameter.
/// * `b` - The b parameter.
/// * `gamma` - The repulsion strength.
/// * `clip_val` - The clipping value, i.e., `4.0`.
#[derive(Clone, Copy, Debug)]
pub struct OptimConstants<T> {
    pub a: T,
    pub b: T,
    pub gamma: T,
    pub clip_val: T,
}

impl<T> OptimConstants<T>
where
    T: Float + FromPrimitive,
{
    /// Generate all of the constants
    ///
    /// ### Params
    ///
    /// * `a` - The a parameter
    /// * `b` - The b parameter
    /// * `gamma` - The repulsion parameter. Usually `1.0`.
    pub fn new(a: T, b: T, gamma: T) -> Self {
        Self {
            a,
            b,
            gamma,
            clip_val: lit(CLIP_VALUE),
        }
    }

    /// Attractive coefficient, zero for coincident points
    #[inline(always)]
    pub fn attractive(&self, dist_sq: T) -> T {
        if dist_sq > T::zero() {
            attractive_grad(dist_sq, self.a, self.b)
        } else {
            T::zero()
        }
    }

    /// Repulsive coefficient
    #[inline(always)]
    pub fn repulsive(&self, dist_sq: T) -> T {
        repulsive_grad(dist_sq, self.gamma, self.a, self.b)
    }

    /// Clip a component gradient into `[-4, 4]`
    #[inline(always)]
    pub fn clip(&self, val: T) -> T {
        clip(val, -self.clip_val, self.clip_val)
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test_gradients {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_squared_dist_basic() {
        let dist = squared_dist([0.0_f64, 0.0], [3.0, 4.0]);
        assert_relative_eq!(dist, 25.0, epsilon = 1e-12);
    }

    #[test]
    fn test_squared_dist_identical_points() {
        let dist = squared_dist([1.5_f32, -2.0, 3.0], [1.5, -2.0, 3.0]);
        assert_eq!(dist, 0.0);
    }

    #[test]
    fn test_clip_bounds_and_idempotence() {
        for &v in &[-100.0_f64, -4.0, -3.9, 0.0, 1e-9, 3.999, 4.0, 7.5, f64::MAX] {
            let once = clip(v, -4.0, 4.0);
            let twice = clip(once, -4.0, 4.0);

            assert!((-4.0..=4.0).contains(&once));
            assert_eq!(once, twice);
        }
        assert_eq!(clip(1.25_f64, -4.0, 4.0), 1.25);
    }

    #[test]
    fn test_force_signs() {
        let (a, b) = (1.577_f64, 0.895_f64);
        for &d2 in &[1e-6, 0.01, 0.5, 1.0, 10.0, 1e4] {
            assert!(attractive_grad(d2, a, b) < 0.0, "d2 = {}", d2);
            assert!(repulsive_grad(d2, 1.0, a, b) > 0.0, "d2 = {}", d2);
        }
    }

    #[test]
    fn test_gradient_values_b_one() {
        // with a = b = 1: attractive = -2 / (d2 + 1), repulsive = 2 / ((0.001 + d2)(d2 + 1))
        assert_relative_eq!(attractive_grad(1.0_f64, 1.0, 1.0), -1.0, epsilon = 1e-12);
        assert_relative_eq!(
            repulsive_grad(1.0_f64, 1.0, 1.0, 1.0),
            2.0 / (1.001 * 2.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_repulsive_finite_at_zero() {
        let g = repulsive_grad(0.0_f64, 1.0, 1.577, 0.895);
        assert!(g.is_finite());
        assert_relative_eq!(g, 2.0 * 0.895 / 0.001, epsilon = 1e-9);
    }

    #[test]
    fn test_constants_zero_distance_has_no_attraction() {
        let consts = OptimConstants::new(1.577_f64, 0.895, 1.0);

        assert_eq!(consts.attractive(0.0), 0.0);
        assert_eq!(consts.clip(12.0), 4.0);
        assert_eq!(consts.clip(-12.0), -4.0);
    }
}
