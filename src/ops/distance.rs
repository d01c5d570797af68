//! Kernel similarities and the metric distances derived from them.
//!
//! `K_p(x, y) = (x.y / (|x| |y|))^p` and `D_p(x, y) = sqrt(2 - 2 K_p(x, y))`.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use super::normalize::norm;

/// Power-`p` kernel between two fingerprints.
///
/// A zero-norm argument has no direction; its kernel with anything is 0.
pub fn kernel(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>, power: u32) -> f64 {
    let denom = norm(x) * norm(y);
    if denom == 0.0 {
        return 0.0;
    }
    (x.dot(&y) / denom).powi(power as i32)
}

/// Normalized dot product, `K_1`.
pub fn simple_kernel(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
    kernel(x, y, 1)
}

/// `D_p`, the metric distance induced by the power-`p` kernel.
pub fn distance(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>, power: u32) -> f64 {
    distance_from_kernel(kernel(x, y, power))
}

/// `D_1`, the default distance.
pub fn simple_distance(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
    distance(x, y, 1)
}

/// `D_1` for inputs the caller guarantees to be unit-norm; skips the norms.
pub fn normalized_distance(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
    distance_from_kernel(x.dot(&y))
}

fn distance_from_kernel(k: f64) -> f64 {
    // round-off can push 2 - 2k slightly below zero for identical inputs
    (2.0 - 2.0 * k).max(0.0).sqrt()
}

/// Scalar distance between two fingerprints of equal length.
pub trait FingerprintDistance: Sync {
    fn distance(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64;
}

/// Built-in distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceKind {
    /// `D_1` with norm division.
    #[default]
    Simple,
    /// `D_1` assuming unit-norm inputs.
    Normalized,
    /// `D_p` for a kernel power `p >= 1`; classification rejects `p == 0`.
    Kernel { power: u32 },
}

impl FingerprintDistance for DistanceKind {
    fn distance(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        match *self {
            DistanceKind::Simple => simple_distance(x, y),
            DistanceKind::Normalized => normalized_distance(x, y),
            DistanceKind::Kernel { power } => distance(x, y, power),
        }
    }
}

impl<F> FingerprintDistance for F
where
    F: Fn(ArrayView1<'_, f64>, ArrayView1<'_, f64>) -> f64 + Sync,
{
    fn distance(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        self(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_vector(len: usize, seed: u64) -> Array1<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array1::from_shape_simple_fn(len, || rng.random_range(0.0..1.0))
    }

    #[test]
    fn test_math_matches_definitions() {
        for seed in 0..5 {
            let size = 2 + (seed as usize * 37) % 148;
            let x = random_vector(size, seed);
            let y = random_vector(size, seed + 100);
            let cos = x.dot(&y) / (norm(x.view()) * norm(y.view()));

            let sks = simple_kernel(x.view(), y.view());
            assert!((sks - cos).abs() < 1e-8);

            let xn = &x / norm(x.view());
            let yn = &y / norm(y.view());
            let expected = (2.0 - 2.0 * sks).sqrt();
            assert!((normalized_distance(xn.view(), yn.view()) - expected).abs() < 1e-8);
            assert!((simple_distance(x.view(), y.view()) - expected).abs() < 1e-8);

            for p in 2..10 {
                let nks = kernel(x.view(), y.view(), p);
                assert!((nks - cos.powi(p as i32)).abs() < 1e-8);
                assert!((distance(x.view(), y.view(), p) - (2.0 - 2.0 * nks).sqrt()).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn test_zero_vector_has_no_direction() {
        let x = Array1::zeros(4);
        let y = random_vector(4, 3);
        assert_eq!(simple_kernel(x.view(), y.view()), 0.0);
        assert!((simple_distance(x.view(), y.view()) - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_kind_dispatch() {
        let x = random_vector(8, 1);
        let y = random_vector(8, 2);
        assert_eq!(
            DistanceKind::Kernel { power: 3 }.distance(x.view(), y.view()),
            distance(x.view(), y.view(), 3)
        );
        assert_eq!(
            DistanceKind::Simple.distance(x.view(), y.view()),
            simple_distance(x.view(), y.view())
        );
    }

    fn manhattan(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        (&x - &y).mapv(f64::abs).sum()
    }

    #[test]
    fn test_function_as_distance() {
        let x = random_vector(8, 1);
        let y = random_vector(8, 2);
        assert_eq!(manhattan.distance(x.view(), y.view()), manhattan(x.view(), y.view()));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_identity_and_symmetry(
            len in 1usize..64,
            seed_x in 0u64..10_000,
            seed_y in 0u64..10_000,
            power in 1u32..10,
        ) {
            let x = random_vector(len, seed_x);
            let y = random_vector(len, seed_y);
            prop_assert!(distance(x.view(), x.view(), power) < 1e-6);
            prop_assert_eq!(
                distance(x.view(), y.view(), power),
                distance(y.view(), x.view(), power)
            );
        }
    }
}
