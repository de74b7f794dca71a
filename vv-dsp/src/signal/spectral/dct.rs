//! Unnormalised DCT-II/III/IV plans.
//!
//! With `x` of length `N` and `a(n, k) = pi / N * (n + 1/2) * k`:
//!
//! | plan | output |
//! |---|---|
//! | II forward | `X[k] = sum_n x[n] cos(a(n, k))` |
//! | III forward | `Y[k] = x[0] + 2 sum_{n>=1} x[n] cos(a(n, k))` |
//! | II or III backward | `x[n] = 2/N (X[0]/2 + sum_{k>=1} X[k] cos(a(n, k)))` |
//! | IV forward | `X[k] = sum_n x[n] cos(pi / N (n + 1/2)(k + 1/2))` |
//! | IV backward | IV forward scaled by `2/N` |
//!
//! Execution is direct summation in `f64`.

use super::FftDirection;
use crate::kernel::{
    bind_input, bind_output, ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D, Write1D,
};
use crate::numeric::policy::{apply_in_place, guard_input};
use crate::signal::traits::Transform1D;
use core::f64::consts::PI;
use vv_dsp_core::Real;

/// DCT variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DctVariant {
    /// DCT-II, the "standard" DCT.
    II,
    /// DCT-III, the transpose of DCT-II.
    III,
    /// DCT-IV, self-inverse up to `2/N`.
    IV,
}

/// Constructor config for [`DctPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DctConfig {
    /// Transform length `N`.
    pub len: usize,
    /// Variant.
    pub variant: DctVariant,
    /// Direction.
    pub direction: FftDirection,
}

/// Immutable DCT plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DctPlan {
    len: usize,
    variant: DctVariant,
    direction: FftDirection,
}

impl DctPlan {
    /// Variant.
    pub fn variant(&self) -> DctVariant {
        self.variant
    }

    /// Direction.
    pub fn direction(&self) -> FftDirection {
        self.direction
    }
}

impl KernelLifecycle for DctPlan {
    type Config = DctConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.len == 0 {
            return Err(ConfigError::EmptyInput { arg: "len" });
        }
        tracing::debug!(
            len = config.len,
            variant = ?config.variant,
            direction = ?config.direction,
            "dct plan created"
        );
        Ok(Self {
            len: config.len,
            variant: config.variant,
            direction: config.direction,
        })
    }
}

fn dct2_forward(x: &[Real], out: &mut [Real]) {
    let n_len = x.len() as f64;
    for (k, dst) in out.iter_mut().enumerate() {
        let acc: f64 = x
            .iter()
            .enumerate()
            .map(|(n, &v)| v as f64 * (PI * (n as f64 + 0.5) * k as f64 / n_len).cos())
            .sum();
        *dst = acc as Real;
    }
}

fn dct3_forward(x: &[Real], out: &mut [Real]) {
    let n_len = x.len() as f64;
    for (k, dst) in out.iter_mut().enumerate() {
        let tail: f64 = x
            .iter()
            .enumerate()
            .skip(1)
            .map(|(n, &v)| v as f64 * (PI * k as f64 * (n as f64 + 0.5) / n_len).cos())
            .sum();
        *dst = (x[0] as f64 + 2.0 * tail) as Real;
    }
}

fn dct2_inverse(coeffs: &[Real], out: &mut [Real]) {
    let n_len = coeffs.len() as f64;
    let scale = 2.0 / n_len;
    for (n, dst) in out.iter_mut().enumerate() {
        let tail: f64 = coeffs
            .iter()
            .enumerate()
            .skip(1)
            .map(|(k, &c)| c as f64 * (PI * k as f64 * (n as f64 + 0.5) / n_len).cos())
            .sum();
        *dst = (scale * (0.5 * coeffs[0] as f64 + tail)) as Real;
    }
}

fn dct4(x: &[Real], out: &mut [Real], scale: f64) {
    let n_len = x.len() as f64;
    for (k, dst) in out.iter_mut().enumerate() {
        let acc: f64 = x
            .iter()
            .enumerate()
            .map(|(n, &v)| v as f64 * (PI * (n as f64 + 0.5) * (k as f64 + 0.5) / n_len).cos())
            .sum();
        *dst = (scale * acc) as Real;
    }
}

impl Transform1D<Real> for DctPlan {
    fn len(&self) -> usize {
        self.len
    }

    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
        O: Write1D<Real> + ?Sized,
    {
        let input = bind_input(input, "input")?;
        if input.len() != self.len {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "input",
                expected: self.len,
                got: input.len(),
            });
        }
        let out = bind_output(out, "out", self.len)?;
        let x = guard_input(input)?;
        match (self.variant, self.direction) {
            (DctVariant::II, FftDirection::Forward) => dct2_forward(&x, out),
            (DctVariant::III, FftDirection::Forward) => dct3_forward(&x, out),
            (DctVariant::II | DctVariant::III, FftDirection::Backward) => dct2_inverse(&x, out),
            (DctVariant::IV, FftDirection::Forward) => dct4(&x, out, 1.0),
            (DctVariant::IV, FftDirection::Backward) => dct4(&x, out, 2.0 / self.len as f64),
        }
        apply_in_place(out)
    }

    fn run_alloc<I>(&self, input: &I) -> Result<Vec<Real>, ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
    {
        let mut out = vec![0.0; self.len];
        self.run_into(input, &mut out)?;
        Ok(out)
    }
}

fn dct_one_shot(
    x: &[Real],
    variant: DctVariant,
    direction: FftDirection,
) -> Result<Vec<Real>, ExecInvariantViolation> {
    let plan = DctPlan::try_new(DctConfig {
        len: x.len(),
        variant,
        direction,
    })?;
    plan.run_alloc(x)
}

///
/// Forward DCT of `x` with a plan sized to the input.
///
/// ```
/// use vv_dsp::signal::spectral::{dct_forward, dct_inverse, DctVariant};
///
/// let x = [1., 2., 3., 4.];
/// let coeffs = dct_forward(&x, DctVariant::II).unwrap();
/// assert!((coeffs[0] - 10.).abs() < 1e-5);
/// let back = dct_inverse(&coeffs, DctVariant::II).unwrap();
/// assert!(back.iter().zip(&x).all(|(a, b)| (a - b).abs() < 1e-4));
/// ```
///
pub fn dct_forward(x: &[Real], variant: DctVariant) -> Result<Vec<Real>, ExecInvariantViolation> {
    dct_one_shot(x, variant, FftDirection::Forward)
}

/// Backward DCT of `x` with a plan sized to the input.
pub fn dct_inverse(x: &[Real], variant: DctVariant) -> Result<Vec<Real>, ExecInvariantViolation> {
    dct_one_shot(x, variant, FftDirection::Backward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::{NanPolicy, ScopedNanPolicy};
    use approx::assert_abs_diff_eq;
    use rand::Rng;
    use vv_dsp_core::Status;

    #[cfg(feature = "use_double")]
    const TOL: Real = 1e-10;
    #[cfg(not(feature = "use_double"))]
    const TOL: Real = 1e-4;

    fn random_signal(n: usize) -> Vec<Real> {
        let mut rng = rand::rng();
        (0..n).map(|_| rng.random_range(-1.0..1.0)).collect()
    }

    #[test]
    fn dct2_and_dct4_round_trip() {
        for n in [1usize, 2, 5, 16] {
            let x = random_signal(n);
            for variant in [DctVariant::II, DctVariant::IV] {
                let back = dct_inverse(&dct_forward(&x, variant).expect("fwd"), variant)
                    .expect("inv");
                for (a, b) in back.iter().zip(&x) {
                    assert_abs_diff_eq!(*a, *b, epsilon = TOL);
                }
            }
        }
    }

    #[test]
    fn dct3_forward_matches_hand_evaluation() {
        // Y[k] = x[0] + 2 (2 cos(pi k 1.5 / 3) + 3 cos(pi k 2.5 / 3))
        let y = dct_forward(&[1.0, 2.0, 3.0], DctVariant::III).expect("iii");
        let expected = [11.0, 1.0 - 3.0 * (3.0 as Real).sqrt(), 0.0];
        for (a, b) in y.iter().zip(expected) {
            assert_abs_diff_eq!(*a, b, epsilon = TOL * 10.0);
        }
    }

    #[test]
    fn dct3_backward_is_the_dct2_inverse() {
        let x = random_signal(9);
        let from_iii = dct_inverse(&x, DctVariant::III).expect("iii");
        let from_ii = dct_inverse(&x, DctVariant::II).expect("ii");
        assert_eq!(from_iii, from_ii);
    }

    #[test]
    fn dct2_of_constant_is_dc_only() {
        let coeffs = dct_forward(&[2.0; 6], DctVariant::II).expect("ii");
        assert_abs_diff_eq!(coeffs[0], 12.0, epsilon = TOL * 10.0);
        for c in &coeffs[1..] {
            assert_abs_diff_eq!(*c, 0.0, epsilon = TOL);
        }
    }

    #[test]
    fn plan_validates_lengths() {
        assert!(DctPlan::try_new(DctConfig {
            len: 0,
            variant: DctVariant::II,
            direction: FftDirection::Forward,
        })
        .is_err());
        let plan = DctPlan::try_new(DctConfig {
            len: 4,
            variant: DctVariant::IV,
            direction: FftDirection::Forward,
        })
        .expect("plan");
        let err = plan.run_alloc(&[1.0, 2.0]).expect_err("length");
        assert_eq!(err.status(), Status::InvalidSize);
    }

    #[test]
    fn error_policy_rejects_nan() {
        let _guard = ScopedNanPolicy::new(NanPolicy::Error);
        let err = dct_forward(&[1.0, Real::NAN, 3.0], DctVariant::II).expect_err("nan");
        assert_eq!(err.status(), Status::NanInfDetected);
    }
}
