use crate::kernel::{
    bind_input, bind_output, ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D, Write1D,
};
use crate::numeric::policy::{apply_in_place, guard_input};
use crate::signal::traits::Filter1D;
use nalgebra::{DMatrix, DVector};
use vv_dsp_core::Real;

/// Boundary extension used by [`savgol_filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SavgolMode {
    /// Mirror about the edge sample without repeating it: `x[2], x[1] | x[0], ..`.
    #[default]
    Reflect,
    /// Repeat the edge sample.
    Constant,
    /// Repeat the edge sample.
    Nearest,
    /// Circular continuation.
    Wrap,
}

/// Constructor config for [`SavgolKernel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavgolConfig {
    /// Odd window length `M`.
    pub window_length: usize,
    /// Order `p` of the fitted polynomial.
    pub polyorder: usize,
    /// Derivative order `d <= p`; 0 smooths.
    pub deriv: usize,
    /// Sample spacing, used only when `deriv > 0`.
    pub delta: Real,
    /// Boundary extension.
    pub mode: SavgolMode,
}

impl Default for SavgolConfig {
    fn default() -> Self {
        Self {
            window_length: 5,
            polyorder: 2,
            deriv: 0,
            delta: 1.0,
            mode: SavgolMode::Reflect,
        }
    }
}

/// Savitzky-Golay least-squares polynomial filter.
///
/// The correlation weights are solved once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SavgolKernel {
    window_length: usize,
    polyorder: usize,
    deriv: usize,
    mode: SavgolMode,
    coeffs: Vec<f64>,
}

impl KernelLifecycle for SavgolKernel {
    type Config = SavgolConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.window_length % 2 == 0 {
            return Err(ConfigError::InvalidArgument {
                arg: "window_length",
                reason: "window length must be odd and positive",
            });
        }
        if config.deriv > config.polyorder {
            return Err(ConfigError::InvalidArgument {
                arg: "deriv",
                reason: "derivative order must not exceed polyorder",
            });
        }
        if config.deriv > 0 && (config.delta.is_nan() || config.delta <= 0.0) {
            return Err(ConfigError::InvalidArgument {
                arg: "delta",
                reason: "sample spacing must be positive",
            });
        }
        let coeffs = design_coefficients(
            config.window_length,
            config.polyorder,
            config.deriv,
            config.delta as f64,
        )?;
        tracing::debug!(
            window_length = config.window_length,
            polyorder = config.polyorder,
            deriv = config.deriv,
            mode = ?config.mode,
            "savgol kernel created"
        );
        Ok(Self {
            window_length: config.window_length,
            polyorder: config.polyorder,
            deriv: config.deriv,
            mode: config.mode,
            coeffs,
        })
    }
}

fn factorial(n: usize) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

// With the centred Vandermonde matrix `A` (rows `t^0..t^p` for `t = r - M/2`)
// the weights are `h = A c` where `(A^T A) c = d! e_d`, scaled by `delta^-d`.
// Smoothing weights are renormalised to sum to one.
fn design_coefficients(
    m: usize,
    polyorder: usize,
    deriv: usize,
    delta: f64,
) -> Result<Vec<f64>, ConfigError> {
    let cols = polyorder + 1;
    if cols > m {
        tracing::warn!(
            window_length = m,
            polyorder,
            "savgol normal equations are rank deficient"
        );
        return Err(ConfigError::Singular {
            reason: "polyorder must be below the window length",
        });
    }
    let half = (m / 2) as f64;
    let a = DMatrix::<f64>::from_fn(m, cols, |r, j| (r as f64 - half).powi(j as i32));
    let ata = a.transpose() * &a;
    let mut rhs = DVector::<f64>::zeros(cols);
    rhs[deriv] = factorial(deriv);
    let c = ata.lu().solve(&rhs).ok_or_else(|| {
        tracing::warn!(window_length = m, polyorder, "savgol normal equations are singular");
        ConfigError::Singular {
            reason: "savgol normal equations are singular",
        }
    })?;
    let mut h: Vec<f64> = (&a * c).iter().copied().collect();

    if deriv == 0 {
        let sum: f64 = h.iter().sum();
        if sum != 0.0 {
            h.iter_mut().for_each(|v| *v /= sum);
        }
    } else {
        let scale = delta.powi(deriv as i32);
        h.iter_mut().for_each(|v| *v /= scale);
    }
    Ok(h)
}

impl SavgolKernel {
    /// Window length `M`.
    pub fn window_length(&self) -> usize {
        self.window_length
    }

    /// Polynomial order `p`.
    pub fn polyorder(&self) -> usize {
        self.polyorder
    }

    /// Derivative order `d`.
    pub fn deriv(&self) -> usize {
        self.deriv
    }

    /// Correlation weights `h[r]`, `r = 0..M`: output `n` is
    /// `sum_r h[r] * xp[n + r]` over the padded input `xp`.
    pub fn coefficients(&self) -> &[f64] {
        &self.coeffs
    }

    /// Scratch length [`SavgolKernel::run_with_scratch`] needs for an input of
    /// `n` samples.
    pub fn scratch_len(&self, n: usize) -> usize {
        n + 2 * (self.window_length / 2)
    }

    fn pad_into(&self, x: &[Real], xp: &mut [f64]) {
        let n = x.len();
        let half = self.window_length / 2;
        for (dst, &v) in xp[half..half + n].iter_mut().zip(x) {
            *dst = v as f64;
        }
        for i in 0..half {
            let (left, right) = match self.mode {
                SavgolMode::Reflect => ((i + 1).min(n - 1), n.checked_sub(2 + i).unwrap_or(0)),
                SavgolMode::Constant | SavgolMode::Nearest => (0, n - 1),
                SavgolMode::Wrap => ((n - (i % n) - 1) % n, i % n),
            };
            xp[half - 1 - i] = x[left] as f64;
            xp[half + n + i] = x[right] as f64;
        }
    }

    ///
    /// Filter `input` into `out` using caller-provided padding scratch of at
    /// least [`SavgolKernel::scratch_len`] samples. Never allocates unless the
    /// NaN/Inf policy has to rewrite the input.
    ///
    pub fn run_with_scratch(
        &self,
        input: &[Real],
        scratch: &mut [f64],
        out: &mut [Real],
    ) -> Result<(), ExecInvariantViolation> {
        let input = bind_input(input, "input")?;
        if self.window_length > input.len() {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "window_length",
                expected: input.len(),
                got: self.window_length,
            });
        }
        let out = bind_output(out, "out", input.len())?;
        let need = self.scratch_len(input.len());
        if scratch.len() < need {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "scratch",
                expected: need,
                got: scratch.len(),
            });
        }
        let x = guard_input(input)?;
        let xp = &mut scratch[..need];
        self.pad_into(&x, xp);
        let m = self.window_length;
        for (n, dst) in out.iter_mut().enumerate() {
            let acc: f64 = self
                .coeffs
                .iter()
                .zip(&xp[n..n + m])
                .map(|(h, v)| h * v)
                .sum();
            *dst = acc as Real;
        }
        apply_in_place(out)
    }
}

impl Filter1D<Real> for SavgolKernel {
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
        O: Write1D<Real> + ?Sized,
    {
        let input = bind_input(input, "input")?;
        let out = bind_output(out, "out", input.len())?;
        tracing::trace!(n = input.len(), window_length = self.window_length, "savgol");
        let mut scratch = vec![0.0; self.scratch_len(input.len())];
        self.run_with_scratch(input, &mut scratch, out)
    }

    fn run_alloc<I>(&self, input: &I) -> Result<Vec<Real>, ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
    {
        let input = bind_input(input, "input")?;
        let mut out = vec![0.0; input.len()];
        self.run_into(input, &mut out)?;
        Ok(out)
    }
}

///
/// Savitzky-Golay filter
///
/// Fits a degree-`polyorder` polynomial over each `window_length` neighbourhood
/// and returns its value, or its `deriv`-th derivative at spacing `delta`, at
/// the centre sample. The input is extended by `window_length / 2` samples on
/// each end according to `mode`.
///
/// ```
/// use vv_dsp::signal::filter::{savgol_filter, SavgolMode};
///
/// let x: Vec<_> = (0..10).map(|v| v as vv_dsp::Real).collect();
/// let y = savgol_filter(&x, 5, 2, 0, 1.0, SavgolMode::Reflect).unwrap();
/// assert!((y[4] - 4.0).abs() < 1e-5);
/// ```
///
pub fn savgol_filter(
    x: &[Real],
    window_length: usize,
    polyorder: usize,
    deriv: usize,
    delta: Real,
    mode: SavgolMode,
) -> Result<Vec<Real>, ExecInvariantViolation> {
    SavgolKernel::try_new(SavgolConfig {
        window_length,
        polyorder,
        deriv,
        delta,
        mode,
    })?
    .run_alloc(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::{NanPolicy, ScopedNanPolicy};
    use approx::assert_abs_diff_eq;
    use rand::Rng;
    use vv_dsp_core::Status;

    #[cfg(feature = "use_double")]
    const TOL: Real = 1e-12;
    #[cfg(not(feature = "use_double"))]
    const TOL: Real = 1e-5;

    const MODES: [SavgolMode; 4] = [
        SavgolMode::Reflect,
        SavgolMode::Constant,
        SavgolMode::Nearest,
        SavgolMode::Wrap,
    ];

    fn kernel(window_length: usize, polyorder: usize, deriv: usize) -> SavgolKernel {
        SavgolKernel::try_new(SavgolConfig {
            window_length,
            polyorder,
            deriv,
            ..Default::default()
        })
        .expect("kernel")
    }

    #[test]
    fn five_point_quadratic_weights() {
        let k = kernel(5, 2, 0);
        let h = k.coefficients();
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0];
        for (a, b) in h.iter().zip(expected) {
            assert_abs_diff_eq!(*a, b / 35.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(h.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn smoothing_weights_sum_to_one() {
        for (m, p) in [(3, 0), (7, 3), (11, 4), (21, 6)] {
            let k = kernel(m, p, 0);
            let h = k.coefficients();
            assert_abs_diff_eq!(h.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn line_is_reproduced_in_the_interior() {
        let x: Vec<Real> = (0..10).map(|v| v as Real).collect();
        let y = savgol_filter(&x, 5, 2, 0, 1.0, SavgolMode::Reflect).expect("savgol");
        for n in 2..8 {
            assert_abs_diff_eq!(y[n], x[n], epsilon = TOL * 10.0);
        }
    }

    #[test]
    fn constant_is_preserved_under_every_mode() {
        let x = [3.5 as Real; 12];
        for mode in MODES {
            let y = savgol_filter(&x, 7, 3, 0, 1.0, mode).expect("savgol");
            for v in y {
                assert_abs_diff_eq!(v, 3.5, epsilon = TOL * 10.0);
            }
        }
    }

    #[test]
    fn first_derivative_of_a_sampled_line_is_its_slope() {
        let (a, b, delta) = (1.5, -0.75, 0.5);
        let x: Vec<Real> = (0..20).map(|n| a + b * n as Real * delta).collect();
        let y = savgol_filter(&x, 7, 2, 1, delta, SavgolMode::Nearest).expect("savgol");
        for v in &y[3..17] {
            assert_abs_diff_eq!(*v, b, epsilon = 1e-4);
        }
    }

    #[test]
    fn first_derivative_weights_rise_left_to_right() {
        let k = kernel(5, 2, 1);
        let expected = [-2.0, -1.0, 0.0, 1.0, 2.0];
        for (a, b) in k.coefficients().iter().zip(expected) {
            assert_abs_diff_eq!(*a, b / 10.0, epsilon = 1e-12);
        }
        // An increasing ramp has a positive slope in every mode's interior.
        let x: Vec<Real> = (0..12).map(|n| 2.0 * n as Real).collect();
        for mode in MODES {
            let y = savgol_filter(&x, 5, 2, 1, 1.0, mode).expect("savgol");
            for v in &y[2..10] {
                assert_abs_diff_eq!(*v, 2.0, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn second_derivative_of_a_parabola() {
        let x: Vec<Real> = (0..15).map(|n| 0.5 * (n * n) as Real).collect();
        let y = savgol_filter(&x, 7, 3, 2, 1.0, SavgolMode::Nearest).expect("savgol");
        for v in &y[3..12] {
            assert_abs_diff_eq!(*v, 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn scratch_path_matches_allocating_path() {
        let k = kernel(7, 2, 0);
        let mut rng = rand::rng();
        let x: Vec<Real> = (0..40).map(|_| rng.random_range(-1.0..1.0)).collect();
        let expected = k.run_alloc(&x).expect("alloc");

        let mut scratch = vec![0.0; k.scratch_len(x.len())];
        let mut y = vec![0.0; x.len()];
        k.run_with_scratch(&x, &mut scratch, &mut y).expect("scratch");
        assert_eq!(y, expected);

        let mut short = vec![0.0; k.scratch_len(x.len()) - 1];
        let err = k.run_with_scratch(&x, &mut short, &mut y).expect_err("short scratch");
        assert!(matches!(err, ExecInvariantViolation::LengthMismatch { arg: "scratch", .. }));
    }

    #[test]
    fn padding_modes() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let pad = |mode| {
            let k = SavgolKernel::try_new(SavgolConfig {
                window_length: 5,
                polyorder: 1,
                mode,
                ..Default::default()
            })
            .expect("kernel");
            let mut xp = vec![0.0; k.scratch_len(x.len())];
            k.pad_into(&x, &mut xp);
            xp
        };
        assert_eq!(pad(SavgolMode::Reflect), vec![3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0]);
        assert_eq!(pad(SavgolMode::Nearest), vec![1.0, 1.0, 1.0, 2.0, 3.0, 4.0, 4.0, 4.0]);
        assert_eq!(pad(SavgolMode::Wrap), vec![3.0, 4.0, 1.0, 2.0, 3.0, 4.0, 1.0, 2.0]);
    }

    #[test]
    fn parameter_validation() {
        let base = SavgolConfig::default();
        let even = SavgolKernel::try_new(SavgolConfig {
            window_length: 4,
            ..base
        })
        .expect_err("even");
        assert_eq!(even.status(), Status::OutOfRange);
        let deriv = SavgolKernel::try_new(SavgolConfig { deriv: 3, ..base }).expect_err("deriv");
        assert_eq!(deriv.status(), Status::OutOfRange);
        let delta = SavgolKernel::try_new(SavgolConfig {
            deriv: 1,
            delta: 0.0,
            ..base
        })
        .expect_err("delta");
        assert_eq!(delta.status(), Status::OutOfRange);

        let err = savgol_filter(&[1.0, 2.0, 3.0], 5, 2, 0, 1.0, SavgolMode::Reflect)
            .expect_err("window longer than input");
        assert_eq!(err.status(), Status::InvalidSize);
        let err = savgol_filter(&[], 5, 2, 0, 1.0, SavgolMode::Reflect).expect_err("empty");
        assert_eq!(err.status(), Status::InvalidSize);
    }

    #[test]
    fn rank_deficient_fit_fails_at_construction() {
        let err = SavgolKernel::try_new(SavgolConfig {
            window_length: 3,
            polyorder: 3,
            ..Default::default()
        })
        .expect_err("singular");
        assert!(matches!(err, ConfigError::Singular { .. }));
        assert_eq!(err.status(), Status::Internal);

        let err = savgol_filter(&[1.0; 8], 3, 3, 0, 1.0, SavgolMode::Reflect)
            .expect_err("singular");
        assert_eq!(err.status(), Status::Internal);
    }

    #[test]
    fn error_policy_rejects_nan() {
        let _guard = ScopedNanPolicy::new(NanPolicy::Error);
        let mut x = vec![1.0; 9];
        x[4] = Real::NAN;
        let err = savgol_filter(&x, 5, 2, 0, 1.0, SavgolMode::Reflect).expect_err("nan");
        assert_eq!(err, ExecInvariantViolation::NonFinite { index: 4 });
    }

    #[test]
    fn ignore_policy_zeroes_nan_before_fitting() {
        let _guard = ScopedNanPolicy::new(NanPolicy::Ignore);
        let x = [0.0, 0.0, Real::NAN, 0.0, 0.0, 0.0, 0.0];
        let y = savgol_filter(&x, 3, 1, 0, 1.0, SavgolMode::Constant).expect("ignore");
        assert!(y.iter().all(|v| *v == 0.0));
    }
}
