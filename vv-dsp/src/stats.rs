//! Descriptive statistics and correlation kernels over real buffers.
//!
//! Accumulation happens in `f64` regardless of the [`Real`] width. Every entry
//! point reads its input through the NaN/Inf policy and passes generated
//! values back through it.

use crate::kernel::{
    bind_input, bind_output, ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D, Write1D,
};
use crate::numeric::policy::{apply_in_place, guard_input, guard_scalar};
use itertools::Itertools;
use vv_dsp_core::Real;

/// 1D scalar reduction capability.
pub trait Reduce1D<T> {
    /// Reduce the input to one value.
    fn run<I>(&self, input: &I) -> Result<T, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized;
}

/// 1D autocorrelation capability.
pub trait Autocorrelate1D<T> {
    /// Write one value per lag into a caller-provided output buffer.
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized,
        O: Write1D<T> + ?Sized;

    /// Compute all lags and allocate output.
    fn run_alloc<I>(&self, input: &I) -> Result<Vec<T>, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized;
}

/// Two-input 1D cross-correlation capability.
pub trait CrossCorrelate1D<T> {
    /// Write one value per lag into a caller-provided output buffer.
    fn run_into<I1, I2, O>(
        &self,
        x: &I1,
        y: &I2,
        out: &mut O,
    ) -> Result<(), ExecInvariantViolation>
    where
        I1: Read1D<T> + ?Sized,
        I2: Read1D<T> + ?Sized,
        O: Write1D<T> + ?Sized;

    /// Compute all lags and allocate output.
    fn run_alloc<I1, I2>(&self, x: &I1, y: &I2) -> Result<Vec<T>, ExecInvariantViolation>
    where
        I1: Read1D<T> + ?Sized,
        I2: Read1D<T> + ?Sized;
}

/// Scalar statistic computed by [`ReduceKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    /// Compensated sum.
    Sum,
    /// Arithmetic mean.
    Mean,
    /// Variance, divided by `n` when `biased` and by `n - 1` otherwise.
    Variance {
        /// Population (`n`) instead of sample (`n - 1`) normalisation.
        biased: bool,
    },
    /// Square root of [`Statistic::Variance`].
    Stddev {
        /// Population (`n`) instead of sample (`n - 1`) normalisation.
        biased: bool,
    },
    /// Root mean square.
    Rms,
    /// Peak magnitude over RMS.
    CrestFactor,
    /// Population skewness.
    Skewness,
    /// Population excess kurtosis.
    Kurtosis,
    /// Fraction of adjacent pairs with a strict sign change.
    ZeroCrossingRate,
    /// Smallest value.
    Min,
    /// Largest value.
    Max,
}

/// Constructor config for [`ReduceKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceConfig {
    /// Statistic to compute.
    pub statistic: Statistic,
}

/// Trait-first scalar statistics kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceKernel {
    statistic: Statistic,
}

impl ReduceKernel {
    /// Configured statistic.
    pub fn statistic(&self) -> Statistic {
        self.statistic
    }
}

impl KernelLifecycle for ReduceKernel {
    type Config = ReduceConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        Ok(Self {
            statistic: config.statistic,
        })
    }
}

impl Reduce1D<Real> for ReduceKernel {
    fn run<I>(&self, input: &I) -> Result<Real, ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
    {
        let x = bind_input(input, "x")?;
        let x = guard_input(x)?;
        let value = match self.statistic {
            Statistic::Sum => kahan_sum(&x) as Real,
            Statistic::Mean => (kahan_sum(&x) / x.len() as f64) as Real,
            Statistic::Variance { biased } => variance_impl(&x, biased)? as Real,
            Statistic::Stddev { biased } => variance_impl(&x, biased)?.sqrt() as Real,
            Statistic::Rms => rms_impl(&x) as Real,
            Statistic::CrestFactor => crest_impl(&x),
            Statistic::Skewness => skewness_impl(&x)? as Real,
            Statistic::Kurtosis => kurtosis_impl(&x)? as Real,
            Statistic::ZeroCrossingRate => {
                if x.len() < 2 {
                    0.0
                } else {
                    (zero_crossings_impl(&x) as f64 / (x.len() - 1) as f64) as Real
                }
            }
            Statistic::Min => x[argmin_impl(&x)],
            Statistic::Max => x[argmax_impl(&x)],
        };
        guard_scalar(value)
    }
}

/// Constructor config for [`AutocorrKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutocorrConfig {
    /// Number of lags produced, starting at lag 0.
    pub lags: usize,
    /// Divide every lag by `n` instead of by its overlap count.
    pub biased: bool,
}

/// Trait-first autocorrelation kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutocorrKernel {
    lags: usize,
    biased: bool,
}

impl KernelLifecycle for AutocorrKernel {
    type Config = AutocorrConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.lags == 0 {
            return Err(ConfigError::EmptyInput { arg: "lags" });
        }
        Ok(Self {
            lags: config.lags,
            biased: config.biased,
        })
    }
}

impl Autocorrelate1D<Real> for AutocorrKernel {
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
        O: Write1D<Real> + ?Sized,
    {
        let x = bind_input(input, "x")?;
        let out = bind_output(out, "r", self.lags)?;
        let x = guard_input(x)?;
        autocorr_impl(&x, self.biased, out);
        apply_in_place(out)
    }

    fn run_alloc<I>(&self, input: &I) -> Result<Vec<Real>, ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
    {
        let mut out = vec![0.0; self.lags];
        self.run_into(input, &mut out)?;
        Ok(out)
    }
}

/// Constructor config for [`CrossCorrKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossCorrConfig {
    /// Number of lags produced, starting at lag 0 (`y` delayed by the lag).
    pub lags: usize,
}

/// Trait-first cross-correlation kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossCorrKernel {
    lags: usize,
}

impl KernelLifecycle for CrossCorrKernel {
    type Config = CrossCorrConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.lags == 0 {
            return Err(ConfigError::EmptyInput { arg: "lags" });
        }
        Ok(Self { lags: config.lags })
    }
}

impl CrossCorrelate1D<Real> for CrossCorrKernel {
    fn run_into<I1, I2, O>(
        &self,
        x: &I1,
        y: &I2,
        out: &mut O,
    ) -> Result<(), ExecInvariantViolation>
    where
        I1: Read1D<Real> + ?Sized,
        I2: Read1D<Real> + ?Sized,
        O: Write1D<Real> + ?Sized,
    {
        let x = bind_input(x, "x")?;
        let y = bind_input(y, "y")?;
        let out = bind_output(out, "r", self.lags)?;
        let x = guard_input(x)?;
        let y = guard_input(y)?;
        xcorr_impl(&x, &y, out);
        apply_in_place(out)
    }

    fn run_alloc<I1, I2>(&self, x: &I1, y: &I2) -> Result<Vec<Real>, ExecInvariantViolation>
    where
        I1: Read1D<Real> + ?Sized,
        I2: Read1D<Real> + ?Sized,
    {
        let mut out = vec![0.0; self.lags];
        self.run_into(x, y, &mut out)?;
        Ok(out)
    }
}

fn kahan_sum(x: &[Real]) -> f64 {
    let mut sum = 0.0f64;
    let mut c = 0.0f64;
    for &v in x {
        let y = v as f64 - c;
        let t = sum + y;
        c = (t - sum) - y;
        sum = t;
    }
    sum
}

fn variance_impl(x: &[Real], biased: bool) -> Result<f64, ExecInvariantViolation> {
    if x.len() < 2 {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg: "x",
            expected: 2,
            got: x.len(),
        });
    }
    // Welford
    let mut mean = 0.0f64;
    let mut m2 = 0.0f64;
    for (k, &v) in x.iter().enumerate() {
        let v = v as f64;
        let delta = v - mean;
        mean += delta / (k + 1) as f64;
        m2 += delta * (v - mean);
    }
    let denom = if biased { x.len() } else { x.len() - 1 };
    Ok(m2 / denom as f64)
}

fn rms_impl(x: &[Real]) -> f64 {
    let acc: f64 = x.iter().map(|&v| (v as f64) * (v as f64)).sum();
    (acc / x.len() as f64).sqrt()
}

fn crest_impl(x: &[Real]) -> Real {
    let peak = x.iter().fold(0.0 as Real, |acc, v| acc.max(v.abs()));
    let rms = rms_impl(x) as Real;
    if rms == 0.0 {
        Real::INFINITY
    } else {
        peak / rms
    }
}

/// Running central moments `(m2, m3, m4)` in one pass.
fn central_moments(x: &[Real]) -> (f64, f64, f64) {
    let mut mean = 0.0f64;
    let (mut m2, mut m3, mut m4) = (0.0f64, 0.0f64, 0.0f64);
    for (i, &v) in x.iter().enumerate() {
        let k = (i + 1) as f64;
        let delta = v as f64 - mean;
        let delta_n = delta / k;
        let delta_n2 = delta_n * delta_n;
        let term1 = delta * delta_n * (k - 1.0);
        m4 += term1 * delta_n2 * (k * k - 3.0 * k + 3.0) + 6.0 * delta_n2 * m2
            - 4.0 * delta_n * m3;
        m3 += term1 * delta_n * (k - 2.0) - 3.0 * delta_n * m2;
        m2 += term1;
        mean += delta_n;
    }
    (m2, m3, m4)
}

fn skewness_impl(x: &[Real]) -> Result<f64, ExecInvariantViolation> {
    if x.len() < 3 {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg: "x",
            expected: 3,
            got: x.len(),
        });
    }
    let n = x.len() as f64;
    let (m2, m3, _) = central_moments(x);
    let var = m2 / n;
    if var <= 0.0 {
        return Ok(0.0);
    }
    Ok((m3 / n) / var.powf(1.5))
}

fn kurtosis_impl(x: &[Real]) -> Result<f64, ExecInvariantViolation> {
    if x.len() < 4 {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg: "x",
            expected: 4,
            got: x.len(),
        });
    }
    let n = x.len() as f64;
    let (m2, _, m4) = central_moments(x);
    let var = m2 / n;
    if var <= 0.0 {
        return Ok(0.0);
    }
    Ok((m4 / n) / (var * var) - 3.0)
}

fn zero_crossings_impl(x: &[Real]) -> usize {
    x.iter()
        .tuple_windows()
        .filter(|(a, b)| (**a > 0.0 && **b < 0.0) || (**a < 0.0 && **b > 0.0))
        .count()
}

// First occurrence wins on ties.
fn argmin_impl(x: &[Real]) -> usize {
    x.iter()
        .enumerate()
        .fold(0, |best, (i, v)| if *v < x[best] { i } else { best })
}

fn argmax_impl(x: &[Real]) -> usize {
    x.iter()
        .enumerate()
        .fold(0, |best, (i, v)| if *v > x[best] { i } else { best })
}

fn autocorr_impl(x: &[Real], biased: bool, r: &mut [Real]) {
    let n = x.len();
    for (lag, out) in r.iter_mut().enumerate() {
        if lag >= n {
            *out = 0.0;
            continue;
        }
        let count = n - lag;
        let acc: f64 = x[..count]
            .iter()
            .zip(&x[lag..])
            .map(|(a, b)| *a as f64 * *b as f64)
            .sum();
        let denom = if biased { n } else { count };
        *out = (acc / denom as f64) as Real;
    }
}

fn xcorr_impl(x: &[Real], y: &[Real], r: &mut [Real]) {
    for (lag, out) in r.iter_mut().enumerate() {
        if lag >= y.len() {
            *out = 0.0;
            continue;
        }
        let pairs = x.iter().zip(&y[lag..]);
        let count = pairs.len();
        let acc: f64 = pairs.map(|(a, b)| *a as f64 * *b as f64).sum();
        *out = if count > 0 {
            (acc / count as f64) as Real
        } else {
            0.0
        };
    }
}

fn reduce(x: &[Real], statistic: Statistic) -> Result<Real, ExecInvariantViolation> {
    ReduceKernel { statistic }.run(x)
}

///
/// Compensated (Kahan) sum of `x`.
///
/// ```
/// use vv_dsp::stats::sum;
///
/// assert_eq!(sum(&[1., 2., 3., 4., 5.]).unwrap(), 15.);
/// ```
///
pub fn sum(x: &[Real]) -> Result<Real, ExecInvariantViolation> {
    reduce(x, Statistic::Sum)
}

///
/// Arithmetic mean of `x`.
///
/// ```
/// use vv_dsp::stats::mean;
///
/// assert_eq!(mean(&[1., 2., 3., 4., 5.]).unwrap(), 3.);
/// ```
///
pub fn mean(x: &[Real]) -> Result<Real, ExecInvariantViolation> {
    reduce(x, Statistic::Mean)
}

///
/// Variance of `x`: population (`/ n`) when `biased`, sample (`/ (n - 1)`)
/// otherwise. Requires at least two samples.
///
/// ```
/// use approx::assert_relative_eq;
/// use vv_dsp::stats::variance;
///
/// let x = [1., 2., 3., 4., 5.];
/// assert_relative_eq!(variance(&x, false).unwrap(), 2.5);
/// assert_relative_eq!(variance(&x, true).unwrap(), 2.0);
/// ```
///
pub fn variance(x: &[Real], biased: bool) -> Result<Real, ExecInvariantViolation> {
    reduce(x, Statistic::Variance { biased })
}

/// Standard deviation, see [`variance`].
pub fn stddev(x: &[Real], biased: bool) -> Result<Real, ExecInvariantViolation> {
    reduce(x, Statistic::Stddev { biased })
}

/// Root mean square.
pub fn rms(x: &[Real]) -> Result<Real, ExecInvariantViolation> {
    reduce(x, Statistic::Rms)
}

/// Smallest and largest value, in that order.
pub fn peak(x: &[Real]) -> Result<(Real, Real), ExecInvariantViolation> {
    let lo = reduce(x, Statistic::Min)?;
    let hi = reduce(x, Statistic::Max)?;
    Ok((lo, hi))
}

/// Peak magnitude divided by RMS; `+inf` for an all-zero signal.
pub fn crest_factor(x: &[Real]) -> Result<Real, ExecInvariantViolation> {
    reduce(x, Statistic::CrestFactor)
}

/// Population skewness. Requires at least three samples.
pub fn skewness(x: &[Real]) -> Result<Real, ExecInvariantViolation> {
    reduce(x, Statistic::Skewness)
}

/// Population excess kurtosis (normal distribution gives 0). Requires at
/// least four samples.
pub fn kurtosis(x: &[Real]) -> Result<Real, ExecInvariantViolation> {
    reduce(x, Statistic::Kurtosis)
}

/// Number of strict sign changes between adjacent samples. Zeros never count
/// as a crossing.
pub fn zero_crossings(x: &[Real]) -> Result<usize, ExecInvariantViolation> {
    let x = bind_input(x, "x")?;
    let x = guard_input(x)?;
    Ok(zero_crossings_impl(&x))
}

/// [`zero_crossings`] divided by the number of adjacent pairs.
pub fn zero_crossing_rate(x: &[Real]) -> Result<Real, ExecInvariantViolation> {
    reduce(x, Statistic::ZeroCrossingRate)
}

/// Smallest value.
pub fn min(x: &[Real]) -> Result<Real, ExecInvariantViolation> {
    reduce(x, Statistic::Min)
}

/// Largest value.
pub fn max(x: &[Real]) -> Result<Real, ExecInvariantViolation> {
    reduce(x, Statistic::Max)
}

///
/// Index of the first smallest value.
///
/// ```
/// use vv_dsp::stats::{argmax, argmin};
///
/// let x = [1., 2., 3., 4., 5.];
/// assert_eq!(argmin(&x).unwrap(), 0);
/// assert_eq!(argmax(&x).unwrap(), 4);
/// ```
///
pub fn argmin(x: &[Real]) -> Result<usize, ExecInvariantViolation> {
    let x = bind_input(x, "x")?;
    let x = guard_input(x)?;
    Ok(argmin_impl(&x))
}

/// Index of the first largest value.
pub fn argmax(x: &[Real]) -> Result<usize, ExecInvariantViolation> {
    let x = bind_input(x, "x")?;
    let x = guard_input(x)?;
    Ok(argmax_impl(&x))
}

/// Running sum, `y[i] = x[0] + ... + x[i]`, accumulated in `f64`.
pub fn cumsum(x: &[Real]) -> Result<Vec<Real>, ExecInvariantViolation> {
    let x = bind_input(x, "x")?;
    let x = guard_input(x)?;
    let mut y: Vec<Real> = x
        .iter()
        .scan(0.0f64, |acc, &v| {
            *acc += v as f64;
            Some(*acc as Real)
        })
        .collect();
    apply_in_place(&mut y)?;
    Ok(y)
}

/// First difference, `y[i] = x[i + 1] - x[i]`. Requires two samples.
pub fn diff(x: &[Real]) -> Result<Vec<Real>, ExecInvariantViolation> {
    let x = bind_input(x, "x")?;
    if x.len() < 2 {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg: "x",
            expected: 2,
            got: x.len(),
        });
    }
    let x = guard_input(x)?;
    let mut y: Vec<Real> = x.iter().tuple_windows().map(|(a, b)| b - a).collect();
    apply_in_place(&mut y)?;
    Ok(y)
}

///
/// Autocorrelation for lags `0..lags`. Lags past the end of the signal are 0.
///
/// ```
/// use vv_dsp::stats::autocorrelation;
///
/// let r = autocorrelation(&[1., 1., 1., 1.], 3, false).unwrap();
/// assert_eq!(r, vec![1., 1., 1.]);
/// let r = autocorrelation(&[1., 1., 1., 1.], 3, true).unwrap();
/// assert_eq!(r, vec![1., 0.75, 0.5]);
/// ```
///
pub fn autocorrelation(
    x: &[Real],
    lags: usize,
    biased: bool,
) -> Result<Vec<Real>, ExecInvariantViolation> {
    let kernel = AutocorrKernel::try_new(AutocorrConfig { lags, biased })?;
    kernel.run_alloc(x)
}

/// Cross-correlation `r[lag] = mean_i x[i] * y[i + lag]` over the overlapping
/// pairs, for lags `0..lags`.
pub fn cross_correlation(
    x: &[Real],
    y: &[Real],
    lags: usize,
) -> Result<Vec<Real>, ExecInvariantViolation> {
    let kernel = CrossCorrKernel::try_new(CrossCorrConfig { lags })?;
    kernel.run_alloc(x, y)
}
