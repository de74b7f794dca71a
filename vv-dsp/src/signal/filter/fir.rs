//! FIR filters: windowed-sinc low-pass design, streaming block application
//! with carried history, and FFT fast convolution.

use crate::kernel::{
    bind_input, bind_output, ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D, Write1D,
};
use crate::numeric::policy::{apply_in_place, apply_scalar, guard_input, nan_policy, NanPolicy};
use crate::signal::spectral::{FftConfig, FftDirection, FftKind, FftPlan};
use crate::signal::traits::StreamFilter1D;
use crate::signal::windows::WindowKind;
use crate::simd::AlignedBuffer;
use core::f64::consts::PI;
use vv_dsp_core::{Cpx, Real};

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Constructor config for [`FirDesignKernel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirDesignConfig {
    /// Number of taps `T`.
    pub taps: usize,
    /// Normalised cutoff in `(0, 1]`, where 1 is Nyquist.
    pub cutoff: Real,
    /// Window applied to the ideal response.
    pub window: WindowKind,
}

/// Windowed-sinc low-pass designer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirDesignKernel {
    taps: usize,
    cutoff: f64,
    window: WindowKind,
}

impl KernelLifecycle for FirDesignKernel {
    type Config = FirDesignConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.taps == 0 {
            return Err(ConfigError::EmptyInput { arg: "taps" });
        }
        if config.cutoff.is_nan() || config.cutoff <= 0.0 || config.cutoff > 1.0 {
            return Err(ConfigError::InvalidArgument {
                arg: "cutoff",
                reason: "cutoff must lie in (0, 1]",
            });
        }
        Ok(Self {
            taps: config.taps,
            cutoff: config.cutoff as f64,
            window: config.window,
        })
    }
}

impl FirDesignKernel {
    /// Number of taps.
    pub fn taps(&self) -> usize {
        self.taps
    }

    /// Write `h[k] = c sinc(c (k - (T-1)/2)) w[k]` into `out`, normalised to
    /// unit DC gain. A response whose sum vanishes is left unnormalised.
    pub fn design_into<O>(&self, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        O: Write1D<Real> + ?Sized,
    {
        let h = bind_output(out, "h", self.taps)?;
        let centre = (self.taps - 1) as f64 / 2.0;
        let mut taps = Vec::with_capacity(self.taps);
        for k in 0..self.taps {
            let ideal = self.cutoff * sinc(self.cutoff * (k as f64 - centre));
            taps.push(ideal * self.window.coefficient(k, self.taps));
        }
        let sum: f64 = taps.iter().sum();
        let gain = if sum.abs() > f64::EPSILON { sum } else { 1.0 };
        for (dst, v) in h.iter_mut().zip(taps) {
            *dst = (v / gain) as Real;
        }
        apply_in_place(h)
    }

    /// Allocate and design the coefficient table.
    pub fn design(&self) -> Result<Vec<Real>, ExecInvariantViolation> {
        let mut h = vec![0.0; self.taps];
        self.design_into(&mut h)?;
        Ok(h)
    }
}

///
/// Design a `taps`-long low-pass filter with normalised `cutoff`.
///
/// ```
/// use vv_dsp::signal::filter::fir_design_lowpass;
/// use vv_dsp::signal::windows::WindowKind;
///
/// let h = fir_design_lowpass(31, 0.25, WindowKind::Hamming).unwrap();
/// assert_eq!(h.len(), 31);
/// let dc: f64 = h.iter().map(|&v| v as f64).sum();
/// assert!((dc - 1.0).abs() < 1e-5);
/// assert!((h[0] - h[30]).abs() < 1e-7);
/// ```
///
pub fn fir_design_lowpass(
    taps: usize,
    cutoff: Real,
    window: WindowKind,
) -> Result<Vec<Real>, ExecInvariantViolation> {
    FirDesignKernel::try_new(FirDesignConfig {
        taps,
        cutoff,
        window,
    })?
    .design()
}

/// History of a streaming FIR filter: the last `T - 1` input samples in a
/// ring, written at `pos` modulo `T - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct FirState {
    taps: usize,
    history: Vec<Real>,
    pos: usize,
}

impl FirState {
    /// Zeroed state for a `taps`-long filter.
    pub fn new(taps: usize) -> Result<Self, ConfigError> {
        if taps == 0 {
            return Err(ConfigError::EmptyInput { arg: "taps" });
        }
        Ok(Self {
            taps,
            history: vec![0.0; taps - 1],
            pos: 0,
        })
    }

    /// Number of taps the state was sized for.
    pub fn taps(&self) -> usize {
        self.taps
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.pos = 0;
    }

    /// Filter `x` into `y` with coefficients `h`, continuing from the
    /// current history. Does not allocate.
    ///
    /// `y[i] = h[0] x[i] + sum_{k>=1} h[k] x[i-k]`, where samples before the
    /// block come from the history.
    pub fn apply(
        &mut self,
        h: &[Real],
        x: &[Real],
        y: &mut [Real],
    ) -> Result<(), ExecInvariantViolation> {
        if h.len() != self.taps {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "h",
                expected: self.taps,
                got: h.len(),
            });
        }
        if y.len() != x.len() {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "y",
                expected: x.len(),
                got: y.len(),
            });
        }
        let policy = nan_policy();
        let ring = self.history.len();
        for (i, (&s, dst)) in x.iter().zip(y.iter_mut()).enumerate() {
            let s = sanitize(s, policy, i)?;
            let mut acc = h[0] * s;
            if ring > 0 {
                let mut idx = self.pos;
                for &coeff in &h[1..] {
                    idx = if idx == 0 { ring - 1 } else { idx - 1 };
                    acc += coeff * self.history[idx];
                }
                self.history[self.pos] = s;
                self.pos = (self.pos + 1) % ring;
            }
            *dst = sanitize(acc, policy, i)?;
        }
        Ok(())
    }
}

#[inline]
fn sanitize(v: Real, policy: NanPolicy, index: usize) -> Result<Real, ExecInvariantViolation> {
    apply_scalar(v, policy).ok_or(ExecInvariantViolation::NonFinite { index })
}

/// Constructor config for [`FirFilterKernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct FirFilterConfig {
    /// Filter coefficients.
    pub coeffs: Vec<Real>,
}

/// Streaming FIR filter owning its coefficients and history.
#[derive(Debug, Clone, PartialEq)]
pub struct FirFilterKernel {
    coeffs: Vec<Real>,
    state: FirState,
}

impl FirFilterKernel {
    /// Filter coefficients.
    pub fn coeffs(&self) -> &[Real] {
        &self.coeffs
    }
}

impl KernelLifecycle for FirFilterKernel {
    type Config = FirFilterConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        let state = FirState::new(config.coeffs.len())
            .map_err(|_| ConfigError::EmptyInput { arg: "coeffs" })?;
        Ok(Self {
            coeffs: config.coeffs,
            state,
        })
    }
}

impl StreamFilter1D<Real> for FirFilterKernel {
    fn run_into<I, O>(&mut self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
        O: Write1D<Real> + ?Sized,
    {
        let input = bind_input(input, "input")?;
        let out = bind_output(out, "out", input.len())?;
        self.state.apply(&self.coeffs, input, out)
    }

    fn run_alloc<I>(&mut self, input: &I) -> Result<Vec<Real>, ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
    {
        let input = bind_input(input, "input")?;
        let mut out = vec![0.0; input.len()];
        self.state.apply(&self.coeffs, input, &mut out)?;
        Ok(out)
    }

    fn reset(&mut self) {
        self.state.reset();
    }
}

/// Smallest power of two holding the full linear convolution.
pub fn fft_convolution_len(signal_len: usize, taps: usize) -> usize {
    (signal_len + taps - 1).next_power_of_two()
}

/// Reusable transforms and buffers for FFT-based FIR application on a fixed
/// signal length and tap count.
#[derive(Debug, Clone)]
pub struct FirFftScratch {
    signal_len: usize,
    taps: usize,
    forward: FftPlan,
    backward: FftPlan,
    time: AlignedBuffer<Real>,
    x_spec: AlignedBuffer<Cpx>,
    h_spec: AlignedBuffer<Cpx>,
}

impl FirFftScratch {
    /// Allocate scratch for `signal_len` samples through a `taps`-long filter.
    pub fn new(signal_len: usize, taps: usize) -> Result<Self, ConfigError> {
        if signal_len == 0 {
            return Err(ConfigError::EmptyInput { arg: "signal_len" });
        }
        if taps == 0 {
            return Err(ConfigError::EmptyInput { arg: "taps" });
        }
        let nfft = fft_convolution_len(signal_len, taps);
        let forward = FftPlan::try_new(FftConfig {
            len: nfft,
            kind: FftKind::R2C,
            direction: FftDirection::Forward,
        })?;
        let backward = FftPlan::try_new(FftConfig {
            len: nfft,
            kind: FftKind::C2R,
            direction: FftDirection::Backward,
        })?;
        let bins = forward.bins();
        let alloc_failed = ConfigError::InvalidArgument {
            arg: "nfft",
            reason: "scratch allocation failed",
        };
        let time = AlignedBuffer::zeroed(nfft).ok_or(alloc_failed.clone())?;
        let x_spec = AlignedBuffer::zeroed(bins).ok_or(alloc_failed.clone())?;
        let h_spec = AlignedBuffer::zeroed(bins).ok_or(alloc_failed)?;
        tracing::debug!(signal_len, taps, nfft, "fft fir scratch created");
        Ok(Self {
            signal_len,
            taps,
            forward,
            backward,
            time,
            x_spec,
            h_spec,
        })
    }

    /// Transform length.
    pub fn nfft(&self) -> usize {
        self.time.len()
    }

    /// Write the first `N` samples of the linear convolution `h * x` into
    /// `y`, matching [`FirState::apply`] from zero history.
    pub fn apply(
        &mut self,
        h: &[Real],
        x: &[Real],
        y: &mut [Real],
    ) -> Result<(), ExecInvariantViolation> {
        if h.len() != self.taps {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "h",
                expected: self.taps,
                got: h.len(),
            });
        }
        if x.len() != self.signal_len {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "x",
                expected: self.signal_len,
                got: x.len(),
            });
        }
        if y.len() != self.signal_len {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "y",
                expected: self.signal_len,
                got: y.len(),
            });
        }
        tracing::trace!(n = x.len(), taps = h.len(), nfft = self.nfft(), "fft fir apply");
        let x = guard_input(x)?;

        self.time.clear();
        self.time[..h.len()].copy_from_slice(h);
        self.forward.execute_r2c(&self.time[..], &mut self.h_spec[..])?;

        self.time.clear();
        self.time[..x.len()].copy_from_slice(&x);
        self.forward.execute_r2c(&self.time[..], &mut self.x_spec[..])?;

        for (a, b) in self.x_spec.iter_mut().zip(self.h_spec.iter()) {
            *a *= *b;
        }
        self.backward.execute_c2r(&self.x_spec[..], &mut self.time[..])?;
        y.copy_from_slice(&self.time[..y.len()]);
        apply_in_place(y)
    }
}

///
/// Filter `x` through `h` by FFT fast convolution, keeping the first
/// `x.len()` output samples.
///
/// ```
/// use vv_dsp::signal::filter::fir_apply_fft;
///
/// let y = fir_apply_fft(&[0.5, 0.5], &[2., 4., 6.]).unwrap();
/// assert!((y[0] - 1.).abs() < 1e-5);
/// assert!((y[1] - 3.).abs() < 1e-5);
/// assert!((y[2] - 5.).abs() < 1e-5);
/// ```
///
pub fn fir_apply_fft(h: &[Real], x: &[Real]) -> Result<Vec<Real>, ExecInvariantViolation> {
    let mut scratch = FirFftScratch::new(x.len(), h.len())?;
    let mut y = vec![0.0; x.len()];
    scratch.apply(h, x, &mut y)?;
    Ok(y)
}
