//! Mel-scale filterbanks, log-mel spectrograms and MFCCs.
//!
//! Spectrogram matrices are row-major `frames x bins`, where a power
//! spectrogram of an `n_fft` point transform carries `n_fft / 2 + 1` bins.

use crate::kernel::{bind_input, ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D};
use crate::numeric::policy::{apply_in_place, guard_input};
use crate::signal::spectral::{DctConfig, DctPlan, DctVariant, FftDirection, Stft};
use crate::signal::traits::Transform1D;
use core::f64::consts::PI;
use ndarray::{s, Array2, ArrayView2};
use vv_dsp_core::Real;

const SLANEY_F_SP: f64 = 200.0 / 3.0;
const SLANEY_MIN_LOG_HZ: f64 = 1000.0;
const SLANEY_MIN_LOG_MEL: f64 = SLANEY_MIN_LOG_HZ / SLANEY_F_SP;

fn slaney_logstep() -> f64 {
    6.4f64.ln() / 27.0
}

/// Mel scale flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MelVariant {
    /// `2595 log10(1 + f / 700)`.
    #[default]
    Htk,
    /// Linear below 1 kHz (`f / (200/3)`), logarithmic above.
    Slaney,
}

impl MelVariant {
    fn to_mel(self, hz: f64) -> f64 {
        if hz < 0.0 {
            return 0.0;
        }
        match self {
            MelVariant::Htk => 2595.0 * (1.0 + hz / 700.0).log10(),
            MelVariant::Slaney if hz < SLANEY_MIN_LOG_HZ => hz / SLANEY_F_SP,
            MelVariant::Slaney => {
                SLANEY_MIN_LOG_MEL + (hz / SLANEY_MIN_LOG_HZ).ln() / slaney_logstep()
            }
        }
    }

    fn to_hz(self, mel: f64) -> f64 {
        if mel < 0.0 {
            return 0.0;
        }
        match self {
            MelVariant::Htk => 700.0 * (10f64.powf(mel / 2595.0) - 1.0),
            MelVariant::Slaney if mel < SLANEY_MIN_LOG_MEL => mel * SLANEY_F_SP,
            MelVariant::Slaney => {
                SLANEY_MIN_LOG_HZ * ((mel - SLANEY_MIN_LOG_MEL) * slaney_logstep()).exp()
            }
        }
    }

    /// Frequency in Hz to mel. Negative input maps to 0.
    pub fn hz_to_mel(self, hz: Real) -> Real {
        self.to_mel(hz as f64) as Real
    }

    /// Mel to frequency in Hz. Negative input maps to 0.
    pub fn mel_to_hz(self, mel: Real) -> Real {
        self.to_hz(mel as f64) as Real
    }
}

/// HTK mel of `hz`.
///
/// ```
/// use vv_dsp::signal::features::{hz_to_mel, mel_to_hz};
///
/// let mel = hz_to_mel(700.);
/// assert!((mel - 2595. * (2.0 as vv_dsp::Real).log10()).abs() < 1e-2);
/// assert!((mel_to_hz(mel) - 700.).abs() < 1e-2);
/// ```
pub fn hz_to_mel(hz: Real) -> Real {
    MelVariant::Htk.hz_to_mel(hz)
}

/// HTK frequency in Hz of `mel`.
pub fn mel_to_hz(mel: Real) -> Real {
    MelVariant::Htk.mel_to_hz(mel)
}

/// Constructor config for [`MelFilterbank`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MelFilterbankConfig {
    /// Transform length; the bank spans `n_fft / 2 + 1` bins.
    pub n_fft: usize,
    /// Number of triangular filters, fewer than the bin count.
    pub n_mels: usize,
    /// Sample rate in Hz.
    pub sample_rate: Real,
    /// Lower band edge in Hz, `>= 0`.
    pub fmin: Real,
    /// Upper band edge in Hz, `fmin < fmax <= sample_rate / 2`.
    pub fmax: Real,
    /// Mel scale used to space the filters.
    pub variant: MelVariant,
}

/// Triangular mel filterbank, `n_mels x (n_fft / 2 + 1)`.
///
/// Filter `m` rises from mel edge `m` to edge `m + 1` and falls to edge
/// `m + 2`, with `n_mels + 2` edges spaced evenly between `fmin` and `fmax`
/// on the mel scale. Every filter that covers at least one bin is scaled to
/// unit sum.
#[derive(Debug, Clone, PartialEq)]
pub struct MelFilterbank {
    n_fft: usize,
    variant: MelVariant,
    weights: Array2<Real>,
}

impl KernelLifecycle for MelFilterbank {
    type Config = MelFilterbankConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        let MelFilterbankConfig {
            n_fft,
            n_mels,
            sample_rate,
            fmin,
            fmax,
            variant,
        } = config;
        if n_fft == 0 {
            return Err(ConfigError::EmptyInput { arg: "n_fft" });
        }
        if n_mels == 0 {
            return Err(ConfigError::EmptyInput { arg: "n_mels" });
        }
        if sample_rate.is_nan() || sample_rate <= 0.0 {
            return Err(ConfigError::InvalidArgument {
                arg: "sample_rate",
                reason: "sample rate must be positive",
            });
        }
        if fmin.is_nan() || fmax.is_nan() || fmin < 0.0 || fmax <= fmin {
            return Err(ConfigError::InvalidArgument {
                arg: "fmin",
                reason: "band edges need 0 <= fmin < fmax",
            });
        }
        if fmax > sample_rate / 2.0 {
            return Err(ConfigError::InvalidArgument {
                arg: "fmax",
                reason: "upper band edge lies above Nyquist",
            });
        }
        let bins = n_fft / 2 + 1;
        if n_mels >= bins {
            return Err(ConfigError::LengthMismatch {
                arg: "n_mels",
                expected: bins - 1,
                got: n_mels,
            });
        }

        let mel_lo = variant.to_mel(fmin as f64);
        let mel_hi = variant.to_mel(fmax as f64);
        let step = (mel_hi - mel_lo) / (n_mels + 1) as f64;
        let edges: Vec<f64> = (0..n_mels + 2)
            .map(|i| variant.to_hz(mel_lo + step * i as f64))
            .collect();
        let bin_hz = sample_rate as f64 / n_fft as f64;

        let mut weights = Array2::<Real>::zeros((n_mels, bins));
        let mut empty = 0usize;
        for (m, mut row) in weights.outer_iter_mut().enumerate() {
            let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
            let mut tri = vec![0.0f64; bins];
            for (k, w) in tri.iter_mut().enumerate() {
                let f = k as f64 * bin_hz;
                if f >= left && f < center {
                    *w = (f - left) / (center - left);
                } else if f >= center && f < right {
                    *w = (right - f) / (right - center);
                }
            }
            let sum: f64 = tri.iter().sum();
            if sum > 0.0 {
                for (dst, w) in row.iter_mut().zip(&tri) {
                    *dst = (w / sum) as Real;
                }
            } else {
                empty += 1;
            }
        }
        if empty > 0 {
            tracing::warn!(empty, n_mels, n_fft, "mel filters cover no fft bin");
        }
        tracing::debug!(
            n_fft,
            n_mels,
            sample_rate = sample_rate as f64,
            fmin = fmin as f64,
            fmax = fmax as f64,
            variant = ?variant,
            "mel filterbank created"
        );
        Ok(Self {
            n_fft,
            variant,
            weights,
        })
    }
}

impl MelFilterbank {
    /// Transform length the bank was built for.
    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    /// Number of filters.
    pub fn n_mels(&self) -> usize {
        self.weights.nrows()
    }

    /// Bins per spectrogram row, `n_fft / 2 + 1`.
    pub fn n_bins(&self) -> usize {
        self.weights.ncols()
    }

    /// Mel scale.
    pub fn variant(&self) -> MelVariant {
        self.variant
    }

    /// Filter weights, one filter per row.
    pub fn weights(&self) -> ArrayView2<'_, Real> {
        self.weights.view()
    }

    /// Filter energies of every power spectrogram row, `frames x n_mels`.
    pub fn mel_energies(
        &self,
        power: ArrayView2<'_, Real>,
    ) -> Result<Array2<Real>, ExecInvariantViolation> {
        let (frames, bins) = power.dim();
        if frames == 0 {
            return Err(ExecInvariantViolation::EmptyInput { arg: "power" });
        }
        if bins != self.n_bins() {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "power",
                expected: self.n_bins(),
                got: bins,
            });
        }
        let power = power.as_standard_layout();
        let flat = power
            .as_slice()
            .ok_or(ConfigError::NonContiguous { arg: "power" })?;
        let flat = guard_input(flat)?;
        let power = ArrayView2::from_shape((frames, bins), &flat[..]).map_err(|_| {
            ExecInvariantViolation::Backend {
                reason: "power shape mismatch",
            }
        })?;
        tracing::trace!(frames, n_mels = self.n_mels(), "mel energies");
        Ok(power.dot(&self.weights.t()))
    }

    /// `ln(E + log_epsilon)` of every filter energy `E`, `frames x n_mels`.
    ///
    /// ```
    /// use ndarray::Array2;
    /// use vv_dsp::kernel::KernelLifecycle;
    /// use vv_dsp::signal::features::{MelFilterbank, MelFilterbankConfig, MelVariant};
    ///
    /// let bank = MelFilterbank::try_new(MelFilterbankConfig {
    ///     n_fft: 512,
    ///     n_mels: 20,
    ///     sample_rate: 16_000.,
    ///     fmin: 0.,
    ///     fmax: 8_000.,
    ///     variant: MelVariant::Htk,
    /// })
    /// .unwrap();
    /// let power = Array2::from_elem((3, bank.n_bins()), 4.);
    /// let log_mel = bank.log_mel_spectrogram(power.view(), 0.).unwrap();
    /// assert_eq!(log_mel.dim(), (3, 20));
    /// assert!(log_mel.iter().all(|v| (v - (4.0 as vv_dsp::Real).ln()).abs() < 1e-4));
    /// ```
    pub fn log_mel_spectrogram(
        &self,
        power: ArrayView2<'_, Real>,
        log_epsilon: Real,
    ) -> Result<Array2<Real>, ExecInvariantViolation> {
        if log_epsilon.is_nan() || log_epsilon < 0.0 {
            return Err(ExecInvariantViolation::InvalidState {
                reason: "log_epsilon must be non-negative",
            });
        }
        let mut out = self
            .mel_energies(power)?
            .mapv(|e| (e + log_epsilon).ln());
        let flat = out
            .as_slice_memory_order_mut()
            .ok_or(ConfigError::NonContiguous { arg: "log_mel" })?;
        apply_in_place(flat)?;
        Ok(out)
    }
}

/// Power spectrogram `|X[k]|^2` over the non-negative bins of every whole
/// STFT frame, `frames x (M / 2 + 1)`.
pub fn power_spectrogram<I>(
    stft: &mut Stft,
    signal: &I,
) -> Result<Array2<Real>, ExecInvariantViolation>
where
    I: Read1D<Real> + ?Sized,
{
    let bins = stft.fft_size() / 2 + 1;
    let magnitude = stft.spectrogram_alloc(signal)?;
    Ok(magnitude.slice(s![.., ..bins]).mapv(|v| v * v))
}

/// Sine lifter weights `1 + L/2 sin(pi i / L)` for `i >= 1`; `c[0]` and
/// `L == 0` keep unit weight.
fn lifter_weights(n_coeffs: usize, lifter: Real) -> Vec<Real> {
    let l = lifter as f64;
    (0..n_coeffs)
        .map(|i| {
            if i == 0 || l == 0.0 {
                1.0
            } else {
                (1.0 + 0.5 * l * (PI * i as f64 / l).sin()) as Real
            }
        })
        .collect()
}

fn check_cepstrum(n_mels: usize, n_coeffs: usize, lifter: Real) -> Result<(), ConfigError> {
    if n_coeffs == 0 {
        return Err(ConfigError::EmptyInput { arg: "n_coeffs" });
    }
    if n_coeffs > n_mels {
        return Err(ConfigError::LengthMismatch {
            arg: "n_coeffs",
            expected: n_mels,
            got: n_coeffs,
        });
    }
    if lifter.is_nan() || lifter < 0.0 {
        return Err(ConfigError::InvalidArgument {
            arg: "lifter",
            reason: "lifter must be non-negative",
        });
    }
    Ok(())
}

fn dct_for(n_mels: usize) -> Result<DctPlan, ConfigError> {
    DctPlan::try_new(DctConfig {
        len: n_mels,
        variant: DctVariant::II,
        direction: FftDirection::Forward,
    })
}

fn cepstrum(
    dct: &DctPlan,
    lifter: &[Real],
    log_mel: ArrayView2<'_, Real>,
) -> Result<Array2<Real>, ExecInvariantViolation> {
    let (frames, n_mels) = log_mel.dim();
    if frames == 0 {
        return Err(ExecInvariantViolation::EmptyInput { arg: "log_mel" });
    }
    if n_mels != dct.len() {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg: "log_mel",
            expected: dct.len(),
            got: n_mels,
        });
    }
    let mut out = Array2::zeros((frames, lifter.len()));
    let mut row_in = vec![0.0; n_mels];
    let mut row_out = vec![0.0; n_mels];
    for (src, mut dst) in log_mel.outer_iter().zip(out.outer_iter_mut()) {
        for (d, &v) in row_in.iter_mut().zip(src.iter()) {
            *d = v;
        }
        dct.run_into(&row_in, &mut row_out)?;
        for ((d, &c), &w) in dst.iter_mut().zip(&row_out).zip(lifter) {
            *d = c * w;
        }
    }
    Ok(out)
}

/// First `n_coeffs` unnormalised DCT-II coefficients of every log-mel row,
/// liftered when `lifter > 0`. Output is `frames x n_coeffs`.
///
/// ```
/// use ndarray::Array2;
/// use vv_dsp::signal::features::mfcc;
///
/// let log_mel = Array2::from_elem((2, 8), 1.5);
/// let c = mfcc(log_mel.view(), 4, 0.).unwrap();
/// assert!((c[[0, 0]] - 12.).abs() < 1e-4);
/// assert!(c[[1, 3]].abs() < 1e-4);
/// ```
pub fn mfcc(
    log_mel: ArrayView2<'_, Real>,
    n_coeffs: usize,
    lifter: Real,
) -> Result<Array2<Real>, ExecInvariantViolation> {
    let n_mels = log_mel.ncols();
    if n_mels == 0 {
        return Err(ExecInvariantViolation::EmptyInput { arg: "log_mel" });
    }
    check_cepstrum(n_mels, n_coeffs, lifter)?;
    let dct = dct_for(n_mels)?;
    cepstrum(&dct, &lifter_weights(n_coeffs, lifter), log_mel)
}

/// Constructor config for [`Mfcc`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MfccConfig {
    /// Filterbank the power spectrogram passes through.
    pub filterbank: MelFilterbankConfig,
    /// Coefficients kept per frame, `1..=n_mels`.
    pub n_coeffs: usize,
    /// Sine lifter length `L`; 0 disables liftering.
    pub lifter: Real,
    /// Offset added to filter energies before the logarithm.
    pub log_epsilon: Real,
}

/// MFCC plan: filterbank, log compression, DCT-II and lifter.
///
/// ```
/// use vv_dsp::kernel::KernelLifecycle;
/// use vv_dsp::signal::features::{MelFilterbankConfig, MelVariant, Mfcc, MfccConfig};
/// use vv_dsp::signal::spectral::{Stft, StftConfig};
/// use vv_dsp::signal::windows::WindowKind;
///
/// let mfcc = Mfcc::try_new(MfccConfig {
///     filterbank: MelFilterbankConfig {
///         n_fft: 256,
///         n_mels: 26,
///         sample_rate: 8_000.,
///         fmin: 0.,
///         fmax: 4_000.,
///         variant: MelVariant::Htk,
///     },
///     n_coeffs: 13,
///     lifter: 22.,
///     log_epsilon: 1e-10,
/// })
/// .unwrap();
/// let mut stft = Stft::try_new(StftConfig {
///     fft_size: 256,
///     hop_size: 128,
///     window: WindowKind::Hann,
/// })
/// .unwrap();
/// let x: Vec<vv_dsp::Real> = (0..1024).map(|n| (0.3 * n as vv_dsp::Real).sin()).collect();
/// let coeffs = mfcc.process_signal(&mut stft, &x).unwrap();
/// assert_eq!(coeffs.dim(), (7, 13));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Mfcc {
    filterbank: MelFilterbank,
    dct: DctPlan,
    lifter: Vec<Real>,
    log_epsilon: Real,
}

impl KernelLifecycle for Mfcc {
    type Config = MfccConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        let filterbank = MelFilterbank::try_new(config.filterbank)?;
        check_cepstrum(filterbank.n_mels(), config.n_coeffs, config.lifter)?;
        if config.log_epsilon.is_nan() || config.log_epsilon < 0.0 {
            return Err(ConfigError::InvalidArgument {
                arg: "log_epsilon",
                reason: "log offset must be non-negative",
            });
        }
        let dct = dct_for(filterbank.n_mels())?;
        tracing::debug!(
            n_mels = filterbank.n_mels(),
            n_coeffs = config.n_coeffs,
            lifter = config.lifter as f64,
            "mfcc plan created"
        );
        Ok(Self {
            filterbank,
            dct,
            lifter: lifter_weights(config.n_coeffs, config.lifter),
            log_epsilon: config.log_epsilon,
        })
    }
}

impl Mfcc {
    /// Underlying filterbank.
    pub fn filterbank(&self) -> &MelFilterbank {
        &self.filterbank
    }

    /// Coefficients produced per frame.
    pub fn n_coeffs(&self) -> usize {
        self.lifter.len()
    }

    /// MFCCs of a power spectrogram, `frames x n_coeffs`.
    pub fn process(
        &self,
        power: ArrayView2<'_, Real>,
    ) -> Result<Array2<Real>, ExecInvariantViolation> {
        tracing::trace!(frames = power.nrows(), "mfcc process");
        let log_mel = self
            .filterbank
            .log_mel_spectrogram(power, self.log_epsilon)?;
        cepstrum(&self.dct, &self.lifter, log_mel.view())
    }

    /// MFCCs of every whole STFT frame of `signal`. The STFT frame length
    /// must equal the filterbank's `n_fft`.
    pub fn process_signal<I>(
        &self,
        stft: &mut Stft,
        signal: &I,
    ) -> Result<Array2<Real>, ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
    {
        if stft.fft_size() != self.filterbank.n_fft() {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "stft",
                expected: self.filterbank.n_fft(),
                got: stft.fft_size(),
            });
        }
        let signal = bind_input(signal, "signal")?;
        let power = power_spectrogram(stft, signal)?;
        self.process(power.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::{NanPolicy, ScopedNanPolicy};
    use crate::signal::spectral::StftConfig;
    use crate::signal::windows::WindowKind;
    use approx::assert_abs_diff_eq;
    use rand::Rng;
    use vv_dsp_core::Status;

    #[cfg(feature = "use_double")]
    const TOL: Real = 1e-10;
    #[cfg(not(feature = "use_double"))]
    const TOL: Real = 1e-4;

    fn bank_config(n_fft: usize, n_mels: usize, variant: MelVariant) -> MelFilterbankConfig {
        MelFilterbankConfig {
            n_fft,
            n_mels,
            sample_rate: 16_000.0,
            fmin: 0.0,
            fmax: 8_000.0,
            variant,
        }
    }

    #[test]
    fn htk_scale_and_inverse() {
        assert_abs_diff_eq!(hz_to_mel(0.0), 0.0);
        assert_abs_diff_eq!(hz_to_mel(-5.0), 0.0);
        assert_abs_diff_eq!(mel_to_hz(-5.0), 0.0);
        assert_abs_diff_eq!(hz_to_mel(700.0), 2595.0 * (2.0 as Real).log10(), epsilon = 1e-2);
        for hz in [10.0, 440.0, 1000.0, 7999.0] {
            assert_abs_diff_eq!(mel_to_hz(hz_to_mel(hz)), hz, epsilon = 1e-2);
        }
    }

    #[test]
    fn slaney_is_linear_below_one_kilohertz() {
        let v = MelVariant::Slaney;
        assert_abs_diff_eq!(v.hz_to_mel(500.0), 7.5, epsilon = TOL);
        assert_abs_diff_eq!(v.hz_to_mel(1000.0), 15.0, epsilon = TOL);
        assert_abs_diff_eq!(v.hz_to_mel(6400.0), 42.0, epsilon = 1e-3);
        for hz in [100.0, 999.0, 2500.0, 7000.0] {
            assert_abs_diff_eq!(v.mel_to_hz(v.hz_to_mel(hz)), hz, epsilon = 1e-2);
        }
    }

    #[test]
    fn filters_are_unit_sum_triangles_in_ascending_order() {
        for variant in [MelVariant::Htk, MelVariant::Slaney] {
            let bank = MelFilterbank::try_new(bank_config(512, 24, variant)).expect("bank");
            assert_eq!(bank.weights().dim(), (24, 257));
            let mut last_peak = 0usize;
            for (m, row) in bank.weights().outer_iter().enumerate() {
                assert!(row.iter().all(|&w| w >= 0.0));
                assert_abs_diff_eq!(row.sum(), 1.0, epsilon = TOL);
                let peak = row
                    .iter()
                    .enumerate()
                    .fold((0, 0.0), |acc, (k, &w)| if w > acc.1 { (k, w) } else { acc })
                    .0;
                if m > 0 {
                    assert!(peak > last_peak, "filter {m} peaks at {peak}");
                }
                last_peak = peak;
            }
        }
    }

    #[test]
    fn band_edges_bound_the_support() {
        let mut config = bank_config(256, 10, MelVariant::Htk);
        config.fmin = 300.0;
        config.fmax = 3_400.0;
        let bank = MelFilterbank::try_new(config).expect("bank");
        let bin_hz = 16_000.0 / 256.0;
        for row in bank.weights().outer_iter() {
            for (k, &w) in row.iter().enumerate() {
                let f = k as Real * bin_hz;
                if f <= 300.0 || f >= 3_400.0 {
                    assert_eq!(w, 0.0, "bin {k} at {f} Hz");
                }
            }
        }
    }

    #[test]
    fn invalid_banks_are_rejected() {
        let mut zero = bank_config(0, 4, MelVariant::Htk);
        assert_eq!(
            MelFilterbank::try_new(zero).expect_err("n_fft").status(),
            Status::InvalidSize
        );
        zero = bank_config(64, 0, MelVariant::Htk);
        assert_eq!(
            MelFilterbank::try_new(zero).expect_err("n_mels").status(),
            Status::InvalidSize
        );
        let crowded = bank_config(16, 9, MelVariant::Htk);
        assert_eq!(
            MelFilterbank::try_new(crowded).expect_err("crowded").status(),
            Status::InvalidSize
        );
        let mut above = bank_config(64, 4, MelVariant::Htk);
        above.fmax = 9_000.0;
        assert_eq!(
            MelFilterbank::try_new(above).expect_err("nyquist").status(),
            Status::OutOfRange
        );
        let mut inverted = bank_config(64, 4, MelVariant::Htk);
        inverted.fmin = 8_000.0;
        assert_eq!(
            MelFilterbank::try_new(inverted).expect_err("edges").status(),
            Status::OutOfRange
        );
        let mut rate = bank_config(64, 4, MelVariant::Htk);
        rate.sample_rate = 0.0;
        assert!(MelFilterbank::try_new(rate).is_err());
    }

    #[test]
    fn log_mel_of_flat_power_is_flat() {
        let bank = MelFilterbank::try_new(bank_config(512, 20, MelVariant::Htk)).expect("bank");
        let power = Array2::from_elem((4, bank.n_bins()), 2.0);
        let log_mel = bank.log_mel_spectrogram(power.view(), 0.5).expect("log mel");
        assert_eq!(log_mel.dim(), (4, 20));
        for v in log_mel.iter() {
            assert_abs_diff_eq!(*v, (2.5 as Real).ln(), epsilon = TOL);
        }
    }

    #[test]
    fn log_mel_validates_its_input() {
        let bank = MelFilterbank::try_new(bank_config(64, 8, MelVariant::Htk)).expect("bank");
        let wrong = Array2::<Real>::zeros((2, 32));
        let err = bank.log_mel_spectrogram(wrong.view(), 0.0).expect_err("bins");
        assert_eq!(err.status(), Status::InvalidSize);
        let empty = Array2::<Real>::zeros((0, 33));
        let err = bank.log_mel_spectrogram(empty.view(), 0.0).expect_err("frames");
        assert_eq!(err.status(), Status::InvalidSize);
        let ok = Array2::<Real>::ones((1, 33));
        let err = bank.log_mel_spectrogram(ok.view(), -1.0).expect_err("epsilon");
        assert_eq!(err.status(), Status::OutOfRange);
    }

    #[test]
    fn transposed_power_views_are_accepted() {
        let bank = MelFilterbank::try_new(bank_config(64, 8, MelVariant::Htk)).expect("bank");
        let mut rng = rand::rng();
        let stored = Array2::from_shape_fn((33, 3), |_| rng.random_range(0.0..1.0));
        let owned = stored.t().to_owned();
        let a = bank.mel_energies(stored.t()).expect("view");
        let b = bank.mel_energies(owned.view()).expect("owned");
        for (x, y) in a.iter().zip(b.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = TOL);
        }
    }

    #[test]
    fn error_policy_rejects_nan_power() {
        let _guard = ScopedNanPolicy::new(NanPolicy::Error);
        let bank = MelFilterbank::try_new(bank_config(64, 8, MelVariant::Htk)).expect("bank");
        let mut power = Array2::<Real>::ones((2, 33));
        power[[1, 5]] = Real::NAN;
        let err = bank.mel_energies(power.view()).expect_err("nan");
        assert_eq!(err.status(), Status::NanInfDetected);
    }

    #[test]
    fn mfcc_matches_dct_and_lifter() {
        let mut rng = rand::rng();
        let log_mel = Array2::from_shape_fn((3, 12), |_| rng.random_range(-2.0..2.0));
        let plain = mfcc(log_mel.view(), 6, 0.0).expect("plain");
        let liftered = mfcc(log_mel.view(), 6, 22.0).expect("liftered");
        for (f, row) in log_mel.outer_iter().enumerate() {
            let dct = dct_forward_row(row.to_vec());
            for i in 0..6 {
                assert_abs_diff_eq!(plain[[f, i]], dct[i], epsilon = TOL * 10.0);
                let w = if i == 0 {
                    1.0
                } else {
                    1.0 + 11.0 * (core::f64::consts::PI * i as f64 / 22.0).sin() as Real
                };
                assert_abs_diff_eq!(liftered[[f, i]], dct[i] * w, epsilon = TOL * 100.0);
            }
        }
    }

    fn dct_forward_row(row: Vec<Real>) -> Vec<Real> {
        crate::signal::spectral::dct_forward(&row, DctVariant::II).expect("dct")
    }

    #[test]
    fn mfcc_validates_coefficients() {
        let log_mel = Array2::<Real>::zeros((2, 8));
        let err = mfcc(log_mel.view(), 9, 0.0).expect_err("too many");
        assert_eq!(err.status(), Status::InvalidSize);
        let err = mfcc(log_mel.view(), 0, 0.0).expect_err("none");
        assert_eq!(err.status(), Status::InvalidSize);
        let err = mfcc(log_mel.view(), 4, -1.0).expect_err("lifter");
        assert_eq!(err.status(), Status::OutOfRange);
        let empty = Array2::<Real>::zeros((0, 8));
        let err = mfcc(empty.view(), 4, 0.0).expect_err("frames");
        assert_eq!(err.status(), Status::InvalidSize);
    }

    fn plan(n_coeffs: usize) -> Mfcc {
        Mfcc::try_new(MfccConfig {
            filterbank: bank_config(256, 20, MelVariant::Htk),
            n_coeffs,
            lifter: 22.0,
            log_epsilon: 1e-6,
        })
        .expect("mfcc plan")
    }

    #[test]
    fn plan_is_the_composition_of_its_stages() {
        let mfcc_plan = plan(13);
        let mut rng = rand::rng();
        let power = Array2::from_shape_fn((5, 129), |_| rng.random_range(0.0..4.0));
        let got = mfcc_plan.process(power.view()).expect("process");
        let log_mel = mfcc_plan
            .filterbank()
            .log_mel_spectrogram(power.view(), 1e-6)
            .expect("log mel");
        let expected = mfcc(log_mel.view(), 13, 22.0).expect("mfcc");
        assert_eq!(got.dim(), (5, 13));
        for (a, b) in got.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = TOL);
        }
    }

    #[test]
    fn plan_rejects_bad_config() {
        let mut config = MfccConfig {
            filterbank: bank_config(256, 20, MelVariant::Htk),
            n_coeffs: 21,
            lifter: 0.0,
            log_epsilon: 0.0,
        };
        assert_eq!(
            Mfcc::try_new(config).expect_err("coeffs").status(),
            Status::InvalidSize
        );
        config.n_coeffs = 13;
        config.log_epsilon = -1.0;
        assert_eq!(
            Mfcc::try_new(config).expect_err("epsilon").status(),
            Status::OutOfRange
        );
    }

    #[test]
    fn power_spectrogram_keeps_the_positive_half() {
        let mut stft = Stft::try_new(StftConfig {
            fft_size: 16,
            hop_size: 16,
            window: WindowKind::Rectangular,
        })
        .expect("stft");
        let x: Vec<Real> = (0..32)
            .map(|n| (2.0 * core::f64::consts::PI * 2.0 * n as f64 / 16.0).cos() as Real)
            .collect();
        let power = power_spectrogram(&mut stft, &x).expect("power");
        assert_eq!(power.dim(), (2, 9));
        for row in power.outer_iter() {
            for (k, &p) in row.iter().enumerate() {
                let expected = if k == 2 { 64.0 } else { 0.0 };
                assert_abs_diff_eq!(p, expected, epsilon = TOL * 100.0);
            }
        }
    }

    #[test]
    fn signal_path_checks_the_frame_length() {
        let mfcc_plan = plan(13);
        let mut stft = Stft::try_new(StftConfig {
            fft_size: 128,
            hop_size: 64,
            window: WindowKind::Hann,
        })
        .expect("stft");
        let x = vec![0.1; 512];
        let err = mfcc_plan
            .process_signal(&mut stft, &x)
            .expect_err("frame length");
        assert_eq!(err.status(), Status::InvalidSize);
    }

    #[test]
    fn signal_path_matches_the_power_path() {
        let mfcc_plan = plan(8);
        let mut stft = Stft::try_new(StftConfig {
            fft_size: 256,
            hop_size: 128,
            window: WindowKind::Hann,
        })
        .expect("stft");
        let mut rng = rand::rng();
        let x: Vec<Real> = (0..1024).map(|_| rng.random_range(-1.0..1.0)).collect();
        let from_signal = mfcc_plan.process_signal(&mut stft, &x).expect("signal");
        let power = power_spectrogram(&mut stft, &x).expect("power");
        let from_power = mfcc_plan.process(power.view()).expect("power path");
        assert_eq!(from_signal.dim(), (7, 8));
        assert_eq!(from_signal, from_power);
    }
}
