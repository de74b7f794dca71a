//! Rational-ratio resampling of whole buffers by linear or windowed-sinc
//! interpolation.

use crate::kernel::{
    bind_input, bind_output_capacity, ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D,
    Write1D,
};
use crate::signal::interpolate::interpolate_linear;
use crate::signal::traits::Resample1D;
use crate::signal::windows::WindowKind;
use core::f64::consts::PI;
use vv_dsp_core::Real;

/// Default sinc kernel length.
pub const DEFAULT_TAPS: usize = 32;
const MIN_TAPS: usize = 4;
const MAX_TAPS: usize = 128;

/// Interpolation used between input samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResampleQuality {
    /// Two-point linear interpolation.
    #[default]
    Linear,
    /// Hann-windowed sinc with an anti-aliasing cutoff of `min(1, L/M)`.
    Sinc,
}

/// Constructor config for [`Resampler`]. The output rate is `num / den`
/// times the input rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResamplerConfig {
    /// Interpolation factor `L`.
    pub num: u32,
    /// Decimation factor `M`.
    pub den: u32,
    /// Interpolation scheme.
    pub quality: ResampleQuality,
    /// Sinc kernel length; clamped to `[4, 128]` and rounded up to even.
    pub taps: usize,
}

impl Default for ResamplerConfig {
    fn default() -> Self {
        Self {
            num: 1,
            den: 1,
            quality: ResampleQuality::Linear,
            taps: DEFAULT_TAPS,
        }
    }
}

/// Fixed-ratio resampler. Holds no signal state; every call processes one
/// self-contained buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resampler {
    num: u32,
    den: u32,
    quality: ResampleQuality,
    taps: usize,
    cutoff: f64,
}

fn clamp_taps(taps: usize) -> usize {
    let taps = taps.clamp(MIN_TAPS, MAX_TAPS);
    taps + taps % 2
}

fn check_ratio(num: u32, den: u32) -> Result<(), ConfigError> {
    if num == 0 {
        return Err(ConfigError::InvalidArgument {
            arg: "num",
            reason: "ratio numerator must be > 0",
        });
    }
    if den == 0 {
        return Err(ConfigError::InvalidArgument {
            arg: "den",
            reason: "ratio denominator must be > 0",
        });
    }
    Ok(())
}

fn cutoff_for(num: u32, den: u32) -> f64 {
    (num as f64 / den as f64).min(1.0)
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

impl KernelLifecycle for Resampler {
    type Config = ResamplerConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        check_ratio(config.num, config.den)?;
        let resampler = Self {
            num: config.num,
            den: config.den,
            quality: config.quality,
            taps: clamp_taps(config.taps),
            cutoff: cutoff_for(config.num, config.den),
        };
        tracing::debug!(
            num = resampler.num,
            den = resampler.den,
            quality = ?resampler.quality,
            taps = resampler.taps,
            cutoff = resampler.cutoff,
            "resampler created"
        );
        Ok(resampler)
    }
}

impl Resampler {
    /// Ratio `(L, M)`.
    pub fn ratio(&self) -> (u32, u32) {
        (self.num, self.den)
    }

    /// Interpolation scheme.
    pub fn quality(&self) -> ResampleQuality {
        self.quality
    }

    /// Effective sinc kernel length.
    pub fn taps(&self) -> usize {
        self.taps
    }

    /// Normalised anti-aliasing cutoff.
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Change the ratio; the cutoff follows. Zero terms are rejected and
    /// leave the resampler unchanged.
    pub fn set_ratio(&mut self, num: u32, den: u32) -> Result<(), ConfigError> {
        check_ratio(num, den)?;
        self.num = num;
        self.den = den;
        self.cutoff = cutoff_for(num, den);
        tracing::debug!(num, den, cutoff = self.cutoff, "resampler ratio updated");
        Ok(())
    }

    /// Change the scheme and kernel length.
    pub fn set_quality(&mut self, quality: ResampleQuality, taps: usize) {
        self.quality = quality;
        self.taps = clamp_taps(taps);
    }

    /// `floor((n - 1) L / M) + 1` for `n > 0`, else 0.
    pub fn output_len(&self, input_len: usize) -> usize {
        if input_len == 0 {
            return 0;
        }
        let scaled = (input_len as u128 - 1) * self.num as u128 / self.den as u128;
        scaled as usize + 1
    }

    /// Resample `input` into the front of `out`, returning the number of
    /// samples written. Nothing is written when `out` is too short.
    pub fn process_into(
        &self,
        input: &[Real],
        out: &mut [Real],
    ) -> Result<usize, ExecInvariantViolation> {
        if input.is_empty() {
            return Err(ExecInvariantViolation::EmptyInput { arg: "input" });
        }
        let out_n = self.output_len(input.len());
        let out = bind_output_capacity(out, "out", out_n)?;
        tracing::trace!(n = input.len(), out_n, quality = ?self.quality, "resample");
        let step = self.den as f64 / self.num as f64;
        match self.quality {
            ResampleQuality::Linear => {
                for (k, dst) in out.iter_mut().enumerate() {
                    *dst = interpolate_linear(input, (k as f64 * step) as Real);
                }
            }
            ResampleQuality::Sinc => {
                for (k, dst) in out.iter_mut().enumerate() {
                    *dst = self.sinc_sample(input, k as f64 * step);
                }
            }
        }
        Ok(out_n)
    }

    fn sinc_sample(&self, x: &[Real], pos: f64) -> Real {
        let half = (self.taps / 2) as i64;
        let centre = pos.floor() as i64;
        let last = x.len() as i64 - 1;
        let mut acc = 0.0;
        let mut wsum = 0.0;
        for m in -half..half {
            let idx = centre + m;
            let weight = sinc(self.cutoff * (idx as f64 - pos))
                * WindowKind::Hann.coefficient((m + half) as usize, self.taps);
            acc += x[idx.clamp(0, last) as usize] as f64 * weight;
            wsum += weight;
        }
        if wsum != 0.0 {
            acc /= wsum;
        }
        acc as Real
    }
}

impl Resample1D<Real> for Resampler {
    fn output_len(&self, input_len: usize) -> usize {
        Resampler::output_len(self, input_len)
    }

    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<usize, ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
        O: Write1D<Real> + ?Sized,
    {
        let input = bind_input(input, "input")?;
        let out = out.write_slice_mut().map_err(ExecInvariantViolation::from)?;
        self.process_into(input, out)
    }

    fn run_alloc<I>(&self, input: &I) -> Result<Vec<Real>, ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
    {
        let input = bind_input(input, "input")?;
        let mut out = vec![0.0; Resampler::output_len(self, input.len())];
        self.process_into(input, &mut out)?;
        Ok(out)
    }
}

///
/// Resample `x` by the rational factor `num / den`.
///
/// ```
/// use vv_dsp::signal::resample::{resample_rational, ResampleQuality};
///
/// let x = [0., 1., 2., 3., 4., 5., 6., 7.];
/// let y = resample_rational(&x, 1, 2, ResampleQuality::Linear).unwrap();
/// assert_eq!(y, vec![0., 2., 4., 6.]);
/// ```
///
pub fn resample_rational(
    x: &[Real],
    num: u32,
    den: u32,
    quality: ResampleQuality,
) -> Result<Vec<Real>, ExecInvariantViolation> {
    Resampler::try_new(ResamplerConfig {
        num,
        den,
        quality,
        ..Default::default()
    })?
    .run_alloc(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use vv_dsp_core::Status;

    fn resampler(num: u32, den: u32, quality: ResampleQuality) -> Resampler {
        Resampler::try_new(ResamplerConfig {
            num,
            den,
            quality,
            ..Default::default()
        })
        .expect("resampler")
    }

    #[test]
    fn halving_with_linear_interpolation() {
        let x: Vec<Real> = (0..8).map(|v| v as Real).collect();
        let rs = resampler(1, 2, ResampleQuality::Linear);
        assert_eq!(rs.output_len(8), 4);
        let mut out = [0.0; 4];
        let written = rs.process_into(&x, &mut out).expect("process");
        assert_eq!(written, 4);
        assert_eq!(out, [0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn doubling_with_linear_interpolation() {
        let y = resample_rational(&[0.0, 1.0, 2.0], 2, 1, ResampleQuality::Linear).expect("up");
        assert_eq!(y, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn unit_ratio_is_identity_on_both_paths() {
        let x = [0.3, -1.2, 4.5, 2.0, 0.0, -0.7];
        for quality in [ResampleQuality::Linear, ResampleQuality::Sinc] {
            let y = resample_rational(&x, 1, 1, quality).expect("identity");
            assert_eq!(y.len(), x.len());
            for (a, b) in y.iter().zip(&x) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn sinc_path_preserves_dc() {
        let x = [2.5; 40];
        for (num, den) in [(3, 2), (2, 3), (1, 4), (160, 147)] {
            let y = resample_rational(&x, num, den, ResampleQuality::Sinc).expect("sinc");
            for v in y {
                assert_abs_diff_eq!(v, 2.5, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn short_output_is_rejected_untouched() {
        let rs = resampler(3, 2, ResampleQuality::Sinc);
        let required = rs.output_len(10);
        assert_eq!(required, 14);
        let mut out = vec![-9.0; required - 1];
        let err = rs.process_into(&[1.0; 10], &mut out).expect_err("capacity");
        assert_eq!(err.status(), Status::InvalidSize);
        assert!(out.iter().all(|v| *v == -9.0));

        let mut roomy = vec![-9.0; required + 3];
        assert_eq!(rs.run_into(&[1.0; 10][..], &mut roomy).expect("roomy"), required);
        assert_eq!(roomy[required], -9.0);
    }

    #[test]
    fn taps_are_clamped_and_even() {
        let mut rs = resampler(1, 1, ResampleQuality::Linear);
        assert_eq!(rs.taps(), DEFAULT_TAPS);
        rs.set_quality(ResampleQuality::Sinc, 3);
        assert_eq!(rs.taps(), 4);
        rs.set_quality(ResampleQuality::Sinc, 33);
        assert_eq!(rs.taps(), 34);
        rs.set_quality(ResampleQuality::Sinc, 500);
        assert_eq!(rs.taps(), 128);
        assert_eq!(rs.quality(), ResampleQuality::Sinc);
    }

    #[test]
    fn ratio_updates() {
        let mut rs = resampler(1, 1, ResampleQuality::Linear);
        rs.set_ratio(1, 4).expect("ratio");
        assert_eq!(rs.ratio(), (1, 4));
        assert_abs_diff_eq!(rs.cutoff(), 0.25);
        let err = rs.set_ratio(0, 4).expect_err("zero");
        assert_eq!(err.status(), Status::OutOfRange);
        assert_eq!(rs.ratio(), (1, 4));
        rs.set_ratio(5, 2).expect("ratio");
        assert_abs_diff_eq!(rs.cutoff(), 1.0);

        let err = Resampler::try_new(ResamplerConfig {
            den: 0,
            ..Default::default()
        })
        .expect_err("zero den");
        assert_eq!(err.status(), Status::OutOfRange);
    }

    #[test]
    fn empty_input_is_rejected() {
        let rs = resampler(2, 1, ResampleQuality::Linear);
        let err = rs.run_alloc(&[] as &[Real]).expect_err("empty");
        assert_eq!(err.status(), Status::InvalidSize);
        assert_eq!(rs.output_len(0), 0);
    }
}
