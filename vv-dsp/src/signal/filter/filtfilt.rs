use super::FirState;
use crate::kernel::{
    bind_input, bind_output, ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D, Write1D,
};
use crate::numeric::policy::{apply_in_place, guard_input};
use crate::signal::traits::Filter1D;
use vv_dsp_core::Real;

/// Extend `x` by `pad` samples on each side with an edge-repeating mirror:
/// `[.., x1, x0 | x0, x1, .., xn-1 | xn-1, xn-2, ..]`. Once the mirror has
/// walked across the whole input it holds its last sample.
///
/// `x` must not be empty.
fn symmetric_pad(x: &[Real], pad: usize) -> Vec<Real> {
    let n = x.len();
    let mut ext = vec![0.0; n + 2 * pad];
    ext[pad..pad + n].copy_from_slice(x);
    for i in 0..pad {
        ext[pad - 1 - i] = x[i.min(n - 1)];
        ext[pad + n + i] = x[(n - 1).saturating_sub(i)];
    }
    ext
}

/// Constructor config for [`FiltFiltKernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct FiltFiltConfig {
    /// FIR coefficients applied in both directions.
    pub coeffs: Vec<Real>,
}

/// Zero-phase FIR filter: forward pass, reversal, second forward pass,
/// reversal.
///
/// Both ends are padded by `T - 1` mirrored samples before
/// filtering and the padding is stripped afterwards, so the output has the
/// input length and no group delay.
#[derive(Debug, Clone, PartialEq)]
pub struct FiltFiltKernel {
    coeffs: Vec<Real>,
}

impl KernelLifecycle for FiltFiltKernel {
    type Config = FiltFiltConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.coeffs.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "coeffs" });
        }
        Ok(Self {
            coeffs: config.coeffs,
        })
    }
}

impl FiltFiltKernel {
    /// Padding applied to each end of the input, `T - 1`.
    pub fn pad_len(&self) -> usize {
        self.coeffs.len() - 1
    }

    fn pass(&self, buf: &mut [Real]) -> Result<(), ExecInvariantViolation> {
        let mut state = FirState::new(self.coeffs.len())?;
        let mut tmp = vec![0.0; buf.len()];
        state.apply(&self.coeffs, buf, &mut tmp)?;
        tmp.reverse();
        buf.copy_from_slice(&tmp);
        Ok(())
    }
}

impl Filter1D<Real> for FiltFiltKernel {
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
        O: Write1D<Real> + ?Sized,
    {
        let input = bind_input(input, "input")?;
        let out = bind_output(out, "out", input.len())?;
        tracing::trace!(n = input.len(), taps = self.coeffs.len(), "filtfilt");
        let x = guard_input(input)?;
        let pad = self.pad_len();
        let mut ext = symmetric_pad(&x, pad);
        self.pass(&mut ext)?;
        self.pass(&mut ext)?;
        out.copy_from_slice(&ext[pad..pad + x.len()]);
        apply_in_place(out)
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
/// Zero-phase filtering of `x` by the FIR `h`.
///
/// ```
/// use vv_dsp::signal::filter::fir_filtfilt;
///
/// let x = [1., 1., 1., 1., 1., 1.];
/// let y = fir_filtfilt(&[0.25, 0.5, 0.25], &x).unwrap();
/// assert!(y.iter().all(|v| (v - 1.).abs() < 1e-5));
/// ```
///
pub fn fir_filtfilt(h: &[Real], x: &[Real]) -> Result<Vec<Real>, ExecInvariantViolation> {
    FiltFiltKernel::try_new(FiltFiltConfig { coeffs: h.to_vec() })?.run_alloc(x)
}
