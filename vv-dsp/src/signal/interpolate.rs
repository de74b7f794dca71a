//! Fractional-index sampling of a 1D table.
//!
//! Positions at or below 0 return the first sample and positions at or above
//! `n - 1` return the last one.

use crate::kernel::{
    bind_input, bind_output, ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D, Write1D,
};
use crate::signal::traits::Interpolate1D;
use vv_dsp_core::Real;

/// Interpolation scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InterpMethod {
    /// Straight line between the two neighbours.
    #[default]
    Linear,
    /// Catmull-Rom spline through the four neighbours, clamped at the ends.
    Cubic,
}

// Split `pos` into a base index and fraction. A position on or beyond an
// edge yields that edge sample as the error value.
fn locate(x: &[Real], pos: Real) -> Result<(usize, f64), Real> {
    if pos <= 0.0 {
        return Err(x[0]);
    }
    let last = x.len() - 1;
    if pos >= last as Real {
        return Err(x[last]);
    }
    let base = (pos as f64).floor();
    Ok((base as usize, pos as f64 - base))
}

/// Linear interpolation of `x` at fractional index `pos`.
///
/// # Panics
/// If `x` is empty. [`interpolate_linear_into`] reports that case as an
/// error instead.
pub fn interpolate_linear(x: &[Real], pos: Real) -> Real {
    match locate(x, pos) {
        Err(edge) => edge,
        Ok((i, t)) => ((1.0 - t) * x[i] as f64 + t * x[i + 1] as f64) as Real,
    }
}

/// Catmull-Rom cubic interpolation of `x` at fractional index `pos`.
///
/// Tangents are `(p2 - p0) / 2` and `(p3 - p1) / 2` with neighbour indices
/// clamped into the table.
///
/// # Panics
/// If `x` is empty. [`interpolate_cubic_into`] reports that case as an
/// error instead.
pub fn interpolate_cubic(x: &[Real], pos: Real) -> Real {
    let (i, t) = match locate(x, pos) {
        Err(edge) => return edge,
        Ok(found) => found,
    };
    let last = x.len() - 1;
    let p0 = x[i.saturating_sub(1)] as f64;
    let p1 = x[i] as f64;
    let p2 = x[(i + 1).min(last)] as f64;
    let p3 = x[(i + 2).min(last)] as f64;
    let m1 = 0.5 * (p2 - p0);
    let m2 = 0.5 * (p3 - p1);

    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    (h00 * p1 + h10 * m1 + h01 * p2 + h11 * m2) as Real
}

/// Constructor config for [`InterpolateKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterpolateConfig {
    /// Scheme.
    pub method: InterpMethod,
}

/// Samples a table at a vector of fractional positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpolateKernel {
    method: InterpMethod,
}

impl InterpolateKernel {
    /// Scheme.
    pub fn method(&self) -> InterpMethod {
        self.method
    }
}

impl KernelLifecycle for InterpolateKernel {
    type Config = InterpolateConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        Ok(Self {
            method: config.method,
        })
    }
}

impl Interpolate1D<Real> for InterpolateKernel {
    fn run_into<I, P, O>(
        &self,
        input: &I,
        positions: &P,
        out: &mut O,
    ) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
        P: Read1D<Real> + ?Sized,
        O: Write1D<Real> + ?Sized,
    {
        let x = bind_input(input, "input")?;
        let positions = positions
            .read_slice()
            .map_err(ExecInvariantViolation::from)?;
        let out = bind_output(out, "out", positions.len())?;
        let sample: fn(&[Real], Real) -> Real = match self.method {
            InterpMethod::Linear => interpolate_linear,
            InterpMethod::Cubic => interpolate_cubic,
        };
        for (dst, &pos) in out.iter_mut().zip(positions) {
            *dst = sample(x, pos);
        }
        Ok(())
    }

    fn run_alloc<I, P>(&self, input: &I, positions: &P) -> Result<Vec<Real>, ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
        P: Read1D<Real> + ?Sized,
    {
        let len = positions
            .read_slice()
            .map_err(ExecInvariantViolation::from)?
            .len();
        let mut out = vec![0.0; len];
        self.run_into(input, positions, &mut out)?;
        Ok(out)
    }
}

fn interpolate_into(
    method: InterpMethod,
    x: &[Real],
    positions: &[Real],
    out: &mut [Real],
) -> Result<(), ExecInvariantViolation> {
    InterpolateKernel::try_new(InterpolateConfig { method })?.run_into(x, positions, out)
}

///
/// Linearly sample `x` at every entry of `positions` into `out`.
///
/// ```
/// use vv_dsp::signal::interpolate::interpolate_linear_into;
///
/// let mut out = [0.; 4];
/// interpolate_linear_into(&[0., 10., 20.], &[-1., 0.5, 1.25, 9.], &mut out).unwrap();
/// assert_eq!(out, [0., 5., 12.5, 20.]);
/// ```
///
pub fn interpolate_linear_into(
    x: &[Real],
    positions: &[Real],
    out: &mut [Real],
) -> Result<(), ExecInvariantViolation> {
    interpolate_into(InterpMethod::Linear, x, positions, out)
}

/// Catmull-Rom sample `x` at every entry of `positions` into `out`.
pub fn interpolate_cubic_into(
    x: &[Real],
    positions: &[Real],
    out: &mut [Real],
) -> Result<(), ExecInvariantViolation> {
    interpolate_into(InterpMethod::Cubic, x, positions, out)
}
