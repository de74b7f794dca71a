//! Second-order IIR sections in Direct Form II Transposed.
//!
//! Per-sample and per-block paths never allocate and never log.

use crate::kernel::{
    bind_input, bind_output, ConfigError, ExecInvariantViolation, KernelLifecycle, Read1D, Write1D,
};
use crate::signal::traits::StreamFilter1D;
use vv_dsp_core::Real;

/// Biquad section `H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)`
/// with its two state registers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Biquad {
    /// Feed-forward coefficient for `x[n]`.
    pub b0: Real,
    /// Feed-forward coefficient for `x[n-1]`.
    pub b1: Real,
    /// Feed-forward coefficient for `x[n-2]`.
    pub b2: Real,
    /// Feedback coefficient for `y[n-1]`.
    pub a1: Real,
    /// Feedback coefficient for `y[n-2]`.
    pub a2: Real,
    z1: Real,
    z2: Real,
}

impl Biquad {
    /// Section with zeroed state.
    pub fn new(b0: Real, b1: Real, b2: Real, a1: Real, a2: Real) -> Self {
        Self {
            b0,
            b1,
            b2,
            a1,
            a2,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Pass-through section.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 0.0)
    }

    /// State registers `(z1, z2)`.
    pub fn state(&self) -> (Real, Real) {
        (self.z1, self.z2)
    }

    /// Zero both state registers.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    /// Filter one sample.
    #[inline]
    pub fn process(&mut self, x: Real) -> Real {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }

    /// Filter a block in place.
    pub fn process_block(&mut self, buf: &mut [Real]) {
        for v in buf.iter_mut() {
            *v = self.process(*v);
        }
    }
}

///
/// Run `input` through every section of `chain` in order into `output`.
///
/// Each section filters the whole block before the next one starts. An empty
/// chain copies the input.
///
/// ```
/// use vv_dsp::signal::filter::{biquad_chain_apply, Biquad};
///
/// let mut chain = [Biquad::new(0.5, 0.5, 0., 0., 0.)];
/// let mut y = [0.; 3];
/// biquad_chain_apply(&mut chain, &[2., 2., 2.], &mut y).unwrap();
/// assert_eq!(y, [1., 2., 2.]);
/// ```
///
pub fn biquad_chain_apply(
    chain: &mut [Biquad],
    input: &[Real],
    output: &mut [Real],
) -> Result<(), ExecInvariantViolation> {
    if output.len() != input.len() {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg: "output",
            expected: input.len(),
            got: output.len(),
        });
    }
    output.copy_from_slice(input);
    for section in chain.iter_mut() {
        section.process_block(output);
    }
    Ok(())
}

/// Zero the state of every section in `chain`.
pub fn biquad_chain_reset(chain: &mut [Biquad]) {
    chain.iter_mut().for_each(Biquad::reset);
}

/// Constructor config for [`BiquadChainKernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct BiquadChainConfig {
    /// Sections applied in order.
    pub sections: Vec<Biquad>,
}

/// Cascade of biquad sections carrying state between blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct BiquadChainKernel {
    sections: Vec<Biquad>,
}

impl BiquadChainKernel {
    /// Sections with their current state.
    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }
}

impl KernelLifecycle for BiquadChainKernel {
    type Config = BiquadChainConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.sections.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "sections" });
        }
        Ok(Self {
            sections: config.sections,
        })
    }
}

impl StreamFilter1D<Real> for BiquadChainKernel {
    fn run_into<I, O>(&mut self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
        O: Write1D<Real> + ?Sized,
    {
        let input = bind_input(input, "input")?;
        let out = bind_output(out, "out", input.len())?;
        biquad_chain_apply(&mut self.sections, input, out)
    }

    fn run_alloc<I>(&mut self, input: &I) -> Result<Vec<Real>, ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
    {
        let input = bind_input(input, "input")?;
        let mut out = input.to_vec();
        for section in self.sections.iter_mut() {
            section.process_block(&mut out);
        }
        Ok(out)
    }

    fn reset(&mut self) {
        biquad_chain_reset(&mut self.sections);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::Rng;

    #[test]
    fn identity_section_passes_through() {
        let mut bq = Biquad::identity();
        let mut y = [0.0; 3];
        biquad_chain_apply(core::slice::from_mut(&mut bq), &[-1.0, 0.0, 1.0], &mut y)
            .expect("apply");
        assert_eq!(y, [-1.0, 0.0, 1.0]);
        assert_eq!(bq.state(), (0.0, 0.0));
    }

    #[test]
    fn one_pole_impulse_response_decays_geometrically() {
        // y[n] = x[n] + 0.5 y[n-1]
        let mut bq = Biquad::new(1.0, 0.0, 0.0, -0.5, 0.0);
        let mut buf = [1.0, 0.0, 0.0, 0.0];
        bq.process_block(&mut buf);
        assert_eq!(buf, [1.0, 0.5, 0.25, 0.125]);
        bq.reset();
        assert_eq!(bq.state(), (0.0, 0.0));
        assert_eq!(bq.process(0.0), 0.0);
    }

    #[test]
    fn chain_is_order_independent_and_blockwise() {
        let sections = vec![
            Biquad::new(0.2, 0.4, 0.2, -0.3, 0.1),
            Biquad::new(1.0, -1.2, 0.5, 0.25, -0.05),
        ];
        let mut rng = rand::rng();
        let x: Vec<Real> = (0..50).map(|_| rng.random_range(-1.0..1.0)).collect();

        let mut whole = BiquadChainKernel::try_new(BiquadChainConfig {
            sections: sections.clone(),
        })
        .expect("kernel");
        let expected = whole.run_alloc(&x).expect("whole");

        let mut reversed: Vec<Biquad> = sections.iter().rev().copied().collect();
        let mut swapped = vec![0.0; x.len()];
        biquad_chain_apply(&mut reversed, &x, &mut swapped).expect("swapped");

        let mut blocks =
            BiquadChainKernel::try_new(BiquadChainConfig { sections }).expect("kernel");
        let mut got = vec![0.0; x.len()];
        blocks.run_into(&x[..17], &mut got[..17]).expect("first");
        blocks.run_into(&x[17..], &mut got[17..]).expect("second");

        for ((a, b), c) in got.iter().zip(&expected).zip(&swapped) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-5);
            assert_abs_diff_eq!(*c, *b, epsilon = 1e-4);
        }

        blocks.reset();
        assert!(blocks.sections().iter().all(|s| s.state() == (0.0, 0.0)));
    }

    #[test]
    fn mismatched_output_is_rejected() {
        let mut chain = [Biquad::identity()];
        let mut y = [0.0; 2];
        let err = biquad_chain_apply(&mut chain, &[1.0, 2.0, 3.0], &mut y).expect_err("len");
        assert!(matches!(err, ExecInvariantViolation::LengthMismatch { .. }));
        assert!(BiquadChainKernel::try_new(BiquadChainConfig { sections: vec![] }).is_err());
    }
}
