//! FFT plan-and-execute core on top of `rustfft`.
//!
//! Forward transforms are unscaled and backward transforms divide by `N`, so
//! a forward/backward pair reproduces its input.

use crate::kernel::{
    bind_input, bind_output, bind_output_capacity, ConfigError, ExecInvariantViolation,
    KernelLifecycle, Read1D, Write1D,
};
use crate::simd::AlignedBuffer;
use core::fmt;
use rustfft::{Fft, FftDirection as BackendDirection, FftPlanner};
use std::sync::Arc;
use vv_dsp_core::{Cpx, Real};

/// Transform shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FftKind {
    /// `N` complex in, `N` complex out.
    C2C,
    /// `N` reals in, `N / 2 + 1` Hermitian-packed bins out.
    R2C,
    /// `N / 2 + 1` Hermitian-packed bins in, `N` reals out.
    C2R,
}

/// Transform direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FftDirection {
    /// `exp(-2 pi i k n / N)`, unscaled.
    #[default]
    Forward,
    /// `exp(+2 pi i k n / N)`, divided by `N`.
    Backward,
}

/// Constructor config for [`FftPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FftConfig {
    /// Transform length `N`.
    pub len: usize,
    /// Transform shape.
    pub kind: FftKind,
    /// Transform direction. R2C plans always run forward and C2R plans
    /// always run backward; the field only selects the sign for C2C.
    pub direction: FftDirection,
}

/// Number of Hermitian-packed bins of a length-`n` real transform.
pub const fn rfft_bins(n: usize) -> usize {
    n / 2 + 1
}

/// Reusable transform plan owning its backend handle and work buffers.
///
/// Execution takes `&mut self`; plans are used from one thread at a time.
#[derive(Clone)]
pub struct FftPlan {
    len: usize,
    kind: FftKind,
    direction: FftDirection,
    fft: Arc<dyn Fft<Real>>,
    work: AlignedBuffer<Cpx>,
    scratch: Vec<Cpx>,
}

impl fmt::Debug for FftPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftPlan")
            .field("len", &self.len)
            .field("kind", &self.kind)
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}

impl KernelLifecycle for FftPlan {
    type Config = FftConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.len == 0 {
            return Err(ConfigError::EmptyInput { arg: "len" });
        }
        let backend_direction = match (config.kind, config.direction) {
            (FftKind::R2C, _) | (FftKind::C2C, FftDirection::Forward) => BackendDirection::Forward,
            (FftKind::C2R, _) | (FftKind::C2C, FftDirection::Backward) => BackendDirection::Inverse,
        };
        let fft = FftPlanner::<Real>::new().plan_fft(config.len, backend_direction);
        let work = AlignedBuffer::zeroed(config.len).ok_or(ConfigError::InvalidArgument {
            arg: "len",
            reason: "work buffer allocation failed",
        })?;
        let scratch = vec![Cpx::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        tracing::debug!(
            len = config.len,
            kind = ?config.kind,
            direction = ?config.direction,
            "fft plan created"
        );
        Ok(Self {
            len: config.len,
            kind: config.kind,
            direction: config.direction,
            fft,
            work,
            scratch,
        })
    }
}

impl FftPlan {
    /// Transform length `N`.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; zero-length plans are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Transform shape.
    pub fn kind(&self) -> FftKind {
        self.kind
    }

    /// Configured direction.
    pub fn direction(&self) -> FftDirection {
        self.direction
    }

    /// Complex length on the spectral side of the plan.
    pub fn bins(&self) -> usize {
        match self.kind {
            FftKind::C2C => self.len,
            FftKind::R2C | FftKind::C2R => rfft_bins(self.len),
        }
    }

    fn expect_kind(&self, kind: FftKind) -> Result<(), ExecInvariantViolation> {
        if self.kind != kind {
            return Err(ExecInvariantViolation::InvalidState {
                reason: "buffer types do not match the plan kind",
            });
        }
        Ok(())
    }

    fn transform_work(&mut self) {
        self.fft
            .process_with_scratch(&mut self.work, &mut self.scratch);
    }

    /// Run a C2C plan. `input` and `out` both hold `N` values.
    pub fn execute_c2c<I, O>(
        &mut self,
        input: &I,
        out: &mut O,
    ) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<Cpx> + ?Sized,
        O: Write1D<Cpx> + ?Sized,
    {
        self.expect_kind(FftKind::C2C)?;
        let input = bind_exact(input, "input", self.len)?;
        let out = bind_output(out, "out", self.len)?;
        self.work.copy_from_slice(input);
        self.transform_work();
        if self.direction == FftDirection::Backward {
            let scale = 1.0 / self.len as Real;
            for (dst, z) in out.iter_mut().zip(self.work.iter()) {
                *dst = *z * scale;
            }
        } else {
            out.copy_from_slice(&self.work);
        }
        Ok(())
    }

    /// Run an R2C plan. `input` holds `N` reals; `out` must hold at least
    /// `N / 2 + 1` bins and only that prefix is written.
    pub fn execute_r2c<I, O>(
        &mut self,
        input: &I,
        out: &mut O,
    ) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
        O: Write1D<Cpx> + ?Sized,
    {
        self.expect_kind(FftKind::R2C)?;
        let input = bind_exact(input, "input", self.len)?;
        let bins = self.bins();
        let out = bind_output_capacity(out, "out", bins)?;
        for (dst, &x) in self.work.iter_mut().zip(input) {
            *dst = Cpx::new(x, 0.0);
        }
        self.transform_work();
        out.copy_from_slice(&self.work[..bins]);
        Ok(())
    }

    /// Run a C2R plan. `input` holds `N / 2 + 1` bins; the negative
    /// frequencies are rebuilt by conjugate symmetry and `out` receives `N`
    /// reals scaled by `1 / N`.
    pub fn execute_c2r<I, O>(
        &mut self,
        input: &I,
        out: &mut O,
    ) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<Cpx> + ?Sized,
        O: Write1D<Real> + ?Sized,
    {
        self.expect_kind(FftKind::C2R)?;
        let bins = self.bins();
        let input = bind_exact(input, "input", bins)?;
        let out = bind_output(out, "out", self.len)?;
        let n = self.len;
        self.work[..bins].copy_from_slice(input);
        for k in 1..n.div_ceil(2) {
            self.work[n - k] = self.work[k].conj();
        }
        self.transform_work();
        let scale = 1.0 / n as Real;
        for (dst, z) in out.iter_mut().zip(self.work.iter()) {
            *dst = z.re * scale;
        }
        Ok(())
    }
}

fn bind_exact<'a, T, I>(
    input: &'a I,
    arg: &'static str,
    expected: usize,
) -> Result<&'a [T], ExecInvariantViolation>
where
    I: Read1D<T> + ?Sized,
{
    let input = bind_input(input, arg)?;
    if input.len() != expected {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg,
            expected,
            got: input.len(),
        });
    }
    Ok(input)
}

fn c2c(x: &[Cpx], direction: FftDirection) -> Result<Vec<Cpx>, ExecInvariantViolation> {
    let mut plan = FftPlan::try_new(FftConfig {
        len: x.len(),
        kind: FftKind::C2C,
        direction,
    })?;
    let mut out = vec![Cpx::new(0.0, 0.0); x.len()];
    plan.execute_c2c(x, &mut out)?;
    Ok(out)
}

///
/// Unscaled forward DFT of a complex buffer.
///
/// ```
/// use vv_dsp::signal::spectral::fft_forward;
/// use vv_dsp::Cpx;
///
/// let x = [Cpx::new(1., 0.), Cpx::new(2., 0.), Cpx::new(3., 0.), Cpx::new(4., 0.)];
/// let y = fft_forward(&x).unwrap();
/// assert!((y[0].re - 10.).abs() < 1e-5);
/// assert!((y[1] - Cpx::new(-2., 2.)).norm() < 1e-5);
/// ```
///
pub fn fft_forward(x: &[Cpx]) -> Result<Vec<Cpx>, ExecInvariantViolation> {
    c2c(x, FftDirection::Forward)
}

/// Inverse DFT of a complex buffer, divided by its length.
pub fn ifft_backward(x: &[Cpx]) -> Result<Vec<Cpx>, ExecInvariantViolation> {
    c2c(x, FftDirection::Backward)
}

/// Hermitian-packed spectrum (`N / 2 + 1` bins) of a real buffer.
pub fn rfft(x: &[Real]) -> Result<Vec<Cpx>, ExecInvariantViolation> {
    let mut plan = FftPlan::try_new(FftConfig {
        len: x.len(),
        kind: FftKind::R2C,
        direction: FftDirection::Forward,
    })?;
    let mut out = vec![Cpx::new(0.0, 0.0); plan.bins()];
    plan.execute_r2c(x, &mut out)?;
    Ok(out)
}

/// Length-`n` real signal from its Hermitian-packed spectrum.
pub fn irfft(spectrum: &[Cpx], n: usize) -> Result<Vec<Real>, ExecInvariantViolation> {
    let mut plan = FftPlan::try_new(FftConfig {
        len: n,
        kind: FftKind::C2R,
        direction: FftDirection::Backward,
    })?;
    let mut out = vec![0.0; n];
    plan.execute_c2r(spectrum, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::Rng;
    use vv_dsp_core::Status;

    #[cfg(feature = "use_double")]
    const TOL: Real = 1e-12;
    #[cfg(not(feature = "use_double"))]
    const TOL: Real = 1e-5;

    #[test]
    fn c2c_round_trip_on_uniform_samples() {
        let x = vec![Cpx::new(1.0, 0.0); 8];
        let spectrum = fft_forward(&x).expect("forward");
        assert_abs_diff_eq!(spectrum[0].re, 8.0, epsilon = TOL * 8.0);
        for z in &spectrum[1..] {
            assert_abs_diff_eq!(z.norm(), 0.0, epsilon = TOL * 8.0);
        }
        let back = ifft_backward(&spectrum).expect("backward");
        for (a, b) in back.iter().zip(&x) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = TOL);
            assert_abs_diff_eq!(a.im, b.im, epsilon = TOL);
        }
    }

    #[test]
    fn c2c_round_trip_random_lengths() {
        let mut rng = rand::rng();
        for _ in 0..20 {
            let n = rng.random_range(1..200);
            let x: Vec<Cpx> = (0..n)
                .map(|_| Cpx::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)))
                .collect();
            let back = ifft_backward(&fft_forward(&x).expect("forward")).expect("backward");
            for (a, b) in back.iter().zip(&x) {
                assert_abs_diff_eq!(a.re, b.re, epsilon = TOL * n as Real);
                assert_abs_diff_eq!(a.im, b.im, epsilon = TOL * n as Real);
            }
        }
    }

    #[test]
    fn real_round_trip_even_and_odd() {
        let mut rng = rand::rng();
        for n in [1usize, 2, 7, 8, 15, 64] {
            let x: Vec<Real> = (0..n).map(|_| rng.random_range(-1.0..1.0)).collect();
            let spectrum = rfft(&x).expect("rfft");
            assert_eq!(spectrum.len(), n / 2 + 1);
            let back = irfft(&spectrum, n).expect("irfft");
            for (a, b) in back.iter().zip(&x) {
                assert_abs_diff_eq!(*a, *b, epsilon = TOL * n.max(4) as Real);
            }
        }
    }

    #[test]
    fn r2c_writes_only_the_packed_prefix() {
        let mut plan = FftPlan::try_new(FftConfig {
            len: 4,
            kind: FftKind::R2C,
            direction: FftDirection::Backward,
        })
        .expect("plan");
        let mut out = vec![Cpx::new(9.0, 9.0); 5];
        plan.execute_r2c(&[1.0, 2.0, 3.0, 4.0], &mut out)
            .expect("r2c");
        assert_abs_diff_eq!(out[0].re, 10.0, epsilon = TOL * 10.0);
        assert_abs_diff_eq!(out[1].im, 2.0, epsilon = TOL * 10.0);
        assert_eq!(out[3], Cpx::new(9.0, 9.0));

        let mut short = vec![Cpx::new(0.0, 0.0); 2];
        let err = plan
            .execute_r2c(&[1.0, 2.0, 3.0, 4.0], &mut short)
            .expect_err("short output");
        assert_eq!(err.status(), Status::InvalidSize);
    }

    #[test]
    fn plans_reject_zero_length_and_wrong_kind() {
        let err = FftPlan::try_new(FftConfig {
            len: 0,
            kind: FftKind::C2C,
            direction: FftDirection::Forward,
        })
        .expect_err("zero length");
        assert_eq!(err.status(), Status::InvalidSize);

        let mut plan = FftPlan::try_new(FftConfig {
            len: 4,
            kind: FftKind::C2C,
            direction: FftDirection::Forward,
        })
        .expect("plan");
        let mut out = vec![Cpx::new(0.0, 0.0); 3];
        let err = plan
            .execute_r2c(&[0.0; 4], &mut out)
            .expect_err("kind mismatch");
        assert_eq!(err.status(), Status::OutOfRange);
    }

    #[test]
    fn c2c_rejects_mismatched_lengths() {
        let mut plan = FftPlan::try_new(FftConfig {
            len: 4,
            kind: FftKind::C2C,
            direction: FftDirection::Backward,
        })
        .expect("plan");
        let input = vec![Cpx::new(0.0, 0.0); 3];
        let mut out = vec![Cpx::new(0.0, 0.0); 4];
        let err = plan.execute_c2c(&input, &mut out).expect_err("short input");
        assert!(matches!(err, ExecInvariantViolation::LengthMismatch { .. }));
        let mut missing: Option<Vec<Cpx>> = None;
        let err = plan
            .execute_c2c(&vec![Cpx::new(0.0, 0.0); 4], &mut missing)
            .expect_err("missing output");
        assert_eq!(err.status(), Status::NullInput);
    }
}
