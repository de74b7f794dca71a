//! Trait interfaces for signal-processing capabilities.
//!
//! Kernels implement these over the crate [`Real`](vv_dsp_core::Real) scalar;
//! every method validates its buffers through the [`Read1D`]/[`Write1D`]
//! adapters before touching data.

use crate::kernel::{ExecInvariantViolation, Read1D, Write1D};

/// 1D filtering capability (output length equals input length).
pub trait Filter1D<T> {
    /// Filter into a caller-provided output buffer.
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized,
        O: Write1D<T> + ?Sized;

    /// Filter and allocate output.
    fn run_alloc<I>(&self, input: &I) -> Result<Vec<T>, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized;
}

/// Stateful 1D filtering capability. Filter state carries over between
/// calls, so feeding consecutive blocks equals feeding their concatenation.
pub trait StreamFilter1D<T> {
    /// Filter one block into a caller-provided output of the same length.
    fn run_into<I, O>(&mut self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized,
        O: Write1D<T> + ?Sized;

    /// Filter one block and allocate output.
    fn run_alloc<I>(&mut self, input: &I) -> Result<Vec<T>, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized;

    /// Clear the filter state.
    fn reset(&mut self);
}

/// 1D resampling capability.
pub trait Resample1D<T> {
    /// Number of output samples produced for `input_len` input samples.
    fn output_len(&self, input_len: usize) -> usize;

    /// Run resampling into a caller-provided output buffer holding at least
    /// [`Resample1D::output_len`] samples. Returns the number written.
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<usize, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized,
        O: Write1D<T> + ?Sized;

    /// Run resampling and allocate output.
    fn run_alloc<I>(&self, input: &I) -> Result<Vec<T>, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized;
}

/// Point-sampling of a 1D table at fractional positions.
pub trait Interpolate1D<T> {
    /// Sample `input` at every position of `positions` into `out`.
    fn run_into<I, P, O>(
        &self,
        input: &I,
        positions: &P,
        out: &mut O,
    ) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized,
        P: Read1D<T> + ?Sized,
        O: Write1D<T> + ?Sized;

    /// Sample `input` at every position of `positions` and allocate output.
    fn run_alloc<I, P>(&self, input: &I, positions: &P) -> Result<Vec<T>, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized,
        P: Read1D<T> + ?Sized;
}

/// Real-to-real transform capability with a fixed length.
pub trait Transform1D<T> {
    /// Transform length.
    fn len(&self) -> usize;

    /// Whether the transform has no samples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transform into a caller-provided output buffer of the same length.
    fn run_into<I, O>(&self, input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized,
        O: Write1D<T> + ?Sized;

    /// Transform and allocate output.
    fn run_alloc<I>(&self, input: &I) -> Result<Vec<T>, ExecInvariantViolation>
    where
        I: Read1D<T> + ?Sized;
}

/// Window table generation capability.
pub trait WindowGenerate<T> {
    /// Fill a caller-provided output buffer with window coefficients.
    fn run_into<O>(&self, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        O: Write1D<T> + ?Sized;

    /// Allocate and fill a window table.
    fn run_alloc(&self) -> Result<Vec<T>, ExecInvariantViolation>;
}
