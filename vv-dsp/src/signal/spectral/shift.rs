//! Zero-frequency centring of spectra, with numpy semantics.
//!
//! `fftshift` rotates right by `n / 2` and `ifftshift` rotates left by the
//! same amount, so `ifftshift(fftshift(x)) == x` for every length.

use crate::kernel::{bind_input, bind_output, ExecInvariantViolation, Read1D, Write1D};

/// Rotate `x` right by `x.len() / 2` in place.
pub fn fftshift_in_place<T>(x: &mut [T]) {
    let half = x.len() / 2;
    x.rotate_right(half);
}

/// Rotate `x` left by `x.len() / 2` in place.
pub fn ifftshift_in_place<T>(x: &mut [T]) {
    let half = x.len() / 2;
    x.rotate_left(half);
}

/// Write the shifted `input` into `out` of the same length.
pub fn fftshift_into<T, I, O>(input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
where
    T: Copy,
    I: Read1D<T> + ?Sized,
    O: Write1D<T> + ?Sized,
{
    let input = bind_input(input, "input")?;
    let out = bind_output(out, "out", input.len())?;
    out.copy_from_slice(input);
    fftshift_in_place(out);
    Ok(())
}

/// Inverse of [`fftshift_into`].
pub fn ifftshift_into<T, I, O>(input: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
where
    T: Copy,
    I: Read1D<T> + ?Sized,
    O: Write1D<T> + ?Sized,
{
    let input = bind_input(input, "input")?;
    let out = bind_output(out, "out", input.len())?;
    out.copy_from_slice(input);
    ifftshift_in_place(out);
    Ok(())
}

///
/// Move the zero-frequency bin to the centre.
///
/// ```
/// use vv_dsp::signal::spectral::fftshift;
///
/// assert_eq!(fftshift(&[0, 1, 2, 3, 4]), vec![3, 4, 0, 1, 2]);
/// assert_eq!(fftshift(&[0, 1, 2, 3]), vec![2, 3, 0, 1]);
/// ```
///
pub fn fftshift<T: Copy>(x: &[T]) -> Vec<T> {
    let mut out = x.to_vec();
    fftshift_in_place(&mut out);
    out
}

/// Undo [`fftshift`].
pub fn ifftshift<T: Copy>(x: &[T]) -> Vec<T> {
    let mut out = x.to_vec();
    ifftshift_in_place(&mut out);
    out
}
