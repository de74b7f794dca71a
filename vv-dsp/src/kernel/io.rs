use super::{ConfigError, ExecInvariantViolation};
use ndarray::{Array1, ArrayView1, ArrayViewMut1};

/// Adapter trait for reading contiguous 1D input.
pub trait Read1D<T> {
    /// Borrow the underlying input as a contiguous slice.
    fn read_slice(&self) -> Result<&[T], ConfigError>;
}

/// Adapter trait for writing contiguous 1D output.
pub trait Write1D<T> {
    /// Borrow the underlying output as a mutable contiguous slice.
    fn write_slice_mut(&mut self) -> Result<&mut [T], ConfigError>;
}

impl<T> Read1D<T> for [T] {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        Ok(self)
    }
}

impl<T> Write1D<T> for [T] {
    fn write_slice_mut(&mut self) -> Result<&mut [T], ConfigError> {
        Ok(self)
    }
}

impl<T, const N: usize> Read1D<T> for [T; N] {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        Ok(self)
    }
}

impl<T, const N: usize> Write1D<T> for [T; N] {
    fn write_slice_mut(&mut self) -> Result<&mut [T], ConfigError> {
        Ok(self)
    }
}

impl<T> Read1D<T> for Vec<T> {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        Ok(self.as_slice())
    }
}

impl<T> Write1D<T> for Vec<T> {
    fn write_slice_mut(&mut self) -> Result<&mut [T], ConfigError> {
        Ok(self.as_mut_slice())
    }
}

impl<T> Read1D<T> for Array1<T> {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        self.as_slice()
            .ok_or(ConfigError::NonContiguous { arg: "array" })
    }
}

impl<T> Write1D<T> for Array1<T> {
    fn write_slice_mut(&mut self) -> Result<&mut [T], ConfigError> {
        self.as_slice_mut()
            .ok_or(ConfigError::NonContiguous { arg: "array" })
    }
}

impl<'a, T> Read1D<T> for ArrayView1<'a, T> {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        self.as_slice()
            .ok_or(ConfigError::NonContiguous { arg: "array_view" })
    }
}

impl<'a, T> Write1D<T> for ArrayViewMut1<'a, T> {
    fn write_slice_mut(&mut self) -> Result<&mut [T], ConfigError> {
        self.as_slice_mut().ok_or(ConfigError::NonContiguous {
            arg: "array_view_mut",
        })
    }
}

/// `None` stands for a buffer the caller did not provide.
impl<T, R> Read1D<T> for Option<R>
where
    R: Read1D<T>,
{
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        match self {
            Some(inner) => inner.read_slice(),
            None => Err(ConfigError::Missing { arg: "input" }),
        }
    }
}

impl<T, W> Write1D<T> for Option<W>
where
    W: Write1D<T>,
{
    fn write_slice_mut(&mut self) -> Result<&mut [T], ConfigError> {
        match self {
            Some(inner) => inner.write_slice_mut(),
            None => Err(ConfigError::Missing { arg: "out" }),
        }
    }
}

impl<T, R> Read1D<T> for &R
where
    R: Read1D<T> + ?Sized,
{
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        (**self).read_slice()
    }
}

impl<T, W> Write1D<T> for &mut W
where
    W: Write1D<T> + ?Sized,
{
    fn write_slice_mut(&mut self) -> Result<&mut [T], ConfigError> {
        (**self).write_slice_mut()
    }
}

/// Bind an input adapter that must hold at least one sample.
pub fn bind_input<'a, T, I>(
    input: &'a I,
    arg: &'static str,
) -> Result<&'a [T], ExecInvariantViolation>
where
    I: Read1D<T> + ?Sized,
{
    let slice = input.read_slice().map_err(ExecInvariantViolation::from)?;
    if slice.is_empty() {
        return Err(ExecInvariantViolation::EmptyInput { arg });
    }
    Ok(slice)
}

/// Bind an output adapter whose length must equal `expected`.
pub fn bind_output<'a, T, O>(
    out: &'a mut O,
    arg: &'static str,
    expected: usize,
) -> Result<&'a mut [T], ExecInvariantViolation>
where
    O: Write1D<T> + ?Sized,
{
    let slice = out
        .write_slice_mut()
        .map_err(ExecInvariantViolation::from)?;
    if slice.len() != expected {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg,
            expected,
            got: slice.len(),
        });
    }
    Ok(slice)
}

/// Bind an output adapter holding at least `required` elements; the returned
/// slice is truncated to `required`.
pub fn bind_output_capacity<'a, T, O>(
    out: &'a mut O,
    arg: &'static str,
    required: usize,
) -> Result<&'a mut [T], ExecInvariantViolation>
where
    O: Write1D<T> + ?Sized,
{
    let slice = out
        .write_slice_mut()
        .map_err(ExecInvariantViolation::from)?;
    if slice.len() < required {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg,
            expected: required,
            got: slice.len(),
        });
    }
    Ok(&mut slice[..required])
}
