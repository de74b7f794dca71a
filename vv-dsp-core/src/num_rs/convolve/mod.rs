mod ndarray_conv_binds;

use crate::{Error, Result};
use ndarray::{Array1, ArrayView1};
use ndarray_conv::{ConvExt, PaddingMode};

/// Convolution mode determines behavior near edges and output size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvolveMode {
    /// Full convolution, output size is `in1.len() + in2.len() - 1`
    Full,
    /// Valid convolution, output size is
    /// `max(in1.len(), in2.len()) - min(in1.len(), in2.len()) + 1`
    Valid,
    /// Same convolution, output size is `in1.len()`
    Same,
}

/// Discrete linear convolution of two one-dimensional sequences, numpy style.
/// `v` is the kernel and must not be longer than `a`.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use vv_dsp_core::num_rs::{ConvolveMode, convolve};
///
/// let a = array![1., 2., 3.];
/// let v = array![0., 1., 0.5];
///
/// let full = convolve((&a).into(), (&v).into(), ConvolveMode::Full).unwrap();
/// assert_eq!(full, array![0., 1., 2.5, 4., 1.5]);
///
/// let valid = convolve((&a).into(), (&v).into(), ConvolveMode::Valid).unwrap();
/// assert_eq!(valid, array![2.5]);
/// ```
pub fn convolve<T>(a: ArrayView1<T>, v: ArrayView1<T>, mode: ConvolveMode) -> Result<Array1<T>>
where
    T: num_traits::NumAssign + Copy,
{
    check_operands(&a, &v)?;
    // ndarray-conv slides the kernel without flipping it.
    let reversed: Array1<T> = v.iter().rev().copied().collect();
    sliding_dot(a, reversed.view(), mode)
}

/// Sliding dot product of `a` against `v` without kernel reversal:
/// in [`ConvolveMode::Valid`] `out[n] = sum_k a[n + k] * v[k]`.
///
/// Same operand requirements as [`convolve`].
///
/// ```
/// use ndarray::array;
/// use vv_dsp_core::num_rs::{ConvolveMode, correlate};
///
/// let a = array![1., 2., 3., 4.];
/// let v = array![-1., 0., 1.];
/// let valid = correlate((&a).into(), (&v).into(), ConvolveMode::Valid).unwrap();
/// assert_eq!(valid, array![2., 2.]);
/// ```
pub fn correlate<T>(a: ArrayView1<T>, v: ArrayView1<T>, mode: ConvolveMode) -> Result<Array1<T>>
where
    T: num_traits::NumAssign + Copy,
{
    check_operands(&a, &v)?;
    sliding_dot(a, v, mode)
}

fn check_operands<T>(a: &ArrayView1<T>, v: &ArrayView1<T>) -> Result<()> {
    if a.is_empty() || v.is_empty() {
        return Err(Error::InvalidSize {
            arg: "a",
            reason: "convolution operands must be non-empty",
        });
    }
    if v.len() > a.len() {
        return Err(Error::InvalidSize {
            arg: "v",
            reason: "kernel must not be longer than the signal",
        });
    }
    Ok(())
}

fn sliding_dot<T>(a: ArrayView1<T>, v: ArrayView1<T>, mode: ConvolveMode) -> Result<Array1<T>>
where
    T: num_traits::NumAssign + Copy,
{
    a.conv(&v, mode.into(), PaddingMode::Zeros)
        .map_err(|e| Error::Conv {
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod linear_convolve {
    use super::*;
    use ndarray::array;

    #[test]
    fn full() {
        let a = array![1., 2., 3.];
        let v = array![0., 1., 0.5];

        let expected = array![0., 1., 2.5, 4., 1.5];
        let result = convolve((&a).into(), (&v).into(), ConvolveMode::Full).unwrap();
        assert_eq!(result, expected);
    }

    #[test]
    fn same() {
        let a = array![1., 2., 3.];
        let v = array![0., 1., 0.5];

        let expected = array![1., 2.5, 4.];
        let result = convolve((&a).into(), (&v).into(), ConvolveMode::Same).unwrap();
        assert_eq!(result, expected);
    }

    #[test]
    fn valid_correlation_keeps_kernel_orientation() {
        let a = array![1., 2., 3., 4.];
        let v = array![-1., 0., 1.];

        let result = correlate((&a).into(), (&v).into(), ConvolveMode::Valid).unwrap();
        assert_eq!(result, array![2., 2.]);
    }

    #[test]
    fn asymmetric_kernel_is_flipped_by_convolve_only() {
        let a = array![1., 0., 0., 0., 2.];
        let v = array![1., 2., 3.];

        let conv = convolve((&a).into(), (&v).into(), ConvolveMode::Full).unwrap();
        assert_eq!(conv, array![1., 2., 3., 0., 2., 4., 6.]);
        let corr = correlate((&a).into(), (&v).into(), ConvolveMode::Full).unwrap();
        assert_eq!(corr, array![3., 2., 1., 0., 6., 4., 2.]);
        let valid = correlate((&a).into(), (&v).into(), ConvolveMode::Valid).unwrap();
        assert_eq!(valid, array![1., 0., 6.]);
    }

    #[test]
    fn rejects_kernel_longer_than_signal() {
        let a = array![1., 2.];
        let v = array![1., 2., 3.];
        let err = convolve((&a).into(), (&v).into(), ConvolveMode::Full).unwrap_err();
        assert_eq!(err.status(), crate::Status::InvalidSize);
    }
}
