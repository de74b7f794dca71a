//! Real-time oriented digital signal processing primitives.
//!
//! Kernels are configured through `XxxConfig` structs, validated once by
//! [`kernel::KernelLifecycle::try_new`] and executed through the capability
//! traits in [`signal::traits`], which bind caller buffers via
//! [`kernel::Read1D`] and [`kernel::Write1D`]. Every failure maps onto one
//! [`Status`] code, and numeric boundaries honour the NaN/Inf policy in
//! [`numeric`].
//!
//! ```
//! use vv_dsp::signal::filter::{savgol_filter, SavgolMode};
//! use vv_dsp::stats::mean;
//!
//! let x: Vec<vv_dsp::Real> = (0..16).map(|v| (v % 4) as vv_dsp::Real).collect();
//! let smooth = savgol_filter(&x, 5, 2, 0, 1.0, SavgolMode::Wrap).unwrap();
//! assert!((mean(&smooth).unwrap() - mean(&x).unwrap()).abs() < 1e-4);
//! ```
#![warn(missing_docs)]

pub mod kernel;
pub mod numeric;
pub mod signal;
pub mod simd;
pub mod stats;

pub use vv_dsp_core::{
    clamp, cpx, cpx_abs, cpx_add, cpx_as_real_slice, cpx_as_real_slice_mut, cpx_conj,
    cpx_from_polar, cpx_mul, cpx_phase, Cpx, Real, Status, REAL_EPSILON,
};
