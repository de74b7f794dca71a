//! Shared scalar, complex and status types for the `vv-dsp` kernels.
//!
//! The real scalar is chosen at build time: `f32` by default, `f64` with the
//! `use_double` feature. Complex values are a `#[repr(C)]` pair of that scalar,
//! so complex buffers may be viewed as interleaved real buffers of twice the
//! length.

mod scalar;
mod status;

/// Numpy-flavoured numeric primitives.
pub mod num_rs;

pub use scalar::*;
pub use status::*;
