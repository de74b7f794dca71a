//! Aligned-buffer and SIMD capability layer.
//!
//! Kernels may specialise on the reported tier but a scalar path is always
//! compiled and selectable. Nothing here consults the NaN/Inf policy.

mod aligned;
mod caps;

pub use aligned::*;
pub use caps::*;
