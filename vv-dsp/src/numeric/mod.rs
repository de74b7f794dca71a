//! Numeric-stability configuration: the NaN/Inf policy store and the
//! per-thread floating-point environment.

pub mod fp_env;
pub mod policy;

pub use fp_env::{
    flush_denormals_enabled, flush_denormals_supported, set_flush_denormals, DenormalGuard,
};
pub use policy::{
    apply_copy, apply_copy_with, apply_in_place, apply_in_place_cpx, apply_in_place_with,
    apply_scalar, nan_policy, set_nan_policy, set_nan_policy_code, NanPolicy, ScopedNanPolicy,
};
