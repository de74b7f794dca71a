//! NaN/Inf numeric-stability policy.
//!
//! The active policy is stored per thread when the `thread_local_policy`
//! feature is enabled (the default) and in one process-global word
//! otherwise, in which case concurrent writers race and the last write wins.
//! Kernels read the policy at their input and output boundaries and never
//! write it.

use crate::kernel::ExecInvariantViolation;
use std::borrow::Cow;
use num_traits::Float;
use vv_dsp_core::Cpx;

/// Treatment of non-finite samples at kernel boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum NanPolicy {
    /// Pass values through untouched.
    #[default]
    Propagate = 0,
    /// Replace NaN and both infinities with zero.
    Ignore = 1,
    /// Reject the buffer at the first non-finite value.
    Error = 2,
    /// NaN becomes zero, infinities saturate to the largest finite magnitude.
    Clamp = 3,
}

impl NanPolicy {
    /// Decode a raw policy code.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(NanPolicy::Propagate),
            1 => Some(NanPolicy::Ignore),
            2 => Some(NanPolicy::Error),
            3 => Some(NanPolicy::Clamp),
            _ => None,
        }
    }
}

#[cfg(feature = "thread_local_policy")]
mod store {
    use super::NanPolicy;
    use std::cell::Cell;

    thread_local! {
        static POLICY: Cell<NanPolicy> = const { Cell::new(NanPolicy::Propagate) };
    }

    pub(super) fn load() -> NanPolicy {
        POLICY.with(Cell::get)
    }

    pub(super) fn store(policy: NanPolicy) {
        POLICY.with(|cell| cell.set(policy));
    }
}

#[cfg(not(feature = "thread_local_policy"))]
mod store {
    use super::NanPolicy;
    use core::sync::atomic::{AtomicU8, Ordering};

    static POLICY: AtomicU8 = AtomicU8::new(NanPolicy::Propagate as u8);

    pub(super) fn load() -> NanPolicy {
        NanPolicy::from_code(POLICY.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub(super) fn store(policy: NanPolicy) {
        POLICY.store(policy as u8, Ordering::Relaxed);
    }
}

/// Current policy of the calling thread.
pub fn nan_policy() -> NanPolicy {
    store::load()
}

/// Replace the current policy.
pub fn set_nan_policy(policy: NanPolicy) {
    store::store(policy);
}

/// Set the policy from a raw code. Unknown codes leave the state unchanged.
pub fn set_nan_policy_code(code: u8) {
    if let Some(policy) = NanPolicy::from_code(code) {
        store::store(policy);
    }
}

/// Restores the previously active policy when dropped.
#[derive(Debug)]
pub struct ScopedNanPolicy {
    previous: NanPolicy,
}

impl ScopedNanPolicy {
    /// Activate `policy` until the guard is dropped.
    pub fn new(policy: NanPolicy) -> Self {
        let previous = nan_policy();
        set_nan_policy(policy);
        Self { previous }
    }
}

impl Drop for ScopedNanPolicy {
    fn drop(&mut self) {
        set_nan_policy(self.previous);
    }
}

/// Apply `policy` to one value. `None` means the value is rejected.
#[inline]
pub fn apply_scalar<F: Float>(v: F, policy: NanPolicy) -> Option<F> {
    if v.is_finite() {
        return Some(v);
    }
    match policy {
        NanPolicy::Propagate => Some(v),
        NanPolicy::Ignore => Some(F::zero()),
        NanPolicy::Error => None,
        NanPolicy::Clamp => Some(if v.is_nan() {
            F::zero()
        } else if v.is_sign_positive() {
            F::max_value()
        } else {
            F::min_value()
        }),
    }
}

fn rejected(index: usize) -> ExecInvariantViolation {
    tracing::warn!(index, "non-finite sample rejected by NaN/Inf policy");
    ExecInvariantViolation::NonFinite { index }
}

/// Enforce the current policy over `buf` in place.
pub fn apply_in_place<F: Float>(buf: &mut [F]) -> Result<(), ExecInvariantViolation> {
    apply_in_place_with(buf, nan_policy())
}

/// Enforce `policy` over `buf` in place. A no-op under
/// [`NanPolicy::Propagate`].
pub fn apply_in_place_with<F: Float>(
    buf: &mut [F],
    policy: NanPolicy,
) -> Result<(), ExecInvariantViolation> {
    if policy == NanPolicy::Propagate {
        return Ok(());
    }
    for (index, v) in buf.iter_mut().enumerate() {
        *v = apply_scalar(*v, policy).ok_or_else(|| rejected(index))?;
    }
    Ok(())
}

/// Enforce the current policy over the real and imaginary parts of `buf`.
pub fn apply_in_place_cpx(buf: &mut [Cpx]) -> Result<(), ExecInvariantViolation> {
    let policy = nan_policy();
    if policy == NanPolicy::Propagate {
        return Ok(());
    }
    for (index, z) in buf.iter_mut().enumerate() {
        z.re = apply_scalar(z.re, policy).ok_or_else(|| rejected(index))?;
        z.im = apply_scalar(z.im, policy).ok_or_else(|| rejected(index))?;
    }
    Ok(())
}

/// Enforce the current policy while copying `input` into `out`.
///
/// `out = None` checks without writing. Under [`NanPolicy::Propagate`] a
/// provided destination receives a straight copy.
pub fn apply_copy<F: Float>(
    input: &[F],
    out: Option<&mut [F]>,
) -> Result<(), ExecInvariantViolation> {
    apply_copy_with(input, out, nan_policy())
}

/// [`apply_copy`] with an explicit policy.
pub fn apply_copy_with<F: Float>(
    input: &[F],
    out: Option<&mut [F]>,
    policy: NanPolicy,
) -> Result<(), ExecInvariantViolation> {
    if input.is_empty() {
        return Ok(());
    }
    match out {
        Some(out) => {
            if out.len() < input.len() {
                return Err(ExecInvariantViolation::LengthMismatch {
                    arg: "out",
                    expected: input.len(),
                    got: out.len(),
                });
            }
            if policy == NanPolicy::Propagate {
                out[..input.len()].copy_from_slice(input);
                return Ok(());
            }
            for (index, (dst, &v)) in out.iter_mut().zip(input).enumerate() {
                *dst = apply_scalar(v, policy).ok_or_else(|| rejected(index))?;
            }
            Ok(())
        }
        None => {
            if policy != NanPolicy::Error {
                return Ok(());
            }
            match input.iter().position(|v| !v.is_finite()) {
                Some(index) => Err(rejected(index)),
                None => Ok(()),
            }
        }
    }
}

/// Bind a read-only kernel input under the current policy.
///
/// Borrows the caller's buffer when the policy cannot change any value
/// (PROPAGATE, or ERROR after a successful scan) and otherwise returns a
/// sanitised local copy.
pub(crate) fn guard_input<F: Float>(input: &[F]) -> Result<Cow<'_, [F]>, ExecInvariantViolation> {
    match nan_policy() {
        NanPolicy::Propagate => Ok(Cow::Borrowed(input)),
        NanPolicy::Error => {
            apply_copy_with(input, None, NanPolicy::Error)?;
            Ok(Cow::Borrowed(input))
        }
        policy => {
            let mut local = vec![F::zero(); input.len()];
            apply_copy_with(input, Some(&mut local), policy)?;
            Ok(Cow::Owned(local))
        }
    }
}

/// Enforce the current policy on a single generated value.
pub(crate) fn guard_scalar<F: Float>(v: F) -> Result<F, ExecInvariantViolation> {
    apply_scalar(v, nan_policy()).ok_or_else(|| rejected(0))
}
