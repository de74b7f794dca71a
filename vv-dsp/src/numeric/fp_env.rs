//! Per-thread floating-point environment control.
//!
//! - **x86-64**: FTZ (bit 15) and DAZ (bit 6) of MXCSR
//! - **aarch64**: FZ (bit 24) of FPCR
//! - **Other targets**: no-op, every query reports `false`
//!
//! The control register belongs to the calling thread, so changes never leak
//! into other threads.

#[cfg(target_arch = "x86_64")]
const FTZ_BIT: u32 = 1 << 15;
#[cfg(target_arch = "x86_64")]
const DAZ_BIT: u32 = 1 << 6;
#[cfg(target_arch = "aarch64")]
const FZ_BIT: u64 = 1 << 24;

#[cfg(target_arch = "x86_64")]
type ControlWord = u32;
#[cfg(target_arch = "aarch64")]
type ControlWord = u64;
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
type ControlWord = ();

#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn read_control() -> ControlWord {
    let mut mxcsr: u32 = 0;
    // SAFETY: `stmxcsr` stores the SSE control word of this thread into a
    // valid, writable u32.
    unsafe {
        core::arch::asm!(
            "stmxcsr [{}]",
            in(reg) &mut mxcsr,
            options(nostack, preserves_flags)
        );
    }
    mxcsr
}

#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn write_control(mxcsr: ControlWord) {
    // SAFETY: `ldmxcsr` loads a control word previously read from this
    // thread with only the FTZ/DAZ bits changed.
    unsafe {
        core::arch::asm!(
            "ldmxcsr [{}]",
            in(reg) &mxcsr,
            options(nostack, preserves_flags)
        );
    }
}

#[cfg(target_arch = "aarch64")]
#[inline(always)]
fn read_control() -> ControlWord {
    let fpcr: u64;
    // SAFETY: reading FPCR has no side effects.
    unsafe {
        core::arch::asm!(
            "mrs {fpcr}, fpcr",
            fpcr = out(reg) fpcr,
            options(nomem, nostack, preserves_flags)
        );
    }
    fpcr
}

#[cfg(target_arch = "aarch64")]
#[inline(always)]
fn write_control(fpcr: ControlWord) {
    // SAFETY: writes back a value read from FPCR with only FZ changed.
    unsafe {
        core::arch::asm!(
            "msr fpcr, {fpcr}",
            fpcr = in(reg) fpcr,
            options(nomem, nostack, preserves_flags)
        );
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline(always)]
fn read_control() -> ControlWord {}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline(always)]
fn write_control(_: ControlWord) {}

/// `true` when this target can flush denormals.
pub const fn flush_denormals_supported() -> bool {
    cfg!(any(target_arch = "x86_64", target_arch = "aarch64"))
}

/// Turn denormal flushing on or off for the calling thread.
///
/// Returns `true` when the request was honoured, `false` on targets without
/// a supported control register.
pub fn set_flush_denormals(enable: bool) -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        let word = read_control();
        let word = if enable {
            word | FTZ_BIT | DAZ_BIT
        } else {
            word & !(FTZ_BIT | DAZ_BIT)
        };
        write_control(word);
        true
    }

    #[cfg(target_arch = "aarch64")]
    {
        let word = read_control();
        write_control(if enable { word | FZ_BIT } else { word & !FZ_BIT });
        true
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        let _ = enable;
        write_control(read_control());
        false
    }
}

/// Whether denormal flushing is active on the calling thread. On x86-64
/// both FTZ and DAZ must be set.
pub fn flush_denormals_enabled() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        read_control() & (FTZ_BIT | DAZ_BIT) == (FTZ_BIT | DAZ_BIT)
    }

    #[cfg(target_arch = "aarch64")]
    {
        read_control() & FZ_BIT != 0
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        false
    }
}

/// Enables denormal flushing and restores the previous control word on drop.
#[derive(Debug)]
pub struct DenormalGuard {
    previous: ControlWord,
}

impl DenormalGuard {
    /// Save the current control word and enable flushing.
    pub fn new() -> Self {
        let previous = read_control();
        set_flush_denormals(true);
        Self { previous }
    }

    /// Run `f` with flushing enabled.
    pub fn with_protection<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = Self::new();
        f()
    }
}

impl Default for DenormalGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DenormalGuard {
    fn drop(&mut self) {
        write_control(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_round_trips_on_supported_targets() {
        let before = flush_denormals_enabled();
        let honoured = set_flush_denormals(true);
        assert_eq!(honoured, flush_denormals_supported());
        assert_eq!(flush_denormals_enabled(), honoured);
        set_flush_denormals(false);
        assert!(!flush_denormals_enabled());
        set_flush_denormals(before);
    }

    #[test]
    fn guard_restores_previous_state() {
        set_flush_denormals(false);
        DenormalGuard::with_protection(|| {
            assert_eq!(flush_denormals_enabled(), flush_denormals_supported());
        });
        assert!(!flush_denormals_enabled());
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn flushing_zeroes_subnormal_products() {
        let tiny = core::hint::black_box(f32::MIN_POSITIVE);
        let half = core::hint::black_box(0.5f32);
        let product = DenormalGuard::with_protection(|| core::hint::black_box(tiny * half));
        assert_eq!(product, 0.0);
    }
}
