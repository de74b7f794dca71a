use core::mem::{align_of, size_of};

/// Real sample type used by every public buffer.
#[cfg(not(feature = "use_double"))]
pub type Real = f32;

/// Real sample type used by every public buffer.
#[cfg(feature = "use_double")]
pub type Real = f64;

/// Complex sample as an interleaved `(re, im)` pair of [`Real`].
pub type Cpx = num_complex::Complex<Real>;

/// Machine epsilon of [`Real`].
pub const REAL_EPSILON: Real = Real::EPSILON;

const _: () = assert!(size_of::<Cpx>() == 2 * size_of::<Real>());
const _: () = assert!(align_of::<Cpx>() == align_of::<Real>());

/// Build a complex value from its parts.
#[inline]
pub fn cpx(re: Real, im: Real) -> Cpx {
    Cpx::new(re, im)
}

/// Complex addition.
#[inline]
pub fn cpx_add(a: Cpx, b: Cpx) -> Cpx {
    Cpx::new(a.re + b.re, a.im + b.im)
}

/// Complex multiplication.
#[inline]
pub fn cpx_mul(a: Cpx, b: Cpx) -> Cpx {
    Cpx::new(a.re * b.re - a.im * b.im, a.re * b.im + a.im * b.re)
}

/// Complex conjugate.
#[inline]
pub fn cpx_conj(z: Cpx) -> Cpx {
    Cpx::new(z.re, -z.im)
}

/// Magnitude, computed with `hypot` to avoid intermediate overflow.
#[inline]
pub fn cpx_abs(z: Cpx) -> Real {
    z.re.hypot(z.im)
}

/// Phase angle in radians, in `(-pi, pi]`.
#[inline]
pub fn cpx_phase(z: Cpx) -> Real {
    z.im.atan2(z.re)
}

/// Complex value from magnitude and phase.
#[inline]
pub fn cpx_from_polar(r: Real, theta: Real) -> Cpx {
    Cpx::new(r * theta.cos(), r * theta.sin())
}

/// Clamp `v` into `[lo, hi]`. NaN passes through unchanged.
#[inline]
pub fn clamp(v: Real, lo: Real, hi: Real) -> Real {
    if v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    }
}

/// View a complex buffer as interleaved reals of twice the length.
pub fn cpx_as_real_slice(z: &[Cpx]) -> &[Real] {
    // SAFETY: `Cpx` is `#[repr(C)]` over two `Real`s with the alignment of
    // `Real` (checked above), so the storage is `2 * len` contiguous reals.
    unsafe { core::slice::from_raw_parts(z.as_ptr().cast::<Real>(), z.len() * 2) }
}

/// Mutable counterpart of [`cpx_as_real_slice`].
pub fn cpx_as_real_slice_mut(z: &mut [Cpx]) -> &mut [Real] {
    // SAFETY: see `cpx_as_real_slice`; the borrow is exclusive.
    unsafe { core::slice::from_raw_parts_mut(z.as_mut_ptr().cast::<Real>(), z.len() * 2) }
}
