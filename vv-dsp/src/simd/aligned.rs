//! Aligned raw allocation and an owned aligned buffer built on top of it.
//!
//! Each allocation carries a header just below the payload holding the
//! original allocation pointer, the payload size, the alignment and a magic
//! tag. [`aligned_free`] reads the header back to rebuild the layout and
//! refuses pointers whose tag does not match.

use core::mem::{align_of, size_of};
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;
use rustfft::num_complex::Complex;
use std::alloc::{alloc_zeroed, dealloc, Layout};

use super::caps::DEFAULT_ALIGNMENT;

const MAGIC: usize = 0xABCD_1234;

#[repr(C)]
struct Header {
    original: *mut u8,
    size: usize,
    alignment: usize,
    magic: usize,
}

const HEADER: usize = size_of::<Header>();

fn payload_offset(alignment: usize) -> usize {
    HEADER.div_ceil(alignment) * alignment
}

fn outer_layout(size: usize, alignment: usize) -> Option<Layout> {
    let total = payload_offset(alignment).checked_add(size)?;
    Layout::from_size_align(total, alignment).ok()
}

/// Allocate `size` zeroed bytes aligned to `alignment`.
///
/// Returns `None` when `size` is zero, `alignment` is not a power of two, or
/// the allocator fails. Alignments below the pointer size are raised to it.
pub fn aligned_alloc(size: usize, alignment: usize) -> Option<NonNull<u8>> {
    if size == 0 || !alignment.is_power_of_two() {
        return None;
    }
    let alignment = alignment.max(align_of::<Header>());
    let layout = outer_layout(size, alignment)?;
    // SAFETY: the layout has a non-zero size.
    let original = unsafe { alloc_zeroed(layout) };
    if original.is_null() {
        return None;
    }
    // SAFETY: the payload offset lies inside the allocation and leaves room
    // for a header, which is itself suitably aligned because the offset and
    // the header size are multiples of the pointer alignment.
    unsafe {
        let payload = original.add(payload_offset(alignment));
        payload.cast::<Header>().sub(1).write(Header {
            original,
            size,
            alignment,
            magic: MAGIC,
        });
        NonNull::new(payload)
    }
}

/// Allocate with [`DEFAULT_ALIGNMENT`].
pub fn aligned_alloc_default(size: usize) -> Option<NonNull<u8>> {
    aligned_alloc(size, DEFAULT_ALIGNMENT)
}

/// Release memory obtained from [`aligned_alloc`].
///
/// Returns `false` (and leaks) when the header tag is corrupt.
///
/// # Safety
/// `ptr` must come from [`aligned_alloc`] and must not have been freed.
pub unsafe fn aligned_free(ptr: NonNull<u8>) -> bool {
    // SAFETY: the caller guarantees `ptr` is a live payload pointer, so a
    // header precedes it.
    let header = unsafe { ptr.as_ptr().cast::<Header>().sub(1).read() };
    if header.magic != MAGIC {
        return false;
    }
    match outer_layout(header.size, header.alignment) {
        Some(layout) => {
            // SAFETY: pointer and layout are exactly those used to allocate.
            unsafe { dealloc(header.original, layout) };
            true
        }
        None => false,
    }
}

/// Whether `ptr` is aligned to `alignment` (a power of two).
pub fn is_aligned<T>(ptr: *const T, alignment: usize) -> bool {
    alignment.is_power_of_two() && (ptr as usize) & (alignment - 1) == 0
}

/// Owned, zero-initialised, aligned buffer of `T`.
///
/// Restricted to plain numeric element types whose all-zero bit pattern is a
/// valid value.
pub struct AlignedBuffer<T: AlignedElement> {
    ptr: NonNull<T>,
    len: usize,
    alignment: usize,
}

/// Element types valid when zero-initialised.
///
/// # Safety
/// The all-zero bit pattern must be a valid value of the type.
pub unsafe trait AlignedElement: Copy {}

// SAFETY: zero bits are 0.0 for IEEE floats and (0, 0) for complex pairs.
unsafe impl AlignedElement for f32 {}
unsafe impl AlignedElement for f64 {}
unsafe impl AlignedElement for Complex<f32> {}
unsafe impl AlignedElement for Complex<f64> {}

impl<T: AlignedElement> AlignedBuffer<T> {
    /// Zeroed buffer of `len` elements at [`DEFAULT_ALIGNMENT`].
    pub fn zeroed(len: usize) -> Option<Self> {
        Self::zeroed_with_alignment(len, DEFAULT_ALIGNMENT)
    }

    /// Zeroed buffer of `len` elements at `alignment` (raised to the
    /// alignment of `T` when smaller).
    pub fn zeroed_with_alignment(len: usize, alignment: usize) -> Option<Self> {
        if !alignment.is_power_of_two() {
            return None;
        }
        let alignment = alignment.max(align_of::<T>());
        let bytes = len.checked_mul(size_of::<T>())?;
        let ptr = aligned_alloc(bytes, alignment)?.cast::<T>();
        Some(Self {
            ptr,
            len,
            alignment,
        })
    }

    /// Requested alignment in bytes.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Reset every element to zero.
    pub fn clear(&mut self) {
        // SAFETY: the buffer owns `len` elements and zero is a valid `T`.
        unsafe { core::ptr::write_bytes(self.ptr.as_ptr(), 0, self.len) };
    }
}

impl<T: AlignedElement> Deref for AlignedBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: `ptr` points at `len` initialised elements owned by self.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: AlignedElement> DerefMut for AlignedBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: as in `deref`, and the borrow is exclusive.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: AlignedElement> Drop for AlignedBuffer<T> {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from `aligned_alloc` and is freed exactly once.
        unsafe {
            aligned_free(self.ptr.cast::<u8>());
        }
    }
}

impl<T: AlignedElement> Clone for AlignedBuffer<T> {
    fn clone(&self) -> Self {
        let mut copy = match Self::zeroed_with_alignment(self.len, self.alignment) {
            Some(copy) => copy,
            None => std::alloc::handle_alloc_error(
                Layout::from_size_align(self.len * size_of::<T>(), self.alignment)
                    .unwrap_or(Layout::new::<T>()),
            ),
        };
        copy.copy_from_slice(self);
        copy
    }
}

impl<T: AlignedElement + core::fmt::Debug> core::fmt::Debug for AlignedBuffer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("alignment", &self.alignment)
            .field("data", &&self[..])
            .finish()
    }
}

// SAFETY: the buffer uniquely owns its allocation, like `Vec<T>`.
unsafe impl<T: AlignedElement + Send> Send for AlignedBuffer<T> {}
unsafe impl<T: AlignedElement + Sync> Sync for AlignedBuffer<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use vv_dsp_core::{Cpx, Real};

    #[test]
    fn rejects_zero_size_and_bad_alignment() {
        assert!(aligned_alloc(0, 16).is_none());
        assert!(aligned_alloc(64, 24).is_none());
        assert!(aligned_alloc(64, 0).is_none());
    }

    #[test]
    fn honours_every_power_of_two_alignment() {
        for shift in 0..8 {
            let alignment = 1usize << shift;
            let ptr = aligned_alloc(100, alignment).expect("allocation");
            assert!(is_aligned(ptr.as_ptr(), alignment.max(align_of::<usize>())));
            // SAFETY: freshly allocated above.
            assert!(unsafe { aligned_free(ptr) });
        }
    }

    #[test]
    fn default_alignment_allocation() {
        let ptr = aligned_alloc_default(33).expect("allocation");
        assert!(is_aligned(ptr.as_ptr(), DEFAULT_ALIGNMENT));
        // SAFETY: freshly allocated above.
        assert!(unsafe { aligned_free(ptr) });
    }

    #[test]
    fn aligned_buffer_is_zeroed_and_writable() {
        let mut buf = AlignedBuffer::<Real>::zeroed_with_alignment(37, 64).expect("buffer");
        assert!(is_aligned(buf.as_ptr(), 64));
        assert!(buf.iter().all(|v| *v == 0.0));
        buf[36] = 1.5;
        let copy = buf.clone();
        assert_eq!(copy[36], 1.5);
        buf.clear();
        assert_eq!(buf[36], 0.0);
    }

    #[test]
    fn complex_buffer_respects_element_alignment() {
        let buf = AlignedBuffer::<Cpx>::zeroed_with_alignment(8, 1).expect("buffer");
        assert!(buf.alignment() >= align_of::<Cpx>());
        assert_eq!(buf.len(), 8);
    }
}
