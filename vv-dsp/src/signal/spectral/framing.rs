//! Frame extraction and overlap-add for block-wise analysis/synthesis.

use crate::kernel::ExecInvariantViolation;
use vv_dsp_core::Real;

/// Number of frames produced for a signal.
///
/// Centred framing yields `ceil(signal_len / hop)` frames. Otherwise frames
/// must fit entirely: `1 + (signal_len - frame_len) / hop`, or 0 when the
/// signal is shorter than one frame. A zero hop yields 0.
pub fn num_frames(signal_len: usize, frame_len: usize, hop: usize, center: bool) -> usize {
    if hop == 0 {
        return 0;
    }
    if center {
        signal_len.div_ceil(hop)
    } else if signal_len < frame_len {
        0
    } else {
        1 + (signal_len - frame_len) / hop
    }
}

// Symmetric reflection with edge repetition, folded over any distance.
fn reflect_index(idx: i64, len: usize) -> usize {
    let len = len as i64;
    let m = idx.rem_euclid(2 * len);
    (if m < len { m } else { 2 * len - 1 - m }) as usize
}

///
/// Copy frame `index` of `signal` into `frame`.
///
/// Centred frames start at `index * hop - frame.len() / 2` and read past the
/// signal ends by symmetric reflection; other frames start at `index * hop`
/// and read zeros outside the signal. A `window` of the frame length, when
/// given, multiplies the samples.
///
/// ```
/// use vv_dsp::signal::spectral::fetch_frame;
///
/// let x = [1., 2., 3., 4.];
/// let mut frame = [0.; 4];
/// fetch_frame(&x, &mut frame, 2, 0, true, None).unwrap();
/// assert_eq!(frame, [2., 1., 1., 2.]);
/// ```
///
pub fn fetch_frame(
    signal: &[Real],
    frame: &mut [Real],
    hop: usize,
    index: usize,
    center: bool,
    window: Option<&[Real]>,
) -> Result<(), ExecInvariantViolation> {
    if signal.is_empty() {
        return Err(ExecInvariantViolation::EmptyInput { arg: "signal" });
    }
    if frame.is_empty() {
        return Err(ExecInvariantViolation::EmptyInput { arg: "frame" });
    }
    if hop == 0 {
        return Err(ExecInvariantViolation::EmptyInput { arg: "hop" });
    }
    if let Some(w) = window {
        if w.len() < frame.len() {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "window",
                expected: frame.len(),
                got: w.len(),
            });
        }
    }

    let mut start = (index * hop) as i64;
    if center {
        start -= (frame.len() / 2) as i64;
    }
    for (i, dst) in frame.iter_mut().enumerate() {
        let idx = start + i as i64;
        *dst = if center {
            signal[reflect_index(idx, signal.len())]
        } else if idx < 0 || idx >= signal.len() as i64 {
            0.0
        } else {
            signal[idx as usize]
        };
    }
    if let Some(w) = window {
        for (dst, w) in frame.iter_mut().zip(w) {
            *dst *= w;
        }
    }
    Ok(())
}

/// Accumulate `frame` into `out` starting at `index * hop`; samples past the
/// end of `out` are dropped.
pub fn overlap_add(
    frame: &[Real],
    out: &mut [Real],
    hop: usize,
    index: usize,
) -> Result<(), ExecInvariantViolation> {
    if frame.is_empty() {
        return Err(ExecInvariantViolation::EmptyInput { arg: "frame" });
    }
    if out.is_empty() {
        return Err(ExecInvariantViolation::EmptyInput { arg: "out" });
    }
    if hop == 0 {
        return Err(ExecInvariantViolation::EmptyInput { arg: "hop" });
    }
    let start = index * hop;
    if let Some(tail) = out.get_mut(start..) {
        for (dst, v) in tail.iter_mut().zip(frame) {
            *dst += v;
        }
    }
    Ok(())
}
