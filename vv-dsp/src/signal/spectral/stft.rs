//! Short-time Fourier transform analysis and overlap-add synthesis.

use super::fft::{FftConfig, FftDirection, FftKind, FftPlan};
use crate::kernel::{
    bind_input, bind_output, bind_output_capacity, ConfigError, ExecInvariantViolation,
    KernelLifecycle, Read1D, Write1D,
};
use crate::numeric::policy::{apply_in_place, apply_in_place_cpx, guard_input};
use crate::signal::windows::{get_window, WindowKind};
use ndarray::{Array2, ArrayView2};
use vv_dsp_core::{Cpx, Real};

/// Accumulated squared-window weights below this are treated as silence.
const WEIGHT_FLOOR: Real = 1e-8;

/// Constructor config for [`Stft`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StftConfig {
    /// Frame length `M`, also the FFT length.
    pub fft_size: usize,
    /// Hop `H` between frames, `0 < H <= M`.
    pub hop_size: usize,
    /// Analysis and synthesis window.
    pub window: WindowKind,
}

/// STFT handle owning the window table and a forward/backward plan pair.
#[derive(Debug, Clone)]
pub struct Stft {
    fft_size: usize,
    hop_size: usize,
    kind: WindowKind,
    window: Vec<Real>,
    forward: FftPlan,
    backward: FftPlan,
    frame: Vec<Cpx>,
    time: Vec<Cpx>,
}

impl KernelLifecycle for Stft {
    type Config = StftConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.fft_size == 0 {
            return Err(ConfigError::EmptyInput { arg: "fft_size" });
        }
        if config.hop_size == 0 || config.hop_size > config.fft_size {
            return Err(ConfigError::LengthMismatch {
                arg: "hop_size",
                expected: config.fft_size,
                got: config.hop_size,
            });
        }
        let plan = |direction| {
            FftPlan::try_new(FftConfig {
                len: config.fft_size,
                kind: FftKind::C2C,
                direction,
            })
        };
        let forward = plan(FftDirection::Forward)?;
        let backward = plan(FftDirection::Backward)?;
        tracing::debug!(
            fft_size = config.fft_size,
            hop_size = config.hop_size,
            window = ?config.window,
            "stft handle created"
        );
        Ok(Self {
            fft_size: config.fft_size,
            hop_size: config.hop_size,
            kind: config.window,
            window: get_window(config.window, config.fft_size),
            forward,
            backward,
            frame: vec![Cpx::new(0.0, 0.0); config.fft_size],
            time: vec![Cpx::new(0.0, 0.0); config.fft_size],
        })
    }
}

impl Stft {
    /// Frame length `M`.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Hop `H`.
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Window family.
    pub fn window_kind(&self) -> WindowKind {
        self.kind
    }

    /// Precomputed window table of length `M`.
    pub fn window(&self) -> &[Real] {
        &self.window
    }

    /// Whole frames of length `M` that fit in `signal_len` samples.
    pub fn frame_count(&self, signal_len: usize) -> usize {
        if signal_len < self.fft_size {
            0
        } else {
            (signal_len - self.fft_size) / self.hop_size + 1
        }
    }

    fn analyze_frame(
        &mut self,
        frame: &[Real],
        out: &mut [Cpx],
    ) -> Result<(), ExecInvariantViolation> {
        for ((dst, &x), &w) in self.frame.iter_mut().zip(frame).zip(&self.window) {
            *dst = Cpx::new(x * w, 0.0);
        }
        self.forward.execute_c2c(&self.frame, out)
    }

    /// Window one frame of `M` reals and write its `M` complex bins.
    pub fn process<I, O>(&mut self, frame: &I, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
        O: Write1D<Cpx> + ?Sized,
    {
        let frame = bind_input(frame, "frame")?;
        if frame.len() != self.fft_size {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "frame",
                expected: self.fft_size,
                got: frame.len(),
            });
        }
        let out = bind_output(out, "out", self.fft_size)?;
        let frame = guard_input(frame)?;
        self.analyze_frame(&frame, out)?;
        apply_in_place_cpx(out)
    }

    /// Inverse-transform `M` bins, window the result and add it into the
    /// first `M` samples of `out_add`. When `norm_add` is given, `w[n]^2` is
    /// added at the same positions. The caller positions both buffers at the
    /// current synthesis offset and zeroes them beforehand.
    pub fn reconstruct<I>(
        &mut self,
        spectrum: &I,
        out_add: &mut [Real],
        norm_add: Option<&mut [Real]>,
    ) -> Result<(), ExecInvariantViolation>
    where
        I: Read1D<Cpx> + ?Sized,
    {
        let spectrum = bind_input(spectrum, "spectrum")?;
        if spectrum.len() != self.fft_size {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "spectrum",
                expected: self.fft_size,
                got: spectrum.len(),
            });
        }
        let m = self.fft_size;
        let out_add = bind_output_capacity(out_add, "out_add", m)?;
        let norm_add = match norm_add {
            Some(norm) => Some(bind_output_capacity(norm, "norm_add", m)?),
            None => None,
        };
        self.frame.copy_from_slice(spectrum);
        apply_in_place_cpx(&mut self.frame)?;
        self.backward.execute_c2c(&self.frame, &mut self.time)?;
        for ((dst, z), &w) in out_add.iter_mut().zip(&self.time).zip(&self.window) {
            *dst += z.re * w;
        }
        if let Some(norm) = norm_add {
            for (dst, &w) in norm.iter_mut().zip(&self.window) {
                *dst += w * w;
            }
        }
        apply_in_place(out_add)
    }

    /// Magnitude spectrogram into `out` (row-major `frames x M`); returns the
    /// frame count. Frames advance by `H` and are never zero-padded.
    pub fn spectrogram<I, O>(
        &mut self,
        signal: &I,
        out: &mut O,
    ) -> Result<usize, ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
        O: Write1D<Real> + ?Sized,
    {
        let signal = bind_input(signal, "signal")?;
        let frames = self.frame_count(signal.len());
        let m = self.fft_size;
        let out = bind_output_capacity(out, "out", frames * m)?;
        let signal = guard_input(signal)?;
        tracing::trace!(len = signal.len(), frames, "stft spectrogram");
        let mut bins = vec![Cpx::new(0.0, 0.0); m];
        for (f, row) in out.chunks_exact_mut(m).enumerate() {
            let start = f * self.hop_size;
            self.analyze_frame(&signal[start..start + m], &mut bins)?;
            for (dst, z) in row.iter_mut().zip(&bins) {
                *dst = z.norm();
            }
        }
        apply_in_place(out)?;
        Ok(frames)
    }

    /// [`Stft::spectrogram`] allocated as a `frames x M` array.
    pub fn spectrogram_alloc<I>(
        &mut self,
        signal: &I,
    ) -> Result<Array2<Real>, ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
    {
        let n = bind_input(signal, "signal")?.len();
        let frames = self.frame_count(n);
        let mut data = vec![0.0; frames * self.fft_size];
        self.spectrogram(signal, &mut data)?;
        Array2::from_shape_vec((frames, self.fft_size), data).map_err(|_| {
            ExecInvariantViolation::Backend {
                reason: "spectrogram shape mismatch",
            }
        })
    }

    /// Complex spectra of every whole frame, `frames x M`.
    pub fn analyze<I>(&mut self, signal: &I) -> Result<Array2<Cpx>, ExecInvariantViolation>
    where
        I: Read1D<Real> + ?Sized,
    {
        let signal = bind_input(signal, "signal")?;
        let frames = self.frame_count(signal.len());
        let m = self.fft_size;
        let signal = guard_input(signal)?;
        let mut spectra = Array2::from_elem((frames, m), Cpx::new(0.0, 0.0));
        for (f, mut row) in spectra.outer_iter_mut().enumerate() {
            let start = f * self.hop_size;
            let row = row.as_slice_mut().ok_or(ConfigError::NonContiguous { arg: "spectra" })?;
            self.analyze_frame(&signal[start..start + m], row)?;
        }
        let flat = spectra
            .as_slice_mut()
            .ok_or(ConfigError::NonContiguous { arg: "spectra" })?;
        apply_in_place_cpx(flat)?;
        Ok(spectra)
    }

    /// Overlap-add every row of `spectra` (`frames x M`) at multiples of `H`
    /// and divide by the accumulated squared window wherever it exceeds a
    /// small floor. The output holds `M + H * (frames - 1)` samples.
    pub fn istft(
        &mut self,
        spectra: ArrayView2<'_, Cpx>,
    ) -> Result<Vec<Real>, ExecInvariantViolation> {
        let (frames, m) = spectra.dim();
        if frames == 0 {
            return Err(ExecInvariantViolation::EmptyInput { arg: "spectra" });
        }
        if m != self.fft_size {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "spectra",
                expected: self.fft_size,
                got: m,
            });
        }
        let len = m + self.hop_size * (frames - 1);
        let mut y = vec![0.0; len];
        let mut norm = vec![0.0; len];
        let mut row_buf = vec![Cpx::new(0.0, 0.0); m];
        for (f, row) in spectra.outer_iter().enumerate() {
            let start = f * self.hop_size;
            for (dst, z) in row_buf.iter_mut().zip(row.iter()) {
                *dst = *z;
            }
            self.reconstruct(&row_buf, &mut y[start..], Some(&mut norm[start..]))?;
        }
        for (v, &w) in y.iter_mut().zip(&norm) {
            if w > WEIGHT_FLOOR {
                *v /= w;
            }
        }
        apply_in_place(&mut y)?;
        Ok(y)
    }
}
