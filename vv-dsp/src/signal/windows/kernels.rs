//! Trait-first window generation kernels.

use crate::kernel::{
    bind_output, ConfigError, ExecInvariantViolation, KernelLifecycle, Write1D,
};
use crate::signal::traits::WindowGenerate;
use vv_dsp_core::Real;

use super::{fill_window, WindowKind};

/// Constructor config for [`WindowKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Window family.
    pub kind: WindowKind,
    /// Table length.
    pub len: usize,
}

/// Trait-first window generation kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowKernel {
    kind: WindowKind,
    len: usize,
}

impl WindowKernel {
    /// Window family.
    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    /// Table length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; zero-length tables are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl KernelLifecycle for WindowKernel {
    type Config = WindowConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if config.len == 0 {
            return Err(ConfigError::EmptyInput { arg: "len" });
        }
        Ok(Self {
            kind: config.kind,
            len: config.len,
        })
    }
}

impl WindowGenerate<Real> for WindowKernel {
    fn run_into<O>(&self, out: &mut O) -> Result<(), ExecInvariantViolation>
    where
        O: Write1D<Real> + ?Sized,
    {
        let out = bind_output(out, "out", self.len)?;
        fill_window(self.kind, out);
        Ok(())
    }

    fn run_alloc(&self) -> Result<Vec<Real>, ExecInvariantViolation> {
        let mut out = vec![0.0; self.len];
        self.run_into(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vv_dsp_core::Status;

    #[test]
    fn kernel_generates_expected_length() {
        let kernel = WindowKernel::try_new(WindowConfig {
            kind: WindowKind::Hamming,
            len: 16,
        })
        .expect("kernel should initialize");
        let w = kernel.run_alloc().expect("window");
        assert_eq!(w.len(), 16);
        assert_eq!(kernel.kind(), WindowKind::Hamming);
    }

    #[test]
    fn kernel_rejects_zero_length() {
        let err = WindowKernel::try_new(WindowConfig {
            kind: WindowKind::Hann,
            len: 0,
        })
        .expect_err("zero length");
        assert_eq!(err.status(), Status::InvalidSize);
    }

    #[test]
    fn kernel_checks_output_length() {
        let kernel = WindowKernel::try_new(WindowConfig {
            kind: WindowKind::Rectangular,
            len: 4,
        })
        .expect("kernel should initialize");
        let mut out = [0.0 as Real; 3];
        let err = kernel.run_into(&mut out).expect_err("short output");
        assert!(matches!(err, ExecInvariantViolation::LengthMismatch { .. }));
    }
}
