//! Symmetric cosine-sum window tables.

mod kernels;

pub use kernels::*;

use core::f64::consts::PI;
use vv_dsp_core::Real;

/// Window family. Every family is symmetric over `n - 1` and a length-1
/// window is `[1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WindowKind {
    /// Constant one.
    Rectangular,
    /// `0.5 - 0.5 cos(2 pi n / (N - 1))`.
    #[default]
    Hann,
    /// `0.54 - 0.46 cos(2 pi n / (N - 1))`.
    Hamming,
    /// `0.42 - 0.5 cos(x) + 0.08 cos(2x)` with `x = 2 pi n / (N - 1)`.
    Blackman,
}

impl WindowKind {
    /// Coefficient `n` of a length-`len` table, evaluated in `f64`.
    pub fn coefficient(self, n: usize, len: usize) -> f64 {
        if len <= 1 {
            return 1.0;
        }
        let x = 2.0 * PI * n as f64 / (len - 1) as f64;
        match self {
            WindowKind::Rectangular => 1.0,
            WindowKind::Hann => 0.5 - 0.5 * x.cos(),
            WindowKind::Hamming => 0.54 - 0.46 * x.cos(),
            WindowKind::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
        }
    }
}

/// Overwrite `out` with the `kind` table of length `out.len()`.
pub fn fill_window(kind: WindowKind, out: &mut [Real]) {
    let len = out.len();
    for (n, w) in out.iter_mut().enumerate() {
        *w = kind.coefficient(n, len) as Real;
    }
}

///
/// Allocate a length-`n` table of the given window family.
///
/// ```
/// use vv_dsp::signal::windows::{get_window, WindowKind};
///
/// let w = get_window(WindowKind::Hann, 5);
/// assert_eq!(w.len(), 5);
/// assert!(w[0].abs() < 1e-6 && (w[2] - 1.0).abs() < 1e-6);
/// ```
///
pub fn get_window(kind: WindowKind, n: usize) -> Vec<Real> {
    let mut out = vec![0.0; n];
    fill_window(kind, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn tables_are_symmetric() {
        for kind in [
            WindowKind::Rectangular,
            WindowKind::Hann,
            WindowKind::Hamming,
            WindowKind::Blackman,
        ] {
            let w = get_window(kind, 9);
            for i in 0..9 {
                assert_abs_diff_eq!(w[i], w[8 - i], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn endpoints_match_closed_forms() {
        assert_abs_diff_eq!(get_window(WindowKind::Hamming, 8)[0], 0.08, epsilon = 1e-6);
        assert_abs_diff_eq!(get_window(WindowKind::Blackman, 8)[0], 0.0, epsilon = 1e-6);
        assert_eq!(get_window(WindowKind::Rectangular, 3), vec![1.0; 3]);
    }

    #[test]
    fn single_point_window_is_one() {
        assert_eq!(get_window(WindowKind::Blackman, 1), vec![1.0]);
        assert_eq!(get_window(WindowKind::Hann, 1), vec![1.0]);
    }
}
