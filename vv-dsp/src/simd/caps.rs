//! Vector capability surface: compiled ISA tier, widths and alignment.

use core::mem::size_of;
use vv_dsp_core::Real;

/// 16-byte alignment (SSE, NEON).
pub const ALIGN_SSE: usize = 16;
/// 32-byte alignment (AVX2).
pub const ALIGN_AVX2: usize = 32;
/// 64-byte alignment (AVX-512).
pub const ALIGN_AVX512: usize = 64;

/// Vector ISA tier selected by the crate features at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimdTier {
    /// Portable scalar code, always available.
    Scalar,
    /// 128-bit NEON.
    Neon,
    /// 128-bit SSE4.1.
    Sse41,
    /// 256-bit AVX2.
    Avx2,
    /// 512-bit AVX-512.
    Avx512,
}

impl SimdTier {
    /// The widest tier enabled by the build configuration.
    pub const fn active() -> Self {
        if cfg!(feature = "avx512") {
            SimdTier::Avx512
        } else if cfg!(feature = "avx2") {
            SimdTier::Avx2
        } else if cfg!(feature = "sse4_1") {
            SimdTier::Sse41
        } else if cfg!(feature = "neon") {
            SimdTier::Neon
        } else {
            SimdTier::Scalar
        }
    }

    /// Static name of the tier.
    pub const fn as_str(self) -> &'static str {
        match self {
            SimdTier::Scalar => "scalar",
            SimdTier::Neon => "NEON",
            SimdTier::Sse41 => "SSE4.1",
            SimdTier::Avx2 => "AVX2",
            SimdTier::Avx512 => "AVX-512",
        }
    }

    /// Preferred buffer alignment in bytes.
    pub const fn alignment(self) -> usize {
        match self {
            SimdTier::Scalar => size_of::<Real>(),
            SimdTier::Neon | SimdTier::Sse41 => ALIGN_SSE,
            SimdTier::Avx2 => ALIGN_AVX2,
            SimdTier::Avx512 => ALIGN_AVX512,
        }
    }

    /// `f32` lanes per vector register.
    pub const fn f32_lanes(self) -> usize {
        match self {
            SimdTier::Scalar => 1,
            SimdTier::Neon | SimdTier::Sse41 => 4,
            SimdTier::Avx2 => 8,
            SimdTier::Avx512 => 16,
        }
    }

    /// `f64` lanes per vector register.
    pub const fn f64_lanes(self) -> usize {
        match self {
            SimdTier::Scalar => 1,
            SimdTier::Neon | SimdTier::Sse41 => 2,
            SimdTier::Avx2 => 4,
            SimdTier::Avx512 => 8,
        }
    }

    /// Lanes of [`Real`] per vector register.
    pub const fn real_lanes(self) -> usize {
        if size_of::<Real>() == size_of::<f64>() {
            self.f64_lanes()
        } else {
            self.f32_lanes()
        }
    }
}

/// Default allocation alignment: the widest enabled tier, or the scalar size.
pub const DEFAULT_ALIGNMENT: usize = SimdTier::active().alignment();

/// Name of the ISA tier compiled in.
pub const fn simd_capabilities() -> &'static str {
    SimdTier::active().as_str()
}

/// Features reported by the running CPU, independent of the compiled tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuFeatures {
    /// SSE4.1 available.
    pub has_sse41: bool,
    /// AVX2 available.
    pub has_avx2: bool,
    /// AVX-512 Foundation available.
    pub has_avx512f: bool,
    /// NEON available.
    pub has_neon: bool,
}

impl CpuFeatures {
    /// Probe the running CPU. CPUID results are cached by `cpufeatures`.
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            cpufeatures::new!(cpuid_sse41, "sse4.1");
            cpufeatures::new!(cpuid_avx2, "avx2");
            cpufeatures::new!(cpuid_avx512f, "avx512f");

            Self {
                has_sse41: cpuid_sse41::get(),
                has_avx2: cpuid_avx2::get(),
                has_avx512f: cpuid_avx512f::get(),
                has_neon: false,
            }
        }

        #[cfg(target_arch = "aarch64")]
        {
            // NEON is part of the aarch64 baseline.
            Self {
                has_neon: true,
                ..Self::default()
            }
        }

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            Self::default()
        }
    }

    /// `true` when the running CPU can execute code built for `tier`.
    pub fn supports(&self, tier: SimdTier) -> bool {
        match tier {
            SimdTier::Scalar => true,
            SimdTier::Neon => self.has_neon,
            SimdTier::Sse41 => self.has_sse41,
            SimdTier::Avx2 => self.has_avx2,
            SimdTier::Avx512 => self.has_avx512f,
        }
    }
}

/// Shorthand for [`CpuFeatures::detect`].
pub fn runtime_cpu_features() -> CpuFeatures {
    CpuFeatures::detect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_alignment_matches_active_tier() {
        let tier = SimdTier::active();
        assert_eq!(DEFAULT_ALIGNMENT, tier.alignment());
        assert!(DEFAULT_ALIGNMENT.is_power_of_two());
        assert_eq!(simd_capabilities(), tier.as_str());
    }

    #[test]
    fn lane_counts_fill_the_register() {
        for tier in [
            SimdTier::Neon,
            SimdTier::Sse41,
            SimdTier::Avx2,
            SimdTier::Avx512,
        ] {
            assert_eq!(tier.f32_lanes() * 4, tier.alignment());
            assert_eq!(tier.f64_lanes() * 8, tier.alignment());
        }
        assert_eq!(SimdTier::Scalar.real_lanes(), 1);
    }

    #[test]
    fn scalar_tier_is_always_supported() {
        assert!(CpuFeatures::detect().supports(SimdTier::Scalar));
    }
}
