//! Signal processing: spectral transforms, windows, filters, mel features,
//! interpolation and resampling.

pub mod features;
pub mod filter;
pub mod interpolate;
pub mod resample;
pub mod spectral;
pub mod traits;
pub mod windows;
