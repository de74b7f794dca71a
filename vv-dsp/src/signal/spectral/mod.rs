//! Frequency-domain transforms: FFT plans, STFT, DCT, spectrum shifts and
//! framing helpers.

mod dct;
mod fft;
mod framing;
mod shift;
mod stft;

pub use dct::*;
pub use fft::*;
pub use framing::*;
pub use shift::*;
pub use stft::*;
