//! Time-domain filters: FIR design and application, zero-phase FIR
//! filtering, biquad cascades and the Savitzky-Golay smoother.

mod filtfilt;
mod fir;
mod iir;
mod savgol_filter;

pub use filtfilt::*;
pub use fir::*;
pub use iir::*;
pub use savgol_filter::*;
