mod convolve;
pub use convolve::*;
