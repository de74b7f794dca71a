//! Shared trait-first kernel substrate.
//!
//! Constructor validation, error classification and the 1D buffer adapters
//! every kernel binds its inputs and outputs through.

mod errors;
mod io;
mod lifecycle;

pub use errors::*;
pub use io::*;
pub use lifecycle::*;
