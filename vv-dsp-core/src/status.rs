use core::fmt;

/// Outcome of every fallible operation in the library.
///
/// Discriminants are stable and may be exchanged across an FFI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    /// Success.
    Ok = 0,
    /// A required buffer was missing or not addressable.
    NullInput = 1,
    /// A length was zero where data is required, or lengths were inconsistent.
    InvalidSize = 2,
    /// A parameter was outside its declared domain.
    OutOfRange = 3,
    /// Allocation, backend or numerical failure.
    Internal = 4,
    /// A non-finite value was rejected by the NaN/Inf policy.
    NanInfDetected = 5,
}

impl Status {
    /// Stable upper-case name of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NullInput => "NULL_INPUT",
            Status::InvalidSize => "INVALID_SIZE",
            Status::OutOfRange => "OUT_OF_RANGE",
            Status::Internal => "INTERNAL",
            Status::NanInfDetected => "NAN_INF_DETECTED",
        }
    }

    /// Decode a raw discriminant.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Status::Ok),
            1 => Some(Status::NullInput),
            2 => Some(Status::InvalidSize),
            3 => Some(Status::OutOfRange),
            4 => Some(Status::Internal),
            5 => Some(Status::NanInfDetected),
            _ => None,
        }
    }

    /// `true` for [`Status::Ok`].
    pub const fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the core numeric primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An argument was outside its domain.
    InvalidArg {
        /// The invalid arg
        arg: &'static str,
        /// Explaining why arg is invalid.
        reason: &'static str,
    },
    /// An argument had an unusable length.
    InvalidSize {
        /// The offending arg
        arg: &'static str,
        /// Explaining what length was required.
        reason: &'static str,
    },
    /// The convolution backend failed.
    Conv {
        /// Backend message.
        reason: String,
    },
}

impl Error {
    /// Status classification of this error.
    pub fn status(&self) -> Status {
        match self {
            Error::InvalidArg { .. } => Status::OutOfRange,
            Error::InvalidSize { .. } => Status::InvalidSize,
            Error::Conv { .. } => Status::Internal,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArg { arg, reason } => write!(f, "Invalid argument `{arg}`: {reason}"),
            Error::InvalidSize { arg, reason } => write!(f, "Invalid size of `{arg}`: {reason}"),
            Error::Conv { reason } => write!(f, "Convolution failed: {reason}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<&Error> for Status {
    fn from(value: &Error) -> Self {
        value.status()
    }
}

/// Result alias for the core primitives.
pub type Result<T> = core::result::Result<T, Error>;
