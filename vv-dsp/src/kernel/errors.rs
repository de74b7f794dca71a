use core::fmt;
use vv_dsp_core::Status;

/// Validation errors raised at kernel construction or adapter binding time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required input or configuration field is empty.
    EmptyInput {
        /// Name of the argument that is empty.
        arg: &'static str,
    },
    /// A configuration argument value is outside its domain.
    InvalidArgument {
        /// Name of the argument.
        arg: &'static str,
        /// Human readable reason.
        reason: &'static str,
    },
    /// A required buffer was not supplied.
    Missing {
        /// Name of the missing argument.
        arg: &'static str,
    },
    /// A contiguous 1D slice view could not be obtained.
    NonContiguous {
        /// Name of the argument that is non-contiguous.
        arg: &'static str,
    },
    /// Output/input lengths did not match required shape.
    LengthMismatch {
        /// Name of the argument.
        arg: &'static str,
        /// Required length.
        expected: usize,
        /// Received length.
        got: usize,
    },
    /// The configuration leads to a linear system with no unique solution.
    Singular {
        /// Human readable reason.
        reason: &'static str,
    },
}

impl ConfigError {
    /// Status classification of this error.
    pub fn status(&self) -> Status {
        match self {
            ConfigError::EmptyInput { .. } | ConfigError::LengthMismatch { .. } => {
                Status::InvalidSize
            }
            ConfigError::InvalidArgument { .. } => Status::OutOfRange,
            ConfigError::Missing { .. } | ConfigError::NonContiguous { .. } => Status::NullInput,
            ConfigError::Singular { .. } => Status::Internal,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyInput { arg } => write!(f, "Input `{arg}` was empty."),
            ConfigError::InvalidArgument { arg, reason } => {
                write!(f, "Invalid argument `{arg}`: {reason}")
            }
            ConfigError::Missing { arg } => write!(f, "Required argument `{arg}` is missing."),
            ConfigError::NonContiguous { arg } => {
                write!(f, "Argument `{arg}` is not contiguous in memory.")
            }
            ConfigError::LengthMismatch { arg, expected, got } => {
                write!(
                    f,
                    "Length mismatch on `{arg}`. Expected {expected}, got {got}."
                )
            }
            ConfigError::Singular { reason } => write!(f, "Singular system: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime execution invariant violations for checked kernel entrypoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecInvariantViolation {
    /// An execution precondition on the call's parameters was violated.
    InvalidState {
        /// Human readable reason.
        reason: &'static str,
    },
    /// A buffer that must hold data was empty.
    EmptyInput {
        /// Name of the argument.
        arg: &'static str,
    },
    /// Output length mismatched the expected runtime shape.
    LengthMismatch {
        /// Name of the argument.
        arg: &'static str,
        /// Required length.
        expected: usize,
        /// Received length.
        got: usize,
    },
    /// The NaN/Inf policy rejected a non-finite value.
    NonFinite {
        /// Position of the first offending element.
        index: usize,
    },
    /// A linear system had no unique solution.
    Singular {
        /// Human readable reason.
        reason: &'static str,
    },
    /// The transform backend failed.
    Backend {
        /// Human readable reason.
        reason: &'static str,
    },
    /// Adapter binding/configuration failure.
    Config(ConfigError),
    /// Failure inside a core numeric primitive.
    Core(vv_dsp_core::Error),
}

impl ExecInvariantViolation {
    /// Status classification of this error.
    pub fn status(&self) -> Status {
        match self {
            ExecInvariantViolation::InvalidState { .. } => Status::OutOfRange,
            ExecInvariantViolation::EmptyInput { .. }
            | ExecInvariantViolation::LengthMismatch { .. } => Status::InvalidSize,
            ExecInvariantViolation::NonFinite { .. } => Status::NanInfDetected,
            ExecInvariantViolation::Singular { .. } | ExecInvariantViolation::Backend { .. } => {
                Status::Internal
            }
            ExecInvariantViolation::Config(err) => err.status(),
            ExecInvariantViolation::Core(err) => err.status(),
        }
    }
}

impl From<ConfigError> for ExecInvariantViolation {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<vv_dsp_core::Error> for ExecInvariantViolation {
    fn from(value: vv_dsp_core::Error) -> Self {
        Self::Core(value)
    }
}

impl From<&ExecInvariantViolation> for Status {
    fn from(value: &ExecInvariantViolation) -> Self {
        value.status()
    }
}

impl fmt::Display for ExecInvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecInvariantViolation::InvalidState { reason } => {
                write!(f, "Execution invariant violation: {reason}")
            }
            ExecInvariantViolation::EmptyInput { arg } => {
                write!(f, "Input `{arg}` was empty.")
            }
            ExecInvariantViolation::LengthMismatch { arg, expected, got } => {
                write!(
                    f,
                    "Execution length mismatch on `{arg}`. Expected {expected}, got {got}."
                )
            }
            ExecInvariantViolation::NonFinite { index } => {
                write!(f, "Non-finite value rejected at index {index}.")
            }
            ExecInvariantViolation::Singular { reason } => {
                write!(f, "Singular system: {reason}")
            }
            ExecInvariantViolation::Backend { reason } => write!(f, "Backend failure: {reason}"),
            ExecInvariantViolation::Config(err) => write!(f, "{err}"),
            ExecInvariantViolation::Core(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ExecInvariantViolation {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_map_to_taxonomy() {
        assert_eq!(
            ConfigError::EmptyInput { arg: "x" }.status(),
            Status::InvalidSize
        );
        assert_eq!(
            ConfigError::InvalidArgument {
                arg: "window_length",
                reason: "must be odd",
            }
            .status(),
            Status::OutOfRange
        );
        assert_eq!(
            ConfigError::NonContiguous { arg: "array" }.status(),
            Status::NullInput
        );
        assert_eq!(
            ExecInvariantViolation::from(ConfigError::Singular { reason: "rank" }).status(),
            Status::Internal
        );
    }

    #[test]
    fn exec_errors_forward_nested_status() {
        let err = ExecInvariantViolation::from(ConfigError::LengthMismatch {
            arg: "out",
            expected: 4,
            got: 3,
        });
        assert_eq!(err.status(), Status::InvalidSize);
        assert_eq!(
            ExecInvariantViolation::NonFinite { index: 2 }.status(),
            Status::NanInfDetected
        );
        assert_eq!(
            ExecInvariantViolation::Singular { reason: "pivot" }.status(),
            Status::Internal
        );
        assert_eq!(
            err.to_string(),
            "Length mismatch on `out`. Expected 4, got 3."
        );
    }
}
