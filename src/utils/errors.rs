use std::fmt;

/**
 * Fatal error kinds raised by the positional de Bruijn graph engine.
 *
 * None of these are recovered internally. Configuration problems are
 * reported through Result from constructors; violations detected mid-stream
 * abort processing immediately since the graph state can no longer be
 * trusted.
 */
#[derive(Debug, Clone)]
pub enum BrolgaError {
    InvalidConfiguration(String),
    MalformedInput(String),
    InvariantViolation(String),
}

impl fmt::Display for BrolgaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrolgaError::InvalidConfiguration(msg) => {
                write!(f, "Invalid configuration: {}", msg)
            }
            BrolgaError::MalformedInput(msg) => write!(f, "Malformed input: {}", msg),
            BrolgaError::InvariantViolation(msg) => write!(f, "Invariant violation: {}", msg),
        }
    }
}

impl std::error::Error for BrolgaError {}
