use std::fmt;

/// Failure of a counter-measure request.
///
/// Probe failures never surface as errors; they read as "signal absent".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The OS refused the request.
    Rejected { action: &'static str, reason: String },
    InvalidArgument { action: &'static str, detail: String },
    /// Not available on this platform.
    Unsupported { action: &'static str },
}

impl ActionError {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Rejected { action, .. }
            | Self::InvalidArgument { action, .. }
            | Self::Unsupported { action } => *action,
        }
    }

    pub(crate) fn rejected(action: &'static str, err: impl fmt::Display) -> Self {
        Self::Rejected {
            action,
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { action, reason } => write!(f, "{action} rejected: {reason}"),
            Self::InvalidArgument { action, detail } => {
                write!(f, "{action} invalid argument: {detail}")
            }
            Self::Unsupported { action } => write!(f, "{action} unsupported on this platform"),
        }
    }
}

impl std::error::Error for ActionError {}
