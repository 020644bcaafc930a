use thiserror::Error;

pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

/// Failure of a single user action. None of these leave the session registry
/// in a partial state.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Rejected before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An input file could not be read or encoded.
    #[error("could not encode input image: {0}")]
    Encoding(String),

    /// The call to the external service did not complete.
    #[error("{provider} request failed{}: {message}", .status.map(|code| format!(" ({code})")).unwrap_or_default())]
    Transport {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// The service answered but produced no usable image or text.
    #[error("{message}")]
    Refused { message: String },

    /// The service answered, but not in the contracted structured shape.
    #[error("malformed structured response: {message}")]
    MalformedResponse { message: String },

    /// A fan-out worker died before reporting a result.
    #[error("generation worker failed: {0}")]
    Worker(String),

    #[error("session event log write failed: {0:#}")]
    EventLog(anyhow::Error),
}

impl GenerationError {
    pub fn invalid(message: impl Into<String>) -> Self {
        GenerationError::InvalidInput(message.into())
    }

    pub fn transport(provider: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        GenerationError::Transport {
            provider: provider.to_string(),
            status,
            message: message.into(),
        }
    }

    pub fn refused(message: impl Into<String>) -> Self {
        GenerationError::Refused {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        GenerationError::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, GenerationError::Transport { .. })
    }

    pub fn is_refusal(&self) -> bool {
        matches!(self, GenerationError::Refused { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, GenerationError::MalformedResponse { .. })
    }

    /// Stable label used in event payloads.
    pub fn class(&self) -> &'static str {
        match self {
            GenerationError::InvalidInput(_) => "invalid_input",
            GenerationError::Encoding(_) => "encoding",
            GenerationError::Transport { .. } => "transport",
            GenerationError::Refused { .. } => "refused",
            GenerationError::MalformedResponse { .. } => "malformed_response",
            GenerationError::Worker(_) => "worker",
            GenerationError::EventLog(_) => "event_log",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            GenerationError::InvalidInput(message) => message.clone(),
            GenerationError::Encoding(message) => format!("Could not read the image: {message}"),
            GenerationError::Transport { .. } => {
                format!("Could not reach the generation service. {self}")
            }
            GenerationError::Refused { message } => message.clone(),
            GenerationError::MalformedResponse { .. } => {
                format!("The model answered, but not in the expected format. {self}")
            }
            GenerationError::Worker(_) | GenerationError::EventLog(_) => self.to_string(),
        }
    }
}
