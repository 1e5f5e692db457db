use crate::validator::UrlRejection;

/// Errors surfaced by a conversion attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// The input text was empty or whitespace only.
    #[error("please enter text to convert")]
    EmptyInput,

    /// The selected endpoint did not pass validation.
    #[error("{0}")]
    InvalidEndpointUrl(#[from] UrlRejection),

    /// The endpoint answered with a non-2xx status.
    #[error("conversion failed: {}", status_line(.code, .reason))]
    HttpStatus { code: u16, reason: String },

    /// The request never produced a response (connect, timeout, body read).
    #[error("{0}")]
    Transport(String),
}

fn status_line(code: &u16, reason: &str) -> String {
    if reason.is_empty() {
        code.to_string()
    } else {
        format!("{} {}", code, reason)
    }
}

impl ConversionError {
    /// Builds a transport error from anything displayable, falling back to a
    /// generic message when the source carries no text.
    pub fn transport(err: impl std::fmt::Display) -> Self {
        let message = err.to_string();
        if message.trim().is_empty() {
            Self::Transport("unknown error occurred".to_string())
        } else {
            Self::Transport(message)
        }
    }
}

/// Errors reading or writing the durable settings storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from configuration store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Title or URL missing.
    #[error("name and URL must not be empty")]
    EmptyField,

    #[error("{0}")]
    InvalidEndpointUrl(#[from] UrlRejection),

    /// Deleting would leave the set empty.
    #[error("at least one configuration must remain")]
    LastConfiguration,

    #[error("the default configuration cannot be deleted")]
    DefaultConfiguration,

    #[error("no configuration with id '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from the audio output.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("no audio output device available: {0}")]
    NoDevice(String),

    #[error("failed to decode audio: {0}")]
    Decode(String),

    #[error("nothing loaded for playback")]
    NothingLoaded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_message_embeds_code() {
        let err = ConversionError::HttpStatus {
            code: 500,
            reason: "Internal Server Error".to_string(),
        };
        assert_eq!(err.to_string(), "conversion failed: 500 Internal Server Error");

        let bare = ConversionError::HttpStatus {
            code: 599,
            reason: String::new(),
        };
        assert_eq!(bare.to_string(), "conversion failed: 599");
    }

    #[test]
    fn test_transport_falls_back_to_generic_message() {
        assert_eq!(
            ConversionError::transport("").to_string(),
            "unknown error occurred"
        );
        assert_eq!(
            ConversionError::transport("connection refused").to_string(),
            "connection refused"
        );
    }
}
