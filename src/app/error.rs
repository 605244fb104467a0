use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response from server (status {status})")]
    Decode { status: u16 },

    #[error("{0}")]
    PageLoad(String),

    #[error("Feed was refreshed elsewhere, reading again from the top")]
    FeedRestarted,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Image is still larger than {max_bytes} bytes at the lowest quality")]
    ImageTooLarge { max_bytes: usize },

    #[error("Please select an image first")]
    NoImage,

    #[error("Login response did not include a session")]
    MissingLoginResult,

    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl StoryError {
    /// Short message suitable for showing to a user as-is.
    pub fn user_message(&self) -> String {
        match self {
            StoryError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_shows_server_message() {
        let err = StoryError::Api {
            status: 401,
            message: "User not found".into(),
        };
        assert_eq!(err.user_message(), "User not found");
    }

    #[test]
    fn test_decode_error_is_generic() {
        let err = StoryError::Decode { status: 502 };
        assert_eq!(
            err.user_message(),
            "Unexpected response from server (status 502)"
        );
    }

    #[test]
    fn test_no_image_message() {
        assert_eq!(StoryError::NoImage.user_message(), "Please select an image first");
    }
}
