use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("No API credentials configured")]
    NoCredentials,

    #[error("HTTP client setup failed: {0}")]
    Client(String),

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}
