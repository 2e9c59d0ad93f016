use thiserror::Error;

/// Failure kinds of the extract-and-bill operation.
///
/// Everything except [`MeterError::Internal`] is caused by the caller's input
/// (a bad URL, a bad image, an unreadable meter, inconsistent readings).
#[derive(Error, Debug)]
pub enum MeterError {
    #[error("Unable to download image from provided URL: {0}")]
    DownloadFailed(String),
    #[error("Error opening the image: {0}")]
    DecodeFailed(String),
    #[error("No response received from the vision model.")]
    EmptyModelResponse,
    #[error("Unable to parse a numeric meter reading from the model's response: {0:?}")]
    UnparseableReading(String),
    #[error(
        "Current meter reading ({current}) is less than previous reading ({previous})."
    )]
    NegativeConsumption { current: f64, previous: f64 },
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl MeterError {
    /// True when the failure is attributable to the request rather than to
    /// the service or the vision model.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}
