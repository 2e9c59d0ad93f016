use image::DynamicImage;

use crate::core::acquire;
use crate::core::billing;
use crate::core::error::MeterError;
use crate::core::extractor;
use crate::core::models::billing::{BillingInput, BillingResult};
use crate::core::vision::VisionClient;

/// Where the meter photo comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Remote image, possibly carrying the `file_url=` artifact
    Url(String),
    /// Raw uploaded file contents
    Upload(Vec<u8>),
    /// Upload the caller already decoded (e.g. to display it first)
    Decoded(DynamicImage),
}

impl ImageSource {
    /// `http(s)://` (with or without the `file_url=` artifact) is a URL,
    /// anything else is treated as a local file path.
    pub fn from_arg(arg: &str) -> std::io::Result<Self> {
        let stripped = acquire::strip_url_prefix(arg);
        if stripped.starts_with("http://") || stripped.starts_with("https://") {
            Ok(Self::Url(arg.to_string()))
        } else {
            Ok(Self::Upload(std::fs::read(arg)?))
        }
    }
}

/// Output of a successful extract-and-bill run.
#[derive(Debug, Clone)]
pub struct Bill {
    pub image: DynamicImage,
    pub result: BillingResult,
}

/// Acquire the image, read the meter, and bill the interval.
pub async fn extract_and_bill(
    http: &reqwest::Client,
    vision: &dyn VisionClient,
    source: ImageSource,
    input: BillingInput,
) -> Result<Bill, MeterError> {
    input.validate()?;

    let image = match source {
        ImageSource::Url(url) => acquire::fetch_image(http, &url).await?,
        ImageSource::Upload(bytes) => acquire::decode_upload(&bytes)?,
        ImageSource::Decoded(image) => image,
    };
    tracing::debug!(width = image.width(), height = image.height(), "image decoded");

    let current = extractor::extract_reading(vision, &image).await?;
    tracing::info!(current, previous = input.previous_reading, "meter reading extracted");

    let result = billing::calculate(current, input.previous_reading, input.unit_cost)?;
    Ok(Bill { image, result })
}
