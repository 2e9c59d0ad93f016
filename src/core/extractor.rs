use image::DynamicImage;

use crate::core::error::MeterError;
use crate::core::vision::{InlineImage, VisionClient};

pub const READING_PROMPT: &str = "Extract the meter reading from the image. \
Provide only the numeric reading value, with no additional text. \
For example, if the reading is 12345, simply return 12345.";

/// First code point of each Unicode decimal-digit run a model is likely to
/// answer in. Each run covers ten consecutive digits, zero first.
const DIGIT_ZEROS: [u32; 8] = [
    0x0660, // Arabic-Indic
    0x06F0, // Extended Arabic-Indic (Persian, Urdu)
    0x07C0, // NKo
    0x0966, // Devanagari
    0x09E6, // Bengali
    0x0E50, // Thai
    0x1040, // Myanmar
    0xFF10, // Fullwidth
];

/// Map any decimal digit to its ASCII form.
fn ascii_digit(c: char) -> Option<char> {
    if c.is_ascii_digit() {
        return Some(c);
    }
    let cp = c as u32;
    DIGIT_ZEROS
        .iter()
        .find(|zero| (**zero..**zero + 10).contains(&cp))
        .and_then(|zero| char::from_digit(cp - zero, 10))
}

/// Keep only decimal digits (normalised to ASCII) and `.` from the trimmed
/// model output.
pub fn filter_reading_text(text: &str) -> String {
    text.trim()
        .chars()
        .filter_map(|c| if c == '.' { Some(c) } else { ascii_digit(c) })
        .collect()
}

/// Turn raw model output into a reading.
pub fn parse_reading(text: Option<&str>) -> Result<f64, MeterError> {
    let text = match text {
        Some(t) if !t.trim().is_empty() => t,
        _ => return Err(MeterError::EmptyModelResponse),
    };

    let filtered = filter_reading_text(text);
    // "inf"/"NaN" cannot survive the filter, but a long enough digit run
    // still overflows to infinity.
    match filtered.parse::<f64>() {
        Ok(reading) if reading.is_finite() => Ok(reading),
        _ => Err(MeterError::UnparseableReading(filtered)),
    }
}

/// Ask the vision model for the reading shown in `image`. One call, no retry.
pub async fn extract_reading(
    vision: &dyn VisionClient,
    image: &DynamicImage,
) -> Result<f64, MeterError> {
    let inline = InlineImage::from_image(image)?;
    let reply = vision.generate(READING_PROMPT, &inline).await?;
    tracing::debug!(reply = ?reply, "vision model replied");
    parse_reading(reply.as_deref())
}
