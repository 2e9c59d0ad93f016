use axum::{
    extract::{Multipart, Path, State},
    Json,
};

use crate::core::error::MeterError;
use crate::core::models::billing::{BillingInput, BillingResult};
use crate::core::pipeline::{self, ImageSource};
use crate::server::error::ApiError;
use crate::server::AppState;

/// Split `{file_url}/{previous_reading}/{unit_cost}`. The URL may itself
/// contain `/`, so the two numbers are taken from the right.
pub fn split_analyze_path(rest: &str) -> Result<(String, BillingInput), MeterError> {
    let mut parts = rest.rsplitn(3, '/');
    let unit_cost = parts.next().unwrap_or_default();
    let previous = parts.next();
    let url = parts.next();

    let (Some(previous), Some(url)) = (previous, url) else {
        return Err(MeterError::InvalidInput(
            "expected /upload-analyze/{file_url}/{previous_reading}/{unit_cost}".to_string(),
        ));
    };
    if url.is_empty() {
        return Err(MeterError::InvalidInput("file_url must not be empty".to_string()));
    }

    let input = BillingInput::new(
        parse_number("previous_reading", previous)?,
        parse_number("unit_cost", unit_cost)?,
    );
    Ok((url.to_string(), input))
}

fn parse_number(name: &str, raw: &str) -> Result<f64, MeterError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| MeterError::InvalidInput(format!("{} is not a valid number: {:?}", name, raw)))
}

/// `GET /upload-analyze/{file_url}/{previous_reading}/{unit_cost}`
pub async fn analyze_url(
    State(state): State<AppState>,
    Path(rest): Path<String>,
) -> Result<Json<BillingResult>, ApiError> {
    let (url, input) = split_analyze_path(&rest)?;
    tracing::info!(%url, previous = input.previous_reading, unit_cost = input.unit_cost, "analyze url");

    let bill = pipeline::extract_and_bill(
        &state.http,
        state.vision.as_ref(),
        ImageSource::Url(url),
        input,
    )
    .await?;
    Ok(Json(bill.result))
}

/// `POST /upload-analyze` with multipart fields `file`, `previous_reading`, `unit_cost`.
pub async fn analyze_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BillingResult>, ApiError> {
    let mut file: Option<Vec<u8>> = None;
    let mut previous: Option<f64> = None;
    let mut unit_cost: Option<f64> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MeterError::InvalidInput(format!("Failed to parse multipart data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field.bytes().await.map_err(|e| {
                    MeterError::InvalidInput(format!("Failed to read uploaded file: {}", e))
                })?;
                file = Some(bytes.to_vec());
            }
            "previous_reading" | "unit_cost" => {
                let text = field.text().await.map_err(|e| {
                    MeterError::InvalidInput(format!("Failed to read field {}: {}", name, e))
                })?;
                let value = parse_number(&name, &text)?;
                if name == "previous_reading" {
                    previous = Some(value);
                } else {
                    unit_cost = Some(value);
                }
            }
            other => tracing::debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    let file = file.ok_or_else(|| {
        MeterError::InvalidInput("Please upload a current meter reading image.".to_string())
    })?;
    let input = BillingInput::new(
        previous.ok_or_else(|| MeterError::InvalidInput("previous_reading is required".to_string()))?,
        unit_cost.ok_or_else(|| MeterError::InvalidInput("unit_cost is required".to_string()))?,
    );
    tracing::info!(bytes = file.len(), previous = input.previous_reading, "analyze upload");

    let bill = pipeline::extract_and_bill(
        &state.http,
        state.vision.as_ref(),
        ImageSource::Upload(file),
        input,
    )
    .await?;
    Ok(Json(bill.result))
}

pub async fn health() -> &'static str {
    "ok"
}
