use anyhow::{Context, Result};

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::models::billing::BillingInput;
use crate::core::pipeline::{self, ImageSource};
use crate::core::vision::VisionClient;

/// One-shot extract-and-bill for scripts. Returns the process exit code.
pub async fn run(
    http: &reqwest::Client,
    vision: &dyn VisionClient,
    image: &str,
    input: BillingInput,
    opts: &OutputOptions,
) -> Result<i32> {
    let source = ImageSource::from_arg(image)
        .with_context(|| format!("Failed to read image file {}", image))?;

    match pipeline::extract_and_bill(http, vision, source, input).await {
        Ok(bill) => {
            match opts.format {
                OutputFormat::Text => println!("{}", renderer::render_bill(&bill.result, opts.use_color)),
                OutputFormat::Json => {
                    let json = if opts.pretty {
                        serde_json::to_string_pretty(&bill.result)?
                    } else {
                        serde_json::to_string(&bill.result)?
                    };
                    println!("{}", json);
                }
            }
            Ok(0)
        }
        Err(e) => {
            match opts.format {
                OutputFormat::Text => eprintln!("{}", renderer::render_error(&format!("{:#}", e), opts.use_color)),
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "detail": format!("{:#}", e) }));
                }
            }
            Ok(if e.is_client_error() { 1 } else { 2 })
        }
    }
}
