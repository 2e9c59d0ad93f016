mod cli;
mod core;
mod server;
mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::core::config::AppConfig;
use crate::core::models::billing::BillingInput;
use crate::core::vision::gemini::GeminiClient;
use crate::core::vision::VisionClient;

#[derive(Parser)]
#[command(
    name = "meterbill",
    about = "Read a utility meter photo with a vision model and bill the consumption",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text|json)
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Override the vision model from the config
    #[arg(long, global = true)]
    model: Option<String>,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP endpoint
    Serve {
        /// Address to bind (default: server.bind from config)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },
    /// Fill in the interactive form
    Form,
    /// Read one meter image and print the bill
    Read {
        /// Image file path or http(s) URL
        #[arg(short, long)]
        image: String,

        /// Previous meter reading
        #[arg(short, long)]
        previous: f64,

        /// Cost per unit
        #[arg(short, long)]
        unit_cost: f64,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Generate default config file
    Init,
    /// Validate config file
    Check,
    /// Print the effective config
    Show,
}

fn vision_client(config: &AppConfig) -> anyhow::Result<Arc<dyn VisionClient>> {
    let client = GeminiClient::from_config(config)?;
    tracing::debug!(model = client.model(), "vision client ready");
    Ok(Arc::new(client))
}

fn http_client(config: &AppConfig) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.vision.timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Commands::Serve { .. }, false) => "info",
        _ => "warn",
    };
    telemetry::init(log_level);

    if let Commands::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init => cli::config_cmd::init(),
            ConfigAction::Check => cli::config_cmd::check(),
            ConfigAction::Show => cli::config_cmd::show(),
        };
    }

    let mut config = AppConfig::load()?;
    if let Some(model) = &cli.model {
        config.vision.model = model.clone();
    }

    let output_opts = cli::output::OutputOptions {
        format: cli::output::OutputFormat::resolve(
            cli.json,
            cli.format.as_deref(),
            &config.settings.default_format,
        ),
        pretty: cli.pretty,
        use_color: cli::output::detect_color(!cli.no_color, &config.settings.color),
    };

    let http = http_client(&config)?;

    match cli.command {
        Commands::Serve { bind } => {
            let addr = match bind {
                Some(addr) => addr,
                None => config
                    .server
                    .bind
                    .parse()
                    .with_context(|| format!("Invalid server.bind: {}", config.server.bind))?,
            };
            let state = server::AppState {
                http,
                vision: vision_client(&config)?,
                max_upload_bytes: config.server.max_upload_bytes(),
            };
            server::serve(state, addr).await?;
        }
        Commands::Form => {
            let interactive = cli::form::run(
                &http,
                cli::form::is_interactive(),
                || vision_client(&config),
                output_opts.use_color,
            )
            .await?;
            if !interactive {
                eprintln!("Not a terminal. Use `meterbill read --image <path> --previous <n> --unit-cost <n>` instead.");
            }
        }
        Commands::Read {
            image,
            previous,
            unit_cost,
        } => {
            let input = BillingInput::new(previous, unit_cost);
            let vision = vision_client(&config)?;
            let code =
                cli::read_cmd::run(&http, vision.as_ref(), &image, input, &output_opts).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}
