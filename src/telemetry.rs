use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber, writing to stderr so stdout stays
/// clean for JSON output.
///
/// `RUST_LOG` wins when set; otherwise this crate logs at `crate_level` and
/// everything else at `warn`.
pub fn init(crate_level: &str) {
    let default_filter = format!("warn,meterbill={0},tower_http={0}", crate_level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
