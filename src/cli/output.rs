use std::io::IsTerminal;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// `json` flag wins, then `--format`, then the config default.
    pub fn resolve(json_flag: bool, format_flag: Option<&str>, config_default: &str) -> Self {
        if json_flag {
            return Self::Json;
        }
        match format_flag.unwrap_or(config_default) {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub pretty: bool,
    pub use_color: bool,
}

/// `--no-color` and `NO_COLOR` always disable color; otherwise the config
/// setting decides, with `auto` meaning "stdout is a terminal".
pub fn detect_color(color_flag: bool, setting: &str) -> bool {
    if !color_flag {
        return false;
    }
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    match setting {
        "always" => true,
        "never" => false,
        _ => std::io::stdout().is_terminal(),
    }
}
