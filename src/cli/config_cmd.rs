use anyhow::Result;

use crate::core::config::AppConfig;
use crate::core::vision::gemini::API_KEY_ENV;

pub fn init() -> Result<()> {
    let path = AppConfig::config_path();
    if path.exists() {
        eprintln!("Config file already exists at {}", path.display());
        eprintln!("Remove it first if you want to regenerate.");
        return Ok(());
    }

    match AppConfig::default().save() {
        Ok(path) => {
            println!("Generated config at {}", path.display());
            println!(
                "  Set {} or add vision.api_key to enable meter reading.",
                API_KEY_ENV
            );
        }
        Err(e) => {
            eprintln!("Failed to generate config: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

pub fn check() -> Result<()> {
    let path = AppConfig::config_path();
    if !path.exists() {
        println!("No config file at {} (using defaults)", path.display());
    }

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(1);
        }
    };

    let mut issues = config.validate();
    let has_key = std::env::var(API_KEY_ENV).map(|k| !k.is_empty()).unwrap_or(false)
        || config.vision.api_key.as_deref().map(|k| !k.is_empty()).unwrap_or(false);
    if !has_key {
        issues.push(format!("No API key: set {} or vision.api_key", API_KEY_ENV));
    }

    if issues.is_empty() {
        println!("Config is valid.");
    } else {
        for issue in &issues {
            eprintln!("  - {}", issue);
        }
        std::process::exit(1);
    }
    Ok(())
}

/// Print the effective config with the API key masked.
pub fn show() -> Result<()> {
    let mut config = AppConfig::load()?;
    if let Some(key) = config.vision.api_key.as_mut() {
        *key = mask_key(key);
    }
    println!("# {}", AppConfig::config_path().display());
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn mask_key(key: &str) -> String {
    let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    if key.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("****{}", tail)
    }
}
