//! Show the resolved configuration.

use lenscap_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, check: bool) -> anyhow::Result<()> {
    println!("Config file: {}", config_file_path().display());
    println!();

    let mut shown = config.clone();
    if shown.credentials.api_token.is_some() {
        shown.credentials.api_token = Some("<redacted>".to_string());
    }
    println!("{}", serde_json::to_string_pretty(&shown)?);

    if check {
        println!();
        config.validate()?;
        println!("[OK] All required values are present");
    }

    Ok(())
}
