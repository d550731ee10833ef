//! Config command - prints the effective configuration

use crate::config::AppConfig;

/// Run the config command
pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("{}", render(config)?);
    Ok(())
}

fn render(config: &AppConfig) -> serde_json::Result<String> {
    serde_json::to_string_pretty(config)
}
