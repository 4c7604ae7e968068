use std::path::PathBuf;

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::config::CalmergeConfig;
use crate::render::{Render, pluralize};

pub async fn run(config: &CalmergeConfig, uploads: &[PathBuf], json: bool) -> Result<()> {
    let result = super::load_merge(config, uploads).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", result.render());
    println!();
    println!(
        "{}",
        format!(
            "{} {} from {} {}",
            result.events.len(),
            pluralize("event", result.events.len()),
            config.sources.len() + uploads.len(),
            pluralize("source", config.sources.len() + uploads.len())
        )
        .dimmed()
    );

    Ok(())
}
