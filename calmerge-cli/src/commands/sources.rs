use std::path::PathBuf;

use anyhow::Result;
use calmerge_core::{SourceId, SourceKind};
use dialoguer::Confirm;
use owo_colors::OwoColorize;

use crate::config::{CalmergeConfig, SourceEntry};
use crate::render::Render;

pub fn list(config: &CalmergeConfig) -> Result<()> {
    if config.sources.is_empty() {
        println!("{}", "No sources configured".dimmed());
        println!("{}", "Add one with: calmerge sources add --name <NAME> --url <URL>".dimmed());
        return Ok(());
    }

    for entry in &config.sources {
        println!("{}", entry.to_source().render());
        println!("   {}", entry.id.to_string().dimmed());
    }

    Ok(())
}

pub fn add(
    config: &mut CalmergeConfig,
    name: String,
    kind: Option<String>,
    url: Option<String>,
    path: Option<PathBuf>,
) -> Result<()> {
    if url.is_none() && path.is_none() {
        anyhow::bail!("A source needs either --url or --path");
    }

    let name = name.trim().to_string();
    if name.is_empty() {
        anyhow::bail!("Source name must not be empty");
    }

    let kind = kind
        .as_deref()
        .map(SourceKind::from_tag)
        .unwrap_or_default();

    let entry = SourceEntry {
        id: SourceId::generate(),
        name,
        kind,
        url,
        path,
        color: None,
    };

    println!("{} {}", "Added".green(), entry.to_source().render());
    config.sources.push(entry);
    config.save()?;

    Ok(())
}

pub fn remove(config: &mut CalmergeConfig, id: &str, force: bool) -> Result<()> {
    let Some(entry) = config.sources.iter().find(|s| s.id.as_str() == id) else {
        let available: Vec<_> = config.sources.iter().map(|s| s.id.to_string()).collect();
        anyhow::bail!(
            "Source '{}' not found. Available: {}",
            id,
            if available.is_empty() { "none".to_string() } else { available.join(", ") }
        );
    };

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove source '{}'?", entry.name))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled".dimmed());
            return Ok(());
        }
    }

    if let Some(removed) = config.remove_source(id) {
        config.save()?;
        println!("{} {}", "Removed".red(), removed.name);
    }

    Ok(())
}
