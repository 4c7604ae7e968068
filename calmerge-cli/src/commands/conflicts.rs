use std::path::PathBuf;

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;

use calmerge_core::{ConflictPair, SourceFailure};

use crate::config::CalmergeConfig;
use crate::render::{Render, pluralize};

#[derive(Serialize)]
struct ConflictReport<'a> {
    conflicts: Vec<ConflictPair<'a>>,
    failures: &'a [SourceFailure],
}

pub async fn run(config: &CalmergeConfig, uploads: &[PathBuf], json: bool) -> Result<()> {
    let result = super::load_merge(config, uploads).await?;
    let conflicts = result.conflicts();

    if json {
        let report = ConflictReport {
            conflicts,
            failures: &result.failures,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("{}", "No conflicts".green());
    } else {
        for pair in &conflicts {
            println!("{}", pair.render());
        }
        println!();
        println!(
            "{}",
            format!("{} {}", conflicts.len(), pluralize("conflict", conflicts.len())).red()
        );
    }

    // A missing source can hide a double-booking
    if !result.is_complete() {
        println!();
        println!("{}", "Incomplete: these sources were not checked".yellow());
        for failure in &result.failures {
            println!("   {}", failure.render());
        }
    }

    Ok(())
}
