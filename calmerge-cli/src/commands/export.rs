use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use calmerge_core::ics::ICS_FILE_EXTENSION;
use calmerge_core::{ExportOptions, RandomUidGenerator};
use owo_colors::OwoColorize;

use crate::config::CalmergeConfig;
use crate::render::{Render, pluralize};

pub async fn run(
    config: &CalmergeConfig,
    output: Option<PathBuf>,
    uploads: &[PathBuf],
    all_day_as_date: bool,
) -> Result<()> {
    let output = ics_path(output.unwrap_or_else(|| config.export_path()))?;

    let result = super::load_merge(config, uploads).await?;

    let mut options = ExportOptions::default().with_calendar_name(&config.calendar_name);
    options.all_day_as_date = all_day_as_date;
    let document = result.export(&options, &mut RandomUidGenerator);

    write_atomic(&output, &document)?;

    println!(
        "{} {} {} to {}",
        "Exported".green(),
        result.events.len(),
        pluralize("event", result.events.len()),
        output.display()
    );

    if !result.is_complete() {
        println!("{}", "Some sources are missing from this export:".yellow());
        for failure in &result.failures {
            println!("   {}", failure.render());
        }
    }

    Ok(())
}

/// Add the calendar extension when missing; refuse any other extension.
fn ics_path(path: PathBuf) -> Result<PathBuf> {
    match path.extension().and_then(|e| e.to_str()) {
        None => Ok(path.with_extension(ICS_FILE_EXTENSION)),
        Some(ext) if ext.eq_ignore_ascii_case(ICS_FILE_EXTENSION) => Ok(path),
        Some(ext) => anyhow::bail!(
            "Refusing to write a calendar to a .{} file: {}",
            ext,
            path.display()
        ),
    }
}

/// Write through a sibling temp file so readers never see a partial export.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;
    }

    let tmp = path.with_extension(format!("{ICS_FILE_EXTENSION}.tmp"));
    std::fs::write(&tmp, contents).with_context(|| format!("Could not write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("Could not write {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ics_path_adds_missing_extension() {
        assert_eq!(ics_path(PathBuf::from("out/merged")).unwrap(), PathBuf::from("out/merged.ics"));
        assert_eq!(ics_path(PathBuf::from("merged.ICS")).unwrap(), PathBuf::from("merged.ICS"));
    }

    #[test]
    fn test_ics_path_rejects_other_extensions() {
        assert!(ics_path(PathBuf::from("merged.json")).is_err());
    }

    #[test]
    fn test_write_atomic_creates_parent_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("merged.ics");

        write_atomic(&path, "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n"
        );
        assert!(!path.with_extension("ics.tmp").exists());
    }
}
