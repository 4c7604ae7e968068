pub mod conflicts;
pub mod export;
pub mod merge;
pub mod sources;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use calmerge_core::{
    FeedError, FeedInput, MergeResult, RandomUidGenerator, Source, SourceFailure, SourceId,
    SourceKind, UidGenerator, merge as merge_sources, parse_calendar_name, parse_feed,
};

use crate::config::CalmergeConfig;
use crate::fetch::HttpFetcher;
use crate::render::pluralize;
use crate::utils::tui;

/// Fetch and merge every configured source, then fold in one-off uploads.
pub async fn load_merge(config: &CalmergeConfig, uploads: &[PathBuf]) -> Result<MergeResult> {
    let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout()?)?);
    let mut uids = RandomUidGenerator;

    let inputs: Vec<(Source, FeedInput)> = config
        .sources()
        .into_iter()
        .map(|source| {
            let input = FeedInput::Locator(source.locator.clone().unwrap_or_default());
            (source, input)
        })
        .collect();

    let count = inputs.len();
    let spinner = tui::create_spinner(format!(
        "Fetching {count} {}",
        pluralize("source", count)
    ));
    let mut result = merge_sources(inputs, fetcher, &mut uids).await;
    spinner.finish_and_clear();

    for path in uploads {
        result = fold_upload(result, path, &mut uids).await;
    }

    Ok(result)
}

/// Parse an uploaded file as its own manual source and merge it in through
/// the incremental path. An unreadable or invalid upload becomes a failure
/// entry, like any other source.
async fn fold_upload(result: MergeResult, path: &Path, uids: &mut dyn UidGenerator) -> MergeResult {
    let fallback_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let outcome = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FeedError::Network(format!("{}: {e}", path.display())));

    let name = outcome
        .as_ref()
        .ok()
        .and_then(|text| parse_calendar_name(text))
        .unwrap_or(fallback_name);
    let source = Source::new(SourceId::generate(), name, SourceKind::Manual)
        .with_locator(path.display().to_string());

    match outcome.and_then(|text| parse_feed(&text, &source, uids)) {
        Ok(events) => {
            tracing::debug!(upload = %path.display(), events = events.len(), "merged upload");
            result.with_upload(events)
        }
        Err(error) => {
            tracing::warn!(upload = %path.display(), %error, "upload skipped");
            let mut result = result;
            result.failures.push(SourceFailure {
                source_id: source.id,
                source_name: source.name,
                error,
            });
            result
        }
    }
}
