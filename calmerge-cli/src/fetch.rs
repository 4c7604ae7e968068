//! Feed retrieval over HTTP(S) and from local files.

use std::path::PathBuf;
use std::time::Duration;

use calmerge_core::{FeedError, FeedResult, Fetcher};
use url::Url;

/// Where a locator points once schemes are normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Http(Url),
    File(PathBuf),
}

/// Classify a locator. `webcal://` and `webcals://` are served over HTTPS by
/// every booking channel; anything without a URL scheme is a filesystem path.
pub fn resolve_locator(locator: &str) -> FeedResult<Location> {
    let locator = locator.trim();

    let rewritten = ["webcal://", "webcals://"]
        .iter()
        .find_map(|scheme| locator.strip_prefix(scheme))
        .map(|rest| format!("https://{rest}"));
    let candidate = rewritten.as_deref().unwrap_or(locator);

    match Url::parse(candidate) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(Location::Http(url)),
            "file" => url
                .to_file_path()
                .map(Location::File)
                .map_err(|_| FeedError::Network(format!("{locator}: not a local file path"))),
            // Single-letter "schemes" are Windows drive letters
            scheme if scheme.len() == 1 => Ok(Location::File(PathBuf::from(locator))),
            scheme => Err(FeedError::Network(format!(
                "{locator}: unsupported scheme '{scheme}'"
            ))),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Location::File(PathBuf::from(locator))),
        Err(e) => Err(FeedError::Network(format!("{locator}: {e}"))),
    }
}

/// Production [`Fetcher`]: reqwest for remote feeds, tokio::fs for files.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("calmerge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpFetcher { client })
    }

    async fn fetch_url(&self, url: Url) -> FeedResult<String> {
        let host = url.host_str().unwrap_or_default().to_string();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::Network(format!("{host}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Network(format!("{host}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| FeedError::Network(format!("{host}: {e}")))
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, locator: &str) -> FeedResult<String> {
        let body = match resolve_locator(locator)? {
            Location::Http(url) => self.fetch_url(url).await?,
            Location::File(path) => tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| FeedError::Network(format!("{}: {e}", path.display())))?,
        };

        tracing::debug!(locator, bytes = body.len(), "fetched feed");
        Ok(body)
    }
}
