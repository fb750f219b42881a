//! Source adapters (spec.md §4.G): four fetch shapes behind one dispatcher.

mod feed;
mod headline;
mod paper;
mod record;
mod repo;
mod text;

pub use record::{RawRecord, SourceType};
pub use text::clean_summary;

use aiscout_config::{SourceConfig, SourceVariant};
use aiscout_http::HttpClient;

/// Fetch raw records for a single configured source, routing to the
/// adapter that matches its variant.
pub async fn fetch_source(http: &HttpClient, source: &SourceConfig) -> Vec<RawRecord> {
    match &source.variant {
        SourceVariant::Headline(opts) => headline::fetch(http, &source.common, opts).await,
        SourceVariant::Repo(opts) => repo::fetch(http, &source.common, opts).await,
        SourceVariant::Paper(opts) => paper::fetch(http, &source.common, opts).await,
        SourceVariant::Feed(opts) => feed::fetch(http, &source.common, opts).await,
    }
}
