//! Maps a run onto the fixed bucket layout used for display.

use shared::domain::{BucketId, ResultItem, Run};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketMeta {
    pub id: BucketId,
    pub label: &'static str,
    pub category: &'static str,
}

pub const KNOWN_BUCKETS: [BucketMeta; 5] = [
    BucketMeta {
        id: BucketId::Mbb,
        label: "MBB Consulting",
        category: "consulting",
    },
    BucketMeta {
        id: BucketId::Market,
        label: "Market Research",
        category: "market",
    },
    BucketMeta {
        id: BucketId::Reddit,
        label: "Community (Reddit)",
        category: "community",
    },
    BucketMeta {
        id: BucketId::Arxiv,
        label: "Academic (Arxiv)",
        category: "academic",
    },
    BucketMeta {
        id: BucketId::Youtube,
        label: "Media (YouTube)",
        category: "media",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub title: String,
    pub body: String,
    pub href: String,
    /// `None` when `href` is not an absolute URL with a host.
    pub host: Option<String>,
}

impl From<&ResultItem> for ResultView {
    fn from(item: &ResultItem) -> Self {
        Self {
            title: item.title.clone(),
            body: item.body.clone(),
            href: item.href.clone(),
            host: display_host(&item.href),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketView {
    pub meta: BucketMeta,
    pub summary: Option<String>,
    pub results: Vec<ResultView>,
}

impl BucketView {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// One view per entry of `known`, in that order. Buckets missing from the run
/// come back empty; result order is kept as received.
pub fn aggregate(run: &Run, known: &[BucketMeta]) -> Vec<BucketView> {
    known
        .iter()
        .map(|meta| {
            let bucket = run.bucket(meta.id);
            BucketView {
                meta: *meta,
                summary: bucket.and_then(|b| b.summary.clone()),
                results: bucket
                    .map(|b| b.results.iter().map(ResultView::from).collect())
                    .unwrap_or_default(),
            }
        })
        .collect()
}

pub fn aggregate_known(run: &Run) -> Vec<BucketView> {
    aggregate(run, &KNOWN_BUCKETS)
}

/// Hostname exactly as the URL carries it, `www.` included.
pub fn display_host(href: &str) -> Option<String> {
    let url = Url::parse(href.trim()).ok()?;
    url.host_str().map(str::to_string)
}

#[cfg(test)]
#[path = "tests/buckets_tests.rs"]
mod tests;
