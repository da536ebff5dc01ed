use async_trait::async_trait;

pub(crate) mod connectors;
pub(crate) mod paginator;
pub(crate) mod projection;
pub(crate) mod sinks;

#[cfg(test)]
pub(crate) mod scripted;

pub(crate) use connectors::pokemontcg::{FetchError, PageResponse, RawRecord};

/// Anything that can hand out numbered pages of raw cards.
///
/// Pages are 1-based. Implementations perform exactly one request per call and
/// never retry; the [paginator::Paginator] decides what a failure means.
#[async_trait]
pub(crate) trait PageSource {
    async fn fetch_page(&self, page: u32, page_size: u16) -> Result<PageResponse, FetchError>;
}

/// How a pagination run ended
#[derive(Debug)]
pub(crate) enum FetchOutcome {
    /// The collection was exhausted or the record limit was reached
    Complete(Vec<RawRecord>),
    /// A request failed; `records` holds everything gathered before it
    Partial {
        records: Vec<RawRecord>,
        cause: FetchError,
    },
}

impl FetchOutcome {
    pub(crate) fn records(&self) -> &[RawRecord] {
        match self {
            FetchOutcome::Complete(records) => records,
            FetchOutcome::Partial { records, .. } => records,
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        matches!(self, FetchOutcome::Complete(_))
    }

    pub(crate) fn into_parts(self) -> (Vec<RawRecord>, Option<FetchError>) {
        match self {
            FetchOutcome::Complete(records) => (records, None),
            FetchOutcome::Partial { records, cause } => (records, Some(cause)),
        }
    }
}
