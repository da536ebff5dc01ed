use log::{error, info};
use std::time::Duration;

use super::{FetchOutcome, PageSource, RawRecord};

/// Pages through a [PageSource] until it runs dry.
///
/// Requests go out strictly one at a time, starting at page 1, with a fixed
/// pause between them. The accumulated list never grows past the optional
/// record limit nor past the total count the server reports.
pub(crate) struct Paginator<S> {
    source: S,
    page_size: u16,
    inter_page_delay: Duration,
}

impl<S: PageSource> Paginator<S> {
    pub(crate) fn new(source: S, page_size: u16, inter_page_delay: Duration) -> Self {
        Paginator {
            source,
            page_size,
            inter_page_delay,
        }
    }

    pub(crate) async fn fetch_all(&self, max_records: Option<usize>) -> FetchOutcome {
        let (outcome, pages) = self.fetch_counted(max_records).await;

        info!(
            "Fetched {} cards from {} pages",
            outcome.records().len(),
            pages
        );

        outcome
    }

    /// Runs the page loop, also returning how many pages contributed cards
    async fn fetch_counted(&self, max_records: Option<usize>) -> (FetchOutcome, u32) {
        let mut records: Vec<RawRecord> = Vec::new();
        let mut pages_with_cards: u32 = 0;

        if max_records == Some(0) {
            info!("Record limit is 0, nothing to fetch");
            return (FetchOutcome::Complete(records), pages_with_cards);
        }

        let mut page: u32 = 1;

        loop {
            info!("Fetching page {} ({} cards so far)", page, records.len());

            let response = match self.source.fetch_page(page, self.page_size).await {
                Ok(response) => response,
                Err(cause) => {
                    error!(
                        "Stopping after {} cards, page {} failed: {}",
                        records.len(),
                        page,
                        cause
                    );

                    return (FetchOutcome::Partial { records, cause }, pages_with_cards);
                }
            };

            if response.data.is_empty() {
                info!("Page {} is empty, no more cards", page);
                break;
            }

            pages_with_cards += 1;
            records.extend(response.data);

            let mut done = false;

            match response.total_count {
                Some(total) => {
                    let total = usize::try_from(total).unwrap_or(usize::MAX);

                    if records.len() >= total {
                        records.truncate(total);
                        done = true;
                    }

                    info!("  Progress: {}/{}", records.len(), total);
                }
                None => info!("  Progress: {} (total unknown)", records.len()),
            }

            if let Some(limit) = max_records {
                if records.len() >= limit {
                    records.truncate(limit);
                    info!("Reached the limit of {} cards", limit);
                    done = true;
                }
            }

            if done {
                break;
            }

            page += 1;

            if !self.inter_page_delay.is_zero() {
                tokio::time::sleep(self.inter_page_delay).await;
            }
        }

        (FetchOutcome::Complete(records), pages_with_cards)
    }
}
