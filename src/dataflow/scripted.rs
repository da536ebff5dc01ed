//! In-memory [PageSource] for driving pagination in tests.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::ops::Range;
use std::sync::Mutex;

use super::{FetchError, PageResponse, PageSource, RawRecord};

/// Replays canned pages in order and remembers every request it served.
/// Once the script runs out it answers with empty pages.
#[derive(Default)]
pub(crate) struct ScriptedSource {
    pages: Mutex<VecDeque<Result<PageResponse, FetchError>>>,
    requests: Mutex<Vec<(u32, u16)>>,
}

impl ScriptedSource {
    pub(crate) fn new(pages: Vec<Result<PageResponse, FetchError>>) -> Self {
        ScriptedSource {
            pages: Mutex::new(pages.into()),
            requests: Mutex::default(),
        }
    }

    pub(crate) fn requests(&self) -> Vec<(u32, u16)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch_page(&self, page: u32, page_size: u16) -> Result<PageResponse, FetchError> {
        self.requests.lock().unwrap().push((page, page_size));
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(PageResponse::default()))
    }
}

pub(crate) fn cards(range: Range<usize>) -> Vec<RawRecord> {
    range
        .map(|i| RawRecord {
            id: Some(format!("sv1-{}", i)),
            ..RawRecord::default()
        })
        .collect()
}

pub(crate) fn page(range: Range<usize>, total_count: u64) -> Result<PageResponse, FetchError> {
    Ok(PageResponse {
        data: cards(range),
        total_count: Some(total_count),
    })
}

pub(crate) fn open_ended_page(range: Range<usize>) -> Result<PageResponse, FetchError> {
    Ok(PageResponse {
        data: cards(range),
        total_count: None,
    })
}

pub(crate) fn server_error(page: u32) -> Result<PageResponse, FetchError> {
    Err(FetchError::Status {
        page,
        status: StatusCode::INTERNAL_SERVER_ERROR,
    })
}
