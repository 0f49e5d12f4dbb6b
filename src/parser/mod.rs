pub mod document;
pub mod extract;

use crate::db::{ClueRecord, FetchedPage};
use document::Document;

pub struct ProcessedPage {
    pub page_id: i64,
    pub url: String,
    pub title: Option<String>,
    pub clues: Vec<ClueRecord>,
}

/// Parse one fetched page and pull its clues.
pub fn process_page(page: &FetchedPage) -> ProcessedPage {
    let document = Document::parse(&page.html);
    ProcessedPage {
        page_id: page.page_id,
        url: page.url.clone(),
        title: extract::game_title(&document),
        clues: extract::extract(&document, &page.url),
    }
}
