pub mod fetcher;
pub mod logging;
pub mod page;

pub use fetcher::{Fetcher, HttpFetcher};
pub use logging::init_logging;
pub use page::{extract_page, reading_time, word_count, ExtractedPage, PageStructure};

pub mod prelude {
    pub use super::fetcher::Fetcher;
    pub use super::page::{extract_page, ExtractedPage};
    pub use ap_core::{Error, Result};
}
