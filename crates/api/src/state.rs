//! Application state.

use scrapper_core::ScraperService;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Search and timeline scraping.
    pub scraper_service: ScraperService,
}

impl AppState {
    /// Create the application state.
    #[must_use]
    pub const fn new(scraper_service: ScraperService) -> Self {
        Self { scraper_service }
    }
}
