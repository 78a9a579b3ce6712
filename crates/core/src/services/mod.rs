//! Business logic services.

pub mod scraper;
pub mod session;

pub use scraper::ScraperService;
pub use session::SessionManager;
