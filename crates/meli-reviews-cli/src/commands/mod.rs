pub mod config;
pub mod extract;
pub mod progress;
pub mod scrape;
