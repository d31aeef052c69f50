// Profile browsing, stats and the scrape trigger.
// The scraping itself lives in crate::scraper.

pub mod handlers;
