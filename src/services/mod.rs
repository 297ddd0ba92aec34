// src/services/mod.rs
pub mod claim;
pub mod crawl;
pub mod decay;
pub mod reinvestment;
pub mod report;
pub mod scrape;
pub mod store;
pub mod time_parser;
pub mod wait;
