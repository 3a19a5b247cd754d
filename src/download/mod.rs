pub mod converter;
pub mod downloader;
pub mod progress;
pub mod ts_clock;
