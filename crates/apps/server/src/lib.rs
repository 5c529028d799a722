pub mod api;
pub mod config;
pub mod data_sources;
pub mod fetcher;
