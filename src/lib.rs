pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod ingest;
pub mod liveness;
pub mod notify;
pub mod sites;
pub mod status;
pub mod thresholds;
