pub mod classifier;
pub mod consumer;
pub mod db;
pub mod error;
pub mod http;
pub mod ingest;
pub mod reading;
pub mod shutdown;
pub mod status;
pub mod store;
pub mod telemetry;
pub mod transport;
