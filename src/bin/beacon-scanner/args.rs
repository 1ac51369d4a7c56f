use std::num::NonZeroUsize;

use clap::Parser;

use beacon_status::classifier::{DEFAULT_ACTIVITY_ATTRIBUTE, DEFAULT_ACTIVITY_THRESHOLD};

#[derive(Debug, Parser)]
pub struct Args {
    #[arg(long, env = "INGEST_URL", default_value = "http://localhost:5100")]
    pub ingest_url: String,

    #[arg(long, env = "ACTIVITY_ATTRIBUTE", default_value = DEFAULT_ACTIVITY_ATTRIBUTE)]
    pub activity_attribute: String,

    #[arg(long, env = "ACTIVITY_THRESHOLD", default_value_t = DEFAULT_ACTIVITY_THRESHOLD)]
    pub activity_threshold: f64,

    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "READING_BUFFER", default_value = "256")]
    pub reading_buffer: NonZeroUsize,
}
