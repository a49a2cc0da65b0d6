use std::time::Duration;

/// Knobs for the tracking pipeline. Sampling and flushing run on independent
/// cadences; the request timeout bounds every upload so a stop can never hang
/// on a dead network.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub base_url: String,
    pub sample_interval: Duration,
    pub flush_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            sample_interval: Duration::from_secs(2),
            flush_interval: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
        }
    }
}
