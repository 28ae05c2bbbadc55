use std::{
    env,
    future::Future,
    sync::OnceLock,
    time::{Duration, Instant},
};

use tracing::{Instrument, Span};

use crate::Error;

const DEBUG_DELAY_ENV: &str = "EVENTDESK_DEBUG_HTTP_DELAY_MS";

/// Run one backend round trip inside `span`, recording how long it took.
pub async fn send_request<F, Fut, T>(span: Span, send: F) -> Result<T, Error>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    async move {
        debug_http_delay().await;
        let started = Instant::now();
        let result = send().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::trace!(elapsed_ms, "request_ok"),
            Err(err) => tracing::debug!(elapsed_ms, error = %err, "request_failed"),
        }
        result
    }
    .instrument(span)
    .await
}

async fn debug_http_delay() {
    if let Some(delay) = debug_http_delay_duration() {
        tracing::trace!(delay_ms = delay.as_millis(), "Applying debug HTTP delay");
        tokio::time::sleep(delay).await;
    }
}

fn debug_http_delay_duration() -> Option<Duration> {
    static DELAY: OnceLock<Option<Duration>> = OnceLock::new();
    *DELAY.get_or_init(|| {
        let Ok(raw) = env::var(DEBUG_DELAY_ENV) else {
            return None;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<u64>() {
            Ok(0) => None,
            Ok(ms) => Some(Duration::from_millis(ms)),
            Err(_) => {
                tracing::warn!(env = DEBUG_DELAY_ENV, value = %raw, "Invalid HTTP debug delay");
                None
            }
        }
    })
}
