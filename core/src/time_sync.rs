//! Time service client
//!
//! Fetches the current time from a worldtimeapi.org-style HTTP endpoint and
//! writes it into the [`ClockModel`]. The request blocks for as long as the
//! transport allows; it only runs at startup and once per resync interval.
//!
//! Only two fields of the response are used:
//!
//! ```json
//! { "unixtime": 1732464068, "raw_offset": -18000, ... }
//! ```
//!
//! `dst_offset` and the string fields are ignored. A failed sync leaves the
//! clock free-running until the next scheduled attempt.

use hal_abstractions::{HttpClient, Monotonic};
use serde::Deserialize;

use crate::clock::{ClockModel, LocalDateTime};
use crate::config::TimeSyncConfig;
use crate::error::TimeSyncError;
use crate::logging::{debug, error, info, Dbg};

/// Response buffer; a worldtimeapi.org body is around 400 bytes
const MAX_RESPONSE_LEN: usize = 1024;

/// Longest body prefix written to the debug log
const LOGGED_BODY_LEN: usize = 128;

/// Fields taken from the time service response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WorldTime {
    /// UTC seconds since 1970-01-01
    pub unixtime: i64,
    /// Standard-time offset from UTC in seconds
    pub raw_offset: i32,
}

/// Parse a time service response body
pub fn parse_world_time(body: &[u8]) -> Result<WorldTime, TimeSyncError> {
    match serde_json_core::from_slice::<WorldTime>(body) {
        Ok((time, _consumed)) => Ok(time),
        Err(e) => {
            error!("Error parsing response! {:?}", Dbg(&e));
            Err(TimeSyncError::Parse)
        }
    }
}

/// Longest valid UTF-8 prefix of `body`, at most `max` bytes
fn printable_prefix(body: &[u8], max: usize) -> &str {
    let head = &body[..body.len().min(max)];
    match core::str::from_utf8(head) {
        Ok(text) => text,
        Err(e) => core::str::from_utf8(&head[..e.valid_up_to()]).unwrap_or(""),
    }
}

/// One-shot time fetcher
pub struct TimeSyncClient<H> {
    http: H,
    config: TimeSyncConfig,
}

impl<H: HttpClient> TimeSyncClient<H> {
    pub fn new(http: H, config: TimeSyncConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &TimeSyncConfig {
        &self.config
    }

    /// Underlying HTTP client
    pub fn http(&self) -> &H {
        &self.http
    }

    /// Request the time once and, on success, set `clock`
    ///
    /// The clock is stamped with the tick at which the response arrived.
    /// Returns the new local date and time.
    pub async fn fetch_time<M: Monotonic>(
        &mut self,
        clock: &mut ClockModel,
        mono: &M,
    ) -> Result<LocalDateTime, TimeSyncError> {
        let start = mono.now_ms();
        info!("Sending request for time to {}", self.config.url);

        let mut body = [0u8; MAX_RESPONSE_LEN];
        let result = self
            .http
            .get(self.config.url, self.config.accept, &mut body)
            .await;

        let received_at = mono.now_ms();
        info!(
            "Finished request in {} millis.",
            received_at.saturating_sub(start)
        );

        let response = result.map_err(|e| {
            error!("Error on HTTP request: {:?}", Dbg(&e));
            TimeSyncError::Transport
        })?;

        info!(
            "Response code: {} Data length: {}",
            response.status, response.body_len
        );

        let len = response.body_len.min(body.len());
        debug!("{}", printable_prefix(&body[..len], LOGGED_BODY_LEN));
        let time = parse_world_time(&body[..len])?;

        clock.set(time.unixtime, time.raw_offset, received_at);
        let local = clock.advance(received_at);
        info!(
            "Clock set to {} (UTC offset {} s)",
            local, time.raw_offset
        );
        Ok(local)
    }
}
