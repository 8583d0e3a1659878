//! Public-timeline poller.
//!
//! Long-polls one instance's public timeline through the paging API and
//! feeds new statuses into the status buffer. The wait between requests
//! adapts to observed activity through the pure [`next_wait`] policy, and
//! the loop itself is the explicit {polling, backing-off, caught-up} state
//! machine around it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use fedisample_common::{CrawlConfig, Error, Result};

use crate::store::{StatusBuffer, StatusSink, StoredStatus};

/// Crawl method recorded on stored statuses.
pub const POLL_METHOD: &str = "api/v1/timelines/public";

/// Consecutive fetch failures tolerated before the poller gives up.
const MAX_CONSECUTIVE_ERRORS: u32 = 5;

/// The status subset the poller consumes from the timeline API.
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub in_reply_to_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub spoiler_text: String,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub account: Account,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: String,
    pub acct: String,
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub followers_count: Option<i64>,
    #[serde(default)]
    pub following_count: Option<i64>,
    #[serde(default)]
    pub statuses_count: Option<i64>,
}

/// Poller phase after one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Full page: the instance produces faster than we poll.
    Polling,
    /// Thin page: slow down.
    BackingOff,
    /// Empty page: nothing new since the cursor.
    CaughtUp,
}

impl PollState {
    pub fn after_page(items: usize, page_limit: usize) -> PollState {
        if items >= page_limit {
            PollState::Polling
        } else if items == 0 {
            PollState::CaughtUp
        } else {
            PollState::BackingOff
        }
    }
}

/// Wait adjustment policy, separated from the network loop so it is
/// testable in isolation.
///
/// A full page speeds polling up (×0.9, floored at one second); an empty
/// page doubles the wait, up to three items grows it ×1.5, up to ten ×1.1;
/// the wait never exceeds `max_wait`.
pub fn next_wait(current: f64, items: usize, page_limit: usize, max_wait: f64) -> f64 {
    if items >= page_limit {
        return (current * 0.9).max(1.0);
    }
    let grown = if items == 0 {
        current * 2.0
    } else if items <= 3 {
        current * 1.5
    } else if items <= 10 {
        current * 1.1
    } else {
        current
    };
    grown.min(max_wait)
}

/// Polls one instance's public timeline.
pub struct Poller {
    client: reqwest::blocking::Client,
    instance: String,
    config: CrawlConfig,
}

impl Poller {
    pub fn new(instance: &str, config: &CrawlConfig, user_agent: &str) -> Result<Poller> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|e| Error::Http {
                instance: instance.to_string(),
                message: format!("building crawl client: {e}"),
            })?;
        Ok(Poller {
            client,
            instance: instance.to_string(),
            config: config.clone(),
        })
    }

    fn fetch_page(&self, min_id: Option<&str>) -> Result<Vec<Status>> {
        let url = format!("https://{}/api/v1/timelines/public", self.instance);
        let mut request = self
            .client
            .get(url)
            .query(&[("limit", self.config.page_limit.to_string())]);
        if let Some(id) = min_id {
            request = request.query(&[("min_id", id)]);
        }
        let response = request.send().map_err(|e| Error::Http {
            instance: self.instance.clone(),
            message: e.to_string(),
        })?;
        if !response.status().is_success() {
            return Err(Error::Http {
                instance: self.instance.clone(),
                message: format!("HTTP {}", response.status()),
            });
        }
        response.json::<Vec<Status>>().map_err(|e| Error::Http {
            instance: self.instance.clone(),
            message: format!("decoding timeline page: {e}"),
        })
    }

    /// Poll until stopped (or, with `catch_up`, until the timeline yields a
    /// non-full page). Returns the latest status id seen, usable as the
    /// next run's cursor.
    pub fn run(
        &self,
        buffer: &StatusBuffer,
        sink: &mut dyn StatusSink,
        mut min_id: Option<String>,
        catch_up: bool,
    ) -> Result<Option<String>> {
        let mut wait = self.config.initial_wait_secs;
        let mut consecutive_errors = 0u32;
        loop {
            let page = match self.fetch_page(min_id.as_deref()) {
                Ok(page) => {
                    consecutive_errors = 0;
                    page
                }
                Err(e) => {
                    consecutive_errors += 1;
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        buffer.flush(sink)?;
                        return Err(e);
                    }
                    warn!(instance = %self.instance, error = %e, "timeline fetch failed");
                    std::thread::sleep(Duration::from_secs_f64(wait));
                    wait = next_wait(wait, 0, self.config.page_limit, self.config.max_wait_secs);
                    continue;
                }
            };
            for status in &page {
                buffer.push(
                    StoredStatus::from_status(status, &self.instance, POLL_METHOD),
                    sink,
                )?;
            }
            if let Some(newest) = page.first() {
                min_id = Some(newest.id.clone());
                info!(
                    instance = %self.instance,
                    statuses = page.len(),
                    newest = %newest.created_at,
                    "crawled timeline page"
                );
            }
            let state = PollState::after_page(page.len(), self.config.page_limit);
            if catch_up && state != PollState::Polling {
                buffer.flush(sink)?;
                return Ok(min_id);
            }
            wait = next_wait(
                wait,
                page.len(),
                self.config.page_limit,
                self.config.max_wait_secs,
            );
            std::thread::sleep(Duration::from_secs_f64(wait));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_page_speeds_up_with_a_floor() {
        assert!((next_wait(100.0, 40, 40, 3600.0) - 90.0).abs() < 1e-9);
        assert_eq!(next_wait(1.0, 40, 40, 3600.0), 1.0);
        assert_eq!(next_wait(0.5, 40, 40, 3600.0), 1.0);
    }

    #[test]
    fn empty_page_doubles_the_wait() {
        assert!((next_wait(60.0, 0, 40, 3600.0) - 120.0).abs() < 1e-9);
    }

    #[test]
    fn thin_pages_grow_the_wait_gently() {
        assert!((next_wait(60.0, 2, 40, 3600.0) - 90.0).abs() < 1e-9);
        assert!((next_wait(60.0, 8, 40, 3600.0) - 66.0).abs() < 1e-9);
        assert_eq!(next_wait(60.0, 20, 40, 3600.0), 60.0);
    }

    #[test]
    fn wait_is_clamped_to_the_maximum() {
        assert_eq!(next_wait(3000.0, 0, 40, 3600.0), 3600.0);
        assert_eq!(next_wait(3600.0, 1, 40, 3600.0), 3600.0);
    }

    #[test]
    fn poll_state_reflects_page_size() {
        assert_eq!(PollState::after_page(40, 40), PollState::Polling);
        assert_eq!(PollState::after_page(0, 40), PollState::CaughtUp);
        assert_eq!(PollState::after_page(7, 40), PollState::BackingOff);
    }
}
