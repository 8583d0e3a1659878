//! Status persistence: mapping crawled statuses into stored documents and
//! batching them through a bounded buffer into a sink.
//!
//! The buffer is an explicit queue guarded by a single mutex; a batch is
//! flushed when the size threshold is reached or the oldest buffered status
//! exceeds the age threshold, both evaluated at enqueue time. No ambient
//! globals — whoever produces statuses is handed the buffer and a sink.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use fedisample_common::{Result, StoreConfig};

use crate::crawl::Status;

/// Document ids must be stable across crawls: the same status on the same
/// instance always maps to the same UUID.
fn namespace() -> &'static Uuid {
    static NAMESPACE: OnceLock<Uuid> = OnceLock::new();
    NAMESPACE.get_or_init(|| {
        let root = Uuid::new_v5(&Uuid::NAMESPACE_URL, b"fedisample");
        Uuid::new_v5(&root, b"mastodon")
    })
}

const INT_MAX: i64 = i32::MAX as i64;
const INT_MIN: i64 = i32::MIN as i64;

/// Clamp an API counter into the stored i32 range; out-of-range values are
/// dropped rather than wrapped.
fn check_int(value: Option<i64>) -> Option<i32> {
    value.filter(|v| (INT_MIN..=INT_MAX).contains(v)).map(|v| v as i32)
}

/// Empty strings from the API mean "not set".
fn check_str(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// The account subset kept per stored status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAccount {
    pub id: String,
    pub acct: String,
    pub username: String,
    pub display_name: String,
    pub bot: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statuses_count: Option<i32>,
}

/// One crawled status as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredStatus {
    pub doc_id: Uuid,
    pub api_url: String,
    pub content: String,
    pub crawl_method: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to_id: Option<String>,
    pub instance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub last_seen: DateTime<Utc>,
    /// Whether the author lives on the crawled instance.
    pub local: bool,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spoiler_text: Option<String>,
    pub tags: Vec<String>,
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub visibility: String,
    pub account: StoredAccount,
}

impl StoredStatus {
    /// Map an API status into its stored form.
    pub fn from_status(status: &Status, instance: &str, method: &str) -> StoredStatus {
        let doc_id = Uuid::new_v5(
            namespace(),
            format!("{}/{}", instance, status.id).as_bytes(),
        );
        StoredStatus {
            doc_id,
            api_url: format!("https://{}/api/v1/statuses/{}", instance, status.id),
            content: status.content.clone(),
            crawl_method: method.to_string(),
            created_at: status.created_at,
            edited_at: status.edited_at,
            id: status.id.clone(),
            in_reply_to_id: status.in_reply_to_id.clone(),
            instance: instance.to_string(),
            language: status.language.clone(),
            last_seen: Utc::now(),
            local: status.account.acct == status.account.username,
            sensitive: status.sensitive,
            spoiler_text: check_str(&status.spoiler_text),
            tags: status.tags.iter().map(|t| t.name.clone()).collect(),
            uri: status.uri.clone(),
            url: status.url.clone(),
            visibility: status.visibility.clone(),
            account: StoredAccount {
                id: status.account.id.clone(),
                acct: status.account.acct.clone(),
                username: status.account.username.clone(),
                display_name: status.account.display_name.clone(),
                bot: status.account.bot,
                url: status.account.url.clone(),
                followers_count: check_int(status.account.followers_count),
                following_count: check_int(status.account.following_count),
                statuses_count: check_int(status.account.statuses_count),
            },
        }
    }
}

/// Destination for flushed status batches.
pub trait StatusSink {
    fn write_batch(&mut self, batch: &[StoredStatus]) -> Result<()>;
}

/// Line-delimited JSON file sink.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    /// Open (or create) `path` for appending.
    pub fn append(path: &Path) -> Result<JsonlSink> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(JsonlSink {
            writer: BufWriter::new(file),
        })
    }
}

impl StatusSink for JsonlSink {
    fn write_batch(&mut self, batch: &[StoredStatus]) -> Result<()> {
        for status in batch {
            serde_json::to_writer(&mut self.writer, status)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Bounded status queue with size- and age-triggered flushing.
pub struct StatusBuffer {
    chunk_size: usize,
    max_age: Duration,
    inner: Mutex<BufferInner>,
}

struct BufferInner {
    queue: VecDeque<StoredStatus>,
    oldest: Option<Instant>,
}

impl StatusBuffer {
    pub fn new(config: &StoreConfig) -> StatusBuffer {
        StatusBuffer {
            chunk_size: config.chunk_size,
            max_age: Duration::from_secs(config.max_age_secs),
            inner: Mutex::new(BufferInner {
                queue: VecDeque::new(),
                oldest: None,
            }),
        }
    }

    /// Enqueue one status; flush to the sink if either threshold is hit.
    /// Returns how many statuses were written (0 when only buffered).
    pub fn push(&self, status: StoredStatus, sink: &mut dyn StatusSink) -> Result<usize> {
        let mut inner = self.inner.lock().expect("status buffer poisoned");
        if inner.oldest.is_none() {
            inner.oldest = Some(Instant::now());
        }
        inner.queue.push_back(status);
        let age_exceeded = inner
            .oldest
            .map(|t| t.elapsed() >= self.max_age)
            .unwrap_or(false);
        if inner.queue.len() >= self.chunk_size || age_exceeded {
            return drain(&mut inner, sink);
        }
        Ok(0)
    }

    /// Flush everything buffered regardless of thresholds.
    pub fn flush(&self, sink: &mut dyn StatusSink) -> Result<usize> {
        let mut inner = self.inner.lock().expect("status buffer poisoned");
        drain(&mut inner, sink)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("status buffer poisoned").queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn drain(inner: &mut BufferInner, sink: &mut dyn StatusSink) -> Result<usize> {
    if inner.queue.is_empty() {
        return Ok(0);
    }
    let batch: Vec<StoredStatus> = inner.queue.drain(..).collect();
    inner.oldest = None;
    sink.write_batch(&batch)?;
    debug!(count = batch.len(), "flushed status batch");
    Ok(batch.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::{Account, Status, Tag};

    struct VecSink {
        batches: Vec<Vec<StoredStatus>>,
    }

    impl VecSink {
        fn new() -> VecSink {
            VecSink {
                batches: Vec::new(),
            }
        }

        fn written(&self) -> usize {
            self.batches.iter().map(Vec::len).sum()
        }
    }

    impl StatusSink for VecSink {
        fn write_batch(&mut self, batch: &[StoredStatus]) -> Result<()> {
            self.batches.push(batch.to_vec());
            Ok(())
        }
    }

    fn status(id: &str) -> Status {
        Status {
            id: id.to_string(),
            created_at: "2026-07-01T12:00:00Z".parse().unwrap(),
            edited_at: None,
            in_reply_to_id: None,
            content: "<p>hello</p>".to_string(),
            language: Some("en".to_string()),
            sensitive: false,
            spoiler_text: String::new(),
            visibility: "public".to_string(),
            uri: format!("https://a.example/statuses/{id}"),
            url: Some(format!("https://a.example/@user/{id}")),
            tags: vec![Tag {
                name: "fediverse".to_string(),
            }],
            account: Account {
                id: "1".to_string(),
                acct: "user".to_string(),
                username: "user".to_string(),
                display_name: "User".to_string(),
                bot: false,
                url: None,
                followers_count: Some(12),
                following_count: Some(3_000_000_000),
                statuses_count: None,
            },
        }
    }

    fn stored(id: &str) -> StoredStatus {
        StoredStatus::from_status(&status(id), "a.example", "api/v1/timelines/public")
    }

    #[test]
    fn mapping_derives_stable_ids_and_locality() {
        let a = stored("101");
        let b = stored("101");
        assert_eq!(a.doc_id, b.doc_id);
        assert_ne!(a.doc_id, stored("102").doc_id);
        assert!(a.local);
        assert_eq!(a.api_url, "https://a.example/api/v1/statuses/101");
        assert_eq!(a.tags, vec!["fediverse"]);
        // Empty spoiler text means "not set".
        assert_eq!(a.spoiler_text, None);
        // Counters outside i32 are dropped, in-range ones kept.
        assert_eq!(a.account.followers_count, Some(12));
        assert_eq!(a.account.following_count, None);
    }

    #[test]
    fn remote_authors_are_not_local() {
        let mut s = status("5");
        s.account.acct = "user@elsewhere.example".to_string();
        let mapped = StoredStatus::from_status(&s, "a.example", "test");
        assert!(!mapped.local);
    }

    #[test]
    fn buffer_flushes_at_size_threshold() {
        let config = StoreConfig {
            chunk_size: 3,
            max_age_secs: 3600,
        };
        let buffer = StatusBuffer::new(&config);
        let mut sink = VecSink::new();
        assert_eq!(buffer.push(stored("1"), &mut sink).unwrap(), 0);
        assert_eq!(buffer.push(stored("2"), &mut sink).unwrap(), 0);
        assert_eq!(buffer.push(stored("3"), &mut sink).unwrap(), 3);
        assert!(buffer.is_empty());
        assert_eq!(sink.batches.len(), 1);
        assert_eq!(sink.written(), 3);
    }

    #[test]
    fn buffer_flushes_when_age_exceeded() {
        let config = StoreConfig {
            chunk_size: 1000,
            max_age_secs: 0,
        };
        let buffer = StatusBuffer::new(&config);
        let mut sink = VecSink::new();
        // With a zero age threshold every push flushes immediately.
        assert_eq!(buffer.push(stored("1"), &mut sink).unwrap(), 1);
        assert_eq!(buffer.push(stored("2"), &mut sink).unwrap(), 1);
        assert_eq!(sink.batches.len(), 2);
    }

    #[test]
    fn explicit_flush_drains_the_remainder() {
        let config = StoreConfig {
            chunk_size: 100,
            max_age_secs: 3600,
        };
        let buffer = StatusBuffer::new(&config);
        let mut sink = VecSink::new();
        buffer.push(stored("1"), &mut sink).unwrap();
        buffer.push(stored("2"), &mut sink).unwrap();
        assert_eq!(buffer.flush(&mut sink).unwrap(), 2);
        assert_eq!(buffer.flush(&mut sink).unwrap(), 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn stored_status_round_trips_through_jsonl() {
        let original = stored("42");
        let line = serde_json::to_string(&original).unwrap();
        let parsed: StoredStatus = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.doc_id, original.doc_id);
        assert_eq!(parsed.account, original.account);
    }
}
