// Queue Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_QUEUE_KEY_PREFIX: &str = "otl:q:";
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100;
pub const DEFAULT_MAX_DELIVER_PER_POLL: usize = 10;
/// 3 days
pub const DEFAULT_ITEM_TTL_SECONDS: u64 = 259_200;

/// Width of the zero-padded `seq` field
const SEQ_WIDTH: usize = 10;

/// One pending link, stored as a JSON member scored by `enqueued_at_ms`
///
/// Stores that break score ties by comparing member bytes (Redis) order a
/// batch by its leading `seq`, so it must stay the first serialized field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    #[serde(default)]
    pub seq: String,
    pub id: String,
    pub url: String,
    #[serde(rename = "ts")]
    pub enqueued_at_ms: i64,
}

impl QueueItem {
    /// `index` is the position inside one enqueue batch; it keeps ids unique
    /// when a whole batch shares the same millisecond
    pub fn new(url: impl Into<String>, enqueued_at_ms: i64, index: usize) -> Self {
        Self {
            seq: format!("{:0width$}", index, width = SEQ_WIDTH),
            id: format!("{}-{}", enqueued_at_ms, index),
            url: url.into(),
            enqueued_at_ms,
        }
    }

    pub fn to_member(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_member(member: &str) -> serde_json::Result<Self> {
        serde_json::from_str(member)
    }
}

/// Queue limits and retention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSettings {
    pub key_prefix: String,
    pub max_queue_size: usize,
    pub max_deliver_per_poll: usize,
    pub item_ttl_seconds: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_QUEUE_KEY_PREFIX.to_string(),
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            max_deliver_per_poll: DEFAULT_MAX_DELIVER_PER_POLL,
            item_ttl_seconds: DEFAULT_ITEM_TTL_SECONDS,
        }
    }
}

impl QueueSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_queue_size == 0 {
            return Err(DomainError::InvalidQueueSettings(
                "max_queue_size must be positive".to_string(),
            ));
        }
        if self.max_deliver_per_poll == 0 {
            return Err(DomainError::InvalidQueueSettings(
                "max_deliver_per_poll must be positive".to_string(),
            ));
        }
        if self.item_ttl_seconds == 0 {
            return Err(DomainError::InvalidQueueSettings(
                "item_ttl_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn item_ttl_ms(&self) -> i64 {
        (self.item_ttl_seconds as i64).saturating_mul(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_includes_batch_index() {
        let a = QueueItem::new("https://a.com/", 1_700_000_000_000, 0);
        let b = QueueItem::new("https://b.com/", 1_700_000_000_000, 1);
        assert_eq!(a.id, "1700000000000-0");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_member_uses_ts_field() {
        let item = QueueItem::new("https://a.com/", 42, 0);
        let member = item.to_member().unwrap();
        assert!(member.starts_with("{\"seq\":\"0000000000\",\"id\":\"42-0\""));
        assert!(member.contains("\"ts\":42"));
        assert_eq!(QueueItem::from_member(&member).unwrap(), item);
    }

    #[test]
    fn test_batch_members_sort_bytewise_in_batch_order() {
        let ts = 1_700_000_000_000;
        let mut members: Vec<String> = (0..12)
            .map(|i| {
                QueueItem::new(format!("https://l{}.com/", i), ts, i)
                    .to_member()
                    .unwrap()
            })
            .collect();
        members.reverse();
        members.sort();

        let ids: Vec<String> = members
            .iter()
            .map(|m| QueueItem::from_member(m).unwrap().id)
            .collect();
        let expected: Vec<String> = (0..12).map(|i| format!("{}-{}", ts, i)).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_member_without_seq_still_decodes() {
        let legacy = r#"{"id":"1-0","url":"https://a.com/","ts":1}"#;
        let item = QueueItem::from_member(legacy).unwrap();
        assert_eq!(item.url, "https://a.com/");
        assert!(item.seq.is_empty());
    }

    #[test]
    fn test_settings_reject_zero_limits() {
        let settings = QueueSettings {
            max_queue_size: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
        assert!(QueueSettings::default().validate().is_ok());
    }
}
