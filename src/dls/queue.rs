//! Message store with TTL, content deduplication and criteria-driven
//! selection.
//!
//! All mutation happens under the engine's single lock; this module is the
//! data structure, not the synchronization.

use super::models::{default_score, DlsMessage, MessagePriority, SelectionCriteria};
use crate::error::PadError;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Per-priority and per-source snapshot of the queue, for status reporting.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct QueueStatistics {
    pub queued: usize,
    pub expired_total: u64,
    pub sent_total: u64,
    pub priority_counts: HashMap<String, usize>,
    pub source_counts: HashMap<String, usize>,
    pub average_importance: f64,
    pub oldest_created_at: Option<DateTime<Utc>>,
    pub newest_created_at: Option<DateTime<Utc>>,
}

pub struct DlsQueue {
    messages: HashMap<String, DlsMessage>,
    /// fingerprint → first-seen time, pruned together with the dedup window.
    fingerprints: HashMap<String, DateTime<Utc>>,
    dedup_window: Duration,
    capacity: usize,
    expired_total: u64,
    sent_total: u64,
}

impl DlsQueue {
    pub fn new(dedup_window: Duration, capacity: usize) -> Self {
        Self {
            messages: HashMap::new(),
            fingerprints: HashMap::new(),
            dedup_window,
            capacity,
            expired_total: 0,
            sent_total: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_duplicate(&self, fingerprint: &str, now: DateTime<Utc>) -> bool {
        self.fingerprints
            .get(fingerprint)
            .is_some_and(|seen| now - *seen < self.dedup_window)
    }

    /// Insert a message whose invariants have been established by the
    /// engine. Rejects dedup-window hits and enforces the capacity bound by
    /// evicting the least urgent, oldest message.
    pub fn insert(&mut self, msg: DlsMessage, now: DateTime<Utc>) -> Result<(), PadError> {
        if msg.expires_at <= msg.created_at {
            return Err(PadError::InvalidInput(
                "expires_at must be after created_at".into(),
            ));
        }
        if self.is_duplicate(&msg.fingerprint, now) {
            return Err(PadError::Duplicate);
        }
        if self.messages.len() >= self.capacity && !self.messages.contains_key(&msg.source_id) {
            self.evict_one()?;
        }

        self.fingerprints.insert(msg.fingerprint.clone(), now);
        self.messages.insert(msg.source_id.clone(), msg);
        Ok(())
    }

    /// Drop the least urgent, oldest message to make room. Emergency
    /// messages are never evicted.
    fn evict_one(&mut self) -> Result<(), PadError> {
        let victim = self
            .messages
            .values()
            .filter(|m| m.priority != MessagePriority::Emergency)
            .max_by(|a, b| {
                (a.priority.rank(), std::cmp::Reverse(a.created_at))
                    .cmp(&(b.priority.rank(), std::cmp::Reverse(b.created_at)))
            })
            .map(|m| m.source_id.clone())
            .ok_or(PadError::ResourceExhausted)?;
        debug!(source_id = %victim, "evicting message to make room");
        self.messages.remove(&victim);
        Ok(())
    }

    pub fn remove(&mut self, source_id: &str) -> Option<DlsMessage> {
        self.messages.remove(source_id)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.fingerprints.clear();
    }

    fn passes_filter(
        msg: &DlsMessage,
        criteria: &SelectionCriteria,
        now: DateTime<Utc>,
    ) -> bool {
        if now > msg.expires_at {
            return false;
        }
        if !msg
            .priority
            .is_within(criteria.min_priority, criteria.max_priority)
        {
            return false;
        }
        if now - msg.created_at > criteria.max_age {
            return false;
        }
        if !criteria.allowed_sources.is_empty() && !criteria.allowed_sources.contains(&msg.source)
        {
            return false;
        }
        if criteria.blocked_sources.contains(&msg.source) {
            return false;
        }
        if !criteria.allow_repeats && msg.send_count > 0 {
            return false;
        }
        if msg.send_count >= criteria.max_repeat_count {
            return false;
        }
        if let Some(last_sent) = msg.last_sent {
            if now - last_sent < criteria.min_repeat_interval {
                return false;
            }
        }
        if msg.max_sends > 0 && msg.send_count >= msg.max_sends {
            return false;
        }
        if msg.text.chars().count() > criteria.max_text_length {
            return false;
        }
        true
    }

    /// Select the best candidate under `criteria`, update its counters and
    /// return a snapshot. Ties break on earliest created-at, then source id.
    pub fn select(
        &mut self,
        criteria: &SelectionCriteria,
        now: DateTime<Utc>,
    ) -> Result<DlsMessage, PadError> {
        self.sweep(now);

        let score_of = |msg: &DlsMessage| -> f64 {
            let base = match &criteria.scoring {
                Some(custom) => custom(msg, now),
                None => default_score(msg, now),
            };
            if criteria.prefer_thai && !msg.is_thai {
                base * 0.8
            } else {
                base
            }
        };

        let winner_id = self
            .messages
            .values()
            .filter(|m| Self::passes_filter(m, criteria, now))
            .max_by(|a, b| {
                score_of(a)
                    .partial_cmp(&score_of(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    // Older first, then lexicographic source id.
                    .then_with(|| b.created_at.cmp(&a.created_at))
                    .then_with(|| b.source_id.cmp(&a.source_id))
            })
            .map(|m| m.source_id.clone())
            .ok_or(PadError::NoContent)?;

        let msg = self
            .messages
            .get_mut(&winner_id)
            .ok_or_else(|| PadError::Internal("selected message vanished".into()))?;
        msg.last_sent = Some(now);
        msg.send_count += 1;
        self.sent_total += 1;
        let snapshot = msg.clone();

        // Reaching the send budget ends the message's lifecycle.
        if msg.max_sends > 0 && msg.send_count >= msg.max_sends {
            self.messages.remove(&winner_id);
        }

        Ok(snapshot)
    }

    /// Drop expired messages and prune stale fingerprint entries. Returns
    /// the number of messages removed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.messages.len();
        self.messages.retain(|_, m| now <= m.expires_at);
        let removed = before - self.messages.len();
        self.expired_total += removed as u64;

        let window = self.dedup_window;
        self.fingerprints.retain(|_, seen| now - *seen < window);
        removed
    }

    pub fn snapshot(&self) -> Vec<DlsMessage> {
        let mut all: Vec<DlsMessage> = self.messages.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.source_id.cmp(&b.source_id)));
        all
    }

    pub fn statistics(&self) -> QueueStatistics {
        let mut stats = QueueStatistics {
            queued: self.messages.len(),
            expired_total: self.expired_total,
            sent_total: self.sent_total,
            ..QueueStatistics::default()
        };
        let mut importance_sum = 0.0;
        for msg in self.messages.values() {
            *stats
                .priority_counts
                .entry(format!("{:?}", msg.priority).to_lowercase())
                .or_default() += 1;
            *stats
                .source_counts
                .entry(format!("{:?}", msg.source).to_lowercase())
                .or_default() += 1;
            importance_sum += msg.importance;
            stats.oldest_created_at = Some(
                stats
                    .oldest_created_at
                    .map_or(msg.created_at, |t| t.min(msg.created_at)),
            );
            stats.newest_created_at = Some(
                stats
                    .newest_created_at
                    .map_or(msg.created_at, |t| t.max(msg.created_at)),
            );
        }
        if !self.messages.is_empty() {
            stats.average_importance = importance_sum / self.messages.len() as f64;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dls::models::{ContentSource, MessageContext};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn message(id: &str, text: &str, priority: MessagePriority, at: DateTime<Utc>) -> DlsMessage {
        DlsMessage {
            source_id: id.to_string(),
            fingerprint: format!("fp:{text}"),
            text: text.to_string(),
            is_thai: false,
            priority,
            context: MessageContext::Automated,
            source: ContentSource::Manual,
            created_at: at,
            expires_at: at + Duration::hours(24),
            last_sent: None,
            send_count: 0,
            max_sends: 0,
            importance: 0.5,
            metadata: HashMap::new(),
        }
    }

    fn queue() -> DlsQueue {
        DlsQueue::new(Duration::hours(1), 100)
    }

    #[test]
    fn duplicate_within_window_is_rejected() {
        let mut q = queue();
        let now = t0();
        q.insert(message("a", "Hello", MessagePriority::Normal, now), now)
            .unwrap();
        let err = q
            .insert(
                message("x", "Hello", MessagePriority::Normal, now + Duration::seconds(30)),
                now + Duration::seconds(30),
            )
            .unwrap_err();
        assert!(matches!(err, PadError::Duplicate));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn duplicate_outside_window_is_admitted() {
        let mut q = queue();
        let now = t0();
        q.insert(message("a", "Hello", MessagePriority::Normal, now), now)
            .unwrap();
        let later = now + Duration::hours(2);
        q.insert(message("b", "Hello", MessagePriority::Normal, later), later)
            .unwrap();
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn selection_follows_priority_order() {
        let mut q = queue();
        let now = t0();
        for (id, text, priority) in [
            ("1", "low", MessagePriority::Low),
            ("2", "emergency", MessagePriority::Emergency),
            ("3", "high", MessagePriority::High),
            ("4", "normal", MessagePriority::Normal),
        ] {
            q.insert(message(id, text, priority, now), now).unwrap();
        }

        let criteria = SelectionCriteria {
            max_age: Duration::hours(24),
            min_repeat_interval: Duration::zero(),
            ..SelectionCriteria::default()
        };
        let order: Vec<String> = (0..4)
            .map(|_| {
                let picked = q.select(&criteria, t0() + Duration::seconds(1)).unwrap();
                q.remove(&picked.source_id);
                picked.text
            })
            .collect();
        assert_eq!(order, ["emergency", "high", "normal", "low"]);
    }

    #[test]
    fn ties_break_on_created_at_then_source_id() {
        let mut q = queue();
        let now = t0();
        q.insert(message("b", "one", MessagePriority::Normal, now), now)
            .unwrap();
        q.insert(message("a", "two", MessagePriority::Normal, now), now)
            .unwrap();
        let criteria = SelectionCriteria::default();
        let picked = q.select(&criteria, now + Duration::seconds(1)).unwrap();
        assert_eq!(picked.source_id, "a");
    }

    #[test]
    fn expired_messages_are_swept() {
        let mut q = queue();
        let now = t0();
        let mut msg = message("a", "soon gone", MessagePriority::Normal, now);
        msg.expires_at = now + Duration::seconds(10);
        q.insert(msg, now).unwrap();

        assert_eq!(q.sweep(now + Duration::seconds(11)), 1);
        assert!(q.is_empty());
        assert_eq!(q.statistics().expired_total, 1);
    }

    #[test]
    fn max_sends_removes_message_from_queue() {
        let mut q = queue();
        let now = t0();
        let mut msg = message("a", "twice", MessagePriority::Normal, now);
        msg.max_sends = 2;
        q.insert(msg, now).unwrap();

        let criteria = SelectionCriteria {
            min_repeat_interval: Duration::zero(),
            max_repeat_count: 10,
            ..SelectionCriteria::default()
        };
        let first = q.select(&criteria, now + Duration::seconds(1)).unwrap();
        assert_eq!(first.send_count, 1);
        let second = q.select(&criteria, now + Duration::seconds(2)).unwrap();
        assert_eq!(second.send_count, 2);
        assert!(q.is_empty());
        assert!(matches!(
            q.select(&criteria, now + Duration::seconds(3)),
            Err(PadError::NoContent)
        ));
    }

    #[test]
    fn min_repeat_interval_blocks_rapid_reselection() {
        let mut q = queue();
        let now = t0();
        q.insert(message("a", "only", MessagePriority::Normal, now), now)
            .unwrap();
        let criteria = SelectionCriteria {
            min_repeat_interval: Duration::minutes(5),
            ..SelectionCriteria::default()
        };
        q.select(&criteria, now + Duration::seconds(1)).unwrap();
        assert!(matches!(
            q.select(&criteria, now + Duration::seconds(30)),
            Err(PadError::NoContent)
        ));
        assert!(q
            .select(&criteria, now + Duration::minutes(6))
            .is_ok());
    }

    #[test]
    fn blocked_and_allowed_sources_filter() {
        let mut q = queue();
        let now = t0();
        let mut rss = message("r", "from rss", MessagePriority::Normal, now);
        rss.source = ContentSource::Rss;
        q.insert(rss, now).unwrap();

        let blocked = SelectionCriteria {
            blocked_sources: vec![ContentSource::Rss],
            ..SelectionCriteria::default()
        };
        assert!(matches!(q.select(&blocked, now), Err(PadError::NoContent)));

        let allowed = SelectionCriteria {
            allowed_sources: vec![ContentSource::Manual],
            ..SelectionCriteria::default()
        };
        assert!(matches!(q.select(&allowed, now), Err(PadError::NoContent)));

        let open = SelectionCriteria {
            allowed_sources: vec![ContentSource::Rss],
            ..SelectionCriteria::default()
        };
        assert_eq!(q.select(&open, now).unwrap().source_id, "r");
    }

    #[test]
    fn prefer_thai_outranks_equal_english_message() {
        let mut q = queue();
        let now = t0();
        let mut thai = message("th", "ข่าว", MessagePriority::Normal, now);
        thai.is_thai = true;
        q.insert(thai, now).unwrap();
        q.insert(message("en", "news", MessagePriority::Normal, now), now)
            .unwrap();

        let criteria = SelectionCriteria { prefer_thai: true, ..SelectionCriteria::default() };
        assert_eq!(q.select(&criteria, now).unwrap().source_id, "th");
    }

    #[test]
    fn capacity_evicts_least_urgent_oldest() {
        let mut q = DlsQueue::new(Duration::hours(1), 2);
        let now = t0();
        q.insert(message("old-low", "a", MessagePriority::Low, now), now)
            .unwrap();
        q.insert(
            message("new-high", "b", MessagePriority::High, now + Duration::seconds(1)),
            now + Duration::seconds(1),
        )
        .unwrap();
        q.insert(
            message("incoming", "c", MessagePriority::Normal, now + Duration::seconds(2)),
            now + Duration::seconds(2),
        )
        .unwrap();

        assert_eq!(q.len(), 2);
        assert!(q.remove("old-low").is_none());
        assert!(q.remove("new-high").is_some());
    }

    #[test]
    fn full_queue_of_emergencies_is_exhausted() {
        let mut q = DlsQueue::new(Duration::hours(1), 1);
        let now = t0();
        q.insert(message("e1", "alert one", MessagePriority::Emergency, now), now)
            .unwrap();
        let err = q
            .insert(message("e2", "alert two", MessagePriority::Emergency, now), now)
            .unwrap_err();
        assert!(matches!(err, PadError::ResourceExhausted));
    }

    #[test]
    fn statistics_reflect_queue_contents() {
        let mut q = queue();
        let now = t0();
        q.insert(message("a", "x", MessagePriority::Normal, now), now)
            .unwrap();
        q.insert(
            message("b", "y", MessagePriority::High, now + Duration::seconds(5)),
            now + Duration::seconds(5),
        )
        .unwrap();

        let stats = q.statistics();
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.priority_counts["normal"], 1);
        assert_eq!(stats.priority_counts["high"], 1);
        assert_eq!(stats.oldest_created_at, Some(now));
        assert_eq!(stats.newest_created_at, Some(now + Duration::seconds(5)));
    }
}
