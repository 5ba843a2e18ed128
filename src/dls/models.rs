//! DLS message model and selection criteria.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Message priority, ordered by urgency. Emergency outranks everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePriority {
    Emergency,
    High,
    Normal,
    Low,
    Background,
}

impl MessagePriority {
    /// Numeric urgency rank: 0 = Emergency .. 4 = Background.
    pub fn rank(self) -> u8 {
        match self {
            MessagePriority::Emergency => 0,
            MessagePriority::High => 1,
            MessagePriority::Normal => 2,
            MessagePriority::Low => 3,
            MessagePriority::Background => 4,
        }
    }

    /// True when `self` is at least as urgent as `floor` and no more urgent
    /// than `ceiling`.
    pub fn is_within(self, floor: MessagePriority, ceiling: MessagePriority) -> bool {
        self.rank() <= floor.rank() && self.rank() >= ceiling.rank()
    }
}

/// Programme context the transmission is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageContext {
    LiveShow,
    Automated,
    News,
    Music,
    Talk,
    Commercial,
    Emergency,
    Maintenance,
    OffAir,
}

/// Where a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    Manual,
    Rss,
    Social,
    Metadata,
    Weather,
    Traffic,
    News,
    Automation,
    EmergencySys,
}

/// A message admitted to the queue.
#[derive(Debug, Clone, Serialize)]
pub struct DlsMessage {
    pub source_id: String,
    /// sha256 of the normalized text, used for deduplication.
    pub fingerprint: String,
    pub text: String,
    pub is_thai: bool,
    pub priority: MessagePriority,
    pub context: MessageContext,
    pub source: ContentSource,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_sent: Option<DateTime<Utc>>,
    pub send_count: u32,
    /// 0 means unlimited.
    pub max_sends: u32,
    pub importance: f64,
    pub metadata: HashMap<String, String>,
}

impl DlsMessage {
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_seconds().max(0) as f64 / 3600.0
    }
}

/// Filter and scoring parameters for one selection call.
#[derive(Clone)]
pub struct SelectionCriteria {
    pub preferred_context: MessageContext,
    /// Empty means every source is allowed.
    pub allowed_sources: Vec<ContentSource>,
    pub blocked_sources: Vec<ContentSource>,
    /// Least urgent priority still eligible.
    pub min_priority: MessagePriority,
    /// Most urgent priority still eligible.
    pub max_priority: MessagePriority,
    pub max_age: Duration,
    pub allow_repeats: bool,
    pub max_repeat_count: u32,
    pub min_repeat_interval: Duration,
    pub max_text_length: usize,
    pub prefer_thai: bool,
    /// Overrides the default scoring function when set.
    pub scoring: Option<ScoringFn>,
}

pub type ScoringFn = std::sync::Arc<dyn Fn(&DlsMessage, DateTime<Utc>) -> f64 + Send + Sync>;

impl std::fmt::Debug for SelectionCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionCriteria")
            .field("preferred_context", &self.preferred_context)
            .field("min_priority", &self.min_priority)
            .field("max_priority", &self.max_priority)
            .field("max_age", &self.max_age)
            .field("allow_repeats", &self.allow_repeats)
            .field("max_repeat_count", &self.max_repeat_count)
            .field("prefer_thai", &self.prefer_thai)
            .field("scoring", &self.scoring.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self {
            preferred_context: MessageContext::Automated,
            allowed_sources: Vec::new(),
            blocked_sources: Vec::new(),
            min_priority: MessagePriority::Background,
            max_priority: MessagePriority::Emergency,
            max_age: Duration::hours(1),
            allow_repeats: true,
            max_repeat_count: 3,
            min_repeat_interval: Duration::minutes(5),
            max_text_length: 128,
            prefer_thai: false,
            scoring: None,
        }
    }
}

/// Default selection score: priority 40 %, importance 30 %, recency 20 %
/// with a 24-hour half-life, repeat penalty 10 %.
pub fn default_score(msg: &DlsMessage, now: DateTime<Utc>) -> f64 {
    let priority = (4 - msg.priority.rank()) as f64 * 0.1;
    let importance = msg.importance * 0.3;
    let recency = (-msg.age_hours(now) / 24.0).exp() * 0.2;
    let repeat_penalty = 1.0 / (1.0 + msg.send_count as f64 * 0.5) * 0.1;
    priority + importance + recency + repeat_penalty
}
