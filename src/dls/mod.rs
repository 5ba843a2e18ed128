//! Dynamic Label Segment engine: admission, prioritized selection and
//! charset-ready emission of short receiver texts.

pub mod models;
mod optimizer;
mod queue;
mod selector;

pub use models::{
    ContentSource, DlsMessage, MessageContext, MessagePriority, SelectionCriteria,
};
pub use optimizer::{LengthOptimizer, OptimizeResult, OptimizerRules};
pub use queue::QueueStatistics;
pub use selector::ContextSelector;

use crate::charset;
use crate::clock::Clock;
use crate::error::PadError;
use crate::validator::ContentValidator;
use chrono::{DateTime, Duration, Utc};
use queue::DlsQueue;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DlsConfig {
    /// Maximum label length in code points.
    pub max_len: usize,
    /// Window within which identical normalized content is suppressed.
    pub dedup_window_secs: u64,
    /// Applied when the caller does not set an expiry.
    pub default_ttl_hours: u64,
    /// Queue capacity bound.
    pub capacity: usize,
    /// Cadence of the expiry sweeper.
    pub sweep_interval_secs: u64,
}

impl Default for DlsConfig {
    fn default() -> Self {
        Self {
            max_len: 128,
            dedup_window_secs: 3600,
            default_ttl_hours: 24,
            capacity: 500,
            sweep_interval_secs: 30,
        }
    }
}

/// Admission request from the control surface or a fetcher.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub text: String,
    pub priority: MessagePriority,
    pub context: MessageContext,
    pub source: ContentSource,
    pub source_id: Option<String>,
    pub importance: f64,
    pub expires_at: Option<DateTime<Utc>>,
    /// 0 means unlimited.
    pub max_sends: u32,
    pub metadata: HashMap<String, String>,
}

impl NewMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            priority: MessagePriority::Normal,
            context: MessageContext::Automated,
            source: ContentSource::Manual,
            source_id: None,
            importance: 0.5,
            expires_at: None,
            max_sends: 0,
            metadata: HashMap::new(),
        }
    }

    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_source(mut self, source: ContentSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_source_id(mut self, id: impl Into<String>) -> Self {
        self.source_id = Some(id.into());
        self
    }
}

/// Counters and queue state for status snapshots.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DlsStatistics {
    pub current_context: MessageContext,
    pub processed: u64,
    pub optimized: u64,
    pub rejected: u64,
    #[serde(flatten)]
    pub queue: QueueStatistics,
}

pub struct DlsEngine {
    queue: Mutex<DlsQueue>,
    selector: Mutex<ContextSelector>,
    optimizer: LengthOptimizer,
    validator: Arc<ContentValidator>,
    clock: Arc<dyn Clock>,
    config: DlsConfig,
    processed: AtomicU64,
    optimized: AtomicU64,
    rejected: AtomicU64,
}

impl DlsEngine {
    pub fn new(
        config: DlsConfig,
        rules: OptimizerRules,
        validator: Arc<ContentValidator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let queue = DlsQueue::new(
            Duration::seconds(config.dedup_window_secs as i64),
            config.capacity,
        );
        Self {
            queue: Mutex::new(queue),
            selector: Mutex::new(ContextSelector::default()),
            optimizer: LengthOptimizer::new(rules),
            validator,
            clock,
            config,
            processed: AtomicU64::new(0),
            optimized: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &DlsConfig {
        &self.config
    }

    /// Admit a message: normalize, validate, deduplicate, length-optimize
    /// and insert. Returns the admitted message snapshot.
    pub fn add(&self, request: NewMessage) -> Result<DlsMessage, PadError> {
        let normalized = normalize_text(&request.text);
        if normalized.is_empty() {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(PadError::InvalidInput("empty text after normalization".into()));
        }

        let verdict = self.validator.validate(&normalized);
        if !verdict.is_appropriate {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(PadError::InvalidInput(format!(
                "text failed cultural validation: {}",
                verdict.warnings.join("; ")
            )));
        }

        let fingerprint = fingerprint_text(&normalized);

        let mut text = normalized;
        let mut metadata = request.metadata;
        if text.chars().count() > self.config.max_len {
            let result = self.optimizer.optimize(&text, self.config.max_len);
            metadata.insert("original_length".into(), result.original_len.to_string());
            metadata.insert(
                "compression_ratio".into(),
                format!("{:.3}", result.compression_ratio),
            );
            text = result.text;
            self.optimized.fetch_add(1, Ordering::Relaxed);
        }

        let now = self.clock.now();
        let expires_at = request
            .expires_at
            .unwrap_or_else(|| now + Duration::hours(self.config.default_ttl_hours as i64));
        let source_id = request
            .source_id
            .unwrap_or_else(|| format!("auto-{}", &fingerprint[7..23]));

        let msg = DlsMessage {
            source_id,
            fingerprint,
            is_thai: charset::contains_thai(&text),
            text,
            priority: request.priority,
            context: request.context,
            source: request.source,
            created_at: now,
            expires_at,
            last_sent: None,
            send_count: 0,
            max_sends: request.max_sends,
            importance: request.importance.clamp(0.0, 1.0),
            metadata,
        };

        let mut queue = self.queue.lock().unwrap();
        match queue.insert(msg.clone(), now) {
            Ok(()) => {
                self.processed.fetch_add(1, Ordering::Relaxed);
                debug!(source_id = %msg.source_id, priority = ?msg.priority, "admitted DLS message");
                Ok(msg)
            }
            Err(err) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    /// Select the next message under explicit criteria.
    pub fn next(&self, criteria: &SelectionCriteria) -> Result<DlsMessage, PadError> {
        let now = self.clock.now();
        self.queue.lock().unwrap().select(criteria, now)
    }

    /// Select the next message under the current context's criteria.
    pub fn next_for_current_context(&self) -> Result<DlsMessage, PadError> {
        let criteria = self.selector.lock().unwrap().criteria_for_current();
        self.next(&criteria)
    }

    /// Encode a selected message into a DLS segment: profile tag plus one
    /// byte per code point.
    pub fn encode_segment(&self, msg: &DlsMessage) -> Vec<u8> {
        charset::encode(&msg.text)
    }

    pub fn set_context(&self, context: MessageContext) {
        info!(?context, "DLS context changed");
        self.selector.lock().unwrap().set_current(context);
    }

    pub fn current_context(&self) -> MessageContext {
        self.selector.lock().unwrap().current()
    }

    pub fn criteria_for(&self, context: MessageContext) -> SelectionCriteria {
        self.selector.lock().unwrap().criteria_for(context)
    }

    pub fn remove(&self, source_id: &str) -> bool {
        self.queue.lock().unwrap().remove(source_id).is_some()
    }

    pub fn clear(&self) {
        self.queue.lock().unwrap().clear();
    }

    pub fn messages(&self) -> Vec<DlsMessage> {
        self.queue.lock().unwrap().snapshot()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Drop expired entries; called by the periodic sweeper.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let removed = self.queue.lock().unwrap().sweep(now);
        if removed > 0 {
            debug!(removed, "swept expired DLS messages");
        }
        removed
    }

    pub fn statistics(&self) -> DlsStatistics {
        DlsStatistics {
            current_context: self.current_context(),
            processed: self.processed.load(Ordering::Relaxed),
            optimized: self.optimized.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            queue: self.queue.lock().unwrap().statistics(),
        }
    }
}

/// Strip control characters and collapse whitespace runs.
fn normalize_text(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| !c.is_control()).collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fingerprint_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}
