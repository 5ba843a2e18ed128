//! Single control loop ticking both engines, honoring emergency overrides
//! and publishing status snapshots.
//!
//! Engine failures never stall the broadcast: a failed selection re-emits
//! the last known-good item and raises a status flag instead.

use crate::clock::Clock;
use crate::dls::{
    DlsEngine, DlsStatistics, MessageContext, MessagePriority, NewMessage, ContentSource,
};
use crate::error::PadError;
use crate::sink::PadSink;
use crate::slideshow::{CarouselStatistics, MotObject, SlideshowEngine};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// MOT rotation cadence.
    pub slideshow_interval_secs: u64,
    /// DLS cadence during normal operation.
    pub dls_interval_secs: u64,
    /// DLS cadence while the emergency flag is set.
    pub emergency_dls_interval_secs: u64,
    /// Emergency duration when the operator does not specify one.
    pub default_emergency_duration_secs: u64,
    /// Re-emit the last slide instead of rotating during an emergency.
    pub freeze_slideshow_on_emergency: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            slideshow_interval_secs: 10,
            dls_interval_secs: 12,
            emergency_dls_interval_secs: 3,
            default_emergency_duration_secs: 300,
            freeze_slideshow_on_emergency: true,
        }
    }
}

/// Point-in-time view of the whole service, published for the control
/// surface and the realtime channel.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub healthy: bool,
    pub emergency_active: bool,
    pub emergency_message: Option<String>,
    pub current_context: MessageContext,
    pub started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub current_dls_text: Option<String>,
    pub current_image_fingerprint: Option<String>,
    pub slideshow: CarouselStatistics,
    pub dls: DlsStatistics,
}

/// Realtime channel frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PadEvent {
    StatusUpdate(StatusSnapshot),
    EmergencyAlert { active: bool, message: Option<String> },
    ContentNotification { kind: String, id: String },
}

#[derive(Debug, Clone)]
struct EmergencyState {
    message: String,
    activated_at: DateTime<Utc>,
    duration: ChronoDuration,
    previous_context: MessageContext,
}

#[derive(Default)]
struct LoopState {
    emergency: Option<EmergencyState>,
    last_mot: Option<MotObject>,
    last_dls_segment: Option<Vec<u8>>,
    last_dls_text: Option<String>,
    last_image_fingerprint: Option<String>,
    degraded: bool,
}

pub struct Coordinator {
    slideshow: Arc<SlideshowEngine>,
    dls: Arc<DlsEngine>,
    sink: Arc<dyn PadSink>,
    clock: Arc<dyn Clock>,
    config: CoordinatorConfig,
    state: Mutex<LoopState>,
    started_at: DateTime<Utc>,
    events: broadcast::Sender<PadEvent>,
}

impl Coordinator {
    pub fn new(
        config: CoordinatorConfig,
        slideshow: Arc<SlideshowEngine>,
        dls: Arc<DlsEngine>,
        sink: Arc<dyn PadSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        let started_at = clock.now();
        Self {
            slideshow,
            dls,
            sink,
            clock,
            config,
            state: Mutex::new(LoopState::default()),
            started_at,
            events,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PadEvent> {
        self.events.subscribe()
    }

    pub fn publish(&self, event: PadEvent) {
        // Lagging or absent subscribers are not an error.
        let _ = self.events.send(event);
    }

    /// Engage the emergency override: force the Emergency context and
    /// inject the alert message with a bounded send budget.
    pub fn set_emergency(&self, message: &str, duration_secs: Option<u64>) {
        let now = self.clock.now();
        let duration = ChronoDuration::seconds(
            duration_secs.unwrap_or(self.config.default_emergency_duration_secs) as i64,
        );

        {
            let mut state = self.state.lock().unwrap();
            // Re-arming an active emergency keeps the original context to
            // restore on clear.
            let previous = state
                .emergency
                .as_ref()
                .map(|e| e.previous_context)
                .unwrap_or_else(|| self.dls.current_context());
            state.emergency = Some(EmergencyState {
                message: message.to_string(),
                activated_at: now,
                duration,
                previous_context: previous,
            });
        }

        self.dls.set_context(MessageContext::Emergency);
        let request = NewMessage {
            text: message.to_string(),
            priority: MessagePriority::Emergency,
            context: MessageContext::Emergency,
            source: ContentSource::EmergencySys,
            source_id: Some("emergency-override".to_string()),
            importance: 1.0,
            expires_at: Some(now + duration),
            max_sends: 10,
            metadata: Default::default(),
        };
        match self.dls.add(request) {
            Ok(_) | Err(PadError::Duplicate) => {}
            Err(err) => warn!(error = %err, "failed to inject emergency message"),
        }

        info!(message, ?duration, "emergency override engaged");
        self.publish(PadEvent::EmergencyAlert {
            active: true,
            message: Some(message.to_string()),
        });
    }

    pub fn clear_emergency(&self) {
        let previous = {
            let mut state = self.state.lock().unwrap();
            state.emergency.take().map(|e| e.previous_context)
        };
        if let Some(context) = previous {
            self.dls.set_context(context);
            self.dls.remove("emergency-override");
            info!("emergency override cleared");
            self.publish(PadEvent::EmergencyAlert { active: false, message: None });
        }
    }

    pub fn emergency_active(&self) -> bool {
        self.expire_emergency();
        self.state.lock().unwrap().emergency.is_some()
    }

    /// Auto-clear once the configured duration elapses.
    fn expire_emergency(&self) {
        let expired = {
            let state = self.state.lock().unwrap();
            state
                .emergency
                .as_ref()
                .is_some_and(|e| self.clock.now() - e.activated_at >= e.duration)
        };
        if expired {
            self.clear_emergency();
        }
    }

    pub fn healthy(&self) -> bool {
        !self.state.lock().unwrap().degraded
    }

    /// One slideshow cadence step: select, frame, emit. Falls back to the
    /// previous object when the carousel is empty or degraded.
    pub async fn tick_slideshow(&self) {
        self.expire_emergency();

        let frozen = self.config.freeze_slideshow_on_emergency
            && self.state.lock().unwrap().emergency.is_some();

        let object = if frozen {
            self.state.lock().unwrap().last_mot.clone()
        } else {
            match self.slideshow.next_image() {
                Ok(entry) => {
                    let object = self.slideshow.frame(&entry);
                    let mut state = self.state.lock().unwrap();
                    state.last_mot = Some(object.clone());
                    state.last_image_fingerprint = Some(entry.fingerprint.clone());
                    Some(object)
                }
                Err(PadError::NoContent) => self.state.lock().unwrap().last_mot.clone(),
                Err(PadError::Internal(reason)) => {
                    error!(reason, "slideshow engine degraded");
                    self.state.lock().unwrap().degraded = true;
                    self.state.lock().unwrap().last_mot.clone()
                }
                Err(err) => {
                    warn!(error = %err, "slideshow selection failed");
                    self.state.lock().unwrap().last_mot.clone()
                }
            }
        };

        if let Some(object) = object {
            if let Err(err) = self.sink.emit_mot(&object).await {
                warn!(error = %err, "PAD sink rejected MOT object");
            }
        }
    }

    /// One DLS cadence step: select under the current context's criteria,
    /// encode, emit. Falls back to the previous segment on `NoContent`.
    pub async fn tick_dls(&self) {
        self.expire_emergency();

        let segment = match self.dls.next_for_current_context() {
            Ok(msg) => {
                let segment = self.dls.encode_segment(&msg);
                let mut state = self.state.lock().unwrap();
                state.last_dls_segment = Some(segment.clone());
                state.last_dls_text = Some(msg.text.clone());
                Some(segment)
            }
            Err(PadError::NoContent) => self.state.lock().unwrap().last_dls_segment.clone(),
            Err(PadError::Internal(reason)) => {
                error!(reason, "DLS engine degraded");
                self.state.lock().unwrap().degraded = true;
                self.state.lock().unwrap().last_dls_segment.clone()
            }
            Err(err) => {
                warn!(error = %err, "DLS selection failed");
                self.state.lock().unwrap().last_dls_segment.clone()
            }
        };

        if let Some(segment) = segment {
            if let Err(err) = self.sink.emit_dls(&segment).await {
                warn!(error = %err, "PAD sink rejected DLS segment");
            }
        }

        self.publish(PadEvent::StatusUpdate(self.status()));
    }

    pub fn status(&self) -> StatusSnapshot {
        self.expire_emergency();
        let state = self.state.lock().unwrap();
        StatusSnapshot {
            running: true,
            healthy: !state.degraded,
            emergency_active: state.emergency.is_some(),
            emergency_message: state.emergency.as_ref().map(|e| e.message.clone()),
            current_context: self.dls.current_context(),
            started_at: self.started_at,
            last_updated: self.clock.now(),
            current_dls_text: state.last_dls_text.clone(),
            current_image_fingerprint: state.last_image_fingerprint.clone(),
            slideshow: self.slideshow.statistics(),
            dls: self.dls.statistics(),
        }
    }

    fn dls_interval(&self) -> Duration {
        let secs = if self.state.lock().unwrap().emergency.is_some() {
            self.config.emergency_dls_interval_secs
        } else {
            self.config.dls_interval_secs
        };
        Duration::from_secs(secs.max(1))
    }

    /// Drive the tick loop and the engine maintenance tasks until
    /// cancelled. Maintenance tasks are joined before returning.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            slideshow_interval = self.config.slideshow_interval_secs,
            dls_interval = self.config.dls_interval_secs,
            "coordinator starting"
        );

        let rescorer = {
            let engine = Arc::clone(&self.slideshow);
            let cancel = cancel.child_token();
            let period = Duration::from_secs(engine.config().rescore_interval_secs.max(1));
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(period);
                tick.tick().await;
                loop {
                    tokio::select! {
                        _ = tick.tick() => engine.rescore(),
                        _ = cancel.cancelled() => break,
                    }
                }
            })
        };

        let sweeper = {
            let engine = Arc::clone(&self.dls);
            let cancel = cancel.child_token();
            let period = Duration::from_secs(engine.config().sweep_interval_secs.max(1));
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(period);
                tick.tick().await;
                loop {
                    tokio::select! {
                        _ = tick.tick() => {
                            engine.sweep();
                        }
                        _ = cancel.cancelled() => break,
                    }
                }
            })
        };

        let mut slideshow_tick =
            tokio::time::interval(Duration::from_secs(self.config.slideshow_interval_secs.max(1)));
        let mut next_dls = tokio::time::Instant::now() + self.dls_interval();

        loop {
            tokio::select! {
                _ = slideshow_tick.tick() => {
                    self.tick_slideshow().await;
                }
                _ = tokio::time::sleep_until(next_dls) => {
                    self.tick_dls().await;
                    next_dls = tokio::time::Instant::now() + self.dls_interval();
                }
                _ = cancel.cancelled() => {
                    break;
                }
            }
        }

        let _ = rescorer.await;
        let _ = sweeper.await;
        info!("coordinator stopped");
    }
}
