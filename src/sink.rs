//! PAD sink interface.
//!
//! The frame multiplexer that packetizes MOT objects and DLS segments into
//! X-PAD lives outside this process; the coordinator only hands it framed
//! bytes. The collector implementation doubles as the test double and as
//! the source of "currently on air" data for the control surface.

use crate::slideshow::MotObject;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::debug;

#[async_trait]
pub trait PadSink: Send + Sync {
    async fn emit_mot(&self, object: &MotObject) -> Result<()>;
    async fn emit_dls(&self, segment: &[u8]) -> Result<()>;
}

/// Discards emissions, logging at debug level.
#[derive(Debug, Default)]
pub struct NullSink;

#[async_trait]
impl PadSink for NullSink {
    async fn emit_mot(&self, object: &MotObject) -> Result<()> {
        debug!(
            transport_id = object.transport_id,
            bytes = object.bytes.len(),
            "discarding MOT object"
        );
        Ok(())
    }

    async fn emit_dls(&self, segment: &[u8]) -> Result<()> {
        debug!(bytes = segment.len(), "discarding DLS segment");
        Ok(())
    }
}

/// Keeps the most recent emissions in memory.
pub struct CollectorSink {
    limit: usize,
    mot: Mutex<VecDeque<MotObject>>,
    dls: Mutex<VecDeque<Vec<u8>>>,
}

impl CollectorSink {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            mot: Mutex::new(VecDeque::new()),
            dls: Mutex::new(VecDeque::new()),
        }
    }

    pub fn mot_objects(&self) -> Vec<MotObject> {
        self.mot.lock().unwrap().iter().cloned().collect()
    }

    pub fn dls_segments(&self) -> Vec<Vec<u8>> {
        self.dls.lock().unwrap().iter().cloned().collect()
    }

    pub fn last_dls(&self) -> Option<Vec<u8>> {
        self.dls.lock().unwrap().back().cloned()
    }
}

#[async_trait]
impl PadSink for CollectorSink {
    async fn emit_mot(&self, object: &MotObject) -> Result<()> {
        let mut queue = self.mot.lock().unwrap();
        if queue.len() == self.limit {
            queue.pop_front();
        }
        queue.push_back(object.clone());
        Ok(())
    }

    async fn emit_dls(&self, segment: &[u8]) -> Result<()> {
        let mut queue = self.dls.lock().unwrap();
        if queue.len() == self.limit {
            queue.pop_front();
        }
        queue.push_back(segment.to_vec());
        Ok(())
    }
}
