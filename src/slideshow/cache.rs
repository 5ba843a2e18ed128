//! Bounded image carousel with deduplication, freshness decay and
//! score-driven eviction.

use super::quality::QualityMetrics;
use crate::codec::ImageFormat;
use crate::error::PadError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

/// One carousel slot: a re-encoded payload plus its selection state.
#[derive(Debug, Clone)]
pub struct ImageEntry {
    /// sha256 of the payload; unique within the cache.
    pub fingerprint: String,
    /// Original filename, advisory only.
    pub filename: String,
    pub payload: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub sharpness: f64,
    pub contrast: f64,
    pub brightness: f64,
    pub created_at: DateTime<Utc>,
    pub last_served: Option<DateTime<Utc>>,
    pub serve_count: u32,
    pub freshness: f64,
    pub optimized: bool,
}

impl ImageEntry {
    /// Freshness as of `now`: time decay with a 24-hour half-life from the
    /// last serve (creation for never-served entries), damped by use.
    pub fn freshness_at(&self, now: DateTime<Utc>) -> f64 {
        let reference = self.last_served.unwrap_or(self.created_at);
        let hours = (now - reference).num_seconds().max(0) as f64 / 3600.0;
        ((-hours / 24.0).exp() * (1.0 / (1.0 + 0.1 * self.serve_count as f64))).clamp(0.0, 1.0)
    }

    fn selection_score(&self) -> f64 {
        0.3 * self.sharpness
            + 0.2 * self.contrast
            + 0.1 * (1.0 - self.brightness)
            + 0.4 * self.freshness
    }

    fn eviction_score(&self) -> f64 {
        0.6 * self.freshness + 0.4 * ((self.sharpness + self.contrast) / 2.0)
    }
}

/// Aggregate cache state for status snapshots.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CarouselStatistics {
    pub entries: usize,
    pub optimized_entries: usize,
    pub duplicates_rejected: u64,
    pub evicted: u64,
    pub total_payload_bytes: usize,
    pub average_quality: f64,
}

pub struct Carousel {
    entries: Vec<ImageEntry>,
    index: HashMap<String, usize>,
    capacity: usize,
    dedup_enabled: bool,
    round_robin_cursor: usize,
    duplicates_rejected: u64,
    evicted: u64,
}

impl Carousel {
    pub fn new(capacity: usize, dedup_enabled: bool) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            capacity,
            dedup_enabled,
            round_robin_cursor: 0,
            duplicates_rejected: 0,
            evicted: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.index.contains_key(fingerprint)
    }

    pub fn insert(&mut self, entry: ImageEntry) -> Result<(), PadError> {
        if self.dedup_enabled && self.contains(&entry.fingerprint) {
            self.duplicates_rejected += 1;
            return Err(PadError::Duplicate);
        }
        if self.entries.len() >= self.capacity {
            self.evict_worst()?;
        }
        self.index.insert(entry.fingerprint.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn remove(&mut self, fingerprint: &str) -> Option<ImageEntry> {
        let position = self.index.remove(fingerprint)?;
        let entry = self.entries.remove(position);
        self.rebuild_index();
        Some(entry)
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, entry) in self.entries.iter().enumerate() {
            self.index.insert(entry.fingerprint.clone(), i);
        }
        if self.round_robin_cursor >= self.entries.len() {
            self.round_robin_cursor = 0;
        }
    }

    /// Evict the lowest-scoring entry. Fails with `ResourceExhausted` when
    /// nothing distinguishes the entries (all fully fresh with equal serve
    /// counts).
    fn evict_worst(&mut self) -> Result<(), PadError> {
        if self.entries.is_empty() {
            return Err(PadError::ResourceExhausted);
        }
        let all_saturated = self
            .entries
            .iter()
            .all(|e| e.freshness >= 1.0 && e.serve_count == self.entries[0].serve_count);
        if all_saturated {
            let scores: Vec<f64> = self.entries.iter().map(|e| e.eviction_score()).collect();
            let distinct = scores
                .iter()
                .any(|s| (s - scores[0]).abs() > f64::EPSILON);
            if !distinct {
                return Err(PadError::ResourceExhausted);
            }
        }

        let victim = self
            .entries
            .iter()
            .min_by(|a, b| {
                a.eviction_score()
                    .partial_cmp(&b.eviction_score())
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.fingerprint.cmp(&b.fingerprint))
            })
            .map(|e| e.fingerprint.clone())
            .ok_or(PadError::ResourceExhausted)?;
        debug!(fingerprint = %victim, "evicting carousel entry");
        self.remove(&victim);
        self.evicted += 1;
        Ok(())
    }

    /// Smart selection: argmax of the quality/freshness blend, ties broken
    /// by oldest last-served, then fingerprint order. Updates the winner's
    /// serve state and returns a snapshot.
    pub fn select_smart(&mut self, now: DateTime<Utc>) -> Result<ImageEntry, PadError> {
        let winner = self
            .entries
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.selection_score()
                    .partial_cmp(&b.selection_score())
                    .unwrap_or(std::cmp::Ordering::Equal)
                    // Oldest last-served wins ties; never-served is oldest.
                    .then_with(|| {
                        let a_served = a.last_served.unwrap_or(DateTime::<Utc>::MIN_UTC);
                        let b_served = b.last_served.unwrap_or(DateTime::<Utc>::MIN_UTC);
                        b_served.cmp(&a_served)
                    })
                    .then_with(|| b.fingerprint.cmp(&a.fingerprint))
            })
            .map(|(i, _)| i)
            .ok_or(PadError::NoContent)?;

        Ok(self.mark_served(winner, now))
    }

    /// Round-robin over insertion order.
    pub fn select_round_robin(&mut self, now: DateTime<Utc>) -> Result<ImageEntry, PadError> {
        if self.entries.is_empty() {
            return Err(PadError::NoContent);
        }
        let position = self.round_robin_cursor % self.entries.len();
        self.round_robin_cursor = (position + 1) % self.entries.len();
        Ok(self.mark_served(position, now))
    }

    fn mark_served(&mut self, position: usize, now: DateTime<Utc>) -> ImageEntry {
        let entry = &mut self.entries[position];
        // Freshness is recomputed from the serve state before this serve,
        // so a long-idle entry drops sharply once it finally airs.
        entry.serve_count += 1;
        entry.freshness = entry.freshness_at(now);
        entry.last_served = Some(now);
        entry.clone()
    }

    /// Recompute freshness for every entry; the background rescorer calls
    /// this on its tick.
    pub fn rescore(&mut self, now: DateTime<Utc>) {
        for entry in &mut self.entries {
            entry.freshness = entry.freshness_at(now);
        }
    }

    /// Capacity pressure in [0, 1].
    pub fn pressure(&self) -> f64 {
        if self.capacity == 0 {
            return 1.0;
        }
        self.entries.len() as f64 / self.capacity as f64
    }

    /// Evict down to the target share of capacity. Used by the rescorer
    /// under pressure.
    pub fn shrink_to_pressure(&mut self, target: f64) {
        let target_len = ((self.capacity as f64 * target) as usize).max(1);
        while self.entries.len() > target_len {
            if self.evict_worst().is_err() {
                break;
            }
        }
    }

    pub fn snapshot(&self) -> Vec<ImageEntry> {
        self.entries.clone()
    }

    pub fn statistics(&self) -> CarouselStatistics {
        let quality_sum: f64 = self
            .entries
            .iter()
            .map(|e| (e.sharpness + e.contrast) / 2.0)
            .sum();
        CarouselStatistics {
            entries: self.entries.len(),
            optimized_entries: self.entries.iter().filter(|e| e.optimized).count(),
            duplicates_rejected: self.duplicates_rejected,
            evicted: self.evicted,
            total_payload_bytes: self.entries.iter().map(|e| e.payload.len()).sum(),
            average_quality: if self.entries.is_empty() {
                0.0
            } else {
                quality_sum / self.entries.len() as f64
            },
        }
    }
}
