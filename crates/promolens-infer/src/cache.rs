//! Bounded, expiring cache of model embeddings keyed by query text.
//!
//! Similarity lookups tend to repeat the same query text. Only model output
//! is cached: the fallback is cheaper to recompute than to look up.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use ndarray::Array1;
use parking_lot::Mutex;

use promolens_core::EmbeddingConfig;

struct Slot {
    vector: Array1<f32>,
    stored: Instant,
    /// Logical clock value of the last read or write.
    used: u64,
}

#[derive(Default)]
struct Slots {
    by_text: HashMap<String, Slot>,
    clock: u64,
}

impl Slots {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_stalest(&mut self) {
        let stalest = self
            .by_text
            .iter()
            .min_by_key(|(_, slot)| slot.used)
            .map(|(text, _)| text.clone());
        if let Some(text) = stalest {
            self.by_text.remove(&text);
        }
    }
}

pub struct QueryCache {
    slots: Mutex<Slots>,
    capacity: usize,
    ttl: Duration,
}

impl QueryCache {
    /// A zero `capacity` disables caching.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            capacity,
            ttl,
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.cache_size, Duration::from_secs(config.cache_ttl_secs))
    }

    /// Cached vector for `text`. Expired entries are dropped on sight.
    pub fn get(&self, text: &str) -> Option<Array1<f32>> {
        let mut slots = self.slots.lock();
        let now = slots.tick();
        let slot = slots.by_text.get_mut(text)?;
        if slot.stored.elapsed() >= self.ttl {
            slots.by_text.remove(text);
            return None;
        }
        slot.used = now;
        Some(slot.vector.clone())
    }

    pub fn put(&self, text: String, vector: Array1<f32>) {
        if self.capacity == 0 {
            return;
        }
        let mut slots = self.slots.lock();
        let used = slots.tick();
        if !slots.by_text.contains_key(&text) && slots.by_text.len() >= self.capacity {
            slots.evict_stalest();
        }
        slots.by_text.insert(
            text,
            Slot {
                vector,
                stored: Instant::now(),
                used,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.slots.lock().by_text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots.lock().by_text.clear();
    }
}
