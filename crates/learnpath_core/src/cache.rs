use std::collections::{HashMap, VecDeque};

use crate::TtsAudio;

pub const DEFAULT_AUDIO_CACHE_CAPACITY: usize = 64;

/// Content-key cache from the exact synthesized text to its audio.
///
/// Bounded: once `capacity` entries exist, inserting a new key evicts the
/// oldest insertion. A capacity of zero disables caching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioCache {
    capacity: usize,
    entries: HashMap<String, TtsAudio>,
    order: VecDeque<String>,
}

impl Default for AudioCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_AUDIO_CACHE_CAPACITY)
    }
}

impl AudioCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, text: &str) -> Option<&TtsAudio> {
        self.entries.get(text)
    }

    pub fn insert(&mut self, text: String, audio: TtsAudio) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(text.clone(), audio).is_some() {
            // Key already present: value refreshed, position unchanged.
            return;
        }
        self.order.push_back(text);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
