//! Time-ordered voice releases.
//!
//! Every triggered voice books a release at the sample where its envelope
//! tail ends. The queue is owned by the audio graph, so dropping or clearing
//! it cancels everything still pending.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Identifier of a sounding voice.
pub type VoiceId = u64;

/// Min-heap of `(due_sample, voice)` releases.
#[derive(Debug, Default, Clone)]
pub struct ReleaseSchedule {
    pending: BinaryHeap<Reverse<(u64, VoiceId)>>,
}

impl ReleaseSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Book a release of `voice` at sample `due`.
    pub fn schedule(&mut self, due: u64, voice: VoiceId) {
        self.pending.push(Reverse((due, voice)));
    }

    /// Sample of the earliest pending release.
    pub fn next_due(&self) -> Option<u64> {
        self.pending.peek().map(|Reverse((due, _))| *due)
    }

    /// Pop one release whose due time is at or before `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<VoiceId> {
        match self.next_due() {
            Some(due) if due <= now => self.pending.pop().map(|Reverse((_, voice))| voice),
            _ => None,
        }
    }

    /// Drop every pending release.
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
