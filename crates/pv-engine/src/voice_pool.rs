//! VoicePool: binds (channel, note) pairs to a fixed set of voice indices.
//!
//! Voices are partitioned between a free queue and a used sequence ordered by
//! allocation recency, oldest first. Allocation prefers retriggering the
//! voice already bound to the note, then a free voice, then steals the oldest
//! used voice. A voice whose gate has not yet been observed high is not freed
//! on release but queued until the next block boundary so zero-length notes
//! still sound for one block.

use heapless::{Deque, Vec};
use pv_ir::{NUM_CHANNELS, NUM_NOTES};
use tracing::trace;

/// Identifier for a voice slot in the pool.
pub type VoiceId = usize;

/// Maximum number of voices an engine instance can hold.
pub const MAX_VOICES: usize = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceState {
    Free,
    /// Bound to a note.
    Active,
    /// Released before its gate was observed high; freed by the first
    /// `commit_queued` after it has rendered.
    QueuedOff,
}

/// Bookkeeping for one voice slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Voice {
    pub state: VoiceState,
    pub channel: u8,
    /// Bound note. `None` once released, including while queued.
    pub note: Option<u8>,
    pub velocity: u8,
    /// Gate value the DSP held after the last block it computed.
    pub last_gate: f32,
}

impl Voice {
    const IDLE: Self = Self {
        state: VoiceState::Free,
        channel: 0,
        note: None,
        velocity: 0,
        last_gate: 0.0,
    };
}

/// How `allocate` obtained its voice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Allocation {
    /// The voice already bound to this note.
    Retrigger(VoiceId),
    /// A previously free voice.
    Fresh(VoiceId),
    /// The oldest used voice, taken from its previous note.
    Stolen {
        voice: VoiceId,
        channel: u8,
        note: Option<u8>,
    },
}

impl Allocation {
    pub fn voice(&self) -> VoiceId {
        match *self {
            Self::Retrigger(v) | Self::Fresh(v) => v,
            Self::Stolen { voice, .. } => voice,
        }
    }
}

/// How `release` disposed of a voice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    /// Returned to the free queue; its gate should be lowered now.
    Freed(VoiceId),
    /// Deferred until the voice has rendered one block.
    Queued(VoiceId),
}

/// Fixed-capacity voice allocator.
pub struct VoicePool {
    voices: [Voice; MAX_VOICES],
    notes: [[Option<u8>; NUM_NOTES]; NUM_CHANNELS],
    free: Deque<VoiceId, MAX_VOICES>,
    used: Vec<VoiceId, MAX_VOICES>,
    queued: Vec<VoiceId, MAX_VOICES>,
    capacity: usize,
    active: usize,
    has_gate: bool,
}

impl VoicePool {
    /// Create a pool of `capacity` voices, all active and free.
    ///
    /// Without a gate control there is nothing to observe, so releases are
    /// never deferred.
    ///
    /// # Panics
    /// If `capacity` exceeds [`MAX_VOICES`].
    pub fn new(capacity: usize, has_gate: bool) -> Self {
        assert!(capacity <= MAX_VOICES, "voice pool capacity {capacity} exceeds {MAX_VOICES}");
        let mut pool = Self {
            voices: [Voice::IDLE; MAX_VOICES],
            notes: [[None; NUM_NOTES]; NUM_CHANNELS],
            free: Deque::new(),
            used: Vec::new(),
            queued: Vec::new(),
            capacity,
            active: capacity,
            has_gate,
        };
        pool.reset_lists();
        pool
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of voices taking part in allocation.
    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn voice(&self, id: VoiceId) -> &Voice {
        &self.voices[id]
    }

    /// Used voices, oldest first. Includes queued voices.
    pub fn used(&self) -> &[VoiceId] {
        &self.used
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    pub fn queued(&self) -> &[VoiceId] {
        &self.queued
    }

    /// Voice bound to `(channel, note)`.
    pub fn lookup(&self, channel: u8, note: u8) -> Option<VoiceId> {
        self.notes
            .get(channel as usize)?
            .get(note as usize)
            .copied()
            .flatten()
            .map(VoiceId::from)
    }

    /// Used voices on `channel`, oldest first.
    pub fn used_on_channel(&self, channel: u8) -> impl Iterator<Item = VoiceId> + '_ {
        self.used
            .iter()
            .copied()
            .filter(move |&v| self.voices[v].channel == channel)
    }

    pub fn set_last_gate(&mut self, id: VoiceId, gate: f32) {
        self.voices[id].last_gate = gate;
    }

    /// Bind `(channel, note)` to a voice.
    ///
    /// # Panics
    /// If there are no active voices.
    pub fn allocate(&mut self, channel: u8, note: u8, velocity: u8) -> Allocation {
        let (ch, n) = (channel as usize, note as usize);

        if let Some(v) = self.notes[ch][n].map(VoiceId::from) {
            self.used.retain(|&u| u != v);
            self.push_used(v);
            self.voices[v].velocity = velocity;
            trace!(voice = v, channel, note, "retrigger");
            return Allocation::Retrigger(v);
        }

        let allocation = if let Some(v) = self.free.pop_front() {
            Allocation::Fresh(v)
        } else {
            if self.used.is_empty() {
                panic!("voice pool: no used voice to steal");
            }
            let v = self.used.remove(0);
            let prev = self.voices[v];
            if let Some(prev_note) = prev.note {
                self.unbind(prev.channel, prev_note, v);
            }
            self.queued.retain(|&q| q != v);
            trace!(voice = v, channel, note, prev_channel = prev.channel, prev_note = ?prev.note, "steal");
            Allocation::Stolen {
                voice: v,
                channel: prev.channel,
                note: prev.note,
            }
        };

        let v = allocation.voice();
        self.voices[v] = Voice {
            state: VoiceState::Active,
            channel,
            note: Some(note),
            velocity,
            last_gate: self.voices[v].last_gate,
        };
        self.notes[ch][n] = Some(v as u8);
        self.push_used(v);
        trace!(voice = v, channel, note, velocity, "allocate");
        allocation
    }

    /// Unbind `(channel, note)`. Returns `None` if nothing was bound.
    pub fn release(&mut self, channel: u8, note: u8) -> Option<Release> {
        let v = self.lookup(channel, note)?;
        self.unbind(channel, note, v);
        self.voices[v].note = None;

        if self.has_gate && self.voices[v].last_gate == 0.0 {
            self.voices[v].state = VoiceState::QueuedOff;
            if self.queued.push(v).is_err() {
                panic!("voice pool: queued list overflow");
            }
            trace!(voice = v, channel, note, "release queued");
            return Some(Release::Queued(v));
        }

        self.free_voice(v);
        trace!(voice = v, channel, note, "release");
        Some(Release::Freed(v))
    }

    /// Free every queued voice, calling `gate_off` for each, and clear the
    /// queued list.
    pub fn commit_queued(&mut self, mut gate_off: impl FnMut(VoiceId)) {
        for i in 0..self.queued.len() {
            let v = self.queued[i];
            self.free_voice(v);
            gate_off(v);
        }
        self.queued.clear();
    }

    /// Free every used voice, calling `gate_off` for each, and restore the
    /// initial free order.
    pub fn all_notes_off(&mut self, mut gate_off: impl FnMut(VoiceId)) {
        for &v in self.used.iter() {
            gate_off(v);
        }
        self.reset_lists();
    }

    /// Free every used voice on `channel`, calling `gate_off` for each.
    pub fn all_notes_off_channel(&mut self, channel: u8, mut gate_off: impl FnMut(VoiceId)) {
        let mut i = 0;
        while i < self.used.len() {
            let v = self.used[i];
            if self.voices[v].channel != channel {
                i += 1;
                continue;
            }
            if let Some(note) = self.voices[v].note {
                self.unbind(channel, note, v);
            }
            self.queued.retain(|&q| q != v);
            self.free_voice(v);
            gate_off(v);
        }
    }

    /// Change how many voices take part in allocation. Every used voice is
    /// freed first.
    ///
    /// # Panics
    /// If `count` exceeds the pool capacity.
    pub fn set_active_count(&mut self, count: usize, gate_off: impl FnMut(VoiceId)) {
        assert!(count <= self.capacity, "active voice count {count} exceeds capacity {}", self.capacity);
        self.all_notes_off(gate_off);
        self.active = count;
        self.reset_lists();
        trace!(count, "active voices");
    }

    fn reset_lists(&mut self) {
        self.free.clear();
        self.used.clear();
        self.queued.clear();
        for row in &mut self.notes {
            row.fill(None);
        }
        for (v, voice) in self.voices.iter_mut().enumerate() {
            *voice = Voice {
                last_gate: voice.last_gate,
                ..Voice::IDLE
            };
            if v < self.active && self.free.push_back(v).is_err() {
                panic!("voice pool: free list overflow");
            }
        }
    }

    /// Clear a note binding if it still refers to `v`.
    fn unbind(&mut self, channel: u8, note: u8, v: VoiceId) {
        let slot = &mut self.notes[channel as usize][note as usize];
        if *slot == Some(v as u8) {
            *slot = None;
        }
    }

    fn free_voice(&mut self, v: VoiceId) {
        self.used.retain(|&u| u != v);
        self.voices[v].state = VoiceState::Free;
        self.voices[v].note = None;
        if self.free.push_back(v).is_err() {
            panic!("voice pool: free list overflow");
        }
    }

    fn push_used(&mut self, v: VoiceId) {
        if self.used.push(v).is_err() {
            panic!("voice pool: used list overflow");
        }
    }
}
