//! Track-keyed playback queue.
//!
//! Every chunk belongs to a track (the conversation item it was streamed
//! for). Tracks play in arrival order and never interleave. Interrupting
//! reports how far the front track got, in session-rate samples, and drops
//! any chunk that later arrives for a track that was still queued.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Where a track was cut off by an interrupt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackOffset {
    pub track_id: String,
    /// Samples of the track that were played, at the session rate
    pub offset: u64,
    /// `offset` expressed in seconds
    pub current_time: f64,
}

#[derive(Debug)]
struct Segment {
    track_id: String,
    samples: VecDeque<f32>,
}

#[derive(Debug)]
pub struct TrackQueue {
    segments: VecDeque<Segment>,
    current: Option<String>,
    /// Played samples per track; only tracks still queued or playing
    played: HashMap<String, u64>,
    /// Tracks cut off by the latest interrupt
    interrupted: HashSet<String>,
    source_rate: u32,
    playback_rate: u32,
}

impl TrackQueue {
    /// `source_rate` is the rate offsets are reported in; `playback_rate`
    /// the rate of the samples held in the queue
    pub fn new(source_rate: u32, playback_rate: u32) -> Self {
        Self {
            segments: VecDeque::new(),
            current: None,
            played: HashMap::new(),
            interrupted: HashSet::new(),
            source_rate: source_rate.max(1),
            playback_rate: playback_rate.max(1),
        }
    }

    /// Queue samples for `track_id`. Returns `false` if the track was
    /// interrupted and the samples were dropped.
    pub fn enqueue(&mut self, track_id: &str, samples: &[f32]) -> bool {
        if self.interrupted.contains(track_id) {
            return false;
        }
        if samples.is_empty() {
            return true;
        }

        match self.segments.back_mut() {
            Some(last) if last.track_id == track_id => last.samples.extend(samples.iter().copied()),
            _ => self.segments.push_back(Segment {
                track_id: track_id.to_string(),
                samples: samples.iter().copied().collect(),
            }),
        }
        true
    }

    /// Fill `out` with queued samples; the remainder is zeroed. Returns the
    /// number of real samples written.
    pub fn pull(&mut self, out: &mut [f32]) -> usize {
        let mut written = 0;
        while written < out.len() {
            let Some(segment) = self.segments.front_mut() else {
                break;
            };

            if self.current.as_deref() != Some(segment.track_id.as_str()) {
                self.current = Some(segment.track_id.clone());
            }

            let take = segment.samples.len().min(out.len() - written);
            for (slot, sample) in out[written..written + take]
                .iter_mut()
                .zip(segment.samples.drain(..take))
            {
                *slot = sample;
            }
            written += take;
            *self.played.entry(segment.track_id.clone()).or_insert(0) += take as u64;

            if segment.samples.is_empty() {
                self.segments.pop_front();
            }
        }

        if written > 0 && self.segments.is_empty() {
            self.current = None;
            self.played.clear();
        }

        out[written..].fill(0.0);
        written
    }

    /// Stop playback and clear everything queued.
    ///
    /// Reports the front track, with offset 0 if none of it was played yet.
    /// Returns `None` when nothing is queued.
    pub fn interrupt(&mut self) -> Option<TrackOffset> {
        let track_id = self.segments.front()?.track_id.clone();
        let offset = self.offset_of(&track_id);

        self.interrupted = self.segments.drain(..).map(|s| s.track_id).collect();
        self.current = None;
        self.played.clear();

        Some(TrackOffset {
            current_time: offset as f64 / self.source_rate as f64,
            track_id,
            offset,
        })
    }

    /// Played samples of `track_id`, at the source rate
    pub fn offset_of(&self, track_id: &str) -> u64 {
        let played = self.played.get(track_id).copied().unwrap_or(0);
        played * self.source_rate as u64 / self.playback_rate as u64
    }

    pub fn current_track(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn queued_samples(&self) -> usize {
        self.segments.iter().map(|s| s.samples.len()).sum()
    }

    pub fn is_idle(&self) -> bool {
        self.segments.is_empty()
    }
}
