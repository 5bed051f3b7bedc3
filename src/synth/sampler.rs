// Sample player - Resampling playback of one waveform
//
// Reads a shared waveform at a fractional rate with linear interpolation and
// handles forward / ping-pong looping. Loop points are taken from the
// trigger-time snapshot and already clamped to the waveform.

use crate::model::sample::{LoopType, PlaybackMode, SampleSnapshot, Waveform};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
struct LoopRegion {
    start: f64,
    end: f64,
    ping_pong: bool,
}

impl LoopRegion {
    fn from_snapshot(snapshot: &SampleSnapshot) -> Option<Self> {
        if snapshot.playback_mode == PlaybackMode::OneShot {
            return None;
        }
        let ping_pong = match snapshot.loop_type {
            LoopType::None => return None,
            LoopType::Forward => false,
            LoopType::PingPong => true,
        };
        let length = snapshot.loop_end.saturating_sub(snapshot.loop_start);
        if length == 0 {
            return None;
        }
        Some(Self {
            start: snapshot.loop_start as f64,
            end: snapshot.loop_end as f64,
            // A one-frame ping-pong loop has nowhere to turn around
            ping_pong: ping_pong && length >= 2,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SamplePlayer {
    waveform: Option<Arc<Waveform>>,
    frames: usize,
    position: f64,
    step: f64,
    backwards: bool,
    region: Option<LoopRegion>,
    /// Looping stops at release (sustain loop)
    loop_until_release: bool,
    looping: bool,
    playing: bool,
}

impl SamplePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start playback of `snapshot` from its first frame
    pub fn start(&mut self, snapshot: &SampleSnapshot, step: f64) {
        self.frames = snapshot.waveform.frame_count();
        self.waveform = Some(Arc::clone(&snapshot.waveform));
        self.position = 0.0;
        self.set_step(step);
        self.backwards = false;
        self.region = LoopRegion::from_snapshot(snapshot);
        self.loop_until_release = snapshot.playback_mode == PlaybackMode::SustainLoop;
        self.looping = self.region.is_some();
        self.playing = self.frames > 0;
    }

    /// Frames of waveform advanced per output frame
    pub fn set_step(&mut self, step: f64) {
        self.step = if step.is_finite() && step >= 0.0 { step } else { 0.0 };
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Note released: a sustain loop lets go and plays out to the end
    pub fn release(&mut self) {
        if self.loop_until_release && self.looping {
            self.looping = false;
            self.backwards = false;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Detach the waveform handle (voice freed)
    pub fn take_waveform(&mut self) -> Option<Arc<Waveform>> {
        self.playing = false;
        self.waveform.take()
    }

    /// Interpolated stereo frame at the current position, then advance.
    /// Returns `None` once playback has ended.
    #[inline]
    pub fn next_frame(&mut self) -> Option<(f32, f32)> {
        if !self.playing {
            return None;
        }
        let waveform = self.waveform.as_ref()?;

        let index = self.position as usize;
        let fraction = (self.position - index as f64) as f32;
        let (l1, r1) = waveform.stereo_frame(index);
        let (l2, r2) = waveform.stereo_frame(self.following_index(index));

        let frame = (l1 + (l2 - l1) * fraction, r1 + (r2 - r1) * fraction);
        self.advance();
        Some(frame)
    }

    /// Frame that follows `index` for interpolation, honouring the loop
    fn following_index(&self, index: usize) -> usize {
        match self.region {
            Some(region) if self.looping && index + 1 >= region.end as usize => {
                if region.ping_pong {
                    index
                } else {
                    region.start as usize
                }
            }
            _ => index + 1,
        }
    }

    fn advance(&mut self) {
        if self.backwards {
            self.position -= self.step;
        } else {
            self.position += self.step;
        }

        match self.region {
            Some(region) if self.looping => {
                if region.ping_pong {
                    let last = region.end - 1.0;
                    if !self.backwards && self.position > last {
                        let reflected = last - (self.position - last);
                        self.position = reflected.clamp(region.start, last);
                        self.backwards = true;
                    } else if self.backwards && self.position < region.start {
                        let reflected = region.start + (region.start - self.position);
                        self.position = reflected.clamp(region.start, last);
                        self.backwards = false;
                    }
                } else if self.position >= region.end {
                    let length = region.end - region.start;
                    self.position = region.start + (self.position - region.end) % length;
                }
            }
            _ => {
                if self.position >= self.frames as f64 || self.position < 0.0 {
                    self.playing = false;
                }
            }
        }
    }
}
