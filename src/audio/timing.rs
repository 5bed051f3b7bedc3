// Audio timing - Tick clock for sample-accurate sequencing
//
// Tick boundaries are kept in 16.16 fixed point so that tempos whose tick
// length is not a whole number of frames do not drift: the fractional part
// carries over from one tick to the next.

use crate::units::sanitize_tempo;

const FRACTION_BITS: u32 = 16;
const ONE_FRAME: i64 = 1 << FRACTION_BITS;

#[derive(Debug, Clone)]
pub struct TickClock {
    sample_rate: f64,
    ticks_per_beat: u32,
    tempo: f32,
    /// Frames per tick, fixed point
    period: i64,
    /// Frames until the next tick boundary, fixed point; <= 0 means due now
    countdown: i64,
    frames_elapsed: u64,
    ticks_elapsed: u64,
}

impl TickClock {
    pub fn new(sample_rate: f32, ticks_per_beat: u32, tempo: f32) -> Self {
        let mut clock = Self {
            sample_rate: sample_rate.max(1.0) as f64,
            ticks_per_beat: ticks_per_beat.max(1),
            tempo: 0.0,
            period: ONE_FRAME,
            countdown: 0,
            frames_elapsed: 0,
            ticks_elapsed: 0,
        };
        clock.set_tempo(tempo);
        clock
    }

    /// Tempo in beats per minute; applies from the next tick on
    pub fn set_tempo(&mut self, tempo: f32) {
        let tempo = sanitize_tempo(tempo);
        if tempo == self.tempo {
            return;
        }
        self.tempo = tempo;
        let frames = self.sample_rate * 60.0 / (tempo as f64 * self.ticks_per_beat as f64);
        self.period = ((frames * ONE_FRAME as f64) as i64).max(ONE_FRAME);
    }

    pub fn tempo(&self) -> f32 {
        self.tempo
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    /// Tick length in (fractional) frames
    pub fn frames_per_tick(&self) -> f64 {
        self.period as f64 / ONE_FRAME as f64
    }

    /// Make the next tick due immediately
    pub fn reset(&mut self) {
        self.countdown = 0;
    }

    /// Whole frames to render before the next tick is due (0 = due now)
    #[inline]
    pub fn frames_until_tick(&self) -> usize {
        if self.countdown <= 0 {
            0
        } else {
            ((self.countdown + ONE_FRAME - 1) >> FRACTION_BITS) as usize
        }
    }

    /// Consume the due tick and schedule the next boundary
    #[inline]
    pub fn tick(&mut self) {
        self.countdown += self.period;
        self.ticks_elapsed += 1;
    }

    #[inline]
    pub fn advance(&mut self, frames: usize) {
        self.countdown -= (frames as i64) << FRACTION_BITS;
        self.frames_elapsed += frames as u64;
    }

    pub fn frames_elapsed(&self) -> u64 {
        self.frames_elapsed
    }

    pub fn ticks_elapsed(&self) -> u64 {
        self.ticks_elapsed
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frame offsets at which ticks fire while rendering `frames` frames in `block` chunks
    fn tick_offsets(clock: &mut TickClock, frames: usize, block: usize) -> Vec<u64> {
        let mut offsets = Vec::new();
        let mut rendered = 0;
        while rendered < frames {
            let mut done = 0;
            while done < block {
                if clock.frames_until_tick() == 0 {
                    offsets.push(clock.frames_elapsed());
                    clock.tick();
                }
                let n = clock.frames_until_tick().min(block - done);
                clock.advance(n);
                done += n;
            }
            rendered += block;
        }
        offsets
    }

    #[test]
    fn test_default_tempo_tick_length() {
        // 48 kHz, 125 BPM, 192 ticks per beat → 120 frames per tick
        let clock = TickClock::new(48_000.0, 192, 125.0);
        assert!((clock.frames_per_tick() - 120.0).abs() < 1e-3);
    }

    #[test]
    fn test_first_tick_is_due_at_frame_zero() {
        let mut clock = TickClock::new(48_000.0, 192, 125.0);
        assert_eq!(clock.frames_until_tick(), 0);
        clock.tick();
        assert_eq!(clock.frames_until_tick(), 120);
    }

    #[test]
    fn test_ticks_are_evenly_spaced_across_blocks() {
        let mut clock = TickClock::new(48_000.0, 192, 125.0);
        let offsets = tick_offsets(&mut clock, 1024, 64);
        let expected: Vec<u64> = (0..9).map(|i| i * 120).collect();
        assert_eq!(offsets, expected);
    }

    #[test]
    fn test_fractional_tick_length_does_not_drift() {
        // 44.1 kHz at 120 BPM, 4 ticks per beat → 5512.5 frames per tick
        let mut clock = TickClock::new(44_100.0, 4, 120.0);
        let offsets = tick_offsets(&mut clock, 44_100 * 10, 512);
        assert_eq!(offsets.len(), 81);
        // Tick 80 lands exactly at 10 seconds (rounded up to the frame)
        assert_eq!(offsets[80], 441_000);
        assert_eq!(offsets[1], 5513);
    }

    #[test]
    fn test_tempo_change_applies_to_next_tick() {
        let mut clock = TickClock::new(48_000.0, 192, 125.0);
        clock.tick();
        clock.set_tempo(250.0);
        assert_eq!(clock.frames_until_tick(), 120);
        clock.advance(120);
        clock.tick();
        assert_eq!(clock.frames_until_tick(), 60);
    }

    #[test]
    fn test_invalid_tempo_is_sanitized() {
        let mut clock = TickClock::new(48_000.0, 192, 125.0);
        clock.set_tempo(f32::NAN);
        assert!(clock.tempo().is_finite());
        clock.set_tempo(0.0);
        assert!(clock.frames_per_tick() >= 1.0);
    }

    #[test]
    fn test_reset_makes_tick_due() {
        let mut clock = TickClock::new(48_000.0, 192, 125.0);
        clock.tick();
        clock.advance(30);
        clock.reset();
        assert_eq!(clock.frames_until_tick(), 0);
    }
}
