// ADSR Envelope implementation
//
// Linear Attack-Decay-Sustain-Release envelope advanced once per sequencer
// tick. Stage durations are in ticks; a zero-length stage is skipped.

/// ADSR Envelope parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrParams {
    /// Attack time in ticks
    pub attack: u32,
    /// Decay time in ticks
    pub decay: u32,
    /// Sustain level (0.0 to 1.0)
    pub sustain: f32,
    /// Release time in ticks
    pub release: u32,
}

impl AdsrParams {
    /// Create ADSR parameters with validation
    pub fn new(attack: u32, decay: u32, sustain: f32, release: u32) -> Self {
        let sustain = if sustain.is_nan() { 1.0 } else { sustain.clamp(0.0, 1.0) };
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }
}

impl Default for AdsrParams {
    /// Gate shape: full level while held, silent on release
    fn default() -> Self {
        Self {
            attack: 0,
            decay: 0,
            sustain: 1.0,
            release: 0,
        }
    }
}

/// Stage of the ADSR envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    /// Not sounding
    Idle,
    /// Rising 0 → 1
    Attack,
    /// Falling 1 → sustain
    Decay,
    /// Holding at sustain level until released
    Sustain,
    /// Falling from the level at release time to 0
    Release,
}

/// ADSR Envelope Generator
///
/// `level()` is the gain for the current tick; `advance()` moves one tick on.
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    params: AdsrParams,
    stage: EnvelopeStage,
    /// Ticks spent in the current stage
    elapsed: u32,
    release_from: f32,
}

impl AdsrEnvelope {
    pub fn new(params: AdsrParams) -> Self {
        Self {
            params,
            stage: EnvelopeStage::Idle,
            elapsed: 0,
            release_from: 0.0,
        }
    }

    pub fn params(&self) -> AdsrParams {
        self.params
    }

    /// Start the attack stage
    pub fn note_on(&mut self) {
        self.stage = EnvelopeStage::Attack;
        self.elapsed = 0;
        self.release_from = 0.0;
        self.settle();
    }

    /// Start the release stage from the current level
    pub fn note_off(&mut self) {
        if matches!(self.stage, EnvelopeStage::Idle | EnvelopeStage::Release) {
            return;
        }
        self.release_from = self.level();
        self.stage = EnvelopeStage::Release;
        self.elapsed = 0;
        self.settle();
    }

    /// Gain for the current tick, in [0, 1]
    pub fn level(&self) -> f32 {
        let p = &self.params;
        match self.stage {
            EnvelopeStage::Idle => 0.0,
            EnvelopeStage::Attack => self.elapsed as f32 / p.attack as f32,
            EnvelopeStage::Decay => {
                let progress = self.elapsed as f32 / p.decay as f32;
                1.0 - progress * (1.0 - p.sustain)
            }
            EnvelopeStage::Sustain => p.sustain,
            EnvelopeStage::Release => {
                let progress = self.elapsed as f32 / p.release as f32;
                self.release_from * (1.0 - progress)
            }
        }
    }

    /// Move one tick forward
    pub fn advance(&mut self) {
        match self.stage {
            EnvelopeStage::Idle | EnvelopeStage::Sustain => {}
            _ => {
                self.elapsed = self.elapsed.saturating_add(1);
                self.settle();
            }
        }
    }

    /// Leave every stage whose duration has run out (possibly several zero-length ones)
    fn settle(&mut self) {
        loop {
            let next = match self.stage {
                EnvelopeStage::Attack if self.elapsed >= self.params.attack => EnvelopeStage::Decay,
                EnvelopeStage::Decay if self.elapsed >= self.params.decay => EnvelopeStage::Sustain,
                EnvelopeStage::Release if self.elapsed >= self.params.release => EnvelopeStage::Idle,
                _ => break,
            };
            self.stage = next;
            self.elapsed = 0;
        }
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Check if the envelope is currently active (not idle)
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    pub fn is_releasing(&self) -> bool {
        self.stage == EnvelopeStage::Release
    }

    /// Fraction of the release stage already played, 0 outside release
    pub fn release_progress(&self) -> f32 {
        if self.stage == EnvelopeStage::Release && self.params.release > 0 {
            self.elapsed as f32 / self.params.release as f32
        } else {
            0.0
        }
    }

    /// Reset the envelope to idle state
    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.elapsed = 0;
        self.release_from = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(envelope: &mut AdsrEnvelope, ticks: u32) -> Vec<f32> {
        (0..ticks)
            .map(|_| {
                envelope.advance();
                envelope.level()
            })
            .collect()
    }

    #[test]
    fn test_adsr_params_default() {
        let params = AdsrParams::default();
        assert_eq!(params.attack, 0);
        assert_eq!(params.decay, 0);
        assert_eq!(params.sustain, 1.0);
        assert_eq!(params.release, 0);
    }

    #[test]
    fn test_adsr_params_clamping() {
        assert_eq!(AdsrParams::new(1, 1, 1.5, 1).sustain, 1.0);
        assert_eq!(AdsrParams::new(1, 1, -0.5, 1).sustain, 0.0);
        assert_eq!(AdsrParams::new(1, 1, f32::NAN, 1).sustain, 1.0);
    }

    #[test]
    fn test_envelope_starts_idle() {
        let envelope = AdsrEnvelope::new(AdsrParams::default());
        assert_eq!(envelope.stage(), EnvelopeStage::Idle);
        assert_eq!(envelope.level(), 0.0);
        assert!(!envelope.is_active());
    }

    #[test]
    fn test_reference_shape() {
        // A=10, D=5, S=0.5, R=20
        let mut envelope = AdsrEnvelope::new(AdsrParams::new(10, 5, 0.5, 20));
        envelope.note_on();
        assert_eq!(envelope.stage(), EnvelopeStage::Attack);
        assert_eq!(envelope.level(), 0.0);

        run(&mut envelope, 10);
        assert!((envelope.level() - 1.0).abs() < 1e-6);

        run(&mut envelope, 5);
        assert_eq!(envelope.stage(), EnvelopeStage::Sustain);
        assert!((envelope.level() - 0.5).abs() < 1e-6);

        run(&mut envelope, 100);
        assert!((envelope.level() - 0.5).abs() < 1e-6);

        envelope.note_off();
        assert!(envelope.is_releasing());
        assert!((envelope.level() - 0.5).abs() < 1e-6);

        let levels = run(&mut envelope, 20);
        assert!(levels[18] > 0.0);
        assert_eq!(envelope.level(), 0.0);
        assert!(!envelope.is_active());
    }

    #[test]
    fn test_stage_monotonicity_and_range() {
        let mut envelope = AdsrEnvelope::new(AdsrParams::new(7, 9, 0.3, 11));
        envelope.note_on();

        let mut previous = envelope.level();
        let mut previous_stage = envelope.stage();
        for tick in 0..60 {
            if tick == 40 {
                envelope.note_off();
                previous = envelope.level();
                previous_stage = envelope.stage();
            }
            envelope.advance();
            let level = envelope.level();
            let stage = envelope.stage();
            assert!((0.0..=1.0).contains(&level));

            if stage == previous_stage {
                match stage {
                    EnvelopeStage::Attack => assert!(level >= previous),
                    EnvelopeStage::Decay | EnvelopeStage::Release => assert!(level <= previous),
                    EnvelopeStage::Sustain => assert_eq!(level, previous),
                    EnvelopeStage::Idle => assert_eq!(level, 0.0),
                }
            }
            previous = level;
            previous_stage = stage;
        }
    }

    #[test]
    fn test_zero_length_stages_are_skipped() {
        let mut envelope = AdsrEnvelope::new(AdsrParams::new(0, 0, 0.8, 0));
        envelope.note_on();
        assert_eq!(envelope.stage(), EnvelopeStage::Sustain);
        assert!((envelope.level() - 0.8).abs() < 1e-6);

        envelope.note_off();
        assert_eq!(envelope.stage(), EnvelopeStage::Idle);
        assert_eq!(envelope.level(), 0.0);
    }

    #[test]
    fn test_note_off_during_attack_releases_from_current_level() {
        let mut envelope = AdsrEnvelope::new(AdsrParams::new(10, 5, 0.5, 4));
        envelope.note_on();
        run(&mut envelope, 5);
        assert!((envelope.level() - 0.5).abs() < 1e-6);

        envelope.note_off();
        assert_eq!(envelope.stage(), EnvelopeStage::Release);
        assert!((envelope.level() - 0.5).abs() < 1e-6);
        run(&mut envelope, 2);
        assert!((envelope.level() - 0.25).abs() < 1e-6);
        assert!((envelope.release_progress() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_note_off_is_idempotent() {
        let mut envelope = AdsrEnvelope::new(AdsrParams::new(0, 0, 1.0, 10));
        envelope.note_on();
        envelope.note_off();
        run(&mut envelope, 5);
        let level = envelope.level();
        envelope.note_off();
        assert_eq!(envelope.level(), level);

        envelope.reset();
        assert!(!envelope.is_active());
        envelope.note_off();
        assert!(!envelope.is_active());
    }
}
