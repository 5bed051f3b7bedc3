// Portamento/Glide - Per-tick pitch and controller transitions
//
// `PitchGlide` moves a pitch toward its target at a fixed rate in semitones
// per tick. `LinearSlide` interpolates a controller (velocity, mod) to a new
// value over a given number of ticks.

/// Pitch glide processor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchGlide {
    current: f32,
    target: f32,
    /// Semitones per tick; 0 = instant
    rate: f32,
}

impl PitchGlide {
    pub fn new(pitch: f32, rate: f32) -> Self {
        Self {
            current: pitch,
            target: pitch,
            rate: rate.max(0.0),
        }
    }

    /// Set a new target; jumps there immediately when the rate is 0
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
        if self.rate <= 0.0 {
            self.current = target;
        }
    }

    /// Advance one tick; returns true if the pitch changed
    pub fn tick(&mut self) -> bool {
        if self.current == self.target {
            return false;
        }
        let delta = self.target - self.current;
        if delta.abs() <= self.rate {
            self.current = self.target;
        } else {
            self.current += self.rate.copysign(delta);
        }
        true
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn is_gliding(&self) -> bool {
        self.current != self.target
    }
}

/// Controller slide (velocity / mod)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSlide {
    value: f32,
    target: f32,
    step: f32,
    remaining: u32,
}

impl LinearSlide {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            target: value,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Jump to `value`, cancelling any slide in progress
    pub fn set(&mut self, value: f32) {
        self.value = value;
        self.target = value;
        self.remaining = 0;
    }

    /// Reach `target` after `ticks` ticks (immediately when `ticks` is 0)
    pub fn slide_to(&mut self, target: f32, ticks: u32) {
        if ticks == 0 {
            self.set(target);
        } else {
            self.target = target;
            self.step = (target - self.value) / ticks as f32;
            self.remaining = ticks;
        }
    }

    /// Advance one tick; the last tick lands exactly on the target
    pub fn tick(&mut self) {
        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.value = self.target;
            } else {
                self.value += self.step;
            }
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instant_glide() {
        let mut glide = PitchGlide::new(60.0, 0.0);
        glide.set_target(67.0);
        assert_eq!(glide.current(), 67.0);
        assert!(!glide.is_gliding());
        assert!(!glide.tick());
    }

    #[test]
    fn test_glide_rate_in_semitones_per_tick() {
        let mut glide = PitchGlide::new(60.0, 2.0);
        glide.set_target(65.0);
        assert_eq!(glide.current(), 60.0);

        glide.tick();
        assert_eq!(glide.current(), 62.0);
        glide.tick();
        assert_eq!(glide.current(), 64.0);
        glide.tick();
        assert_eq!(glide.current(), 65.0);
        assert!(!glide.is_gliding());

        glide.set_target(61.0);
        glide.tick();
        assert_eq!(glide.current(), 63.0);
    }

    #[test]
    fn test_slide_reaches_target() {
        let mut slide = LinearSlide::new(0.0);
        slide.slide_to(1.0, 4);
        let values: Vec<f32> = (0..5)
            .map(|_| {
                slide.tick();
                slide.value()
            })
            .collect();
        assert_eq!(values, vec![0.25, 0.5, 0.75, 1.0, 1.0]);
    }

    #[test]
    fn test_slide_ends_exactly_on_target() {
        let mut slide = LinearSlide::new(0.3);
        slide.slide_to(1.0, 7);
        for _ in 0..7 {
            slide.tick();
            assert!(slide.value() <= 1.0);
        }
        assert_eq!(slide.value(), 1.0);

        slide.slide_to(0.1, 3);
        for _ in 0..3 {
            slide.tick();
        }
        assert_eq!(slide.value(), 0.1);
    }

    #[test]
    fn test_set_cancels_slide() {
        let mut slide = LinearSlide::new(1.0);
        slide.slide_to(0.0, 10);
        slide.tick();
        slide.set(0.7);
        slide.tick();
        assert_eq!(slide.value(), 0.7);

        slide.slide_to(0.2, 0);
        assert_eq!(slide.value(), 0.2);
    }
}
