// Format conversion for output sinks
//
// The engine mixes in interleaved stereo f32. Sinks that want integer PCM or
// a different channel layout go through these helpers; all of them are
// allocation-free and safe to call from the render callback.

/// Convert f32 sample to i16
///
/// Maps [-1.0, 1.0] to [i16::MIN, i16::MAX]; out-of-range input is clamped
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped >= 0.0 {
        (clamped * i16::MAX as f32) as i16
    } else {
        (clamped * -(i16::MIN as f32)) as i16
    }
}

/// Convert f32 sample to u16 (offset binary, 32768 = silence)
#[inline]
pub fn f32_to_u16(sample: f32) -> u16 {
    let clamped = sample.clamp(-1.0, 1.0);
    ((clamped + 1.0) * 0.5 * u16::MAX as f32) as u16
}

/// Sample type an output sink accepts
pub trait OutputSample: Copy {
    fn from_f32(sample: f32) -> Self;
}

impl OutputSample for f32 {
    #[inline]
    fn from_f32(sample: f32) -> Self {
        sample
    }
}

impl OutputSample for i16 {
    #[inline]
    fn from_f32(sample: f32) -> Self {
        f32_to_i16(sample)
    }
}

impl OutputSample for u16 {
    #[inline]
    fn from_f32(sample: f32) -> Self {
        f32_to_u16(sample)
    }
}

/// Write one stereo frame into a device frame of any channel count
///
/// Channels beyond the second get silence; a mono frame gets the L/R average.
#[inline]
pub fn write_stereo_frame<T: OutputSample>((left, right): (f32, f32), frame: &mut [T]) {
    if frame.len() >= 2 {
        frame[0] = T::from_f32(left);
        frame[1] = T::from_f32(right);
        for sample in frame.iter_mut().skip(2) {
            *sample = T::from_f32(0.0);
        }
    } else if let Some(sample) = frame.first_mut() {
        *sample = T::from_f32((left + right) * 0.5);
    }
}

/// Convert an interleaved stereo buffer to `channels`-wide frames of `T`
pub fn convert_interleaved<T: OutputSample>(stereo: &[f32], out: &mut [T], channels: usize) {
    let channels = channels.max(1);
    for (src, dst) in stereo.chunks_exact(2).zip(out.chunks_exact_mut(channels)) {
        write_stereo_frame((src[0], src[1]), dst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_to_i16_conversion() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), i16::MAX);
        assert_eq!(f32_to_i16(-1.0), i16::MIN);

        let mid = f32_to_i16(0.5);
        assert!(mid > 0 && mid < i16::MAX);
    }

    #[test]
    fn test_f32_to_u16_conversion() {
        let zero = f32_to_u16(0.0);
        assert!((zero as i32 - 32768).abs() < 10);
        assert_eq!(f32_to_u16(1.0), u16::MAX);
        assert_eq!(f32_to_u16(-1.0), u16::MIN);
    }

    #[test]
    fn test_quantization_is_monotonic() {
        let levels = [-1.0f32, -0.5, -0.1, 0.0, 0.1, 0.5, 0.9, 1.0];
        for pair in levels.windows(2) {
            assert!(f32_to_i16(pair[0]) < f32_to_i16(pair[1]));
            assert!(f32_to_u16(pair[0]) < f32_to_u16(pair[1]));
        }
    }

    #[test]
    fn test_clamping() {
        assert_eq!(f32_to_i16(2.0), i16::MAX);
        assert_eq!(f32_to_i16(-2.0), i16::MIN);
        assert_eq!(f32_to_u16(2.0), u16::MAX);
        assert_eq!(f32_to_u16(-2.0), u16::MIN);
    }

    #[test]
    fn test_write_stereo_frame_layouts() {
        let mut stereo = [0.0f32; 2];
        write_stereo_frame((0.25, -0.25), &mut stereo);
        assert_eq!(stereo, [0.25, -0.25]);

        let mut mono = [0i16; 1];
        write_stereo_frame((0.5, 0.0), &mut mono);
        assert_eq!(mono[0], f32_to_i16(0.25));

        let mut quad = [1.0f32; 4];
        write_stereo_frame((0.1, 0.2), &mut quad);
        assert_eq!(quad, [0.1, 0.2, 0.0, 0.0]);
    }

    #[test]
    fn test_convert_interleaved() {
        let stereo = [1.0, -1.0, 0.0, 0.5];
        let mut out = [0i16; 4];
        convert_interleaved(&stereo, &mut out, 2);
        assert_eq!(out[0], i16::MAX);
        assert_eq!(out[1], i16::MIN);
        assert_eq!(out[2], 0);

        let mut mono = [0u16; 2];
        convert_interleaved(&stereo, &mut mono, 1);
        assert_eq!(mono[0], f32_to_u16(0.0));
        assert_eq!(mono[1], f32_to_u16(0.25));
    }
}
