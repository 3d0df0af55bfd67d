//! Silence trimming before decode.
//!
//! Whisper-family models hallucinate on long stretches of silence, and
//! decode time scales with input length — so leading/trailing dead air is
//! cut before the audio reaches the model.  The threshold adapts to the
//! clip's own noise floor rather than assuming a quiet room.

use crate::audio::{percentile, rms};

/// Analysis frame: 20 ms at 16 kHz.
const FRAME: usize = 320;
/// Noise floor percentile.
const FLOOR_PERCENTILE: f32 = 20.0;
/// Threshold scale over the noise floor, with clamp bounds.
const THRESHOLD_SCALE: f32 = 2.4;
const THRESHOLD_MIN: f32 = 0.0025;
const THRESHOLD_MAX: f32 = 0.018;
/// Padding kept around the active region: 220 ms.
const PAD_SAMPLES: usize = 3_520;
/// When the trimmed window is suspiciously small relative to a long clip,
/// widen it by 500 ms per side rather than risk cutting speech.
const MIN_WINDOW_RATIO: f32 = 0.40;
const EXPAND_SAMPLES: usize = 8_000;
const MIN_ORIGINAL_FOR_EXPAND: usize = 3 * 16_000;

/// Trim leading/trailing silence for decoding.
///
/// Returns `Some(trimmed)` when a strictly smaller window was found, and
/// `None` when the audio should be decoded as-is (all-silence input is
/// also left unchanged — the VAD gate deals with it).
pub fn trim_silence_for_decode(audio: &[f32]) -> Option<Vec<f32>> {
    if audio.len() < 2 * FRAME {
        return None;
    }

    let frame_levels: Vec<f32> = audio.chunks(FRAME).map(rms).collect();
    let floor = percentile(&frame_levels, FLOOR_PERCENTILE);
    let threshold = (floor * THRESHOLD_SCALE).clamp(THRESHOLD_MIN, THRESHOLD_MAX);

    let first_active = frame_levels.iter().position(|&l| l > threshold)?;
    let last_active = frame_levels.iter().rposition(|&l| l > threshold)?;

    let mut start = (first_active * FRAME).saturating_sub(PAD_SAMPLES);
    let mut end = ((last_active + 1) * FRAME + PAD_SAMPLES).min(audio.len());

    let window = end - start;
    if (window as f32) < MIN_WINDOW_RATIO * audio.len() as f32
        && audio.len() >= MIN_ORIGINAL_FOR_EXPAND
    {
        start = start.saturating_sub(EXPAND_SAMPLES);
        end = (end + EXPAND_SAMPLES).min(audio.len());
    }

    if end - start >= audio.len() {
        return None;
    }
    Some(audio[start..end].to_vec())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_silence_is_removed_without_cutting_speech() {
        let mut audio = vec![0.02_f32; 16_000];
        audio.extend(vec![0.0_f32; 32_000]);

        let trimmed = trim_silence_for_decode(&audio).expect("should trim");
        assert!(trimmed.len() < audio.len());
        assert!(trimmed.len() >= 16_000);
    }

    #[test]
    fn all_silence_is_left_unchanged() {
        let audio = vec![0.0_f32; 24_000];
        assert!(trim_silence_for_decode(&audio).is_none());
    }

    #[test]
    fn all_speech_is_left_unchanged() {
        let audio = vec![0.05_f32; 24_000];
        assert!(trim_silence_for_decode(&audio).is_none());
    }

    #[test]
    fn leading_silence_is_removed_with_padding() {
        let mut audio = vec![0.0_f32; 32_000];
        audio.extend(vec![0.02_f32; 16_000]);

        let trimmed = trim_silence_for_decode(&audio).expect("should trim");
        // Speech plus up to 220 ms of leading pad survives.
        assert!(trimmed.len() >= 16_000);
        assert!(trimmed.len() <= 16_000 + 2 * PAD_SAMPLES + FRAME);
    }

    #[test]
    fn tiny_window_on_long_clip_is_expanded() {
        // 10 s clip with a single 0.5 s burst: the naive window would be
        // ~6 % of the clip, so the expansion kicks in.
        let mut audio = vec![0.0_f32; 80_000];
        for sample in &mut audio[40_000..48_000] {
            *sample = 0.05;
        }

        let trimmed = trim_silence_for_decode(&audio).expect("should trim");
        let base_window = 8_000 + 2 * PAD_SAMPLES;
        assert!(trimmed.len() > base_window, "expansion did not apply");
    }

    #[test]
    fn very_short_audio_is_left_unchanged() {
        let audio = vec![0.02_f32; FRAME];
        assert!(trim_silence_for_decode(&audio).is_none());
    }
}
