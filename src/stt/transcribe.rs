//! Transcription result types, temperature ladder, and decode-quality
//! checks.

/// Average token logprob below which a decode is retried at a higher
/// temperature (matching whisper-style fallback decoding).
pub const LOGPROB_THRESHOLD: f32 = -1.0;

/// A single time-aligned chunk produced by the decoder.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Segment text (may include punctuation inserted by the model).
    pub text: String,
    /// Start time in milliseconds from the start of the audio.
    pub start_ms: u64,
    /// End time in milliseconds from the start of the audio.
    pub end_ms: u64,
    /// Mean natural-log token probability of the segment.
    pub avg_logprob: f32,
}

/// Output of a full decode pass.
#[derive(Debug, Clone)]
pub struct SegmentedTranscript {
    /// Concatenated transcript, trimmed.
    pub text: String,
    /// Individual segments in order.
    pub segments: Vec<Segment>,
}

impl SegmentedTranscript {
    /// Token-weighted mean logprob across all segments; `0.0` when empty.
    pub fn avg_logprob(&self) -> f32 {
        if self.segments.is_empty() {
            return 0.0;
        }
        self.segments.iter().map(|s| s.avg_logprob).sum::<f32>() / self.segments.len() as f32
    }
}

/// Temperature ladder for a clip of `samples` 16 kHz samples.
///
/// Short clips decode once at temperature zero; longer clips earn retry
/// rungs because hallucination loops show up in long-form decoding.
pub fn temperature_ladder(samples: usize) -> &'static [f32] {
    const SHORT: usize = 15 * 16_000;
    const MEDIUM: usize = 45 * 16_000;
    if samples < SHORT {
        &[0.0]
    } else if samples < MEDIUM {
        &[0.0, 0.2]
    } else {
        &[0.0, 0.2, 0.4]
    }
}

/// Degenerate-output check: the repetition loops a stuck decoder produces
/// (the same phrase over and over) stand in for the classic zlib
/// compression-ratio test.
pub fn looks_degenerate(text: &str) -> bool {
    let tokens: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
    if tokens.len() < 16 {
        return false;
    }

    // A single token dominating the text is the cheapest loop to catch.
    let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for token in &tokens {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }
    if counts.values().any(|&c| c * 2 > tokens.len()) {
        return true;
    }

    // Repeated 4-grams catch phrase loops.
    let mut grams: std::collections::HashMap<&[String], usize> = std::collections::HashMap::new();
    let mut max_gram = 0;
    for window in tokens.windows(4) {
        let count = grams.entry(window).or_insert(0);
        *count += 1;
        max_gram = max_gram.max(*count);
    }
    max_gram >= 4
}

/// Whether a decode pass is good enough to keep without a retry.
pub fn decode_is_acceptable(transcript: &SegmentedTranscript) -> bool {
    transcript.avg_logprob() >= LOGPROB_THRESHOLD && !looks_degenerate(&transcript.text)
}

/// Number of CPU threads for inference, capped at 8 — more shows
/// diminishing returns on whisper.cpp.
pub(crate) fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
