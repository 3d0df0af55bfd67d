//! Long-audio chunking, overlap stitching, and the tail-pass probe.
//!
//! Whisper-family models degrade past roughly a minute of input — they
//! truncate or summarise the tail.  Long recordings are therefore split
//! into overlapping chunks decoded independently, then stitched by finding
//! the token overlap between adjacent transcripts.  A final tail-pass
//! re-decodes the last stretch and appends it when the merged transcript
//! does not already cover it.

use crate::audio::{rms, SAMPLE_RATE};

/// Duration at which chunked decoding kicks in.
pub const LONG_AUDIO_THRESHOLD_S: f32 = 75.0;
/// Target chunk length.
pub const CHUNK_S: f32 = 42.0;
/// Overlap between adjacent chunks.
pub const OVERLAP_S: f32 = 1.2;
/// The final chunk is never shorter than this.
pub const MIN_FINAL_CHUNK_S: f32 = 12.0;
/// Boundary snap search window, in samples (±).
const SNAP_WINDOW: usize = 8_000;
/// Frame used when scoring boundary loudness: 20 ms.
const SNAP_FRAME: usize = 320;

/// Duration at which the extra tail-pass runs.
pub const TAIL_PASS_THRESHOLD_S: f32 = 95.0;
/// Length of the independently decoded tail.
pub const TAIL_S: f32 = 24.0;
/// Tokens probed when checking whether the merge already covers the tail.
const TAIL_PROBE_TOKENS: usize = 12;

/// Token-overlap search bounds.
const MIN_OVERLAP_TOKENS: usize = 4;
const MAX_OVERLAP_TOKENS: usize = 20;
/// Fuzzy matching starts at this overlap size.
const FUZZY_MIN_OVERLAP_TOKENS: usize = 6;

fn samples(seconds: f32) -> usize {
    (seconds * SAMPLE_RATE as f32) as usize
}

/// Whether `audio` is long enough to require chunked decoding.
pub fn needs_chunked_decoding(audio: &[f32]) -> bool {
    audio.len() >= samples(LONG_AUDIO_THRESHOLD_S)
}

/// Whether `audio` is long enough to earn the extra tail-pass.
pub fn needs_tail_pass(audio: &[f32]) -> bool {
    audio.len() >= samples(TAIL_PASS_THRESHOLD_S)
}

/// The tail window decoded by the tail-pass.
pub fn tail_window(audio: &[f32]) -> &[f32] {
    let tail = samples(TAIL_S).min(audio.len());
    &audio[audio.len() - tail..]
}

/// Split long audio into ~42 s chunks with 1.2 s overlap.
///
/// Each boundary is snapped to the quietest 20 ms frame within ±8000
/// samples of the target so the cut lands in a natural pause rather than
/// mid-word.  The final chunk absorbs any remainder shorter than
/// [`MIN_FINAL_CHUNK_S`].
pub fn split_for_long_transcription(audio: &[f32]) -> Vec<&[f32]> {
    if !needs_chunked_decoding(audio) {
        return vec![audio];
    }

    let chunk = samples(CHUNK_S);
    let overlap = samples(OVERLAP_S);
    let min_final = samples(MIN_FINAL_CHUNK_S);
    let len = audio.len();

    let mut chunks: Vec<&[f32]> = Vec::new();
    let mut start = 0usize;

    loop {
        let target_end = start + chunk;
        if target_end >= len || len - target_end < min_final {
            chunks.push(&audio[start..len]);
            break;
        }

        let mut end = snap_to_quietest_frame(audio, target_end);
        // The snap must never erase forward progress.
        end = end.clamp(start + overlap + 1, len - 1);
        chunks.push(&audio[start..end]);
        start = end - overlap;
    }

    chunks
}

/// Start of the quietest 20 ms frame within ±[`SNAP_WINDOW`] of `target`.
fn snap_to_quietest_frame(audio: &[f32], target: usize) -> usize {
    let lo = target.saturating_sub(SNAP_WINDOW);
    let hi = (target + SNAP_WINDOW).min(audio.len().saturating_sub(SNAP_FRAME));
    if hi <= lo {
        return target.min(audio.len());
    }

    let mut best_start = target;
    let mut best_level = f32::INFINITY;
    let mut frame_start = lo;
    while frame_start <= hi {
        let level = rms(&audio[frame_start..frame_start + SNAP_FRAME]);
        if level < best_level {
            best_level = level;
            best_start = frame_start;
        }
        frame_start += SNAP_FRAME;
    }
    best_start
}

/// Largest `k ∈ [4, 20]` such that the last `k` tokens of `left` match the
/// first `k` tokens of `right`.
///
/// Exact matches win; failing that, overlaps of 6+ tokens tolerate up to
/// ⌊k/6⌋ mismatches so minor decoding drift between chunks does not break
/// the stitch.  Returns `0` when no overlap qualifies.
pub fn find_token_overlap(left: &[String], right: &[String]) -> usize {
    let max_k = left.len().min(right.len()).min(MAX_OVERLAP_TOKENS);
    if max_k < MIN_OVERLAP_TOKENS {
        return 0;
    }

    let eq = |a: &str, b: &str| a.eq_ignore_ascii_case(b);

    for k in (MIN_OVERLAP_TOKENS..=max_k).rev() {
        let tail = &left[left.len() - k..];
        if tail.iter().zip(right.iter()).all(|(a, b)| eq(a, b)) {
            return k;
        }
    }

    for k in (FUZZY_MIN_OVERLAP_TOKENS..=max_k).rev() {
        let tail = &left[left.len() - k..];
        let mismatches = tail.iter().zip(right.iter()).filter(|(a, b)| !eq(a, b)).count();
        if mismatches <= k / 6 {
            return k;
        }
    }

    0
}

/// Merge chunk transcripts left to right, dropping each overlap from the
/// right-hand side.
pub fn merge_transcript_parts(parts: &[String]) -> String {
    let mut merged: Vec<String> = Vec::new();
    for part in parts {
        let tokens: Vec<String> = part.split_whitespace().map(str::to_string).collect();
        if merged.is_empty() {
            merged = tokens;
            continue;
        }
        let k = find_token_overlap(&merged, &tokens);
        merged.extend(tokens.into_iter().skip(k));
    }
    merged.join(" ")
}

/// Whether the first [`TAIL_PROBE_TOKENS`] tokens of `tail` appear as a
/// contiguous run in `full`.
pub fn is_tail_covered(full: &str, tail: &str) -> bool {
    let probe: Vec<String> = tail
        .split_whitespace()
        .take(TAIL_PROBE_TOKENS)
        .map(str::to_lowercase)
        .collect();
    if probe.is_empty() {
        return true;
    }
    let haystack: Vec<String> = full.split_whitespace().map(str::to_lowercase).collect();
    if haystack.len() < probe.len() {
        return false;
    }
    haystack.windows(probe.len()).any(|w| w == probe.as_slice())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
