//! Microphone capture via `cpal` with an adaptive trailing tail.
//!
//! [`AudioCapture`] opens a 16 kHz mono `f32` input stream (falling back to
//! the device's native configuration plus per-block conversion when the
//! device refuses that rate).  The cpal callback copies each block, pushes
//! it onto a thread-safe queue and appends its RMS to a short rolling
//! window — nothing else runs on the audio thread.
//!
//! The interesting operation is [`AudioCapture::stop`]: releasing the hotkey
//! mid-phrase would clip the last one or two words, so `stop` keeps polling
//! the queue for a duration-tiered tail budget and cuts out early once real
//! silence shows up in the freshly arrived blocks.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::level::{percentile, rms};
use super::resample::{downmix_to_mono, resample_to_16k};

/// Sample rate delivered to the rest of the pipeline.
pub const SAMPLE_RATE: u32 = 16_000;
/// Requested block size: 512 samples ≈ 32 ms at 16 kHz.
pub const BLOCK_SIZE: u32 = 512;

/// Default tail captured after key-up when the recording is short.
pub const TRAILING_CAPTURE_MS: u64 = 280;
/// Minimum tail before quiet blocks may end the capture early.
pub const MIN_TRAILING_CAPTURE_MS: u64 = 130;
/// Consecutive quiet blocks that end the tail early.
pub const QUIET_BLOCKS_TO_STOP: u32 = 3;

/// Rolling RMS window length, in blocks (~1 s at 32 ms blocks).
const RMS_WINDOW_BLOCKS: usize = 32;

/// Adaptive silence threshold: scale applied to the 25th percentile of the
/// rolling RMS window, clamped to the floor/ceiling below.  The constants
/// are tuned values carried over from field testing, not derived.
const SILENCE_THRESHOLD_SCALE: f32 = 1.8;
const SILENCE_THRESHOLD_FLOOR: f32 = 0.0032;
const SILENCE_THRESHOLD_CEILING: f32 = 0.02;
/// Threshold used when no RMS history exists yet.
const SILENCE_THRESHOLD_DEFAULT: f32 = 0.004;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or running audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// Tail budget tiers
// ---------------------------------------------------------------------------

/// Tail budget in milliseconds for a recording of `duration_s` seconds.
///
/// Long dictation clips more easily at hotkey release, so longer recordings
/// get a longer tail.
pub fn trailing_budget_ms(duration_s: f32) -> u64 {
    if duration_s >= 180.0 {
        1100
    } else if duration_s >= 120.0 {
        960
    } else if duration_s >= 60.0 {
        820
    } else if duration_s >= 30.0 {
        700
    } else if duration_s >= 14.0 {
        520
    } else if duration_s >= 8.0 {
        420
    } else if duration_s >= 4.0 {
        340
    } else {
        TRAILING_CAPTURE_MS
    }
}

/// Minimum tail (before quiet blocks may stop the capture) for a recording
/// of `duration_s` seconds.
pub fn min_trailing_budget_ms(duration_s: f32) -> u64 {
    if duration_s >= 120.0 {
        420
    } else if duration_s >= 60.0 {
        340
    } else if duration_s >= 20.0 {
        260
    } else {
        MIN_TRAILING_CAPTURE_MS
    }
}

/// Adaptive quiet threshold from the rolling RMS history.
fn silence_threshold_from(recent_rms: &[f32]) -> f32 {
    if recent_rms.is_empty() {
        return SILENCE_THRESHOLD_DEFAULT;
    }
    let baseline = percentile(recent_rms, 25.0);
    (baseline * SILENCE_THRESHOLD_SCALE)
        .clamp(SILENCE_THRESHOLD_FLOOR, SILENCE_THRESHOLD_CEILING)
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone capture with a FIFO block queue and rolling loudness window.
///
/// Single-consumer: exactly one thread (the coordinator) calls
/// [`get_chunk`](Self::get_chunk) / [`stop`](Self::stop).  The cpal callback
/// is the only producer.
pub struct AudioCapture {
    stream: Option<cpal::Stream>,
    queue: Option<Receiver<Vec<f32>>>,
    started_at: Option<Instant>,
    recent_rms: Arc<Mutex<VecDeque<f32>>>,
}

impl AudioCapture {
    pub fn new() -> Self {
        Self {
            stream: None,
            queue: None,
            started_at: None,
            recent_rms: Arc::new(Mutex::new(VecDeque::with_capacity(RMS_WINDOW_BLOCKS))),
        }
    }

    /// Open the input stream and start queueing blocks.
    ///
    /// Tries a 16 kHz mono `f32` configuration first; if the device rejects
    /// it, falls back to the device default and converts every block in the
    /// callback.
    ///
    /// # Errors
    ///
    /// [`CaptureError::NoDevice`] when no input device exists, or the
    /// underlying cpal error when the stream cannot be built or started.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let (tx, rx) = std::sync::mpsc::channel::<Vec<f32>>();
        self.recent_rms.lock().unwrap().clear();

        let desired = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Fixed(BLOCK_SIZE),
        };

        let stream = match self.build_stream(&device, &desired, 1, SAMPLE_RATE, tx.clone()) {
            Ok(stream) => stream,
            Err(e) => {
                log::info!("16 kHz input config rejected ({e}); using device default");
                let supported = device.default_input_config()?;
                let channels = supported.channels();
                let sample_rate = supported.sample_rate().0;
                let config: cpal::StreamConfig = supported.into();
                self.build_stream(&device, &config, channels, sample_rate, tx)?
            }
        };

        stream.play()?;
        self.stream = Some(stream);
        self.queue = Some(rx);
        self.started_at = Some(Instant::now());
        log::info!("Audio capture started");
        Ok(())
    }

    fn build_stream(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        channels: u16,
        sample_rate: u32,
        tx: Sender<Vec<f32>>,
    ) -> Result<cpal::Stream, CaptureError> {
        let recent_rms = Arc::clone(&self.recent_rms);

        let stream = device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let block = if channels == 1 && sample_rate == SAMPLE_RATE {
                    data.to_vec()
                } else {
                    let mono = downmix_to_mono(data, channels);
                    resample_to_16k(&mono, sample_rate)
                };
                if block.is_empty() {
                    return;
                }
                if let Ok(mut window) = recent_rms.lock() {
                    if window.len() == RMS_WINDOW_BLOCKS {
                        window.pop_front();
                    }
                    window.push_back(rms(&block));
                }
                // Ignore send errors; the receiver may have been dropped.
                let _ = tx.send(block);
            },
            |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
            },
            None,
        )?;

        Ok(stream)
    }

    /// Pop one queued block, waiting up to `timeout`.  `None` on timeout or
    /// when capture has never started.
    pub fn get_chunk(&self, timeout: Duration) -> Option<Vec<f32>> {
        let queue = self.queue.as_ref()?;
        match queue.recv_timeout(timeout) {
            Ok(block) => Some(block),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Whether the input stream is currently open.
    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Discard all queued blocks without closing the stream.
    pub fn drain(&self) {
        if let Some(queue) = &self.queue {
            while queue.try_recv().is_ok() {}
        }
    }

    /// Stop recording and return all remaining audio, concatenated in
    /// arrival order.
    ///
    /// Before closing the stream, a tail window of up to
    /// `trailing_capture_ms` (tiered by recording duration when `None`) is
    /// polled so the final words survive an early key release.  The tail
    /// ends as soon as [`QUIET_BLOCKS_TO_STOP`] consecutive blocks fall at
    /// or below the adaptive silence threshold — but never before the
    /// duration-tiered minimum has elapsed.
    pub fn stop(&mut self, trailing_capture_ms: Option<u64>) -> Vec<f32> {
        let mut blocks: Vec<Vec<f32>> = Vec::new();
        self.drain_into(&mut blocks);

        let duration_s = self
            .started_at
            .map(|t| t.elapsed().as_secs_f32())
            .unwrap_or(0.0);
        let budget_ms = trailing_capture_ms.unwrap_or_else(|| trailing_budget_ms(duration_s));
        let min_ms = min_trailing_budget_ms(duration_s);

        if self.stream.is_some() {
            let threshold = silence_threshold_from(
                self.recent_rms
                    .lock()
                    .map(|w| w.iter().copied().collect::<Vec<f32>>())
                    .unwrap_or_default()
                    .as_slice(),
            );
            if let Some(queue) = &self.queue {
                blocks.extend(collect_trailing_blocks(queue, budget_ms, min_ms, threshold));
            }
            // Dropping the stream stops the underlying hardware capture.
            self.stream = None;
            self.started_at = None;
        }

        self.drain_into(&mut blocks);
        self.queue = None;

        let total: usize = blocks.iter().map(Vec::len).sum();
        let mut out = Vec::with_capacity(total);
        for block in blocks {
            out.extend_from_slice(&block);
        }
        out
    }

    fn drain_into(&self, blocks: &mut Vec<Vec<f32>>) {
        if let Some(queue) = &self.queue {
            loop {
                match queue.try_recv() {
                    Ok(block) => blocks.push(block),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
        }
    }
}

impl Default for AudioCapture {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Trailing-tail poll loop
// ---------------------------------------------------------------------------

/// Poll `queue` for up to `budget_ms`, keeping every block that arrives.
///
/// Once `min_ms` has elapsed, quiet blocks (RMS at or below
/// `quiet_threshold`) and empty polls count toward the early-exit counter;
/// a loud block resets it.
fn collect_trailing_blocks(
    queue: &Receiver<Vec<f32>>,
    budget_ms: u64,
    min_ms: u64,
    quiet_threshold: f32,
) -> Vec<Vec<f32>> {
    if budget_ms == 0 {
        return Vec::new();
    }

    let start = Instant::now();
    let deadline = start + Duration::from_millis(budget_ms);
    let poll_timeout = Duration::from_millis((BLOCK_SIZE as u64 * 1000 / SAMPLE_RATE as u64).max(10));
    let min_elapsed = Duration::from_millis(min_ms);

    let mut quiet_blocks: u32 = 0;
    let mut blocks: Vec<Vec<f32>> = Vec::new();

    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let timeout = poll_timeout.min(deadline - now);

        match queue.recv_timeout(timeout) {
            Ok(block) => {
                let level = rms(&block);
                blocks.push(block);
                if level <= quiet_threshold {
                    if start.elapsed() >= min_elapsed {
                        quiet_blocks += 1;
                        if quiet_blocks >= QUIET_BLOCKS_TO_STOP {
                            break;
                        }
                    }
                } else {
                    quiet_blocks = 0;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if start.elapsed() >= min_elapsed {
                    quiet_blocks += 1;
                    if quiet_blocks >= QUIET_BLOCKS_TO_STOP {
                        break;
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    blocks
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Tail budget tiers -------------------------------------------------

    #[test]
    fn short_recordings_use_default_tail() {
        assert_eq!(trailing_budget_ms(1.0), TRAILING_CAPTURE_MS);
        assert_eq!(trailing_budget_ms(3.9), TRAILING_CAPTURE_MS);
    }

    #[test]
    fn sixteen_second_recording_gets_roughly_half_second_tail() {
        let tail = trailing_budget_ms(16.0);
        assert!((400..=600).contains(&tail), "tail = {tail}");
    }

    #[test]
    fn multi_minute_recording_gets_roughly_one_second_tail() {
        let tail = trailing_budget_ms(130.0);
        assert!((900..=1100).contains(&tail), "tail = {tail}");
    }

    #[test]
    fn tail_budget_is_monotonic_in_duration() {
        let durations = [0.0_f32, 4.0, 8.0, 14.0, 30.0, 60.0, 120.0, 180.0, 600.0];
        let mut prev = 0;
        for d in durations {
            let tail = trailing_budget_ms(d);
            assert!(tail >= prev, "tail dropped at {d}s");
            prev = tail;
        }
    }

    #[test]
    fn minimum_tail_scales_with_duration() {
        assert_eq!(min_trailing_budget_ms(2.0), MIN_TRAILING_CAPTURE_MS);
        assert_eq!(min_trailing_budget_ms(25.0), 260);
        assert_eq!(min_trailing_budget_ms(70.0), 340);
        assert_eq!(min_trailing_budget_ms(150.0), 420);
    }

    #[test]
    fn minimum_tail_never_exceeds_budget_tier() {
        for d in [0.0_f32, 5.0, 10.0, 20.0, 40.0, 80.0, 160.0, 300.0] {
            assert!(min_trailing_budget_ms(d) <= trailing_budget_ms(d));
        }
    }

    // ---- Adaptive silence threshold ----------------------------------------

    #[test]
    fn threshold_without_history_uses_default() {
        assert!((silence_threshold_from(&[]) - SILENCE_THRESHOLD_DEFAULT).abs() < 1e-7);
    }

    #[test]
    fn threshold_is_clamped_to_floor() {
        // Near-zero ambient noise: 25th percentile × 1.8 would be ~0.
        let quiet = vec![0.0001_f32; 32];
        assert!((silence_threshold_from(&quiet) - SILENCE_THRESHOLD_FLOOR).abs() < 1e-7);
    }

    #[test]
    fn threshold_is_clamped_to_ceiling() {
        let loud = vec![0.5_f32; 32];
        assert!((silence_threshold_from(&loud) - SILENCE_THRESHOLD_CEILING).abs() < 1e-7);
    }

    #[test]
    fn threshold_tracks_quiet_baseline() {
        // Baseline ~0.003 → threshold 0.0054, inside the clamp range.
        let window = vec![0.003_f32; 32];
        let t = silence_threshold_from(&window);
        assert!((t - 0.003 * SILENCE_THRESHOLD_SCALE).abs() < 1e-6);
    }

    // ---- Trailing poll loop ------------------------------------------------

    #[test]
    fn tail_keeps_queued_blocks() {
        let (tx, rx) = std::sync::mpsc::channel::<Vec<f32>>();
        tx.send(vec![0.5_f32; 512]).unwrap();
        tx.send(vec![0.5_f32; 512]).unwrap();

        let blocks = collect_trailing_blocks(&rx, 120, 0, 0.004);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn tail_exits_early_on_silence() {
        let (tx, rx) = std::sync::mpsc::channel::<Vec<f32>>();
        // Keep the sender alive so the loop sees timeouts, not disconnects.
        let _keep = tx;

        let start = Instant::now();
        let blocks = collect_trailing_blocks(&rx, 2_000, 40, 0.004);
        let elapsed = start.elapsed();

        assert!(blocks.is_empty());
        // 3 quiet polls after the 40 ms minimum — far below the 2 s budget.
        assert!(elapsed < Duration::from_millis(1_000), "elapsed = {elapsed:?}");
    }

    #[test]
    fn loud_blocks_reset_the_quiet_counter() {
        let (tx, rx) = std::sync::mpsc::channel::<Vec<f32>>();
        // Two quiet blocks, one loud one, then silence.
        tx.send(vec![0.001_f32; 512]).unwrap();
        tx.send(vec![0.001_f32; 512]).unwrap();
        tx.send(vec![0.5_f32; 512]).unwrap();
        let _keep = tx;

        let blocks = collect_trailing_blocks(&rx, 400, 0, 0.004);
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn zero_budget_returns_immediately() {
        let (_tx, rx) = std::sync::mpsc::channel::<Vec<f32>>();
        assert!(collect_trailing_blocks(&rx, 0, 0, 0.004).is_empty());
    }

    // ---- Capture state -----------------------------------------------------

    #[test]
    fn fresh_capture_is_inactive_and_returns_no_chunks() {
        let capture = AudioCapture::new();
        assert!(!capture.is_active());
        assert!(capture.get_chunk(Duration::from_millis(1)).is_none());
    }

    #[test]
    fn stop_without_start_returns_empty_waveform() {
        let mut capture = AudioCapture::new();
        assert!(capture.stop(None).is_empty());
    }
}
