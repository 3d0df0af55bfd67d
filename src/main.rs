//! Application entry point — whisperkey.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] and the user dictionary.
//! 3. Create the tokio runtime (refiner HTTP + model downloads).
//! 4. Ensure the VAD model (pinned) and the configured STT model exist.
//! 5. Build the pipeline and warm it up in the background.
//! 6. Spawn the hotkey listener thread.
//! 7. Run the coordinator loop on the main thread until shutdown.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use whisperkey::{
    config::{AppConfig, AppPaths},
    coordinator::DictationCoordinator,
    dictionary::Dictionary,
    hotkey::{parse_hotkey, HotkeyEvent, HotkeyListener},
    inject::TextInserter,
    models::ModelCache,
    pipeline::TranscriptionPipeline,
    signals::{AppSignal, SignalHub},
};

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("whisperkey starting up");

    // 2. Configuration + dictionary
    let config = AppConfig::load();
    let dictionary = Arc::new(Mutex::new(Dictionary::load(&config.dictionary_file())));

    // 3. Tokio runtime (2 workers: refiner call + model download)
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Signal hub; external UI collaborators subscribe here.  The core
    //    itself logs status lines so a headless run is observable.
    let signals = SignalHub::new();
    {
        let mut rx = signals.subscribe();
        runtime.spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(AppSignal::StatusChanged(text)) => log::info!("Status: {text}"),
                    Ok(AppSignal::ErrorOccurred { title, message }) => {
                        log::error!("{title}: {message}")
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
        });
    }

    // 5. Model cache: the VAD model is mandatory (and pinned); the STT
    //    model download is best-effort — the router falls back to any
    //    cached candidate.
    let cache = ModelCache::new(AppPaths::new().models_dir);
    signals.emit(AppSignal::ModelLoading("silero-vad".into()));
    runtime
        .block_on(cache.ensure_vad_model())
        .map_err(|e| anyhow::anyhow!("VAD model unavailable: {e}"))?;
    signals.emit(AppSignal::ModelLoaded("silero-vad".into()));

    signals.emit(AppSignal::ModelLoading(config.stt_model.clone()));
    if let Err(e) = runtime.block_on(cache.ensure_stt_model(&config.stt_model)) {
        log::warn!(
            "Could not fetch STT model {}: {e}; relying on cached models",
            config.stt_model
        );
    } else {
        signals.emit(AppSignal::ModelLoaded(config.stt_model.clone()));
    }

    // 6. Pipeline + inserter
    let pipeline = Arc::new(TranscriptionPipeline::from_config(
        &config,
        &cache,
        Arc::clone(&dictionary),
        runtime.handle().clone(),
    ));
    let inserter = Arc::new(TextInserter::new(config.restore_clipboard));

    // Warm up in the background so the hotkey is live immediately; the
    // first dictation simply waits on the warm-up if it races it.
    {
        let pipeline = Arc::clone(&pipeline);
        let signals = signals.clone();
        std::thread::Builder::new()
            .name("model-warm-up".into())
            .spawn(move || {
                signals.status("Loading models...");
                match pipeline.warm_up() {
                    Ok(()) => signals.status("Ready"),
                    Err(e) => {
                        log::error!("Model warm-up failed: {e}");
                        signals.error(
                            "Model load failed",
                            "Failed to warm up the transcription models. Check model downloads.",
                        );
                    }
                }
            })
            .expect("failed to spawn warm-up thread");
    }

    // 7. Hotkey listener thread
    let hotkey = parse_hotkey(&config.hotkey).unwrap_or_else(|| {
        log::warn!("Unknown hotkey {:?}; falling back to right_cmd", config.hotkey);
        rdev::Key::MetaRight
    });
    let (hotkey_tx, hotkey_rx) = mpsc::channel::<HotkeyEvent>(16);
    let _listener = HotkeyListener::start(
        hotkey,
        config.recording_mode,
        config.min_hold_ms,
        300,
        hotkey_tx,
    );
    log::info!("Hotkey listener started ({})", config.hotkey);

    // 8. Coordinator loop — blocks until the listener goes away.
    let coordinator = DictationCoordinator::new(Arc::clone(&pipeline), inserter, signals);
    coordinator.run(hotkey_rx);

    log::info!("Shutting down");
    pipeline.unload_models();
    Ok(())
}
