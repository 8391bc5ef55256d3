//! Wavecut - Headless demo
//!
//! Exercises the engine end to end without a UI: loads a generated
//! tone, runs a few edits through the scheduler, undoes one, then
//! plays the result. Pass `--null-audio` to route playback into the
//! paced null sink instead of the default output device.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use wavecut_audio::{CpalDevice, NullDevice, Playback};
use wavecut_core::{EngineConfig, Region, SoundData};
use wavecut_edit::ops::{DeleteRange, FadeRange, Normalise};
use wavecut_edit::{scheduler, EditEvent, Sample, SampleRegistry};

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Wavecut starting...");

    let config = EngineConfig::default();
    let registry = Arc::new(SampleRegistry::new());
    let null_audio = std::env::args().any(|a| a == "--null-audio");
    let opener = if null_audio {
        NullDevice::opener(true)
    } else {
        CpalDevice::opener()
    };
    let playback = Playback::new(Arc::clone(&registry), config.clone(), opener);

    // Two seconds of 440 Hz sine, stereo.
    let sample_rate = 44100u32;
    let frames = sample_rate as usize * 2;
    let mut data = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let t = i as f64 / sample_rate as f64;
        let v = (t * 440.0 * std::f64::consts::TAU).sin() as f32 * 0.25;
        data.push(v);
        data.push(v);
    }
    let sample = registry.add(Sample::with_config(
        SoundData::from_interleaved(data, 2, sample_rate)?,
        &config,
    ));

    let (events_tx, events_rx) = crossbeam_channel::unbounded::<EditEvent>();
    sample.set_event_sender(events_tx);

    // A filter, an alloc-class cut, and a fade, all queued at once.
    scheduler::schedule(&sample, "Normalise", Box::new(Normalise::new(None, 0.9)));
    scheduler::schedule(
        &sample,
        "Delete 0.5s",
        Box::new(DeleteRange::new(frames / 4, sample_rate as usize / 2)),
    );
    scheduler::schedule(
        &sample,
        "Fade out",
        Box::new(FadeRange::new(frames / 2, frames / 4, 1.0, 0.0)),
    );

    if !scheduler::wait_idle(&sample, Duration::from_secs(30)) {
        anyhow::bail!("edit queue did not drain");
    }
    while let Ok(event) = events_rx.try_recv() {
        info!(?event, "edit event");
    }
    info!(
        history = scheduler::history_len(&sample),
        frames = sample.frames(),
        "edits applied"
    );

    // Take the cut back out.
    scheduler::undo_current(&sample);
    scheduler::undo_current(&sample);
    if !scheduler::wait_idle(&sample, Duration::from_secs(30)) {
        anyhow::bail!("undo did not finish");
    }
    info!(
        undo = ?scheduler::undo_description(&sample),
        redo = ?scheduler::redo_description(&sample),
        frames = sample.frames(),
        "after undo"
    );

    // Preview the first half-second, then let the mixer retire.
    sample.content().selections.add(Region::new(0, frames / 4));
    playback.preview(&sample)?;
    while playback.is_going(&sample) {
        std::thread::sleep(Duration::from_millis(20));
    }
    info!(
        reported = playback.reported_offset(&sample),
        "playback finished"
    );
    while playback.is_active() {
        std::thread::sleep(Duration::from_millis(20));
    }

    Ok(())
}
