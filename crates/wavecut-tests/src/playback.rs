//! Playback engine against the edit engine: pause-for-edit, full
//! play-through on the null device, preview over selections.

use std::sync::Arc;
use std::time::{Duration, Instant};

use wavecut_audio::{NullDevice, Playback};
use wavecut_core::{EngineConfig, MixerConfig, Region, SoundData};
use wavecut_edit::{scheduler, Sample, SampleRegistry};

use crate::support::{pump_until_started, sine_sample, GatedDelete};

const WAIT: Duration = Duration::from_secs(10);

fn engine() -> (Arc<SampleRegistry>, Playback) {
    let registry = Arc::new(SampleRegistry::new());
    let playback = Playback::new(
        Arc::clone(&registry),
        EngineConfig {
            mixer: MixerConfig {
                buffer_frames: 128,
                silent_iterations: 3,
                ..Default::default()
            },
            ..Default::default()
        },
        NullDevice::opener(false),
    );
    (registry, playback)
}

fn spin_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let until = Instant::now() + deadline;
    while Instant::now() < until {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn test_alloc_edit_pauses_and_resumes_playback() {
    let sample = sine_sample(44100, 1);
    sample.play_head().going = true;

    let (started_tx, started_rx) = crossbeam_channel::bounded(1);
    let (release_tx, release_rx) = crossbeam_channel::bounded(1);
    scheduler::schedule(
        &sample,
        "gated cut",
        Box::new(GatedDelete::new(0, 100, started_tx, release_rx)),
    );
    pump_until_started(&sample, &started_rx, WAIT);

    {
        let head = sample.play_head();
        assert!(!head.going);
        assert!(head.resume_after_edit);
    }

    release_tx.send(()).unwrap();
    assert!(scheduler::wait_idle(&sample, WAIT));
    assert!(sample.play_head().going);
}

#[test]
fn test_play_through_finishes_and_mixer_retires() {
    let (registry, playback) = engine();
    // Short sample so the unpaced null device drains it immediately.
    let sample = registry.add(Sample::new(SoundData::silence(1024, 2, 44100)));

    playback.play(&sample).unwrap();
    assert!(playback.is_active());

    assert!(
        spin_until(WAIT, || !playback.is_going(&sample)),
        "playback never finished"
    );
    assert!(
        spin_until(WAIT, || !playback.is_active()),
        "mixer thread never retired"
    );
    // The head stopped at the end of the data.
    assert!(sample.play_head().offset >= 1023.0);
}

#[test]
fn test_play_is_idempotent_while_going() {
    let (registry, playback) = engine();
    let sample = registry.add(Sample::new(SoundData::silence(441_000, 2, 44100)));

    playback.play(&sample).unwrap();
    playback.play(&sample).unwrap();
    assert!(playback.is_going(&sample));
    playback.stop(&sample);
    assert_eq!(sample.play_head().offset, 0.0);
}

#[test]
fn test_preview_plays_selection_then_stops() {
    let (registry, playback) = engine();
    let sample = registry.add(Sample::new(SoundData::silence(44100, 1, 44100)));
    sample.content().selections.add(Region::new(1000, 3000));

    playback.preview(&sample).unwrap();
    {
        let head = sample.play_head();
        assert!(head.restricted);
        assert!(head.previewing);
        // Pre-roll starts ahead of the selection.
        assert!(head.offset < 1000.0);
    }
    assert!(
        spin_until(WAIT, || !playback.is_going(&sample)),
        "preview never finished"
    );
}

#[test]
fn test_preview_without_selection_is_rejected() {
    let (registry, playback) = engine();
    let sample = registry.add(Sample::new(SoundData::silence(44100, 1, 44100)));
    assert!(playback.preview(&sample).is_err());
    assert!(!playback.is_going(&sample));
}

#[test]
fn test_removed_sample_stops_playing_but_stays_valid() {
    let (registry, playback) = engine();
    let sample = registry.add(Sample::new(SoundData::silence(441_000, 1, 44100)));
    playback.play(&sample).unwrap();

    let removed = registry.remove(sample.id()).unwrap();
    // The mixer no longer sees it; the Arc keeps the data alive.
    assert_eq!(removed.frames(), 441_000);
    playback.pause(&removed);
    assert!(spin_until(WAIT, || !playback.is_active()));
}
