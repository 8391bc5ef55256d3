//! The playback engine.
//!
//! One background mixer thread serves every playing sample. It is
//! spawned lazily by the first `play`, opens the output device on its
//! own thread (cpal streams are thread-affine), and exits on its own
//! after a configured run of all-silent iterations.
//!
//! Each iteration: snapshot the registry, read one buffer from every
//! head that is going, additively channel-convert the per-head buffers
//! into the device buffer, write, then correct each head's externally
//! reported offset against the device's actual playback position.
//!
//! The thread-alive flag is only read or written under the mixer state
//! lock; the exiting thread re-scans for going heads under that same
//! lock, so a concurrent `play` either sees the thread still alive or
//! spawns a fresh one. A head is never orphaned.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::bounded;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use wavecut_core::{EngineConfig, MixerConfig, Result, ScrubTuning, WavecutError};
use wavecut_edit::{Sample, SampleRegistry};

use crate::device::{DeviceFormat, DeviceOpener};
use crate::reader::read_head;

struct MixerState {
    thread_alive: bool,
}

/// Handle to the playback engine.
pub struct Playback {
    registry: Arc<SampleRegistry>,
    config: EngineConfig,
    opener: DeviceOpener,
    state: Arc<Mutex<MixerState>>,
}

impl Playback {
    pub fn new(registry: Arc<SampleRegistry>, config: EngineConfig, opener: DeviceOpener) -> Self {
        Self {
            registry,
            config,
            opener,
            state: Arc::new(Mutex::new(MixerState { thread_alive: false })),
        }
    }

    /// Start a sample playing from its current offset.
    ///
    /// Device errors propagate and the head's going flag reverts, so a
    /// failed play leaves the sample exactly as it was.
    pub fn play(&self, sample: &Arc<Sample>) -> Result<()> {
        {
            let tempo = sample.tempo();
            let channels = sample.channels();
            let mut head = sample.play_head();
            if head.going {
                return Ok(());
            }
            // Seed delta at its target so playback starts at pitch
            // instead of easing up from silence.
            let direction = if head.reverse { -1.0 } else { 1.0 };
            head.delta = head.rate * tempo * direction;
            head.reset_smoothing(channels);
            head.going = true;
        }
        if let Err(e) = self.ensure_thread() {
            sample.play_head().going = false;
            return Err(e);
        }
        Ok(())
    }

    /// Play only the selected regions, with a free-run pre-roll before
    /// the first one and a post-roll after each.
    pub fn preview(&self, sample: &Arc<Sample>) -> Result<()> {
        let roll = {
            let rate = sample.sample_rate() as f64;
            self.config.scrub.preview_roll_secs * rate
        };
        let first = sample.content().selections.first();
        let first = match first {
            Some(region) => region,
            None => return Err(WavecutError::InvalidParameter("nothing selected".into())),
        };
        {
            let mut head = sample.play_head();
            head.restricted = true;
            head.previewing = true;
            head.roll_frames_left = roll;
            head.offset = (first.start as f64 - roll).max(0.0);
        }
        self.play(sample)
    }

    /// Stop the head in place, keeping the offset.
    pub fn pause(&self, sample: &Sample) {
        let mut head = sample.play_head();
        head.going = false;
        head.resume_after_edit = false;
    }

    /// Stop and rewind to frame zero, dropping scrub and preview modes.
    pub fn stop(&self, sample: &Sample) {
        let mut head = sample.play_head();
        head.going = false;
        head.resume_after_edit = false;
        head.scrubbing = false;
        head.scrub_dragging = false;
        head.previewing = false;
        head.stop_offset = None;
        head.delta = 0.0;
        head.offset = 0.0;
        head.reported_offset = 0.0;
    }

    pub fn set_rate(&self, sample: &Sample, rate: f64) {
        sample.play_head().rate = rate;
    }

    pub fn set_gain(&self, sample: &Sample, gain: f32) {
        sample.play_head().gain = gain;
    }

    pub fn set_looping(&self, sample: &Sample, looping: bool) {
        sample.play_head().looping = looping;
    }

    pub fn set_reverse(&self, sample: &Sample, reverse: bool) {
        sample.play_head().reverse = reverse;
    }

    pub fn set_mute(&self, sample: &Sample, mute: bool) {
        sample.play_head().mute = mute;
    }

    pub fn set_monitor(&self, sample: &Sample, monitor: bool) {
        sample.play_head().monitor = monitor;
    }

    pub fn set_restricted(&self, sample: &Sample, restricted: bool) {
        sample.play_head().restricted = restricted;
    }

    pub fn set_stop_offset(&self, sample: &Sample, stop: Option<usize>) {
        sample.play_head().stop_offset = stop;
    }

    /// Move the head. A user-driven move while scrubbing retargets the
    /// rubber band instead of teleporting the head.
    pub fn set_offset(&self, sample: &Sample, frame: usize, by_user: bool) {
        let channels = sample.channels();
        let mut head = sample.play_head();
        if by_user && head.scrubbing {
            head.user_offset = frame as f64;
        } else {
            head.offset = frame as f64;
            head.reported_offset = frame as f64;
            head.reset_smoothing(channels);
        }
    }

    /// Enter or leave scrub mode. `dragging` distinguishes an active
    /// pointer drag from the released, decelerating state.
    pub fn set_scrubbing(&self, sample: &Sample, scrubbing: bool, dragging: bool) {
        let channels = sample.channels();
        let mut head = sample.play_head();
        if scrubbing && !head.scrubbing {
            head.user_offset = head.offset;
            head.reset_smoothing(channels);
        }
        head.scrubbing = scrubbing;
        head.scrub_dragging = scrubbing && dragging;
        if !scrubbing {
            head.delta = 0.0;
        }
    }

    /// Offset as last corrected against the device position, suitable
    /// for drawing a play cursor.
    pub fn reported_offset(&self, sample: &Sample) -> f64 {
        sample.play_head().reported_offset
    }

    pub fn is_going(&self, sample: &Sample) -> bool {
        sample.play_head().going
    }

    /// Whether the mixer thread is currently running.
    pub fn is_active(&self) -> bool {
        self.state.lock().thread_alive
    }

    /// Spawn the mixer thread if none is alive, blocking until its
    /// device is open. Device-open failure is reported here.
    fn ensure_thread(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.thread_alive {
            return Ok(());
        }

        let (ready_tx, ready_rx) = bounded::<Result<DeviceFormat>>(1);
        let registry = Arc::clone(&self.registry);
        let shared = Arc::clone(&self.state);
        let opener = Arc::clone(&self.opener);
        let mixer_cfg = self.config.mixer.clone();
        let scrub_cfg = self.config.scrub.clone();

        std::thread::Builder::new()
            .name("wavecut-mixer".into())
            .spawn(move || {
                mixer_thread(registry, shared, opener, mixer_cfg, scrub_cfg, ready_tx)
            })
            .map_err(|e| WavecutError::Internal(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(format)) => {
                debug!(?format, "mixer thread ready");
                state.thread_alive = true;
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(WavecutError::Device("mixer thread died during open".into())),
        }
    }
}

fn mixer_thread(
    registry: Arc<SampleRegistry>,
    state: Arc<Mutex<MixerState>>,
    opener: DeviceOpener,
    config: MixerConfig,
    tuning: ScrubTuning,
    ready_tx: crossbeam_channel::Sender<Result<DeviceFormat>>,
) {
    let mut device = match opener() {
        Ok(d) => d,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    let requested = DeviceFormat {
        channels: config.channels,
        sample_rate: config.sample_rate,
        buffer_frames: config.buffer_frames,
    };
    let format = match device.setup(requested) {
        Ok(f) => f,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    let _ = ready_tx.send(Ok(format));
    info!(
        channels = format.channels,
        sample_rate = format.sample_rate,
        "mixer thread started"
    );

    let frames = format.buffer_frames;
    let device_channels = format.channels as usize;
    let mut mix_buf = vec![0.0f32; frames * device_channels];
    let mut head_buf: Vec<f32> = Vec::new();
    let buffer_period = Duration::from_secs_f64(frames as f64 / format.sample_rate as f64);

    let mut silent_run = 0u32;
    let mut total_written: u64 = 0;

    loop {
        let active: Vec<Arc<Sample>> = registry
            .snapshot()
            .into_iter()
            .filter(|s| s.play_head().going)
            .collect();

        if active.is_empty() {
            silent_run += 1;
            if silent_run >= config.silent_iterations {
                // Exit only if nothing started going while we idled.
                let mut state = state.lock();
                let any_going = registry.snapshot().iter().any(|s| s.play_head().going);
                if !any_going {
                    state.thread_alive = false;
                    drop(state);
                    device.close();
                    info!("mixer thread stopped");
                    return;
                }
                silent_run = 0;
            }
            std::thread::sleep(buffer_period);
            continue;
        }
        silent_run = 0;

        if let Err(e) = device.wait_ready() {
            warn!(error = %e, "device wait failed, stopping playback");
            break;
        }
        mix_buf.fill(0.0);

        for sample in &active {
            let channels = sample.channels() as usize;
            head_buf.resize(frames * channels, 0.0);
            let live = read_head(
                sample,
                &mut head_buf,
                frames,
                format.sample_rate,
                &tuning,
            );
            if live > 0 {
                mix_into(&mut mix_buf, device_channels, &head_buf, channels, live);
            }
        }

        match device.write(&mix_buf) {
            Ok(written) => total_written += written as u64,
            Err(e) => {
                warn!(error = %e, "device write failed, stopping playback");
                break;
            }
        }

        // Drift-correct the offsets the UI sees: back each head up by
        // the audio still queued between mixer and speaker.
        if let Some(played) = device.query_offset() {
            let lag = total_written.saturating_sub(played) as f64;
            for sample in &active {
                let native = sample.sample_rate() as f64;
                let mut head = sample.play_head();
                let pitch = native / format.sample_rate as f64;
                head.reported_offset = head.offset - lag * head.delta * pitch;
            }
        }
    }

    // Failure path: silence every head and retire.
    for sample in registry.snapshot() {
        sample.play_head().going = false;
    }
    state.lock().thread_alive = false;
    device.close();
    info!("mixer thread stopped after device failure");
}

/// Additively fold an interleaved head buffer into the device buffer,
/// converting channel counts: mono fans out to every output channel,
/// any count folds down to mono by averaging, otherwise corresponding
/// channels copy across and the excess on either side is dropped.
pub fn mix_into(
    dst: &mut [f32],
    dst_channels: usize,
    src: &[f32],
    src_channels: usize,
    frames: usize,
) {
    debug_assert!(dst.len() >= frames * dst_channels);
    debug_assert!(src.len() >= frames * src_channels);

    if src_channels == 1 {
        for frame in 0..frames {
            let v = src[frame];
            for ch in 0..dst_channels {
                dst[frame * dst_channels + ch] += v;
            }
        }
    } else if dst_channels == 1 {
        let scale = 1.0 / src_channels as f32;
        for frame in 0..frames {
            let base = frame * src_channels;
            let sum: f32 = src[base..base + src_channels].iter().sum();
            dst[frame] += sum * scale;
        }
    } else {
        let shared = src_channels.min(dst_channels);
        for frame in 0..frames {
            for ch in 0..shared {
                dst[frame * dst_channels + ch] += src[frame * src_channels + ch];
            }
        }
    }
}
