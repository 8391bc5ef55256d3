//! Output device abstraction.
//!
//! The mixer talks to an abstract sink: it negotiates a format once,
//! then alternates `wait_ready` and `write`. `NullDevice` backs tests
//! and headless runs; `CpalDevice` feeds real hardware through an SPSC
//! ring drained by the cpal callback.
//!
//! cpal streams are not `Send`, so devices are constructed *on* the
//! mixer thread: callers hand the mixer a [`DeviceOpener`] factory
//! instead of a device.

use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, info, warn};

use wavecut_core::{Result, WavecutError};

use crate::ring::AudioRing;

/// Negotiated stream format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFormat {
    pub channels: u16,
    pub sample_rate: u32,
    /// Frames per mixer iteration.
    pub buffer_frames: usize,
}

/// An audio output sink.
///
/// Not `Send`: implementations may own thread-affine handles. The
/// mixer creates and drops the device on its own thread.
pub trait Device {
    /// Negotiate a format. The device may return different channel or
    /// rate values than requested; the mixer adapts to the result.
    fn setup(&mut self, requested: DeviceFormat) -> Result<DeviceFormat>;

    /// Block until the device can absorb roughly one buffer of audio.
    fn wait_ready(&mut self) -> Result<()>;

    /// Queue interleaved samples, returning frames accepted.
    fn write(&mut self, interleaved: &[f32]) -> Result<usize>;

    /// Frames actually played so far, when the backend can tell.
    fn query_offset(&self) -> Option<u64>;

    /// Drop any queued audio.
    fn reset(&mut self);

    fn close(&mut self);
}

/// Factory invoked on the mixer thread to open the output device.
pub type DeviceOpener = std::sync::Arc<dyn Fn() -> Result<Box<dyn Device>> + Send + Sync>;

/// A sink that discards audio.
///
/// Paced mode sleeps in `wait_ready` to approximate real time, so
/// mixer-loop tests see realistic iteration cadence. Unpaced mode
/// never blocks, which keeps tests fast.
pub struct NullDevice {
    paced: bool,
    format: DeviceFormat,
    written_frames: u64,
    started: Option<Instant>,
}

impl NullDevice {
    pub fn new(paced: bool) -> Self {
        Self {
            paced,
            format: DeviceFormat {
                channels: 2,
                sample_rate: 44100,
                buffer_frames: 1024,
            },
            written_frames: 0,
            started: None,
        }
    }

    /// An opener for mixer construction.
    pub fn opener(paced: bool) -> DeviceOpener {
        std::sync::Arc::new(move || Ok(Box::new(NullDevice::new(paced)) as Box<dyn Device>))
    }
}

impl Device for NullDevice {
    fn setup(&mut self, requested: DeviceFormat) -> Result<DeviceFormat> {
        self.format = requested;
        self.written_frames = 0;
        self.started = Some(Instant::now());
        debug!(?requested, "null device open");
        Ok(requested)
    }

    fn wait_ready(&mut self) -> Result<()> {
        if self.paced {
            if let Some(started) = self.started {
                // Sleep until the written audio would have played out.
                let due = Duration::from_secs_f64(
                    self.written_frames as f64 / self.format.sample_rate as f64,
                );
                let elapsed = started.elapsed();
                if due > elapsed {
                    std::thread::sleep(due - elapsed);
                }
            }
        }
        Ok(())
    }

    fn write(&mut self, interleaved: &[f32]) -> Result<usize> {
        let frames = interleaved.len() / self.format.channels as usize;
        self.written_frames += frames as u64;
        Ok(frames)
    }

    fn query_offset(&self) -> Option<u64> {
        let started = self.started?;
        if self.paced {
            let played =
                (started.elapsed().as_secs_f64() * self.format.sample_rate as f64) as u64;
            Some(played.min(self.written_frames))
        } else {
            Some(self.written_frames)
        }
    }

    fn reset(&mut self) {
        self.written_frames = 0;
        self.started = Some(Instant::now());
    }

    fn close(&mut self) {}
}

/// Real output through cpal. The mixer thread pushes into `ring`; the
/// stream callback drains it, zero-filling on underrun.
pub struct CpalDevice {
    stream: Option<cpal::Stream>,
    ring: Option<std::sync::Arc<AudioRing>>,
    format: DeviceFormat,
}

impl CpalDevice {
    pub fn new() -> Self {
        Self {
            stream: None,
            ring: None,
            format: DeviceFormat {
                channels: 2,
                sample_rate: 44100,
                buffer_frames: 1024,
            },
        }
    }

    pub fn opener() -> DeviceOpener {
        std::sync::Arc::new(|| Ok(Box::new(CpalDevice::new()) as Box<dyn Device>))
    }
}

impl Default for CpalDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for CpalDevice {
    fn setup(&mut self, requested: DeviceFormat) -> Result<DeviceFormat> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| WavecutError::Device("no output device".into()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| WavecutError::Device(e.to_string()))?;

        // The hardware dictates channels and rate; the mixer adapts.
        let negotiated = DeviceFormat {
            channels: supported.channels(),
            sample_rate: supported.sample_rate().0,
            buffer_frames: requested.buffer_frames,
        };
        let config = cpal::StreamConfig {
            channels: negotiated.channels,
            sample_rate: supported.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        // Four mixer buffers of slack before write() starts blocking.
        let ring = std::sync::Arc::new(AudioRing::with_capacity(
            negotiated.buffer_frames * negotiated.channels as usize * 4,
        ));
        let callback_ring = std::sync::Arc::clone(&ring);
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let live = callback_ring.pop(data);
                    for sample in &mut data[live..] {
                        *sample = 0.0;
                    }
                },
                |err| warn!(error = %err, "output stream error"),
                None,
            )
            .map_err(|e| WavecutError::Device(e.to_string()))?;
        stream
            .play()
            .map_err(|e| WavecutError::Device(e.to_string()))?;

        info!(
            channels = negotiated.channels,
            sample_rate = negotiated.sample_rate,
            "cpal device open"
        );
        self.stream = Some(stream);
        self.ring = Some(ring);
        self.format = negotiated;
        Ok(negotiated)
    }

    fn wait_ready(&mut self) -> Result<()> {
        let ring = self
            .ring
            .as_ref()
            .ok_or_else(|| WavecutError::Device("device not set up".into()))?;
        let needed = self.format.buffer_frames * self.format.channels as usize;
        while ring.space() < needed {
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    fn write(&mut self, interleaved: &[f32]) -> Result<usize> {
        let ring = self
            .ring
            .as_ref()
            .ok_or_else(|| WavecutError::Device("device not set up".into()))?;
        let mut pushed = 0;
        while pushed < interleaved.len() {
            let n = ring.push(&interleaved[pushed..]);
            pushed += n;
            if n == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        Ok(pushed / self.format.channels as usize)
    }

    fn query_offset(&self) -> Option<u64> {
        let ring = self.ring.as_ref()?;
        Some(ring.consumed() / self.format.channels as u64)
    }

    fn reset(&mut self) {
        if let Some(ring) = self.ring.as_ref() {
            ring.clear();
        }
    }

    fn close(&mut self) {
        debug!("cpal device close");
        self.stream = None;
        self.ring = None;
    }
}
