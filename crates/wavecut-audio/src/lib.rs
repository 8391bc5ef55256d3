//! Wavecut Audio - Realtime playback
//!
//! Everything between a `Sample` and the speaker:
//! - `reader`: the head read/interpolation/scrub algorithm
//! - `mixer`: the lazy background mixer thread and the `Playback` API
//! - `device`: the output sink trait with null and cpal backends
//! - `ring`: the SPSC ring feeding the cpal callback

pub mod device;
pub mod mixer;
pub mod reader;
pub mod ring;

pub use device::{CpalDevice, Device, DeviceFormat, DeviceOpener, NullDevice};
pub use mixer::{mix_into, Playback};
pub use reader::read_head;
pub use ring::AudioRing;
