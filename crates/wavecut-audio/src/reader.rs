//! The playback-head read algorithm.
//!
//! `read_head` pulls one buffer of interpolated audio out of a sample,
//! advancing its head. It takes the play lock and then the data lock
//! (always in that order), holds both for one buffer, and leaves all
//! cursor state in `HeadState` for the next call.
//!
//! Motion model: the per-frame advance `delta` never steps, it eases
//! exponentially toward its target. During normal playback the target
//! is `rate * tempo` (negated in reverse). While scrubbing the target
//! is proportional to the remaining distance to the user's position,
//! with a faster ease while the pointer is actively dragging and a slow
//! glide after release. The decelerating head is clamped so it never
//! overshoots the target frame.

use wavecut_core::ScrubTuning;
use wavecut_edit::Sample;

/// Fraction of the previous delta kept per frame in normal playback.
const DELTA_KEEP: f64 = 0.9;

/// Read up to `frame_count` frames of interleaved audio from `sample`
/// into `out`, at the sample's own channel count. Returns the number of
/// live frames written; the remainder of `out` is zero-filled and the
/// head's `going` flag is cleared when the data ran out.
pub fn read_head(
    sample: &Sample,
    out: &mut [f32],
    frame_count: usize,
    device_rate: u32,
    tuning: &ScrubTuning,
) -> usize {
    let mut head = sample.play_head();
    let content = sample.content();
    let sound = &content.sound;
    let channels = sound.channels() as usize;
    let nr_frames = sound.frames();
    let tempo = sample.tempo();

    debug_assert!(out.len() >= frame_count * channels);
    if !head.going || nr_frames == 0 {
        out[..frame_count * channels].fill(0.0);
        return 0;
    }
    if head.smooth.len() != channels {
        head.reset_smoothing(channels as u16);
    }

    // Pitch ratio between the buffer's native rate and the device rate,
    // recomputed every call so a native-rate edit takes effect at the
    // next buffer.
    let relative_pitch = sound.sample_rate() as f64 / device_rate as f64;
    let mut written = 0;

    for frame in 0..frame_count {
        // Wrap or stop at the buffer edges.
        if head.offset < 0.0 || head.offset >= nr_frames as f64 {
            if head.looping {
                head.offset = head.offset.rem_euclid(nr_frames as f64);
            } else {
                head.going = false;
                break;
            }
        }
        let pos = head.offset.floor() as usize;

        if let Some(stop) = head.stop_offset {
            let passed = if head.delta < 0.0 { pos <= stop } else { pos >= stop };
            if passed {
                head.offset = stop as f64;
                head.stop_offset = None;
                head.going = false;
                break;
            }
        }

        // Selection-restricted traversal: emit only from the selection
        // union, snapping across the gaps. Preview free-runs a roll of
        // outside frames before and after each region instead.
        if head.restricted && !content.selections.contains(pos) {
            if head.previewing && head.roll_frames_left > 0.0 {
                head.roll_frames_left -= 1.0;
            } else if head.reverse {
                match content.selections.prev_region_before(pos) {
                    Some(region) => head.offset = region.end as f64 - 1.0,
                    None if head.looping => match content.selections.last() {
                        Some(region) => head.offset = region.end as f64 - 1.0,
                        None => {
                            head.going = false;
                            break;
                        }
                    },
                    None => {
                        head.going = false;
                        break;
                    }
                }
            } else {
                match content.selections.next_region_from(pos) {
                    Some(region) => head.offset = region.start as f64,
                    None if head.looping => match content.selections.first() {
                        Some(region) => head.offset = region.start as f64,
                        None => {
                            head.going = false;
                            break;
                        }
                    },
                    None => {
                        head.going = false;
                        break;
                    }
                }
            }
            if !head.going {
                break;
            }
        } else if head.restricted && head.previewing {
            // Inside a region the roll is re-armed for the post-roll.
            head.roll_frames_left =
                tuning.preview_roll_secs * sound.sample_rate() as f64;
        }

        // Emit one interpolated frame.
        let base = head.offset.floor() as usize;
        let frac = (head.offset - base as f64) as f32;
        let next = if base + 1 < nr_frames {
            base + 1
        } else if head.looping {
            0
        } else {
            base
        };
        for ch in 0..channels {
            let a = sound.sample(base, ch as u16);
            let b = sound.sample(next, ch as u16);
            let value = if head.mute {
                0.0
            } else {
                (a + (b - a) * frac) * head.gain
            };
            let slot = frame * channels + ch;
            if head.scrubbing {
                // Three-point average takes the zipper noise out of the
                // rapidly varying scrub rate.
                let memory = head.smooth[ch];
                out[slot] = (value + memory[0] + memory[1]) / 3.0;
                head.smooth[ch] = [value, memory[0]];
            } else {
                out[slot] = value;
            }
        }
        written += 1;

        // Advance.
        if head.scrubbing {
            let target = (head.user_offset - head.offset) / tuning.time_constant_frames;
            let keep = if head.scrub_dragging {
                tuning.active_keep
            } else {
                tuning.release_keep
            };
            head.delta = head.delta * keep + target * (1.0 - keep);
            let before = head.offset;
            head.offset += head.delta * relative_pitch;
            let crossed = (before <= head.user_offset && head.offset > head.user_offset)
                || (before >= head.user_offset && head.offset < head.user_offset);
            if crossed {
                head.offset = head.user_offset;
                head.delta = 0.0;
            }
        } else {
            let direction = if head.reverse { -1.0 } else { 1.0 };
            let target = head.rate * tempo * direction;
            head.delta = head.delta * DELTA_KEEP + target * (1.0 - DELTA_KEEP);
            head.offset += head.delta * relative_pitch;
        }
    }

    out[written * channels..frame_count * channels].fill(0.0);
    written
}
