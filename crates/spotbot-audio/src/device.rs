//! Output device discovery and stream config selection.
//!
//! Thin wrappers around CPAL for:
//! - listing available output devices
//! - selecting either the default device or a device by substring match
//! - finding a supported config for an exact channel count / sample rate

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait};

/// Pick the first output device matching `needle` (case-insensitive), or the default device.
///
/// Returns an error if no suitable device is found.
pub fn pick_device(host: &cpal::Host, needle: Option<&str>) -> Result<cpal::Device> {
    let mut devices: Vec<cpal::Device> = host
        .output_devices()
        .context("No output devices")?
        .collect();

    if let Some(needle) = needle {
        if let Some(d) = devices.drain(..).find(|d| {
            d.description()
                .ok()
                .map(|n| matches_device_name(&n.name(), needle))
                .unwrap_or(false)
        }) {
            return Ok(d);
        }
        return Err(anyhow!("No output device matched: {needle}"));
    }

    host.default_output_device()
        .ok_or_else(|| anyhow!("No default output device"))
}

/// Print available output devices to stdout.
///
/// This is intended for CLI UX (`--list-devices`) rather than structured output.
pub fn list_devices(host: &cpal::Host) -> Result<()> {
    let devices = host.output_devices().context("No output devices")?;
    for (i, d) in devices.enumerate() {
        println!("#{i}: {}", d.description()?);
    }
    Ok(())
}

/// Find a supported config that plays `channels` at exactly `sample_rate`.
///
/// The pipeline never resamples, so ranges that do not contain the rate are
/// skipped. Among matches, `i16` is preferred since that is what the decoder
/// delivers. Returns `Ok(None)` when the device has no matching range.
pub fn pick_stream_config(
    device: &cpal::Device,
    channels: u16,
    sample_rate: u32,
) -> Result<Option<cpal::SupportedStreamConfig>> {
    let ranges: Vec<cpal::SupportedStreamConfigRange> =
        device.supported_output_configs()?.collect();
    let candidates: Vec<RangeCandidate> = ranges
        .iter()
        .map(|r| RangeCandidate {
            channels: r.channels(),
            min_rate: r.min_sample_rate(),
            max_rate: r.max_sample_rate(),
            format: r.sample_format(),
        })
        .collect();
    Ok(best_range(&candidates, channels, sample_rate)
        .map(|idx| ranges[idx].clone().with_sample_rate(sample_rate)))
}

/// Resolve the requested period size against what the device supports.
///
/// Clamps into an advertised range; falls back to the device default when the
/// range is unknown.
pub fn pick_buffer_size(supported: &cpal::SupportedBufferSize, requested: u32) -> cpal::BufferSize {
    match supported {
        cpal::SupportedBufferSize::Range { min, max } if min <= max => {
            cpal::BufferSize::Fixed(requested.clamp(*min, *max))
        }
        _ => cpal::BufferSize::Default,
    }
}

#[derive(Clone, Copy, Debug)]
struct RangeCandidate {
    channels: u16,
    min_rate: u32,
    max_rate: u32,
    format: cpal::SampleFormat,
}

fn best_range(candidates: &[RangeCandidate], channels: u16, sample_rate: u32) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            c.channels == channels && c.min_rate <= sample_rate && sample_rate <= c.max_rate
        })
        .min_by_key(|(_, c)| sample_format_rank(c.format))
        .map(|(idx, _)| idx)
}

fn sample_format_rank(format: cpal::SampleFormat) -> u8 {
    match format {
        cpal::SampleFormat::I16 => 0,
        cpal::SampleFormat::F32 => 1,
        cpal::SampleFormat::I32 => 2,
        cpal::SampleFormat::U16 => 3,
        _ => 10,
    }
}

fn matches_device_name(name: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    name.to_lowercase().contains(&needle.to_lowercase())
}
