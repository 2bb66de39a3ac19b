//! Track decoding for the library session.
//!
//! Uses Symphonia to:
//! - probe the file's container/codec
//! - decode packets into interleaved `i16`
//! - hand each packet back as little-endian bytes, the shape a service decoder
//!   delivers to the audio pipeline

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use spotbot_audio::AudioFormat;
use spotbot_audio::repack::encode_samples;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// An opened, probed track ready to be decoded packet by packet.
pub struct TrackDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
}

impl TrackDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        let (format, codec_params, track_id) = probe(path)?;
        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .with_context(|| format!("no decoder for {}", path.display()))?;
        Ok(Self {
            format,
            decoder,
            track_id,
        })
    }

    /// Decode the next packet of the default track.
    ///
    /// Returns `Ok(None)` at end of stream. Packets that fail to decode are skipped.
    pub fn next_chunk(&mut self) -> Result<Option<(AudioFormat, Vec<u8>)>> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => return Ok(None),
                Err(e) => return Err(anyhow!("read packet: {e}")),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::debug!(error = e, "skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(anyhow!("decode packet: {e}")),
            };
            if decoded.frames() == 0 {
                continue;
            }

            let spec = *decoded.spec();
            let mut sample_buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);

            let format = AudioFormat {
                channels: spec.channels.count() as u16,
                sample_rate: spec.rate,
            };
            return Ok(Some((format, encode_samples(sample_buf.samples()))));
        }
    }
}

/// Best-effort duration without decoding.
pub fn probe_duration_ms(path: &Path) -> Option<u64> {
    let (_, codec_params, _) = probe(path).ok()?;
    duration_ms_from_codec_params(&codec_params)
}

fn probe(path: &Path) -> Result<(Box<dyn FormatReader>, CodecParameters, u32)> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("probe {}", path.display()))?;

    let format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| anyhow!("No default audio track"))?;
    let codec_params = track.codec_params.clone();
    let track_id = track.id;
    Ok((format, codec_params, track_id))
}

/// Best-effort duration in milliseconds from codec metadata.
///
/// Returns `None` if the container does not provide total frames or sample rate.
fn duration_ms_from_codec_params(codec_params: &CodecParameters) -> Option<u64> {
    let frames = codec_params.n_frames?;
    let rate = codec_params.sample_rate? as u64;
    if rate == 0 {
        return None;
    }
    Some(frames.saturating_mul(1000) / rate)
}
