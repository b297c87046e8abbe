//! Streaming audio decoder built on Symphonia

use crate::error::{AudioError, Result};
use aura_core::{AudioSpec, StreamInfo, Tags};
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey};
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};

/// Streaming decoder for one compressed audio elementary stream
///
/// Usage: `open()` probes the container and reports the stream spec,
/// duration and tags; `decode_chunk()` pulls interleaved stereo i16 PCM;
/// `seek()` repositions to the nearest sync point at or before the target
/// and resets codec state.
///
/// Output is always stereo: mono input is duplicated, multichannel input
/// is downmixed (ITU-R BS.775-1 center/surround coefficient).
pub struct SymphoniaDecoder {
    state: Option<StreamState>,
}

/// Internal state while a file is open
struct StreamState {
    /// Container parser
    format: Box<dyn FormatReader>,
    /// Codec decoder
    decoder: Box<dyn Decoder>,
    /// Selected track ID
    track_id: u32,
    /// Source sample rate
    sample_rate: u32,
    /// Duration in milliseconds (0 = container did not say)
    duration_ms: u64,
    /// Time base for seek position calculation
    time_base: Option<TimeBase>,
    /// Frames still to decode and discard after a coarse demuxer seek
    skip_frames: u64,
}

impl SymphoniaDecoder {
    /// Create a new decoder with no file open
    pub fn new() -> Self {
        Self { state: None }
    }

    /// Open a file for streaming decode
    ///
    /// # Errors
    /// `FileNotFound` when the path does not exist, `UnsupportedFormat`
    /// when probing fails, `NoAudioTrack` when the container holds no
    /// decodable audio stream.
    pub fn open(&mut self, path: &Path) -> Result<StreamInfo> {
        self.state = None;

        if !path.exists() {
            return Err(AudioError::FileNotFound(path.display().to_string()));
        }

        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let mut probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::UnsupportedFormat(format!("probe failed: {}", e)))?;

        // Tags can live in the probe (ID3v2 before the stream) or in the
        // container itself; prefer the container revision when both exist.
        let mut tags = probed
            .metadata
            .get()
            .as_ref()
            .and_then(|m| m.current())
            .map(read_tags)
            .unwrap_or_default();
        let mut format = probed.format;
        if let Some(rev) = format.metadata().current() {
            merge_tags(&mut tags, read_tags(rev));
        }

        let track = format.default_track().ok_or(AudioError::NoAudioTrack)?;

        let sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);
        let track_id = track.id;
        let time_base = track.codec_params.time_base;

        let duration_ms = track
            .codec_params
            .n_frames
            .map(|frames| frames * 1000 / u64::from(sample_rate))
            .unwrap_or(0);

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::UnsupportedFormat(format!("no codec: {}", e)))?;

        self.state = Some(StreamState {
            format,
            decoder,
            track_id,
            sample_rate,
            duration_ms,
            time_base,
            skip_frames: 0,
        });

        Ok(StreamInfo {
            spec: AudioSpec::new(sample_rate, 2),
            duration_ms,
            tags,
        })
    }

    /// Decode the next chunk of audio
    ///
    /// Returns at least `min_frames` stereo frames unless end of stream is
    /// reached first; `Ok(None)` signals end of stream. Recoverable decode
    /// errors (corrupt packets) are skipped.
    pub fn decode_chunk(&mut self, min_frames: usize) -> Result<Option<Vec<i16>>> {
        let state = self.state.as_mut().ok_or(AudioError::NoFileOpen)?;

        let target_samples = min_frames * 2;
        let mut samples: Vec<i16> = Vec::with_capacity(target_samples);

        while samples.len() < target_samples {
            let packet = match state.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    state.decoder.reset();
                    continue;
                }
                Err(e) => {
                    return Err(AudioError::DecodeError(format!("packet read: {}", e)));
                }
            };

            if packet.track_id() != state.track_id {
                continue;
            }

            let decoded = match state.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt packet; the stream is still usable.
                    tracing::warn!("skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => {
                    return Err(AudioError::DecodeError(e.to_string()));
                }
            };

            let before = samples.len();
            convert_to_stereo_i16(&decoded, &mut samples);

            // Demuxer seeks land on packet boundaries; drop the decoded
            // audio between the sync point and the requested position.
            if state.skip_frames > 0 {
                let added = (samples.len() - before) / 2;
                let discard = usize::try_from(state.skip_frames)
                    .unwrap_or(usize::MAX)
                    .min(added);
                samples.drain(before..before + discard * 2);
                state.skip_frames -= discard as u64;
            }
        }

        if samples.is_empty() {
            Ok(None)
        } else {
            Ok(Some(samples))
        }
    }

    /// Seek to a position in the open file
    ///
    /// Repositions the demuxer to the nearest sync point at or before
    /// `target_ms`, resets the decoder, and arranges for the audio between
    /// the sync point and the target to be decoded and discarded, so the
    /// next `decode_chunk` resumes at the requested position. Returns the
    /// actual position in milliseconds.
    pub fn seek(&mut self, target_ms: u64) -> Result<u64> {
        let state = self.state.as_mut().ok_or(AudioError::NoFileOpen)?;

        let clamped_ms = if state.duration_ms > 0 {
            target_ms.min(state.duration_ms)
        } else {
            target_ms
        };

        let time = Time::new(clamped_ms / 1000, (clamped_ms % 1000) as f64 / 1000.0);
        let seeked_to = state
            .format
            .seek(
                SeekMode::Accurate,
                SeekTo::Time {
                    time,
                    track_id: Some(state.track_id),
                },
            )
            .map_err(|e| AudioError::SeekError(e.to_string()))?;

        // Codec state refers to pre-seek packets and must be dropped.
        state.decoder.reset();

        // The demuxer stops at a packet boundary at or before the target;
        // the remainder is decoded and thrown away by `decode_chunk`.
        let skip_ts = seeked_to.required_ts.saturating_sub(seeked_to.actual_ts);
        state.skip_frames = ts_to_frames(skip_ts, state.time_base, state.sample_rate);

        if state.skip_frames > 0 {
            Ok(clamped_ms)
        } else {
            Ok(ts_to_ms(
                seeked_to.actual_ts,
                state.time_base,
                state.sample_rate,
            ))
        }
    }

    /// Duration of the open file in milliseconds (0 = unknown)
    pub fn duration_ms(&self) -> u64 {
        self.state.as_ref().map(|s| s.duration_ms).unwrap_or(0)
    }

    /// Close any open streaming session
    pub fn close(&mut self) {
        self.state = None;
    }

    /// Check if a file is currently open
    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }
}

impl Default for SymphoniaDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a timestamp in the track's time base to frames at `sample_rate`
fn ts_to_frames(ts: u64, time_base: Option<TimeBase>, sample_rate: u32) -> u64 {
    match time_base {
        Some(tb) => ts * u64::from(tb.numer) * u64::from(sample_rate) / u64::from(tb.denom),
        None => ts,
    }
}

/// Convert a timestamp in the track's time base to milliseconds
fn ts_to_ms(ts: u64, time_base: Option<TimeBase>, sample_rate: u32) -> u64 {
    match time_base {
        Some(tb) => ts * 1000 * u64::from(tb.numer) / u64::from(tb.denom),
        None => ts * 1000 / u64::from(sample_rate),
    }
}

/// Read title/artist/album from a metadata revision
fn read_tags(rev: &MetadataRevision) -> Tags {
    let mut tags = Tags::default();
    for tag in rev.tags() {
        match tag.std_key {
            Some(StandardTagKey::TrackTitle) => tags.title = Some(tag.value.to_string()),
            Some(StandardTagKey::Artist) => tags.artist = Some(tag.value.to_string()),
            Some(StandardTagKey::Album) => tags.album = Some(tag.value.to_string()),
            _ => {}
        }
    }
    tags
}

/// Overlay `other` onto `tags`, keeping existing values when `other` lacks them
fn merge_tags(tags: &mut Tags, other: Tags) {
    if other.title.is_some() {
        tags.title = other.title;
    }
    if other.artist.is_some() {
        tags.artist = other.artist;
    }
    if other.album.is_some() {
        tags.album = other.album;
    }
}

/// Convert a decoded Symphonia buffer to interleaved stereo i16
///
/// Mono is duplicated to both channels; layouts above stereo are folded
/// down with a -3 dB coefficient on center/surround channels.
fn convert_to_stereo_i16(decoded: &AudioBufferRef, out: &mut Vec<i16>) {
    match decoded {
        AudioBufferRef::F32(buf) => fold_to_stereo(buf, out, f32_to_i16),
        AudioBufferRef::F64(buf) => fold_to_stereo(buf, out, |s| f32_to_i16(s as f32)),
        AudioBufferRef::S32(buf) => fold_to_stereo(buf, out, |s| (s >> 16) as i16),
        AudioBufferRef::S16(buf) => fold_to_stereo(buf, out, |s| s),
        AudioBufferRef::S8(buf) => fold_to_stereo(buf, out, |s| i16::from(s) << 8),
        AudioBufferRef::U32(buf) => {
            fold_to_stereo(buf, out, |s| ((s >> 16) as i32 - 0x8000) as i16)
        }
        AudioBufferRef::U16(buf) => fold_to_stereo(buf, out, |s| (i32::from(s) - 0x8000) as i16),
        AudioBufferRef::U8(buf) => fold_to_stereo(buf, out, |s| (i16::from(s) - 0x80) << 8),
        AudioBufferRef::S24(buf) => fold_to_stereo(buf, out, |s| (s.inner() >> 8) as i16),
        AudioBufferRef::U24(buf) => {
            fold_to_stereo(buf, out, |s| ((s.inner() >> 8) as i32 - 0x8000) as i16)
        }
    }
}

/// Scale a float sample in [-1.0, 1.0] to i16 with symmetric clamping
#[inline]
fn f32_to_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * 32767.0) as i16
}

/// Fold an arbitrary channel layout down to interleaved stereo
fn fold_to_stereo<T, F>(
    buf: &symphonia::core::audio::AudioBuffer<T>,
    out: &mut Vec<i16>,
    normalize: F,
) where
    T: symphonia::core::sample::Sample + Copy,
    F: Fn(T) -> i16,
{
    // -3 dB for channels shared between left and right
    const FOLD: f32 = 0.707;

    let channels = buf.spec().channels.count();
    let frames = buf.frames();
    out.reserve(frames * 2);

    match channels {
        0 => out.extend(std::iter::repeat(0).take(frames * 2)),
        1 => {
            let mono = buf.chan(0);
            for &sample in &mono[..frames] {
                let s = normalize(sample);
                out.push(s);
                out.push(s);
            }
        }
        2 => {
            let left = buf.chan(0);
            let right = buf.chan(1);
            for i in 0..frames {
                out.push(normalize(left[i]));
                out.push(normalize(right[i]));
            }
        }
        _ => {
            // Fold every extra channel into both sides at -3 dB. Cruder
            // than a full 5.1 matrix but layout-agnostic.
            let left = buf.chan(0);
            let right = buf.chan(1);
            for i in 0..frames {
                let mut l = f32::from(normalize(left[i]));
                let mut r = f32::from(normalize(right[i]));
                for ch in 2..channels {
                    let extra = f32::from(normalize(buf.chan(ch)[i])) * FOLD;
                    l += extra;
                    r += extra;
                }
                out.push(l.clamp(-32768.0, 32767.0) as i16);
                out.push(r.clamp(-32768.0, 32767.0) as i16);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn open_nonexistent_file_is_not_found() {
        let mut decoder = SymphoniaDecoder::new();
        match decoder.open(Path::new("/nonexistent/file.mp3")) {
            Err(AudioError::FileNotFound(_)) => {}
            other => panic!("expected FileNotFound, got {:?}", other.map(|_| ())),
        }
        assert!(!decoder.is_open());
    }

    #[test]
    fn open_non_audio_file_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("not_audio.mp3");
        std::fs::write(&path, b"definitely not an mpeg stream").unwrap();

        let mut decoder = SymphoniaDecoder::new();
        assert!(matches!(
            decoder.open(&path),
            Err(AudioError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn decode_without_open_fails() {
        let mut decoder = SymphoniaDecoder::new();
        assert!(matches!(
            decoder.decode_chunk(1024),
            Err(AudioError::NoFileOpen)
        ));
        assert!(matches!(decoder.seek(0), Err(AudioError::NoFileOpen)));
    }

    #[test]
    fn seek_resumes_delivery_at_the_requested_frame() {
        // Left sample value == frame index so frame positions are
        // directly observable in the decoded output.
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("ramp.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for frame in 0..4_000i16 {
            writer.write_sample(frame).unwrap();
            writer.write_sample(frame).unwrap();
        }
        writer.finalize().unwrap();

        let mut decoder = SymphoniaDecoder::new();
        decoder.open(&path).unwrap();

        // 50 ms at 8 kHz is frame 400, which is not a packet boundary;
        // the demuxer lands earlier and the gap must be discarded.
        let actual_ms = decoder.seek(50).unwrap();
        assert_eq!(actual_ms, 50);

        let chunk = decoder.decode_chunk(64).unwrap().unwrap();
        assert_eq!(chunk[0], 400, "delivery did not resume at the target");
        for (i, frame) in chunk.chunks_exact(2).enumerate() {
            assert_eq!(
                frame[0] as usize,
                400 + i,
                "post-seek audio is not contiguous"
            );
        }
    }

    #[test]
    fn f32_conversion_clamps() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), 32767);
        assert_eq!(f32_to_i16(-1.0), -32767);
        assert_eq!(f32_to_i16(2.0), 32767);
        assert_eq!(f32_to_i16(-2.0), -32767);
    }
}
