use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use ds_core::traits::SampleSource;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AudioError;
use crate::sample::{Pacer, to_left_aligned};

/// Rate assumed when the container does not announce one.
const FALLBACK_RATE: u32 = 16_000;

/// Décode un fichier audio en mots 24 bits alignés à gauche, mono.
///
/// Every decoded packet is downmixed and converted as it arrives, so the
/// result is ready to be served by [`FileSource`] as-is. The file's own
/// sample rate is returned alongside; nothing is resampled.
///
/// Supports WAV, MP3, FLAC, OGG, AAC via symphonia.
///
/// # Errors
/// Returns an error if the file cannot be opened, probed, or has no
/// decodable track.
///
/// # Example
/// ```no_run
/// use ds_audio::decode::decode_file;
/// let (words, sample_rate) = decode_file("speech.wav").unwrap();
/// ```
pub fn decode_file(path: impl AsRef<Path>) -> Result<(Vec<i32>, u32)> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Cannot open audio file: {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut format = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::DecodeError(e.to_string()))
        .context("Failed to probe audio format")?
        .format;

    let track = format
        .default_track()
        .ok_or_else(|| AudioError::DecodeError("no default audio track".into()))?;
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(FALLBACK_RATE);
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::DecodeError(e.to_string()))
        .context("Failed to create audio decoder")?;

    let mut words: Vec<i32> = Vec::new();
    let mut interleaved: Option<SampleBuffer<f32>> = None;

    while let Some(packet) = next_packet(format.as_mut()) {
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Skipping undecodable packet: {e}");
                continue;
            }
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let needed = decoded.capacity() * channels;
        // Grow only; shorter packets reuse the previous buffer.
        if interleaved.as_ref().is_none_or(|b| b.capacity() < needed) {
            interleaved = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }
        let Some(buf) = interleaved.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);
        downmix_into(&mut words, buf.samples(), channels);
    }

    log::info!(
        "Decoded {} samples @ {}Hz from {}",
        words.len(),
        sample_rate,
        path.display()
    );

    Ok((words, sample_rate))
}

/// Next packet, or `None` at end of stream or on an unrecoverable read error.
fn next_packet(format: &mut dyn FormatReader) -> Option<Packet> {
    match format.next_packet() {
        Ok(packet) => Some(packet),
        Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => None,
        Err(e) => {
            log::warn!("Audio stream ended early: {e}");
            None
        }
    }
}

/// Average each interleaved frame to mono and append it as a left-aligned word.
fn downmix_into(out: &mut Vec<i32>, interleaved: &[f32], channels: usize) {
    let scale = 1.0 / channels as f32;
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| to_left_aligned(frame.iter().sum::<f32>() * scale)),
    );
}

/// Rejoue un fichier audio décodé comme une source d'acquisition.
///
/// Samples are held as left-aligned 24-bit words. The trailing
/// partial block is served as a short read; after that the source closes,
/// or wraps around when looping.
///
/// # Example
/// ```
/// use ds_audio::decode::FileSource;
/// use ds_core::traits::SampleSource;
///
/// let mut source = FileSource::from_samples(&[0.5; 700], 16_000, false);
/// let mut buf = [0i32; 512];
/// assert_eq!(source.read(&mut buf), Some(512));
/// assert_eq!(source.read(&mut buf), Some(188));
/// assert_eq!(source.read(&mut buf), None);
/// ```
#[derive(Debug)]
pub struct FileSource {
    samples: Vec<i32>,
    position: usize,
    sample_rate: u32,
    looping: bool,
    pacer: Option<Pacer>,
}

impl FileSource {
    /// Decode `path` and prepare it for playback.
    ///
    /// # Errors
    /// Returns an error if decoding fails or the file holds no samples.
    pub fn open(path: &Path, looping: bool) -> Result<Self> {
        let (words, sample_rate) = decode_file(path)?;
        if words.is_empty() {
            anyhow::bail!("Audio file is empty: {}", path.display());
        }
        Ok(Self::from_words(words, sample_rate, looping))
    }

    /// Wrap normalized mono samples, converting them to left-aligned words.
    #[must_use]
    pub fn from_samples(samples: &[f32], sample_rate: u32, looping: bool) -> Self {
        Self::from_words(
            samples.iter().copied().map(to_left_aligned).collect(),
            sample_rate,
            looping,
        )
    }

    /// Wrap words already left-aligned, as returned by [`decode_file`].
    #[must_use]
    pub fn from_words(words: Vec<i32>, sample_rate: u32, looping: bool) -> Self {
        Self {
            samples: words,
            position: 0,
            sample_rate,
            looping,
            pacer: None,
        }
    }

    /// Block on each read for the block's real-time duration.
    #[must_use]
    pub fn paced(mut self) -> Self {
        self.pacer = Some(Pacer::new(self.sample_rate));
        self
    }

    /// Total decoded samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` if nothing was decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl SampleSource for FileSource {
    fn read(&mut self, buf: &mut [i32]) -> Option<usize> {
        if self.samples.is_empty() {
            return None;
        }
        if self.position >= self.samples.len() {
            if !self.looping {
                return None;
            }
            self.position = 0;
        }

        let n = buf.len().min(self.samples.len() - self.position);
        buf[..n].copy_from_slice(&self.samples[self.position..self.position + n]);
        self.position += n;

        if let Some(pacer) = self.pacer.as_mut() {
            pacer.wait(n);
        }
        Some(n)
    }

    fn sample_rate(&self) -> Option<u32> {
        Some(self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::MAX_24;

    fn write_wav(path: &Path, samples: &[i16], sample_rate: u32, channels: u16) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_wav_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        // Interleaved L/R: left = 16384, right = 0 → mono ≈ 0.25
        let frames: Vec<i16> = (0..1000).flat_map(|_| [16_384i16, 0]).collect();
        write_wav(&path, &frames, 16_000, 2);

        let (words, rate) = decode_file(&path).unwrap();
        assert_eq!(rate, 16_000);
        assert_eq!(words.len(), 1000);
        assert!(words.iter().all(|w| w & 0xFF == 0), "padding bits must be zero");
        let level = (words[10] >> 8) as f32 / MAX_24;
        assert!((level - 0.25).abs() < 1e-3, "got {level}");
    }

    #[test]
    fn downmix_averages_channels() {
        let mut out = Vec::new();
        downmix_into(&mut out, &[0.5, -0.5, 1.0, 0.0, 0.2, 0.2], 2);
        assert_eq!(out, vec![0, to_left_aligned(0.5), to_left_aligned(0.2)]);
    }

    #[test]
    fn empty_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav(&path, &[], 16_000, 1);
        assert!(FileSource::open(&path, false).is_err());
    }

    #[test]
    fn file_source_serves_blocks_then_closes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav(&path, &[8192i16; 1100], 16_000, 1);

        let mut source = FileSource::open(&path, false).unwrap();
        assert_eq!(source.len(), 1100);
        let mut buf = [0i32; 512];
        assert_eq!(source.read(&mut buf), Some(512));
        assert_eq!(buf[0] & 0xFF, 0);
        assert_eq!(source.read(&mut buf), Some(512));
        assert_eq!(source.read(&mut buf), Some(76));
        assert_eq!(source.read(&mut buf), None);
    }

    #[test]
    fn looping_source_wraps() {
        let mut source = FileSource::from_samples(&[0.1; 600], 16_000, true);
        let mut buf = [0i32; 512];
        assert_eq!(source.read(&mut buf), Some(512));
        assert_eq!(source.read(&mut buf), Some(88));
        assert_eq!(source.read(&mut buf), Some(512));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(FileSource::open(Path::new("/nonexistent/clip.wav"), false).is_err());
    }
}
