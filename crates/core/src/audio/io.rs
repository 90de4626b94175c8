//! Audio file I/O: WAV read/write, duration probing, resampling,
//! reference-audio conversion.
//!
//! The pipeline works on mono f64 buffers throughout. Rendered clips
//! arrive as WAV from the generation services; reference audio for
//! voice cloning may be any format symphonia can decode.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

/// Read a WAV file into a mono f64 buffer in [-1, 1].
///
/// Integer formats are scaled by their bit depth; multi-channel audio
/// is downmixed by averaging.
pub fn read_wav(path: &Path) -> Result<(Vec<f64>, u32)> {
    let reader = WavReader::open(path)
        .with_context(|| format!("failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    let sample_rate = spec.sample_rate;

    let interleaved: Vec<f64> = match spec.sample_format {
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f64 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("failed to read WAV samples")?
        }
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| v as f64))
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read WAV samples")?,
    };

    if channels == 1 {
        return Ok((interleaved, sample_rate));
    }

    let mono: Vec<f64> = interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f64>() / channels as f64)
        .collect();
    Ok((mono, sample_rate))
}

/// Write a mono f64 buffer as 16-bit PCM WAV, clamping to [-1, 1].
///
/// Creates parent directories as needed.
pub fn write_wav(path: &Path, samples: &[f64], sample_rate: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("failed to create WAV file: {}", path.display()))?;
    for &sample in samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16)?;
    }
    writer.finalize().context("failed to finalize WAV file")?;
    Ok(())
}

/// Duration of a WAV file in seconds, read from the header.
pub fn wav_duration(path: &Path) -> Result<f64> {
    let reader = WavReader::open(path)
        .with_context(|| format!("failed to open WAV file: {}", path.display()))?;
    let spec = reader.spec();
    let frames = reader.len() as f64 / spec.channels.max(1) as f64;
    Ok(frames / spec.sample_rate as f64)
}

/// Resample a mono buffer from one rate to another.
pub fn resample(samples: &[f64], from_sr: u32, to_sr: u32) -> Result<Vec<f64>> {
    if from_sr == to_sr || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    use rubato::{FastFixedIn, PolynomialDegree, Resampler};

    let ratio = to_sr as f64 / from_sr as f64;
    let mut resampler = FastFixedIn::<f64>::new(
        ratio,
        1.0,
        PolynomialDegree::Cubic,
        samples.len(),
        1,
    )?;

    let output = resampler.process(&[samples.to_vec()], None)?;
    Ok(output.into_iter().next().unwrap_or_default())
}

/// Read a WAV file and convert it to the given sample rate.
pub fn read_wav_at(path: &Path, target_sr: u32) -> Result<Vec<f64>> {
    let (samples, sr) = read_wav(path)?;
    if sr == target_sr {
        return Ok(samples);
    }
    log::debug!(
        "resampling {} from {} Hz to {} Hz",
        path.display(),
        sr,
        target_sr
    );
    resample(&samples, sr, target_sr)
}

/// Decode any supported audio file (WAV/MP3/AAC/MP4) to a mono WAV at
/// `target_sr`. Used to prepare voice-reference uploads.
pub fn extract_audio(input_path: &Path, output_path: &Path, target_sr: u32) -> Result<()> {
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
    use symphonia::core::errors::Error as SymphError;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = std::fs::File::open(input_path)
        .with_context(|| format!("failed to open: {}", input_path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = input_path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("unsupported format: {}", input_path.display()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("no audio track found")?;
    let track_id = track.id;
    let source_sr = track.codec_params.sample_rate.unwrap_or(44100);
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("unsupported codec")?;

    let mut mono: Vec<f64> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let frames = decoded.frames();
                let mut buf = SampleBuffer::<f64>::new(frames as u64, spec);
                buf.copy_interleaved_ref(decoded);
                let interleaved = buf.samples();
                for frame in interleaved.chunks_exact(channels.max(1)) {
                    mono.push(frame.iter().sum::<f64>() / frame.len() as f64);
                }
            }
            Err(SymphError::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    if mono.is_empty() {
        anyhow::bail!("no audio decoded from {}", input_path.display());
    }

    let converted = if source_sr != target_sr {
        resample(&mono, source_sr, target_sr)?
    } else {
        mono
    };
    write_wav(output_path, &converted, target_sr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_wav_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("soundloom_io_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_write_read_roundtrip() {
        let path = temp_wav_path("roundtrip.wav");
        let samples: Vec<f64> = (0..800)
            .map(|i| (i as f64 / 800.0 * std::f64::consts::TAU).sin() * 0.4)
            .collect();
        write_wav(&path, &samples, 8000).unwrap();

        let (read, sr) = read_wav(&path).unwrap();
        assert_eq!(sr, 8000);
        assert_eq!(read.len(), samples.len());
        for (a, b) in samples.iter().zip(read.iter()) {
            assert!((a - b).abs() < 0.001);
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_write_clamps_out_of_range() {
        let path = temp_wav_path("clamp.wav");
        write_wav(&path, &[-3.0, 0.0, 3.0], 8000).unwrap();
        let (read, _) = read_wav(&path).unwrap();
        assert!(read[0] <= -0.99 && read[0] >= -1.0);
        assert!(read[2] >= 0.99 && read[2] <= 1.0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_wav_duration() {
        let path = temp_wav_path("duration.wav");
        write_wav(&path, &vec![0.0; 12000], 8000).unwrap();
        let dur = wav_duration(&path).unwrap();
        assert!((dur - 1.5).abs() < 1e-6);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_read_wav_downmixes_stereo() {
        let path = temp_wav_path("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(16000i16).unwrap(); // left
            writer.write_sample(0i16).unwrap(); // right
        }
        writer.finalize().unwrap();

        let (samples, sr) = read_wav(&path).unwrap();
        assert_eq!(sr, 8000);
        assert_eq!(samples.len(), 100);
        // average of ~0.49 and 0.0
        assert!((samples[0] - 0.244).abs() < 0.01);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_resample_identity() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 8000, 8000).unwrap(), samples);
    }

    #[test]
    fn test_resample_empty() {
        assert!(resample(&[], 8000, 16000).unwrap().is_empty());
    }

    #[test]
    fn test_resample_halves_length() {
        let samples: Vec<f64> = (0..8000)
            .map(|i| (i as f64 / 8000.0 * std::f64::consts::TAU * 100.0).sin())
            .collect();
        let out = resample(&samples, 16000, 8000).unwrap();
        assert!(
            out.len() >= 3800 && out.len() <= 4200,
            "expected ~4000 samples, got {}",
            out.len()
        );
    }

    #[test]
    fn test_extract_audio_from_wav() {
        let dir = std::env::temp_dir().join(format!("soundloom_extract_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("in.wav");
        let output = dir.join("out.wav");

        let samples: Vec<f64> = (0..44100)
            .map(|i| (i as f64 / 44100.0 * std::f64::consts::TAU * 440.0).sin() * 0.5)
            .collect();
        write_wav(&input, &samples, 44100).unwrap();

        extract_audio(&input, &output, 16000).unwrap();
        let (out, sr) = read_wav(&output).unwrap();
        assert_eq!(sr, 16000);
        assert!(
            out.len() > 14000 && out.len() < 18000,
            "expected ~16000 samples, got {}",
            out.len()
        );
        std::fs::remove_dir_all(&dir).ok();
    }
}
