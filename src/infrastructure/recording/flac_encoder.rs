//! FLAC encoder for captured PCM
//!
//! Settings:
//! - Mono channel
//! - 16-bit samples
//! - Sample rate of the capture device (16kHz preferred)

use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::config;
use flacenc::error::Verify;
use flacenc::source::MemSource;

/// Preferred capture sample rate (speech-optimized)
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Sample depth written to the stream
const BITS_PER_SAMPLE: usize = 16;

/// Mono capture
const CHANNELS: usize = 1;

/// Encode mono i16 PCM samples captured at `sample_rate` to FLAC bytes
///
/// The result starts with the `fLaC` marker and carries `sample_rate` in
/// its stream info.
pub fn encode_to_flac(pcm_samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, EncodingError> {
    if sample_rate == 0 {
        return Err(EncodingError::Config("sample rate is zero".to_string()));
    }

    // flacenc works on i32 samples
    let samples_i32: Vec<i32> = pcm_samples.iter().map(|&s| i32::from(s)).collect();

    // Default encoder settings, verified
    let config = config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| EncodingError::Config(format!("{:?}", e)))?;

    // Whole capture as an in-memory source
    let source = MemSource::from_samples(
        &samples_i32,
        CHANNELS,
        BITS_PER_SAMPLE,
        sample_rate as usize,
    );

    // Encode
    let flac_stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| EncodingError::Encode(format!("{:?}", e)))?;

    // Serialize
    let mut sink = ByteSink::new();
    flac_stream
        .write(&mut sink)
        .map_err(|e| EncodingError::Write(e.to_string()))?;

    Ok(sink.into_inner())
}

/// FLAC encoding errors
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("FLAC config error: {0}")]
    Config(String),

    #[error("FLAC encoding failed: {0}")]
    Encode(String),

    #[error("FLAC write failed: {0}")]
    Write(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_silence() {
        let silence = vec![0i16; TARGET_SAMPLE_RATE as usize];
        let flac_data = encode_to_flac(&silence, TARGET_SAMPLE_RATE).unwrap();

        assert!(flac_data.len() > 50);
        assert_eq!(&flac_data[0..4], b"fLaC");
    }

    #[test]
    fn encode_at_device_rate() {
        // 100ms at 48kHz
        let silence = vec![0i16; 4800];
        let flac_data = encode_to_flac(&silence, 48_000).unwrap();
        assert_eq!(&flac_data[0..4], b"fLaC");
    }

    #[test]
    fn encode_with_signal_compresses() {
        let samples: Vec<i16> = (0..TARGET_SAMPLE_RATE as usize)
            .map(|i| {
                let t = i as f32 / TARGET_SAMPLE_RATE as f32;
                (f32::sin(2.0 * std::f32::consts::PI * 440.0 * t) * 16000.0) as i16
            })
            .collect();

        let flac_data = encode_to_flac(&samples, TARGET_SAMPLE_RATE).unwrap();
        assert!(flac_data.len() < samples.len() * 2);
    }

    #[test]
    fn zero_sample_rate_is_rejected() {
        assert!(matches!(
            encode_to_flac(&[0, 1, 2], 0),
            Err(EncodingError::Config(_))
        ));
    }
}
