//! WAV file sink
//!
//! Streams samples straight into a 16-bit PCM WAV file through `hound`;
//! nothing is held in memory beyond the writer's buffer.

use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::{to_pcm16, OutputSink};
use crate::{Result, Ym2149Error};

/// 16-bit PCM WAV writer, mono or duplicated stereo
pub struct WavSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
    channels: u16,
    frames_written: u64,
}

impl WavSink {
    /// Create the file at `path`.
    ///
    /// `channels` is 1 (mono) or 2 (each sample written to both sides).
    pub fn create<P: AsRef<Path>>(path: P, sample_rate: u32, channels: u16) -> Result<Self> {
        if !(1..=2).contains(&channels) {
            return Err(Ym2149Error::ConfigError(format!(
                "WAV channel count {channels} must be 1 or 2"
            )));
        }
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let path = path.as_ref().to_path_buf();
        let writer = hound::WavWriter::create(&path, spec).map_err(|e| {
            Ym2149Error::AudioFileError(format!("Failed to create WAV file: {e}"))
        })?;
        Ok(WavSink {
            writer: Some(writer),
            path,
            channels,
            frames_written: 0,
        })
    }

    /// Sample frames written so far
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> Result<&mut hound::WavWriter<BufWriter<File>>> {
        self.writer
            .as_mut()
            .ok_or_else(|| Ym2149Error::AudioFileError("WAV sink already closed".into()))
    }
}

impl OutputSink for WavSink {
    fn push_samples(&mut self, samples: &[f32]) -> Result<()> {
        let channels = self.channels;
        let writer = self.writer()?;
        for &sample in samples {
            let pcm = to_pcm16(sample);
            for _ in 0..channels {
                writer
                    .write_sample(pcm)
                    .map_err(|e| Ym2149Error::AudioFileError(format!("Failed to write sample: {e}")))?;
            }
        }
        self.frames_written += samples.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer()?
            .flush()
            .map_err(|e| Ym2149Error::AudioFileError(format!("Failed to flush WAV file: {e}")))
    }

    fn close(&mut self) -> Result<()> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        writer
            .finalize()
            .map_err(|e| Ym2149Error::AudioFileError(format!("Failed to finalize WAV file: {e}")))?;
        info!(
            "wav: wrote {} frames to {}",
            self.frames_written,
            self.path.display()
        );
        Ok(())
    }
}
