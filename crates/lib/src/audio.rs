//! Audio capture and playback seam.
//!
//! Recording is a platform concern; the widget only needs start/stop and the captured clip
//! as base64. `FileRecorder` serves pre-recorded clips for terminal use and tests.

use base64::Engine;
use std::path::PathBuf;

/// A captured clip, base64-encoded without any data-URL prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAudio {
    pub base64: String,
    pub format: String,
}

/// Decoded synthesis output ready for playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub format: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// Recording is not available on this host.
    #[error("audio recording is not supported: {0}")]
    Unsupported(String),
    #[error("audio capture failed: {0}")]
    Capture(String),
    #[error("no recording in progress")]
    NotRecording,
}

/// Microphone-like source driven by the widget's microphone button.
pub trait AudioRecorder: Send {
    /// Whether recording can work at all on this host.
    fn is_supported(&self) -> bool;
    fn is_recording(&self) -> bool;
    fn start(&mut self) -> Result<(), AudioError>;
    /// Stop and return the captured clip.
    fn stop(&mut self) -> Result<RecordedAudio, AudioError>;
    /// Stop without returning audio. No-op when idle.
    fn cancel(&mut self);
}

/// Recorder for hosts without capture support.
#[derive(Debug, Default)]
pub struct UnsupportedRecorder;

impl AudioRecorder for UnsupportedRecorder {
    fn is_supported(&self) -> bool {
        false
    }

    fn is_recording(&self) -> bool {
        false
    }

    fn start(&mut self) -> Result<(), AudioError> {
        Err(AudioError::Unsupported("no capture device".to_string()))
    }

    fn stop(&mut self) -> Result<RecordedAudio, AudioError> {
        Err(AudioError::NotRecording)
    }

    fn cancel(&mut self) {}
}

/// "Records" by reading a pre-captured audio file when stopped.
#[derive(Debug)]
pub struct FileRecorder {
    path: PathBuf,
    format: String,
    recording: bool,
}

impl FileRecorder {
    /// Format defaults to the file extension, else "webm".
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_else(|| "webm".to_string());
        Self {
            path,
            format,
            recording: false,
        }
    }
}

impl AudioRecorder for FileRecorder {
    fn is_supported(&self) -> bool {
        true
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn start(&mut self) -> Result<(), AudioError> {
        if !self.path.is_file() {
            return Err(AudioError::Capture(format!(
                "audio file not found: {}",
                self.path.display()
            )));
        }
        self.recording = true;
        log::debug!("recording started from {}", self.path.display());
        Ok(())
    }

    fn stop(&mut self) -> Result<RecordedAudio, AudioError> {
        if !self.recording {
            return Err(AudioError::NotRecording);
        }
        self.recording = false;
        let bytes = std::fs::read(&self.path)
            .map_err(|e| AudioError::Capture(format!("reading {}: {}", self.path.display(), e)))?;
        log::debug!("recording stopped: {} bytes", bytes.len());
        Ok(RecordedAudio {
            base64: encode_audio(&bytes),
            format: self.format.clone(),
        })
    }

    fn cancel(&mut self) {
        if self.recording {
            log::debug!("recording cancelled");
        }
        self.recording = false;
    }
}

pub fn encode_audio(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode base64 audio, tolerating a `data:<mime>;base64,` prefix.
pub fn decode_audio(data: &str) -> Result<Vec<u8>, AudioError> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim().as_bytes())
        .map_err(|e| AudioError::Capture(format!("invalid base64 audio: {}", e)))
}

/// File extension for an audio format or MIME type ("audio/mpeg" -> "mp3").
pub fn extension_for(format: &str) -> &str {
    let f = format.trim();
    let f = f.strip_prefix("audio/").unwrap_or(f);
    match f {
        "mpeg" | "mp3" => "mp3",
        "wav" | "x-wav" | "wave" => "wav",
        "ogg" => "ogg",
        "webm" => "webm",
        "" => "bin",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_recorder_refuses_to_start() {
        let mut r = UnsupportedRecorder;
        assert!(!r.is_supported());
        assert!(matches!(r.start(), Err(AudioError::Unsupported(_))));
    }

    #[test]
    fn file_recorder_encodes_file_contents() {
        let path = std::env::temp_dir().join(format!("botchat-clip-{}.wav", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"RIFF-audio").unwrap();
        let mut r = FileRecorder::new(&path);
        r.start().unwrap();
        assert!(r.is_recording());
        let clip = r.stop().unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(!r.is_recording());
        assert_eq!(clip.format, "wav");
        assert_eq!(decode_audio(&clip.base64).unwrap(), b"RIFF-audio");
    }

    #[test]
    fn file_recorder_missing_file() {
        let mut r = FileRecorder::new("/nonexistent/botchat/clip.webm");
        assert!(matches!(r.start(), Err(AudioError::Capture(_))));
        assert!(matches!(r.stop(), Err(AudioError::NotRecording)));
    }

    #[test]
    fn decode_strips_data_url_prefix() {
        let encoded = format!("data:audio/webm;base64,{}", encode_audio(b"abc"));
        assert_eq!(decode_audio(&encoded).unwrap(), b"abc");
    }

    #[test]
    fn extensions() {
        assert_eq!(extension_for("audio/mpeg"), "mp3");
        assert_eq!(extension_for("wav"), "wav");
        assert_eq!(extension_for("audio/flac"), "flac");
    }
}
