// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker's coupling to external artifacts — the audio-decoder
//! utility and the transcription engine — is modeled behind capability
//! traits (DESIGN NOTES §9) so tests can inject a deterministic fake
//! instead of shelling out to `ffprobe`/`ffmpeg`/whisper.cpp.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;

use super::ringbuffer::{drain_into, RingBuffer};
use crate::error::WorkerError;

/// Parameters for one transcription invocation, fixed per spec.md §4.4
/// except for the VAD gate.
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    pub beam_size: u32,
    pub entropy_threshold: f64,
    pub max_context: i32,
    pub vad_enabled: bool,
    pub vad_model: Option<PathBuf>,
    pub whisper_bin: PathBuf,
    pub whisper_model: PathBuf,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            beam_size: 5,
            entropy_threshold: 2.8,
            max_context: 64,
            vad_enabled: false,
            vad_model: None,
            whisper_bin: PathBuf::from("./main"),
            whisper_model: PathBuf::from("./models/ggml-medium.bin"),
        }
    }
}

#[async_trait]
pub trait Decoder: Send + Sync {
    /// Clip duration in seconds. Used only for reporting (spec.md §4.4
    /// step 3) — a failure here fails the task but nothing downstream
    /// depends on the value's accuracy.
    async fn duration_secs(&self, path: &Path) -> Result<f64, WorkerError>;
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Transcode `src` to a canonical 16 kHz mono PCM WAV at `dst`.
    async fn transcode(&self, src: &Path, dst: &Path) -> Result<(), WorkerError>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Run the transcription engine against `wav`, returning the path to
    /// the `.vtt` it wrote.
    async fn transcribe(
        &self,
        wav: &Path,
        language: &str,
        opts: &TranscribeOptions,
    ) -> Result<PathBuf, WorkerError>;
}

/// Runs a child process, draining stdout (echoed live) and stderr into
/// bounded ring buffers, and waits for exit. Shared by every production
/// capability below.
async fn run_with_ring_buffers(
    mut command: tokio::process::Command,
) -> Result<(std::process::ExitStatus, RingBuffer, RingBuffer), std::io::Error> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("child stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("child stderr was not piped"))?;
    let stdout_buf = RingBuffer::new();
    let stderr_buf = RingBuffer::new();

    let stdout_task = tokio::spawn(drain_into(stdout, stdout_buf.clone(), true));
    let stderr_task = tokio::spawn(drain_into(stderr, stderr_buf.clone(), false));

    let status = child.wait().await?;
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    Ok((status, stdout_buf, stderr_buf))
}

/// Shells out to `ffprobe` to read the clip duration.
pub struct FfprobeDecoder {
    pub binary: PathBuf,
}

impl Default for FfprobeDecoder {
    fn default() -> Self {
        Self { binary: PathBuf::from("ffprobe") }
    }
}

#[async_trait]
impl Decoder for FfprobeDecoder {
    async fn duration_secs(&self, path: &Path) -> Result<f64, WorkerError> {
        let output = tokio::process::Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| WorkerError::DecodeFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(WorkerError::DecodeFailed(format!(
                "ffprobe exited with {}",
                output.status
            )));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        text.trim()
            .parse::<f64>()
            .map_err(|e| WorkerError::DecodeFailed(format!("unparseable duration {text:?}: {e}")))
    }
}

/// Shells out to `ffmpeg` to transcode to 16 kHz mono PCM WAV.
pub struct FfmpegTranscoder {
    pub binary: PathBuf,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self { binary: PathBuf::from("ffmpeg") }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, src: &Path, dst: &Path) -> Result<(), WorkerError> {
        let mut command = tokio::process::Command::new(&self.binary);
        command
            .arg("-y")
            .arg("-i")
            .arg(src)
            .args(["-ar", "16000", "-ac", "1", "-c:a", "pcm_s16le"])
            .arg(dst);

        let (status, _stdout, stderr) = run_with_ring_buffers(command)
            .await
            .map_err(|e| WorkerError::TranscodeFailed(e.to_string()))?;

        if !status.success() {
            return Err(WorkerError::TranscodeFailed(format!(
                "ffmpeg exited with {status}: {}",
                stderr.tail().join("\n")
            )));
        }
        Ok(())
    }
}

/// Shells out to a whisper.cpp-compatible `main` binary with the fixed
/// parameter set from spec.md §4.4: `-bs 5 --entropy-thold 2.8
/// --max-context 64`, plus `--vad --vad-model <path>` gated on
/// `vad_enabled`/`vad_model` being present.
#[derive(Default)]
pub struct WhisperTranscriber;

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(
        &self,
        wav: &Path,
        language: &str,
        opts: &TranscribeOptions,
    ) -> Result<PathBuf, WorkerError> {
        let mut command = tokio::process::Command::new(&opts.whisper_bin);
        command
            .arg("-m")
            .arg(&opts.whisper_model)
            .arg("-f")
            .arg(wav)
            .arg("-l")
            .arg(language)
            .arg("-ovtt")
            .args(["-bs", &opts.beam_size.to_string()])
            .args(["--entropy-thold", &opts.entropy_threshold.to_string()])
            .args(["--max-context", &opts.max_context.to_string()]);

        if opts.vad_enabled {
            if let Some(model) = &opts.vad_model {
                command.arg("--vad").arg("--vad-model").arg(model);
            }
        }

        let (status, stdout, stderr) = run_with_ring_buffers(command)
            .await
            .map_err(|e| WorkerError::TranscribeFailed {
                message: e.to_string(),
                stdout_tail: Vec::new(),
                stderr_tail: Vec::new(),
            })?;

        if !status.success() {
            return Err(WorkerError::TranscribeFailed {
                message: format!("whisper engine exited with {status}"),
                stdout_tail: stdout.tail(),
                stderr_tail: stderr.tail(),
            });
        }

        let vtt_path = wav.with_extension("wav.vtt");
        if !vtt_path.exists() {
            return Err(WorkerError::TranscribeFailed {
                message: format!("engine reported success but {} is missing", vtt_path.display()),
                stdout_tail: stdout.tail(),
                stderr_tail: stderr.tail(),
            });
        }
        Ok(vtt_path)
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;

    /// Deterministic decoder: always returns a fixed duration.
    pub struct FakeDecoder(pub f64);

    #[async_trait]
    impl Decoder for FakeDecoder {
        async fn duration_secs(&self, _path: &Path) -> Result<f64, WorkerError> {
            Ok(self.0)
        }
    }

    /// Deterministic transcoder: writes a marker WAV file, or fails.
    pub struct FakeTranscoder {
        pub should_fail: bool,
    }

    #[async_trait]
    impl Transcoder for FakeTranscoder {
        async fn transcode(&self, _src: &Path, dst: &Path) -> Result<(), WorkerError> {
            if self.should_fail {
                return Err(WorkerError::TranscodeFailed("fake transcode failure".into()));
            }
            tokio::fs::write(dst, b"fake-wav-bytes")
                .await
                .map_err(|e| WorkerError::TranscodeFailed(e.to_string()))?;
            Ok(())
        }
    }

    /// Deterministic transcriber: writes a fixed `.vtt` body, or fails.
    pub struct FakeTranscriber {
        pub should_fail: bool,
        pub vtt_body: String,
    }

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(
            &self,
            wav: &Path,
            _language: &str,
            _opts: &TranscribeOptions,
        ) -> Result<PathBuf, WorkerError> {
            if self.should_fail {
                return Err(WorkerError::TranscribeFailed {
                    message: "fake transcribe failure".into(),
                    stdout_tail: vec!["engine stdout line".into()],
                    stderr_tail: vec!["engine stderr line".into()],
                });
            }
            let vtt_path = wav.with_extension("wav.vtt");
            tokio::fs::write(&vtt_path, &self.vtt_body)
                .await
                .map_err(|e| WorkerError::TranscribeFailed {
                    message: e.to_string(),
                    stdout_tail: Vec::new(),
                    stderr_tail: Vec::new(),
                })?;
            Ok(vtt_path)
        }
    }
}

#[cfg(test)]
#[path = "capability_tests.rs"]
mod tests;
