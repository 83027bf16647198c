//! Encoding backend invocation

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use crate::services::filter_graph::EncodeRequest;

/// Result of one encoder process
#[derive(Debug, Clone)]
pub struct EncoderRun {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stderr: String,
}

#[async_trait]
pub trait EncoderBackend: Send + Sync {
    /// Run the encoder to completion; `Err` only when it could not be started
    async fn encode(&self, request: &EncodeRequest) -> std::io::Result<EncoderRun>;
}

pub struct FfmpegEncoder {
    ffmpeg_path: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

#[async_trait]
impl EncoderBackend for FfmpegEncoder {
    async fn encode(&self, request: &EncodeRequest) -> std::io::Result<EncoderRun> {
        tracing::debug!(
            output = %request.output.display(),
            inputs = request.inputs.len(),
            "Starting ffmpeg"
        );
        let output = Command::new(&self.ffmpeg_path)
            .args(request.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(EncoderRun {
            exit_code: output.status.code(),
            success: output.status.success(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Last `lines` non-empty lines of diagnostic output, joined with " | "
pub fn diagnostic_tail(stderr: &str, lines: usize) -> String {
    let mut tail: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .rev()
        .take(lines)
        .collect();
    tail.reverse();
    tail.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_tail_keeps_last_lines_in_order() {
        let stderr = "line 1\n\nline 2\n   \nline 3\nline 4\n";
        assert_eq!(diagnostic_tail(stderr, 2), "line 3 | line 4");
        assert_eq!(diagnostic_tail(stderr, 12), "line 1 | line 2 | line 3 | line 4");
        assert_eq!(diagnostic_tail("", 3), "");
    }
}
