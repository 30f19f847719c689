//! One download job: resolve metadata, name the artifact, run the tool, find the file.
//!
//! Every request runs its own job; nothing is shared between jobs except the output
//! directory, and collisions there are avoided by the timestamped base name. A failed
//! job is never retried here.

use std::fmt;
use std::io;

use chrono::Utc;

use crate::config::AppConfig;
use crate::output::{LocatedFile, OutputDir};
use crate::{util, ytdlp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub source_url: String,
    pub format: String,
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The tool binary could not be launched at all.
    #[error("could not start yt-dlp: {0}")]
    Spawn(#[source] io::Error),

    #[error("yt-dlp exited with code {exit_code:?}")]
    ToolFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Exit code 0, but nothing in the output directory matches the job's base name.
    #[error("yt-dlp reported success but no output file matches {base}")]
    OutputMissing { base: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    MetadataResolved,
    Transcoding,
    Located,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Received => "received",
            Stage::MetadataResolved => "metadata-resolved",
            Stage::Transcoding => "transcoding",
            Stage::Located => "located",
        };
        f.write_str(s)
    }
}

pub async fn run(
    cfg: &AppConfig,
    output: &OutputDir,
    req: &DownloadRequest,
) -> Result<LocatedFile, JobError> {
    let received_ms = Utc::now().timestamp_millis();
    log::info!(
        "[JOB] {}: url={} format={}",
        Stage::Received,
        req.source_url,
        req.format
    );
    if !util::is_recognized_video_url(&req.source_url) {
        log::warn!(
            "[JOB] url does not look like a video link, passing it through: {}",
            req.source_url
        );
    }

    let meta = ytdlp::resolve_metadata(cfg, &req.source_url, received_ms).await;
    log::info!(
        "[JOB] {}: title={:?} id={:?}",
        Stage::MetadataResolved,
        meta.title,
        meta.id
    );

    let naming = output.naming(&meta, &req.format, Utc::now().timestamp_millis());
    log::info!("[JOB] {}: base={}", Stage::Transcoding, naming.base);

    let result = match ytdlp::transcode(cfg, &req.source_url, &req.format, &naming.output_template).await {
        Ok(r) => r,
        Err(e) => {
            log::error!("[JOB] Failed to start yt-dlp process: {}", e);
            return Err(JobError::Spawn(e));
        }
    };

    if !result.success() {
        log::warn!(
            "[JOB] yt-dlp failed (code {:?}): {}",
            result.exit_code,
            result.stderr.trim()
        );
        return Err(JobError::ToolFailed {
            exit_code: result.exit_code,
            stderr: result.stderr,
        });
    }

    match output.locate(&naming, &req.format).await {
        Some(found) => {
            log::info!(
                "[JOB] {}: download successful, file identified: {}",
                Stage::Located,
                found.filename
            );
            Ok(found)
        }
        None => {
            log::error!(
                "[JOB] yt-dlp success, but no output file for {} in {}",
                naming.base,
                output.path().display()
            );
            Err(JobError::OutputMissing { base: naming.base })
        }
    }
}
