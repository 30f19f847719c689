use std::io;
use std::path::Path;

use tokio::process::Command;

use crate::config::AppConfig;
use crate::process::{self, ProcessOutput};
use crate::util;

pub const DEFAULT_TITLE: &str = "youtube_audio";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    pub title: String,
    pub id: String,
}

impl ResolvedMetadata {
    /// Fallback naming: a fixed title and the request timestamp as id.
    pub fn defaults(timestamp_ms: i64) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            id: timestamp_ms.to_string(),
        }
    }
}

fn build_ytdlp_base_command(cfg: &AppConfig) -> Command {
    let mut cmd = Command::new(&cfg.ytdlp_bin);
    cmd.args(&cfg.ytdlp_args);
    cmd.env("PATH", &cfg.ytdlp_path);

    if !cfg.inherit_proxy_env {
        // Avoid being accidentally bound to a dead local proxy (common in shell env).
        cmd.env_remove("http_proxy")
            .env_remove("https_proxy")
            .env_remove("HTTP_PROXY")
            .env_remove("HTTPS_PROXY")
            .env_remove("no_proxy")
            .env_remove("NO_PROXY");
    }

    if let Some(p) = &cfg.ytdlp_proxy {
        cmd.arg("--proxy").arg(p);
    }
    if let Some(c) = &cfg.cookies_file {
        cmd.arg("--cookies").arg(c);
    }
    if let Some(f) = &cfg.ffmpeg_bin {
        cmd.arg("--ffmpeg-location").arg(f);
    }

    cmd
}

/// Arguments for the audio extraction run, after the configured base arguments.
pub fn transcode_args(cfg: &AppConfig, url: &str, format: &str, output_template: &Path) -> Vec<String> {
    let mut args = vec![
        "-x".to_string(),
        "--audio-format".to_string(),
        format.to_string(),
        "--audio-quality".to_string(),
        cfg.audio_quality.clone(),
        "--no-playlist".to_string(),
    ];
    if cfg.embed_thumbnail {
        args.push("--embed-thumbnail".to_string());
    }
    args.push("-o".to_string());
    args.push(output_template.to_string_lossy().into_owned());
    // End of options: the URL comes from the client and must never parse as a flag.
    args.push("--".to_string());
    args.push(url.to_string());
    args
}

/// Arguments for the title/id lookup.
pub fn metadata_args(url: &str) -> Vec<String> {
    vec![
        "--get-title".to_string(),
        "--get-id".to_string(),
        "--".to_string(),
        url.to_string(),
    ]
}

/// Parses `--get-title --get-id` output: title on the first line, id on the second.
fn parse_info(stdout: &str, fallback: ResolvedMetadata) -> ResolvedMetadata {
    let mut lines = stdout.trim().lines();
    let title = lines
        .next()
        .filter(|l| !l.is_empty())
        .map(util::sanitize_path_segment)
        .unwrap_or(fallback.title);
    let id = lines
        .next()
        .filter(|l| !l.is_empty())
        .map(util::sanitize_path_segment)
        .unwrap_or(fallback.id);
    ResolvedMetadata { title, id }
}

fn from_url(url: &str, fallback: ResolvedMetadata) -> ResolvedMetadata {
    match util::video_id_from_url(url) {
        Some(id) => ResolvedMetadata { id, ..fallback },
        None => fallback,
    }
}

/// Looks up title and id for `url`. Never fails: any tool problem degrades to the
/// id found in the URL, then to `ResolvedMetadata::defaults`.
pub async fn resolve_metadata(cfg: &AppConfig, url: &str, timestamp_ms: i64) -> ResolvedMetadata {
    let fallback = ResolvedMetadata::defaults(timestamp_ms);

    let mut cmd = build_ytdlp_base_command(cfg);
    cmd.args(metadata_args(url));

    match process::run(cmd).await {
        Ok(out) if out.success() && !out.stdout.trim().is_empty() => parse_info(&out.stdout, fallback),
        Ok(out) => {
            log::warn!(
                "[YTDLP] get-info failed or returned no data. Code: {:?}, Stderr: {}",
                out.exit_code,
                out.stderr.trim()
            );
            from_url(url, fallback)
        }
        Err(e) => {
            log::warn!("[YTDLP] could not start get-info: {}", e);
            from_url(url, fallback)
        }
    }
}

/// Runs the extraction. `Err` only when the tool could not be started; a non-zero
/// exit comes back as `Ok` with the captured output.
pub async fn transcode(
    cfg: &AppConfig,
    url: &str,
    format: &str,
    output_template: &Path,
) -> io::Result<ProcessOutput> {
    let args = transcode_args(cfg, url, format, output_template);
    log::info!(
        "[YTDLP] Executing: {} {}",
        cfg.ytdlp_bin.display(),
        args.join(" ")
    );

    let mut cmd = build_ytdlp_base_command(cfg);
    cmd.args(&args);
    let out = process::run(cmd).await?;

    log::info!("[YTDLP] process exited with code {:?}", out.exit_code);
    if !out.stdout.is_empty() {
        log::debug!("[YTDLP] stdout:\n{}", out.stdout);
    }
    if !out.stderr.is_empty() {
        log::debug!("[YTDLP] stderr:\n{}", out.stderr);
    }
    Ok(out)
}
