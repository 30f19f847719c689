use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: String,
    pub output_dir: PathBuf,
    // Empty: any origin may call the API.
    pub cors_allowed_origins: Vec<String>,

    // Used when a request omits `format`.
    pub default_format: String,
    pub audio_quality: String,
    pub embed_thumbnail: bool,

    pub ytdlp_bin: PathBuf,
    // Prepended to every invocation, e.g. ["-m", "yt_dlp"] with ytdlp_bin = "python3".
    pub ytdlp_args: Vec<String>,
    pub ytdlp_path: String,
    pub ffmpeg_bin: Option<PathBuf>,
    pub ytdlp_proxy: Option<String>,
    // Whether to let yt-dlp inherit http_proxy/https_proxy from the service environment.
    pub inherit_proxy_env: bool,
    pub cookies_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct AppConfigFile {
    listen_addr: Option<String>,
    output_dir: Option<String>,
    cors_allowed_origins: Option<Vec<String>>,

    default_format: Option<String>,
    audio_quality: Option<String>,
    embed_thumbnail: Option<bool>,

    ytdlp_bin: Option<String>,
    ytdlp_args: Option<Vec<String>>,
    ytdlp_path: Option<String>,
    ffmpeg_bin: Option<String>,
    ytdlp_proxy: Option<String>,
    inherit_proxy_env: Option<bool>,
    cookies_file: Option<String>,
}

fn default_ytdlp_path() -> String {
    std::env::var("PATH").unwrap_or_else(|_| "/usr/local/bin:/usr/bin:/bin".to_string())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.and_then(|s| {
        let s = s.trim().to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    })
}

/// Replaces the port of `addr` with `port`, keeping the host part.
fn with_port(addr: &str, port: &str) -> String {
    match addr.rsplit_once(':') {
        Some((host, _)) => format!("{}:{}", host, port),
        None => format!("{}:{}", addr, port),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_file(AppConfigFile::default())
    }
}

impl AppConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read config file: {}",
                path.to_string_lossy().as_ref()
            )
        })?;
        Self::parse(&raw)
    }

    /// Like [`AppConfig::load`], but an absent file at the default location yields the
    /// built-in defaults instead of an error.
    pub fn load_or_default(path: impl AsRef<Path>, explicit: bool) -> Result<Self> {
        let path = path.as_ref();
        if !explicit && !path.exists() {
            log::info!(
                "[CONFIG] {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let file: AppConfigFile = toml::from_str(raw).context("Failed to parse config.toml")?;
        let cfg = Self::from_file(file);

        if cfg.default_format.trim().is_empty() {
            return Err(anyhow!("Invalid default_format: must not be empty"));
        }
        if cfg.ytdlp_bin.as_os_str().is_empty() {
            return Err(anyhow!("Invalid ytdlp_bin: must not be empty"));
        }

        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        Self {
            listen_addr: file.listen_addr.unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            output_dir: PathBuf::from(file.output_dir.unwrap_or_else(|| "downloads".to_string())),
            cors_allowed_origins: file
                .cors_allowed_origins
                .unwrap_or_default()
                .into_iter()
                .filter_map(|o| non_empty(Some(o)))
                .collect(),

            default_format: file.default_format.unwrap_or_else(|| "mp3".to_string()),
            audio_quality: file.audio_quality.unwrap_or_else(|| "0".to_string()),
            embed_thumbnail: file.embed_thumbnail.unwrap_or(true),

            ytdlp_bin: PathBuf::from(file.ytdlp_bin.unwrap_or_else(|| "yt-dlp".to_string())),
            ytdlp_args: file.ytdlp_args.unwrap_or_default(),
            ytdlp_path: file.ytdlp_path.unwrap_or_else(default_ytdlp_path),
            ffmpeg_bin: non_empty(file.ffmpeg_bin).map(PathBuf::from),
            ytdlp_proxy: non_empty(file.ytdlp_proxy),
            inherit_proxy_env: file.inherit_proxy_env.unwrap_or(false),
            cookies_file: non_empty(file.cookies_file).map(PathBuf::from),
        }
    }

    /// Applies the `PORT` environment override used by container hosts.
    pub fn apply_env(mut self) -> Self {
        if let Ok(port) = std::env::var("PORT") {
            let port = port.trim();
            if !port.is_empty() {
                self.listen_addr = with_port(&self.listen_addr, port);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = AppConfig::parse("").unwrap();
        assert_eq!(cfg.listen_addr, "0.0.0.0:3000");
        assert_eq!(cfg.output_dir, PathBuf::from("downloads"));
        assert_eq!(cfg.default_format, "mp3");
        assert_eq!(cfg.audio_quality, "0");
        assert!(cfg.embed_thumbnail);
        assert_eq!(cfg.ytdlp_bin, PathBuf::from("yt-dlp"));
        assert!(cfg.ytdlp_args.is_empty());
        assert!(cfg.ffmpeg_bin.is_none());
        assert!(cfg.cookies_file.is_none());
        assert!(!cfg.inherit_proxy_env);
        assert!(cfg.cors_allowed_origins.is_empty());
    }

    #[test]
    fn cors_origins_are_trimmed() {
        let cfg = AppConfig::parse(
            r#"cors_allowed_origins = [" https://app.example.com ", ""]"#,
        )
        .unwrap();
        assert_eq!(cfg.cors_allowed_origins, vec!["https://app.example.com".to_string()]);
    }

    #[test]
    fn blank_optional_paths_are_dropped() {
        let cfg = AppConfig::parse(
            r#"
            ffmpeg_bin = "  "
            ytdlp_proxy = ""
            cookies_file = "cookies.txt"
            ytdlp_args = ["-m", "yt_dlp"]
            "#,
        )
        .unwrap();
        assert!(cfg.ffmpeg_bin.is_none());
        assert!(cfg.ytdlp_proxy.is_none());
        assert_eq!(cfg.cookies_file, Some(PathBuf::from("cookies.txt")));
        assert_eq!(cfg.ytdlp_args, vec!["-m".to_string(), "yt_dlp".to_string()]);
    }

    #[test]
    fn rejects_empty_default_format() {
        let err = AppConfig::parse(r#"default_format = """#).unwrap_err();
        assert!(err.to_string().contains("default_format"));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(AppConfig::parse("listen_addr = [").is_err());
    }

    #[test]
    fn missing_default_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_or_default(dir.path().join("config.toml"), false).unwrap();
        assert_eq!(cfg.default_format, "mp3");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load_or_default(dir.path().join("nope.toml"), true).is_err());
    }

    #[test]
    fn port_override_keeps_host() {
        assert_eq!(with_port("0.0.0.0:3000", "8080"), "0.0.0.0:8080");
        assert_eq!(with_port("localhost", "9000"), "localhost:9000");
    }
}
