use actix_web::error::JsonPayloadError;
use actix_web::http::header::{
    self, Charset, ContentDisposition, DispositionParam, DispositionType, ExtendedValue,
};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use async_stream::stream;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::ApiError;
use crate::job::{self, DownloadRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadAudioRequest {
    #[serde(default)]
    pub youtube_url: Option<String>,
    // Passed to yt-dlp as-is; the configured default applies when absent.
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadAudioResponse {
    pub success: bool,
    pub message: String,
    pub download_url: String,
}

pub fn download_url(filename: &str) -> String {
    format!("/download/{}", urlencoding::encode(filename))
}

pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "YouTube Audio Download Service",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /": "Health check",
            "POST /download-audio": "Extract audio into the downloads directory (body: {youtubeUrl, format})",
            "GET /download/{filename}": "Fetch a produced file once; it is deleted after sending"
        }
    }))
}

/// Maps body parse failures to the same JSON error shape as every other failure.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(err.to_string()).into()
}

pub async fn download_audio(
    req: web::Json<DownloadAudioRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let req = req.into_inner();
    let source_url = match req.youtube_url {
        Some(u) if !u.trim().is_empty() => u,
        _ => return Err(ApiError::MissingUrl),
    };
    let format = req
        .format
        .unwrap_or_else(|| state.config.default_format.clone());

    let found = job::run(
        state.config.as_ref(),
        &state.output,
        &DownloadRequest { source_url, format },
    )
    .await?;

    Ok(HttpResponse::Ok().json(DownloadAudioResponse {
        success: true,
        message: "Audio downloaded successfully!".to_string(),
        download_url: download_url(&found.filename),
    }))
}

fn attachment(filename: &str) -> ContentDisposition {
    let mut parameters = vec![DispositionParam::Filename(filename.to_string())];
    if !filename.is_ascii() {
        parameters.push(DispositionParam::FilenameExt(ExtendedValue {
            charset: Charset::Ext("UTF-8".to_string()),
            language_tag: None,
            value: filename.as_bytes().to_vec(),
        }));
    }
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters,
    }
}

/// Streams a produced file once, then removes it.
pub async fn retrieve(
    filename: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let filename = filename.into_inner();
    let path = match state.output.resolve_retrieval(&filename).await {
        Ok(p) => p,
        Err(e) => {
            log::info!("[RETRIEVE] {}: {}", e, filename);
            return Err(e.into());
        }
    };

    let file = File::open(&path).await.map_err(|e| {
        log::info!("[RETRIEVE] cannot open {}: {}", path.display(), e);
        ApiError::NotFound
    })?;
    let len = file.metadata().await.map(|m| m.len()).ok();
    let content_type = mime_guess::from_path(&path).first_or_octet_stream();

    log::info!("[RETRIEVE] Serving file: {}", path.display());

    // The file is deleted only once the whole body has been read out.
    let body = stream! {
        let mut file = file;
        let mut buffer = vec![0u8; 64 * 1024];
        loop {
            match file.read(&mut buffer).await {
                Ok(0) => break,
                Ok(n) => yield Ok(bytes::Bytes::copy_from_slice(&buffer[..n])),
                Err(e) => {
                    log::error!("[RETRIEVE] Error sending file {}: {}", path.display(), e);
                    yield Err(e);
                    return;
                }
            }
        }
        drop(file);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => log::info!("[RETRIEVE] File sent and deleted: {}", path.display()),
            Err(e) => log::error!("[RETRIEVE] Error deleting file {}: {}", path.display(), e),
        }
    };

    let mut resp = HttpResponse::Ok();
    resp.content_type(content_type.to_string())
        .insert_header(attachment(&filename))
        .insert_header((header::CACHE_CONTROL, "no-store"));
    if let Some(len) = len {
        resp.insert_header((header::CONTENT_LENGTH, len.to_string()));
    }
    Ok(resp.streaming(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_url_is_percent_encoded() {
        assert_eq!(download_url("a b.mp3"), "/download/a%20b.mp3");
        assert_eq!(download_url("x_y-1.mp3"), "/download/x_y-1.mp3");
    }

    #[test]
    fn ascii_attachment_header() {
        assert_eq!(
            attachment("song_1.mp3").to_string(),
            r#"attachment; filename="song_1.mp3""#
        );
    }

    #[test]
    fn non_ascii_attachment_adds_extended_filename() {
        let value = attachment("曲.mp3").to_string();
        assert!(value.starts_with("attachment; filename="));
        assert!(value.contains("filename*=UTF-8''"));
    }
}
