//! HTTP service that turns a video link into a one-time audio download via yt-dlp.

use actix_cors::Cors;
use actix_web::web;

use crate::config::AppConfig;

pub mod config;
pub mod error;
pub mod handlers;
pub mod job;
pub mod output;
pub mod process;
pub mod state;
pub mod util;
pub mod ytdlp;

/// Registers every route; shared by the binary and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(handlers::json_error_handler))
        .service(web::resource("/").route(web::get().to(handlers::index)))
        .service(web::resource("/download-audio").route(web::post().to(handlers::download_audio)))
        .service(web::resource("/download/{filename}").route(web::get().to(handlers::retrieve)));
}

/// Cross-origin policy: permissive unless `cors_allowed_origins` lists origins.
pub fn cors(config: &AppConfig) -> Cors {
    if config.cors_allowed_origins.is_empty() {
        return Cors::permissive();
    }
    config
        .cors_allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}
