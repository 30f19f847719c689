use actix_web::{web, App, HttpServer};

use yt_audio_service::config::{self, AppConfig};
use yt_audio_service::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let explicit = std::env::args()
        .skip_while(|a| a != "--config")
        .nth(1);
    let cfg_path = explicit
        .clone()
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());

    let cfg = match AppConfig::load_or_default(&cfg_path, explicit.is_some()) {
        Ok(c) => c.apply_env(),
        Err(e) => {
            log::error!("[CONFIG] Failed to load {}: {:#}", cfg_path, e);
            std::process::exit(1);
        }
    };

    let state = AppState::new(cfg);
    if let Err(e) = state.output.ensure().await {
        log::error!(
            "[OUTPUT] Error creating downloads directory {}: {}",
            state.output.path().display(),
            e
        );
        std::process::exit(1);
    }

    log::info!("========================================");
    log::info!("  YouTube Audio Download Service");
    log::info!("  http://{}", state.config.listen_addr);
    log::info!("  downloads: {}", state.output.path().display());
    log::info!("  yt-dlp: {}", state.config.ytdlp_bin.display());
    log::info!("========================================");

    let bind_addr = state.config.listen_addr.clone();
    let data = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .wrap(yt_audio_service::cors(&data.config))
            .wrap(actix_web::middleware::Logger::default())
            .app_data(data.clone())
            .configure(yt_audio_service::configure)
    })
    .bind(bind_addr.as_str())?
    .run()
    .await
}
