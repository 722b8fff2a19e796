use anyhow::Result;
use serenity::{http::Http, model::gateway::GatewayIntents, Client};
use songbird::SerenityInit;
use std::sync::Arc;
use tracing::{error, info, warn};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod ui;

#[cfg(test)]
mod testing;

use crate::audio::{decoder::SymphoniaDecoder, engine::EngineDeps, tempfile::TempFileManager, AudioPlayer};
use crate::bot::{notifier::ChannelNotifier, JukeboxBot};
use crate::config::Config;
use crate::sources::{CatalogExpander, RequestResolver, SpotifyClient, YtDlpResolver};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("open_jukebox=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Open Jukebox v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;

    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&config).await;
    }

    info!("{}", config.summary());

    // Restos de ejecuciones anteriores
    let temp_files = TempFileManager::new(&config.scratch_dir);
    temp_files.sweep_stale().await;

    let ytdlp = Arc::new(YtDlpResolver::new(
        config.ytdlp_path.clone(),
        config.ytdlp_cookies.clone(),
        config.min_audio_bytes,
    ));
    if let Err(e) = ytdlp.verify_dependencies().await {
        warn!("⚠️ {:?}; las descargas fallarán hasta que yt-dlp esté disponible", e);
    }

    let catalog = match (&config.spotify_client_id, &config.spotify_client_secret) {
        (Some(id), Some(secret)) => {
            info!("🟢 Catálogo de Spotify habilitado");
            let client = SpotifyClient::new(id.clone(), secret.clone());
            Some(CatalogExpander::new(Arc::new(client)))
        }
        _ => {
            info!("⚪ Sin credenciales de Spotify; /playlist deshabilitado");
            None
        }
    };
    let requests = Arc::new(RequestResolver::new(ytdlp.clone(), catalog));

    let notifier = Arc::new(ChannelNotifier::new(Arc::new(Http::new(&config.discord_token))));

    let player = Arc::new(AudioPlayer::new(EngineDeps {
        resolver: ytdlp.clone(),
        decoder: Arc::new(SymphoniaDecoder),
        notifier: notifier.clone(),
        temp_files: temp_files.clone(),
        settings: config.playback_settings(),
    }));

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    let token = config.discord_token.clone();
    let handler = JukeboxBot::new(config, player, requests, notifier, ytdlp);

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .register_songbird()
        .await?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        shard_manager.shutdown_all().await;
    });

    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    temp_files.sweep_stale().await;
    Ok(())
}

async fn health_check(config: &Config) -> Result<()> {
    let yt_dlp = async_process::Command::new(&config.ytdlp_path)
        .arg("--version")
        .output()
        .await?;

    if yt_dlp.status.success() {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("Dependencias faltantes: {}", config.ytdlp_path);
    }
}
