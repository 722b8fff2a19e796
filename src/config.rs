use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::audio::engine::PlaybackSettings;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Spotify (opcional; sin credenciales /playlist queda deshabilitado)
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,

    // yt-dlp
    pub ytdlp_path: String,
    pub ytdlp_cookies: PathBuf,
    pub min_audio_bytes: u64,

    // Paths
    pub scratch_dir: PathBuf,

    // Reproducción
    pub default_volume: f32,
    pub max_queue_size: usize,
    pub download_attempts: u32,
    pub retry_backoff_ms: u64,
    pub error_debounce_ms: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,
            application_id: std::env::var("APPLICATION_ID")?.parse()?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            // Spotify
            spotify_client_id: non_empty_var("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: non_empty_var("SPOTIFY_CLIENT_SECRET"),

            // yt-dlp
            ytdlp_path: non_empty_var("YTDLP_PATH").unwrap_or(defaults.ytdlp_path),
            ytdlp_cookies: non_empty_var("YTDLP_COOKIES")
                .map(PathBuf::from)
                .unwrap_or(defaults.ytdlp_cookies),
            min_audio_bytes: parse_var("MIN_AUDIO_BYTES", defaults.min_audio_bytes)?,

            // Paths
            scratch_dir: non_empty_var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),

            // Reproducción
            default_volume: parse_var("DEFAULT_VOLUME", defaults.default_volume)?,
            max_queue_size: parse_var("MAX_QUEUE_SIZE", defaults.max_queue_size)?,
            download_attempts: parse_var("DOWNLOAD_ATTEMPTS", defaults.download_attempts)?,
            retry_backoff_ms: parse_var("RETRY_BACKOFF_MS", defaults.retry_backoff_ms)?,
            error_debounce_ms: parse_var("ERROR_DEBOUNCE_MS", defaults.error_debounce_ms)?,
        };

        // Create directories if they don't exist
        std::fs::create_dir_all(&config.scratch_dir)?;

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Volume must be between 0.0 and 2.0
    /// - Queue size and download attempts must be greater than 0
    /// - Spotify credentials come in pairs
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.default_volume) {
            anyhow::bail!("Default volume must be between 0.0 and 2.0, got: {}", self.default_volume);
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.download_attempts == 0 {
            anyhow::bail!("Download attempts must be greater than 0");
        }

        if self.spotify_client_id.is_some() != self.spotify_client_secret.is_some() {
            anyhow::bail!("SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET must be set together");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Excludes the Discord token and the Spotify secret.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {})\n  \
            Spotify: {}\n  \
            yt-dlp: {} (cookies: {})\n  \
            Scratch: {}\n  \
            Playback: {}% vol, {} queue, {} attempts, {}ms backoff, {}ms debounce",
            self.application_id,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            if self.has_spotify() { "enabled" } else { "disabled" },
            self.ytdlp_path,
            self.ytdlp_cookies.display(),
            self.scratch_dir.display(),
            (self.default_volume * 100.0) as u32,
            self.max_queue_size,
            self.download_attempts,
            self.retry_backoff_ms,
            self.error_debounce_ms,
        )
    }

    pub fn has_spotify(&self) -> bool {
        self.spotify_client_id.is_some() && self.spotify_client_secret.is_some()
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            download_attempts: self.download_attempts,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            error_debounce: Duration::from_millis(self.error_debounce_ms),
            max_queue_size: self.max_queue_size,
        }
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,

            spotify_client_id: None,
            spotify_client_secret: None,

            ytdlp_path: "yt-dlp".to_string(),
            ytdlp_cookies: "./cookies.txt".into(),
            min_audio_bytes: 1024,

            scratch_dir: "/tmp/open-jukebox".into(),

            default_volume: 0.5,
            max_queue_size: 1000,
            download_attempts: 3,
            retry_backoff_ms: 2000,
            error_debounce_ms: 500,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty_var(name) {
        Some(value) => value
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválido ('{}'): {}", name, value, e)),
        None => Ok(default),
    }
}
