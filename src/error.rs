//! Error types for the playback core.
//!
//! Resolution and download failures are contained by the playback engine and
//! never escape a single song. Catalog and command-level errors are returned
//! to the requester untouched.

use std::path::PathBuf;
use thiserror::Error;

/// Catalog (Spotify) lookup failures. Surfaced verbatim to the requester.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Referencia de catálogo no válida: {0}")]
    InvalidReference(String),

    #[error("Catálogo no configurado (faltan SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET)")]
    NotConfigured,

    #[error("Error de autenticación con el catálogo: {0}")]
    Auth(String),

    #[error("Error del catálogo: {0}")]
    Http(#[from] reqwest::Error),

    #[error("La canción del catálogo no tiene título o artista")]
    Incomplete,
}

/// Metadata lookup or search failures. The affected song is dropped.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("yt-dlp terminó con código {code:?}: {stderr}")]
    ToolFailed { code: Option<i32>, stderr: String },

    #[error("yt-dlp no devolvió información utilizable")]
    NoOutput,

    #[error("Sin resultados válidos para: {0}")]
    NoMatch(String),

    #[error("No se pudo ejecutar yt-dlp: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio download failures.
///
/// Everything except [`DownloadError::AntiBot`] is retried by the engine.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Archivo descargado demasiado pequeño ({size} bytes): {path}")]
    TooSmall { path: PathBuf, size: u64 },

    #[error("yt-dlp no produjo ningún archivo con prefijo {0}")]
    Missing(PathBuf),

    #[error("Bloqueo anti-bot del proveedor: {0}")]
    AntiBot(String),

    #[error("yt-dlp terminó con código {code:?}: {stderr}")]
    ExitCode { code: Option<i32>, stderr: String },

    #[error("Error de E/S durante la descarga: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DownloadError::AntiBot(_))
    }
}

/// Loop mode argument outside `off | single | queue`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Modo de repetición no válido: '{0}' (usa off, single o queue)")]
pub struct InvalidModeError(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("La cola está llena (máximo {0} canciones)")]
    Full(usize),
}

/// Failure turning a `/play` or `/playlist` argument into queue entries.
/// Replied to the requester; the queue is left untouched.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("No se encontró la canción: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("La playlist no contiene canciones reproducibles")]
    EmptyPlaylist,
}

/// The audio sink refused a resource.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("No hay sesión de voz activa")]
    NotConnected,

    #[error("Error del reproductor: {0}")]
    Player(String),
}

/// The decoder could not open the downloaded file at all.
#[derive(Error, Debug)]
#[error("No se pudo abrir el audio {path}: {source}")]
pub struct DecodeError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anti_bot_is_the_only_non_retryable_download_error() {
        assert!(!DownloadError::AntiBot("bot".into()).is_retryable());
        assert!(DownloadError::Missing(PathBuf::from("/tmp/x")).is_retryable());
        assert!(DownloadError::ExitCode { code: Some(1), stderr: String::new() }.is_retryable());
        assert!(DownloadError::TooSmall { path: PathBuf::from("/tmp/x"), size: 10 }.is_retryable());
    }
}
