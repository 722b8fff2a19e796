//! # Sources Module
//!
//! Everything that turns a user reference into playable audio.
//!
//! - [`ytdlp`] - yt-dlp subprocess adapter ([`MediaResolver`]): metadata
//!   lookup, top-1 search and audio download.
//! - [`spotify`] - Spotify Web API client ([`CatalogProvider`]).
//! - [`catalog`] - playlist/track expansion into pending queue entries.
//! - [`request`] - maps a `/play` or `/playlist` argument to queue entries.

pub mod catalog;
pub mod request;
pub mod spotify;
pub mod ytdlp;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use catalog::CatalogExpander;
pub use request::RequestResolver;
pub use spotify::SpotifyClient;
pub use ytdlp::YtDlpResolver;

use crate::{
    audio::queue::SongRef,
    error::{CatalogError, DownloadError, ResolutionError},
};

/// Canción resuelta a una URL reproducible
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrack {
    pub title: String,
    pub url: String,
}

/// Trait de la herramienta de extracción (yt-dlp)
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Metadatos de una URL directa, sin descargar
    async fn lookup_metadata(&self, url: &str) -> Result<ResolvedTrack, ResolutionError>;

    /// Mejor resultado para una búsqueda libre
    async fn search(&self, query: &str) -> Result<ResolvedTrack, ResolutionError>;

    /// Descarga el mejor audio en `<dest_prefix>.<ext>` y devuelve la ruta
    async fn download(&self, url: &str, dest_prefix: &Path) -> Result<PathBuf, DownloadError>;
}

/// Entrada de catálogo tal como la devuelve el proveedor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogTrack {
    pub title: Option<String>,
    pub primary_artist: Option<String>,
}

impl CatalogTrack {
    /// `None` si falta el título o el artista principal
    pub fn into_song(self) -> Option<SongRef> {
        match (self.primary_artist, self.title) {
            (Some(artist), Some(title)) => Some(SongRef::unresolved(artist, title)),
            _ => None,
        }
    }
}

/// Trait del catálogo de terceros (Spotify)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn playlist_page(
        &self,
        playlist_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CatalogTrack>, CatalogError>;

    async fn track(&self, track_id: &str) -> Result<CatalogTrack, CatalogError>;
}
