use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use super::CatalogProvider;
use crate::{audio::queue::SongRef, error::CatalogError};

/// Tamaño fijo de página al paginar el catálogo
pub const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Playlist,
    Track,
}

impl CatalogKind {
    fn segment(self) -> &'static str {
        match self {
            CatalogKind::Playlist => "playlist",
            CatalogKind::Track => "track",
        }
    }
}

/// Convierte referencias de catálogo en entradas pendientes de resolver
pub struct CatalogExpander {
    provider: Arc<dyn CatalogProvider>,
}

impl CatalogExpander {
    pub fn new(provider: Arc<dyn CatalogProvider>) -> Self {
        Self { provider }
    }

    /// Expande una playlist completa, en orden, página a página
    pub async fn expand(&self, playlist_ref: &str) -> Result<Vec<SongRef>, CatalogError> {
        let playlist_id = parse_catalog_id(playlist_ref, CatalogKind::Playlist)?;

        let mut songs = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.provider.playlist_page(&playlist_id, PAGE_SIZE, offset).await?;
            let fetched = page.len();
            debug!("📄 Página de catálogo offset={} con {} entradas", offset, fetched);

            songs.extend(page.into_iter().filter_map(|track| track.into_song()));

            if fetched < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }

        info!("🎵 Playlist {} expandida: {} canciones", playlist_id, songs.len());
        Ok(songs)
    }

    pub async fn expand_single(&self, track_ref: &str) -> Result<SongRef, CatalogError> {
        let track_id = parse_catalog_id(track_ref, CatalogKind::Track)?;
        self.provider
            .track(&track_id)
            .await?
            .into_song()
            .ok_or(CatalogError::Incomplete)
    }
}

/// Reconoce enlaces del catálogo (`open.spotify.com`, `spotify:` URIs)
pub fn catalog_kind(reference: &str) -> Option<CatalogKind> {
    [CatalogKind::Playlist, CatalogKind::Track]
        .into_iter()
        .find(|kind| parse_catalog_id(reference, *kind).is_ok())
}

/// Extrae el id de `https://open.spotify.com/[intl-xx/]<tipo>/<id>?si=...` o
/// `spotify:<tipo>:<id>`
pub fn parse_catalog_id(reference: &str, kind: CatalogKind) -> Result<String, CatalogError> {
    let reference = reference.trim();
    let invalid = || CatalogError::InvalidReference(reference.to_string());

    if let Some(rest) = reference.strip_prefix("spotify:") {
        let mut parts = rest.split(':');
        return match (parts.next(), parts.next()) {
            (Some(segment), Some(id)) if segment == kind.segment() && is_catalog_id(id) => Ok(id.to_string()),
            _ => Err(invalid()),
        };
    }

    let url = Url::parse(reference).map_err(|_| invalid())?;
    if url.host_str() != Some("open.spotify.com") {
        return Err(invalid());
    }

    let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();
    segments
        .windows(2)
        .find(|pair| pair[0] == kind.segment())
        .map(|pair| pair[1])
        .filter(|id| is_catalog_id(id))
        .map(str::to_string)
        .ok_or_else(invalid)
}

fn is_catalog_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{CatalogTrack, MockCatalogProvider};
    use pretty_assertions::assert_eq;

    fn full_page(offset: usize, len: usize) -> Vec<CatalogTrack> {
        (offset..offset + len)
            .map(|n| CatalogTrack {
                title: Some(format!("title {}", n)),
                primary_artist: Some(format!("artist {}", n)),
            })
            .collect()
    }

    #[tokio::test]
    async fn paginates_until_a_short_page() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_playlist_page()
            .times(3)
            .returning(|_, limit, offset| {
                assert_eq!(limit, PAGE_SIZE);
                let len = if offset < 200 { 100 } else { 50 };
                Ok(full_page(offset, len))
            });

        let expander = CatalogExpander::new(Arc::new(provider));
        let songs = expander
            .expand("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc")
            .await
            .unwrap();

        assert_eq!(songs.len(), 250);
        assert_eq!(songs[0], SongRef::unresolved("artist 0", "title 0"));
        assert_eq!(songs[249], SongRef::unresolved("artist 249", "title 249"));
    }

    #[tokio::test]
    async fn skips_entries_without_title_or_artist() {
        let mut provider = MockCatalogProvider::new();
        provider.expect_playlist_page().times(1).returning(|_, _, _| {
            Ok(vec![
                CatalogTrack {
                    title: Some("ok".into()),
                    primary_artist: Some("someone".into()),
                },
                CatalogTrack::default(),
                CatalogTrack {
                    title: Some("sin artista".into()),
                    primary_artist: None,
                },
            ])
        });

        let expander = CatalogExpander::new(Arc::new(provider));
        let songs = expander.expand("spotify:playlist:abc123").await.unwrap();

        assert_eq!(songs, vec![SongRef::unresolved("someone", "ok")]);
    }

    #[tokio::test]
    async fn provider_errors_are_returned_untouched() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_playlist_page()
            .times(1)
            .returning(|_, _, _| Err(CatalogError::Auth("401 Unauthorized".into())));

        let expander = CatalogExpander::new(Arc::new(provider));
        let err = expander.expand("spotify:playlist:abc123").await.unwrap_err();

        assert_eq!(err.to_string(), "Error de autenticación con el catálogo: 401 Unauthorized");
    }

    #[tokio::test]
    async fn single_track_expansion() {
        let mut provider = MockCatalogProvider::new();
        provider.expect_track().times(1).returning(|id| {
            assert_eq!(id, "4uLU6hMCjMI75M1A2tKUQC");
            Ok(CatalogTrack {
                title: Some("Never Gonna Give You Up".into()),
                primary_artist: Some("Rick Astley".into()),
            })
        });

        let expander = CatalogExpander::new(Arc::new(provider));
        let song = expander
            .expand_single("https://open.spotify.com/intl-es/track/4uLU6hMCjMI75M1A2tKUQC")
            .await
            .unwrap();

        assert_eq!(song, SongRef::unresolved("Rick Astley", "Never Gonna Give You Up"));
    }

    #[test]
    fn reference_parsing() {
        assert_eq!(
            parse_catalog_id("spotify:playlist:abc123", CatalogKind::Playlist).unwrap(),
            "abc123"
        );
        assert!(parse_catalog_id("spotify:track:abc123", CatalogKind::Playlist).is_err());
        assert!(parse_catalog_id("https://example.com/playlist/abc", CatalogKind::Playlist).is_err());
        assert!(parse_catalog_id("not a url", CatalogKind::Track).is_err());

        assert_eq!(
            catalog_kind("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"),
            Some(CatalogKind::Track)
        );
        assert_eq!(catalog_kind("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), None);
    }
}
