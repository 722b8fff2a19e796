use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use super::{
    catalog::{catalog_kind, CatalogKind},
    CatalogExpander, MediaResolver,
};
use crate::{
    audio::queue::SongRef,
    error::{CatalogError, RequestError},
};

/// Traduce el argumento de `/play` o `/playlist` a entradas de cola.
///
/// - Enlace de canción del catálogo: entrada pendiente, se busca al llegar a la cabeza
/// - Cualquier otra URL: metadatos directos con yt-dlp
/// - Texto libre: búsqueda top-1
pub struct RequestResolver {
    resolver: Arc<dyn MediaResolver>,
    catalog: Option<CatalogExpander>,
}

impl RequestResolver {
    pub fn new(resolver: Arc<dyn MediaResolver>, catalog: Option<CatalogExpander>) -> Self {
        Self { resolver, catalog }
    }

    pub fn has_catalog(&self) -> bool {
        self.catalog.is_some()
    }

    pub async fn song(&self, query: &str) -> Result<SongRef, RequestError> {
        let query = query.trim();

        match catalog_kind(query) {
            Some(CatalogKind::Track) => {
                let song = self.catalog()?.expand_single(query).await?;
                debug!("🎯 Canción de catálogo: {}", song.display_title());
                return Ok(song);
            }
            Some(CatalogKind::Playlist) => {
                return Err(CatalogError::InvalidReference(format!("{} (usa /playlist)", query)).into());
            }
            None => {}
        }

        let track = if is_url(query) {
            self.resolver.lookup_metadata(query).await?
        } else {
            self.resolver.search(query).await?
        };

        info!("🔍 '{}' -> {}", query, track.url);
        Ok(SongRef::resolved(track.title, track.url))
    }

    pub async fn playlist(&self, reference: &str) -> Result<Vec<SongRef>, RequestError> {
        let songs = self.catalog()?.expand(reference.trim()).await?;
        if songs.is_empty() {
            return Err(RequestError::EmptyPlaylist);
        }
        Ok(songs)
    }

    fn catalog(&self) -> Result<&CatalogExpander, CatalogError> {
        self.catalog.as_ref().ok_or(CatalogError::NotConfigured)
    }
}

fn is_url(query: &str) -> bool {
    Url::parse(query).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sources::{CatalogTrack, MockCatalogProvider},
        testing::{url, FakeResolver},
    };
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    fn requests(resolver: FakeResolver, provider: Option<MockCatalogProvider>) -> RequestResolver {
        let catalog = provider.map(|p| CatalogExpander::new(Arc::new(p)));
        RequestResolver::new(Arc::new(resolver), catalog)
    }

    #[tokio::test]
    async fn free_text_is_searched() {
        let resolver = FakeResolver::default().with_search("never gonna give you up", "Rick Astley", &url(1));
        let song = requests(resolver, None)
            .song("  never gonna give you up ")
            .await
            .unwrap();

        assert_eq!(song, SongRef::resolved("Rick Astley", url(1)));
    }

    #[tokio::test]
    async fn urls_use_metadata_lookup() {
        let resolver = FakeResolver::default().with_lookup(&url(2), "Direct");
        let requests = requests(resolver, None);

        assert_eq!(
            requests.song(&url(2)).await.unwrap(),
            SongRef::resolved("Direct", url(2))
        );
        assert!(matches!(
            requests.song("https://example.com/nothing").await,
            Err(RequestError::Resolution(_))
        ));
    }

    #[tokio::test]
    async fn catalog_tracks_stay_pending() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_track()
            .with(eq("4uLU6hMCjMI75M1A2tKUQC"))
            .times(1)
            .returning(|_| {
                Ok(CatalogTrack {
                    title: Some("Never Gonna Give You Up".into()),
                    primary_artist: Some("Rick Astley".into()),
                })
            });

        let song = requests(FakeResolver::default(), Some(provider))
            .song("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=abc")
            .await
            .unwrap();

        assert_eq!(song, SongRef::unresolved("Rick Astley", "Never Gonna Give You Up"));
    }

    #[tokio::test]
    async fn catalog_links_without_credentials_are_rejected() {
        let requests = requests(FakeResolver::default(), None);
        assert!(!requests.has_catalog());

        let err = requests
            .playlist("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M")
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Catalog(CatalogError::NotConfigured)));
    }

    #[tokio::test]
    async fn empty_playlists_are_an_error() {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_playlist_page()
            .returning(|_, _, _| Ok(vec![CatalogTrack::default()]));

        let err = requests(FakeResolver::default(), Some(provider))
            .playlist("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M")
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::EmptyPlaylist));
    }
}
