use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{CatalogProvider, CatalogTrack};
use crate::error::CatalogError;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Margen antes de la expiración real del token
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct PlaylistTracksPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Deserialize)]
struct PlaylistItem {
    track: Option<SpotifyTrack>,
}

#[derive(Deserialize)]
struct SpotifyTrack {
    name: Option<String>,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
}

#[derive(Deserialize)]
struct SpotifyArtist {
    name: Option<String>,
}

impl From<SpotifyTrack> for CatalogTrack {
    fn from(track: SpotifyTrack) -> Self {
        Self {
            title: track.name.filter(|n| !n.trim().is_empty()),
            primary_artist: track
                .artists
                .into_iter()
                .next()
                .and_then(|a| a.name)
                .filter(|n| !n.trim().is_empty()),
        }
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Cliente de la Web API de Spotify con credenciales de cliente
pub struct SpotifyClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();

        Self {
            http,
            client_id,
            client_secret,
            token: Mutex::new(None),
        }
    }

    /// Devuelve un token válido, pidiéndolo de nuevo si expiró
    async fn access_token(&self) -> Result<String, CatalogError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        debug!("🔑 Solicitando token de Spotify");
        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Auth(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        info!("🔑 Token de Spotify renovado (válido {}s)", lifetime.as_secs());
        Ok(token.access_token)
    }
}

#[async_trait]
impl CatalogProvider for SpotifyClient {
    async fn playlist_page(
        &self,
        playlist_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        let token = self.access_token().await?;
        let url = format!("{}/playlists/{}/tracks", API_BASE, playlist_id);

        let page: PlaylistTracksPage = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(page
            .items
            .into_iter()
            .map(|item| item.track.map(CatalogTrack::from).unwrap_or_default())
            .collect())
    }

    async fn track(&self, track_id: &str) -> Result<CatalogTrack, CatalogError> {
        let token = self.access_token().await?;
        let url = format!("{}/tracks/{}", API_BASE, track_id);

        let track: SpotifyTrack = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(track.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn playlist_page_keeps_empty_slots_for_local_or_removed_tracks() {
        let body = r#"{
            "items": [
                {"track": {"name": "Around the World", "artists": [{"name": "Daft Punk"}]}},
                {"track": null},
                {"track": {"name": "", "artists": [{"name": "Nadie"}]}},
                {"track": {"name": "Sin artista", "artists": []}}
            ]
        }"#;

        let page: PlaylistTracksPage = serde_json::from_str(body).unwrap();
        let tracks: Vec<CatalogTrack> = page
            .items
            .into_iter()
            .map(|item| item.track.map(CatalogTrack::from).unwrap_or_default())
            .collect();

        assert_eq!(
            tracks,
            vec![
                CatalogTrack {
                    title: Some("Around the World".into()),
                    primary_artist: Some("Daft Punk".into()),
                },
                CatalogTrack::default(),
                CatalogTrack {
                    title: None,
                    primary_artist: Some("Nadie".into()),
                },
                CatalogTrack {
                    title: Some("Sin artista".into()),
                    primary_artist: None,
                },
            ]
        );
    }
}
