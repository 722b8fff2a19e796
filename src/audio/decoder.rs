use async_trait::async_trait;
use songbird::input::{AudioStream, Input, LiveInput};
use std::{fs::File, path::Path};
use symphonia::core::{
    formats::FormatOptions,
    io::{MediaSource, MediaSourceStream},
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{debug, warn};

use crate::error::DecodeError;

/// Camino de decodificación elegido para un archivo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodePath {
    /// El contenedor se reconoció; se pasa la pista de extensión al driver
    Probed { extension: Option<String> },
    /// No se reconoció; el driver recibe bytes sin tipo
    Untyped,
}

pub struct DecodedAudio {
    pub input: Input,
    pub decode_path: DecodePath,
}

/// Abre un archivo descargado y lo convierte en una entrada de audio
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    async fn open(&self, path: &Path) -> Result<DecodedAudio, DecodeError>;
}

/// Sondea el contenedor con symphonia antes de entregar el archivo a songbird
#[derive(Debug, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    fn probe(path: &Path) -> Result<DecodePath, DecodeError> {
        let file = File::open(path).map_err(|source| DecodeError {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = extension_of(path);
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let probed = symphonia::default::get_probe().format(
            &hint_for(extension.as_deref()),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        );

        match probed {
            Ok(_) => Ok(DecodePath::Probed { extension }),
            Err(e) => {
                warn!("⚠️ Contenedor no reconocido en {} ({}), usando bytes sin tipo", path.display(), e);
                Ok(DecodePath::Untyped)
            }
        }
    }

    fn build(path: &Path, decode_path: DecodePath) -> Result<DecodedAudio, DecodeError> {
        let file = File::open(path).map_err(|source| DecodeError {
            path: path.to_path_buf(),
            source,
        })?;

        let hint = match &decode_path {
            DecodePath::Probed { extension } => Some(hint_for(extension.as_deref())),
            DecodePath::Untyped => None,
        };

        let stream = AudioStream {
            input: Box::new(file) as Box<dyn MediaSource>,
            hint,
        };

        Ok(DecodedAudio {
            input: Input::Live(LiveInput::Raw(stream), None),
            decode_path,
        })
    }
}

#[async_trait]
impl AudioDecoder for SymphoniaDecoder {
    async fn open(&self, path: &Path) -> Result<DecodedAudio, DecodeError> {
        let owned = path.to_path_buf();
        let joined = tokio::task::spawn_blocking(move || {
            let decode_path = Self::probe(&owned)?;
            Self::build(&owned, decode_path)
        })
        .await;

        let audio = joined.map_err(|e| DecodeError {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })??;

        debug!("🎚️ {} abierto como {:?}", path.display(), audio.decode_path);
        Ok(audio)
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn hint_for(extension: Option<&str>) -> Hint {
    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }
    hint
}

#[cfg(test)]
mod tests {
    use super::*;

    /// WAV mínimo: cabecera PCM de 16 bits mono con unas pocas muestras
    fn tiny_wav() -> Vec<u8> {
        let samples: Vec<u8> = vec![0; 64];
        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + samples.len() as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVEfmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
        wav.extend_from_slice(&1u16.to_le_bytes()); // mono
        wav.extend_from_slice(&48_000u32.to_le_bytes());
        wav.extend_from_slice(&96_000u32.to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(samples.len() as u32).to_le_bytes());
        wav.extend_from_slice(&samples);
        wav
    }

    #[tokio::test]
    async fn known_containers_take_the_probed_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio_1_1.wav");
        std::fs::write(&path, tiny_wav()).unwrap();

        let audio = SymphoniaDecoder.open(&path).await.unwrap();
        assert_eq!(
            audio.decode_path,
            DecodePath::Probed {
                extension: Some("wav".into())
            }
        );
    }

    #[tokio::test]
    async fn garbage_falls_back_to_untyped_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio_1_1.bin");
        std::fs::write(&path, vec![0x5a; 4096]).unwrap();

        let audio = SymphoniaDecoder.open(&path).await.unwrap();
        assert_eq!(audio.decode_path, DecodePath::Untyped);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SymphoniaDecoder.open(&dir.path().join("nope.webm")).await.is_err());
    }
}
