use chrono::Utc;
use serenity::model::id::GuildId;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const FILE_PREFIX: &str = "audio_";

/// Archivos temporales de audio en el directorio de trabajo.
///
/// Cada guild tiene como mucho un archivo vivo (`GuildState::active_temp_file`);
/// este tipo sólo sabe nombrarlos y borrarlos.
#[derive(Debug, Clone)]
pub struct TempFileManager {
    scratch_dir: PathBuf,
}

impl TempFileManager {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    /// `audio_<guild>_<timestamp_ms>`; yt-dlp añade la extensión
    pub fn prefix_for(&self, guild_id: GuildId) -> PathBuf {
        self.scratch_dir.join(format!(
            "{}{}_{}",
            FILE_PREFIX,
            guild_id.get(),
            Utc::now().timestamp_millis()
        ))
    }

    /// Borra el archivo si existe. Llamarlo dos veces no es un error.
    pub async fn delete(&self, path: Option<PathBuf>) {
        let Some(path) = path else { return };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("🧹 Temporal eliminado: {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("⚠️ No se pudo borrar {}: {}", path.display(), e),
        }
    }

    /// Elimina cualquier resto (parcial o inválido) de una descarga fallida
    pub async fn discard_prefix(&self, prefix: &Path) {
        let Some(stem) = prefix.file_name().map(|s| format!("{}.", s.to_string_lossy())) else {
            return;
        };

        for path in self.list(|name| name.starts_with(&stem)).await {
            self.delete(Some(path)).await;
        }
    }

    /// Limpia archivos `audio_*` que quedaron de una ejecución anterior
    pub async fn sweep_stale(&self) -> usize {
        let stale = self.list(|name| name.starts_with(FILE_PREFIX)).await;
        let count = stale.len();
        for path in stale {
            self.delete(Some(path)).await;
        }
        if count > 0 {
            info!("🧹 {} temporales antiguos eliminados", count);
        }
        count
    }

    async fn list(&self, matches: impl Fn(&str) -> bool) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.scratch_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("⚠️ No se pudo leer {}: {}", self.scratch_dir.display(), e);
                return found;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            if matches(&entry.file_name().to_string_lossy()) {
                found.push(entry.path());
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempFileManager::new(dir.path());
        let path = dir.path().join("audio_1_1.webm");
        std::fs::write(&path, b"audio").unwrap();

        manager.delete(Some(path.clone())).await;
        manager.delete(Some(path.clone())).await;
        manager.delete(None).await;

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn discard_prefix_only_touches_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempFileManager::new(dir.path());
        std::fs::write(dir.path().join("audio_1_10.webm"), b"x").unwrap();
        std::fs::write(dir.path().join("audio_1_10.m4a"), b"x").unwrap();
        std::fs::write(dir.path().join("audio_1_11.webm"), b"x").unwrap();

        manager.discard_prefix(&dir.path().join("audio_1_10")).await;

        assert!(!dir.path().join("audio_1_10.webm").exists());
        assert!(!dir.path().join("audio_1_10.m4a").exists());
        assert!(dir.path().join("audio_1_11.webm").exists());
    }

    #[tokio::test]
    async fn sweep_removes_leftovers_but_not_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempFileManager::new(dir.path());
        std::fs::write(dir.path().join("audio_7_1.webm"), b"x").unwrap();
        std::fs::write(dir.path().join("cookies.txt"), b"x").unwrap();

        assert_eq!(manager.sweep_stale().await, 1);
        assert!(dir.path().join("cookies.txt").exists());
    }

    #[test]
    fn prefix_names_the_guild() {
        let manager = TempFileManager::new("/scratch");
        let prefix = manager.prefix_for(GuildId::new(42));
        let name = prefix.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("audio_42_"));
        assert_eq!(prefix.parent(), Some(Path::new("/scratch")));
    }
}
