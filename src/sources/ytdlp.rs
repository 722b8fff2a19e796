use async_trait::async_trait;
use regex::Regex;
use std::{
    path::{Path, PathBuf},
    process::{Output, Stdio},
    sync::LazyLock,
};
use tracing::{debug, info, warn};

use super::{MediaResolver, ResolvedTrack};
use crate::error::{DownloadError, ResolutionError};

static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("regex de id válida"));

/// Frases con las que YouTube anuncia un bloqueo anti-bot (en minúsculas).
const ANTI_BOT_PHRASES: &[&str] = &[
    "sign in to confirm you're not a bot",
    "sign in to confirm you’re not a bot",
    "confirm you're not a bot",
    "this helps protect our community",
];

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Cliente de yt-dlp: metadatos, búsqueda top-1 y descarga de audio
pub struct YtDlpResolver {
    binary: String,
    cookies_path: PathBuf,
    min_audio_bytes: u64,
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<String>, cookies_path: impl Into<PathBuf>, min_audio_bytes: u64) -> Self {
        Self {
            binary: binary.into(),
            cookies_path: cookies_path.into(),
            min_audio_bytes,
        }
    }

    /// Verifica que yt-dlp esté disponible y devuelve su versión
    pub async fn verify_dependencies(&self) -> anyhow::Result<String> {
        let output = tokio::process::Command::new(&self.binary)
            .arg("--version")
            .output()
            .await?;

        if !output.status.success() {
            anyhow::bail!("yt-dlp no disponible ({})", self.binary);
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("✅ yt-dlp versión: {}", version);
        Ok(version)
    }

    /// Arma los argumentos: flags del verbo, cookies (si existen) y el
    /// argumento posicional al final.
    fn build_args(&self, flags: &[&str], positional: &str) -> Vec<String> {
        let cookies = self
            .cookies_path
            .is_file()
            .then(|| self.cookies_path.as_path());
        compose_args(flags, cookies, positional)
    }

    async fn run(&self, args: Vec<String>) -> std::io::Result<Output> {
        debug!("▶️ {} {}", self.binary, args.join(" "));
        tokio::process::Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
    }

    async fn locate_download(&self, prefix: &Path) -> Result<PathBuf, DownloadError> {
        let path = find_by_prefix(prefix)
            .await?
            .ok_or_else(|| DownloadError::Missing(prefix.to_path_buf()))?;

        let size = tokio::fs::metadata(&path).await?.len();
        if size < self.min_audio_bytes {
            return Err(DownloadError::TooSmall { path, size });
        }

        Ok(path)
    }
}

#[async_trait]
impl MediaResolver for YtDlpResolver {
    async fn lookup_metadata(&self, url: &str) -> Result<ResolvedTrack, ResolutionError> {
        let args = self.build_args(
            &[
                "--print",
                "%(title)s|%(webpage_url)s",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
                "--socket-timeout",
                "30",
            ],
            url,
        );

        let output = self.run(args).await?;
        if !output.status.success() {
            return Err(ResolutionError::ToolFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let (title, canonical_url) =
            parse_print_line(&String::from_utf8_lossy(&output.stdout)).ok_or(ResolutionError::NoOutput)?;

        info!("🔗 Metadatos obtenidos: {}", title);
        Ok(ResolvedTrack {
            title,
            url: canonical_url,
        })
    }

    async fn search(&self, query: &str) -> Result<ResolvedTrack, ResolutionError> {
        info!("🔍 Buscando en yt-dlp: {}", query);

        let search_query = format!("ytsearch1:{}", query);
        let args = self.build_args(
            &[
                "--print",
                "%(title)s|%(id)s",
                "--skip-download",
                "--no-playlist",
                "--quiet",
                "--no-warnings",
                "--socket-timeout",
                "15",
            ],
            &search_query,
        );

        let output = self.run(args).await?;
        if !output.status.success() {
            return Err(ResolutionError::ToolFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (title, id) = parse_print_line(&stdout).ok_or_else(|| ResolutionError::NoMatch(query.to_string()))?;

        if !is_valid_video_id(&id) {
            warn!("⚠️ Id de video no válido '{}' para: {}", id, query);
            return Err(ResolutionError::NoMatch(query.to_string()));
        }

        Ok(ResolvedTrack {
            title,
            url: format!("{}{}", WATCH_URL, id),
        })
    }

    async fn download(&self, url: &str, dest_prefix: &Path) -> Result<PathBuf, DownloadError> {
        let template = format!("{}.%(ext)s", dest_prefix.display());
        let args = self.build_args(
            &[
                "-f",
                "bestaudio/best",
                "--no-playlist",
                "--no-progress",
                "--no-part",
                "--quiet",
                "--no-warnings",
                "--socket-timeout",
                "30",
                "-o",
                &template,
            ],
            url,
        );

        let output = self.run(args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if is_anti_bot(&stderr) {
                return Err(DownloadError::AntiBot(stderr));
            }
            return Err(DownloadError::ExitCode {
                code: output.status.code(),
                stderr,
            });
        }

        let path = self.locate_download(dest_prefix).await?;
        info!("📥 Descargado: {}", path.display());
        Ok(path)
    }
}

fn compose_args(flags: &[&str], cookies: Option<&Path>, positional: &str) -> Vec<String> {
    let mut args: Vec<String> = flags.iter().map(|s| s.to_string()).collect();
    if let Some(cookies) = cookies {
        args.push("--cookies".into());
        args.push(cookies.to_string_lossy().into_owned());
    }
    args.push(positional.to_string());
    args
}

/// Primera línea no vacía con formato `izquierda|derecha`. El corte se hace en
/// el último `|` porque el título puede contenerlo.
pub(crate) fn parse_print_line(stdout: &str) -> Option<(String, String)> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (left, right) = line.rsplit_once('|')?;
    let (left, right) = (left.trim(), right.trim());
    if left.is_empty() || right.is_empty() || right == "NA" {
        return None;
    }
    Some((left.to_string(), right.to_string()))
}

pub(crate) fn is_valid_video_id(id: &str) -> bool {
    VIDEO_ID.is_match(id)
}

pub(crate) fn is_anti_bot(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    ANTI_BOT_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Busca en el directorio del prefijo un archivo `<prefijo>.<ext>`
pub(crate) async fn find_by_prefix(prefix: &Path) -> std::io::Result<Option<PathBuf>> {
    let (Some(dir), Some(stem)) = (prefix.parent(), prefix.file_name()) else {
        return Ok(None);
    };
    let wanted = format!("{}.", stem.to_string_lossy());

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(&wanted) && !name.ends_with(".part") && !name.ends_with(".ytdl") {
            return Ok(Some(entry.path()));
        }
    }

    Ok(None)
}
