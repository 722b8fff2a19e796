use std::{collections::VecDeque, fmt, str::FromStr};
use tracing::{debug, info};

use crate::error::{InvalidModeError, QueueError};
use crate::sources::ResolvedTrack;

/// Entrada de la cola.
///
/// `Unresolved` viene de la expansión de un catálogo y se convierte en
/// `Resolved` una sola vez, cuando llega a la cabeza de la cola.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SongRef {
    Unresolved { artist: String, title: String },
    Resolved { title: String, source_url: String },
}

impl SongRef {
    pub fn unresolved(artist: impl Into<String>, title: impl Into<String>) -> Self {
        SongRef::Unresolved {
            artist: artist.into(),
            title: title.into(),
        }
    }

    pub fn resolved(title: impl Into<String>, source_url: impl Into<String>) -> Self {
        SongRef::Resolved {
            title: title.into(),
            source_url: source_url.into(),
        }
    }

    /// Título legible, usado en los avisos.
    pub fn display_title(&self) -> String {
        match self {
            SongRef::Unresolved { artist, title } => format!("{} - {}", artist, title),
            SongRef::Resolved { title, .. } => title.clone(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, SongRef::Resolved { .. })
    }

    pub fn source_url(&self) -> Option<&str> {
        match self {
            SongRef::Resolved { source_url, .. } => Some(source_url),
            SongRef::Unresolved { .. } => None,
        }
    }

    /// Consulta de búsqueda para una entrada pendiente.
    pub fn search_query(&self) -> Option<String> {
        match self {
            SongRef::Unresolved { artist, title } => Some(format!("{} {}", artist, title)),
            SongRef::Resolved { .. } => None,
        }
    }

    /// Convierte una entrada pendiente en una reproducible. Una entrada ya
    /// resuelta se devuelve tal cual.
    pub fn resolve(self, track: ResolvedTrack) -> SongRef {
        match self {
            SongRef::Unresolved { .. } => SongRef::Resolved {
                title: track.title,
                source_url: track.url,
            },
            resolved @ SongRef::Resolved { .. } => resolved,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Off,
    Single,
    Queue,
}

impl FromStr for LoopMode {
    type Err = InvalidModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(LoopMode::Off),
            "single" => Ok(LoopMode::Single),
            "queue" => Ok(LoopMode::Queue),
            other => Err(InvalidModeError(other.to_string())),
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopMode::Off => "off",
            LoopMode::Single => "single",
            LoopMode::Queue => "queue",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct GuildQueue {
    songs: VecDeque<SongRef>,
    now_playing: Option<SongRef>,
    loop_mode: LoopMode,
    max_size: usize,
    revision: u64,
}

impl GuildQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            songs: VecDeque::new(),
            now_playing: None,
            loop_mode: LoopMode::Off,
            max_size,
            revision: 0,
        }
    }

    /// Agrega una canción al final y devuelve el nuevo tamaño
    pub fn enqueue(&mut self, song: SongRef) -> Result<usize, QueueError> {
        if self.songs.len() >= self.max_size {
            return Err(QueueError::Full(self.max_size));
        }

        info!("➕ Agregado a la cola: {}", song.display_title());
        self.songs.push_back(song);
        Ok(self.songs.len())
    }

    /// Agrega varias canciones en orden; devuelve cuántas entraron
    pub fn enqueue_many(&mut self, songs: Vec<SongRef>) -> usize {
        let available_space = self.max_size.saturating_sub(self.songs.len());
        let to_add = songs.len().min(available_space);

        self.songs.extend(songs.into_iter().take(to_add));

        info!("➕ Agregadas {} canciones a la cola", to_add);
        to_add
    }

    pub fn dequeue_head(&mut self) -> Option<SongRef> {
        self.songs.pop_front()
    }

    pub fn peek_head(&self) -> Option<&SongRef> {
        self.songs.front()
    }

    /// Sustituye la cabeza (resolución in situ). No hace nada con la cola vacía.
    pub fn replace_head(&mut self, song: SongRef) {
        if let Some(head) = self.songs.front_mut() {
            debug!("🔁 Cabeza reemplazada: {}", song.display_title());
            *head = song;
        }
    }

    /// Pasa la cabeza al final (modo de repetición de cola)
    pub fn rotate_head(&mut self) -> bool {
        match self.songs.pop_front() {
            Some(head) => {
                debug!("🔁 Al final de la cola: {}", head.display_title());
                self.songs.push_back(head);
                true
            }
            None => false,
        }
    }

    /// Vacía la cola y el slot actual
    pub fn clear(&mut self) {
        self.songs.clear();
        self.now_playing = None;
        self.revision = self.revision.wrapping_add(1);
        info!("🗑️ Cola limpiada");
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
        match mode {
            LoopMode::Off => info!("➡️ Repetición desactivada"),
            LoopMode::Single => info!("🔂 Repetir canción activado"),
            LoopMode::Queue => info!("🔁 Repetir cola activado"),
        }
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn now_playing(&self) -> Option<&SongRef> {
        self.now_playing.as_ref()
    }

    pub fn set_now_playing(&mut self, song: Option<SongRef>) {
        self.now_playing = song;
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Cambia cada vez que la cola se vacía con `clear`
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            now_playing: self.now_playing.clone(),
            items: self.songs.iter().cloned().collect(),
            loop_mode: self.loop_mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub now_playing: Option<SongRef>,
    pub items: Vec<SongRef>,
    pub loop_mode: LoopMode,
}

impl QueueSnapshot {
    /// Obtiene una página específica de la cola
    pub fn page(&self, page: usize, items_per_page: usize) -> QueuePage {
        let items_per_page = items_per_page.max(1);
        let total_pages = self.items.len().div_ceil(items_per_page).max(1);
        let current_page = page.clamp(1, total_pages);
        let start = (current_page - 1) * items_per_page;
        let end = (start + items_per_page).min(self.items.len());

        QueuePage {
            items: self.items.get(start..end).map(<[_]>::to_vec).unwrap_or_default(),
            first_index: start,
            current_page,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuePage {
    pub items: Vec<SongRef>,
    pub first_index: usize,
    pub current_page: usize,
    pub total_pages: usize,
}
