//! # Audio Module
//!
//! Per-guild playback core of the jukebox.
//!
//! ## Architecture
//!
//! ### [`player`] - Audio Player
//! - Facade used by the slash commands
//! - Owns the [`registry`] of guild states and their engine tasks
//!
//! ### [`engine`] - Playback Engine
//! - One actor per guild, fed through a signal inbox
//! - Resolves the head of the queue, downloads it with retries and streams it
//! - Advances according to the loop mode when the sink finishes
//!
//! ### [`queue`] - Queue Management
//! - FIFO of pending and resolved songs with `off | single | queue` looping
//!
//! ### I/O seams
//! - [`sink`]: audio output of a voice session (songbird in production)
//! - [`decoder`]: container probing of the downloaded file
//! - [`notice`]: channel notifications
//! - [`tempfile`]: naming and cleanup of downloaded files
//!
//! ## Threading
//!
//! Guild state lives behind a `parking_lot::Mutex` that is never held across
//! an `.await`. Every engine runs on its own tokio task, so guilds never block
//! each other.

pub mod decoder;
pub mod engine;
pub mod notice;
pub mod player;
pub mod queue;
pub mod registry;
pub mod sink;
pub mod tempfile;

pub use player::AudioPlayer;
