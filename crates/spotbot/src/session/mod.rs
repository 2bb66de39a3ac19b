//! Music service session seam.
//!
//! The lifecycle coordinator and the HTTP API only talk to [`MusicSession`]. The
//! bundled implementation is [`library::LibrarySession`], which serves a local
//! music directory; other service clients plug in behind the same trait.

pub mod decode;
pub mod index;
pub mod library;
pub mod player;

use crossbeam_channel::Receiver;

/// Account credentials handed to [`MusicSession::login`].
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Persist the username so a later login may omit it.
    pub remember: bool,
}

/// Logged-in account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub canonical_name: String,
    pub display_name: String,
}

/// Parsed service link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Link {
    Track(TrackId),
}

/// Stable track identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u64);

/// Track metadata as returned by lookups and searches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    /// Canonical link string, parseable by [`MusicSession::parse_link`].
    pub link: String,
    pub duration_ms: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaylistKind {
    Playlist,
    Folder,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub name: String,
    pub kind: PlaylistKind,
}

/// Paging for track searches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchOptions {
    pub offset: usize,
    pub count: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            count: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchResults {
    pub query: String,
    pub tracks: Vec<Track>,
    /// Matches before paging.
    pub total: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

/// Diagnostic line emitted by the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogMessage {
    pub level: LogLevel,
    pub message: String,
}

/// Event streams published by a session.
///
/// Receivers are clones of the session's channels; every clone competes for the
/// same events, so only the lifecycle coordinator should consume them.
#[derive(Clone, Debug)]
pub struct SessionEvents {
    pub logged_in: Receiver<Result<(), SessionError>>,
    pub logged_out: Receiver<()>,
    pub messages_to_user: Receiver<String>,
    pub log_messages: Receiver<LogMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("application key missing or unreadable: {0}")]
    BadApplicationKey(String),

    #[error("no username given and none remembered")]
    MissingUsername,

    #[error("not logged in")]
    NotLoggedIn,

    #[error("session closed")]
    Closed,

    #[error("invalid link: {0}")]
    InvalidLink(String),

    #[error("track not found: {0}")]
    TrackNotFound(String),

    #[error("no track loaded")]
    NoTrackLoaded,

    #[error("library unavailable: {0}")]
    Library(String),

    #[error("playback failed: {0}")]
    Playback(String),
}

/// Capabilities the rest of the program needs from a music service session.
///
/// Calls may block (network, disk); async callers should go through a blocking
/// pool.
pub trait MusicSession: Send + Sync {
    /// Start logging in. Argument problems fail here; the outcome of the login
    /// itself arrives on [`SessionEvents::logged_in`].
    fn login(&self, credentials: &Credentials) -> Result<(), SessionError>;

    /// Start logging out; completion arrives on [`SessionEvents::logged_out`].
    fn logout(&self) -> Result<(), SessionError>;

    /// Release the session. Further calls fail with [`SessionError::Closed`].
    fn close(&self) -> Result<(), SessionError>;

    fn events(&self) -> SessionEvents;

    fn current_user(&self) -> Result<User, SessionError>;

    fn parse_link(&self, link: &str) -> Result<Link, SessionError>;

    fn track(&self, link: &Link) -> Result<Track, SessionError>;

    fn search(&self, query: &str, options: SearchOptions) -> Result<SearchResults, SessionError>;

    fn playlists(&self) -> Result<Vec<PlaylistEntry>, SessionError>;

    /// Load `track` into the player, paused.
    fn load(&self, track: &Track) -> Result<(), SessionError>;

    fn play(&self) -> Result<(), SessionError>;

    fn pause(&self) -> Result<(), SessionError>;
}
