//! Scriptable session for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::Sender;

use crate::session::{
    Credentials, Link, LogMessage, MusicSession, PlaylistEntry, PlaylistKind, SearchOptions,
    SearchResults, SessionError, SessionEvents, Track, TrackId, User,
};

pub struct MockSession {
    pub events: SessionEvents,
    pub logged_in_tx: Sender<Result<(), SessionError>>,
    pub logged_out_tx: Mutex<Option<Sender<()>>>,
    pub log_tx: Sender<LogMessage>,
    pub logouts: AtomicUsize,
    pub closes: AtomicUsize,
    /// Player actions in call order.
    pub actions: Mutex<Vec<String>>,
    pub tracks: Vec<Track>,
    pub playlists: Vec<PlaylistEntry>,
    pub user_fails: bool,
    pub player_fails: bool,
}

impl Default for MockSession {
    fn default() -> Self {
        let (logged_in_tx, logged_in) = crossbeam_channel::unbounded();
        let (logged_out_tx, logged_out) = crossbeam_channel::unbounded();
        let (_messages_tx, messages_to_user) = crossbeam_channel::unbounded();
        let (log_tx, log_messages) = crossbeam_channel::unbounded();
        Self {
            events: SessionEvents {
                logged_in,
                logged_out,
                messages_to_user,
                log_messages,
            },
            logged_in_tx,
            logged_out_tx: Mutex::new(Some(logged_out_tx)),
            log_tx,
            logouts: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            actions: Mutex::new(Vec::new()),
            tracks: vec![track(1, "Blue Monday"), track(2, "Monday Morning"), track(3, "Tuesday")],
            playlists: vec![
                PlaylistEntry {
                    name: "Favourites".into(),
                    kind: PlaylistKind::Playlist,
                },
                PlaylistEntry {
                    name: "Archive".into(),
                    kind: PlaylistKind::Folder,
                },
                PlaylistEntry {
                    name: "Gym".into(),
                    kind: PlaylistKind::Playlist,
                },
            ],
            user_fails: false,
            player_fails: false,
        }
    }
}

pub fn track(id: u64, name: &str) -> Track {
    Track {
        id: TrackId(id),
        name: name.into(),
        link: format!("mock:{id}"),
        duration_ms: None,
    }
}

impl MockSession {
    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    fn act(&self, action: String) -> Result<(), SessionError> {
        if self.player_fails {
            return Err(SessionError::Playback("device gone".into()));
        }
        self.actions.lock().unwrap().push(action);
        Ok(())
    }
}

impl MusicSession for MockSession {
    fn login(&self, _credentials: &Credentials) -> Result<(), SessionError> {
        Ok(())
    }

    fn logout(&self) -> Result<(), SessionError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Err(SessionError::NotLoggedIn)
    }

    fn close(&self) -> Result<(), SessionError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn events(&self) -> SessionEvents {
        self.events.clone()
    }

    fn current_user(&self) -> Result<User, SessionError> {
        if self.user_fails {
            return Err(SessionError::NotLoggedIn);
        }
        Ok(User {
            canonical_name: "dj".into(),
            display_name: "DJ".into(),
        })
    }

    fn parse_link(&self, link: &str) -> Result<Link, SessionError> {
        link.strip_prefix("mock:")
            .and_then(|id| id.parse().ok())
            .map(|id| Link::Track(TrackId(id)))
            .ok_or_else(|| SessionError::InvalidLink(link.into()))
    }

    fn track(&self, link: &Link) -> Result<Track, SessionError> {
        let Link::Track(id) = *link;
        self.tracks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| SessionError::TrackNotFound(format!("mock:{}", id.0)))
    }

    fn search(&self, query: &str, options: SearchOptions) -> Result<SearchResults, SessionError> {
        let matches = self
            .tracks
            .iter()
            .filter(|t| t.name.to_lowercase().contains(&query.to_lowercase()))
            .cloned()
            .collect::<Vec<_>>();
        Ok(SearchResults {
            query: query.into(),
            total: matches.len(),
            tracks: matches
                .into_iter()
                .skip(options.offset)
                .take(options.count)
                .collect(),
        })
    }

    fn playlists(&self) -> Result<Vec<PlaylistEntry>, SessionError> {
        Ok(self.playlists.clone())
    }

    fn load(&self, track: &Track) -> Result<(), SessionError> {
        self.act(format!("load {}", track.name))
    }

    fn play(&self) -> Result<(), SessionError> {
        self.act("play".into())
    }

    fn pause(&self) -> Result<(), SessionError> {
        self.act("pause".into())
    }
}
