//! [`MusicSession`] backed by a local music directory.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::Sender;
use spotbot_audio::AudioSink;

use super::index::{self, LibraryIndex};
use super::player::Playback;
use super::{
    Credentials, Link, LogLevel, LogMessage, MusicSession, PlaylistEntry, SearchOptions,
    SearchResults, SessionError, SessionEvents, Track, User,
};

const REMEMBERED_USER_FILE: &str = "remembered_user";

#[derive(Clone, Debug)]
pub struct LibraryConfig {
    /// Music directory to index.
    pub root: PathBuf,
    /// Where the remembered username is kept.
    pub settings_dir: PathBuf,
    /// Application key file; must exist and be non-empty.
    pub app_key_path: PathBuf,
}

struct Channels {
    logged_in_tx: Sender<Result<(), SessionError>>,
    logged_out_tx: Sender<()>,
    messages_tx: Sender<String>,
    log_tx: Sender<LogMessage>,
    events: SessionEvents,
}

impl Channels {
    fn new() -> Self {
        let (logged_in_tx, logged_in) = crossbeam_channel::unbounded();
        let (logged_out_tx, logged_out) = crossbeam_channel::unbounded();
        let (messages_tx, messages_to_user) = crossbeam_channel::unbounded();
        let (log_tx, log_messages) = crossbeam_channel::unbounded();
        Self {
            logged_in_tx,
            logged_out_tx,
            messages_tx,
            log_tx,
            events: SessionEvents {
                logged_in,
                logged_out,
                messages_to_user,
                log_messages,
            },
        }
    }
}

#[derive(Default)]
struct State {
    user: Option<User>,
    index: Option<Arc<LibraryIndex>>,
    playback: Option<Playback>,
    /// Bumped by every login/logout so a stale index build is discarded.
    generation: u64,
    closed: bool,
}

pub struct LibrarySession {
    config: LibraryConfig,
    sink: Arc<dyn AudioSink>,
    channels: Channels,
    state: Arc<Mutex<State>>,
}

impl LibrarySession {
    pub fn new(config: LibraryConfig, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            config,
            sink,
            channels: Channels::new(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn open_state(&self) -> Result<MutexGuard<'_, State>, SessionError> {
        let state = self.lock();
        if state.closed {
            return Err(SessionError::Closed);
        }
        Ok(state)
    }

    fn index(&self) -> Result<Arc<LibraryIndex>, SessionError> {
        self.open_state()?.index.clone().ok_or(SessionError::NotLoggedIn)
    }

    fn remembered_user_path(&self) -> PathBuf {
        self.config.settings_dir.join(REMEMBERED_USER_FILE)
    }

    fn check_app_key(&self) -> Result<(), SessionError> {
        let path = &self.config.app_key_path;
        match fs::read(path) {
            Ok(bytes) if !bytes.is_empty() => Ok(()),
            Ok(_) => Err(SessionError::BadApplicationKey(format!(
                "{} is empty",
                path.display()
            ))),
            Err(e) => Err(SessionError::BadApplicationKey(format!(
                "{}: {e}",
                path.display()
            ))),
        }
    }

    /// Apply the remember flag and work out which username to log in as.
    fn resolve_username(&self, credentials: &Credentials) -> Result<String, SessionError> {
        let path = self.remembered_user_path();
        if credentials.username.is_empty() {
            return match fs::read_to_string(&path) {
                Ok(name) if !name.trim().is_empty() => Ok(name.trim().to_string()),
                _ => Err(SessionError::MissingUsername),
            };
        }

        if credentials.remember {
            fs::create_dir_all(&self.config.settings_dir)
                .and_then(|()| fs::write(&path, &credentials.username))
                .map_err(|e| SessionError::Library(format!("remember user: {e}")))?;
        } else {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(error = %e, "failed to forget remembered user"),
            }
        }
        Ok(credentials.username.clone())
    }

    fn log(&self, level: LogLevel, message: String) {
        let _ = self.channels.log_tx.send(LogMessage { level, message });
    }
}

impl MusicSession for LibrarySession {
    fn login(&self, credentials: &Credentials) -> Result<(), SessionError> {
        drop(self.open_state()?);
        self.check_app_key()?;
        let username = self.resolve_username(credentials)?;

        let generation = {
            let mut state = self.open_state()?;
            state.generation += 1;
            state.generation
        };

        let root = self.config.root.clone();
        let state = self.state.clone();
        let logged_in_tx = self.channels.logged_in_tx.clone();
        let messages_tx = self.channels.messages_tx.clone();
        let log_tx = self.channels.log_tx.clone();
        std::thread::Builder::new()
            .name("library-index".into())
            .spawn(move || {
                let result = index::scan_library(&root);
                let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
                if state.closed || state.generation != generation {
                    return;
                }
                match result {
                    Ok(index) => {
                        let _ = log_tx.send(LogMessage {
                            level: LogLevel::Info,
                            message: format!("indexed {} tracks under {}", index.len(), root.display()),
                        });
                        state.index = Some(Arc::new(index));
                        state.user = Some(User {
                            canonical_name: username.clone(),
                            display_name: username.clone(),
                        });
                        drop(state);
                        let _ = messages_tx.send(format!("Welcome, {username}"));
                        let _ = logged_in_tx.send(Ok(()));
                    }
                    Err(e) => {
                        drop(state);
                        let _ = logged_in_tx.send(Err(SessionError::Library(format!("{e:#}"))));
                    }
                }
            })
            .map_err(|e| SessionError::Library(format!("spawn index thread: {e}")))?;
        Ok(())
    }

    fn logout(&self) -> Result<(), SessionError> {
        let playback = {
            let mut state = self.open_state()?;
            if state.user.is_none() {
                return Err(SessionError::NotLoggedIn);
            }
            state.generation += 1;
            state.user = None;
            state.index = None;
            state.playback.take()
        };
        drop(playback);
        let _ = self.channels.logged_out_tx.send(());
        Ok(())
    }

    fn close(&self) -> Result<(), SessionError> {
        let playback = {
            let mut state = self.open_state()?;
            state.closed = true;
            state.user = None;
            state.index = None;
            state.playback.take()
        };
        drop(playback);
        Ok(())
    }

    fn events(&self) -> SessionEvents {
        self.channels.events.clone()
    }

    fn current_user(&self) -> Result<User, SessionError> {
        self.open_state()?.user.clone().ok_or(SessionError::NotLoggedIn)
    }

    fn parse_link(&self, link: &str) -> Result<Link, SessionError> {
        index::parse_track_link(link)
            .map(Link::Track)
            .ok_or_else(|| SessionError::InvalidLink(link.to_string()))
    }

    fn track(&self, link: &Link) -> Result<Track, SessionError> {
        let index = self.index()?;
        let Link::Track(id) = *link;
        index
            .get(id)
            .map(|t| t.track.clone())
            .ok_or_else(|| SessionError::TrackNotFound(index::format_link(id)))
    }

    fn search(&self, query: &str, options: SearchOptions) -> Result<SearchResults, SessionError> {
        let index = self.index()?;
        let matches = index.matching(query).collect::<Vec<_>>();
        let tracks = matches
            .iter()
            .skip(options.offset)
            .take(options.count)
            .map(|t| t.track.clone())
            .collect();
        Ok(SearchResults {
            query: query.to_string(),
            tracks,
            total: matches.len(),
        })
    }

    fn playlists(&self) -> Result<Vec<PlaylistEntry>, SessionError> {
        Ok(self.index()?.playlists().to_vec())
    }

    fn load(&self, track: &Track) -> Result<(), SessionError> {
        let index = self.index()?;
        let entry = index
            .get(track.id)
            .ok_or_else(|| SessionError::TrackNotFound(track.link.clone()))?;

        let previous = self.open_state()?.playback.take();
        drop(previous);

        let playback = Playback::start(
            entry.path.clone(),
            entry.track.name.clone(),
            self.sink.clone(),
            self.channels.log_tx.clone(),
        )
        .map_err(|e| SessionError::Playback(format!("spawn decoder: {e}")))?;

        let mut state = self.open_state()?;
        if state.index.is_none() {
            return Err(SessionError::NotLoggedIn);
        }
        state.playback = Some(playback);
        drop(state);
        self.log(LogLevel::Debug, format!("loaded {}", entry.track.name));
        Ok(())
    }

    fn play(&self) -> Result<(), SessionError> {
        let state = self.open_state()?;
        let playback = state.playback.as_ref().ok_or(SessionError::NoTrackLoaded)?;
        playback.set_paused(false);
        Ok(())
    }

    fn pause(&self) -> Result<(), SessionError> {
        let state = self.open_state()?;
        let playback = state.playback.as_ref().ok_or(SessionError::NoTrackLoaded)?;
        playback.set_paused(true);
        Ok(())
    }
}

impl Drop for LibrarySession {
    fn drop(&mut self) {
        let playback = self.lock().playback.take();
        drop(playback);
    }
}
