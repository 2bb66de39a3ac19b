//! Decoder thread feeding the audio sink for the library session.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;
use spotbot_audio::AudioSink;

use super::decode::TrackDecoder;
use super::{LogLevel, LogMessage};

/// Wait before re-offering a chunk the sink rejected.
const RETRY_BACKOFF: Duration = Duration::from_millis(10);
const PAUSE_POLL: Duration = Duration::from_millis(20);

/// Handle to one loaded track's decoder thread.
pub struct Playback {
    paused: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Playback {
    /// Start decoding `path` on a new thread, paused.
    pub fn start(
        path: PathBuf,
        name: String,
        sink: Arc<dyn AudioSink>,
        log_tx: Sender<LogMessage>,
    ) -> std::io::Result<Self> {
        let paused = Arc::new(AtomicBool::new(true));
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = {
            let paused = paused.clone();
            let cancel = cancel.clone();
            std::thread::Builder::new()
                .name("track-decoder".into())
                .spawn(move || run_decoder(path, name, sink, paused, cancel, log_tx))?
        };
        Ok(Self {
            paused,
            cancel,
            handle: Some(handle),
        })
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Cancel the decoder and wait for it to exit.
    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_decoder(
    path: PathBuf,
    name: String,
    sink: Arc<dyn AudioSink>,
    paused: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    log_tx: Sender<LogMessage>,
) {
    let log = |level, message: String| {
        let _ = log_tx.send(LogMessage { level, message });
    };

    let mut decoder = match TrackDecoder::open(&path) {
        Ok(decoder) => decoder,
        Err(e) => {
            log(LogLevel::Warn, format!("cannot play {name}: {e:#}"));
            return;
        }
    };

    loop {
        let (format, bytes) = match decoder.next_chunk() {
            Ok(Some(chunk)) => chunk,
            Ok(None) => {
                log(LogLevel::Info, format!("end of track: {name}"));
                return;
            }
            Err(e) => {
                log(LogLevel::Warn, format!("decode {name}: {e:#}"));
                return;
            }
        };

        loop {
            if cancel.load(Ordering::Relaxed) {
                return;
            }
            if paused.load(Ordering::Relaxed) {
                std::thread::sleep(PAUSE_POLL);
                continue;
            }
            if sink.deliver(format, &bytes) == bytes.len() {
                break;
            }
            std::thread::sleep(RETRY_BACKOFF);
        }
    }
}
