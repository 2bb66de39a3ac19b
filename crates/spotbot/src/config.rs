//! Configuration loading and resolution.
//!
//! The optional TOML file supplies defaults; command-line flags win.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use spotbot_audio::PipelineConfig;

use crate::cli::Args;
use crate::session::Credentials;
use crate::session::library::LibraryConfig;

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_LIBRARY_DIR: &str = "music";
pub const DEFAULT_SETTINGS_DIR: &str = "tmp";

/// Config file schema. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct BotConfig {
    /// HTTP bind address (host:port).
    pub bind: Option<String>,
    /// Music library root directory.
    pub library_dir: Option<String>,
    /// Directory for session settings (remembered user).
    pub settings_dir: Option<String>,
    /// Output device substring.
    pub device: Option<String>,
    pub audio: Option<AudioSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AudioSection {
    /// Delivery queue capacity in chunks.
    pub input_chunks: Option<usize>,
    /// Output buffer size in samples.
    pub output_buffer_samples: Option<usize>,
}

impl BotConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        toml::from_str::<BotConfig>(&raw).with_context(|| format!("parse config {:?}", path))
    }
}

/// Everything the runtime needs, after merging flags over the file.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub http_bind: SocketAddr,
    pub device: Option<String>,
    pub library: LibraryConfig,
    pub credentials: Credentials,
    pub pipeline: PipelineConfig,
}

pub fn resolve(args: &Args, file: &BotConfig) -> Result<RuntimeConfig> {
    let http_bind = match (args.http_bind, file.bind.as_deref()) {
        (Some(addr), _) => addr,
        (None, Some(bind)) => bind.parse().with_context(|| format!("parse bind {bind}"))?,
        (None, None) => DEFAULT_BIND
            .parse()
            .with_context(|| format!("parse bind {DEFAULT_BIND}"))?,
    };

    let defaults = PipelineConfig::default();
    let audio = file.audio.as_ref();
    let pipeline = PipelineConfig {
        input_chunks: audio
            .and_then(|a| a.input_chunks)
            .unwrap_or(defaults.input_chunks),
        output_buffer_samples: audio
            .and_then(|a| a.output_buffer_samples)
            .unwrap_or(defaults.output_buffer_samples),
    };

    Ok(RuntimeConfig {
        http_bind,
        device: normalize_device_name(args.device.clone().or_else(|| file.device.clone())),
        library: LibraryConfig {
            root: dir_or_default(file.library_dir.as_deref(), DEFAULT_LIBRARY_DIR),
            settings_dir: dir_or_default(file.settings_dir.as_deref(), DEFAULT_SETTINGS_DIR),
            app_key_path: args.key.clone(),
        },
        credentials: Credentials {
            username: args.username.clone(),
            password: args.password.clone(),
            remember: args.remember,
        },
        pipeline,
    })
}

fn dir_or_default(value: Option<&str>, default: &str) -> PathBuf {
    let trimmed = value.map(str::trim).filter(|v| !v.is_empty());
    PathBuf::from(trimmed.unwrap_or(default))
}

fn normalize_device_name(device: Option<String>) -> Option<String> {
    device.and_then(|name| {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
