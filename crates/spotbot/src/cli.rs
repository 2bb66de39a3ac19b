use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "spotbot", version, about = "HTTP-controlled music player")]
pub struct Args {
    /// Account username (empty reuses a remembered one)
    #[arg(short, long, env = "SPOTBOT_USERNAME", default_value = "")]
    pub username: String,

    /// Account password
    #[arg(short, long, env = "SPOTBOT_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// Application key file
    #[arg(long, env = "SPOTBOT_APP_KEY", default_value = "spotbot_appkey.key")]
    pub key: PathBuf,

    /// Remember the username for later logins
    #[arg(long)]
    pub remember: bool,

    /// Optional TOML config file
    #[arg(long, env = "SPOTBOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// HTTP API bind address, e.g. 0.0.0.0:3000 (overrides config)
    #[arg(long)]
    pub http_bind: Option<SocketAddr>,

    /// Use a specific output device by substring match (overrides config)
    #[arg(long)]
    pub device: Option<String>,

    /// List output devices and exit
    #[arg(long)]
    pub list_devices: bool,
}
