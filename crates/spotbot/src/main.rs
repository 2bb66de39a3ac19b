use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use spotbot::config::{self, BotConfig};
use spotbot::{cli, runtime};

#[actix_web::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,spotbot=info,spotbot_audio=info,actix_web=info")
        }))
        .init();

    if args.list_devices {
        return runtime::list_devices();
    }

    let file = match args.config.as_deref() {
        Some(path) => BotConfig::load(path)?,
        None => BotConfig::default(),
    };
    let config = config::resolve(&args, &file)?;
    runtime::run(config).await
}
