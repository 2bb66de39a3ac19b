pub mod config;
pub mod delivery;
pub mod device;
pub mod error;
#[cfg(test)]
mod mock;
pub mod output;
pub mod pump;
pub mod repack;
pub mod ring;
pub mod shutdown;
pub mod status;
pub mod stream;

pub use config::PipelineConfig;
pub use delivery::{AudioChunk, AudioFormat, AudioSink};
pub use error::DeviceError;
pub use pump::AudioWriter;
pub use shutdown::ShutdownSignal;
