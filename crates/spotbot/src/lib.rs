//! spotbot: an HTTP-controlled music session that pumps decoded audio into a
//! local output device.
//!
//! - [`session`]: the music service seam and the bundled library-backed session
//! - [`lifecycle`]: login/logout/shutdown coordination
//! - [`api`]: Actix routes
//! - [`runtime`]: process wiring

pub mod api;
pub mod cli;
pub mod config;
pub mod lifecycle;
#[cfg(test)]
mod mock;
pub mod runtime;
pub mod session;
