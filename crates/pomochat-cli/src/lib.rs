//! Terminal front-end for pomochat
//!
//! A line-oriented shell over [`pomochat_app::ChatHandle`]. Lines typed at
//! the prompt become chat commands; session snapshots are printed as they
//! change. All session logic lives in the runtime.
//!
//! # Components
//!
//! - [`app::run`]: the interactive loop
//! - [`input`]: line parsing into [`input::InputCommand`]s
//! - [`render::Printer`]: incremental snapshot output

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod app;
pub mod input;
pub mod render;

pub use app::{AppConfig, DEFAULT_ERROR_TTL, run};
