//! Shared wiring for the Lexia operator binaries.
//!
//! The CLI is one confirmation transport among several possible ones; it
//! drives the same `propose`/`resolve` surface a messaging front end
//! would.

pub mod setup;

pub use setup::{build_app, content_type_from_filename, init_tracing, App};
