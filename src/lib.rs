//! jarsign-cache - cached jar signing
//!
//! Signs every archive of a build with `jarsigner`, keeping signed copies
//! and content checksums in a shared cache so unchanged archives are
//! restored instead of signed again. Runs in two phases: serialized signing
//! of new archives, then parallel verification of all of them.

pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod identity;
pub mod pack;
pub mod pipeline;
pub mod tools;
pub mod ui;

pub use error::{JarsignError, JarsignResult};
