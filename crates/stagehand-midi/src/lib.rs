//! Binary container parser and MIDI event reconstructor for multitrack
//! recorder project bundles.
//!
//! The pipeline, leaves first: [`scanner`]/[`offsets`] find raw byte
//! offsets; [`record`] decodes typed records at each offset into a
//! [`context::ParseContext`]; [`event`] decodes MIDI payloads; [`linker`]
//! cross-references descriptors and folder nodes; [`emit`] renders the
//! linked tree to Standard MIDI Files. [`bundle`] and [`pipeline`] wire the
//! whole thing to a bundle directory on disk.

pub mod bundle;
pub mod config;
pub mod context;
pub mod emit;
pub mod error;
pub mod event;
pub mod linker;
pub mod offsets;
pub mod pipeline;
pub mod record;
pub mod scanner;
pub mod song;
pub mod tree;

pub use config::Config;
pub use error::{ParseError, Result};
pub use pipeline::RunReport;
