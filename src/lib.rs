//! `aiscout`: multi-source AI-content ingestion pipeline.
//!
//! The crate root only wires the CLI; the actual fetch/screen/translate/
//! store/schedule logic lives in the `aiscout-*` workspace crates.

pub mod cli;
