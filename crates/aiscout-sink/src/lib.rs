//! Incremental sink (spec.md §4.J): daily-bucketed files, keyed merge,
//! atomic write, plus a Markdown digest view over a day's output.

mod digest;
mod item;
mod sink;

pub use digest::render_markdown;
pub use item::{ArticleTag, NormalizedItem};
pub use sink::{IncrementalSink, SinkDocument};
