//! Audio side of deckradio: the media element that decodes and plays a
//! stream, and the processing graph (equalizer filters + analyser) inserted
//! into its output.

pub mod analyser;
pub mod context;
pub mod equalizer;
pub mod error;
pub mod filters;
pub mod graph;
pub mod media;
pub mod param;

pub use analyser::AnalyserNode;
pub use equalizer::EqualizerBands;
pub use error::{GraphError, PlayRejection};
pub use graph::{GraphHandles, SignalGraphManager};
