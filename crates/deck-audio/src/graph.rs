//! Lazily built processing graph:
//! source -> bass shelf -> mid peak -> treble shelf -> analyser -> output.
//!
//! Built at most once per session, on the first user-initiated playback.
//! Switching stations only changes the media element's source, never the
//! graph.

use deck_proto::protocol::Band;
use tracing::{info, warn};

use crate::analyser::AnalyserNode;
use crate::context::{ContextState, ProcessingChain, ProcessingContext};
use crate::error::GraphError;
use crate::filters::{
    BiquadNode, FilterStage, BASS_FREQUENCY, MID_FREQUENCY, MID_Q, TREBLE_FREQUENCY,
};
use crate::media::MediaElement;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphConfig {
    pub fft_size: usize,
    pub smoothing: f32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            fft_size: 512,
            smoothing: 0.85,
        }
    }
}

/// Control handles of the three equalizer filters.
#[derive(Debug, Clone)]
pub struct EqNodes {
    pub bass: BiquadNode,
    pub mid: BiquadNode,
    pub treble: BiquadNode,
}

impl EqNodes {
    pub fn new() -> Self {
        Self {
            bass: BiquadNode::low_shelf(BASS_FREQUENCY),
            mid: BiquadNode::peaking(MID_FREQUENCY, MID_Q),
            treble: BiquadNode::high_shelf(TREBLE_FREQUENCY),
        }
    }

    pub fn node(&self, band: Band) -> &BiquadNode {
        match band {
            Band::Bass => &self.bass,
            Band::Mid => &self.mid,
            Band::Treble => &self.treble,
        }
    }
}

impl Default for EqNodes {
    fn default() -> Self {
        Self::new()
    }
}

/// What consumers get back: both present when the graph is ready, both
/// absent when it is unavailable.
#[derive(Debug, Clone, Default)]
pub struct GraphHandles {
    pub analyser: Option<AnalyserNode>,
    pub eq: Option<EqNodes>,
}

impl GraphHandles {
    pub fn is_empty(&self) -> bool {
        self.analyser.is_none() && self.eq.is_none()
    }
}

#[derive(Debug)]
pub enum GraphState {
    Uninitialized,
    Ready {
        context: ProcessingContext,
        handles: GraphHandles,
    },
    /// Construction failed; playback continues unprocessed.
    Unavailable(String),
}

pub struct SignalGraphManager {
    config: GraphConfig,
    state: GraphState,
}

impl SignalGraphManager {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            state: GraphState::Uninitialized,
        }
    }

    pub fn state(&self) -> &GraphState {
        &self.state
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.state, GraphState::Unavailable(_))
    }

    /// Build the graph on first call; later calls only resume a suspended
    /// context. Never attaches a second processor to `element`.
    pub fn ensure_graph(&mut self, element: &dyn MediaElement) -> GraphHandles {
        match &self.state {
            GraphState::Ready { context, handles } => {
                if context.state() == ContextState::Suspended {
                    if let Err(e) = context.resume() {
                        warn!("could not resume processing context: {}", e);
                    }
                }
                return handles.clone();
            }
            GraphState::Unavailable(_) => return GraphHandles::default(),
            GraphState::Uninitialized => {}
        }

        match build(&self.config, element) {
            Ok((context, handles)) => {
                info!(
                    "processing graph ready: {} Hz, fft {}",
                    context.sample_rate(),
                    self.config.fft_size
                );
                self.state = GraphState::Ready {
                    context,
                    handles: handles.clone(),
                };
                handles
            }
            Err(e) => {
                warn!("processing graph unavailable, playing unprocessed: {}", e);
                self.state = GraphState::Unavailable(e.to_string());
                GraphHandles::default()
            }
        }
    }

    /// Silence the chain until the next `ensure_graph`.
    pub fn suspend(&self) -> Result<(), GraphError> {
        match &self.state {
            GraphState::Ready { context, .. } => context.suspend(),
            _ => Ok(()),
        }
    }

    pub fn close(&mut self) {
        if let GraphState::Ready { context, .. } = &self.state {
            context.close();
        }
    }
}

fn build(
    config: &GraphConfig,
    element: &dyn MediaElement,
) -> Result<(ProcessingContext, GraphHandles), GraphError> {
    let rate = element.sample_rate();
    let channels = element.channels();
    let context = ProcessingContext::new(rate)?;
    let analyser = AnalyserNode::new(config.fft_size, config.smoothing)?;
    let eq = EqNodes::new();
    let stages = vec![
        FilterStage::new(eq.bass.clone(), rate, channels)?,
        FilterStage::new(eq.mid.clone(), rate, channels)?,
        FilterStage::new(eq.treble.clone(), rate, channels)?,
    ];
    let chain = ProcessingChain::new(context.clone(), stages, analyser.clone());
    element.attach_processor(Box::new(chain))?;
    context.resume()?;
    Ok((
        context,
        GraphHandles {
            analyser: Some(analyser),
            eq: Some(eq),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AudioProcessor;
    use crate::error::PlayRejection;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Nop;

    impl AudioProcessor for Nop {
        fn process(&mut self, _block: &mut [f32], _channels: usize) {}
    }

    struct StubElement {
        rate: u32,
        attaches: AtomicUsize,
        processor: Mutex<Option<Box<dyn AudioProcessor>>>,
    }

    impl StubElement {
        fn new(rate: u32) -> Self {
            Self {
                rate,
                attaches: AtomicUsize::new(0),
                processor: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl MediaElement for StubElement {
        fn set_source(&self, _url: &str, _generation: u64) {}
        fn load(&self) {}
        async fn play(&self, _generation: u64) -> Result<(), PlayRejection> {
            Ok(())
        }
        fn pause(&self) {}
        fn set_volume(&self, _volume: f32) {}
        fn sample_rate(&self) -> u32 {
            self.rate
        }
        fn channels(&self) -> usize {
            2
        }
        fn attach_processor(&self, p: Box<dyn AudioProcessor>) -> Result<(), GraphError> {
            self.attaches.fetch_add(1, Ordering::SeqCst);
            let mut slot = self.processor.lock().unwrap();
            if slot.is_some() {
                return Err(GraphError::SourceAlreadyAttached);
            }
            *slot = Some(p);
            Ok(())
        }
    }

    #[test]
    fn test_graph_built_once() {
        let el = StubElement::new(44_100);
        let mut mgr = SignalGraphManager::new(GraphConfig::default());
        let first = mgr.ensure_graph(&el);
        let second = mgr.ensure_graph(&el);
        assert!(matches!(mgr.state(), GraphState::Ready { .. }));
        assert_eq!(el.attaches.load(Ordering::SeqCst), 1);
        let (a, b) = (first.eq.unwrap(), second.eq.unwrap());
        assert!(a.bass.gain().same_as(b.bass.gain()));
        assert_eq!(first.analyser.unwrap().fft_size(), 512);
    }

    #[test]
    fn test_refused_attach_degrades_to_unavailable() {
        let el = StubElement::new(44_100);
        el.attach_processor(Box::new(Nop)).unwrap();
        let mut mgr = SignalGraphManager::new(GraphConfig::default());
        assert!(mgr.ensure_graph(&el).is_empty());
        assert!(mgr.is_unavailable());
        // no second attempt
        assert!(mgr.ensure_graph(&el).is_empty());
        assert_eq!(el.attaches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_bad_analyser_config_degrades() {
        let el = StubElement::new(44_100);
        let mut mgr = SignalGraphManager::new(GraphConfig {
            fft_size: 1000,
            smoothing: 0.85,
        });
        assert!(mgr.ensure_graph(&el).is_empty());
        assert!(matches!(mgr.state(), GraphState::Unavailable(r) if r.contains("fft size")));
        assert_eq!(el.attaches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_low_sample_rate_degrades() {
        let el = StubElement::new(4_000);
        let mut mgr = SignalGraphManager::new(GraphConfig::default());
        assert!(mgr.ensure_graph(&el).is_empty());
        assert!(mgr.is_unavailable());
    }

    #[test]
    fn test_ensure_resumes_suspended_context() {
        let el = StubElement::new(48_000);
        let mut mgr = SignalGraphManager::new(GraphConfig::default());
        mgr.ensure_graph(&el);
        mgr.suspend().unwrap();
        match mgr.state() {
            GraphState::Ready { context, .. } => assert_eq!(context.state(), ContextState::Suspended),
            other => panic!("unexpected {other:?}"),
        }
        mgr.ensure_graph(&el);
        match mgr.state() {
            GraphState::Ready { context, .. } => assert_eq!(context.state(), ContextState::Running),
            other => panic!("unexpected {other:?}"),
        }
    }
}
