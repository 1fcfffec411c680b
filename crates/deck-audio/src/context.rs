use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::analyser::AnalyserNode;
use crate::error::GraphError;
use crate::filters::FilterStage;

/// Anything that can sit in a media element's output path.
pub trait AudioProcessor: Send {
    /// Process an interleaved block in place.
    fn process(&mut self, block: &mut [f32], channels: usize);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

impl ContextState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ContextState::Running,
            2 => ContextState::Closed,
            _ => ContextState::Suspended,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ContextState::Suspended => 0,
            ContextState::Running => 1,
            ContextState::Closed => 2,
        }
    }
}

/// Run state shared by the control side and the processing chain.
/// Starts suspended; only a user gesture resumes it.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    sample_rate: u32,
    state: Arc<AtomicU8>,
}

impl ProcessingContext {
    pub fn new(sample_rate: u32) -> Result<Self, GraphError> {
        if sample_rate == 0 {
            return Err(GraphError::InvalidConfig("sample rate is zero".into()));
        }
        Ok(Self {
            sample_rate,
            state: Arc::new(AtomicU8::new(ContextState::Suspended.as_u8())),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn state(&self) -> ContextState {
        ContextState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn resume(&self) -> Result<(), GraphError> {
        self.transition(ContextState::Running)
    }

    pub fn suspend(&self) -> Result<(), GraphError> {
        self.transition(ContextState::Suspended)
    }

    pub fn close(&self) {
        self.state
            .store(ContextState::Closed.as_u8(), Ordering::Release);
    }

    fn transition(&self, to: ContextState) -> Result<(), GraphError> {
        let closed = ContextState::Closed.as_u8();
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                (cur != closed).then_some(to.as_u8())
            })
            .map(|_| ())
            .map_err(|_| GraphError::ContextClosed)
    }
}

/// Filters in series followed by the analyser tap. Outputs silence and
/// leaves the analyser untouched unless the context is running.
pub struct ProcessingChain {
    context: ProcessingContext,
    stages: Vec<FilterStage>,
    analyser: AnalyserNode,
    mono: Vec<f32>,
}

impl ProcessingChain {
    pub fn new(context: ProcessingContext, stages: Vec<FilterStage>, analyser: AnalyserNode) -> Self {
        Self {
            context,
            stages,
            analyser,
            mono: Vec::new(),
        }
    }
}

impl AudioProcessor for ProcessingChain {
    fn process(&mut self, block: &mut [f32], channels: usize) {
        if self.context.state() != ContextState::Running {
            block.fill(0.0);
            return;
        }
        for stage in &mut self.stages {
            stage.process(block);
        }

        let channels = channels.max(1);
        self.mono.clear();
        self.mono.extend(
            block
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
        );
        self.analyser.push_samples(&self.mono);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{BiquadNode, BASS_FREQUENCY};

    fn chain() -> (ProcessingContext, AnalyserNode, ProcessingChain) {
        let ctx = ProcessingContext::new(44_100).unwrap();
        let analyser = AnalyserNode::new(32, 0.0).unwrap();
        let stage = FilterStage::new(BiquadNode::low_shelf(BASS_FREQUENCY), 44_100, 2).unwrap();
        let chain = ProcessingChain::new(ctx.clone(), vec![stage], analyser.clone());
        (ctx, analyser, chain)
    }

    #[test]
    fn test_suspended_chain_is_silent() {
        let (ctx, analyser, mut chain) = chain();
        assert_eq!(ctx.state(), ContextState::Suspended);

        let mut block = vec![0.5f32; 64];
        chain.process(&mut block, 2);
        assert!(block.iter().all(|s| *s == 0.0));

        let mut time = vec![0u8; 32];
        analyser.byte_time_domain_data(&mut time);
        assert!(time.iter().all(|b| *b == 128));
    }

    #[test]
    fn test_running_chain_feeds_analyser() {
        let (ctx, analyser, mut chain) = chain();
        ctx.resume().unwrap();

        let mut block: Vec<f32> = (0..64).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        chain.process(&mut block, 2);
        // L/R cancel in the mono tap
        let mut time = vec![0u8; 32];
        analyser.byte_time_domain_data(&mut time);
        assert!(time.iter().all(|b| (*b as i32 - 128).abs() <= 1));
        assert!(block.iter().any(|s| *s != 0.0));
    }

    #[test]
    fn test_closed_context_cannot_resume() {
        let ctx = ProcessingContext::new(48_000).unwrap();
        ctx.close();
        assert_eq!(ctx.resume(), Err(GraphError::ContextClosed));
        assert_eq!(ctx.state(), ContextState::Closed);
        assert!(ProcessingContext::new(0).is_err());
    }
}
