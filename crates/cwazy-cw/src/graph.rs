//! Interface to the host audio subsystem.
//!
//! A host opens an [`AudioContext`]: a running clock plus a graph of nodes
//! that renders to the output device. Each node has at most one settable
//! value (oscillator frequency, gain, filter corner) that can be changed
//! immediately or at a future time on the context clock.

use crate::error::AudioError;

/// Handle to a node inside one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// Uniform white noise in [-1, 1).
    WhiteNoise,
    /// Free-running sine, started on creation.
    Oscillator { frequency_hz: f32 },
    Gain { gain: f32 },
    HighPass { cutoff_hz: f32 },
    LowPass { cutoff_hz: f32 },
    /// Sums its inputs.
    Mixer,
}

impl NodeKind {
    /// True for kinds that have a settable value.
    pub fn has_value(&self) -> bool {
        !matches!(self, NodeKind::WhiteNoise | NodeKind::Mixer)
    }
}

/// An open audio session on the host.
pub trait AudioContext {
    /// Current time of the rendering clock in seconds. Monotonic.
    fn current_time(&self) -> f64;

    fn create_node(&mut self, kind: NodeKind) -> Result<NodeId, AudioError>;

    /// Feed the output of `from` into `to`.
    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), AudioError>;

    /// Feed the output of `node` to the device.
    fn connect_output(&mut self, node: NodeId) -> Result<(), AudioError>;

    /// Change the value of `node` now.
    fn set_value(&mut self, node: NodeId, value: f32) -> Result<(), AudioError>;

    /// Change the value of `node` at clock time `time`.
    fn set_value_at(&mut self, node: NodeId, value: f32, time: f64) -> Result<(), AudioError>;

    /// Tear down the graph and silence the output. Anything scheduled after
    /// this point is dropped.
    fn close(self);
}

/// Factory for audio sessions.
pub trait AudioHost {
    type Context: AudioContext;

    fn open(&mut self) -> Result<Self::Context, AudioError>;
}
