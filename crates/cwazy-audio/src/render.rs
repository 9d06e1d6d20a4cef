use std::collections::VecDeque;

use cwazy_cw::NodeKind;

use crate::filter::{Biquad, Response};
use crate::noise::WhiteNoise;
use crate::oscillator::SineOscillator;

/// Node slots reserved up front so building a graph does not allocate on the
/// audio thread.
const RESERVED_NODES: usize = 16;
const RESERVED_INPUTS: usize = 4;
/// Pending automation points reserved per node.
const RESERVED_AUTOMATION: usize = 2048;

/// Graph edit sent from the control thread to the audio callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Command {
    /// Append a node; its id is its position in creation order.
    AddNode(NodeKind),
    /// Inputs always come from an earlier node.
    Connect { from: usize, to: usize },
    ConnectOutput(usize),
    SetValue { node: usize, value: f32 },
    SetValueAt { node: usize, value: f32, frame: u64 },
}

enum Source {
    Noise(WhiteNoise),
    Oscillator(SineOscillator),
    Gain(f32),
    Filter(Biquad),
    Mixer,
}

struct RenderNode {
    source: Source,
    inputs: Vec<usize>,
    /// Pending (frame, value) changes, ordered by frame.
    automation: VecDeque<(u64, f32)>,
}

impl RenderNode {
    fn set_value(&mut self, value: f32) {
        match &mut self.source {
            Source::Oscillator(osc) => osc.set_frequency(value),
            Source::Gain(gain) => *gain = value,
            Source::Filter(filter) => filter.set_cutoff(value),
            Source::Noise(_) | Source::Mixer => {}
        }
    }

    fn schedule(&mut self, frame: u64, value: f32) {
        // Equal frames keep arrival order so the last write wins.
        let idx = self.automation.partition_point(|&(f, _)| f <= frame);
        self.automation.insert(idx, (frame, value));
    }

    fn apply_due(&mut self, frame: u64) {
        while let Some(&(due, value)) = self.automation.front() {
            if due > frame {
                break;
            }
            self.automation.pop_front();
            self.set_value(value);
        }
    }

    fn render(&mut self, input: f32) -> f32 {
        match &mut self.source {
            Source::Noise(noise) => noise.next(),
            Source::Oscillator(osc) => osc.next(),
            Source::Gain(gain) => input * *gain,
            Source::Filter(filter) => filter.process(input),
            Source::Mixer => input,
        }
    }
}

type NodeBuffers = (Vec<usize>, VecDeque<(u64, f32)>);

/// Evaluates the node graph one frame at a time on the audio thread.
///
/// Create it before handing it to the callback: `new` does all the
/// allocation a typical graph needs.
pub(crate) struct Renderer {
    sample_rate_hz: f32,
    noise_seed: u32,
    nodes: Vec<RenderNode>,
    outputs: Vec<f32>,
    destination: Vec<usize>,
    spare: Vec<NodeBuffers>,
    frame: u64,
}

impl Renderer {
    pub(crate) fn new(sample_rate_hz: f32, noise_seed: u32) -> Self {
        let spare = (0..RESERVED_NODES)
            .map(|_| {
                (
                    Vec::with_capacity(RESERVED_INPUTS),
                    VecDeque::with_capacity(RESERVED_AUTOMATION),
                )
            })
            .collect();
        Self {
            sample_rate_hz,
            noise_seed,
            nodes: Vec::with_capacity(RESERVED_NODES),
            outputs: Vec::with_capacity(RESERVED_NODES),
            destination: Vec::with_capacity(RESERVED_NODES),
            spare,
            frame: 0,
        }
    }

    /// Frames rendered so far.
    pub(crate) fn frame(&self) -> u64 {
        self.frame
    }

    pub(crate) fn apply(&mut self, command: Command) {
        match command {
            Command::AddNode(kind) => {
                let sr = self.sample_rate_hz;
                let source = match kind {
                    NodeKind::WhiteNoise => {
                        let seed = self.noise_seed.wrapping_add(self.nodes.len() as u32);
                        Source::Noise(WhiteNoise::new(seed))
                    }
                    NodeKind::Oscillator { frequency_hz } => {
                        Source::Oscillator(SineOscillator::new(sr, frequency_hz))
                    }
                    NodeKind::Gain { gain } => Source::Gain(gain),
                    NodeKind::HighPass { cutoff_hz } => {
                        Source::Filter(Biquad::new(Response::HighPass, sr, cutoff_hz))
                    }
                    NodeKind::LowPass { cutoff_hz } => {
                        Source::Filter(Biquad::new(Response::LowPass, sr, cutoff_hz))
                    }
                    NodeKind::Mixer => Source::Mixer,
                };
                let (inputs, automation) = self.spare.pop().unwrap_or_default();
                self.nodes.push(RenderNode {
                    source,
                    inputs,
                    automation,
                });
                self.outputs.push(0.0);
            }
            Command::Connect { from, to } => {
                if from < to && to < self.nodes.len() {
                    self.nodes[to].inputs.push(from);
                }
            }
            Command::ConnectOutput(node) => {
                if node < self.nodes.len() {
                    self.destination.push(node);
                }
            }
            Command::SetValue { node, value } => {
                if let Some(node) = self.nodes.get_mut(node) {
                    node.set_value(value);
                }
            }
            Command::SetValueAt { node, value, frame } => {
                if let Some(node) = self.nodes.get_mut(node) {
                    node.schedule(frame, value);
                }
            }
        }
    }

    fn next_frame(&mut self) -> f32 {
        for idx in 0..self.nodes.len() {
            let input: f32 = self.nodes[idx]
                .inputs
                .iter()
                .map(|&src| self.outputs[src])
                .sum();
            let node = &mut self.nodes[idx];
            node.apply_due(self.frame);
            self.outputs[idx] = node.render(input);
        }
        self.frame += 1;
        self.destination
            .iter()
            .map(|&node| self.outputs[node])
            .sum::<f32>()
            .clamp(-1.0, 1.0)
    }

    /// Render interleaved frames, writing the mono mix to every channel.
    pub(crate) fn render<T>(&mut self, out: &mut [T], channels: usize, convert: impl Fn(f32) -> T)
    where
        T: Copy,
    {
        if channels == 0 {
            return;
        }
        for frame in out.chunks_mut(channels) {
            let sample = convert(self.next_frame());
            for chan in frame.iter_mut() {
                *chan = sample;
            }
        }
    }
}
