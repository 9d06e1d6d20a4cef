use cwazy_cw::{AudioContext, AudioError, AudioHost, NodeId, NodeKind};
use ringbuf::{HeapProducer, HeapRb};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::device::start_output;
use crate::render::Command;

const DEFAULT_QUEUE_CAPACITY: usize = 1 << 14;

/// Opens audio sessions on a cpal output device.
pub struct CpalHost {
    device_regex: Option<String>,
    queue_capacity: usize,
}

impl Default for CpalHost {
    fn default() -> Self {
        Self {
            device_regex: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl CpalHost {
    /// Use the default output device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the first output device whose name matches `pattern`.
    pub fn with_device(pattern: impl Into<String>) -> Self {
        Self {
            device_regex: Some(pattern.into()),
            ..Self::default()
        }
    }
}

impl AudioHost for CpalHost {
    type Context = CpalContext;

    fn open(&mut self) -> Result<CpalContext, AudioError> {
        let (producer, consumer) = HeapRb::<Command>::new(self.queue_capacity).split();
        let clock = Arc::new(AtomicU64::new(0));
        let noise_seed: u32 = rand::random();
        log::debug!("opening session, noise seed {:#010x}", noise_seed);
        let (stream, sample_rate_hz) = start_output(
            self.device_regex.as_deref(),
            consumer,
            Arc::clone(&clock),
            noise_seed,
        )?;
        Ok(CpalContext {
            stream,
            queue: GraphQueue::new(producer, clock, sample_rate_hz),
        })
    }
}

/// A playing output stream plus the queue that edits its graph.
pub struct CpalContext {
    stream: cpal::Stream,
    queue: GraphQueue,
}

impl AudioContext for CpalContext {
    fn current_time(&self) -> f64 {
        self.queue.current_time()
    }

    fn create_node(&mut self, kind: NodeKind) -> Result<NodeId, AudioError> {
        self.queue.create_node(kind)
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), AudioError> {
        self.queue.connect(from, to)
    }

    fn connect_output(&mut self, node: NodeId) -> Result<(), AudioError> {
        self.queue.connect_output(node)
    }

    fn set_value(&mut self, node: NodeId, value: f32) -> Result<(), AudioError> {
        self.queue.set_value(node, value)
    }

    fn set_value_at(&mut self, node: NodeId, value: f32, time: f64) -> Result<(), AudioError> {
        self.queue.set_value_at(node, value, time)
    }

    fn close(self) {
        use cpal::traits::StreamTrait;
        if let Err(e) = self.stream.pause() {
            log::warn!("failed to pause audio stream: {}", e);
        }
        // Dropping the stream stops the callback and frees the graph.
    }
}

/// Control-side half of a session: validates graph edits and forwards them
/// to the audio callback, and reads the callback's frame clock.
pub(crate) struct GraphQueue {
    commands: HeapProducer<Command>,
    clock: Arc<AtomicU64>,
    sample_rate_hz: u32,
    nodes: Vec<NodeKind>,
}

impl GraphQueue {
    pub(crate) fn new(
        commands: HeapProducer<Command>,
        clock: Arc<AtomicU64>,
        sample_rate_hz: u32,
    ) -> Self {
        Self {
            commands,
            clock,
            sample_rate_hz,
            nodes: Vec::new(),
        }
    }

    fn push(&mut self, command: Command) -> Result<(), AudioError> {
        self.commands
            .push(command)
            .map_err(|_| AudioError::QueueFull)
    }

    fn kind(&self, node: NodeId) -> Result<NodeKind, AudioError> {
        self.nodes
            .get(node.0)
            .copied()
            .ok_or(AudioError::UnknownNode(node))
    }

    fn valued(&self, node: NodeId) -> Result<(), AudioError> {
        if self.kind(node)?.has_value() {
            Ok(())
        } else {
            Err(AudioError::NoParameter(node))
        }
    }

    pub(crate) fn current_time(&self) -> f64 {
        self.clock.load(Ordering::Acquire) as f64 / self.sample_rate_hz as f64
    }

    pub(crate) fn create_node(&mut self, kind: NodeKind) -> Result<NodeId, AudioError> {
        self.push(Command::AddNode(kind))?;
        self.nodes.push(kind);
        Ok(NodeId(self.nodes.len() - 1))
    }

    pub(crate) fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), AudioError> {
        self.kind(from)?;
        self.kind(to)?;
        // The renderer evaluates nodes in creation order.
        if from >= to {
            return Err(AudioError::InvalidConnection { from, to });
        }
        self.push(Command::Connect {
            from: from.0,
            to: to.0,
        })
    }

    pub(crate) fn connect_output(&mut self, node: NodeId) -> Result<(), AudioError> {
        self.kind(node)?;
        self.push(Command::ConnectOutput(node.0))
    }

    pub(crate) fn set_value(&mut self, node: NodeId, value: f32) -> Result<(), AudioError> {
        self.valued(node)?;
        self.push(Command::SetValue {
            node: node.0,
            value,
        })
    }

    pub(crate) fn set_value_at(
        &mut self,
        node: NodeId,
        value: f32,
        time: f64,
    ) -> Result<(), AudioError> {
        self.valued(node)?;
        let frame = (time * self.sample_rate_hz as f64).round().max(0.0) as u64;
        self.push(Command::SetValueAt {
            node: node.0,
            value,
            frame,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Renderer;
    use cwazy_cw::{Controller, CwParams};
    use ringbuf::HeapConsumer;
    use std::cell::RefCell;
    use std::rc::Rc;

    const SR: u32 = 8_000;

    /// Audio-thread half of an offline session.
    struct Offline {
        commands: HeapConsumer<Command>,
        renderer: Renderer,
        clock: Arc<AtomicU64>,
    }

    impl Offline {
        fn render(&mut self, frames: usize) -> Vec<f32> {
            while let Some(command) = self.commands.pop() {
                self.renderer.apply(command);
            }
            let mut out = vec![0.0f32; frames];
            self.renderer.render(&mut out, 1, |s| s);
            self.clock.store(self.renderer.frame(), Ordering::Release);
            out
        }
    }

    type Shared = Rc<RefCell<Option<Offline>>>;

    struct OfflineHost {
        offline: Shared,
    }

    struct OfflineContext {
        queue: GraphQueue,
        offline: Shared,
    }

    impl AudioHost for OfflineHost {
        type Context = OfflineContext;

        fn open(&mut self) -> Result<OfflineContext, AudioError> {
            let (producer, consumer) = HeapRb::<Command>::new(1024).split();
            let clock = Arc::new(AtomicU64::new(0));
            *self.offline.borrow_mut() = Some(Offline {
                commands: consumer,
                renderer: Renderer::new(SR as f32, 0x1234_5678),
                clock: Arc::clone(&clock),
            });
            Ok(OfflineContext {
                queue: GraphQueue::new(producer, clock, SR),
                offline: Rc::clone(&self.offline),
            })
        }
    }

    impl AudioContext for OfflineContext {
        fn current_time(&self) -> f64 {
            self.queue.current_time()
        }

        fn create_node(&mut self, kind: NodeKind) -> Result<NodeId, AudioError> {
            self.queue.create_node(kind)
        }

        fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), AudioError> {
            self.queue.connect(from, to)
        }

        fn connect_output(&mut self, node: NodeId) -> Result<(), AudioError> {
            self.queue.connect_output(node)
        }

        fn set_value(&mut self, node: NodeId, value: f32) -> Result<(), AudioError> {
            self.queue.set_value(node, value)
        }

        fn set_value_at(&mut self, node: NodeId, value: f32, time: f64) -> Result<(), AudioError> {
            self.queue.set_value_at(node, value, time)
        }

        fn close(self) {
            self.offline.borrow_mut().take();
        }
    }

    fn queue(capacity: usize) -> (GraphQueue, HeapConsumer<Command>, Arc<AtomicU64>) {
        let (producer, consumer) = HeapRb::<Command>::new(capacity).split();
        let clock = Arc::new(AtomicU64::new(0));
        (GraphQueue::new(producer, Arc::clone(&clock), SR), consumer, clock)
    }

    /// Count tone bursts from 5 ms block RMS.
    fn count_bursts(samples: &[f32]) -> usize {
        let block = (SR / 200) as usize;
        let mut bursts = 0;
        let mut on = false;
        for chunk in samples.chunks(block) {
            let rms = (chunk.iter().map(|x| x * x).sum::<f32>() / chunk.len() as f32).sqrt();
            let loud = rms > 0.1;
            if loud && !on {
                bursts += 1;
            }
            on = loud;
        }
        bursts
    }

    #[test]
    fn clock_reads_frames_as_seconds() {
        let (queue, _, clock) = queue(16);
        assert_eq!(queue.current_time(), 0.0);
        clock.store(SR as u64 * 3 / 2, Ordering::Release);
        assert!((queue.current_time() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_invalid_edits() {
        let (mut queue, _, _) = queue(16);
        let noise = queue.create_node(NodeKind::WhiteNoise).expect("noise");
        let gain = queue.create_node(NodeKind::Gain { gain: 1.0 }).expect("gain");

        assert_eq!(
            queue.connect(gain, noise),
            Err(AudioError::InvalidConnection { from: gain, to: noise })
        );
        assert_eq!(
            queue.connect(noise, NodeId(9)),
            Err(AudioError::UnknownNode(NodeId(9)))
        );
        assert_eq!(queue.set_value(noise, 0.5), Err(AudioError::NoParameter(noise)));
        assert!(queue.set_value_at(gain, 0.5, 1.0).is_ok());
    }

    #[test]
    fn full_queue_is_reported() {
        let (mut queue, _, _) = queue(2);
        let gain = queue.create_node(NodeKind::Gain { gain: 1.0 }).expect("gain");
        assert!(queue.set_value(gain, 0.5).is_ok());
        assert_eq!(queue.set_value(gain, 0.25), Err(AudioError::QueueFull));
    }

    #[test]
    fn automation_times_round_to_frames() {
        let (mut queue, mut consumer, _) = queue(16);
        let gain = queue.create_node(NodeKind::Gain { gain: 0.0 }).expect("gain");
        queue.set_value_at(gain, 1.0, 0.06).expect("set");
        queue.set_value_at(gain, 1.0, -1.0).expect("set");
        assert_eq!(consumer.pop(), Some(Command::AddNode(NodeKind::Gain { gain: 0.0 })));
        assert_eq!(
            consumer.pop(),
            Some(Command::SetValueAt { node: 0, value: 1.0, frame: 480 })
        );
        assert_eq!(
            consumer.pop(),
            Some(Command::SetValueAt { node: 0, value: 1.0, frame: 0 })
        );
    }

    #[test]
    fn controller_renders_sos_as_nine_bursts() {
        let offline: Shared = Rc::new(RefCell::new(None));
        let host = OfflineHost {
            offline: Rc::clone(&offline),
        };
        let params = CwParams {
            noise_volume: 0.0,
            ..CwParams::default()
        };
        let mut ctl = Controller::new(host, params).expect("controller");
        ctl.start().expect("start");
        ctl.send_text("SOS").expect("send");

        // 27 units of keying at 480 frames per unit, plus some tail.
        let audio = offline
            .borrow_mut()
            .as_mut()
            .expect("session")
            .render(16_000);
        assert_eq!(count_bursts(&audio), 9);
        assert!(audio[14_000..].iter().all(|s| s.abs() < 1e-3));

        ctl.stop();
        assert!(offline.borrow().is_none());
    }

    #[test]
    fn noise_passes_the_band_when_tone_is_keyed_up() {
        let offline: Shared = Rc::new(RefCell::new(None));
        let host = OfflineHost {
            offline: Rc::clone(&offline),
        };
        let mut ctl = Controller::new(host, CwParams::default()).expect("controller");
        ctl.start().expect("start");

        let audio = offline.borrow_mut().as_mut().expect("session").render(4_000);
        let rms = (audio.iter().map(|x| x * x).sum::<f32>() / audio.len() as f32).sqrt();
        assert!(rms > 0.01, "noise rms {rms}");

        ctl.set_noise_volume(0.0).expect("noise volume");
        let mut guard = offline.borrow_mut();
        let session = guard.as_mut().expect("session");
        session.render(400);
        let quiet = session.render(4_000);
        assert!(quiet.iter().all(|s| s.abs() < 1e-3));
    }
}
