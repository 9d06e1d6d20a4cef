use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{AudioError, ConfigError, Error};
use crate::graph::{AudioContext, AudioHost, NodeId, NodeKind};
use crate::params::{check_frequency, check_jitter, check_volume, check_wpm, CwParams};
use crate::schedule::{schedule_token, EnvelopeEvent, ScheduleCursor};
use crate::timing::{Element, Timing};

/// Nodes the controller keeps driving after the graph is built.
#[derive(Debug, Clone, Copy)]
struct SignalNodes {
    noise_gain: NodeId,
    oscillator: NodeId,
    tone_volume: NodeId,
    tone_gate: NodeId,
    highpass: NodeId,
    lowpass: NodeId,
}

struct Session<C> {
    context: C,
    nodes: SignalNodes,
    cursor: ScheduleCursor,
}

/// Drives one simulated receiver: owns the parameters, the audio session
/// and the schedule cursor.
///
/// Parameters are stored whether or not a session is running. While one is,
/// tone, volume and filter changes are pushed to the graph at once; speed
/// and jitter only affect tokens sent afterwards.
pub struct Controller<H: AudioHost, R = StdRng> {
    host: H,
    params: CwParams,
    timing: Timing,
    rng: R,
    session: Option<Session<H::Context>>,
}

impl<H: AudioHost> Controller<H> {
    /// Create a controller with jitter drawn from an entropy-seeded generator.
    pub fn new(host: H, params: CwParams) -> Result<Self, ConfigError> {
        Self::with_rng(host, params, StdRng::from_entropy())
    }
}

impl<H: AudioHost, R: Rng> Controller<H, R> {
    pub fn with_rng(host: H, params: CwParams, rng: R) -> Result<Self, ConfigError> {
        params.validate()?;
        let timing = params.timing()?;
        Ok(Self {
            host,
            params,
            timing,
            rng,
            session: None,
        })
    }

    /// Open an audio session and build the receiver graph. Does nothing if
    /// a session is already running.
    ///
    /// If any step after opening fails, the opened context is closed again
    /// before the error is returned.
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.session.is_some() {
            log::debug!("start: session already running");
            return Ok(());
        }

        let mut context = self.host.open()?;
        let nodes = match build_graph(&mut context, &self.params) {
            Ok(nodes) => nodes,
            Err(e) => {
                log::debug!("start: graph construction failed, closing context: {}", e);
                context.close();
                return Err(e);
            }
        };

        log::debug!("session started at {:.3}s", context.current_time());
        self.session = Some(Session {
            context,
            nodes,
            cursor: ScheduleCursor::new(),
        });
        Ok(())
    }

    /// Close the session, silencing anything still scheduled. Does nothing
    /// if no session is running.
    pub fn stop(&mut self) {
        match self.session.take() {
            Some(session) => {
                log::debug!("session stopped at {:.3}s", session.context.current_time());
                session.context.close();
            }
            None => log::debug!("stop: no session running"),
        }
    }

    pub fn is_started(&self) -> bool {
        self.session.is_some()
    }

    /// Send text one character at a time; whitespace becomes a word gap.
    ///
    /// Returns the tone intervals scheduled, or nothing if no session is
    /// running.
    pub fn send_text(&mut self, text: &str) -> Result<Vec<EnvelopeEvent>, AudioError> {
        self.send(text.chars().map(|ch| ch.to_string()))
    }

    /// Send pre-split tokens. Multi-letter tokens are looked up as prosigns.
    pub fn send_tokens<S: AsRef<str>>(
        &mut self,
        tokens: &[S],
    ) -> Result<Vec<EnvelopeEvent>, AudioError> {
        self.send(tokens.iter().map(|token| token.as_ref().to_string()))
    }

    fn send<I>(&mut self, tokens: I) -> Result<Vec<EnvelopeEvent>, AudioError>
    where
        I: Iterator<Item = String>,
    {
        let Some(session) = self.session.as_mut() else {
            log::trace!("send: no session running, ignoring");
            return Ok(Vec::new());
        };

        let gate = session.nodes.tone_gate;
        let mut events = Vec::new();
        for token in tokens {
            let now = session.context.current_time();
            let first = events.len();
            let before = session.cursor.next_start();
            schedule_token(
                &token,
                &mut session.cursor,
                now,
                &self.timing,
                &mut self.rng,
                &mut events,
            );
            for idx in first..events.len() {
                if let Err(e) = key_event(&mut session.context, gate, &events[idx]) {
                    // Resume after the last element that was fully queued.
                    let resume = if idx > first {
                        Some(events[idx - 1].end + self.timing.nominal(Element::InterCharacter))
                    } else {
                        before
                    };
                    session.cursor.rewind(resume);
                    log::warn!(
                        "send: queued {} of {} elements before failing: {}",
                        idx,
                        events.len(),
                        e
                    );
                    return Err(e);
                }
            }
        }
        Ok(events)
    }

    pub fn set_wpm(&mut self, wpm: f64) -> Result<(), Error> {
        check_wpm(wpm)?;
        self.timing = Timing::new(wpm, self.params.jitter)?;
        self.params.wpm = wpm;
        Ok(())
    }

    pub fn set_jitter(&mut self, jitter: f64) -> Result<(), Error> {
        check_jitter(jitter)?;
        self.timing = Timing::new(self.params.wpm, jitter)?;
        self.params.jitter = jitter;
        Ok(())
    }

    pub fn set_tone_freq(&mut self, hz: f32) -> Result<(), Error> {
        check_frequency("tone frequency", hz)?;
        self.params.tone_freq_hz = hz;
        self.push_live(|nodes| nodes.oscillator, hz)
    }

    pub fn set_tone_volume(&mut self, volume: f32) -> Result<(), Error> {
        check_volume("tone volume", volume)?;
        self.params.tone_volume = volume;
        self.push_live(|nodes| nodes.tone_volume, volume)
    }

    pub fn set_noise_volume(&mut self, volume: f32) -> Result<(), Error> {
        check_volume("noise volume", volume)?;
        self.params.noise_volume = volume;
        self.push_live(|nodes| nodes.noise_gain, volume)
    }

    pub fn set_bandpass_low(&mut self, hz: f32) -> Result<(), Error> {
        check_frequency("band-pass low corner", hz)?;
        self.params.bandpass_low_hz = hz;
        self.push_live(|nodes| nodes.highpass, hz)
    }

    pub fn set_bandpass_high(&mut self, hz: f32) -> Result<(), Error> {
        check_frequency("band-pass high corner", hz)?;
        self.params.bandpass_high_hz = hz;
        self.push_live(|nodes| nodes.lowpass, hz)
    }

    fn push_live(&mut self, node: fn(&SignalNodes) -> NodeId, value: f32) -> Result<(), Error> {
        if let Some(session) = self.session.as_mut() {
            let id = node(&session.nodes);
            session.context.set_value(id, value)?;
        }
        Ok(())
    }

    /// Current parameter values.
    pub fn snapshot(&self) -> CwParams {
        self.params.clone()
    }

    /// Clock time of the running session.
    pub fn current_time(&self) -> Option<f64> {
        self.session.as_ref().map(|s| s.context.current_time())
    }

    /// Time at which everything sent so far has been keyed, including the
    /// trailing gap.
    pub fn transmission_end(&self) -> Option<f64> {
        self.session.as_ref().and_then(|s| s.cursor.next_start())
    }
}

/// Queue the gate automation for one tone-on interval.
///
/// If the closing write fails the opening one is cancelled, so the gate is
/// never left open.
fn key_event<C: AudioContext>(
    context: &mut C,
    gate: NodeId,
    event: &EnvelopeEvent,
) -> Result<(), AudioError> {
    context.set_value_at(gate, 1.0, event.start)?;
    if let Err(e) = context.set_value_at(gate, 0.0, event.end) {
        // Same time as the opening write, so it wins.
        if context.set_value_at(gate, 0.0, event.start).is_err() {
            if let Err(close) = context.set_value(gate, 0.0) {
                log::warn!("failed to close tone gate: {}", close);
            }
        }
        return Err(e);
    }
    Ok(())
}

/// Noise and tone branches mixed into a high-pass then low-pass stage.
fn build_graph<C: AudioContext>(
    context: &mut C,
    params: &CwParams,
) -> Result<SignalNodes, AudioError> {
    let noise = context.create_node(NodeKind::WhiteNoise)?;
    let noise_gain = context.create_node(NodeKind::Gain {
        gain: params.noise_volume,
    })?;
    let oscillator = context.create_node(NodeKind::Oscillator {
        frequency_hz: params.tone_freq_hz,
    })?;
    let tone_volume = context.create_node(NodeKind::Gain {
        gain: params.tone_volume,
    })?;
    let tone_gate = context.create_node(NodeKind::Gain { gain: 0.0 })?;
    let mixer = context.create_node(NodeKind::Mixer)?;
    let highpass = context.create_node(NodeKind::HighPass {
        cutoff_hz: params.bandpass_low_hz,
    })?;
    let lowpass = context.create_node(NodeKind::LowPass {
        cutoff_hz: params.bandpass_high_hz,
    })?;

    context.connect(noise, noise_gain)?;
    context.connect(noise_gain, mixer)?;
    context.connect(oscillator, tone_volume)?;
    context.connect(tone_volume, tone_gate)?;
    context.connect(tone_gate, mixer)?;
    context.connect(mixer, highpass)?;
    context.connect(highpass, lowpass)?;
    context.connect_output(lowpass)?;

    Ok(SignalNodes {
        noise_gain,
        oscillator,
        tone_volume,
        tone_gate,
        highpass,
        lowpass,
    })
}
