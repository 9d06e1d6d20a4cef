mod command;

use std::io::BufRead;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::Parser;
use cwazy_audio::CpalHost;
use cwazy_cw::{params, tokenize, Controller, CwParams};
use rand::rngs::StdRng;
use rand::SeedableRng;

use command::{parse_line, Line, HELP};

/// Extra time to let the filters ring out before closing the device.
const TAIL: Duration = Duration::from_millis(250);
/// Give up waiting if the device clock stalls this long past the expected end.
const STALL_MARGIN: Duration = Duration::from_secs(2);

type Receiver = Controller<CpalHost, StdRng>;

#[derive(Parser, Debug)]
#[command(name = "cwazy", about = "Sounds like CW on a shortwave receiver")]
struct Args {
    /// Text to send once and exit. Reads lines from stdin when omitted.
    text: Option<String>,

    /// Keying speed in words per minute.
    #[arg(long, default_value_t = params::DEFAULT_WPM)]
    wpm: f64,

    /// Keying irregularity, 0 (perfect) to 0.5.
    #[arg(long, default_value_t = params::DEFAULT_JITTER)]
    jitter: f64,

    /// Tone frequency in Hz.
    #[arg(long, default_value_t = params::DEFAULT_TONE_FREQ_HZ)]
    tone_freq: f32,

    /// Tone level, 0 to 1.
    #[arg(long, default_value_t = params::DEFAULT_TONE_VOLUME)]
    tone_volume: f32,

    /// Noise level, 0 to 1.
    #[arg(long, default_value_t = params::DEFAULT_NOISE_VOLUME)]
    noise_volume: f32,

    /// Band-pass low corner in Hz.
    #[arg(long, default_value_t = params::DEFAULT_BANDPASS_LOW_HZ)]
    low: f32,

    /// Band-pass high corner in Hz.
    #[arg(long, default_value_t = params::DEFAULT_BANDPASS_HIGH_HZ)]
    high: f32,

    /// Regex selecting the output device by name.
    #[arg(long)]
    device: Option<String>,

    /// Seed for the jitter generator.
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn params(&self) -> CwParams {
        CwParams {
            wpm: self.wpm,
            tone_freq_hz: self.tone_freq,
            tone_volume: self.tone_volume,
            noise_volume: self.noise_volume,
            bandpass_low_hz: self.low,
            bandpass_high_hz: self.high,
            jitter: self.jitter,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let host = match &args.device {
        Some(pattern) => CpalHost::with_device(pattern.clone()),
        None => CpalHost::new(),
    };
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut receiver =
        Controller::with_rng(host, args.params(), rng).context("invalid parameters")?;
    receiver.start().context("failed to start audio")?;

    match &args.text {
        Some(text) => transmit_once(&mut receiver, text),
        None => interactive(&mut receiver),
    }
}

/// Send `text`, wait for it to be rendered, then close the device.
fn transmit_once(receiver: &mut Receiver, text: &str) -> anyhow::Result<()> {
    let tokens = tokenize(text)?;
    receiver.send_tokens(&tokens)?;

    let remaining = match (receiver.current_time(), receiver.transmission_end()) {
        (Some(now), Some(end)) => Duration::from_secs_f64((end - now).max(0.0)),
        _ => Duration::ZERO,
    };
    let deadline = Instant::now() + remaining + STALL_MARGIN;
    log::debug!("transmission needs {:.2}s", remaining.as_secs_f64());

    while let (Some(now), Some(end)) = (receiver.current_time(), receiver.transmission_end()) {
        if now >= end {
            break;
        }
        if Instant::now() >= deadline {
            log::warn!("audio clock stalled at {:.3}s, giving up", now);
            break;
        }
        std::thread::sleep(Duration::from_secs_f64((end - now).min(0.1)));
    }

    std::thread::sleep(TAIL);
    receiver.stop();
    Ok(())
}

fn interactive(receiver: &mut Receiver) -> anyhow::Result<()> {
    println!("{}", HELP);
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        let parsed = match parse_line(&line) {
            Ok(parsed) => parsed,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match parsed {
            Line::Start => receiver.start().context("failed to start audio")?,
            Line::Stop => receiver.stop(),
            Line::Status => print_status(receiver),
            Line::Help => println!("{}", HELP),
            Line::Quit => break,
            Line::Set(setting) => {
                if let Err(e) = setting.apply(receiver) {
                    println!("{}", e);
                }
            }
            Line::Send(text) => send_line(receiver, &text)?,
        }
    }
    receiver.stop();
    Ok(())
}

/// Queue one line of text, with a word gap so the next line doesn't run on.
fn send_line(receiver: &mut Receiver, text: &str) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }
    if !receiver.is_started() {
        println!("receiver is stopped, type /start first");
        return Ok(());
    }
    let mut tokens = match tokenize(text) {
        Ok(tokens) => tokens,
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    };
    tokens.push(" ".to_string());
    let events = receiver.send_tokens(&tokens)?;
    log::debug!("queued {} elements", events.len());
    Ok(())
}

fn print_status(receiver: &Receiver) {
    let p = receiver.snapshot();
    println!(
        "{} | {} wpm, jitter {} | tone {} Hz at {} | noise {} | band {}-{} Hz",
        if receiver.is_started() { "running" } else { "stopped" },
        p.wpm,
        p.jitter,
        p.tone_freq_hz,
        p.tone_volume,
        p.noise_volume,
        p.bandpass_low_hz,
        p.bandpass_high_hz
    );
}
