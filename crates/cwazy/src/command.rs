use cwazy_cw::{AudioHost, Controller, Error};
use rand::Rng;

/// A parameter change typed at the prompt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setting {
    Wpm(f64),
    Jitter(f64),
    ToneFreq(f32),
    ToneVolume(f32),
    NoiseVolume(f32),
    BandpassLow(f32),
    BandpassHigh(f32),
}

impl Setting {
    pub fn apply<H: AudioHost, R: Rng>(self, ctl: &mut Controller<H, R>) -> Result<(), Error> {
        match self {
            Setting::Wpm(v) => ctl.set_wpm(v),
            Setting::Jitter(v) => ctl.set_jitter(v),
            Setting::ToneFreq(v) => ctl.set_tone_freq(v),
            Setting::ToneVolume(v) => ctl.set_tone_volume(v),
            Setting::NoiseVolume(v) => ctl.set_noise_volume(v),
            Setting::BandpassLow(v) => ctl.set_bandpass_low(v),
            Setting::BandpassHigh(v) => ctl.set_bandpass_high(v),
        }
    }
}

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Start,
    Stop,
    Status,
    Help,
    Quit,
    Set(Setting),
    Send(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    UnknownCommand(String),
    MissingValue(String),
    BadValue { command: String, value: String },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnknownCommand(cmd) => write!(f, "unknown command /{} (try /help)", cmd),
            ParseError::MissingValue(cmd) => write!(f, "/{} needs a value", cmd),
            ParseError::BadValue { command, value } => {
                write!(f, "/{}: {:?} is not a number", command, value)
            }
        }
    }
}

impl std::error::Error for ParseError {}

pub const HELP: &str = "\
/start /stop          open or close the receiver
/wpm N /jitter J      keying speed and irregularity (0-0.5)
/tone HZ              tone frequency
/tone-volume V        tone level (0-1)
/noise-volume V       noise level (0-1)
/low HZ /high HZ      band-pass corners
/status               show current settings
/quit                 exit
anything else is sent; <AR> sends a prosign";

/// Parse a prompt line. Lines starting with `/` are commands, everything
/// else is text to send.
pub fn parse_line(line: &str) -> Result<Line, ParseError> {
    let Some(rest) = line.trim().strip_prefix('/') else {
        return Ok(Line::Send(line.to_string()));
    };

    let mut words = rest.split_whitespace();
    let command = words.next().unwrap_or_default().to_ascii_lowercase();
    let value = words.next();

    let simple = match command.as_str() {
        "start" => Some(Line::Start),
        "stop" => Some(Line::Stop),
        "status" => Some(Line::Status),
        "help" => Some(Line::Help),
        "quit" | "exit" => Some(Line::Quit),
        _ => None,
    };
    if let Some(line) = simple {
        return Ok(line);
    }

    let setting: fn(f64) -> Setting = match command.as_str() {
        "wpm" => Setting::Wpm,
        "jitter" => Setting::Jitter,
        "tone" => |v: f64| Setting::ToneFreq(v as f32),
        "tone-volume" => |v: f64| Setting::ToneVolume(v as f32),
        "noise-volume" => |v: f64| Setting::NoiseVolume(v as f32),
        "low" => |v: f64| Setting::BandpassLow(v as f32),
        "high" => |v: f64| Setting::BandpassHigh(v as f32),
        _ => return Err(ParseError::UnknownCommand(command.clone())),
    };

    let Some(value) = value else {
        return Err(ParseError::MissingValue(command));
    };
    let number: f64 = value.parse().map_err(|_| ParseError::BadValue {
        command: command.clone(),
        value: value.to_string(),
    })?;
    Ok(Line::Set(setting(number)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_sent_verbatim() {
        assert_eq!(parse_line("cq cq de k1abc"), Ok(Line::Send("cq cq de k1abc".to_string())));
        assert_eq!(parse_line(""), Ok(Line::Send(String::new())));
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_line("/start"), Ok(Line::Start));
        assert_eq!(parse_line("  /STOP "), Ok(Line::Stop));
        assert_eq!(parse_line("/status"), Ok(Line::Status));
        assert_eq!(parse_line("/exit"), Ok(Line::Quit));
        assert_eq!(parse_line("/wpm 25"), Ok(Line::Set(Setting::Wpm(25.0))));
        assert_eq!(parse_line("/jitter 0.2"), Ok(Line::Set(Setting::Jitter(0.2))));
        assert_eq!(parse_line("/tone 650"), Ok(Line::Set(Setting::ToneFreq(650.0))));
        assert_eq!(
            parse_line("/noise-volume 0.3"),
            Ok(Line::Set(Setting::NoiseVolume(0.3)))
        );
        assert_eq!(parse_line("/high 900"), Ok(Line::Set(Setting::BandpassHigh(900.0))));
    }

    #[test]
    fn reports_bad_commands() {
        assert_eq!(
            parse_line("/speed 5"),
            Err(ParseError::UnknownCommand("speed".to_string()))
        );
        assert_eq!(parse_line("/wpm"), Err(ParseError::MissingValue("wpm".to_string())));
        assert_eq!(
            parse_line("/low abc"),
            Err(ParseError::BadValue {
                command: "low".to_string(),
                value: "abc".to_string()
            })
        );
    }
}
