use crate::error::ConfigError;
use crate::timing::Timing;

pub const DEFAULT_WPM: f64 = 20.0;
pub const DEFAULT_TONE_FREQ_HZ: f32 = 600.0;
pub const DEFAULT_TONE_VOLUME: f32 = 1.0;
pub const DEFAULT_NOISE_VOLUME: f32 = 0.5;
pub const DEFAULT_BANDPASS_LOW_HZ: f32 = 300.0;
pub const DEFAULT_BANDPASS_HIGH_HZ: f32 = 800.0;
pub const DEFAULT_JITTER: f64 = 0.0;

/// Largest jitter factor accepted from callers.
pub const MAX_JITTER: f64 = 0.5;

/// Every user-settable parameter of the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct CwParams {
    pub wpm: f64,
    pub tone_freq_hz: f32,
    pub tone_volume: f32,
    pub noise_volume: f32,
    pub bandpass_low_hz: f32,
    pub bandpass_high_hz: f32,
    pub jitter: f64,
}

impl Default for CwParams {
    fn default() -> Self {
        Self {
            wpm: DEFAULT_WPM,
            tone_freq_hz: DEFAULT_TONE_FREQ_HZ,
            tone_volume: DEFAULT_TONE_VOLUME,
            noise_volume: DEFAULT_NOISE_VOLUME,
            bandpass_low_hz: DEFAULT_BANDPASS_LOW_HZ,
            bandpass_high_hz: DEFAULT_BANDPASS_HIGH_HZ,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl CwParams {
    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_wpm(self.wpm)?;
        check_jitter(self.jitter)?;
        check_frequency("tone frequency", self.tone_freq_hz)?;
        check_volume("tone volume", self.tone_volume)?;
        check_volume("noise volume", self.noise_volume)?;
        check_frequency("band-pass low corner", self.bandpass_low_hz)?;
        check_frequency("band-pass high corner", self.bandpass_high_hz)?;
        Ok(())
    }

    /// Timing model for the current speed and jitter.
    pub fn timing(&self) -> Result<Timing, ConfigError> {
        Timing::new(self.wpm, self.jitter)
    }
}

pub(crate) fn check_wpm(wpm: f64) -> Result<(), ConfigError> {
    if wpm.is_finite() && wpm > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositiveWpm(wpm))
    }
}

pub(crate) fn check_jitter(jitter: f64) -> Result<(), ConfigError> {
    if (0.0..=MAX_JITTER).contains(&jitter) {
        Ok(())
    } else {
        Err(ConfigError::JitterOutOfRange(jitter))
    }
}

pub(crate) fn check_volume(param: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::VolumeOutOfRange { param, value })
    }
}

pub(crate) fn check_frequency(param: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::FrequencyOutOfRange { param, value })
    }
}
