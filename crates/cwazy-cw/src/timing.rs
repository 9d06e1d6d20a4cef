use rand::Rng;

use crate::error::ConfigError;

/// Keyed or silent element whose length derives from the speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Dit,
    Dah,
    InterSymbol,
    InterCharacter,
    InterWord,
}

impl Element {
    /// Nominal length in units (1 unit = dit length).
    pub fn units(&self) -> f64 {
        match self {
            Element::Dit => 1.0,
            Element::Dah => 3.0,
            Element::InterSymbol => 1.0,
            Element::InterCharacter => 3.0,
            Element::InterWord => 7.0,
        }
    }
}

/// Speed and keying irregularity used to size every element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    wpm: f64,
    jitter: f64,
}

impl Timing {
    /// Create a timing model. `wpm` must be positive and `jitter` within [0, 1].
    pub fn new(wpm: f64, jitter: f64) -> Result<Self, ConfigError> {
        if !(wpm.is_finite() && wpm > 0.0) {
            return Err(ConfigError::NonPositiveWpm(wpm));
        }
        if !(0.0..=1.0).contains(&jitter) {
            return Err(ConfigError::JitterOutOfRange(jitter));
        }
        Ok(Self { wpm, jitter })
    }

    pub fn wpm(&self) -> f64 {
        self.wpm
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Length of one unit in seconds. The PARIS word is 50 units long, so
    /// one unit is 60 / (50 * wpm) = 1.2 / wpm.
    pub fn unit(&self) -> f64 {
        1.2 / self.wpm
    }

    /// Nominal, unjittered length of `element` in seconds.
    pub fn nominal(&self, element: Element) -> f64 {
        self.unit() * element.units()
    }

    /// Draw the length of one `element` in seconds.
    ///
    /// Every call scales the nominal length by `1 + jitter * r` with a fresh
    /// `r` uniform in [-1, 1), so consecutive elements of the same character
    /// come out uneven, like a hand key.
    pub fn duration<R: Rng + ?Sized>(&self, element: Element, rng: &mut R) -> f64 {
        let base = self.nominal(element);
        if self.jitter == 0.0 {
            return base;
        }
        let r: f64 = rng.gen_range(-1.0..1.0);
        base * (1.0 + self.jitter * r)
    }
}
