/// White noise source uniform in [-1, 1).
pub(crate) struct WhiteNoise {
    rng: XorShift32,
}

impl WhiteNoise {
    pub(crate) fn new(seed: u32) -> Self {
        Self {
            rng: XorShift32::new(seed),
        }
    }

    pub(crate) fn next(&mut self) -> f32 {
        self.rng.next_f32() * 2.0 - 1.0
    }
}

struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    fn new(seed: u32) -> Self {
        let state = if seed == 0 { 0xA5A5_1234 } else { seed };
        Self { state }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform in [0, 1).
    fn next_f32(&mut self) -> f32 {
        // Top 24 bits fit the f32 mantissa exactly.
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }
}
