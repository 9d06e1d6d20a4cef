use std::sync::OnceLock;

const TABLE_LEN: usize = 4096;

static SINE_TABLE: OnceLock<Vec<f32>> = OnceLock::new();

fn sine_table() -> &'static [f32] {
    SINE_TABLE.get_or_init(|| {
        (0..TABLE_LEN)
            .map(|i| ((i as f32) * std::f32::consts::TAU / TABLE_LEN as f32).sin())
            .collect()
    })
}

/// Table-lookup sine oscillator whose frequency can change while running
/// without a phase jump.
pub(crate) struct SineOscillator {
    sample_rate_hz: f32,
    phase: f32,
    phase_inc: f32,
}

impl SineOscillator {
    pub(crate) fn new(sample_rate_hz: f32, freq_hz: f32) -> Self {
        let mut osc = Self {
            sample_rate_hz,
            phase: 0.0,
            phase_inc: 0.0,
        };
        osc.set_frequency(freq_hz);
        osc
    }

    pub(crate) fn set_frequency(&mut self, freq_hz: f32) {
        let nyquist = self.sample_rate_hz / 2.0;
        self.phase_inc = freq_hz.clamp(0.0, nyquist) * TABLE_LEN as f32 / self.sample_rate_hz;
    }

    pub(crate) fn next(&mut self) -> f32 {
        let table = sine_table();
        let idx = self.phase.floor() as usize % TABLE_LEN;
        let frac = self.phase - self.phase.floor();
        let next = (idx + 1) % TABLE_LEN;
        let value = table[idx] * (1.0 - frac) + table[next] * frac;

        self.phase += self.phase_inc;
        let table_len = TABLE_LEN as f32;
        if self.phase >= table_len {
            self.phase %= table_len;
        }

        value
    }
}
