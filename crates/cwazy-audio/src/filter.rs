use std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Response {
    LowPass,
    HighPass,
}

/// Second-order Butterworth section (Audio EQ Cookbook coefficients,
/// transposed direct form II).
pub(crate) struct Biquad {
    response: Response,
    sample_rate_hz: f32,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

const Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

impl Biquad {
    pub(crate) fn new(response: Response, sample_rate_hz: f32, cutoff_hz: f32) -> Self {
        let mut filter = Self {
            response,
            sample_rate_hz,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        };
        filter.set_cutoff(cutoff_hz);
        filter
    }

    /// Recompute coefficients, keeping the filter state.
    pub(crate) fn set_cutoff(&mut self, cutoff_hz: f32) {
        let cutoff = cutoff_hz.clamp(1.0, self.sample_rate_hz * 0.49);
        let w0 = 2.0 * PI * cutoff / self.sample_rate_hz;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * Q);

        let (b0, b1, b2) = match self.response {
            Response::LowPass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            Response::HighPass => {
                let b1 = -(1.0 + cos_w0);
                (-b1 / 2.0, b1, -b1 / 2.0)
            }
        };
        let a0 = 1.0 + alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    pub(crate) fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }
}
