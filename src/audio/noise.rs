use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SAMPLE_RATE: u32 = 44_100;
const STEP: f32 = 0.02;
const DECAY: f32 = 0.9999;
const AMPLITUDE: f32 = 0.3;

/// Brown noise: integrated white noise, a low rumble that masks room sound
/// without competing with the text.
pub struct BrownNoise {
    sample_rate: u32,
    last_value: f32,
    rng: StdRng,
}

impl BrownNoise {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            last_value: 0.0,
            rng,
        }
    }
}

impl Default for BrownNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for BrownNoise {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let white: f32 = self.rng.gen_range(-1.0..1.0);

        // decay keeps the walk from drifting into a DC offset
        self.last_value = ((self.last_value + white * STEP).clamp(-1.0, 1.0)) * DECAY;

        Some(self.last_value * AMPLITUDE)
    }
}

#[cfg(feature = "ambient-audio")]
impl rodio::Source for BrownNoise {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<std::time::Duration> {
        None
    }
}
