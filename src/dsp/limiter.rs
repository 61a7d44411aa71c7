#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Output Limiter
==============

A sample-peak limiter for the mixed output. Each sample:

    x      = input · makeup
    target = ceiling / |x|   if |x| > ceiling, else 1
    gain   = target                                  if target < gain  (instant attack)
           = gain + (target - gain) · (1 - r)        otherwise         (release)
    out    = x · gain

with the one-pole release coefficient

    r = exp(-1 / (release_seconds · sample_rate))

Attack is instantaneous, so |out| never exceeds the ceiling. Release
glides back to unity gain along the exponential.

Channels
--------

Mono uses one gain. Stereo either shares one gain driven by the louder
channel (linked, keeps the image steady) or limits each side on its own.
Anything past two channels is passed through untouched.
*/

/// Limiter settings in user units. Out-of-range values are clamped, and
/// NaN falls back to the low end of each range.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterParams {
    /// Output ceiling, -60 to 0 dB.
    pub ceiling_db: f32,
    /// 0.1 to 5000 ms.
    pub release_ms: f32,
    /// Gain applied before limiting, -24 to +24 dB.
    pub makeup_db: f32,
    pub bypass: bool,
    pub stereo_link: bool,
}

impl Default for LimiterParams {
    fn default() -> Self {
        Self {
            ceiling_db: -0.3,
            release_ms: 120.0,
            makeup_db: 0.0,
            bypass: false,
            stereo_link: true,
        }
    }
}

impl LimiterParams {
    pub fn with_ceiling_db(mut self, ceiling_db: f32) -> Self {
        self.ceiling_db = ceiling_db;
        self
    }

    pub fn with_release_ms(mut self, release_ms: f32) -> Self {
        self.release_ms = release_ms;
        self
    }

    pub fn with_makeup_db(mut self, makeup_db: f32) -> Self {
        self.makeup_db = makeup_db;
        self
    }

    pub fn with_bypass(mut self, bypass: bool) -> Self {
        self.bypass = bypass;
        self
    }

    pub fn with_stereo_link(mut self, stereo_link: bool) -> Self {
        self.stereo_link = stereo_link;
        self
    }
}

#[inline]
fn clamp_finite(value: f32, min: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        min
    }
}

#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

fn release_coefficient(release_ms: f32, sample_rate: f32) -> f32 {
    let samples = (clamp_finite(release_ms, 0.1, 5_000.0) / 1000.0 * sample_rate).max(1.0);
    (-1.0 / samples).exp()
}

/// Brick-wall peak limiter with instant attack and exponential release.
pub struct Limiter {
    sample_rate: f32,
    params: LimiterParams,
    ceiling: f32,
    makeup: f32,
    release: f32,
    /// Gain for mono, linked stereo, or the left channel.
    gain: f32,
    /// Right channel gain when stereo is unlinked.
    gain_right: f32,
}

impl Limiter {
    pub fn new(sample_rate: f32, params: LimiterParams) -> Self {
        let mut limiter = Self {
            sample_rate,
            params,
            ceiling: 1.0,
            makeup: 1.0,
            release: 0.0,
            gain: 1.0,
            gain_right: 1.0,
        };
        limiter.set_params(params);
        limiter
    }

    /// Replace the settings. Current gain reduction carries over.
    pub fn set_params(&mut self, params: LimiterParams) {
        self.params = params;
        self.ceiling = db_to_linear(clamp_finite(params.ceiling_db, -60.0, 0.0));
        self.makeup = db_to_linear(clamp_finite(params.makeup_db, -24.0, 24.0));
        self.release = release_coefficient(params.release_ms, self.sample_rate);
    }

    pub fn params(&self) -> &LimiterParams {
        &self.params
    }

    /// Linear ceiling after clamping.
    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    /// Current gain of the mono / linked / left path (1.0 = no reduction).
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Limit an interleaved buffer in place.
    pub fn process_interleaved(&mut self, buffer: &mut [f32], channels: usize) {
        if self.params.bypass {
            return;
        }
        match channels {
            1 => {
                for sample in buffer.iter_mut() {
                    let x = *sample * self.makeup;
                    self.gain = self.next_gain(self.gain, x.abs());
                    *sample = x * self.gain;
                }
            }
            2 if self.params.stereo_link => {
                for frame in buffer.chunks_exact_mut(2) {
                    let left = frame[0] * self.makeup;
                    let right = frame[1] * self.makeup;
                    self.gain = self.next_gain(self.gain, left.abs().max(right.abs()));
                    frame[0] = left * self.gain;
                    frame[1] = right * self.gain;
                }
            }
            2 => {
                for frame in buffer.chunks_exact_mut(2) {
                    let left = frame[0] * self.makeup;
                    let right = frame[1] * self.makeup;
                    self.gain = self.next_gain(self.gain, left.abs());
                    self.gain_right = self.next_gain(self.gain_right, right.abs());
                    frame[0] = left * self.gain;
                    frame[1] = right * self.gain_right;
                }
            }
            _ => {}
        }
    }

    /// Forget any gain reduction.
    pub fn reset(&mut self) {
        self.gain = 1.0;
        self.gain_right = 1.0;
    }

    #[inline]
    fn next_gain(&self, gain: f32, peak: f32) -> f32 {
        // NaN peaks fail the comparison and leave the target at unity.
        let target = if peak > self.ceiling {
            self.ceiling / peak
        } else {
            1.0
        };
        if target < gain {
            target
        } else {
            gain + (target - gain) * (1.0 - self.release)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn limiter(params: LimiterParams) -> Limiter {
        Limiter::new(SAMPLE_RATE, params)
    }

    #[test]
    fn quiet_signal_passes_through() {
        let mut lim = limiter(LimiterParams::default());
        let mut buffer = [0.1, -0.5, 0.9, -0.2];
        let expected = buffer;
        lim.process_interleaved(&mut buffer, 1);
        assert_eq!(buffer, expected);
        assert_eq!(lim.gain(), 1.0);
    }

    #[test]
    fn peaks_never_exceed_ceiling() {
        let mut lim = limiter(LimiterParams::default().with_ceiling_db(-6.0));
        let mut buffer: Vec<f32> = (0..512).map(|i| 2.0 * (i as f32 * 0.05).sin()).collect();
        lim.process_interleaved(&mut buffer, 1);

        let ceiling = db_to_linear(-6.0);
        assert!(buffer.iter().all(|s| s.abs() <= ceiling + 1e-6));
        assert!(lim.gain() < 1.0);
    }

    #[test]
    fn gain_recovers_after_release() {
        let mut lim = limiter(LimiterParams::default().with_release_ms(10.0));
        let mut hit = [4.0];
        lim.process_interleaved(&mut hit, 1);
        let reduced = lim.gain();
        assert!(reduced < 0.3);

        // Ten time constants of silence.
        let mut quiet = vec![0.0; 4_800];
        lim.process_interleaved(&mut quiet, 1);
        assert!(lim.gain() > 0.99);
        assert!(lim.gain() > reduced);
    }

    #[test]
    fn makeup_is_applied_before_limiting() {
        let mut lim = limiter(LimiterParams::default().with_makeup_db(6.0));
        let mut buffer = [0.25];
        lim.process_interleaved(&mut buffer, 1);
        assert!((buffer[0] - 0.25 * db_to_linear(6.0)).abs() < 1e-6);
    }

    #[test]
    fn bypass_leaves_buffer_untouched() {
        let mut lim = limiter(LimiterParams::default().with_bypass(true));
        let mut buffer = [3.0, -3.0];
        lim.process_interleaved(&mut buffer, 2);
        assert_eq!(buffer, [3.0, -3.0]);
    }

    #[test]
    fn linked_stereo_shares_gain() {
        let mut lim = limiter(LimiterParams::default().with_ceiling_db(0.0));
        let mut buffer = [2.0, 0.5];
        lim.process_interleaved(&mut buffer, 2);
        assert!((buffer[0] - 1.0).abs() < 1e-6);
        assert!((buffer[1] - 0.25).abs() < 1e-6, "quiet side follows the loud one");
    }

    #[test]
    fn unlinked_stereo_limits_each_side() {
        let params = LimiterParams::default()
            .with_ceiling_db(0.0)
            .with_stereo_link(false);
        let mut lim = limiter(params);
        let mut buffer = [2.0, 0.5];
        lim.process_interleaved(&mut buffer, 2);
        assert!((buffer[0] - 1.0).abs() < 1e-6);
        assert_eq!(buffer[1], 0.5);
    }

    #[test]
    fn non_finite_params_are_clamped() {
        let params = LimiterParams {
            ceiling_db: f32::NAN,
            release_ms: f32::INFINITY,
            makeup_db: 100.0,
            bypass: false,
            stereo_link: true,
        };
        let lim = limiter(params);
        assert!((lim.ceiling() - db_to_linear(-60.0)).abs() < 1e-9);
        assert!(lim.release.is_finite() && lim.release < 1.0);
        assert!((lim.makeup - db_to_linear(24.0)).abs() < 1e-3);
    }
}
