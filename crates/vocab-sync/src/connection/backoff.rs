//! Exponential reconnect backoff with jitter.

use std::time::Duration;

use rand::Rng;

use vocab_core::config::sync::SyncConfig;

/// Delay schedule for reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before attempt 0.
    pub base: Duration,
    /// Cap on any single delay.
    pub max: Duration,
    /// Relative jitter, 0.25 = ±25%.
    pub jitter: f64,
    /// Attempts before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

impl ReconnectPolicy {
    /// Policy from the `sync` configuration section.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            base: Duration::from_millis(config.base_delay_ms),
            max: Duration::from_millis(config.max_reconnect_interval_ms),
            jitter: sanitize_jitter(config.jitter_ratio),
            max_attempts: config.max_reconnect_attempts,
        }
    }

    /// `min(base * 2^attempt, max)`, before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.max, |d| d.min(self.max))
    }

    /// Jittered delay for `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let unit = if self.jitter > 0.0 {
            rand::rng().random_range(-1.0..=1.0)
        } else {
            0.0
        };
        self.delay_with(attempt, unit)
    }

    /// Delay for `attempt` with jitter position `unit` in `[-1, 1]`.
    ///
    /// The result never exceeds `max`.
    pub fn delay_with(&self, attempt: u32, unit: f64) -> Duration {
        let base = self.base_delay(attempt);
        let unit = if unit.is_finite() { unit.clamp(-1.0, 1.0) } else { 0.0 };
        let scale = 1.0 + sanitize_jitter(self.jitter) * unit;
        base.mul_f64(scale).min(self.max)
    }
}

/// Clamp to `[0, 1]`; non-finite ratios disable jitter.
fn sanitize_jitter(ratio: f64) -> f64 {
    if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy {
            base: Duration::from_millis(1000),
            max: Duration::from_millis(30_000),
            jitter: 0.25,
            max_attempts: 10,
        }
    }

    #[test]
    fn test_base_delay_doubles_then_caps() {
        let p = policy();
        let delays: Vec<u64> = (0..7).map(|a| p.base_delay(a).as_millis() as u64).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16_000, 30_000, 30_000]);
        assert_eq!(p.base_delay(200), p.max);
    }

    #[test]
    fn test_jitter_bounds() {
        let p = policy();
        assert_eq!(p.delay_with(1, -1.0), Duration::from_millis(1500));
        assert_eq!(p.delay_with(1, 1.0), Duration::from_millis(2500));
        assert_eq!(p.delay_with(6, 1.0), p.max);

        for attempt in 0..3 {
            let base = p.base_delay(attempt).as_secs_f64();
            for _ in 0..50 {
                let d = p.delay(attempt).as_secs_f64();
                assert!(d >= base * 0.75 - 1e-9 && d <= base * 1.25 + 1e-9);
            }
        }
    }

    #[test]
    fn test_early_attempts_strictly_increase() {
        let p = policy();
        for attempt in 0..3 {
            assert!(p.delay_with(attempt, 1.0) < p.delay_with(attempt + 1, -1.0));
        }
    }

    #[test]
    fn test_non_finite_jitter_falls_back_to_plain_backoff() {
        let config = SyncConfig {
            jitter_ratio: f64::NAN,
            ..SyncConfig::default()
        };
        let p = ReconnectPolicy::from_config(&config);
        assert_eq!(p.jitter, 0.0);
        assert_eq!(p.delay(1), Duration::from_millis(2000));

        let raw = ReconnectPolicy {
            jitter: f64::INFINITY,
            ..policy()
        };
        assert_eq!(raw.delay(3), Duration::from_millis(8000));
        assert_eq!(policy().delay_with(1, f64::NAN), Duration::from_millis(2000));
    }

    #[test]
    fn test_zero_jitter_is_deterministic() {
        let p = ReconnectPolicy {
            jitter: 0.0,
            ..policy()
        };
        assert_eq!(p.delay(2), Duration::from_millis(4000));
    }
}
