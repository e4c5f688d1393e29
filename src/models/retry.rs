use std::time::Duration;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// How long the broker supervisor waits between connect attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconnectPolicy {
    Fixed {
        delay: Duration,
    },
    Exponential {
        initial: Duration,
        max: Duration,
        multiplier: u32,
    },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Fixed {
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the attempt following `failures` consecutive failures (1-based).
    pub fn delay_for(&self, failures: u32) -> Duration {
        match self {
            ReconnectPolicy::Fixed { delay } => *delay,
            ReconnectPolicy::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let exponent = failures.saturating_sub(1);
                let factor = multiplier.saturating_pow(exponent).max(1);
                let base = initial.saturating_mul(factor).min(*max);

                let jitter = rand::random_range(-0.1..=0.1);
                base.mul_f64(1.0 + jitter).min(*max)
            }
        }
    }
}
