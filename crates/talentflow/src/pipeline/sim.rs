use std::time::Duration;

use rand::Rng;

use crate::config::SimulationConfig;

/// Simulated network behavior for the in-process backend. Handlers await
/// [`Simulation::delay`] before touching the store so concurrent requests
/// interleave the way they would against a real server, and write handlers
/// consult [`Simulation::write_fails`] so rollback paths stay reachable.
#[derive(Debug, Clone)]
pub struct Simulation {
    min_delay_ms: u64,
    max_delay_ms: u64,
    write_fail_rate: f64,
}

impl Simulation {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            min_delay_ms: config.min_delay_ms,
            max_delay_ms: config.max_delay_ms.max(config.min_delay_ms),
            write_fail_rate: config.write_fail_rate.clamp(0.0, 1.0),
        }
    }

    /// No delay, no injected failures. The default for tests.
    pub fn off() -> Self {
        Self {
            min_delay_ms: 0,
            max_delay_ms: 0,
            write_fail_rate: 0.0,
        }
    }

    /// Keep the delay settings but fail writes at the given rate.
    pub fn with_write_fail_rate(mut self, rate: f64) -> Self {
        self.write_fail_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub async fn delay(&self) {
        if self.max_delay_ms == 0 {
            return;
        }
        let ms = rand::thread_rng().gen_range(self.min_delay_ms..=self.max_delay_ms);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    pub fn write_fails(&self) -> bool {
        self.write_fail_rate > 0.0 && rand::thread_rng().gen_bool(self.write_fail_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_never_fails_writes() {
        let sim = Simulation::off();
        assert!((0..100).all(|_| !sim.write_fails()));
    }

    #[test]
    fn saturated_rate_always_fails_writes() {
        let sim = Simulation::off().with_write_fail_rate(1.0);
        assert!((0..100).all(|_| sim.write_fails()));
    }
}
