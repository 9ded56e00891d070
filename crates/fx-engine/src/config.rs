use std::time::Duration;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Simulation time covered by one tick.
    pub tick_length: Duration,
    /// Maximum lifecycle log size (oldest entries dropped when exceeded). 0 = unlimited.
    pub max_events: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_length: Duration::from_secs(1),
            max_events: 0,
        }
    }
}

impl SimConfig {
    /// Set the simulation time covered by one tick.
    pub fn with_tick_length(mut self, tick_length: Duration) -> Self {
        self.tick_length = tick_length;
        self
    }

    /// Set the maximum lifecycle log size (0 = unlimited).
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }
}
