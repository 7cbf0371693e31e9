//! Auto-navigate state machine and inter-cycle jitter.

use std::time::Duration;

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_JITTER_MIN_SECS: u64 = 10;
pub const DEFAULT_JITTER_MAX_SECS: u64 = 18;

/// Inclusive bounds for the delay between navigation cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JitterRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl Default for JitterRange {
    fn default() -> Self {
        Self { min_secs: DEFAULT_JITTER_MIN_SECS, max_secs: DEFAULT_JITTER_MAX_SECS }
    }
}

pub struct Jitter {
    rng: ChaCha8Rng,
    range: JitterRange,
}

impl Jitter {
    pub fn new(seed: u64, range: JitterRange) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed), range }
    }

    /// Whole seconds drawn uniformly from the inclusive range.
    pub fn next_delay(&mut self) -> Duration {
        let JitterRange { min_secs, max_secs } = self.range;
        let span = max_secs.saturating_sub(min_secs) + 1;
        Duration::from_secs(min_secs + self.rng.next_u64() % span)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NavState {
    /// Auto-navigate is off.
    #[default]
    Idle,
    /// A timer is armed for the next cycle.
    Waiting { delay: Duration },
    /// A cycle is in progress.
    Acting,
}

/// What the runtime must do after feeding the machine an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavAction {
    RunCycle,
    /// Arm a one-shot timer; report it back through `timer_fired(generation)`.
    ArmTimer { generation: u64, delay: Duration },
    CancelTimer,
    Nothing,
}

/// Drives IDLE → ACTING → WAITING → ACTING … and back to IDLE on toggle-off.
///
/// Every enable/disable bumps the generation, so a timer armed before a toggle is
/// ignored even if it fires after being cancelled.
pub struct NavigationMachine {
    state: NavState,
    enabled: bool,
    generation: u64,
    jitter: Jitter,
}

impl NavigationMachine {
    pub fn new(jitter: Jitter) -> Self {
        Self { state: NavState::Idle, enabled: false, generation: 0, jitter }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn toggle(&mut self) -> NavAction {
        if self.enabled { self.disable() } else { self.enable() }
    }

    pub fn enable(&mut self) -> NavAction {
        if self.enabled {
            return NavAction::Nothing;
        }
        self.enabled = true;
        self.generation += 1;
        info!("auto-navigation enabled");
        match self.state {
            // The in-flight cycle reschedules when it finishes.
            NavState::Acting => NavAction::Nothing,
            NavState::Idle | NavState::Waiting { .. } => {
                self.state = NavState::Acting;
                NavAction::RunCycle
            }
        }
    }

    /// An in-flight cycle is left to finish but will not reschedule.
    pub fn disable(&mut self) -> NavAction {
        if !self.enabled {
            return NavAction::Nothing;
        }
        self.enabled = false;
        self.generation += 1;
        info!("auto-navigation disabled");
        if matches!(self.state, NavState::Waiting { .. }) {
            self.state = NavState::Idle;
        }
        NavAction::CancelTimer
    }

    pub fn timer_fired(&mut self, generation: u64) -> NavAction {
        let current = self.enabled
            && generation == self.generation
            && matches!(self.state, NavState::Waiting { .. });
        if !current {
            return NavAction::Nothing;
        }
        self.state = NavState::Acting;
        NavAction::RunCycle
    }

    pub fn cycle_finished(&mut self) -> NavAction {
        if self.state != NavState::Acting {
            return NavAction::Nothing;
        }
        if !self.enabled {
            self.state = NavState::Idle;
            return NavAction::Nothing;
        }
        let delay = self.jitter.next_delay();
        info!(delay_secs = delay.as_secs(), "scheduling next navigation cycle");
        self.state = NavState::Waiting { delay };
        NavAction::ArmTimer { generation: self.generation, delay }
    }
}
