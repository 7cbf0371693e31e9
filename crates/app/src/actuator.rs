//! Pointer actuation adapters.

use std::process::Command;
use std::thread;
use std::time::Duration;

use fogchart_core::{Actuator, PixelPos};
use tracing::{info, warn};

/// Runs an argument vector per click, substituting `{x}`, `{y}` and `{duration_ms}`.
/// Failures are logged and otherwise ignored.
pub struct CommandActuator {
    argv: Vec<String>,
}

impl CommandActuator {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    fn render(&self, target: PixelPos, transition: Option<Duration>) -> Vec<String> {
        let duration_ms = transition.map_or(0, |d| d.as_millis()).to_string();
        self.argv
            .iter()
            .map(|arg| {
                arg.replace("{x}", &target.x.to_string())
                    .replace("{y}", &target.y.to_string())
                    .replace("{duration_ms}", &duration_ms)
            })
            .collect()
    }
}

impl Actuator for CommandActuator {
    fn move_and_trigger(&mut self, target: PixelPos, transition: Option<Duration>) {
        let argv = self.render(target, transition);
        let Some((program, args)) = argv.split_first() else {
            return;
        };
        info!(x = target.x, y = target.y, "actuating");
        match Command::new(program).args(args).status() {
            Ok(status) if !status.success() => warn!(%status, program, "actuator command failed"),
            Ok(_) => {}
            Err(err) => warn!(error = %err, program, "could not run actuator command"),
        }
    }
}

/// Logs the click it would have made.
#[derive(Default)]
pub struct DryRunActuator;

impl Actuator for DryRunActuator {
    fn move_and_trigger(&mut self, target: PixelPos, transition: Option<Duration>) {
        info!(x = target.x, y = target.y, transition = ?transition, "dry run: would click");
    }
}

/// Waits `settle` before handing the click on, giving the view time to stop moving.
pub struct Settling<A> {
    inner: A,
    settle: Duration,
}

impl<A> Settling<A> {
    pub fn new(inner: A, settle: Duration) -> Self {
        Self { inner, settle }
    }
}

impl<A: Actuator> Actuator for Settling<A> {
    fn move_and_trigger(&mut self, target: PixelPos, transition: Option<Duration>) {
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
        self.inner.move_and_trigger(target, transition);
    }
}
