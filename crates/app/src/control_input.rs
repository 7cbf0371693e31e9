//! Manual controls: line commands read from stdin.

use std::io::{self, BufRead};
use std::str::FromStr;
use std::thread;

use fogchart_core::PixelPos;
use tokio::sync::mpsc::Sender;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    Refresh,
    ToggleAuto,
    /// A click at `click` on a view of the frame displayed at `display` size.
    Calibrate { click: PixelPos, display: (u32, u32) },
    Status,
    Quit,
}

impl ControlCommand {
    /// `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();
        let command = match (verb, args.as_slice()) {
            ("r" | "refresh", []) => Self::Refresh,
            ("t" | "toggle", []) => Self::ToggleAuto,
            ("s" | "status", []) => Self::Status,
            ("q" | "quit", []) => Self::Quit,
            ("c" | "calibrate", [x, y, w, h]) => {
                let x: u16 = parse_number(x)?;
                let y: u16 = parse_number(y)?;
                let click = PixelPos::new(x.into(), y.into());
                let display = (parse_number(w)?, parse_number(h)?);
                Self::Calibrate { click, display }
            }
            ("c" | "calibrate", _) => {
                return Err("usage: c <x> <y> <display_width> <display_height>".to_string());
            }
            _ => return Err(format!("unknown command '{}'", line.trim())),
        };
        Ok(Some(command))
    }
}

fn parse_number<T: FromStr>(raw: &str) -> Result<T, String> {
    raw.parse::<T>().map_err(|_| format!("'{raw}' must be a non-negative number"))
}

/// Scales a click on a displayed view into source-bitmap pixels.
///
/// Returns `None` for a degenerate display size.
pub fn calibrate_offset(
    click: PixelPos,
    display: (u32, u32),
    source: (u32, u32),
) -> Option<(u32, u32)> {
    if display.0 == 0 || display.1 == 0 || click.x < 0 || click.y < 0 {
        return None;
    }
    let scale = |value: i32, source: u32, display: u32| {
        (u64::from(value as u32) * u64::from(source) / u64::from(display)) as u32
    };
    Some((scale(click.x, source.0, display.0), scale(click.y, source.1, display.1)))
}

/// Forwards parsed stdin lines until stdin closes or the receiver goes away.
///
/// Runs on a plain thread: a blocking stdin read must not hold up runtime shutdown.
pub fn spawn_stdin_reader(commands: Sender<ControlCommand>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(error = %err, "stdin read failed");
                    break;
                }
            };
            match ControlCommand::parse(&line) {
                Ok(Some(command)) => {
                    if commands.blocking_send(command).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(message) => warn!("{message}"),
            }
        }
    })
}
