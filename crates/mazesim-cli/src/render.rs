//! Console rendering of display-sink events and the final map.

use colored::Colorize;
use mazesim_perception::{DisplayGrid, Paint};
use mazesim_types::{EventPayload, TerminationReason};

/// How loudly a line should be printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Warning,
    Alert,
    Done,
}

/// Turn an event into a console line.  Pose changes and input refreshes
/// are not printed.
pub fn describe(payload: &EventPayload) -> Option<(Tone, String)> {
    match payload {
        EventPayload::Status(s) if s.starts_with("warning") => Some((Tone::Warning, s.clone())),
        EventPayload::Status(s) => Some((Tone::Info, s.clone())),
        EventPayload::Coverage(p) => Some((Tone::Info, format!("coverage {p}%"))),
        EventPayload::TimeRemaining(n) if *n % 10 == 0 || *n <= 5 => {
            Some((Tone::Info, format!("{n}s remaining")))
        }
        EventPayload::TimeRemaining(_) => None,
        EventPayload::Alert(msg) => Some((Tone::Alert, msg.clone())),
        EventPayload::RunFinished(reason) => Some((Tone::Done, finished_line(*reason))),
        EventPayload::PoseChanged(_) | EventPayload::InputRefreshed => None,
    }
}

fn finished_line(reason: TerminationReason) -> String {
    format!("run finished: {reason}")
}

pub fn print_event(payload: &EventPayload) {
    let Some((tone, line)) = describe(payload) else {
        return;
    };
    match tone {
        Tone::Info => println!("  {} {}", "·".dimmed(), line),
        Tone::Warning => println!("  {} {}", "⚠".yellow().bold(), line.yellow()),
        Tone::Alert => println!("  {} {}", "⏰".red().bold(), line.red().bold()),
        Tone::Done => println!("  {} {}", "✓".green().bold(), line.green().bold()),
    }
}

/// Print the grid with a legend.
pub fn print_map(grid: &DisplayGrid) {
    println!();
    print!("{grid}");
    println!(
        "  legend: {} unvisited  {} robot  {} explored  {} landmark  {} obstacle",
        Paint::Unvisited.glyph(),
        Paint::Lead.glyph(),
        Paint::Explored.glyph(),
        Paint::Landmark.glyph(),
        Paint::Obstacle.glyph(),
    );
    println!(
        "  coverage: {}%",
        grid.coverage_percent().to_string().bold()
    );
}
