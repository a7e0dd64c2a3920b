//! Colorful console output for scoring events.
//!
//! Provides a `tracing` layer that formats the scoring engine's structured
//! events (`network_compiled`, `working_solution_set`, `score_calculated`)
//! as single colored lines. Enabled with the `console` feature.

use std::io::{self, Write};
use std::sync::OnceLock;

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();

const DEFAULT_DIRECTIVE: &str = "scoreforge_scoring=info";

/// Installs the console layer as the global subscriber.
///
/// Safe to call multiple times; only the first call has effect. `RUST_LOG`
/// overrides the default filter, e.g. `scoreforge_scoring=debug` to see
/// every calculated score.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
        // another subscriber may already be installed by the host application
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(ScoringConsoleLayer)
            .try_init();
    });
}

/// A tracing layer that formats scoring events with colors.
pub struct ScoringConsoleLayer;

impl<S: Subscriber> Layer<S> for ScoringConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !event.metadata().target().starts_with("scoreforge_scoring") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = format_event(*event.metadata().level(), &visitor);
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }
}

#[derive(Default)]
struct EventVisitor {
    event: Option<String>,
    constraint: Option<String>,
    score: Option<String>,
    nodes: Option<u64>,
    layers: Option<u64>,
    constraints: Option<u64>,
    active: Option<u64>,
    facts: Option<u64>,
    cycle: Option<u64>,
    dirty: Option<u64>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        match field.name() {
            "event" => self.event = Some(s.trim_matches('"').to_string()),
            "constraint" => self.constraint = Some(s.trim_matches('"').to_string()),
            "score" => self.score = Some(s.trim_matches('"').to_string()),
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "nodes" => self.nodes = Some(value),
            "layers" => self.layers = Some(value),
            "constraints" => self.constraints = Some(value),
            "active" => self.active = Some(value),
            "facts" => self.facts = Some(value),
            "cycle" => self.cycle = Some(value),
            "dirty" => self.dirty = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_u64(field, value.max(0) as u64);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "event" => self.event = Some(value.to_string()),
            "constraint" => self.constraint = Some(value.to_string()),
            "score" => self.score = Some(value.to_string()),
            _ => {}
        }
    }
}

fn format_event(level: Level, v: &EventVisitor) -> String {
    match v.event.as_deref() {
        Some("network_compiled") => format_network_compiled(level, v),
        Some("constraint_inactive") => format_constraint_inactive(level, v),
        Some("working_solution_set") => format_working_solution(level, v),
        Some("score_calculated") => format_score_calculated(level, v),
        _ => String::new(),
    }
}

fn prefix(level: Level, tag: &str) -> String {
    let level = match level {
        Level::ERROR => "ERROR".bright_red().to_string(),
        Level::WARN => " WARN".yellow().to_string(),
        Level::INFO => " INFO".bright_green().to_string(),
        Level::DEBUG => "DEBUG".bright_blue().to_string(),
        _ => "TRACE".bright_black().to_string(),
    };
    format!("{} {} {}", timestamp().bright_black(), level, format!("[{}]", tag).bright_cyan())
}

fn count(value: Option<u64>) -> String {
    value.unwrap_or(0).to_formatted_string(&Locale::en)
}

fn format_network_compiled(level: Level, v: &EventVisitor) -> String {
    format!(
        "{} Network compiled: nodes ({}), layers ({}), constraints ({} of {} active)",
        prefix(level, "Network"),
        count(v.nodes).bright_yellow(),
        count(v.layers).bright_yellow(),
        count(v.active).bright_magenta().bold(),
        count(v.constraints).white(),
    )
}

fn format_constraint_inactive(level: Level, v: &EventVisitor) -> String {
    format!(
        "{} Constraint ({}) has a zero weight and is skipped",
        prefix(level, "Network"),
        v.constraint.as_deref().unwrap_or("?").white().bold(),
    )
}

fn format_working_solution(level: Level, v: &EventVisitor) -> String {
    format!(
        "{} Working solution set: facts ({})",
        prefix(level, "Director"),
        count(v.facts).bright_yellow(),
    )
}

fn format_score_calculated(level: Level, v: &EventVisitor) -> String {
    format!(
        "{} {} Cycle {:>7} | {} | dirty ({})",
        prefix(level, "Director"),
        "->".bright_blue(),
        count(v.cycle),
        format_score(v.score.as_deref().unwrap_or("N/A")),
        count(v.dirty).bright_black(),
    )
}

fn timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| {
            let secs = d.as_secs() % 100000;
            let millis = d.subsec_millis();
            format!("{:5}.{:03}", secs, millis)
        })
        .unwrap_or_else(|_| "    0.000".to_string())
}

/// Colors each level of a score: negative red or yellow, positive green.
///
/// Handles every built-in score format (`-3`, `0hard/-5soft`,
/// `-1hard/0medium/2soft`); anything else is printed as is.
fn format_score(score: &str) -> String {
    let levels: Vec<&str> = score.split('/').collect();
    let mut parts = Vec::with_capacity(levels.len());
    for (index, level) in levels.iter().enumerate() {
        let digits_end = level
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
            .map_or(level.len(), |(i, _)| i);
        let Ok(number) = level[..digits_end].parse::<i64>() else {
            return score.white().to_string();
        };
        let is_last = index + 1 == levels.len();
        let colored = if number < 0 && !is_last {
            level.bright_red().to_string()
        } else if number < 0 {
            level.yellow().to_string()
        } else if number > 0 {
            level.bright_green().to_string()
        } else {
            level.white().to_string()
        };
        parts.push(colored);
    }
    parts.join("/")
}
