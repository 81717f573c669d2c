//! Headless mode - NDJSON in, NDJSON out
//!
//! The driver reads one JSON object per line on stdin. A line is either a
//! serialized [`Event`] (`{"event":"view_changed","payload":{...}}`) or a
//! driver command (`{"command":"submit_query","text":"rome"}`). Everything
//! the core produces for the outside world is written to stdout.
//!
//! # Example Output
//!
//! ```json
//! {"event":"fragment_written","fragment":"#at=41.90000000,12.50000000,6","timestamp":1704700001000}
//! {"event":"panel_mode_changed","mode":"sub_search","list_all_visible":true,"order":"selection_first","timestamp":1704700002000}
//! {"event":"result_totals","total":1234,"timestamp":1704700002000}
//! ```

pub mod runner;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use mapsync_core::prelude::*;
use mapsync_core::{ContainerOrder, Event, PanelMode};

/// Events emitted in headless mode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// The persisted fragment was replaced
    FragmentWritten { fragment: String, timestamp: i64 },

    /// Search panel switched mode
    PanelModeChanged {
        mode: PanelMode,
        list_all_visible: bool,
        order: ContainerOrder,
        timestamp: i64,
    },

    /// Total shown on the "list all" button
    ResultTotals { total: u64, timestamp: i64 },

    /// Error occurred
    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        // One locked write per line keeps timer-task output from interleaving
        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn fragment_written(fragment: &str) -> Self {
        Self::FragmentWritten {
            fragment: fragment.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn result_totals(total: u64) -> Self {
        Self::ResultTotals {
            total,
            timestamp: Self::now(),
        }
    }

    pub fn error(message: String, fatal: bool) -> Self {
        Self::Error {
            message,
            fatal,
            timestamp: Self::now(),
        }
    }

    /// Map an outbound core event to its output line, if it has one
    pub fn from_outbound(event: &Event) -> Option<Self> {
        match event {
            Event::PanelModeChanged(layout) => Some(Self::PanelModeChanged {
                mode: layout.mode,
                list_all_visible: layout.list_all_visible,
                order: layout.order,
                timestamp: Self::now(),
            }),
            Event::ResultTotalsDisplayed(total) => Some(Self::result_totals(*total)),
            _ => None,
        }
    }
}

/// Operations of the driver itself, as opposed to broker events
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Submit the search box with `text`
    SubmitQuery { text: String },
    /// Empty the search box and resubmit
    ClearQuery,
    /// Pick a base layer in the map settings editor
    ChooseLayer { name: String },
    /// Dismiss the map settings editor
    CloseMapSettings,
    /// Write any pending fragment now
    Flush,
    /// Flush and exit
    Quit,
}

/// One parsed stdin line
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Event(Event),
    Command(Command),
}

/// Parse a stdin line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<Result<Input>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = serde_json::from_str::<serde_json::Value>(trimmed).and_then(|value| {
        if value.get("command").is_some() {
            serde_json::from_value(value).map(Input::Command)
        } else {
            serde_json::from_value(value).map(Input::Event)
        }
    });

    Some(parsed.map_err(Error::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapsync_core::{PanelLayout, SelectedItem};

    #[test]
    fn test_fragment_written_serialization() {
        let event = HeadlessEvent::fragment_written("#layer=osm");
        let json = serde_json::to_string(&event).expect("serialization failed");

        let value: serde_json::Value = serde_json::from_str(&json).expect("invalid JSON");

        assert_eq!(value["event"], "fragment_written");
        assert_eq!(value["fragment"], "#layer=osm");
        assert!(value["timestamp"].is_number());
    }

    #[test]
    fn test_panel_mode_changed_serialization() {
        let event = HeadlessEvent::from_outbound(&Event::PanelModeChanged(
            PanelLayout::for_mode(PanelMode::SubSearch),
        ))
        .unwrap();
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["event"], "panel_mode_changed");
        assert_eq!(value["mode"], "sub_search");
        assert_eq!(value["list_all_visible"], true);
        assert_eq!(value["order"], "selection_first");
        assert!(value["timestamp"].is_number());
    }

    #[test]
    fn test_result_totals_serialization() {
        let event = HeadlessEvent::from_outbound(&Event::ResultTotalsDisplayed(1234)).unwrap();
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["event"], "result_totals");
        assert_eq!(value["total"], 1234);
    }

    #[test]
    fn test_error_serialization() {
        let event = HeadlessEvent::error("bad line".to_string(), false);
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["event"], "error");
        assert_eq!(value["message"], "bad line");
        assert_eq!(value["fatal"], false);
    }

    #[test]
    fn test_inbound_events_have_no_output() {
        assert!(HeadlessEvent::from_outbound(&Event::ShowFilters).is_none());
    }

    #[test]
    fn test_parse_line_event() {
        let line = r#"{"event":"selection","payload":[{"identifier":"place/42"}]}"#;
        let input = parse_line(line).unwrap().unwrap();
        assert_eq!(
            input,
            Input::Event(Event::Selection(Some(vec![SelectedItem::new("place/42")])))
        );
    }

    #[test]
    fn test_parse_line_command() {
        let input = parse_line(r#"{"command":"submit_query","text":"rome"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            input,
            Input::Command(Command::SubmitQuery {
                text: "rome".to_string()
            })
        );

        let input = parse_line(r#"{"command":"quit"}"#).unwrap().unwrap();
        assert_eq!(input, Input::Command(Command::Quit));
    }

    #[test]
    fn test_parse_line_blank_is_skipped() {
        assert!(parse_line("").is_none());
        assert!(parse_line("   \t").is_none());
    }

    #[test]
    fn test_parse_line_malformed() {
        assert!(matches!(parse_line("{not json"), Some(Err(Error::Json(_)))));
        assert!(matches!(
            parse_line(r#"{"event":"no_such_event"}"#),
            Some(Err(Error::Json(_)))
        ));
        assert!(matches!(
            parse_line(r#"{"command":"dance"}"#),
            Some(Err(Error::Json(_)))
        ));
    }
}
