//! Headless mode runner - stdin event loop
//!
//! Reads NDJSON lines on a blocking thread, dispatches them through the
//! [`Engine`] and writes the resulting output events to stdout.

use std::path::PathBuf;

use tokio::sync::mpsc;

use mapsync_app::{Engine, FileFragment, FragmentSink, Settings, OUTBOUND_KINDS};
use mapsync_core::prelude::*;
use mapsync_core::Event;

use super::{parse_line, Command, HeadlessEvent, Input};

/// Everything the headless runner needs to start
#[derive(Debug, Clone, Default)]
pub struct HeadlessOptions {
    /// Fragment restored at startup
    pub fragment: Option<String>,
    /// Effective settings, CLI overrides already applied
    pub settings: Settings,
}

/// Fragment sink for headless mode.
///
/// Persists to the configured file (if any) and reports every successful
/// write on stdout.
#[derive(Debug, Clone)]
pub struct HeadlessSink {
    file: Option<FileFragment>,
}

impl HeadlessSink {
    pub fn new(file: Option<PathBuf>) -> Self {
        Self {
            file: file.map(FileFragment::new),
        }
    }
}

impl FragmentSink for HeadlessSink {
    fn write_fragment(&self, fragment: &str) -> Result<()> {
        if let Some(file) = &self.file {
            file.write_fragment(fragment)?;
        }
        HeadlessEvent::fragment_written(fragment).emit();
        Ok(())
    }
}

/// Whether the loop keeps reading after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Quit,
}

/// Run in headless mode until stdin closes or a `quit` command arrives
pub async fn run_headless(options: HeadlessOptions) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("mapsync starting in HEADLESS mode");
    if let Some(path) = &options.settings.fragment.file {
        info!("Fragment file: {}", path.display());
    }
    info!("═══════════════════════════════════════════════════════");

    let sink = HeadlessSink::new(options.settings.fragment.file.clone());
    let engine = Engine::new(options.settings, sink);
    let mut outbound = engine.subscribe(&OUTBOUND_KINDS);

    engine.load(options.fragment.as_deref());

    let (line_tx, mut line_rx) = mpsc::channel::<String>(256);
    std::thread::spawn(move || {
        spawn_stdin_reader_blocking(line_tx);
    });

    while let Some(line) = line_rx.recv().await {
        let outcome = handle_line(&engine, &line);
        forward_outbound(&mut outbound);
        if outcome == LineOutcome::Quit {
            info!("Quit requested");
            break;
        }
    }

    if let Err(e) = engine.shutdown() {
        error!("Final fragment write failed: {}", e);
        HeadlessEvent::error(format!("Final fragment write failed: {}", e), e.is_fatal()).emit();
    }

    info!("mapsync headless mode exiting");
    Ok(())
}

/// Parse and act on one stdin line. Malformed lines are reported, not fatal.
pub fn handle_line(engine: &Engine, line: &str) -> LineOutcome {
    match parse_line(line) {
        None => LineOutcome::Continue,
        Some(Ok(Input::Event(event))) => {
            dispatch_event(engine, event);
            LineOutcome::Continue
        }
        Some(Ok(Input::Command(command))) => run_command(engine, command),
        Some(Err(e)) => {
            warn!("Ignoring malformed input line {:?}: {}", line.trim(), e);
            HeadlessEvent::error(format!("Malformed input: {}", e), e.is_fatal()).emit();
            LineOutcome::Continue
        }
    }
}

fn dispatch_event(engine: &Engine, event: Event) {
    let kind = event.kind();
    let report = engine.dispatch(event);
    if report.failed > 0 {
        warn!("{} handler(s) failed for {}", report.failed, kind);
    }
}

fn run_command(engine: &Engine, command: Command) -> LineOutcome {
    match command {
        Command::SubmitQuery { text } => engine.panel().submit_query(&text),
        Command::ClearQuery => engine.panel().clear_query(),
        Command::ChooseLayer { name } => engine.editor().choose(&name),
        Command::CloseMapSettings => engine.editor().close(),
        Command::Flush => {
            if let Err(e) = engine.writer().flush() {
                HeadlessEvent::error(format!("Flush failed: {}", e), e.is_fatal()).emit();
            }
        }
        Command::Quit => return LineOutcome::Quit,
    }
    LineOutcome::Continue
}

/// Emit every outbound event queued so far
fn forward_outbound(outbound: &mut mpsc::UnboundedReceiver<Event>) {
    while let Ok(event) = outbound.try_recv() {
        if let Some(line) = HeadlessEvent::from_outbound(&event) {
            line.emit();
        }
    }
}

/// Forward raw stdin lines to the event loop (blocking version)
fn spawn_stdin_reader_blocking(line_tx: mpsc::Sender<String>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        match line {
            Ok(line) => {
                if line_tx.blocking_send(line).is_err() {
                    // Event loop is gone
                    break;
                }
            }
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }

    info!("Stdin reader exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapsync_app::MemoryFragment;
    use mapsync_core::{EventKind, PanelMode};
    use tempfile::TempDir;

    fn engine() -> (Engine, MemoryFragment) {
        let sink = MemoryFragment::new();
        (Engine::new(Settings::default(), sink.clone()), sink)
    }

    #[tokio::test]
    async fn test_handle_line_dispatches_event() {
        let (engine, sink) = engine();

        let outcome = handle_line(&engine, r#"{"event":"show_filters"}"#);

        assert_eq!(outcome, LineOutcome::Continue);
        assert_eq!(sink.current().as_deref(), Some("#f=open"));
    }

    #[tokio::test]
    async fn test_handle_line_runs_commands() {
        let (engine, sink) = engine();
        let mut rx = engine.subscribe(&[EventKind::QueryPhraseChanged]);

        handle_line(&engine, r#"{"command":"submit_query","text":" rome "}"#);
        assert_eq!(
            rx.try_recv().unwrap(),
            Event::QueryPhraseChanged(Some("rome".to_string()))
        );

        handle_line(&engine, r#"{"command":"choose_layer","name":"dare"}"#);
        handle_line(&engine, r#"{"command":"flush"}"#);
        assert_eq!(sink.current().as_deref(), Some("#query=rome&layer=dare"));

        assert_eq!(
            handle_line(&engine, r#"{"command":"quit"}"#),
            LineOutcome::Quit
        );
    }

    #[tokio::test]
    async fn test_malformed_line_keeps_running() {
        let (engine, sink) = engine();

        assert_eq!(handle_line(&engine, "garbage"), LineOutcome::Continue);
        assert_eq!(handle_line(&engine, ""), LineOutcome::Continue);
        assert_eq!(sink.write_count(), 0);
    }

    #[tokio::test]
    async fn test_selection_false_line_clears_places() {
        let (engine, sink) = engine();

        handle_line(
            &engine,
            r#"{"event":"selection","payload":[{"identifier":"place/42"}]}"#,
        );
        assert_eq!(sink.current().as_deref(), Some("#places=place%2F42"));

        handle_line(&engine, r#"{"event":"selection","payload":false}"#);
        assert_eq!(sink.current().as_deref(), Some("#"));
        assert_eq!(sink.write_count(), 2);
    }

    #[tokio::test]
    async fn test_sub_search_line_changes_panel_mode() {
        let (engine, _sink) = engine();

        handle_line(&engine, r#"{"event":"sub_search","payload":{}}"#);
        assert_eq!(engine.panel().mode(), PanelMode::SubSearch);
    }

    #[test]
    fn test_headless_sink_persists_to_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fragment.txt");
        let sink = HeadlessSink::new(Some(path.clone()));

        sink.write_fragment("#ex=true").unwrap();

        assert_eq!(
            FileFragment::new(path).read().unwrap().as_deref(),
            Some("#ex=true")
        );
    }
}
