//! Engine - wiring shared by every mapsync frontend
//!
//! The Engine owns one broker and attaches the synchronizer, the search panel
//! and the map settings editor to it. Frontends feed it events and subscribe
//! to the derived events they render.

use std::sync::Arc;

use tokio::sync::mpsc;

use mapsync_core::prelude::*;
use mapsync_core::{Event, EventKind, InitialSettings};

use crate::broker::{DispatchReport, EventBroker};
use crate::config::Settings;
use crate::fragment::FragmentSink;
use crate::panel::SearchPanel;
use crate::settings_editor::MapSettingsEditor;
use crate::synchronizer::UrlSynchronizer;
use crate::writer::FragmentWriter;

/// Events published by the core for rendering frontends
pub const OUTBOUND_KINDS: [EventKind; 2] =
    [EventKind::PanelModeChanged, EventKind::ResultTotalsDisplayed];

/// Orchestration engine for mapsync.
///
/// Owns:
/// - the event broker
/// - the debounced fragment writer over the supplied sink
/// - the URL synchronizer, search panel and map settings editor
#[derive(Debug)]
pub struct Engine {
    broker: EventBroker,
    writer: FragmentWriter,
    synchronizer: Arc<UrlSynchronizer>,
    panel: Arc<SearchPanel>,
    editor: Arc<MapSettingsEditor>,
    settings: Settings,
}

impl Engine {
    /// Build and wire all components. `sink` receives every fragment write.
    pub fn new(settings: Settings, sink: impl FragmentSink + 'static) -> Self {
        let broker = EventBroker::new();
        let writer = FragmentWriter::new(sink, settings.debounce(), settings.fragment.edge);

        let synchronizer =
            UrlSynchronizer::attach(&broker, writer.clone(), settings.map.default_layer.clone());
        let panel = SearchPanel::attach(&broker);
        let editor = MapSettingsEditor::attach(&broker);

        info!(
            "Engine ready (debounce {}ms, {} edge, default layer '{}')",
            settings.fragment.debounce_ms, settings.fragment.edge, settings.map.default_layer
        );

        Self {
            broker,
            writer,
            synchronizer,
            panel,
            editor,
            settings,
        }
    }

    /// Restore state from the startup fragment and announce `Load`.
    ///
    /// A missing or malformed fragment still fires `Load` with empty settings.
    pub fn load(&self, fragment: Option<&str>) -> InitialSettings {
        let initial = fragment
            .and_then(|f| self.synchronizer.parse_initial(f))
            .unwrap_or_else(|| {
                if let Some(f) = fragment {
                    debug!("Initial fragment {:?} ignored", f);
                }
                InitialSettings::default()
            });

        self.broker.fire_event(Event::Load(initial.clone()));
        initial
    }

    /// Publish `event` on the broker
    pub fn dispatch(&self, event: Event) -> DispatchReport {
        self.broker.fire_event(event)
    }

    /// Forward every event of the given kinds into a channel.
    ///
    /// Once the receiver is dropped, deliveries fail and are logged by the
    /// broker.
    pub fn subscribe(&self, kinds: &[EventKind]) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        for kind in kinds {
            let tx = tx.clone();
            self.broker
                .add_named_handler(*kind, "engine_subscriber", move |event| {
                    tx.send(event.clone())
                        .map_err(|e| Error::channel_send(e.to_string()))
                });
        }
        rx
    }

    /// Write any fragment still waiting in the debounce window
    pub fn shutdown(&self) -> Result<()> {
        info!("Engine shutting down");
        self.writer.flush()
    }

    pub fn broker(&self) -> &EventBroker {
        &self.broker
    }

    pub fn writer(&self) -> &FragmentWriter {
        &self.writer
    }

    pub fn synchronizer(&self) -> &Arc<UrlSynchronizer> {
        &self.synchronizer
    }

    pub fn panel(&self) -> &Arc<SearchPanel> {
        &self.panel
    }

    pub fn editor(&self) -> &Arc<MapSettingsEditor> {
        &self.editor
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
