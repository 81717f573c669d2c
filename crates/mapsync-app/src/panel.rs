//! Search panel state machine
//!
//! The panel is either in `Search` mode (main search, filters on top) or in
//! `SubSearch` mode (results narrowed around a selection, "list all" button
//! showing the cached total). [`PanelState::update`] is the pure transition
//! function; [`SearchPanel`] binds it to a broker and fires the derived events
//! it returns.

use std::sync::{Arc, Mutex, Weak};

use mapsync_core::prelude::*;
use mapsync_core::{Event, EventKind, PanelLayout, PanelMode, SearchDiff};

use crate::broker::EventBroker;

/// Event kinds the panel reacts to
pub const SUBSCRIBED_KINDS: [EventKind; 7] = [
    EventKind::Load,
    EventKind::SubSearch,
    EventKind::Selection,
    EventKind::QueryPhraseChanged,
    EventKind::ApiInitialResponse,
    EventKind::ApiSearchResponse,
    EventKind::ApiViewUpdate,
];

/// Panel state. Starts in `Search` with a zero total.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelState {
    pub mode: PanelMode,
    /// Total from the latest main-search API response
    pub total: u64,
    /// Text shown in the search box
    pub query: String,
}

impl PanelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(&self) -> PanelLayout {
        PanelLayout::for_mode(self.mode)
    }

    pub fn is_sub_search(&self) -> bool {
        self.mode == PanelMode::SubSearch
    }

    /// Apply `event` and return the derived events to publish, in order
    pub fn update(&mut self, event: &Event) -> Vec<Event> {
        match event {
            Event::SubSearch(_) => self.enter(PanelMode::SubSearch),

            // Filter and timespan changes refine a sub-search, only a selection leaves it
            Event::Selection(_) => self.enter(PanelMode::Search),

            Event::ApiInitialResponse(response)
            | Event::ApiSearchResponse(response)
            | Event::ApiViewUpdate(response) => {
                self.total = response.total;
                if self.is_sub_search() {
                    vec![Event::ResultTotalsDisplayed(self.total)]
                } else {
                    Vec::new()
                }
            }

            Event::Load(initial) => {
                self.query = initial.query().unwrap_or_default().to_string();
                Vec::new()
            }

            Event::QueryPhraseChanged(phrase) => {
                self.query = phrase.clone().unwrap_or_default();
                Vec::new()
            }

            _ => Vec::new(),
        }
    }

    fn enter(&mut self, target: PanelMode) -> Vec<Event> {
        if self.mode == target {
            return Vec::new();
        }

        debug!("Search panel: {} -> {}", self.mode, target);
        self.mode = target;

        let mut derived = Vec::with_capacity(2);
        if target == PanelMode::SubSearch {
            derived.push(Event::ResultTotalsDisplayed(self.total));
        }
        derived.push(Event::PanelModeChanged(self.layout()));
        derived
    }
}

/// [`PanelState`] attached to a broker
#[derive(Debug)]
pub struct SearchPanel {
    state: Mutex<PanelState>,
    broker: EventBroker,
}

impl SearchPanel {
    pub fn attach(broker: &EventBroker) -> Arc<Self> {
        let panel = Arc::new(Self {
            state: Mutex::new(PanelState::new()),
            broker: broker.clone(),
        });

        for kind in SUBSCRIBED_KINDS {
            let weak: Weak<Self> = Arc::downgrade(&panel);
            broker.add_named_handler(kind, "search_panel", move |event| {
                if let Some(panel) = weak.upgrade() {
                    panel.handle(event);
                }
                Ok(())
            });
        }

        panel
    }

    pub fn state(&self) -> PanelState {
        self.lock().clone()
    }

    pub fn mode(&self) -> PanelMode {
        self.lock().mode
    }

    pub fn total(&self) -> u64 {
        self.lock().total
    }

    /// Submit the search box. Surrounding whitespace is ignored and empty
    /// text clears the query.
    pub fn submit_query(&self, raw: &str) {
        let phrase = raw.trim();
        if phrase.is_empty() {
            self.broker.fire_event(Event::QueryPhraseChanged(None));
            self.broker
                .fire_event(Event::SearchChanged(SearchDiff::clear_query()));
        } else {
            self.broker
                .fire_event(Event::QueryPhraseChanged(Some(phrase.to_string())));
            self.broker
                .fire_event(Event::SearchChanged(SearchDiff::query(phrase)));
        }
    }

    /// Empty the search box and resubmit
    pub fn clear_query(&self) {
        self.submit_query("");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn handle(&self, event: &Event) {
        let derived = self.lock().update(event);

        // Lock is released; handlers of derived events may call back in
        for event in derived {
            self.broker.fire_event(event);
        }
    }
}
