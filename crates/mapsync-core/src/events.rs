//! Event definitions
//!
//! Every message that crosses the event broker is an [`Event`]. Subscribers
//! register per [`EventKind`], the payload-free discriminant.

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{
    ApiResponse, InitialSettings, PanelLayout, SearchDiff, SelectedItem, ViewBounds,
};

/// Fully typed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum Event {
    // ─────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────
    /// Page loaded; carries the state restored from the initial fragment
    Load(InitialSettings),

    // ─────────────────────────────────────────────────────────
    // API
    // ─────────────────────────────────────────────────────────
    ApiInitialResponse(ApiResponse),
    ApiSearchResponse(ApiResponse),
    ApiSubSearchResponse(ApiResponse),
    /// Data for refreshing the map view
    ApiViewUpdate(ApiResponse),

    // ─────────────────────────────────────────────────────────
    // UI
    // ─────────────────────────────────────────────────────────
    /// The map viewport moved
    ViewChanged(ViewBounds),
    /// Any main search parameter changed
    SearchChanged(SearchDiff),
    /// A search narrower than the current main search was issued
    SubSearch(SearchDiff),
    /// Query phrase submitted from the search box; `None` when cleared
    QueryPhraseChanged(Option<String>),
    ShowAllResults,
    HideAllResults,
    ToggleAllResults,
    MouseOverResult(Option<SelectedItem>),
    SelectMarker(Vec<SelectedItem>),
    SelectResult(SelectedItem),
    /// Generic selection from a marker or a result; `None` clears it.
    /// Accepts `false` or `null` on the wire as a clear.
    Selection(#[serde(deserialize_with = "selection_payload")] Option<Vec<SelectedItem>>),
    /// Base layer switched, by name
    ChangeLayer(String),
    EditMapSettings,
    ShowFilters,
    HideFilters,
    StartExploration,
    StopExploration,

    // ─────────────────────────────────────────────────────────
    // Derived (emitted by the search panel)
    // ─────────────────────────────────────────────────────────
    PanelModeChanged(PanelLayout),
    /// Total to show on the "list all" button
    ResultTotalsDisplayed(u64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelection {
    Items(Vec<SelectedItem>),
    Flag(bool),
    Null,
}

fn selection_payload<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<SelectedItem>>, D::Error> {
    match RawSelection::deserialize(deserializer)? {
        RawSelection::Items(items) => Ok(Some(items)),
        RawSelection::Flag(false) | RawSelection::Null => Ok(None),
        RawSelection::Flag(true) => Err(serde::de::Error::custom(
            "expected a selection list, false or null, found true",
        )),
    }
}

/// Subscription key for [`Event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Load,
    ApiInitialResponse,
    ApiSearchResponse,
    ApiSubSearchResponse,
    ApiViewUpdate,
    ViewChanged,
    SearchChanged,
    SubSearch,
    QueryPhraseChanged,
    ShowAllResults,
    HideAllResults,
    ToggleAllResults,
    MouseOverResult,
    SelectMarker,
    SelectResult,
    Selection,
    ChangeLayer,
    EditMapSettings,
    ShowFilters,
    HideFilters,
    StartExploration,
    StopExploration,
    PanelModeChanged,
    ResultTotalsDisplayed,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Load(_) => EventKind::Load,
            Self::ApiInitialResponse(_) => EventKind::ApiInitialResponse,
            Self::ApiSearchResponse(_) => EventKind::ApiSearchResponse,
            Self::ApiSubSearchResponse(_) => EventKind::ApiSubSearchResponse,
            Self::ApiViewUpdate(_) => EventKind::ApiViewUpdate,
            Self::ViewChanged(_) => EventKind::ViewChanged,
            Self::SearchChanged(_) => EventKind::SearchChanged,
            Self::SubSearch(_) => EventKind::SubSearch,
            Self::QueryPhraseChanged(_) => EventKind::QueryPhraseChanged,
            Self::ShowAllResults => EventKind::ShowAllResults,
            Self::HideAllResults => EventKind::HideAllResults,
            Self::ToggleAllResults => EventKind::ToggleAllResults,
            Self::MouseOverResult(_) => EventKind::MouseOverResult,
            Self::SelectMarker(_) => EventKind::SelectMarker,
            Self::SelectResult(_) => EventKind::SelectResult,
            Self::Selection(_) => EventKind::Selection,
            Self::ChangeLayer(_) => EventKind::ChangeLayer,
            Self::EditMapSettings => EventKind::EditMapSettings,
            Self::ShowFilters => EventKind::ShowFilters,
            Self::HideFilters => EventKind::HideFilters,
            Self::StartExploration => EventKind::StartExploration,
            Self::StopExploration => EventKind::StopExploration,
            Self::PanelModeChanged(_) => EventKind::PanelModeChanged,
            Self::ResultTotalsDisplayed(_) => EventKind::ResultTotalsDisplayed,
        }
    }
}

impl EventKind {
    /// Short label for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::ApiInitialResponse => "api_initial_response",
            Self::ApiSearchResponse => "api_search_response",
            Self::ApiSubSearchResponse => "api_sub_search_response",
            Self::ApiViewUpdate => "api_view_update",
            Self::ViewChanged => "view_changed",
            Self::SearchChanged => "search_changed",
            Self::SubSearch => "sub_search",
            Self::QueryPhraseChanged => "query_phrase_changed",
            Self::ShowAllResults => "show_all_results",
            Self::HideAllResults => "hide_all_results",
            Self::ToggleAllResults => "toggle_all_results",
            Self::MouseOverResult => "mouse_over_result",
            Self::SelectMarker => "select_marker",
            Self::SelectResult => "select_result",
            Self::Selection => "selection",
            Self::ChangeLayer => "change_layer",
            Self::EditMapSettings => "edit_map_settings",
            Self::ShowFilters => "show_filters",
            Self::HideFilters => "hide_filters",
            Self::StartExploration => "start_exploration",
            Self::StopExploration => "stop_exploration",
            Self::PanelModeChanged => "panel_mode_changed",
            Self::ResultTotalsDisplayed => "result_totals_displayed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
