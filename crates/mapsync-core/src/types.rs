//! Payload types carried by events

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::segments::SegmentMap;

// ─────────────────────────────────────────────────────────
// Map Geometry
// ─────────────────────────────────────────────────────────

/// Visible map viewport, produced by the map widget
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub zoom: u32,
}

impl ViewBounds {
    /// Midpoint of the viewport as `(lat, lon)`
    pub fn center(&self) -> (f64, f64) {
        (
            (self.south + self.north) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }
}

/// Bounding box restored from the `bbox` segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

// ─────────────────────────────────────────────────────────
// Search Diffs
// ─────────────────────────────────────────────────────────

/// Values whose falsy form means "clear this parameter"
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for i64 {
    fn is_truthy(&self) -> bool {
        *self != 0
    }
}

/// A single field of a [`SearchDiff`] that is present in the diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<T> {
    Set(T),
    Clear,
}

impl<T> Change<T> {
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Change::Set(v) => Some(v),
            Change::Clear => None,
        }
    }
}

impl<T: Serialize> Serialize for Change<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Change::Set(v) => v.serialize(serializer),
            Change::Clear => serializer.serialize_bool(false),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChange<T> {
    Value(T),
    Flag(bool),
    Null,
}

impl<'de, T: Deserialize<'de> + Truthy> Deserialize<'de> for Change<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawChange::<T>::deserialize(deserializer)? {
            RawChange::Value(v) if v.is_truthy() => Ok(Change::Set(v)),
            RawChange::Value(_) | RawChange::Flag(false) | RawChange::Null => Ok(Change::Clear),
            RawChange::Flag(true) => Err(serde::de::Error::custom(
                "expected a value or false, found true",
            )),
        }
    }
}

/// Keeps an explicit `null` as `Some(Change::Clear)` instead of collapsing it to `None`
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Change to the main search parameters.
///
/// `None` means the field is not part of this change at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDiff {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub query: Option<Change<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub from: Option<Change<i64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub to: Option<Change<i64>>,
}

impl SearchDiff {
    pub fn query(phrase: impl Into<String>) -> Self {
        let phrase = phrase.into();
        Self {
            query: Some(if phrase.is_empty() {
                Change::Clear
            } else {
                Change::Set(phrase)
            }),
            ..Default::default()
        }
    }

    pub fn clear_query() -> Self {
        Self {
            query: Some(Change::Clear),
            ..Default::default()
        }
    }

    pub fn timespan(from: Option<i64>, to: Option<i64>) -> Self {
        Self {
            from: Some(from.map_or(Change::Clear, Change::Set)),
            to: Some(to.map_or(Change::Clear, Change::Set)),
            ..Default::default()
        }
    }
}

// ─────────────────────────────────────────────────────────
// Selection & API
// ─────────────────────────────────────────────────────────

/// A place or result picked on the map or in the result list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedItem {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl SelectedItem {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: None,
        }
    }
}

/// Search API response. Only `total` is interpreted here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub total: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ApiResponse {
    pub fn with_total(total: u64) -> Self {
        Self {
            total,
            extra: serde_json::Map::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────
// Parsed Fragment State
// ─────────────────────────────────────────────────────────

/// Integer coercion of a `from` / `to` segment.
///
/// Input without leading digits is carried through as `NotANumber`
/// rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBound {
    Year(i64),
    NotANumber(String),
}

impl TimeBound {
    pub fn year(&self) -> Option<i64> {
        match self {
            TimeBound::Year(y) => Some(*y),
            TimeBound::NotANumber(_) => None,
        }
    }
}

/// State record restored from a fragment at session start
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialSettings {
    pub segments: SegmentMap,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    #[serde(default)]
    pub from: Option<TimeBound>,
    #[serde(default)]
    pub to: Option<TimeBound>,
}

impl InitialSettings {
    pub fn query(&self) -> Option<&str> {
        self.segments
            .get(crate::segments::keys::QUERY)
            .filter(|q| !q.is_empty())
    }
}

// ─────────────────────────────────────────────────────────
// Search Panel
// ─────────────────────────────────────────────────────────

/// Interaction mode of the search panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelMode {
    #[default]
    Search,
    SubSearch,
}

impl std::fmt::Display for PanelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PanelMode::Search => write!(f, "search"),
            PanelMode::SubSearch => write!(f, "sub-search"),
        }
    }
}

/// Order of the filter and selection containers below the search box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerOrder {
    FiltersFirst,
    SelectionFirst,
}

/// What rendering widgets need to lay out the panel for a mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelLayout {
    pub mode: PanelMode,
    pub list_all_visible: bool,
    pub order: ContainerOrder,
}

impl PanelLayout {
    pub fn for_mode(mode: PanelMode) -> Self {
        match mode {
            PanelMode::Search => Self {
                mode,
                list_all_visible: false,
                order: ContainerOrder::FiltersFirst,
            },
            PanelMode::SubSearch => Self {
                mode,
                list_all_visible: true,
                order: ContainerOrder::SelectionFirst,
            },
        }
    }
}
