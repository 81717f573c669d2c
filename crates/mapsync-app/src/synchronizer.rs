//! URL state synchronizer
//!
//! Owns the [`SegmentMap`] behind the persisted fragment. It listens for
//! state events on the broker, applies each one to the keys it governs, and
//! hands the re-serialized fragment to the [`FragmentWriter`]. Continuous
//! changes (panning, search edits) are debounced; discrete toggles are
//! written immediately.

use std::sync::{Arc, Mutex};

use mapsync_core::prelude::*;
use mapsync_core::{keys, Change, Event, EventKind, InitialSettings, SearchDiff, SegmentMap};

use crate::broker::{EventBroker, HandlerId};
use crate::codec;
use crate::writer::FragmentWriter;

/// Event kinds the synchronizer reacts to
pub const SUBSCRIBED_KINDS: [EventKind; 9] = [
    EventKind::ViewChanged,
    EventKind::SearchChanged,
    EventKind::ChangeLayer,
    EventKind::Selection,
    EventKind::ShowFilters,
    EventKind::HideFilters,
    EventKind::StartExploration,
    EventKind::StopExploration,
    EventKind::Load,
];

const FILTERS_OPEN: &str = "open";
const EXPLORATION_ON: &str = "true";

/// How a segment change reaches the fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Debounced,
    Immediate,
}

/// Keeps the persisted fragment in step with application state
#[derive(Debug)]
pub struct UrlSynchronizer {
    segments: Mutex<SegmentMap>,
    writer: FragmentWriter,
    default_layer: String,
    handlers: Mutex<Vec<HandlerId>>,
}

impl UrlSynchronizer {
    /// Create a synchronizer and subscribe it to `broker`
    pub fn attach(
        broker: &EventBroker,
        writer: FragmentWriter,
        default_layer: impl Into<String>,
    ) -> Arc<Self> {
        let sync = Arc::new(Self {
            segments: Mutex::new(SegmentMap::new()),
            writer,
            default_layer: default_layer.into(),
            handlers: Mutex::new(Vec::new()),
        });

        let ids: Vec<HandlerId> = SUBSCRIBED_KINDS
            .iter()
            .map(|kind| {
                let sync = Arc::clone(&sync);
                broker.add_named_handler(*kind, "url_synchronizer", move |event| {
                    sync.handle(event)
                })
            })
            .collect();
        *sync.handlers.lock().unwrap_or_else(|e| e.into_inner()) = ids;

        sync
    }

    /// Unsubscribe from `broker`. Segments are kept.
    pub fn detach(&self, broker: &EventBroker) {
        let ids = std::mem::take(&mut *self.handlers.lock().unwrap_or_else(|e| e.into_inner()));
        for id in ids {
            broker.remove_handler(id);
        }
    }

    /// Seed the segment map from the fragment present at startup.
    ///
    /// Nothing is written; the fragment already reflects this state.
    pub fn parse_initial(&self, fragment: &str) -> Option<InitialSettings> {
        let settings = codec::parse(fragment)?;
        *self.lock() = settings.segments.clone();
        debug!(
            "Restored {} segment(s) from initial fragment",
            settings.segments.len()
        );
        Some(settings)
    }

    /// Snapshot of the current segments
    pub fn segments(&self) -> SegmentMap {
        self.lock().clone()
    }

    /// Current segments serialized as a fragment
    pub fn fragment(&self) -> String {
        codec::serialize(&self.lock())
    }

    pub fn default_layer(&self) -> &str {
        &self.default_layer
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SegmentMap> {
        self.segments.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn handle(&self, event: &Event) -> Result<()> {
        match event {
            Event::ViewChanged(bounds) => {
                let (lat, lon) = bounds.center();
                let at = format!("{},{},{}", fixed_8(lat), fixed_8(lon), bounds.zoom);
                self.update(WriteMode::Debounced, |segments| {
                    segments.set(keys::AT, at);
                });
            }

            Event::SearchChanged(diff) => {
                self.update(WriteMode::Debounced, |segments| apply_search_diff(segments, diff));
            }

            Event::ChangeLayer(layer) => {
                let is_default = *layer == self.default_layer;
                self.update(WriteMode::Immediate, |segments| {
                    if is_default {
                        segments.remove(keys::LAYER);
                    } else {
                        segments.set(keys::LAYER, layer.as_str());
                    }
                });
            }

            Event::Selection(items) => {
                let first = items.as_ref().and_then(|items| items.first());
                self.update(WriteMode::Immediate, |segments| match first {
                    Some(item) => {
                        segments.set(keys::PLACES, item.identifier.as_str());
                    }
                    None => {
                        segments.remove(keys::PLACES);
                    }
                });
            }

            Event::ShowFilters => self.update(WriteMode::Immediate, |segments| {
                segments.set(keys::FILTERS, FILTERS_OPEN);
            }),
            Event::HideFilters => self.update(WriteMode::Immediate, |segments| {
                segments.remove(keys::FILTERS);
            }),

            Event::StartExploration => self.update(WriteMode::Immediate, |segments| {
                segments.set(keys::EXPLORATION, EXPLORATION_ON);
            }),
            Event::StopExploration => self.update(WriteMode::Immediate, |segments| {
                segments.remove(keys::EXPLORATION);
            }),

            Event::Load(initial) => {
                // Settings restored elsewhere are adopted without a write
                let mut segments = self.lock();
                if segments.is_empty() && !initial.segments.is_empty() {
                    *segments = initial.segments.clone();
                }
            }

            other => trace!("Synchronizer ignoring {}", other.kind()),
        }
        Ok(())
    }

    /// Apply `mutate`, then hand the resulting fragment to the writer.
    ///
    /// The write is requested while the segment lock is still held, so the
    /// order of writes matches the order of mutations.
    fn update(&self, mode: WriteMode, mutate: impl FnOnce(&mut SegmentMap)) {
        let mut segments = self.lock();
        mutate(&mut segments);
        let fragment = codec::serialize(&segments);

        match mode {
            WriteMode::Debounced => self.writer.request_write(fragment),
            WriteMode::Immediate => self.writer.write_immediately(fragment),
        }
    }
}

/// Set or delete `query`, `from` and `to` for each field present in `diff`
fn apply_search_diff(segments: &mut SegmentMap, diff: &SearchDiff) {
    apply_change(segments, keys::QUERY, diff.query.as_ref(), |q| q.clone());
    apply_change(segments, keys::FROM, diff.from.as_ref(), i64::to_string);
    apply_change(segments, keys::TO, diff.to.as_ref(), i64::to_string);
}

fn apply_change<T>(
    segments: &mut SegmentMap,
    key: &str,
    change: Option<&Change<T>>,
    render: impl Fn(&T) -> String,
) {
    match change {
        None => {}
        Some(Change::Set(value)) => {
            segments.set(key, render(value));
        }
        Some(Change::Clear) => {
            segments.remove(key);
        }
    }
}

/// 5^9: a 9-decimal value is dyadic only when its digits are a multiple of this
const FIVE_POW_9: u64 = 1_953_125;

/// Format with 8 decimals, rounding exact ties away from zero.
///
/// `{:.8}` rounds ties to even, which would change shared links for
/// exactly representable midpoints such as `0.001953125`.
fn fixed_8(value: f64) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    let fixed = format!("{:.8}", value);

    let abs = value.abs();
    let Ok(digits) = format!("{:.9}", abs).replace('.', "").parse::<u64>() else {
        return fixed;
    };
    let is_tie = digits % 10 == 5
        && digits % FIVE_POW_9 == 0
        && (digits / FIVE_POW_9) as f64 / 512.0 == abs;
    if !is_tie {
        return fixed;
    }

    let rounded = digits / 10 + 1;
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{:08}", sign, rounded / 100_000_000, rounded % 100_000_000)
}
