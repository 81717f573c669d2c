//! mapsync-app - Event broker and state synchronization for mapsync
//!
//! This crate wires UI controls together through an explicit [`EventBroker`],
//! keeps the persisted URL fragment in step with application state, and runs
//! the search panel state machine. The [`Engine`] bundles all of it behind one
//! entry point for frontends.

pub mod broker;
pub mod codec;
pub mod config;
pub mod engine;
pub mod fragment;
pub mod panel;
pub mod settings_editor;
pub mod synchronizer;
pub mod writer;

// Re-export primary types
pub use broker::{DispatchReport, EventBroker, HandlerId};
pub use config::{DebounceEdge, Settings};
pub use engine::{Engine, OUTBOUND_KINDS};
pub use fragment::{FileFragment, FragmentSink, MemoryFragment};
pub use panel::{PanelState, SearchPanel};
pub use settings_editor::{BaseLayer, MapSettingsEditor, BASE_LAYERS};
pub use synchronizer::UrlSynchronizer;
pub use writer::{FragmentWriter, WriterState};
