//! # mapsync-core - Core Domain Types
//!
//! Foundation crate for mapsync. Provides the typed events exchanged over the
//! broker, their payloads, the ordered segment map behind the URL fragment,
//! error handling and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Events (`events`)
//! - [`Event`] - Every message dispatched through the broker, with typed payload
//! - [`EventKind`] - Payload-free discriminant used as the subscription key
//!
//! ### Payloads (`types`)
//! - [`ViewBounds`], [`BoundingBox`] - Map geometry
//! - [`SearchDiff`], [`Change`] - Partial updates of the main search
//! - [`SelectedItem`], [`ApiResponse`] - Selection and search API shapes
//! - [`InitialSettings`], [`TimeBound`] - State restored from a fragment
//! - [`PanelMode`], [`PanelLayout`] - Search panel modes
//!
//! ### Segments (`segments`)
//! - [`SegmentMap`] - Insertion-ordered key/value state behind the fragment
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use mapsync_core::prelude::*;
//! ```

pub mod error;
pub mod events;
pub mod logging;
pub mod segments;
pub mod types;

/// Prelude for common imports used throughout all mapsync crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use error::{Error, Result, ResultExt};
pub use events::{Event, EventKind};
pub use segments::{keys, SegmentMap};
pub use types::{
    ApiResponse, BoundingBox, Change, ContainerOrder, InitialSettings, PanelLayout, PanelMode,
    SearchDiff, SelectedItem, TimeBound, Truthy, ViewBounds,
};
