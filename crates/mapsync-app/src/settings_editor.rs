//! Map settings editor
//!
//! Modal chooser for the base layer. It opens on `EditMapSettings` and
//! publishes `ChangeLayer` when a layer is picked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use mapsync_core::prelude::*;
use mapsync_core::{Event, EventKind};

use crate::broker::EventBroker;

/// A selectable base map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseLayer {
    /// Value carried by `ChangeLayer` and stored in the `layer` segment
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

/// Known base layers, default first
pub const BASE_LAYERS: &[BaseLayer] = &[
    BaseLayer {
        name: "awmc",
        title: "Empty Basemap",
        description: "Geographically accurate basemap of the ancient world by the \
                      Ancient World Mapping Centre, University of North Carolina at Chapel Hill.",
    },
    BaseLayer {
        name: "dare",
        title: "Digital Atlas of the Roman Empire Basemap",
        description: "Roman Empire base map by the Digital Atlas of the Roman Empire, \
                      Lund University, Sweden.",
    },
    BaseLayer {
        name: "osm",
        title: "OpenStreetMap",
        description: "Modern places and roads via OpenStreetMap.",
    },
    BaseLayer {
        name: "satellite",
        title: "Satellite",
        description: "Aerial imagery via Mapbox.",
    },
];

/// Look up a layer in [`BASE_LAYERS`]
pub fn find_layer(name: &str) -> Option<&'static BaseLayer> {
    BASE_LAYERS.iter().find(|layer| layer.name == name)
}

#[derive(Debug)]
pub struct MapSettingsEditor {
    visible: AtomicBool,
    broker: EventBroker,
}

impl MapSettingsEditor {
    pub fn attach(broker: &EventBroker) -> Arc<Self> {
        let editor = Arc::new(Self {
            visible: AtomicBool::new(false),
            broker: broker.clone(),
        });

        let weak: Weak<Self> = Arc::downgrade(&editor);
        broker.add_named_handler(EventKind::EditMapSettings, "map_settings_editor", move |_| {
            if let Some(editor) = weak.upgrade() {
                editor.open();
            }
            Ok(())
        });

        editor
    }

    pub fn is_open(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    pub fn layers(&self) -> &'static [BaseLayer] {
        BASE_LAYERS
    }

    pub fn open(&self) {
        if !self.visible.swap(true, Ordering::SeqCst) {
            debug!("Map settings editor opened");
        }
    }

    pub fn close(&self) {
        if self.visible.swap(false, Ordering::SeqCst) {
            debug!("Map settings editor closed");
        }
    }

    /// Publish `ChangeLayer(name)` and close the editor.
    ///
    /// Names outside the catalog are forwarded as-is.
    pub fn choose(&self, name: &str) {
        if find_layer(name).is_none() {
            warn!("Layer {:?} is not in the base layer catalog", name);
        }
        self.broker.fire_event(Event::ChangeLayer(name.to_string()));
        self.close();
    }
}
