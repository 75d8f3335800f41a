//! Timeline markers.

use serde::{Deserialize, Serialize};

use crate::ids::MarkerId;

/// A named point on the timeline used for navigation and snapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    /// Seconds from timeline start.
    pub time: f64,
    pub label: String,
    /// Display color as `#rrggbb`.
    pub color: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Marker {
    pub const DEFAULT_COLOR: &'static str = "#eab308";

    pub fn new(time: f64, label: impl Into<String>) -> Self {
        Self {
            id: MarkerId::generate(),
            time: time.max(0.0),
            label: label.into(),
            color: Self::DEFAULT_COLOR.to_string(),
            notes: None,
        }
    }
}
