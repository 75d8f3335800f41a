//! Strongly-typed identifiers.
//!
//! Identifiers are opaque strings so that hand-written project files can use
//! readable ids (`track-1`) while generated ones are UUID v4.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Fresh random identifier.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of an imported asset.
    AssetId
);
string_id!(
    /// Identifier of a track lane.
    TrackId
);
string_id!(
    /// Identifier of a clip.
    ClipId
);
string_id!(
    /// Identifier shared by clips that move and select together.
    GroupId
);
string_id!(
    /// Identifier of a timeline marker.
    MarkerId
);
string_id!(
    /// Identifier of a single keyframe.
    KeyframeId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ClipId::generate();
        let b = ClipId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = TrackId::new("track-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"track-1\"");
        let parsed: TrackId = serde_json::from_str("\"track-2\"").unwrap();
        assert_eq!(parsed.to_string(), "track-2");
    }
}
