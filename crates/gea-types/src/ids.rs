//! Strongly-typed identifiers for portal entities
//!
//! All IDs are UUID-based but wrapped in newtype structs for type safety.
//! `Display` renders `prefix:uuid`; parsing accepts either form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error returned when an identifier string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} id: {value}")]
pub struct IdParseError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .strip_prefix(concat!($prefix, ":"))
                    .unwrap_or(s);
                Uuid::parse_str(raw).map(Self).map_err(|_| IdParseError {
                    kind: $prefix,
                    value: s.to_string(),
                })
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a portal user
    UserId,
    "user"
);
uuid_id!(
    /// Unique identifier for a GLAB
    GlabId,
    "glab"
);
uuid_id!(
    /// Unique identifier for a client organization
    ClientId,
    "client"
);
uuid_id!(
    /// Unique identifier for a certification project
    ProjectId,
    "project"
);
uuid_id!(
    /// Unique identifier for an uploaded project document
    DocumentId,
    "document"
);
uuid_id!(
    /// Unique identifier for a GEA document template
    PhaseTemplateId,
    "template"
);
uuid_id!(ChecklistItemId, "checklist");
uuid_id!(QualityItemId, "quality");
uuid_id!(PhaseLogId, "phaselog");
uuid_id!(ChatMessageId, "message");
uuid_id!(AnnouncementId, "announcement");
uuid_id!(NotificationId, "notification");
uuid_id!(CpdLogId, "cpd");
uuid_id!(ReminderId, "reminder");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_id_generation() {
        let id1 = ProjectId::generate();
        let id2 = ProjectId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_display_has_prefix() {
        let id = GlabId::generate();
        assert!(id.to_string().starts_with("glab:"));
    }

    #[test]
    fn test_parse_with_and_without_prefix() {
        let id = ProjectId::generate();
        let prefixed: ProjectId = id.to_string().parse().unwrap();
        let bare: ProjectId = id.as_uuid().to_string().parse().unwrap();
        assert_eq!(prefixed, id);
        assert_eq!(bare, id);
    }

    #[test]
    fn test_parse_rejects_foreign_prefix() {
        let id = GlabId::generate();
        let err = id.to_string().parse::<ProjectId>().unwrap_err();
        assert_eq!(err.kind, "project");
    }

    #[test]
    fn test_serializes_as_bare_uuid() {
        let id = UserId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}
