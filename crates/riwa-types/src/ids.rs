//! Type-safe identifier wrappers.
//!
//! Records created by the simulation itself (escape attempts, the terminal
//! gateway) carry UUID identifiers. Entities, fragments and worlds are
//! referenced by opaque string identities supplied by the world registry
//! and the genesis catalog, so they get string newtypes instead.
//!
//! Every wrapper serializes transparently: a persisted `EntityId` is a
//! plain JSON string, a persisted `AttemptId` is a UUID string.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier (UUID v4).
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

/// Generates a newtype wrapper around an opaque [`String`] identity.
macro_rules! define_name {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an identity string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identity as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for an escape attempt.
    AttemptId
}

define_id! {
    /// Unique identifier for the terminal gateway of a universe cycle.
    GatewayId
}

define_name! {
    /// Identity of an in-world entity (a seeker pursuing escape).
    EntityId
}

define_name! {
    /// Identity of a source energy fragment in the ledger catalog.
    FragmentId
}

define_name! {
    /// Identity of a coordinate key clue.
    KeyFragmentId
}

define_name! {
    /// Identity of a virtual world supplied by the world registry.
    WorldId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique() {
        assert_ne!(AttemptId::new(), AttemptId::new());
        assert_ne!(GatewayId::new().into_inner(), Uuid::nil());
    }

    #[test]
    fn string_ids_serialize_as_plain_strings() {
        let id = EntityId::new("E1");
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json.as_deref(), Some("\"E1\""));

        let back: Option<EntityId> = serde_json::from_str("\"E1\"").ok();
        assert_eq!(back, Some(id));
    }

    #[test]
    fn display_matches_inner_value() {
        assert_eq!(FragmentId::from("frag-7").to_string(), "frag-7");
        let raw = Uuid::new_v4();
        assert_eq!(AttemptId::from(raw).to_string(), raw.to_string());
    }
}
