//! Identifier types shared between the messaging client and the navigation core.
//!
//! The client is the authority on identifiers; these newtypes only check the
//! shape so that a room id can never be passed where a session id is expected.
//! All of them serialize as plain strings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound the server applies to every identifier.
pub const MAX_ID_BYTES: usize = 255;

static RE_USER_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@[^:\s]+:\S+$").unwrap());
static RE_ROOM_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^![^:\s]+:\S+$").unwrap());
static RE_EVENT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$[^:\s]+(:\S+)?$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("{kind} is empty")]
    Empty { kind: &'static str },

    #[error("{kind} must be {max} bytes or fewer", max = MAX_ID_BYTES)]
    TooLong { kind: &'static str },

    #[error("malformed {kind}: {value}")]
    Malformed { kind: &'static str, value: String },
}

fn validate(value: &str, kind: &'static str, pattern: &Regex) -> Result<(), IdError> {
    if value.trim().is_empty() {
        return Err(IdError::Empty { kind });
    }
    if value.len() > MAX_ID_BYTES {
        return Err(IdError::TooLong { kind });
    }
    if !pattern.is_match(value) {
        return Err(IdError::Malformed {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

macro_rules! client_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr, $pattern:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn parse(value: impl Into<String>) -> Result<Self, IdError> {
                let value = value.into();
                validate(&value, $kind, &$pattern)?;
                Ok(Self(value))
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

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::parse(value)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }
    };
}

client_id!(
    /// The signed-in account a session belongs to (`@localpart:server`).
    SessionId,
    "session id",
    RE_USER_ID
);

client_id!(
    /// A space is a room, so it shares the room id shape (`!opaque:server`).
    SpaceId,
    "space id",
    RE_ROOM_ID
);

client_id!(
    /// `!opaque:server`
    RoomId,
    "room id",
    RE_ROOM_ID
);

client_id!(
    /// Threads are keyed by their root event id (`$opaque`, older servers append `:server`).
    ThreadId,
    "thread id",
    RE_EVENT_ID
);
