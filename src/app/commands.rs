//! Inbound command record.
//!
//! Publishers (voice skill, face recognition) send
//! `{"command": "open", "username": "<who>"}` to the device topic.
//! Extra fields are ignored.

use serde::{Deserialize, Serialize};

/// Wire shape of an inbound command.
///
/// Both fields are optional at the decode step so that an absent field
/// is reported as a rejection rather than a decode error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMessage {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl CommandMessage {
    /// Build an `open` request, as published by the trigger side.
    pub fn open(username: &str) -> Self {
        Self {
            command: Some(Verb::Open.as_str().to_owned()),
            username: Some(username.to_owned()),
        }
    }
}

/// Recognised command verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Open,
}

impl Verb {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
        }
    }
}

/// An accepted request to open the door.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub username: String,
}
