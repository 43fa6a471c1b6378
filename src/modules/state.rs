//! Target states accepted by the `state` parameter

use serde::{Deserialize, Serialize};
use std::fmt;

/// State for resources that can only exist or not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    Present,
    Absent,
}

/// State for managed databases, which can additionally be suspended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseState {
    Present,
    Absent,
    Suspend,
    Resume,
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresenceState::Present => write!(f, "present"),
            PresenceState::Absent => write!(f, "absent"),
        }
    }
}

impl fmt::Display for DatabaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DatabaseState::Present => "present",
            DatabaseState::Absent => "absent",
            DatabaseState::Suspend => "suspend",
            DatabaseState::Resume => "resume",
        };
        write!(f, "{}", s)
    }
}
