use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Urgency classification of a specimen, fixed at registration
/// Higher values = more urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Standard turnaround (0)
    Routine = 0,
    /// Report expected within 24 hours (1)
    Urgent = 1,
    /// Report expected within 4 hours (2)
    Stat = 2,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown priority '{0}' (expected routine, urgent or stat)")]
pub struct UnknownPriority(pub String);

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Routine, Priority::Urgent, Priority::Stat];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Routine => "routine",
            Priority::Urgent => "urgent",
            Priority::Stat => "stat",
        }
    }

    /// Expected turnaround, if the priority carries one
    pub fn turnaround_hours(self) -> Option<u32> {
        match self {
            Priority::Stat => Some(4),
            Priority::Urgent => Some(24),
            Priority::Routine => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::Stat => "STAT",
            Priority::Urgent => "Urgent",
            Priority::Routine => "Routine",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "routine" => Ok(Priority::Routine),
            "urgent" => Ok(Priority::Urgent),
            "stat" => Ok(Priority::Stat),
            _ => Err(UnknownPriority(s.to_string())),
        }
    }
}
