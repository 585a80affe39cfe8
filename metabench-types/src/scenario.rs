//! The `(parts, segments)` parameter pair of a benchmark configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one benchmark configuration by the shape of the uploaded objects.
///
/// The special value [`Scenario::NONE`] marks measurements that are not tied to a particular
/// object shape, such as iterating all objects in a bucket.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "PascalCase")]
pub struct Scenario {
    /// Number of parts per object.
    pub parts: u32,
    /// Number of segments per part.
    pub segments: u32,
}

impl Scenario {
    /// The scenario-less measurement key.
    pub const NONE: Scenario = Scenario {
        parts: 0,
        segments: 0,
    };

    /// Creates a scenario for objects with the given shape.
    pub const fn new(parts: u32, segments: u32) -> Self {
        Self { parts, segments }
    }

    /// Returns `true` if this is the scenario-less key `(0, 0)`.
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parts: {}, segments: {}", self.parts, self.segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_zero_zero() {
        assert!(Scenario::new(0, 0).is_none());
        assert!(Scenario::default().is_none());
        assert!(!Scenario::new(1, 0).is_none());
        assert!(!Scenario::new(0, 3).is_none());
    }

    #[test]
    fn display() {
        assert_eq!(Scenario::new(2, 11).to_string(), "parts: 2, segments: 11");
    }
}
