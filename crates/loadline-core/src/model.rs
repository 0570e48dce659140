use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque stop identifier, unique per physical stop.
pub type StopId = String;

/// Selects one diagram: a route name plus the direction as written in the patronage data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    pub route: String,
    pub direction: String,
}

impl RouteKey {
    pub fn new(route: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            direction: direction.into(),
        }
    }

    /// `{route}_{direction}`, with path separators replaced so it is usable as a file stem.
    ///
    /// Underscores in the route become `-`, so the first `_` always separates route from
    /// direction when a stem is split back into a key.
    pub fn file_stem(&self) -> String {
        let route = self.route.replace('_', "-");
        format!("{route}_{}", self.direction).replace(['/', '\\'], "-")
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.route, self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_keeps_the_first_underscore_as_separator() {
        assert_eq!(RouteKey::new("100", "Inbound").file_stem(), "100_Inbound");
        assert_eq!(RouteKey::new("N_1", "Anti_Clockwise").file_stem(), "N-1_Anti_Clockwise");
        assert_eq!(RouteKey::new("A/B", "Out").file_stem(), "A-B_Out");
    }
}
