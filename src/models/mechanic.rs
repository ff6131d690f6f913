use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mechanic {
    pub id: String,
    pub name: String,
    pub email: String,
    pub specialization: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shift {
    pub id: String,
    pub mechanic_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub type ShiftsByMechanic = HashMap<String, Vec<Shift>>;

impl Shift {
    /// Inclusive at both ends. A shift whose start is after its end covers nothing.
    pub fn covers(&self, at: &DateTime<Utc>) -> bool {
        self.start <= *at && *at <= self.end
    }

    pub fn is_well_formed(&self) -> bool {
        self.start <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn shift(start: &str, end: &str) -> Shift {
        Shift {
            id: "s-1".to_string(),
            mechanic_id: "m-1".to_string(),
            start: at(start),
            end: at(end),
        }
    }

    #[test]
    fn test_covers_is_inclusive() {
        let s = shift("2025-06-01T09:00:00Z", "2025-06-01T17:00:00Z");
        assert!(s.covers(&at("2025-06-01T09:00:00Z")));
        assert!(s.covers(&at("2025-06-01T17:00:00Z")));
        assert!(!s.covers(&at("2025-06-01T17:00:01Z")));
        assert!(!s.covers(&at("2025-06-01T08:59:59Z")));
    }

    #[test]
    fn test_inverted_shift_covers_nothing() {
        let s = shift("2025-06-01T17:00:00Z", "2025-06-01T09:00:00Z");
        assert!(!s.is_well_formed());
        assert!(!s.covers(&at("2025-06-01T12:00:00Z")));
        assert!(!s.covers(&at("2025-06-01T17:00:00Z")));
    }
}
