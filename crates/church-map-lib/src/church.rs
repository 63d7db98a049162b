//! Church records as delivered by the directory service

use geo::Point;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One church in the directory
///
/// Records are immutable once fetched; a successful refresh replaces the
/// whole local set rather than patching individual fields.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Church {
    /// Directory-wide identity
    pub id: i64,
    /// WGS84 position (x = lon, y = lat)
    pub position: Point<f64>,
    /// Denomination category used as the filter dimension
    pub confession: Confession,
    /// Display name
    pub name: String,
    /// Street address, when the directory provides one
    pub address: Option<String>,
}

impl Church {
    pub fn new(id: i64, position: Point<f64>, confession: Confession, name: impl Into<String>) -> Self {
        Self {
            id,
            position,
            confession,
            name: name.into(),
            address: None,
        }
    }
}

/// The closed set of confession categories the directory distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Confession {
    Orthodox,
    Catholic,
    Protestant,
}

impl Confession {
    pub const ALL: [Self; 3] = [Self::Orthodox, Self::Catholic, Self::Protestant];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Orthodox => "Orthodox",
            Self::Catholic => "Catholic",
            Self::Protestant => "Protestant",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::lat_lon;

    #[test]
    fn test_all_covers_every_confession() {
        assert_eq!(Confession::ALL.len(), 3);
        for confession in Confession::ALL {
            assert!(!confession.name().is_empty());
        }
    }

    #[test]
    fn test_church_new_has_no_address() {
        let church = Church::new(7, lat_lon(55.75, 37.62), Confession::Orthodox, "St. Basil");
        assert_eq!(church.id, 7);
        assert!(church.address.is_none());
    }
}
