//! Boundary layer taxonomy (§3 `BoundaryRecord.layer`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of political/administrative boundary a record describes.
///
/// Enum order here is the canonical Merkle leaf ordering tie-break (§4.G:
/// "leaves are placed ... first by `layer` (enum order)"), so reordering
/// variants is a breaking change to every committed snapshot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// U.S. congressional district.
    Congressional,
    /// State legislature upper chamber district.
    StateUpper,
    /// State legislature lower chamber district.
    StateLower,
    /// County.
    County,
    /// Incorporated place / municipality.
    Place,
    /// Municipal council district.
    CouncilDistrict,
    /// Unified school district.
    SchoolUnified,
    /// Elementary school district.
    SchoolElementary,
    /// Secondary school district.
    SchoolSecondary,
    /// Special fire protection district.
    SpecialFire,
    /// Special library district.
    SpecialLibrary,
    /// Special hospital district.
    SpecialHospital,
    /// Special water district.
    SpecialWater,
    /// Special transit district.
    SpecialTransit,
    /// Special utility district.
    SpecialUtility,
}

/// Every layer, in enum declaration (Merkle tie-break) order.
pub const ALL: [Layer; 15] = [
    Layer::Congressional,
    Layer::StateUpper,
    Layer::StateLower,
    Layer::County,
    Layer::Place,
    Layer::CouncilDistrict,
    Layer::SchoolUnified,
    Layer::SchoolElementary,
    Layer::SchoolSecondary,
    Layer::SpecialFire,
    Layer::SpecialLibrary,
    Layer::SpecialHospital,
    Layer::SpecialWater,
    Layer::SpecialTransit,
    Layer::SpecialUtility,
];

impl Layer {
    /// Single-byte enum tag used in the canonical leaf encoding (§4.G.1).
    pub fn tag(self) -> u8 {
        match self {
            Layer::Congressional => 0,
            Layer::StateUpper => 1,
            Layer::StateLower => 2,
            Layer::County => 3,
            Layer::Place => 4,
            Layer::CouncilDistrict => 5,
            Layer::SchoolUnified => 6,
            Layer::SchoolElementary => 7,
            Layer::SchoolSecondary => 8,
            Layer::SpecialFire => 9,
            Layer::SpecialLibrary => 10,
            Layer::SpecialHospital => 11,
            Layer::SpecialWater => 12,
            Layer::SpecialTransit => 13,
            Layer::SpecialUtility => 14,
        }
    }

    /// Short machine name, used in config tables and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Congressional => "congressional",
            Layer::StateUpper => "state_upper",
            Layer::StateLower => "state_lower",
            Layer::County => "county",
            Layer::Place => "place",
            Layer::CouncilDistrict => "council_district",
            Layer::SchoolUnified => "school_unified",
            Layer::SchoolElementary => "school_elementary",
            Layer::SchoolSecondary => "school_secondary",
            Layer::SpecialFire => "special_fire",
            Layer::SpecialLibrary => "special_library",
            Layer::SpecialHospital => "special_hospital",
            Layer::SpecialWater => "special_water",
            Layer::SpecialTransit => "special_transit",
            Layer::SpecialUtility => "special_utility",
        }
    }

    /// Whether this layer tessellates its parent jurisdiction (no gaps, no
    /// overlaps), used by the Topology validator (§4.F.5) as the default
    /// for any layer not covered by a per-state override table.
    pub fn tessellates_by_default(self) -> bool {
        matches!(
            self,
            Layer::Congressional
                | Layer::StateUpper
                | Layer::StateLower
                | Layer::County
                | Layer::CouncilDistrict
        )
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_order_matches_tag_order() {
        let layers = [
            Layer::Congressional,
            Layer::StateUpper,
            Layer::StateLower,
            Layer::County,
            Layer::Place,
            Layer::CouncilDistrict,
        ];
        for window in layers.windows(2) {
            assert!(window[0] < window[1]);
            assert!(window[0].tag() < window[1].tag());
        }
    }

    #[test]
    fn school_layers_do_not_tessellate_by_default() {
        assert!(!Layer::SchoolElementary.tessellates_by_default());
        assert!(!Layer::SchoolSecondary.tessellates_by_default());
    }
}
