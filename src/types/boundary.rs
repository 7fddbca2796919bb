//! `BoundaryRecord`: the immutable unit committed into a Snapshot (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::geometry::Geometry;
use super::layer::Layer;
use super::property::FeatureProperties;

/// Stable identifier for a boundary: a country-qualified GEOID or a
/// provider-specific code. Unique per `Layer` (§3 invariant).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BoundaryId(String);

impl BoundaryId {
    /// Wrap a raw identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoundaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ranking of provider trust, highest first (Glossary: Authority tier).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityTier {
    /// Highest trust: federal sources (e.g. Census TIGER).
    Federal,
    /// State GIS portals.
    State,
    /// Regional/multi-county authorities.
    Regional,
    /// Municipal GIS portals.
    Municipal,
    /// Derived/computed from other tiers (lowest trust).
    Derived,
}

/// Where a `BoundaryRecord` came from and how its bytes were verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Upstream source URL.
    pub source_url: String,
    /// SHA-256 hex digest of the raw upstream response.
    pub response_checksum: String,
    /// When the record was retrieved.
    pub retrieved_at: DateTime<Utc>,
    /// Trust ranking of the source.
    pub authority_tier: AuthorityTier,
}

impl Provenance {
    /// Canonical bytes for the provenance digest (§4.G.7):
    /// `source_url || response_checksum || authority_tier`.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(self.source_url.as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(self.response_checksum.as_bytes());
        bytes.push(0);
        bytes.push(self.authority_tier as u8);
        bytes
    }
}

/// Immutable, identified political/administrative boundary.
///
/// Invariants (§3): `boundary_id` unique per layer, geometry is a closed,
/// valid polygon/multipolygon (self-intersections within tolerance), WGS84,
/// and `vintage_year >= 2020`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRecord {
    /// Stable identifier, unique within `layer`.
    pub boundary_id: BoundaryId,
    /// Kind of boundary.
    pub layer: Layer,
    /// FIPS code of the owning jurisdiction (state, or state+county, etc).
    pub jurisdiction_fips: String,
    /// Human-readable name.
    pub display_name: String,
    /// Vintage year of the source data; must be >= 2020.
    pub vintage_year: u16,
    /// WGS84 polygon/multipolygon geometry.
    pub geometry: Geometry,
    /// Land area in square meters.
    pub land_area_m2: f64,
    /// Water area in square meters.
    pub water_area_m2: f64,
    /// Source, checksum, retrieval time, and trust tier.
    pub provenance: Provenance,
    /// Ordered semantic attributes relevant to the layer.
    pub attributes: FeatureProperties,
}

/// Minimum vintage year accepted, per §3.
pub const MIN_VINTAGE_YEAR: u16 = 2020;

/// Default tolerance, in self-intersection count, for "valid" geometry.
/// `spec.md` describes tolerance qualitatively ("no self-intersections
/// exceeding tolerance"); this crate treats any detected self-intersection
/// beyond simple shared-endpoint adjacency as exceeding tolerance.
pub const SELF_INTERSECTION_TOLERANCE: usize = 0;

impl BoundaryRecord {
    /// Validate the §3 structural invariants (not the Validation Pipeline's
    /// semantic checks — just "is this a well-formed record").
    pub fn validate_invariants(&self) -> Result<(), String> {
        if self.boundary_id.as_str().is_empty() {
            return Err("boundary_id must not be empty".to_string());
        }
        if self.vintage_year < MIN_VINTAGE_YEAR {
            return Err(format!(
                "vintage_year {} is before minimum {}",
                self.vintage_year, MIN_VINTAGE_YEAR
            ));
        }
        if !self.geometry.is_valid() {
            return Err("geometry is not a closed, valid polygon/multipolygon".to_string());
        }
        let self_intersections = self.geometry.self_intersections();
        if self_intersections > SELF_INTERSECTION_TOLERANCE {
            return Err(format!(
                "geometry has {self_intersections} self-intersections exceeding tolerance"
            ));
        }
        Ok(())
    }
}
