//! `Scope`: the tagged union used throughout to delimit work (§3).

use serde::{Deserialize, Serialize};

use super::boundary::BoundaryId;
use super::layer::Layer;

/// Delimits the work an Extraction Engine run, Change Detector check, or
/// Incremental Updater pass should cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// A single U.S. state, by FIPS code.
    State(String),
    /// An explicit list of region identifiers (state FIPS, county FIPS, etc).
    Region(Vec<String>),
    /// An entire country, by ISO code.
    Country(String),
    /// Every supported country/layer.
    Global,
    /// A single layer within a single state.
    Layer(Layer, String),
    /// A single boundary record.
    Single(BoundaryId),
}

impl Scope {
    /// A short, stable label used in task ids and log lines.
    pub fn label(&self) -> String {
        match self {
            Scope::State(fips) => format!("state:{fips}"),
            Scope::Region(ids) => format!("region:{}", ids.join(",")),
            Scope::Country(code) => format!("country:{code}"),
            Scope::Global => "global".to_string(),
            Scope::Layer(layer, fips) => format!("layer:{}:{fips}", layer.as_str()),
            Scope::Single(id) => format!("single:{id}"),
        }
    }
}
