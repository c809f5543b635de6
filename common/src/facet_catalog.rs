//! Static registry of the searchable facets and the graph patterns that bind them.
//!
//! Every facet the search form offers is a [`FilterCategory`]. The catalog maps
//! each one to a fixed [`FacetSpec`]; there is no way to register a pattern at
//! runtime, so a query can only ever be assembled from the entries below.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Namespace prefixes shared by every compiled query.
pub const SPARQL_PREFIXES: &str = "PREFIX allores: <http://purl.allotrope.org/ontologies/result#>
PREFIX cat: <http://example.org/cat#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX schema: <https://schema.org/>";

/// Variable holding the top-level key (the campaign subject).
pub const TOP_LEVEL_VARIABLE: &str = "s";

/// Variable holding the content location of a campaign; consolidation groups on it.
pub const LOCATION_VARIABLE: &str = "cu";

/// Pattern every top-level key has to satisfy.
pub const BASE_PATTERN: &str = "?s a cat:Campaign .";

/// Pattern binding [`LOCATION_VARIABLE`].
pub const LOCATION_PATTERN: &str = "?s schema:contentURL ?cu .";

/// Separator used when multi-valued facets are aggregated into one cell.
pub const MULTI_VALUE_SEPARATOR: &str = " | ";

const HAS_BATCH: &str = "?s cat:hasBatch ?b .";
const HAS_CHEMICAL: &str = "?s cat:hasChemical ?c .";
const HAS_DEVICE_SYSTEM: &str = "?s allores:AFR_0002526 ?dsd .";

/// How selected values restrict a facet variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchKind {
    /// `?v = "value"`
    Exact,
    /// `CONTAINS(?v, "value")`
    Contains,
}

/// Immutable description of one facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacetSpec {
    /// Name of the bound query variable, without the leading `?`.
    pub variable: &'static str,
    /// Triple lines making up the fixed graph pattern that binds `variable`.
    /// Lines shared between facets are spelled identically so that a set of
    /// lines deduplicates them.
    pub patterns: &'static [&'static str],
    /// Whether the variable is part of GROUP BY when the facet is an output column.
    /// Facets that are not group keys are aggregated instead.
    pub is_group_key: bool,
    pub match_kind: MatchKind,
}

impl FacetSpec {
    /// Header name under which the query service reports this facet's column.
    pub fn result_column(&self) -> String {
        if self.is_group_key {
            self.variable.to_string()
        } else {
            format!("{}_list", self.variable)
        }
    }
}

const CAMPAIGN_NAME: FacetSpec = FacetSpec {
    variable: "cp",
    patterns: &["?s schema:name ?cp ."],
    is_group_key: true,
    match_kind: MatchKind::Contains,
};

const REACTION_TYPE: FacetSpec = FacetSpec {
    variable: "rt",
    patterns: &[HAS_BATCH, "?b cat:reactionType ?rt ."],
    is_group_key: true,
    match_kind: MatchKind::Contains,
};

const REACTION_NAME: FacetSpec = FacetSpec {
    variable: "rn",
    patterns: &[HAS_BATCH, "?b cat:reactionName ?rn ."],
    is_group_key: true,
    match_kind: MatchKind::Contains,
};

const CHEMICAL_NAME: FacetSpec = FacetSpec {
    variable: "cn",
    patterns: &[HAS_CHEMICAL, "?c allores:AFR_0002292 ?cn ."],
    is_group_key: false,
    match_kind: MatchKind::Exact,
};

const CAS: FacetSpec = FacetSpec {
    variable: "ca",
    patterns: &[HAS_CHEMICAL, "?c cat:casNumber ?ca ."],
    is_group_key: false,
    match_kind: MatchKind::Exact,
};

const SMILES: FacetSpec = FacetSpec {
    variable: "sm",
    patterns: &[HAS_CHEMICAL, "?c allores:AFR_0002295 ?sm ."],
    is_group_key: false,
    match_kind: MatchKind::Exact,
};

const DEVICE_TYPE: FacetSpec = FacetSpec {
    variable: "dt",
    patterns: &[HAS_DEVICE_SYSTEM, "?dsd allores:AFR_0002722/allores:AFR_0002568 ?dt ."],
    is_group_key: false,
    match_kind: MatchKind::Contains,
};

/// The searchable facets, declared in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterCategory {
    CampaignName,
    ReactionType,
    ReactionName,
    ChemicalName,
    Cas,
    Smiles,
    DeviceType,
}

impl FilterCategory {
    pub const ALL: [FilterCategory; 7] = [
        FilterCategory::CampaignName,
        FilterCategory::ReactionType,
        FilterCategory::ReactionName,
        FilterCategory::ChemicalName,
        FilterCategory::Cas,
        FilterCategory::Smiles,
        FilterCategory::DeviceType,
    ];

    pub fn all_categories() -> &'static [FilterCategory] {
        &Self::ALL
    }

    pub fn spec(self) -> &'static FacetSpec {
        match self {
            FilterCategory::CampaignName => &CAMPAIGN_NAME,
            FilterCategory::ReactionType => &REACTION_TYPE,
            FilterCategory::ReactionName => &REACTION_NAME,
            FilterCategory::ChemicalName => &CHEMICAL_NAME,
            FilterCategory::Cas => &CAS,
            FilterCategory::Smiles => &SMILES,
            FilterCategory::DeviceType => &DEVICE_TYPE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterCategory::CampaignName => "CAMPAIGN_NAME",
            FilterCategory::ReactionType => "REACTION_TYPE",
            FilterCategory::ReactionName => "REACTION_NAME",
            FilterCategory::ChemicalName => "CHEMICAL_NAME",
            FilterCategory::Cas => "CAS",
            FilterCategory::Smiles => "SMILES",
            FilterCategory::DeviceType => "DEVICE_TYPE",
        }
    }

    /// Name used by the search form and in URLs.
    pub fn url_name(self) -> &'static str {
        match self {
            FilterCategory::CampaignName => "campaignName",
            FilterCategory::ReactionType => "reactionType",
            FilterCategory::ReactionName => "reactionName",
            FilterCategory::ChemicalName => "chemicalName",
            FilterCategory::Cas => "cas",
            FilterCategory::Smiles => "smiles",
            FilterCategory::DeviceType => "deviceType",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            FilterCategory::CampaignName => "Campaign name",
            FilterCategory::ReactionType => "Reaction type",
            FilterCategory::ReactionName => "Reaction name",
            FilterCategory::ChemicalName => "Chemical name",
            FilterCategory::Cas => "CAS number",
            FilterCategory::Smiles => "SMILES",
            FilterCategory::DeviceType => "Device type",
        }
    }
}

/// Looks up the spec of a category.
pub fn spec_for(category: FilterCategory) -> &'static FacetSpec {
    category.spec()
}

impl fmt::Display for FilterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter category: {0:?}")]
pub struct UnknownFilterCategory(pub String);

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for FilterCategory {
    type Err = UnknownFilterCategory;

    /// Accepts `CAMPAIGN_NAME` as well as `campaignName`, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s.trim());
        if wanted.is_empty() {
            return Err(UnknownFilterCategory(s.to_string()));
        }
        FilterCategory::ALL
            .into_iter()
            .find(|category| normalize(category.as_str()) == wanted || normalize(category.url_name()) == wanted)
            .ok_or_else(|| UnknownFilterCategory(s.to_string()))
    }
}
