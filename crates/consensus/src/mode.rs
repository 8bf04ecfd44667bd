use serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

/// How the masks of one scene are combined.
#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq, PartialOrd, Ord, Hash
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CombinationMode {
    /// Fire only where every algorithm agrees
    Intersection,

    /// Fire where at least `quorum` algorithms agree
    Voting,

    /// Fire where any algorithm reports fire
    Union,
}

/// Which scenes a mode considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Only scenes every algorithm produced a mask for
    Inner,
    /// Any scene at least one algorithm produced a mask for
    Outer,
}

impl CombinationMode {
    /// Get a list of all mode names
    pub fn mode_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    /// Join discipline used to build the scene set for this mode.
    pub fn join(&self) -> JoinKind {
        match self {
            Self::Intersection => JoinKind::Inner,
            Self::Voting | Self::Union => JoinKind::Outer,
        }
    }

    /// Token used in output filenames (`..._RT_Voting.TIF`).
    pub fn file_token(&self) -> &'static str {
        match self {
            Self::Intersection => "Intersection",
            Self::Voting => "Voting",
            Self::Union => "Union",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Intersection => "AND of all algorithm masks; scenes missing any mask are skipped",
            Self::Voting => "Pixels flagged by at least `quorum` algorithms; missing masks cast no vote",
            Self::Union => "OR of every available algorithm mask",
        }
    }
}
