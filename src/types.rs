#![forbid(unsafe_code)]

//! Core domain types for assetgate
//!
//! This module defines the fundamental types used throughout the engine.

use bitflags::bitflags;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Closed set of asset types, one bit per type.
    ///
    /// A concrete asset always carries exactly one bit. Rules carry a mask,
    /// and a rule matches an asset when `mask & asset_type` is non-empty.
    /// The backing integer is `u32`, so at most 32 distinct asset types
    /// can ever be declared.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct AssetType: u32 {
        const TEXTURE   = 1 << 0;
        const MATERIAL  = 1 << 1;
        const MESH      = 1 << 2;
        const ANIMATION = 1 << 3;
        const AUDIO     = 1 << 4;
        const VIDEO     = 1 << 5;
        const FONT      = 1 << 6;
        const SHADER    = 1 << 7;
        const SCRIPT    = 1 << 8;
        const PREFAB    = 1 << 9;
        const SCENE     = 1 << 10;
        const TEXT      = 1 << 11;
        const FOLDER    = 1 << 12;
        /// Catch-all for extensions missing from the classifier table
        const OTHER     = 1 << 13;
    }
}

const TYPE_NAMES: [(AssetType, &str); 14] = [
    (AssetType::TEXTURE, "texture"),
    (AssetType::MATERIAL, "material"),
    (AssetType::MESH, "mesh"),
    (AssetType::ANIMATION, "animation"),
    (AssetType::AUDIO, "audio"),
    (AssetType::VIDEO, "video"),
    (AssetType::FONT, "font"),
    (AssetType::SHADER, "shader"),
    (AssetType::SCRIPT, "script"),
    (AssetType::PREFAB, "prefab"),
    (AssetType::SCENE, "scene"),
    (AssetType::TEXT, "text"),
    (AssetType::FOLDER, "folder"),
    (AssetType::OTHER, "other"),
];

impl AssetType {
    /// Every declared type; matches any concrete asset.
    pub const ALL: Self = Self::all();

    /// No type; matches nothing.
    pub const NONE: Self = Self::empty();

    /// Returns true when exactly one type bit is set
    pub fn is_concrete(self) -> bool {
        self.bits().count_ones() == 1
    }

    /// Returns true when a rule carrying this mask applies to `asset`
    pub fn matches(self, asset: AssetType) -> bool {
        self.intersects(asset)
    }

    /// Iterates over every concrete (single-bit) type in declaration order
    pub fn concrete_types() -> impl Iterator<Item = AssetType> {
        Self::all().iter()
    }

    /// Lowercase name of a concrete type, `None` for masks
    pub fn name(self) -> Option<&'static str> {
        TYPE_NAMES
            .iter()
            .find(|(flag, _)| *flag == self)
            .map(|(_, name)| *name)
    }

    /// Parses a single type name (case-insensitive), including `all` and `none`
    pub fn parse(name: &str) -> Option<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "all" => Some(Self::ALL),
            "none" => Some(Self::NONE),
            _ => Self::concrete_types().find(|t| t.name() == Some(lowered.as_str())),
        }
    }

    /// Names used for serialization: `["all"]`, `[]`, or one name per bit
    pub fn names(self) -> Vec<&'static str> {
        if self == Self::ALL {
            return vec!["all"];
        }
        self.iter().filter_map(AssetType::name).collect()
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        write!(f, "{}", self.names().join("|"))
    }
}

impl FromStr for AssetType {
    type Err = String;

    /// Parses a comma or `|` separated list of type names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mask = AssetType::NONE;
        for part in s.split([',', '|']).filter(|p| !p.trim().is_empty()) {
            mask |= AssetType::parse(part)
                .ok_or_else(|| format!("Unknown asset type '{}'", part.trim()))?;
        }
        Ok(mask)
    }
}

impl Serialize for AssetType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names = self.names();
        let mut seq = serializer.serialize_seq(Some(names.len()))?;
        for name in names {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for AssetType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MaskVisitor;

        impl<'de> Visitor<'de> for MaskVisitor {
            type Value = AssetType;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a list of asset type names")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<AssetType, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<AssetType, A::Error> {
                let mut mask = AssetType::NONE;
                while let Some(name) = seq.next_element::<String>()? {
                    mask |= AssetType::parse(&name).ok_or_else(|| {
                        de::Error::custom(format!("Unknown asset type '{}'", name))
                    })?;
                }
                Ok(mask)
            }
        }

        deserializer.deserialize_any(MaskVisitor)
    }
}

/// Pipeline contexts a rule can target
///
/// The declaration order is the first component of the rule sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStage {
    CommonPreprocess,
    TypedPreprocess,
    CommonPostprocess,
    TypedPostprocess,
    Move,
    Delete,
}

impl PipelineStage {
    /// All stages in sort order
    pub fn all() -> [PipelineStage; 6] {
        [
            PipelineStage::CommonPreprocess,
            PipelineStage::TypedPreprocess,
            PipelineStage::CommonPostprocess,
            PipelineStage::TypedPostprocess,
            PipelineStage::Move,
            PipelineStage::Delete,
        ]
    }

    /// Kebab-case name, as used in files and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::CommonPreprocess => "common-preprocess",
            PipelineStage::TypedPreprocess => "typed-preprocess",
            PipelineStage::CommonPostprocess => "common-postprocess",
            PipelineStage::TypedPostprocess => "typed-postprocess",
            PipelineStage::Move => "move",
            PipelineStage::Delete => "delete",
        }
    }

    /// Import stages carry an importer handle; move and delete only a path
    pub fn is_import(&self) -> bool {
        !matches!(self, PipelineStage::Move | PipelineStage::Delete)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PipelineStage {
    type Err = String;

    /// Accepts kebab-case (`common-preprocess`) and CamelCase (`CommonPreprocess`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        PipelineStage::all()
            .into_iter()
            .find(|stage| stage.as_str().replace('-', "") == folded)
            .ok_or_else(|| format!("Unknown pipeline stage '{}'", s))
    }
}

/// Stable identity of a handler type
///
/// Identities must be non-empty and contain only alphanumeric characters,
/// hyphens, underscores, dots and colons (e.g. `check.file-size`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RuleId(String);

impl RuleId {
    /// Creates a new RuleId, validating the input
    ///
    /// Returns None if the input is empty or contains invalid characters
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() {
            return None;
        }
        if !id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
        {
            return None;
        }
        Some(RuleId(id))
    }

    /// Returns the rule ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RuleId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RuleId::new(value.clone()).ok_or_else(|| format!("Invalid rule ID '{}'", value))
    }
}

impl From<RuleId> for String {
    fn from(rule_id: RuleId) -> Self {
        rule_id.0
    }
}

/// A directory path used as a scope or blacklist key
///
/// Matching is plain string-prefix comparison. The only normalization is the
/// separator convention: backslashes become forward slashes and trailing
/// slashes are removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ScopePath(String);

impl ScopePath {
    /// Creates a new ScopePath with separator normalization
    pub fn new(path: impl Into<String>) -> Self {
        let mut path = path.into().replace('\\', "/");
        while path.ends_with('/') {
            path.pop();
        }
        ScopePath(path)
    }

    /// Returns the path as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes; outer scopes are shorter than the scopes they contain
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for the empty path
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true when this path is a string prefix of `asset_path`
    pub fn is_prefix_of(&self, asset_path: &str) -> bool {
        asset_path.starts_with(self.0.as_str())
    }

    /// Returns true when `asset_path` is this directory or lies inside it
    ///
    /// Unlike [`ScopePath::is_prefix_of`] this respects component
    /// boundaries. The empty path contains everything.
    pub fn contains(&self, asset_path: &str) -> bool {
        if self.0.is_empty() {
            return true;
        }
        match asset_path.strip_prefix(self.0.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ScopePath {
    fn from(value: String) -> Self {
        ScopePath::new(value)
    }
}

impl From<&str> for ScopePath {
    fn from(value: &str) -> Self {
        ScopePath::new(value)
    }
}

impl From<ScopePath> for String {
    fn from(path: ScopePath) -> Self {
        path.0
    }
}

/// Converts a host path into the canonical forward-slash form used for matching
pub fn canonical_path(path: &str) -> String {
    path.replace('\\', "/")
}
