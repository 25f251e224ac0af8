use std::fmt;
use std::path::Path;
use std::str::FromStr;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MetaError;

pub const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"];

/// Name used to look a pokemon up on the remote service, taken from an
/// image filename stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PokemonKey(String);

impl PokemonKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_path(path: &Path) -> Result<Self, MetaError> {
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| MetaError::InvalidKey(path.display().to_string()))?;
        stem.parse()
    }
}

impl fmt::Display for PokemonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PokemonKey {
    type Err = MetaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(MetaError::InvalidKey(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Content address of the directory holding the numbered images.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(String);

impl ContentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `stem` is the metadata file's own base name, kept verbatim.
    pub fn image_uri(&self, stem: &str, extension: &str) -> String {
        format!("ipfs://{}/{}.{}", self.0, stem, extension)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentId {
    type Err = MetaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let v0 = Regex::new(r"^Qm[1-9A-HJ-NP-Za-km-z]{44}$").unwrap();
        let v1 = Regex::new(r"^b[a-z2-7]{50,}$").unwrap();
        if !v0.is_match(trimmed) && !v1.is_match(trimmed) {
            return Err(MetaError::InvalidCid(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// What the sequencer does when `<n>.<ext>` already exists in the
/// destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Leave the existing file and give its number to it.
    #[default]
    Skip,
    Overwrite,
    Fail,
    /// Move on to the next free number.
    Renumber,
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionPolicy::Skip => write!(f, "skip"),
            CollisionPolicy::Overwrite => write!(f, "overwrite"),
            CollisionPolicy::Fail => write!(f, "fail"),
            CollisionPolicy::Renumber => write!(f, "renumber"),
        }
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let lower = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// Integer basename of a numbered file (`12.png` -> 12).
pub fn numbered_stem(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || !stem.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|ch| ch.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}
