use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

use crate::domain::{PokemonKey, capitalize};
use crate::error::MetaError;

/// One `<n>.json` file in the metadata folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: TraitValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraitValue {
    Number(u32),
    Text(String),
}

impl Attribute {
    pub fn text(trait_type: &str, value: impl Into<String>) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value: TraitValue::Text(value.into()),
        }
    }

    pub fn number(trait_type: &str, value: u32) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value: TraitValue::Number(value),
        }
    }
}

/// Display attributes of a pokemon as resolved from the remote service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PokemonProfile {
    pub name: String,
    pub description: String,
    pub type1: String,
    pub type2: String,
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub speed: u32,
    pub special: u32,
}

pub fn build_attributes(profile: &PokemonProfile) -> Vec<Attribute> {
    let mut attributes = Vec::with_capacity(7);
    if !profile.type1.is_empty() {
        attributes.push(Attribute::text("Type 1", profile.type1.clone()));
    }
    if !profile.type2.is_empty() {
        attributes.push(Attribute::text("Type 2", profile.type2.clone()));
    }
    attributes.push(Attribute::number("HP", profile.hp));
    attributes.push(Attribute::number("Attack", profile.attack));
    attributes.push(Attribute::number("Defense", profile.defense));
    attributes.push(Attribute::number("Speed", profile.speed));
    attributes.push(Attribute::number("Special", profile.special));
    attributes
}

impl NftMetadata {
    pub fn from_profile(profile: &PokemonProfile) -> Self {
        Self {
            name: profile.name.clone(),
            description: profile.description.clone(),
            image: String::new(),
            attributes: build_attributes(profile),
        }
    }

    /// Record used when the remote service cannot describe `key`.
    pub fn placeholder(key: &PokemonKey) -> Self {
        let name = capitalize(key.as_str());
        let profile = PokemonProfile {
            description: format!("Placeholder description for {name}."),
            name,
            type1: "Unknown".to_string(),
            ..PokemonProfile::default()
        };
        Self::from_profile(&profile)
    }
}

/// Four-space indented JSON with a trailing newline.
pub fn to_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, MetaError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|err| MetaError::Filesystem(err.to_string()))?;
    buffer.push(b'\n');
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trait_types(attributes: &[Attribute]) -> Vec<&str> {
        attributes
            .iter()
            .map(|attr| attr.trait_type.as_str())
            .collect()
    }

    #[test]
    fn single_type_omits_type_two() {
        let profile = PokemonProfile {
            name: "Pikachu".to_string(),
            type1: "Electric".to_string(),
            hp: 35,
            ..PokemonProfile::default()
        };
        let attributes = build_attributes(&profile);
        assert_eq!(
            trait_types(&attributes),
            vec!["Type 1", "HP", "Attack", "Defense", "Speed", "Special"]
        );
        assert_eq!(attributes[1].value, TraitValue::Number(35));
    }

    #[test]
    fn placeholder_shape() {
        let key: PokemonKey = "missingno".parse().unwrap();
        let record = NftMetadata::placeholder(&key);
        assert_eq!(record.name, "Missingno");
        assert_eq!(record.description, "Placeholder description for Missingno.");
        assert_eq!(record.image, "");
        assert_eq!(record.attributes[0], Attribute::text("Type 1", "Unknown"));
        assert!(
            record.attributes[1..]
                .iter()
                .all(|attr| attr.value == TraitValue::Number(0))
        );
        assert_eq!(record.attributes.len(), 6);
    }

    #[test]
    fn json_layout_uses_four_spaces() {
        let record = NftMetadata {
            name: "Eevee".to_string(),
            description: "d".to_string(),
            image: String::new(),
            attributes: vec![Attribute::number("HP", 55)],
        };
        let text = String::from_utf8(to_json_bytes(&record).unwrap()).unwrap();
        let expected = "{\n    \"name\": \"Eevee\",\n    \"description\": \"d\",\n    \"image\": \"\",\n    \"attributes\": [\n        {\n            \"trait_type\": \"HP\",\n            \"value\": 55\n        }\n    ]\n}\n";
        assert_eq!(text, expected);
    }
}
