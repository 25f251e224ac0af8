use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use assert_matches::assert_matches;
use serde_json::{Value, json};

use pokemeta::domain::PokemonKey;
use pokemeta::error::MetaError;
use pokemeta::generator::{GenerateOptions, MetadataGenerator, RecordOrigin};
use pokemeta::metadata::{NftMetadata, TraitValue};
use pokemeta::output::JsonOutput;
use pokemeta::pokeapi::PokeApiClient;

const SPECIES_URL: &str = "https://pokeapi.co/api/v2/pokemon-species/1/";

#[derive(Default)]
struct MockPokeApi {
    pokemon: HashMap<String, Value>,
    species: HashMap<String, Value>,
    calls: Mutex<Vec<String>>,
}

impl MockPokeApi {
    fn with_bulbasaur() -> Self {
        let mut mock = Self::default();
        mock.pokemon.insert(
            "bulbasaur".to_string(),
            json!({
                "name": "bulbasaur",
                "types": [
                    {"slot": 1, "type": {"name": "grass"}},
                    {"slot": 2, "type": {"name": "poison"}}
                ],
                "stats": [
                    {"base_stat": 45, "stat": {"name": "hp"}},
                    {"base_stat": 49, "stat": {"name": "attack"}},
                    {"base_stat": 49, "stat": {"name": "defense"}},
                    {"base_stat": 65, "stat": {"name": "special-attack"}},
                    {"base_stat": 65, "stat": {"name": "special-defense"}},
                    {"base_stat": 45, "stat": {"name": "speed"}}
                ],
                "species": {"name": "bulbasaur", "url": SPECIES_URL}
            }),
        );
        mock.species.insert(
            SPECIES_URL.to_string(),
            json!({
                "flavor_text_entries": [
                    {"flavor_text": "Une graine", "language": {"name": "fr"}},
                    {"flavor_text": "A strange seed was\nplanted on its\x0cback at birth.", "language": {"name": "en"}}
                ]
            }),
        );
        mock
    }
}

impl PokeApiClient for MockPokeApi {
    fn fetch_pokemon(&self, key: &PokemonKey) -> Result<Value, MetaError> {
        self.calls.lock().unwrap().push(format!("pokemon/{key}"));
        self.pokemon
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| MetaError::PokemonNotFound(key.to_string()))
    }

    fn fetch_species(&self, url: &str) -> Result<Value, MetaError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.species
            .get(url)
            .cloned()
            .ok_or_else(|| MetaError::PokeApiHttp("connection reset".to_string()))
    }
}

fn read_record(path: &Path) -> NftMetadata {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

fn seed_images(dir: &Path, names: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    for name in names {
        fs::write(dir.join(name), b"img").unwrap();
    }
}

#[test]
fn dual_type_record_has_full_attribute_list() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("byName");
    let output = temp.path().join("metadata");
    seed_images(&source, &["Bulbasaur.png"]);

    let generator = MetadataGenerator::new(MockPokeApi::with_bulbasaur());
    let result = generator
        .generate(&source, &output, &GenerateOptions::default(), &JsonOutput)
        .unwrap();

    assert_eq!(result.from_api, 1);
    assert_eq!(result.items[0].origin, RecordOrigin::Api);
    let record = read_record(&output.join("1.json"));
    assert_eq!(record.name, "Bulbasaur");
    assert_eq!(
        record.description,
        "A strange seed was planted on its back at birth."
    );
    assert_eq!(record.image, "");
    let traits = record
        .attributes
        .iter()
        .map(|attr| attr.trait_type.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        traits,
        vec!["Type 1", "Type 2", "HP", "Attack", "Defense", "Speed", "Special"]
    );
    assert_eq!(record.attributes[0].value, TraitValue::Text("Grass".to_string()));
    assert_eq!(record.attributes[1].value, TraitValue::Text("Poison".to_string()));
    assert_eq!(record.attributes[5].value, TraitValue::Number(45));
    assert_eq!(record.attributes[6].value, TraitValue::Number(65));
}

#[test]
fn not_found_produces_placeholder() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("byName");
    let output = temp.path().join("metadata");
    seed_images(&source, &["missingno.png"]);

    let generator = MetadataGenerator::new(MockPokeApi::default());
    let result = generator
        .generate(&source, &output, &GenerateOptions::default(), &JsonOutput)
        .unwrap();

    assert_eq!(result.placeholders, 1);
    assert_eq!(result.from_api, 0);
    let record = read_record(&output.join("1.json"));
    assert_eq!(record.name, "Missingno");
    assert_eq!(record.description, "Placeholder description for Missingno.");
    assert_eq!(record.attributes[0].trait_type, "Type 1");
    assert_eq!(
        record.attributes[0].value,
        TraitValue::Text("Unknown".to_string())
    );
    assert!(
        record.attributes[1..]
            .iter()
            .all(|attr| attr.value == TraitValue::Number(0))
    );
}

#[test]
fn species_failure_falls_back_to_placeholder() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("byName");
    let output = temp.path().join("metadata");
    seed_images(&source, &["bulbasaur.png"]);

    let mut mock = MockPokeApi::with_bulbasaur();
    mock.species.clear();
    let generator = MetadataGenerator::new(mock);
    let result = generator
        .generate(&source, &output, &GenerateOptions::default(), &JsonOutput)
        .unwrap();

    assert_eq!(result.items[0].origin, RecordOrigin::Placeholder);
    assert_eq!(read_record(&output.join("1.json")).name, "Bulbasaur");
}

#[test]
fn numbering_follows_sorted_order_and_limit() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("byName");
    let output = temp.path().join("metadata");
    seed_images(
        &source,
        &["zubat.png", "bulbasaur.png", "abra.png", "readme.md", "eevee.png"],
    );

    let generator = MetadataGenerator::new(MockPokeApi::with_bulbasaur());
    let options = GenerateOptions {
        limit: Some(3),
        ..GenerateOptions::default()
    };
    let result = generator
        .generate(&source, &output, &options, &JsonOutput)
        .unwrap();

    assert_eq!(result.considered, 3);
    let sources = result
        .items
        .iter()
        .map(|item| (item.number, item.source.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        sources,
        vec![(1, "abra.png"), (2, "bulbasaur.png"), (3, "eevee.png")]
    );
    assert_eq!(read_record(&output.join("2.json")).name, "Bulbasaur");
    assert_eq!(read_record(&output.join("1.json")).name, "Abra");
    assert!(!output.join("4.json").exists());
}

#[test]
fn calls_pokemon_then_species() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("byName");
    let output = temp.path().join("metadata");
    seed_images(&source, &["bulbasaur.png"]);

    let mock = MockPokeApi::with_bulbasaur();
    let generator = MetadataGenerator::new(&mock);
    generator
        .generate(&source, &output, &GenerateOptions::default(), &JsonOutput)
        .unwrap();

    let calls = mock.calls.lock().unwrap().clone();
    assert_eq!(calls, vec!["pokemon/bulbasaur".to_string(), SPECIES_URL.to_string()]);
}

#[test]
fn missing_source_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let generator = MetadataGenerator::new(MockPokeApi::default());
    let err = generator
        .generate(
            &temp.path().join("absent"),
            &temp.path().join("metadata"),
            &GenerateOptions::default(),
            &JsonOutput,
        )
        .unwrap_err();
    assert_matches!(err, MetaError::MissingSourceDir(_));
}
