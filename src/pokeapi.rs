use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::domain::{PokemonKey, capitalize};
use crate::error::MetaError;
use crate::metadata::PokemonProfile;
use crate::rate_limit::IntervalGate;
use crate::store::Store;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2/";

pub trait PokeApiClient: Send + Sync {
    /// `GET pokemon/{key}`.
    fn fetch_pokemon(&self, key: &PokemonKey) -> Result<Value, MetaError>;
    /// `GET` on the species link returned inside a pokemon payload.
    fn fetch_species(&self, url: &str) -> Result<Value, MetaError>;

    /// Names the pokemon resource in the response cache. Clients bound to a
    /// host return the full request URL so hosts never share entries.
    fn pokemon_resource(&self, key: &PokemonKey) -> String {
        format!("pokemon/{}", key.as_str())
    }
}

impl<C: PokeApiClient + ?Sized> PokeApiClient for &C {
    fn fetch_pokemon(&self, key: &PokemonKey) -> Result<Value, MetaError> {
        (**self).fetch_pokemon(key)
    }

    fn fetch_species(&self, url: &str) -> Result<Value, MetaError> {
        (**self).fetch_species(url)
    }

    fn pokemon_resource(&self, key: &PokemonKey) -> String {
        (**self).pokemon_resource(key)
    }
}

#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub base_url: String,
    pub timeout: Duration,
    pub request_interval: Duration,
    pub max_retries: usize,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            request_interval: Duration::from_millis(300),
            max_retries: 0,
        }
    }
}

pub struct PokeApiHttpClient {
    client: Client,
    base_url: String,
    gate: IntervalGate,
    max_retries: usize,
}

impl PokeApiHttpClient {
    pub fn new(options: HttpOptions) -> Result<Self, MetaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("pokemeta/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MetaError::PokeApiHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .build()
            .map_err(|err| MetaError::PokeApiHttp(err.to_string()))?;
        let mut base_url = options.base_url;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            client,
            base_url,
            gate: IntervalGate::new(options.request_interval),
            max_retries: options.max_retries,
        })
    }

    pub fn pokemon_url(&self, key: &PokemonKey) -> String {
        format!("{}pokemon/{}", self.base_url, key.as_str())
    }

    fn get_json(&self, url: &str, not_found: &str) -> Result<Value, MetaError> {
        tracing::debug!(%url, "pokeapi.request");
        let start = std::time::Instant::now();
        let response = self.send_with_retries(|| self.client.get(url))?;
        let status = response.status();
        tracing::debug!(
            %url,
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "pokeapi.response"
        );
        if status == StatusCode::NOT_FOUND {
            return Err(MetaError::PokemonNotFound(not_found.to_string()));
        }
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "PokeAPI request failed".to_string());
            return Err(MetaError::PokeApiStatus {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .map_err(|err| MetaError::MalformedResponse(err.to_string()))
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, MetaError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            self.gate.wait();
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.max_retries && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::warn!(status, attempt, "retrying PokeAPI request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < self.max_retries && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::warn!(attempt, "retrying PokeAPI request: {err}");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(MetaError::PokeApiHttp(err.to_string()));
                }
            }
        }
    }
}

impl PokeApiClient for PokeApiHttpClient {
    fn fetch_pokemon(&self, key: &PokemonKey) -> Result<Value, MetaError> {
        let url = self.pokemon_url(key);
        self.get_json(&url, key.as_str())
    }

    fn fetch_species(&self, url: &str) -> Result<Value, MetaError> {
        self.get_json(url, url)
    }

    fn pokemon_resource(&self, key: &PokemonKey) -> String {
        self.pokemon_url(key)
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Serves responses from the shared response cache and records fresh ones.
pub struct CachedPokeApi<C> {
    inner: C,
    store: Store,
}

impl<C: PokeApiClient> CachedPokeApi<C> {
    pub fn new(inner: C, store: Store) -> Self {
        Self { inner, store }
    }

    fn cached<F>(&self, resource: &str, fetch: F) -> Result<Value, MetaError>
    where
        F: FnOnce() -> Result<Value, MetaError>,
    {
        if let Some(value) = self.store.read_response(resource) {
            tracing::debug!(resource, "cache hit");
            return Ok(value);
        }
        let value = fetch()?;
        if let Err(err) = self.store.write_response(resource, &value) {
            tracing::warn!(resource, "failed to cache response: {err}");
        }
        Ok(value)
    }
}

impl<C: PokeApiClient> PokeApiClient for CachedPokeApi<C> {
    fn fetch_pokemon(&self, key: &PokemonKey) -> Result<Value, MetaError> {
        let resource = self.inner.pokemon_resource(key);
        self.cached(&resource, || self.inner.fetch_pokemon(key))
    }

    fn fetch_species(&self, url: &str) -> Result<Value, MetaError> {
        self.cached(url, || self.inner.fetch_species(url))
    }

    fn pokemon_resource(&self, key: &PokemonKey) -> String {
        self.inner.pokemon_resource(key)
    }
}

/// Fields of the `pokemon` resource the metadata needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PokemonCore {
    pub name: String,
    pub type1: String,
    pub type2: String,
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub speed: u32,
    pub special: u32,
    pub species_url: Option<String>,
}

pub fn extract_pokemon(raw: &Value, key: &PokemonKey) -> Result<PokemonCore, MetaError> {
    if !raw.is_object() {
        return Err(MetaError::MalformedResponse(
            "pokemon payload is not an object".to_string(),
        ));
    }
    let name = raw
        .get("name")
        .and_then(|value| value.as_str())
        .unwrap_or(key.as_str());

    let mut types = Vec::new();
    for entry in array_field(raw, "types")? {
        let slot = entry.get("slot").and_then(|value| value.as_u64());
        let type_name = entry
            .get("type")
            .and_then(|value| value.get("name"))
            .and_then(|value| value.as_str())
            .ok_or_else(|| MetaError::MalformedResponse("type entry without name".to_string()))?;
        types.push((slot.unwrap_or(u64::MAX), capitalize(type_name)));
    }
    types.sort_by_key(|(slot, _)| *slot);
    let mut types = types.into_iter().map(|(_, name)| name);

    let mut core = PokemonCore {
        name: capitalize(name),
        type1: types.next().unwrap_or_default(),
        type2: types.next().unwrap_or_default(),
        species_url: raw
            .get("species")
            .and_then(|value| value.get("url"))
            .and_then(|value| value.as_str())
            .map(|value| value.to_string()),
        ..PokemonCore::default()
    };

    for entry in array_field(raw, "stats")? {
        let stat_name = entry
            .get("stat")
            .and_then(|value| value.get("name"))
            .and_then(|value| value.as_str())
            .ok_or_else(|| MetaError::MalformedResponse("stat entry without name".to_string()))?;
        let base_stat = entry
            .get("base_stat")
            .and_then(|value| value.as_u64())
            .and_then(|value| u32::try_from(value).ok())
            .ok_or_else(|| {
                MetaError::MalformedResponse(format!("stat {stat_name} without base_stat"))
            })?;
        match stat_name {
            "hp" => core.hp = base_stat,
            "attack" => core.attack = base_stat,
            "defense" => core.defense = base_stat,
            "speed" => core.speed = base_stat,
            "special-attack" => core.special = base_stat,
            _ => {}
        }
    }

    Ok(core)
}

fn array_field<'a>(raw: &'a Value, field: &str) -> Result<&'a [Value], MetaError> {
    match raw.get(field) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(MetaError::MalformedResponse(format!(
            "{field} is not an array"
        ))),
    }
}

/// First flavor text in `language`, with form feeds and line breaks
/// flattened to spaces.
pub fn extract_flavor_text(species: &Value, language: &str) -> Option<String> {
    species
        .get("flavor_text_entries")
        .and_then(|value| value.as_array())?
        .iter()
        .find(|entry| {
            entry
                .get("language")
                .and_then(|value| value.get("name"))
                .and_then(|value| value.as_str())
                == Some(language)
        })
        .and_then(|entry| entry.get("flavor_text"))
        .and_then(|value| value.as_str())
        .map(|text| text.replace(['\n', '\x0c'], " ").trim().to_string())
}

/// Resolves everything the metadata record needs for `key`. Either call
/// failing fails the whole lookup.
pub fn fetch_profile<C: PokeApiClient + ?Sized>(
    client: &C,
    key: &PokemonKey,
    language: &str,
) -> Result<PokemonProfile, MetaError> {
    let raw = client.fetch_pokemon(key)?;
    let core = extract_pokemon(&raw, key)?;

    let mut description = format!("Official data for {}.", core.name);
    if let Some(url) = &core.species_url {
        let species = client.fetch_species(url)?;
        if let Some(text) = extract_flavor_text(&species, language) {
            description = text;
        }
    }

    Ok(PokemonProfile {
        name: core.name,
        description,
        type1: core.type1,
        type2: core.type2,
        hp: core.hp,
        attack: core.attack,
        defense: core.defense,
        speed: core.speed,
        special: core.special,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn types_follow_slot_order() {
        let raw = json!({
            "name": "bulbasaur",
            "types": [
                {"slot": 2, "type": {"name": "poison"}},
                {"slot": 1, "type": {"name": "grass"}}
            ],
            "stats": []
        });
        let key: PokemonKey = "bulbasaur".parse().unwrap();
        let core = extract_pokemon(&raw, &key).unwrap();
        assert_eq!(core.type1, "Grass");
        assert_eq!(core.type2, "Poison");
        assert_eq!(core.hp, 0);
        assert_eq!(core.species_url, None);
    }

    #[test]
    fn name_falls_back_to_key() {
        let key: PokemonKey = "ditto".parse().unwrap();
        let core = extract_pokemon(&json!({}), &key).unwrap();
        assert_eq!(core.name, "Ditto");
        assert_eq!(core.type1, "");
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let key: PokemonKey = "ditto".parse().unwrap();
        let err = extract_pokemon(&json!({"stats": "nope"}), &key).unwrap_err();
        assert_matches!(err, MetaError::MalformedResponse(_));
        let err = extract_pokemon(&json!([1, 2]), &key).unwrap_err();
        assert_matches!(err, MetaError::MalformedResponse(_));
    }

    #[test]
    fn flavor_text_first_match_wins() {
        let species = json!({
            "flavor_text_entries": [
                {"flavor_text": "Ein Text", "language": {"name": "de"}},
                {"flavor_text": "A strange seed was\nplanted on its\x0cback at birth. ", "language": {"name": "en"}},
                {"flavor_text": "Second", "language": {"name": "en"}}
            ]
        });
        assert_eq!(
            extract_flavor_text(&species, "en").as_deref(),
            Some("A strange seed was planted on its back at birth.")
        );
        assert_eq!(extract_flavor_text(&species, "fr"), None);
    }
}
