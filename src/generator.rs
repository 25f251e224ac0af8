use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::{PokemonKey, is_image_file};
use crate::error::MetaError;
use crate::metadata::{NftMetadata, to_json_bytes};
use crate::pokeapi::{PokeApiClient, fetch_profile};
use crate::store::{list_files, write_bytes_atomic};

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub limit: Option<usize>,
    pub start: u32,
    pub language: String,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            limit: Some(100),
            start: 1,
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordOrigin {
    Api,
    Placeholder,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedItem {
    pub number: u32,
    pub source: String,
    pub name: String,
    pub origin: RecordOrigin,
    pub path: String,
    pub written: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateResult {
    pub output_dir: String,
    pub considered: usize,
    pub from_api: usize,
    pub placeholders: usize,
    pub write_failures: usize,
    pub items: Vec<GeneratedItem>,
    pub generated_at: String,
}

pub struct MetadataGenerator<C: PokeApiClient> {
    client: C,
}

impl<C: PokeApiClient> MetadataGenerator<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Writes `<n>.json` for each image in `source`, in sorted order. The
    /// number comes from a running counter, never from the source name.
    pub fn generate(
        &self,
        source: &Path,
        output: &Path,
        options: &GenerateOptions,
        sink: &dyn ProgressSink,
    ) -> Result<GenerateResult, MetaError> {
        if !source.is_dir() {
            return Err(MetaError::MissingSourceDir(source.to_path_buf()));
        }
        std::fs::create_dir_all(output).map_err(|err| {
            MetaError::Filesystem(format!("create {}: {err}", output.display()))
        })?;

        let images = list_files(source)?
            .into_iter()
            .filter(|path| is_image_file(path))
            .collect::<Vec<_>>();
        let limit = options.limit.unwrap_or(usize::MAX);
        sink.event(ProgressEvent {
            message: format!(
                "found {} images in {}; processing up to {}",
                images.len(),
                source.display(),
                options
                    .limit
                    .map(|limit| limit.to_string())
                    .unwrap_or_else(|| "all".to_string())
            ),
            elapsed: None,
        });

        let mut result = GenerateResult {
            output_dir: output.display().to_string(),
            considered: 0,
            from_api: 0,
            placeholders: 0,
            write_failures: 0,
            items: Vec::new(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        };
        let mut number = options.start;

        for image in images.iter().take(limit) {
            result.considered += 1;
            let start = Instant::now();
            let source_name = file_name(image);
            let (record, origin) = match PokemonKey::from_path(image) {
                Ok(key) => self.resolve(&key, &options.language),
                Err(err) => {
                    tracing::warn!(source = %source_name, "unusable file name: {err}");
                    let fallback: PokemonKey = "unknown".parse()?;
                    (NftMetadata::placeholder(&fallback), RecordOrigin::Placeholder)
                }
            };
            match origin {
                RecordOrigin::Api => result.from_api += 1,
                RecordOrigin::Placeholder => result.placeholders += 1,
            }

            let path = output.join(format!("{number}.json"));
            let written = match to_json_bytes(&record)
                .and_then(|bytes| write_bytes_atomic(&path, &bytes))
            {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(path = %path.display(), "failed to write metadata: {err}");
                    result.write_failures += 1;
                    false
                }
            };
            sink.event(ProgressEvent {
                message: format!(
                    "{source_name} -> {number}.json ({}{})",
                    record.name,
                    if origin == RecordOrigin::Placeholder {
                        ", placeholder"
                    } else {
                        ""
                    }
                ),
                elapsed: Some(start.elapsed()),
            });
            result.items.push(GeneratedItem {
                number,
                source: source_name,
                name: record.name,
                origin,
                path: path.display().to_string(),
                written,
            });
            number += 1;
        }

        if images.len() > limit {
            sink.event(ProgressEvent {
                message: format!("reached the limit of {limit} items"),
                elapsed: None,
            });
        }
        tracing::info!(
            considered = result.considered,
            from_api = result.from_api,
            placeholders = result.placeholders,
            write_failures = result.write_failures,
            "metadata generation finished"
        );
        Ok(result)
    }

    fn resolve(&self, key: &PokemonKey, language: &str) -> (NftMetadata, RecordOrigin) {
        match fetch_profile(&self.client, key, language) {
            Ok(profile) => (NftMetadata::from_profile(&profile), RecordOrigin::Api),
            Err(err) => {
                tracing::warn!(key = %key, "using placeholder data: {err}");
                (NftMetadata::placeholder(key), RecordOrigin::Placeholder)
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}
