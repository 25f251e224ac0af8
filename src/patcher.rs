use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::{ContentId, numbered_stem};
use crate::error::MetaError;
use crate::metadata::to_json_bytes;
use crate::store::{list_files, write_bytes_atomic};

#[derive(Debug, Clone)]
pub struct PatchOptions {
    pub cid: ContentId,
    /// Extension used in the generated URI, without the dot.
    pub image_extension: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchedFile {
    pub path: String,
    pub previous_image: Option<String>,
    pub image: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchIssue {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchResult {
    pub directory: String,
    pub updated: Vec<PatchedFile>,
    pub skipped: Vec<PatchIssue>,
    pub errors: Vec<PatchIssue>,
}

pub struct LinkPatcher;

impl LinkPatcher {
    /// Points the `image` field of every `<n>.json` in `dir` at
    /// `ipfs://<cid>/<n>.<ext>`. Files that cannot be patched keep their
    /// bytes.
    pub fn patch(
        dir: &Path,
        options: &PatchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<PatchResult, MetaError> {
        if !dir.is_dir() {
            return Err(MetaError::MissingSourceDir(dir.to_path_buf()));
        }

        let files = list_files(dir)?
            .into_iter()
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
            })
            .collect::<Vec<_>>();
        sink.event(ProgressEvent {
            message: format!("found {} JSON files in {}", files.len(), dir.display()),
            elapsed: None,
        });

        let mut result = PatchResult {
            directory: dir.display().to_string(),
            updated: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
        };

        for path in files {
            let Some(stem) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .filter(|_| numbered_stem(&path).is_some())
            else {
                sink.event(ProgressEvent {
                    message: format!("skip {}: not a numbered file", path.display()),
                    elapsed: None,
                });
                result.skipped.push(PatchIssue {
                    path: path.display().to_string(),
                    message: "file name is not a number".to_string(),
                });
                continue;
            };
            let image = options.cid.image_uri(stem, &options.image_extension);
            match patch_file(&path, &image) {
                Ok(previous_image) => {
                    tracing::debug!(path = %path.display(), %image, "image link updated");
                    sink.event(ProgressEvent {
                        message: format!(
                            "{}: {} -> {image}",
                            path.display(),
                            previous_image.as_deref().unwrap_or("not set")
                        ),
                        elapsed: None,
                    });
                    result.updated.push(PatchedFile {
                        path: path.display().to_string(),
                        previous_image,
                        image,
                    });
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), "skipping file: {err}");
                    sink.event(ProgressEvent {
                        message: format!("error: {err}"),
                        elapsed: None,
                    });
                    result.errors.push(PatchIssue {
                        path: path.display().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            updated = result.updated.len(),
            skipped = result.skipped.len(),
            errors = result.errors.len(),
            "image link patching finished"
        );
        Ok(result)
    }
}

/// Rewrites `image` in place and returns its previous string value.
pub fn patch_file(path: &Path, image: &str) -> Result<Option<String>, MetaError> {
    let content = fs::read(path)
        .map_err(|err| MetaError::Filesystem(format!("read {}: {err}", path.display())))?;
    let mut value: Value =
        serde_json::from_slice(&content).map_err(|err| MetaError::InvalidMetadata {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| MetaError::InvalidMetadata {
            path: path.to_path_buf(),
            message: "top-level value is not an object".to_string(),
        })?;
    let previous = object
        .insert("image".to_string(), Value::String(image.to_string()))
        .map(|previous| match previous {
            Value::String(text) => text,
            other => other.to_string(),
        });
    let bytes = to_json_bytes(&value)?;
    write_bytes_atomic(path, &bytes)?;
    Ok(previous)
}
