use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::{CollisionPolicy, is_image_file};
use crate::error::MetaError;
use crate::store::{copy_file_atomic, list_files};

#[derive(Debug, Clone)]
pub struct SequenceOptions {
    /// Maximum number of numbered slots filled (copied or skipped);
    /// `None` processes everything.
    pub limit: Option<usize>,
    pub start: u32,
    pub on_collision: CollisionPolicy,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            limit: Some(100),
            start: 1,
            on_collision: CollisionPolicy::Skip,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SequencedImage {
    pub number: u32,
    pub source: String,
    pub destination: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedImage {
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedImage {
    pub source: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SequenceResult {
    pub destination: String,
    pub found: usize,
    pub copied: Vec<SequencedImage>,
    pub skipped: Vec<SkippedImage>,
    pub failed: Vec<FailedImage>,
    pub next_number: u32,
}

pub struct ImageSequencer;

impl ImageSequencer {
    /// Copies every recognized image in `source` to `destination` as
    /// `<n><ext>`, in file-name order. Sources are never modified.
    pub fn run(
        source: &Path,
        destination: &Path,
        options: &SequenceOptions,
        sink: &dyn ProgressSink,
    ) -> Result<SequenceResult, MetaError> {
        if !source.is_dir() {
            return Err(MetaError::MissingSourceDir(source.to_path_buf()));
        }
        std::fs::create_dir_all(destination).map_err(|err| {
            MetaError::Filesystem(format!("create {}: {err}", destination.display()))
        })?;

        let images = list_files(source)?
            .into_iter()
            .filter(|path| is_image_file(path))
            .collect::<Vec<_>>();
        let limit = options.limit.unwrap_or(usize::MAX);
        sink.event(ProgressEvent {
            message: format!("found {} image files in {}", images.len(), source.display()),
            elapsed: None,
        });

        let mut result = SequenceResult {
            destination: destination.display().to_string(),
            found: images.len(),
            copied: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            next_number: options.start,
        };
        let mut number = options.start;

        for image in &images {
            if result.copied.len() + result.skipped.len() >= limit {
                sink.event(ProgressEvent {
                    message: format!("reached the limit of {limit} files"),
                    elapsed: None,
                });
                break;
            }

            let source_name = display_name(image);
            let extension = image
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default();
            let mut target = numbered_path(destination, number, &extension);
            let mut replace = false;

            if target.exists() {
                match options.on_collision {
                    CollisionPolicy::Skip => {
                        tracing::warn!(dest = %target.display(), "destination exists, skipping {source_name}");
                        sink.event(ProgressEvent {
                            message: format!("skip {source_name}: {} exists", display_name(&target)),
                            elapsed: None,
                        });
                        result.skipped.push(SkippedImage {
                            source: source_name,
                            reason: format!("{} already exists", display_name(&target)),
                        });
                        number += 1;
                        continue;
                    }
                    CollisionPolicy::Fail => return Err(MetaError::Collision(target)),
                    CollisionPolicy::Overwrite => replace = true,
                    CollisionPolicy::Renumber => {
                        while target.exists() {
                            number += 1;
                            target = numbered_path(destination, number, &extension);
                        }
                        tracing::debug!(number, "renumbered {source_name} past existing files");
                    }
                }
            }

            match copy_file_atomic(image, &target, replace) {
                Ok(()) => {
                    tracing::debug!(source = %image.display(), dest = %target.display(), "copied");
                    sink.event(ProgressEvent {
                        message: format!("{source_name} -> {}", display_name(&target)),
                        elapsed: None,
                    });
                    result.copied.push(SequencedImage {
                        number,
                        source: source_name,
                        destination: target.display().to_string(),
                    });
                    number += 1;
                }
                Err(err) => {
                    tracing::warn!(source = %image.display(), "copy failed: {err}");
                    result.failed.push(FailedImage {
                        source: source_name,
                        message: err.to_string(),
                    });
                }
            }
        }

        result.next_number = number;
        tracing::info!(
            copied = result.copied.len(),
            skipped = result.skipped.len(),
            failed = result.failed.len(),
            "image sequencing finished"
        );
        Ok(result)
    }
}

fn numbered_path(dir: &Path, number: u32, extension: &str) -> PathBuf {
    dir.join(format!("{number}{extension}"))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
