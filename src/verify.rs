use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Serialize;

use crate::domain::{is_image_file, numbered_stem};
use crate::error::MetaError;
use crate::store::list_files;

/// Pairing of numbered images with numbered metadata files.
#[derive(Debug, Clone, Serialize)]
pub struct AlignmentReport {
    pub images: usize,
    pub metadata: usize,
    pub missing_metadata: Vec<u32>,
    pub missing_images: Vec<u32>,
    pub duplicate_images: Vec<u32>,
    pub aligned: bool,
}

impl AlignmentReport {
    pub fn into_result(self) -> Result<Self, MetaError> {
        if self.aligned {
            return Ok(self);
        }
        Err(MetaError::Misaligned {
            missing_metadata: self.missing_metadata.len(),
            missing_images: self.missing_images.len(),
            duplicates: self.duplicate_images.len(),
        })
    }
}

pub fn check_alignment(image_dir: &Path, metadata_dir: &Path) -> Result<AlignmentReport, MetaError> {
    if !image_dir.is_dir() {
        return Err(MetaError::MissingSourceDir(image_dir.to_path_buf()));
    }
    if !metadata_dir.is_dir() {
        return Err(MetaError::MissingSourceDir(metadata_dir.to_path_buf()));
    }

    let mut images = BTreeMap::<u32, usize>::new();
    for path in list_files(image_dir)? {
        if !is_image_file(&path) {
            continue;
        }
        if let Some(number) = numbered_stem(&path) {
            *images.entry(number).or_default() += 1;
        }
    }

    let metadata = list_files(metadata_dir)?
        .into_iter()
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false)
        })
        .filter_map(|path| numbered_stem(&path))
        .collect::<BTreeSet<_>>();

    let missing_metadata = images
        .keys()
        .filter(|number| !metadata.contains(number))
        .copied()
        .collect::<Vec<_>>();
    let missing_images = metadata
        .iter()
        .filter(|number| !images.contains_key(number))
        .copied()
        .collect::<Vec<_>>();
    let duplicate_images = images
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(number, _)| *number)
        .collect::<Vec<_>>();
    let aligned =
        missing_metadata.is_empty() && missing_images.is_empty() && duplicate_images.is_empty();

    if !aligned {
        tracing::warn!(
            missing_metadata = missing_metadata.len(),
            missing_images = missing_images.len(),
            duplicates = duplicate_images.len(),
            "images and metadata are not aligned"
        );
    }

    Ok(AlignmentReport {
        images: images.len(),
        metadata: metadata.len(),
        missing_metadata,
        missing_images,
        duplicate_images,
        aligned,
    })
}
