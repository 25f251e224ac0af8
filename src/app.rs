use std::time::Duration;

use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::error::MetaError;
use crate::generator::{GenerateOptions, GenerateResult, MetadataGenerator};
use crate::patcher::{LinkPatcher, PatchOptions, PatchResult};
use crate::pokeapi::{CachedPokeApi, PokeApiClient};
use crate::sequencer::{ImageSequencer, SequenceOptions, SequenceResult};
use crate::store::Store;
use crate::verify::{AlignmentReport, check_alignment};

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub sequence: SequenceResult,
    pub generate: GenerateResult,
    pub patch: PatchResult,
    pub alignment: AlignmentReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearResult {
    pub cleared: bool,
    pub cache_root: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<C: PokeApiClient> {
    config: ResolvedConfig,
    store: Store,
    client: C,
}

impl<C: PokeApiClient> App<C> {
    pub fn new(config: ResolvedConfig, store: Store, client: C) -> Self {
        Self {
            config,
            store,
            client,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn sequence(&self, sink: &dyn ProgressSink) -> Result<SequenceResult, MetaError> {
        sink.event(ProgressEvent {
            message: format!(
                "phase=Sequence; {} -> {}",
                self.config.source_images, self.config.numbered_images
            ),
            elapsed: None,
        });
        let options = SequenceOptions {
            limit: self.config.max_items,
            start: 1,
            on_collision: self.config.on_collision,
        };
        ImageSequencer::run(
            self.config.source_images.as_std_path(),
            self.config.numbered_images.as_std_path(),
            &options,
            sink,
        )
    }

    pub fn generate(&self, sink: &dyn ProgressSink) -> Result<GenerateResult, MetaError> {
        sink.event(ProgressEvent {
            message: format!(
                "phase=Generate; {} -> {}",
                self.config.source_images, self.config.metadata_dir
            ),
            elapsed: None,
        });
        let options = GenerateOptions {
            limit: self.config.max_items,
            start: 1,
            language: self.config.language.clone(),
        };
        let source = self.config.source_images.as_std_path();
        let output = self.config.metadata_dir.as_std_path();
        if self.config.cache {
            let cached = CachedPokeApi::new(&self.client, self.store.clone());
            MetadataGenerator::new(cached).generate(source, output, &options, sink)
        } else {
            MetadataGenerator::new(&self.client).generate(source, output, &options, sink)
        }
    }

    pub fn patch_links(&self, sink: &dyn ProgressSink) -> Result<PatchResult, MetaError> {
        sink.event(ProgressEvent {
            message: format!(
                "phase=Patch; ipfs://{}/<n>.{} in {}",
                self.config.cid, self.config.image_extension, self.config.metadata_dir
            ),
            elapsed: None,
        });
        let options = PatchOptions {
            cid: self.config.cid.clone(),
            image_extension: self.config.image_extension.clone(),
        };
        LinkPatcher::patch(self.config.metadata_dir.as_std_path(), &options, sink)
    }

    pub fn verify(&self, sink: &dyn ProgressSink) -> Result<AlignmentReport, MetaError> {
        sink.event(ProgressEvent {
            message: format!(
                "phase=Verify; {} <-> {}",
                self.config.numbered_images, self.config.metadata_dir
            ),
            elapsed: None,
        });
        check_alignment(
            self.config.numbered_images.as_std_path(),
            self.config.metadata_dir.as_std_path(),
        )
    }

    /// Sequence, generate, patch, then check that the two numbered folders
    /// line up.
    pub fn run_all(&self, sink: &dyn ProgressSink) -> Result<RunResult, MetaError> {
        let sequence = self.sequence(sink)?;
        let generate = self.generate(sink)?;
        let patch = self.patch_links(sink)?;
        let alignment = self.verify(sink)?;
        Ok(RunResult {
            sequence,
            generate,
            patch,
            alignment,
        })
    }

    pub fn clear_cache(&self, sink: &dyn ProgressSink) -> Result<ClearResult, MetaError> {
        sink.event(ProgressEvent {
            message: format!("phase=Store; clearing {}", self.store.cache_root()),
            elapsed: None,
        });
        let cleared = self.store.clear_cache()?;
        Ok(ClearResult {
            cleared,
            cache_root: self.store.cache_root().to_string(),
        })
    }
}
