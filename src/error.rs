use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MetaError {
    #[error("invalid pokemon key: {0:?}")]
    InvalidKey(String),

    #[error("invalid content identifier: {0}")]
    InvalidCid(String),

    #[error("source directory not found: {0}")]
    #[diagnostic(help("check the folder path in pokemeta.json or pass it on the command line"))]
    MissingSourceDir(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("PokeAPI request failed: {0}")]
    PokeApiHttp(String),

    #[error("PokeAPI returned status {status}: {message}")]
    PokeApiStatus { status: u16, message: String },

    #[error("pokemon not found on PokeAPI: {0}")]
    PokemonNotFound(String),

    #[error("malformed PokeAPI response: {0}")]
    MalformedResponse(String),

    #[error("invalid metadata JSON in {path}: {message}")]
    InvalidMetadata { path: PathBuf, message: String },

    #[error("destination file already exists: {0}")]
    #[diagnostic(help("use --on-collision skip|overwrite|renumber to continue past existing files"))]
    Collision(PathBuf),

    #[error(
        "images and metadata are not aligned ({missing_metadata} without metadata, {missing_images} without image, {duplicates} duplicate numbers)"
    )]
    Misaligned {
        missing_metadata: usize,
        missing_images: usize,
        duplicates: usize,
    },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
