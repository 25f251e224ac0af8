pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod generator;
pub mod metadata;
pub mod output;
pub mod patcher;
pub mod pokeapi;
pub mod rate_limit;
pub mod sequencer;
pub mod store;
pub mod verify;
