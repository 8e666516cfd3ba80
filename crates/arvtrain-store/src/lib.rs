//! arvtrain-store: collaborators for the arvtrain trainer.
//!
//! Implements the `PropertySource`, `ProgressStore` and `ResultSink` traits
//! over local JSON files, HTTP endpoints and memory, plus the TOML
//! configuration that selects between them.

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod sink;
pub mod source;

pub use config::{
    create_sink, create_source, create_store, load_config, load_config_from, ArvtrainConfig,
};
pub use error::StoreError;
