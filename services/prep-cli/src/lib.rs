//! Shared pieces of the `build-catalog` and `transcode` binaries:
//! configuration loading, logging setup and the commands themselves.

pub mod commands;
pub mod config_loader;
pub mod logging;

pub use commands::{array_provider, build_catalog, transcode};
pub use config_loader::{
    expand_env_vars, load_catalog_config, load_transcode_config, CatalogConfig, SourceConfig,
    TranscodeConfig,
};
pub use logging::{init_logging, LogFormat, LoggingArgs};
