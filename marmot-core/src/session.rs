//! Data maintained for a whole session: flags and output settings.

use std::path::PathBuf;

/// Configuration data for the operation of the analysis.
#[derive(Debug, Default)]
pub struct Config {
    /// Whether or not to run in debug mode. In this mode, intermediate
    /// representations are traced through the `log` facade.
    pub debug: bool,
    /// If set, the fact relations of each analyzed function are serialized
    /// under this directory, one subdirectory per function, one
    /// tab-separated file per relation.
    pub dump_facts: Option<PathBuf>,
}
