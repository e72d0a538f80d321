//! Per-invocation state shared by command handlers.

use std::path::PathBuf;

use crate::adapter::CompositeStoreAdapter;
use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::error::Result;

pub struct AppContext {
    pub root: PathBuf,
    pub config: Config,
    pub adapter: CompositeStoreAdapter,
    pub output_format: OutputFormat,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = Config::load(cli.config.as_deref(), cli.root.as_deref())?;
        Self::from_config(config, cli.output_format())
    }

    pub fn from_config(config: Config, output_format: OutputFormat) -> Result<Self> {
        let adapter = config.build_adapter()?;
        Ok(Self {
            root: config.root(),
            config,
            adapter,
            output_format,
        })
    }

    #[must_use]
    pub const fn json(&self) -> bool {
        self.output_format.is_machine_readable()
    }
}
