//! Configuration loading
//!
//! Sources, lowest priority first: built-in defaults, `jstrace.toml` (or the
//! path passed with `--config` / `JSTRACE_CONFIG_PATH`), then `JSTRACE_*`
//! environment variables with `__` separating sections
//! (`JSTRACE_INTERPRETER__MAX_STEPS=5000`). A `.env` file is loaded first.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::interpreter::Limits;

const DEFAULT_CONFIG_FILE: &str = "jstrace.toml";
const ENV_PREFIX: &str = "JSTRACE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub interpreter: InterpreterConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Step ceiling before a run is aborted
    pub max_steps: usize,
    pub max_call_depth: usize,
    /// Longest array or string a program may build
    pub max_collection_length: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        let limits = Limits::default();
        Self {
            max_steps: limits.max_steps,
            max_call_depth: limits.max_call_depth,
            max_collection_length: limits.max_collection_length,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Truncate traces longer than this, appending a warning step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_trace_steps: Option<usize>,
    pub pretty: bool,
}

impl Config {
    /// Load from the default sources
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_steps: self.interpreter.max_steps,
            max_call_depth: self.interpreter.max_call_depth,
            max_collection_length: self.interpreter.max_collection_length,
        }
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration")
    }

    fn validate(&self) -> Result<()> {
        if self.interpreter.max_steps == 0 {
            anyhow::bail!("interpreter.max_steps must be greater than zero");
        }
        if self.interpreter.max_call_depth == 0 {
            anyhow::bail!("interpreter.max_call_depth must be greater than zero");
        }
        if self.interpreter.max_collection_length == 0 {
            anyhow::bail!("interpreter.max_collection_length must be greater than zero");
        }
        Ok(())
    }
}

/// Explicit overrides applied on top of every other source
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    max_steps: Option<usize>,
    max_trace_steps: Option<usize>,
    pretty: Option<bool>,
}

impl ConfigBuilder {
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn max_steps(mut self, steps: Option<usize>) -> Self {
        self.max_steps = steps;
        self
    }

    pub fn max_trace_steps(mut self, steps: Option<usize>) -> Self {
        self.max_trace_steps = steps;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        if pretty {
            self.pretty = Some(true);
        }
        self
    }

    pub fn build(self) -> Result<Config> {
        dotenvy::dotenv().ok();

        // An explicitly named file must exist; the default one is optional.
        let (path, required) = match self.config_path {
            Some(path) => (path, true),
            None => match std::env::var(format!("{}_CONFIG_PATH", ENV_PREFIX)) {
                Ok(path) => (PathBuf::from(path), true),
                Err(_) => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
            },
        };

        let mut config: Config = ::config::Config::builder()
            .add_source(::config::File::from(path.clone()).required(required))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?
            .try_deserialize()
            .context("Invalid configuration")?;

        if let Some(steps) = self.max_steps {
            config.interpreter.max_steps = steps;
        }
        if let Some(steps) = self.max_trace_steps {
            config.output.max_trace_steps = Some(steps);
        }
        if let Some(pretty) = self.pretty {
            config.output.pretty = pretty;
        }

        config.validate()?;
        Ok(config)
    }
}
