//! TOML generation profiles.
//!
//! A profile stores the options of a `generate` run so they do not have to
//! be repeated on every invocation:
//!
//! ```toml
//! length = 128
//! save_registers = ["esp", "ebp"]
//! badchars = "\\x00\\x0a\\x0d"
//! table = "tables/opty2.json"
//! seed = "c0ffee"
//! format = "python"
//! ```
//!
//! Command-line flags take precedence over profile values. A relative
//! `table` path is taken relative to the directory holding the profile.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::output::OutputFormat;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
    pub length: Option<i64>,
    pub save_registers: Vec<String>,
    pub badchars: Option<String>,
    pub table: Option<PathBuf>,
    pub seed: Option<String>,
    pub format: Option<OutputFormat>,
}

impl Profile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read profile '{}'", path.display()))?;
        let profile = Self::parse(&text)
            .with_context(|| format!("invalid profile '{}'", path.display()))?;
        Ok(profile.relative_to(path.parent().unwrap_or(Path::new(""))))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Anchor a relative table path at `dir`.
    fn relative_to(mut self, dir: &Path) -> Self {
        if let Some(table) = self.table.take() {
            self.table = Some(if table.is_relative() {
                dir.join(table)
            } else {
                table
            });
        }
        self
    }
}
