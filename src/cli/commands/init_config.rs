use anyhow::{anyhow, Result};
use std::path::PathBuf;

use crate::config::HistopathConfig;

pub struct InitConfigCommand {
    pub path: PathBuf,
    pub force: bool,
}

impl InitConfigCommand {
    pub fn new(path: PathBuf, force: bool) -> Self {
        Self { path, force }
    }

    pub fn execute(&self, config: &HistopathConfig) -> Result<()> {
        if self.path.exists() && !self.force {
            return Err(anyhow!(
                "{} already exists. Use --force to overwrite it",
                self.path.display()
            ));
        }
        config.save_to_file(&self.path)?;
        println!("✅ Wrote configuration to {}", self.path.display());
        Ok(())
    }
}
