//! `herder herds`: list installed herds.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;

use herder_core::Layout;
use herder_sync::herd;

#[derive(Debug, Clone)]
pub struct HerdsArgs {
    pub repo: PathBuf,
}

impl HerdsArgs {
    pub fn run(self) -> Result<()> {
        let layout = Layout::default();
        let herds = herd::discover(&self.repo, &layout)
            .with_context(|| format!("failed to read herds under {}", self.repo.display()))?;

        if herds.is_empty() {
            println!("No herds installed under {}.", layout.herds_dir);
            return Ok(());
        }
        for h in &herds {
            println!("{}  {}", h.name.to_string().bold(), h.path.display());
        }
        Ok(())
    }
}
