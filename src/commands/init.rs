//! Implementation of the `holefill init` command.
//!
//! Writes a `holefill.yaml` with every default spelled out, so the
//! collaborator commands only need filling in.

use crate::context::ProjectContext;
use crate::config::Config;
use crate::error::{HolefillError, Result};
use crate::fs::atomic_write_file;
use std::path::{Path, PathBuf};

const CONFIG_HEADER: &str = "\
# holefill configuration
#
# generator/critic/evaluator commands are split like a shell would split
# them (no shell is run) and may use {prompt_file}, {program_file}, {role},
# {tools} and {round}. The critic falls back to the generator when unset.
";

/// Execute the `holefill init` command.
pub fn cmd_init(config_override: Option<&Path>) -> Result<()> {
    let mut ctx = ProjectContext::resolve()?;
    if let Some(path) = config_override {
        ctx = ctx.with_config_path(path);
    }
    let path = init_project(&ctx)?;
    println!("Created {}", path.display());
    Ok(())
}

/// Write the default config. Refuses to overwrite an existing file.
pub(crate) fn init_project(ctx: &ProjectContext) -> Result<PathBuf> {
    if ctx.config_path.exists() {
        return Err(HolefillError::UserError(format!(
            "config file '{}' already exists.\n\
             Fix: edit it directly or remove it first.",
            ctx.config_path.display()
        )));
    }

    let yaml = Config::default().to_yaml()?;
    let content = format!("{}\n{}", CONFIG_HEADER, yaml);
    atomic_write_file(&ctx.config_path, &content).map_err(|e| {
        HolefillError::UserError(format!("failed to write config file: {}", e))
    })?;

    Ok(ctx.config_path.clone())
}
