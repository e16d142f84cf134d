//! Command implementations for holefill.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the project loading they share.

mod cache;
mod init;
mod parse;
mod solve;

use crate::cli::{CacheAction, Cli, Command};
use crate::config::Config;
use crate::context::ProjectContext;
use crate::error::Result;
use std::path::Path;

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. Each command
/// is routed to its handler function.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Command::Init => init::cmd_init(config),
        Command::Parse(args) => parse::cmd_parse(args, config),
        Command::Solve(args) => solve::cmd_solve(args, config),
        Command::Cache(cache_cmd) => match cache_cmd.action {
            CacheAction::List(args) => cache::cmd_cache_list(args, config),
            CacheAction::Show(args) => cache::cmd_cache_show(args, config),
            CacheAction::Put(args) => cache::cmd_cache_put(args, config),
            CacheAction::Clear(args) => cache::cmd_cache_clear(args, config),
        },
    }
}

/// Resolve the project in the current directory and load its config.
///
/// An explicit config path must exist; the default one may be absent.
fn load_project(config_override: Option<&Path>) -> Result<(ProjectContext, Config)> {
    let ctx = ProjectContext::resolve()?;
    load_project_at(ctx, config_override)
}

fn load_project_at(
    ctx: ProjectContext,
    config_override: Option<&Path>,
) -> Result<(ProjectContext, Config)> {
    let (ctx, config) = match config_override {
        Some(path) => {
            let ctx = ctx.with_config_path(path);
            let config = Config::load(&ctx.config_path)?;
            (ctx, config)
        }
        None => {
            let config = Config::load_or_default(&ctx.config_path)?;
            (ctx, config)
        }
    };
    let ctx = ctx.with_state_dir(&config.state_dir);
    Ok((ctx, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;
    use tempfile::TempDir;

    #[test]
    fn missing_default_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let ctx = ProjectContext::resolve_from(temp.path());

        let (ctx, config) = load_project_at(ctx, None).unwrap();
        assert_eq!(config.max_rounds, 3);
        assert_eq!(ctx.state_dir, temp.path().join(".holefill"));
    }

    #[test]
    fn state_dir_comes_from_config() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("holefill.yaml"), "state_dir: .state\n").unwrap();
        let ctx = ProjectContext::resolve_from(temp.path());

        let (ctx, _) = load_project_at(ctx, None).unwrap();
        assert_eq!(ctx.cache_dir(), temp.path().join(".state").join("cache"));
    }

    #[test]
    fn explicit_config_must_exist() {
        let temp = TempDir::new().unwrap();
        let ctx = ProjectContext::resolve_from(temp.path());

        let err = load_project_at(ctx, Some(Path::new("missing.yaml"))).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn explicit_config_is_loaded() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("other.yaml"), "max_rounds: 8\n").unwrap();
        let ctx = ProjectContext::resolve_from(temp.path());

        let (ctx, config) = load_project_at(ctx, Some(Path::new("other.yaml"))).unwrap();
        assert_eq!(config.max_rounds, 8);
        assert_eq!(ctx.config_path, temp.path().join("other.yaml"));
    }
}
