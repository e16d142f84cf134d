//! Implementation of the `holefill cache` subcommands.

use crate::cache::{FileStore, FragmentStore};
use crate::cli::{CacheClearArgs, CacheListArgs, CachePutArgs, CacheShowArgs};
use crate::context::ProjectContext;
use crate::error::{HolefillError, Result};
use std::path::Path;

/// Longest fragment preview shown by `cache list`.
const PREVIEW_CHARS: usize = 60;

/// Execute the `holefill cache list` command.
pub fn cmd_cache_list(args: CacheListArgs, config_override: Option<&Path>) -> Result<()> {
    let (ctx, _config) = super::load_project(config_override)?;
    print!("{}", list(&ctx, args.namespace.as_deref())?);
    Ok(())
}

/// Execute the `holefill cache show` command.
pub fn cmd_cache_show(args: CacheShowArgs, config_override: Option<&Path>) -> Result<()> {
    let (ctx, _config) = super::load_project(config_override)?;
    println!("{}", show(&ctx, &args.namespace, &args.hash)?);
    Ok(())
}

/// Execute the `holefill cache put` command.
pub fn cmd_cache_put(args: CachePutArgs, config_override: Option<&Path>) -> Result<()> {
    let (ctx, _config) = super::load_project(config_override)?;
    let file = ctx.root.join(&args.file);
    let content = std::fs::read_to_string(&file).map_err(|e| {
        HolefillError::UserError(format!(
            "failed to read fragment file '{}': {}",
            file.display(),
            e
        ))
    })?;
    let hash = put(&ctx, &args.namespace, &args.hash, &content)?;
    println!("Stored {} in '{}'", hash, args.namespace);
    Ok(())
}

/// Execute the `holefill cache clear` command.
pub fn cmd_cache_clear(args: CacheClearArgs, config_override: Option<&Path>) -> Result<()> {
    let (ctx, _config) = super::load_project(config_override)?;
    let removed = FileStore::open(ctx.cache_dir(), &args.namespace)?.clear()?;
    println!("Removed {} fragment(s) from '{}'", removed, args.namespace);
    Ok(())
}

fn list(ctx: &ProjectContext, namespace: Option<&str>) -> Result<String> {
    let mut out = String::new();

    let Some(namespace) = namespace else {
        let namespaces = FileStore::namespaces(ctx.cache_dir())?;
        if namespaces.is_empty() {
            out.push_str("No cached namespaces.\n");
        }
        for name in namespaces {
            let count = FileStore::open(ctx.cache_dir(), &name)?.entries()?.len();
            out.push_str(&format!("{:20} {:>4}\n", name, count));
        }
        return Ok(out);
    };

    let entries = FileStore::open(ctx.cache_dir(), namespace)?.entries()?;
    if entries.is_empty() {
        out.push_str(&format!("No fragments cached in '{}'.\n", namespace));
    }
    for (hash, content) in &entries {
        out.push_str(&format!("{}  {}\n", hash, preview(content)));
    }
    Ok(out)
}

fn show(ctx: &ProjectContext, namespace: &str, hash: &str) -> Result<String> {
    let hash = hash.trim().to_uppercase();
    FileStore::open(ctx.cache_dir(), namespace)?
        .get(&hash)?
        .ok_or_else(|| {
            HolefillError::UserError(format!(
                "no fragment '{}' cached in '{}'.\n\
                 Use `holefill cache list {}` to see cached hashes.",
                hash, namespace, namespace
            ))
        })
}

/// Store `content` under a normalized hole hash, returning the hash.
fn put(ctx: &ProjectContext, namespace: &str, hash: &str, content: &str) -> Result<String> {
    let hash = hash.trim().to_uppercase();
    if hash.len() != 8 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(HolefillError::UserError(format!(
            "invalid hole hash '{}': expected 8 hex digits.\n\
             Use `holefill parse <FILE>` to see the hashes of a source.",
            hash
        )));
    }
    let content = content.trim_matches('\n');
    if content.trim().is_empty() {
        return Err(HolefillError::UserError(
            "refusing to cache an empty fragment".to_string(),
        ));
    }

    FileStore::open(ctx.cache_dir(), namespace)?.upsert(&hash, content)?;
    Ok(hash)
}

/// First line of a fragment, shortened to [`PREVIEW_CHARS`].
fn preview(content: &str) -> String {
    let first = content.lines().next().unwrap_or_default().trim();
    let mut line: String = first.chars().take(PREVIEW_CHARS).collect();
    if first.chars().count() > PREVIEW_CHARS || content.trim().lines().count() > 1 {
        line.push_str(" ...");
    }
    line
}
