//! Implementation of the `holefill parse` command.
//!
//! Shows what the extractor sees in a source file: holes with their
//! hashes, network annotations and the template with placeholders.

use crate::cli::ParseArgs;
use crate::error::{HolefillError, Result};
use crate::source::{ParsedSource, RegenPolicy, parse};
use crate::workflow::slot_keys;
use std::fmt::Write;
use std::path::Path;

/// Execute the `holefill parse` command.
pub fn cmd_parse(args: ParseArgs, config_override: Option<&Path>) -> Result<()> {
    let (_ctx, config) = super::load_project(config_override)?;
    let source = read_source(&args.file)?;
    let parsed = parse(&source)?;

    if args.json {
        let json = serde_json::to_string_pretty(&parsed).map_err(|e| {
            HolefillError::UserError(format!("failed to serialize parse result: {}", e))
        })?;
        println!("{}", json);
    } else {
        print!("{}", describe(&parsed, &config.placeholder));
    }
    Ok(())
}

/// Read a source file, mapping failures to a user error.
pub(crate) fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        HolefillError::UserError(format!(
            "failed to read source file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Human-readable description of a parse result.
pub(crate) fn describe(parsed: &ParsedSource, placeholder: &str) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Holes: {}", parsed.holes.len());
    for hole in &parsed.holes {
        let _ = writeln!(out);
        let _ = writeln!(out, "  {} (line {})", hole.hash, hole.line);
        if !hole.head.is_empty() {
            let _ = writeln!(out, "    Head: {}", hole.head);
        }
        let policy = match hole.regen {
            RegenPolicy::MustRegenerate => "always regenerate",
            RegenPolicy::ReuseAllowed => "reuse cached",
        };
        let _ = writeln!(out, "    FUP:  {}", policy);
        let _ = writeln!(out, "    LLM:  {}", hole.requirement);
        let slots = slot_keys(&hole.requirement);
        if !slots.is_empty() {
            let _ = writeln!(out, "    Ext:  {}", slots.join(", "));
        }
        if let Some(tool) = &hole.tool {
            let _ = writeln!(out, "    LOT:  {}", tool);
        }
        if let Some(network) = &hole.network {
            let _ = writeln!(out, "    NET:  {}", network);
        }
    }

    if !parsed.networks.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Networks:");
        for network in &parsed.networks {
            let _ = writeln!(out, "  {} (line {})", network.rendered, network.line);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Query: {}",
        if parsed.has_executable_query {
            "yes"
        } else {
            "no"
        }
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Template:");
    let _ = writeln!(out, "{}", parsed.template.render(placeholder));

    out
}
