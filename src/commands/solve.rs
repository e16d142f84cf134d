//! Implementation of the `holefill solve` command.
//!
//! Wires the configured generator, critic and evaluator commands, the
//! file-backed cache and the run history into a synthesis task.

use crate::agent::{CommandEvaluator, CommandModel};
use crate::cache::{FileStore, validate_namespace};
use crate::cli::SolveArgs;
use crate::codec::PromptSet;
use crate::config::Config;
use crate::context::ProjectContext;
use crate::error::{HolefillError, Result};
use crate::fs::atomic_write_file;
use crate::history::RunHistory;
use crate::workflow::{SynthesisTask, TaskOptions, TaskResult, parse_assignments};
use std::io::Write;
use std::path::Path;
use tracing::info;

use super::parse::read_source;

/// Execute the `holefill solve` command.
pub fn cmd_solve(args: SolveArgs, config_override: Option<&Path>) -> Result<()> {
    let (ctx, config) = super::load_project(config_override)?;
    let result = solve_file(&ctx, &config, &args)?;

    match &args.out {
        Some(path) => {
            let path = ctx.root.join(path);
            atomic_write_file(&path, &result.document).map_err(|e| {
                HolefillError::UserError(format!(
                    "failed to write output file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            eprintln!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            write_document(&mut stdout, &result.document)?;
        }
    }

    eprint!("{}", summary(&result));
    Ok(())
}

/// Fill the holes of `args.file` with the project's collaborators.
pub(crate) fn solve_file(
    ctx: &ProjectContext,
    config: &Config,
    args: &SolveArgs,
) -> Result<TaskResult> {
    let file = ctx.root.join(&args.file);
    let source = read_source(&file)?;
    let namespace = namespace_for(&file, args.namespace.as_deref())?;
    let options = task_options(config, args)?;
    let prompts = PromptSet::with_overrides(&config.prompt_templates)?;

    let mut store = FileStore::open(ctx.cache_dir(), &namespace)?;
    let history = RunHistory::open(ctx, &namespace, config.save_artifacts);
    let logs_dir = history
        .artifact_dir()
        .cloned()
        .unwrap_or_else(|| ctx.state_dir.join("logs").join(&namespace));
    info!(
        file = %file.display(),
        namespace = %namespace,
        cache = %store.path().display(),
        run = history.run_id(),
        "solving"
    );

    let mut generator =
        CommandModel::new("generator", config.generator.clone(), &ctx.root, &logs_dir);
    let mut critic = CommandModel::new("critic", config.critic_profile().clone(), &ctx.root, &logs_dir);
    let mut evaluator = CommandEvaluator::new(config.evaluator.clone(), &ctx.root, &logs_dir);

    let result = SynthesisTask::new(
        options,
        &mut store,
        &mut generator,
        &mut critic,
        &mut evaluator,
    )
    .with_prompts(prompts)
    .with_history(history)
    .run(&source)?;

    info!(
        generator_calls = generator.calls(),
        critic_calls = critic.calls(),
        "collaborators finished"
    );
    Ok(result)
}

/// Write the document exactly as reconstructed.
fn write_document(out: &mut impl Write, document: &str) -> Result<()> {
    out.write_all(document.as_bytes())
        .and_then(|()| out.flush())
        .map_err(|e| HolefillError::UserError(format!("failed to write output: {}", e)))
}

/// Cache namespace: the explicit one, else the file stem.
fn namespace_for(file: &Path, explicit: Option<&str>) -> Result<String> {
    let namespace = match explicit {
        Some(name) => name.to_string(),
        None => file
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                HolefillError::UserError(format!(
                    "cannot derive a cache namespace from '{}'.\n\
                     Fix: pass --namespace.",
                    file.display()
                ))
            })?,
    };
    validate_namespace(&namespace)?;
    Ok(namespace)
}

/// Task options from config with command-line overrides applied.
fn task_options(config: &Config, args: &SolveArgs) -> Result<TaskOptions> {
    let mut options = TaskOptions::from_config(config);

    if let Some(rounds) = args.rounds {
        if rounds == 0 {
            return Err(HolefillError::UserError(
                "--rounds must be greater than 0".to_string(),
            ));
        }
        options.max_rounds = rounds;
    }
    if args.no_evaluate {
        options.evaluate = false;
    }
    options.load = args.load;
    options.ext = parse_assignments(&args.ext)
        .map_err(|e| HolefillError::UserError(format!("invalid --ext value: {}", e)))?;
    options.query_ext = args.query_ext.clone();

    Ok(options)
}

/// Run summary printed to stderr.
fn summary(result: &TaskResult) -> String {
    let stats = &result.cache_stats;
    let mut out = format!(
        "Rounds used: {}\nElapsed:     {:.2}s\nCache:       {} added, {} updated, {} deleted, {} retained\n",
        result.rounds_used,
        result.elapsed.as_secs_f64(),
        stats.added,
        stats.updated,
        stats.deleted,
        stats.retained
    );
    if result.is_complete() {
        out.push_str("All holes resolved.\n");
    } else {
        out.push_str(&format!(
            "Unresolved:  {}\n",
            result.unresolved_hashes.join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FragmentStore, SyncStats};
    use crate::exit_codes;
    use crate::source::parse;
    use std::time::Duration;
    use tempfile::TempDir;

    fn solve_args(file: &str) -> SolveArgs {
        SolveArgs {
            file: file.into(),
            namespace: None,
            rounds: None,
            no_evaluate: false,
            load: false,
            ext: Vec::new(),
            query_ext: None,
            out: None,
        }
    }

    #[test]
    fn namespace_defaults_to_file_stem() {
        assert_eq!(
            namespace_for(Path::new("/work/coins.pl"), None).unwrap(),
            "coins"
        );
        assert_eq!(
            namespace_for(Path::new("/work/coins.pl"), Some("shared")).unwrap(),
            "shared"
        );
    }

    #[test]
    fn invalid_namespace_is_user_error() {
        let err = namespace_for(Path::new("a.pl"), Some("../escape")).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn options_apply_overrides() {
        let mut args = solve_args("a.pl");
        args.rounds = Some(5);
        args.no_evaluate = true;
        args.load = true;
        args.ext = vec!["City=Leuven".to_string()];
        args.query_ext = Some("query(a).".to_string());

        let options = task_options(&Config::default(), &args).unwrap();
        assert_eq!(options.max_rounds, 5);
        assert!(!options.evaluate);
        assert!(options.load);
        assert_eq!(options.ext["City"], "Leuven");
        assert_eq!(options.query_ext.as_deref(), Some("query(a)."));
    }

    #[test]
    fn zero_rounds_is_user_error() {
        let mut args = solve_args("a.pl");
        args.rounds = Some(0);
        let err = task_options(&Config::default(), &args).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn bad_ext_is_user_error() {
        let mut args = solve_args("a.pl");
        args.ext = vec!["novalue".to_string()];
        let err = task_options(&Config::default(), &args).unwrap_err();
        assert!(err.to_string().contains("invalid --ext value"));
    }

    #[test]
    fn document_is_written_without_extra_newline() {
        let mut out = Vec::new();
        write_document(&mut out, "fact(a).\nquery(fact(_)).").unwrap();
        assert_eq!(out, b"fact(a).\nquery(fact(_)).");
    }

    #[test]
    fn summary_lists_unresolved_holes() {
        let result = TaskResult {
            document: String::new(),
            elapsed: Duration::from_millis(1500),
            rounds_used: 3,
            unresolved_hashes: vec!["ABCD1234".to_string()],
            cache_stats: SyncStats {
                added: 1,
                ..SyncStats::default()
            },
        };
        let text = summary(&result);
        assert!(text.contains("Rounds used: 3"));
        assert!(text.contains("Elapsed:     1.50s"));
        assert!(text.contains("1 added, 0 updated, 0 deleted, 0 retained"));
        assert!(text.contains("Unresolved:  ABCD1234"));
    }

    #[test]
    fn missing_source_is_user_error() {
        let temp = TempDir::new().unwrap();
        let ctx = ProjectContext::resolve_from(temp.path());
        let err = solve_file(&ctx, &Config::default(), &solve_args("missing.pl")).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn unconfigured_generator_is_collaborator_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("prog.pl"), "a :- langda(LLM:\"x\").").unwrap();
        let ctx = ProjectContext::resolve_from(temp.path());

        let err = solve_file(&ctx, &Config::default(), &solve_args("prog.pl")).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::COLLABORATOR_FAILURE);
        assert!(err.to_string().contains("generator.command"));
    }

    #[cfg(unix)]
    #[test]
    fn solves_with_command_collaborators() {
        use crate::test_support::{code_response, report_response};

        let temp = TempDir::new().unwrap();
        let source = r#"fact(a). langda(LLM:"explain a"). query(fact(_))."#;
        std::fs::write(temp.path().join("prog.pl"), source).unwrap();
        let hash = parse(source).unwrap().holes[0].hash.clone();

        let generated = temp.path().join("generated.md");
        let reviewed = temp.path().join("reviewed.md");
        std::fs::write(&generated, code_response(&[(&hash, "fact_explained.")])).unwrap();
        std::fs::write(&reviewed, report_response(&[(&hash, false)])).unwrap();

        let mut config = Config::default();
        config.generator.command = format!("cat '{}'", generated.display());
        config.critic.command = format!("cat '{}'", reviewed.display());
        config.evaluator.command = "cat {program_file}".to_string();
        config.save_artifacts = true;
        let ctx = ProjectContext::resolve_from(temp.path());

        let result = solve_file(&ctx, &config, &solve_args("prog.pl")).unwrap();

        assert!(result.is_complete());
        assert_eq!(result.document, "fact(a).\nfact_explained.\nquery(fact(_)).");
        assert_eq!(result.cache_stats.added, 1);

        let store = FileStore::open(ctx.cache_dir(), "prog").unwrap();
        assert_eq!(store.get(&hash).unwrap().as_deref(), Some("fact_explained."));
        assert!(ctx.history_dir().join("prog.ndjson").exists());
    }
}
