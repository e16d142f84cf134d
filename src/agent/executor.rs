//! Collaborator subprocess executor.
//!
//! Executes configured commands with timeout, output capture, and error handling.

use crate::codec::{TemplateError, render_template};
use crate::config::CommandProfile;
use crate::error::{HolefillError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Result of executing a collaborator command.
#[derive(Debug, Clone)]
pub struct CommandRun {
    /// Exit code of the process (None if killed or didn't exit normally).
    pub exit_code: Option<i32>,
    /// Path to the stdout log file.
    pub stdout_path: PathBuf,
    /// Path to the stderr log file.
    pub stderr_path: PathBuf,
    /// Duration of execution.
    pub duration: Duration,
    /// Whether the process was killed due to timeout.
    pub timed_out: bool,
    /// The command that was executed (for logging).
    pub command: String,
}

impl CommandRun {
    /// Check if the execution was successful.
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Captured stdout.
    pub fn stdout(&self) -> Result<String> {
        read_log(&self.stdout_path)
    }

    /// Last `lines` lines of captured stderr, empty when unreadable.
    pub fn stderr_tail(&self, lines: usize) -> String {
        let content = read_log(&self.stderr_path).unwrap_or_default();
        let all: Vec<&str> = content.lines().collect();
        all[all.len().saturating_sub(lines)..].join("\n")
    }
}

/// Execute a collaborator command.
///
/// # Arguments
///
/// * `profile` - Command template and environment
/// * `label` - Log file stem (e.g. `generator-01`)
/// * `variables` - Template variables for command substitution
/// * `working_dir` - Working directory for the command
/// * `logs_dir` - Directory receiving `<label>.stdout.log` and `<label>.stderr.log`
/// * `timeout` - Maximum execution time before killing the process
pub fn execute_command(
    profile: &CommandProfile,
    label: &str,
    variables: &HashMap<String, String>,
    working_dir: &Path,
    logs_dir: &Path,
    timeout: Duration,
) -> Result<CommandRun> {
    // Render each argument separately so substituted paths never need quoting
    let template_args = shell_words::split(&profile.command).map_err(|e| {
        HolefillError::CollaboratorError(format!(
            "failed to parse {} command '{}': {}\n\
             Fix: check for unmatched quotes or invalid escape sequences.",
            label, profile.command, e
        ))
    })?;

    let args = template_args
        .iter()
        .map(|arg| render_template(arg, variables))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| match e {
            TemplateError::UndefinedVariable { name, .. } => {
                HolefillError::CollaboratorError(format!(
                    "{} command template references undefined variable '{}'\n\
                     Command: {}\n\
                     Available variables: {}",
                    label,
                    name,
                    profile.command,
                    format_vars(variables)
                ))
            }
            other => HolefillError::CollaboratorError(format!(
                "{} command template is invalid: {}",
                label, other
            )),
        })?;

    if args.is_empty() {
        return Err(HolefillError::CollaboratorError(format!(
            "{} command is empty after parsing: '{}'",
            label, profile.command
        )));
    }
    let command_str = shell_words::join(&args);

    std::fs::create_dir_all(logs_dir).map_err(|e| {
        HolefillError::CollaboratorError(format!(
            "failed to create log directory '{}': {}",
            logs_dir.display(),
            e
        ))
    })?;

    let stdout_path = logs_dir.join(format!("{}.stdout.log", label));
    let stderr_path = logs_dir.join(format!("{}.stderr.log", label));

    let stdout_file = create_log(&stdout_path)?;
    let stderr_file = create_log(&stderr_path)?;

    let program = &args[0];
    let mut command = Command::new(program);
    command
        .args(&args[1..])
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file));

    // Merge environment variables
    for (key, value) in &profile.environment {
        command.env(key, value);
    }

    let start_time = Instant::now();
    let mut child = command.spawn().map_err(|e| {
        HolefillError::CollaboratorError(format!(
            "failed to execute {} command '{}': {}\n\
             Fix: ensure the command is installed and in PATH.",
            label, program, e
        ))
    })?;

    let (exit_code, timed_out) = wait_with_timeout(&mut child, timeout)?;
    let duration = start_time.elapsed();

    Ok(CommandRun {
        exit_code,
        stdout_path,
        stderr_path,
        duration,
        timed_out,
        command: command_str,
    })
}

fn create_log(path: &Path) -> Result<std::fs::File> {
    std::fs::File::create(path).map_err(|e| {
        HolefillError::CollaboratorError(format!(
            "failed to create log '{}': {}",
            path.display(),
            e
        ))
    })
}

fn read_log(path: &Path) -> Result<String> {
    std::fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|e| {
            HolefillError::CollaboratorError(format!(
                "failed to read log '{}': {}",
                path.display(),
                e
            ))
        })
}

/// Wait for a child process with timeout.
///
/// Returns (exit_code, timed_out).
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<(Option<i32>, bool)> {
    let start = Instant::now();
    let poll_interval = Duration::from_millis(50);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return Ok((status.code(), false));
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    kill_process(child);
                    return Ok((None, true));
                }
                std::thread::sleep(poll_interval);
            }
            Err(e) => {
                return Err(HolefillError::CollaboratorError(format!(
                    "failed to check process status: {}",
                    e
                )));
            }
        }
    }
}

/// Kill a process and wait for it to terminate.
fn kill_process(child: &mut Child) {
    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
    let _ = child.kill();
    let _ = child.wait();
}

/// Format variables for error messages.
fn format_vars(vars: &HashMap<String, String>) -> String {
    let mut keys: Vec<_> = vars.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::vars;
    use tempfile::TempDir;

    fn profile(command: &str) -> CommandProfile {
        CommandProfile {
            command: command.to_string(),
            ..CommandProfile::default()
        }
    }

    fn run(
        temp_dir: &TempDir,
        profile: &CommandProfile,
        variables: &HashMap<String, String>,
    ) -> Result<CommandRun> {
        execute_command(
            profile,
            "test",
            variables,
            temp_dir.path(),
            &temp_dir.path().join("logs"),
            Duration::from_secs(10),
        )
    }

    #[test]
    fn test_execute_simple_command() {
        let temp_dir = TempDir::new().unwrap();

        #[cfg(windows)]
        let profile = profile("cmd /c echo hello");
        #[cfg(not(windows))]
        let profile = profile("echo hello");

        let result = run(&temp_dir, &profile, &HashMap::new()).unwrap();

        assert!(result.is_success());
        assert_eq!(result.exit_code, Some(0));
        assert!(!result.timed_out);
        assert!(result.stdout().unwrap().contains("hello"));
        assert!(result.stderr_path.exists());
    }

    #[test]
    fn test_execute_with_variables() {
        let temp_dir = TempDir::new().unwrap();

        #[cfg(windows)]
        let profile = profile("cmd /c echo {role} {round}");
        #[cfg(not(windows))]
        let profile = profile("echo {role} {round}");

        let variables = vars([("role", "generator"), ("round", "2")]);
        let result = run(&temp_dir, &profile, &variables).unwrap();

        assert!(result.is_success());
        assert!(result.stdout().unwrap().contains("generator 2"));
    }

    #[cfg(unix)]
    #[test]
    fn test_substituted_value_stays_one_argument() {
        let temp_dir = TempDir::new().unwrap();
        let profile = profile("sh -c 'printf \"%s|\" \"$@\"' sh {prompt_file}");
        let variables = vars([("prompt_file", "with space.md")]);

        let result = run(&temp_dir, &profile, &variables).unwrap();
        assert_eq!(result.stdout().unwrap(), "with space.md|");
    }

    #[test]
    fn test_execute_nonzero_exit() {
        let temp_dir = TempDir::new().unwrap();

        #[cfg(windows)]
        let profile = profile("cmd /c exit 1");
        #[cfg(not(windows))]
        let profile = profile("sh -c \"echo broken >&2; exit 1\"");

        let result = run(&temp_dir, &profile, &HashMap::new()).unwrap();

        assert!(!result.is_success());
        assert_eq!(result.exit_code, Some(1));
        assert!(!result.timed_out);
        if cfg!(not(windows)) {
            assert_eq!(result.stderr_tail(5), "broken");
        }
    }

    #[test]
    fn test_execute_timeout() {
        let temp_dir = TempDir::new().unwrap();

        #[cfg(windows)]
        let profile = profile("cmd /c ping -n 10 127.0.0.1");
        #[cfg(not(windows))]
        let profile = profile("sleep 10");

        let result = execute_command(
            &profile,
            "test",
            &HashMap::new(),
            temp_dir.path(),
            temp_dir.path(),
            Duration::from_millis(300),
        )
        .unwrap();

        assert!(!result.is_success());
        assert!(result.timed_out);
        assert!(result.duration < Duration::from_secs(10));
    }

    #[test]
    fn test_undefined_variable_error() {
        let temp_dir = TempDir::new().unwrap();
        let profile = profile("echo {undefined}");

        let err = run(&temp_dir, &profile, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("undefined variable 'undefined'"));
    }

    #[test]
    fn test_invalid_command_error() {
        let temp_dir = TempDir::new().unwrap();
        let profile = profile("echo \"unmatched");

        let err = run(&temp_dir, &profile, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn test_empty_command_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = run(&temp_dir, &profile("  "), &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_nonexistent_command_error() {
        let temp_dir = TempDir::new().unwrap();
        let profile = profile("nonexistent_command_xyz_123");

        let err = run(&temp_dir, &profile, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("failed to execute"));
    }

    #[test]
    fn test_execute_creates_log_directory() {
        let temp_dir = TempDir::new().unwrap();
        let logs_dir = temp_dir.path().join("logs");
        assert!(!logs_dir.exists());

        #[cfg(windows)]
        let profile = profile("cmd /c echo test");
        #[cfg(not(windows))]
        let profile = profile("echo test");

        run(&temp_dir, &profile, &HashMap::new()).unwrap();

        assert!(logs_dir.join("test.stdout.log").exists());
    }

    #[test]
    fn test_execute_with_environment() {
        let temp_dir = TempDir::new().unwrap();

        #[cfg(windows)]
        let mut profile = profile("cmd /c echo %TEST_VAR%");
        #[cfg(not(windows))]
        let mut profile = profile("sh -c \"echo $TEST_VAR\"");
        profile
            .environment
            .insert("TEST_VAR".to_string(), "test_value".to_string());

        let result = run(&temp_dir, &profile, &HashMap::new()).unwrap();

        assert!(result.is_success());
        assert!(result.stdout().unwrap().contains("test_value"));
    }
}
