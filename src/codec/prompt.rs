//! Prompt construction for the generator and the critic.

use std::collections::{BTreeMap, HashMap};

use super::template::{TemplateError, referenced_variables, render_template, vars};
use crate::error::{HolefillError, Result};
use crate::source::HoleRecord;

/// Built-in prompt asking for the first version of each hole.
pub const GENERATE_TEMPLATE: &str = r#"You are completing a ProbLog program. Each <Hole> block in the program
below marks code that is missing; its <Requirements> say what the code must do.

Available tools: {tools}

<Program>
{program}
</Program>

Write the code for each of the {count} hole(s): {hashes}.
Answer with one fenced block per hole, exactly in this form:

```problog
{{"HASH": "<hash of the hole>", "Code": "<code that replaces the hole>"}}
```

The code must be valid ProbLog, must not repeat code outside the hole, and
must escape newlines inside the JSON string as \n.
"#;

/// Built-in prompt asking to redo holes whose code was rejected.
pub const REGENERATE_TEMPLATE: &str = r#"You are repairing a ProbLog program. Each <Hole> block in the program
below marks code that was generated before and rejected. Its <Requirements>
say what the code must do and its <Feedback> says what went wrong.

Available tools: {tools}

<Program>
{program}
</Program>

Write new code for each of the {count} hole(s): {hashes}.
Answer with one fenced block per hole, exactly in this form:

```problog
{{"HASH": "<hash of the hole>", "Code": "<code that replaces the hole>"}}
```

The code must be valid ProbLog, must not repeat code outside the hole, and
must escape newlines inside the JSON string as \n.
"#;

/// Built-in prompt asking the critic for a verdict per fragment.
pub const EVALUATE_TEMPLATE: &str = r#"You are reviewing generated code in a ProbLog program.

<Program>
{program}
</Program>

{result}

These {count} code block(s) were generated for the holes of the program:

{reports}

Decide for each block whether it meets its requirements and works with the
rest of the program. Answer with one fenced block per code block:

```report
{{"HASH": "<hash>", "ErrorSummary": "<what is wrong>", "SuggestedFix": "<how to fix it>", "NeedRegenerate": true}}
```

Use "NeedRegenerate": false when the code is correct.
"#;

/// The three prompts a task renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PromptKind {
    Generate,
    Regenerate,
    Evaluate,
}

impl PromptKind {
    pub const ALL: [PromptKind; 3] = [
        PromptKind::Generate,
        PromptKind::Regenerate,
        PromptKind::Evaluate,
    ];

    /// Name used in config overrides and artifact file names.
    pub fn name(self) -> &'static str {
        match self {
            PromptKind::Generate => "generate",
            PromptKind::Regenerate => "regenerate",
            PromptKind::Evaluate => "evaluate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Variables available to templates of this kind.
    pub fn variables(self) -> &'static [&'static str] {
        match self {
            PromptKind::Generate | PromptKind::Regenerate => {
                &["program", "tools", "count", "hashes"]
            }
            PromptKind::Evaluate => &["program", "result", "reports", "count"],
        }
    }

    fn builtin(self) -> &'static str {
        match self {
            PromptKind::Generate => GENERATE_TEMPLATE,
            PromptKind::Regenerate => REGENERATE_TEMPLATE,
            PromptKind::Evaluate => EVALUATE_TEMPLATE,
        }
    }
}

/// Prompt templates in effect for a task.
#[derive(Debug, Clone)]
pub struct PromptSet {
    templates: HashMap<PromptKind, String>,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            templates: PromptKind::ALL
                .into_iter()
                .map(|k| (k, k.builtin().to_string()))
                .collect(),
        }
    }
}

impl PromptSet {
    /// Built-in templates with `overrides` (keyed by prompt name) applied.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self> {
        let mut set = Self::default();
        for (name, template) in overrides {
            let kind = PromptKind::from_name(name).ok_or_else(|| {
                HolefillError::ConfigError(format!(
                    "unknown prompt template '{}' (expected generate, regenerate or evaluate)",
                    name
                ))
            })?;
            check_template(kind, template)?;
            set.templates.insert(kind, template.clone());
        }
        Ok(set)
    }

    pub fn template(&self, kind: PromptKind) -> &str {
        self.templates
            .get(&kind)
            .map_or_else(|| kind.builtin(), String::as_str)
    }

    /// Prompt for the generator.
    ///
    /// Uses the regenerate template when any pending hole carries feedback.
    pub fn generation_prompt(
        &self,
        program: &str,
        tools: &[String],
        hashes: &[&str],
        regenerate: bool,
    ) -> Result<String> {
        let kind = if regenerate {
            PromptKind::Regenerate
        } else {
            PromptKind::Generate
        };
        let variables = vars([
            ("program", program.to_string()),
            ("tools", tools_list(tools)),
            ("count", hashes.len().to_string()),
            ("hashes", hashes.join(", ")),
        ]);
        render(kind, self.template(kind), &variables)
    }

    /// Prompt for the critic.
    pub fn evaluation_prompt(
        &self,
        program: &str,
        evaluation: Option<&str>,
        reports: &[String],
    ) -> Result<String> {
        let variables = vars([
            ("program", program.to_string()),
            ("result", evaluation.map(result_section).unwrap_or_default()),
            ("reports", reports.join("\n\n")),
            ("count", reports.len().to_string()),
        ]);
        render(
            PromptKind::Evaluate,
            self.template(PromptKind::Evaluate),
            &variables,
        )
    }
}

fn check_template(kind: PromptKind, template: &str) -> Result<()> {
    let names = referenced_variables(template).map_err(|e| template_error(kind, e))?;
    if let Some(unknown) = names.iter().find(|n| !kind.variables().contains(&n.as_str())) {
        return Err(HolefillError::ConfigError(format!(
            "prompt template '{}' uses unknown variable '{}' (available: {})",
            kind.name(),
            unknown,
            kind.variables().join(", ")
        )));
    }
    Ok(())
}

fn render(kind: PromptKind, template: &str, variables: &HashMap<String, String>) -> Result<String> {
    render_template(template, variables).map_err(|e| template_error(kind, e))
}

fn template_error(kind: PromptKind, err: TemplateError) -> HolefillError {
    HolefillError::ConfigError(format!("prompt template '{}': {}", kind.name(), err))
}

fn tools_list(tools: &[String]) -> String {
    if tools.is_empty() {
        "none".to_string()
    } else {
        tools.join(", ")
    }
}

/// Describe one hole for the generator.
pub fn requirement_block(hole: &HoleRecord, feedback: Option<&str>) -> String {
    let mut lines = vec!["<Hole>".to_string(), format!("<HASH>{}</HASH>", hole.hash)];
    if let Some(tool) = &hole.tool {
        lines.push(format!("<Tool>{}</Tool>", tool));
    }
    if let Some(network) = &hole.network {
        lines.push(format!("<Network>{}</Network>", network));
    }
    lines.push(format!("<Requirements>{}</Requirements>", hole.requirement));
    if let Some(feedback) = feedback.filter(|f| !f.trim().is_empty()) {
        lines.push(format!("<Feedback>{}</Feedback>", feedback.trim()));
    }
    lines.push("</Hole>".to_string());
    lines.join("\n")
}

/// Describe one generated fragment for the critic.
pub fn report_block(hole: &HoleRecord, code: &str) -> String {
    let mut lines = vec![
        "<Hole>".to_string(),
        format!("<Code_Block>{}</Code_Block>", code),
        format!("<HASH>{}</HASH>", hole.hash),
    ];
    if let Some(tool) = &hole.tool {
        lines.push(format!("<Tool>{}</Tool>", tool));
    }
    lines.push(format!("<Requirements>{}</Requirements>", hole.requirement));
    lines.push("</Hole>".to_string());
    lines.join("\n")
}

/// Wrap evaluator output for the critic.
pub fn result_section(evaluation: &str) -> String {
    format!(
        "<Result>\nResult of running the program:\n{}\n</Result>",
        evaluation.trim_end()
    )
}
