//! Source templates: fixed text with ordered hole placeholders.

use serde::Serialize;

use super::scanner::SYMBOL_CHARS;

/// Source text with every hole replaced by a placeholder.
///
/// Stored as the fixed segments between placeholders, so a template with
/// `n` holes always has `n + 1` segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    segments: Vec<String>,
}

impl Template {
    /// Build a template directly from its segments.
    ///
    /// An empty list is treated as a single empty segment.
    pub fn from_segments(mut segments: Vec<String>) -> Self {
        if segments.is_empty() {
            segments.push(String::new());
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of placeholders.
    pub fn hole_count(&self) -> usize {
        self.segments.len() - 1
    }

    /// Render with the given placeholder token at every hole.
    pub fn render(&self, placeholder: &str) -> String {
        self.segments.join(placeholder)
    }
}

/// Accumulates fixed text and holes in source order.
#[derive(Debug, Default)]
pub(crate) struct TemplateBuilder {
    raw: Vec<String>,
    comments: Vec<Vec<String>>,
    current: String,
}

impl TemplateBuilder {
    /// Append text that appears verbatim in the template.
    pub fn push_fixed(&mut self, text: &str) {
        self.current.push_str(text);
    }

    /// Append an inline replacement preceded by its comments.
    pub fn push_inline(&mut self, comments: &[String], text: &str) {
        for comment in comments {
            self.current.push_str(comment);
            self.current.push('\n');
        }
        self.current.push_str(text);
    }

    /// Close the current segment at a hole.
    pub fn push_hole(&mut self, comments: Vec<String>) {
        self.raw.push(std::mem::take(&mut self.current));
        self.comments.push(comments);
    }

    pub fn finish(mut self) -> Template {
        self.raw.push(std::mem::take(&mut self.current));
        let holes = self.comments.len();
        if holes == 0 {
            return Template::from_segments(self.raw);
        }

        let segments = self
            .raw
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let mut out = if i == 0 {
                    leading_segment(raw)
                } else if i < holes {
                    middle_segment(raw)
                } else {
                    trailing_segment(raw)
                };
                if let Some(comments) = self.comments.get(i) {
                    for comment in comments {
                        out.push_str(comment);
                        out.push('\n');
                    }
                }
                out
            })
            .collect();

        Template::from_segments(segments)
    }
}

/// Text before the first hole: trailing whitespace becomes one newline.
fn leading_segment(raw: &str) -> String {
    let core = raw.trim_end();
    if core.is_empty() {
        String::new()
    } else {
        format!("{core}\n")
    }
}

/// Text between two holes, each side separated by one newline.
fn middle_segment(raw: &str) -> String {
    let core = after_hole(raw);
    let core = core.trim_end();
    if core.is_empty() {
        "\n".to_string()
    } else {
        format!("\n{core}\n")
    }
}

/// Text after the last hole. Its tail is preserved as written.
fn trailing_segment(raw: &str) -> String {
    let core = after_hole(raw);
    if !core.trim().is_empty() {
        format!("\n{core}")
    } else if raw.contains('\n') {
        "\n".to_string()
    } else {
        String::new()
    }
}

/// Strip leading whitespace and put a terminating `.` on its own line.
fn after_hole(raw: &str) -> String {
    let rest = raw.trim_start();
    match rest.strip_prefix('.') {
        Some(tail)
            if !tail.starts_with(|c: char| c.is_ascii_digit() || SYMBOL_CHARS.contains(c)) =>
        {
            if tail.trim().is_empty() {
                format!(".{tail}")
            } else {
                format!(".\n{}", tail.trim_start())
            }
        }
        _ => rest.to_string(),
    }
}
