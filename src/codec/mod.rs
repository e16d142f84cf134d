//! Requirements and response codec.
//!
//! - **template**: `{variable}` substitution shared by prompts and commands
//! - **prompt**: requirement/report blocks and the built-in prompt templates
//! - **response**: fenced-block extraction and decoding of fragments and
//!   critic reports

mod prompt;
mod response;
mod template;


pub use prompt::{PromptSet, report_block, requirement_block};
pub use response::{Report, Verdict, parse_fragments, parse_reports};
pub use template::{TemplateError, render_template, vars};
