//! Prompt Template System
//!
//! Renders the tutor's system instruction from `.pmt` templates.
//!
//! Template loading chain:
//! 1. `{prompts-dir}/{name}.pmt` (user override, from `tutor.prompts-dir`)
//! 2. Embedded default compiled into the binary
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{PromptContext, PromptLoader};
