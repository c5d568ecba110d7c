//! Prompt Loader
//!
//! Loads prompt templates from the override directory or falls back to
//! embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;
use crate::directive::DirectiveMarkers;
use crate::domain::{LearnerChapterSession, Phase};
use crate::tutor::LearnerProfile;

/// Context for rendering prompt templates
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext {
    pub subject: String,
    pub track: String,
    pub level: String,
    pub style: String,
    pub chapter: String,
    pub phase: String,
    pub plan_ready_marker: String,
    pub resume_update_marker: String,
    /// Diagnostic questions expected before the plan
    pub assessment_questions: u32,
    pub study_plan: Option<String>,
    pub course_resume: Option<String>,
}

impl PromptContext {
    /// Build the context for one learner's session
    pub fn for_session(
        profile: &LearnerProfile,
        session: &LearnerChapterSession,
        markers: &DirectiveMarkers,
        assessment_questions: u32,
    ) -> Self {
        debug!(key = %session.key(), phase = %session.phase(), "PromptContext::for_session: called");
        Self {
            subject: profile.subject.clone(),
            track: profile.track.clone(),
            level: profile.level.clone(),
            style: profile.style.clone(),
            chapter: session.chapter_id().to_string(),
            phase: session.phase().to_string(),
            plan_ready_marker: markers.plan_ready.clone(),
            resume_update_marker: markers.resume_update.clone(),
            assessment_questions,
            study_plan: session.study_plan().map(str::to_string),
            course_resume: session.course_resume().map(str::to_string),
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (`tutor.prompts-dir`)
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that prefers templates found in `override_dir`
    pub fn new(override_dir: Option<&Path>) -> Self {
        debug!(?override_dir, "PromptLoader::new: called");
        let override_dir = override_dir.filter(|dir| dir.exists()).map(Path::to_path_buf);
        if override_dir.is_none() {
            debug!("PromptLoader::new: no override directory, using embedded prompts");
        }
        Self {
            hbs: Self::engine(),
            override_dir,
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            override_dir: None,
        }
    }

    // Markers and plans are plain text, not HTML
    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks `{override_dir}/{name}.pmt` first, then the embedded default.
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref dir) = self.override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt override {}: {}", path.display(), e));
            }
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template_name: &str, context: &PromptContext) -> Result<String> {
        debug!(%template_name, chapter = %context.chapter, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        info!("Rendering template '{}' for chapter {}", template_name, context.chapter);
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// System instruction for the session's current phase
    pub fn system_prompt(&self, phase: Phase, context: &PromptContext) -> Result<String> {
        self.render(embedded::template_for(phase), context)
    }

    /// Locally generated opening message
    pub fn greeting(&self, context: &PromptContext) -> Result<String> {
        Ok(self.render("greeting", context)?.trim().to_string())
    }
}
