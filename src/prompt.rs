use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Prompt texts keyed by document class, then by question type.
#[derive(Debug, Clone, Default)]
pub struct PromptCollection {
    prompts: HashMap<String, HashMap<String, String>>,
}

impl PromptCollection {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading prompt collection {}", path.display()))?;
        let prompts: HashMap<String, HashMap<String, String>> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing prompt collection {}", path.display()))?;
        Ok(Self { prompts })
    }

    pub fn prompt_for(&self, doc_class: &str, question_type: &str) -> Option<&str> {
        self.prompts
            .get(doc_class)?
            .get(question_type)
            .map(String::as_str)
    }
}

pub fn load_bundle_template(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading prompt template {}", path.display()))?;
    Ok(raw.trim().to_string())
}

/// The rendered prompt leads with the page count so the model knows how many
/// pages the request spans.
pub fn render_bundle_prompt(template: &str, page_count: usize) -> String {
    format!("{page_count} {template}")
}
