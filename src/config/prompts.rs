//! Prompt templates for tuberag.
//!
//! Prompts can be customized by placing a `rag.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub rag: RagPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for answer, summary and general chat generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub system: String,
    /// Answer prompt; `{{context_block}}` is `context` or `no_context`.
    pub user: String,
    pub context: String,
    pub no_context: String,
    pub summary: String,
    pub general: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an AI assistant that helps users understand YouTube video content. You have access to the transcript of a YouTube video and can answer questions based on that content.

Instructions:
1. Answer the user's question based primarily on the provided video transcript context
2. Be accurate and only use information from the provided context
3. If the context doesn't contain enough information to answer the question, say so clearly
4. Provide clear, concise, and helpful responses
5. If relevant, you can reference specific parts of the video content
6. Maintain a friendly and helpful tone"#.to_string(),

            user: r#"{{context_block}}User Question: {{question}}

Please provide a comprehensive answer based on the video transcript context above."#.to_string(),

            context: "Video Transcript Context:\n{{context}}\n\n".to_string(),

            no_context: "No specific video context was found for this query.\n\n".to_string(),

            summary: r#"Please provide a comprehensive summary of this YouTube video transcript.

Key points to include:
1. Main topic/theme of the video
2. Key points discussed
3. Important insights or conclusions
4. Structure/flow of the content

Transcript:
{{transcript}}

Please provide a clear and structured summary."#.to_string(),

            general: r#"You are a helpful AI assistant. The user is asking a general question not related to any specific video content.

User Question: {{question}}

Please provide a helpful and informative response."#.to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
