//! Answer generation with a chat model.

use crate::config::{GenerationSettings, Prompts};
use crate::error::{Result, TubeRagError};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Transcript characters sent for summarization.
const SUMMARY_INPUT_CHARS: usize = 8000;
const SUMMARY_MAX_TOKENS: u32 = 500;
const SUMMARY_TEMPERATURE: f32 = 0.3;

/// Trait for text generation backends.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Answer `query` grounded in `context`. A blank context is allowed.
    async fn generate(&self, query: &str, context: &str) -> Result<String>;

    /// Summarize a full transcript.
    async fn summarize(&self, transcript: &str) -> Result<String>;

    /// Answer a general question with no video context.
    async fn chat_without_context(&self, query: &str) -> Result<String>;
}

/// OpenAI chat-completion generator.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    prompts: Prompts,
}

impl OpenAIGenerator {
    /// Create a generator from settings.
    pub fn new(settings: &GenerationSettings) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            prompts: Prompts::default(),
        })
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn answer_prompt(&self, query: &str, context: &str) -> String {
        let context_block = if context.trim().is_empty() {
            self.prompts.rag.no_context.clone()
        } else {
            let mut vars = HashMap::new();
            vars.insert("context".to_string(), context.to_string());
            self.prompts.render_with_custom(&self.prompts.rag.context, &vars)
        };

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), query.to_string());
        vars.insert("context_block".to_string(), context_block);
        self.prompts.render_with_custom(&self.prompts.rag.user, &vars)
    }

    fn summary_prompt(&self, transcript: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("transcript".to_string(), truncate_transcript(transcript));
        self.prompts.render_with_custom(&self.prompts.rag.summary, &vars)
    }

    fn general_prompt(&self, query: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), query.to_string());
        self.prompts.render_with_custom(&self.prompts.rag.general, &vars)
    }

    async fn complete(
        &self,
        system: Option<&str>,
        user: String,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();

        if let Some(system) = system {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system.to_string())
                    .build()
                    .map_err(|e| TubeRagError::Generation(e.to_string()))?
                    .into(),
            );
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| TubeRagError::Generation(e.to_string()))?
                .into(),
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_completion_tokens(max_tokens)
            .temperature(temperature)
            .build()
            .map_err(|e| TubeRagError::Generation(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            TubeRagError::Generation(format!("Failed to generate response: {}", e))
        })?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| TubeRagError::Generation("Empty response from model".to_string()))
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    #[instrument(skip(self, context), fields(context_chars = context.len()))]
    async fn generate(&self, query: &str, context: &str) -> Result<String> {
        info!("Generating answer");
        let prompt = self.answer_prompt(query, context);
        let answer = self
            .complete(Some(&self.prompts.rag.system), prompt, self.max_tokens, self.temperature)
            .await?;
        debug!("Generated answer of {} characters", answer.len());
        Ok(answer)
    }

    #[instrument(skip_all, fields(transcript_chars = transcript.len()))]
    async fn summarize(&self, transcript: &str) -> Result<String> {
        info!("Generating summary");
        let prompt = self.summary_prompt(transcript);
        self.complete(None, prompt, SUMMARY_MAX_TOKENS, SUMMARY_TEMPERATURE)
            .await
    }

    #[instrument(skip(self))]
    async fn chat_without_context(&self, query: &str) -> Result<String> {
        let prompt = self.general_prompt(query);
        self.complete(None, prompt, self.max_tokens, self.temperature)
            .await
    }
}

/// Cut a transcript to the summarization budget, marking the cut.
fn truncate_transcript(transcript: &str) -> String {
    if transcript.chars().count() > SUMMARY_INPUT_CHARS {
        let head: String = transcript.chars().take(SUMMARY_INPUT_CHARS).collect();
        format!("{}...", head)
    } else {
        transcript.to_string()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Echoes its inputs and records the contexts it was given.
    #[derive(Default)]
    pub struct EchoGenerator {
        pub contexts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, query: &str, context: &str) -> Result<String> {
            self.contexts.lock().unwrap().push(context.to_string());
            Ok(format!("answer to: {}", query))
        }

        async fn summarize(&self, transcript: &str) -> Result<String> {
            Ok(format!("summary of {} characters", transcript.chars().count()))
        }

        async fn chat_without_context(&self, query: &str) -> Result<String> {
            Ok(format!("general answer to: {}", query))
        }
    }
}
