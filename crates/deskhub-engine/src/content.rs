//! Blog post generation with a deterministic fallback.

use std::sync::Arc;
use std::time::Duration;

use tracing::{instrument, warn};

use deskhub_core::generation::{word_count, BlogLength, BlogRequest, BlogResponse, BlogStyle};
use deskhub_core::provider::{GenerateOptions, GenerativeModel};
use deskhub_store::{BlogPost, BlogRepo, Database};

use crate::budget::{within, DEFAULT_GENERATION_BUDGET};
use crate::error::{required, EngineError};

const NOTE_NOT_CONFIGURED: &str = "Configure GEMINI_API_KEY for AI content generation";
const NOTE_UNAVAILABLE: &str = "Fallback content - generation provider unavailable";

pub struct BlogGenerator {
    model: Option<Arc<dyn GenerativeModel>>,
    repo: BlogRepo,
    budget: Duration,
}

impl BlogGenerator {
    pub fn new(db: Database, model: Option<Arc<dyn GenerativeModel>>) -> Self {
        Self {
            model,
            repo: BlogRepo::new(db),
            budget: DEFAULT_GENERATION_BUDGET,
        }
    }

    /// Time allowed for the model call before falling back.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Generate a post. Provider failures degrade to fallback content; only
    /// validation and storage errors are returned.
    #[instrument(skip_all, fields(topic = %request.topic))]
    pub async fn generate(&self, request: &BlogRequest) -> Result<BlogResponse, EngineError> {
        let topic = required("topic", &request.topic)?;
        let length = BlogLength::parse_lenient(request.length.as_deref());
        let style = BlogStyle::parse_lenient(request.style.as_deref());

        let Some(model) = &self.model else {
            return Ok(fallback(topic, length, style, Fallback::NotConfigured));
        };

        let prompt = blog_prompt(&topic, length, style);
        let options = GenerateOptions::default();
        match within(self.budget, model.generate(&prompt, &options)).await {
            Ok(content) => {
                let words = word_count(&content);
                self.repo.insert(&topic, &content, words)?;
                Ok(BlogResponse {
                    content,
                    topic,
                    length,
                    style,
                    word_count: words,
                    model: Some(model.display_name().to_string()),
                    note: None,
                })
            }
            Err(e) => {
                warn!(provider = model.name(), error_kind = e.error_kind(), error = %e, "blog generation failed, using fallback");
                Ok(fallback(topic, length, style, Fallback::Unavailable))
            }
        }
    }

    /// Saved posts, newest first.
    pub fn list(&self) -> Result<Vec<BlogPost>, EngineError> {
        Ok(self.repo.list()?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fallback {
    NotConfigured,
    Unavailable,
}

fn style_instruction(topic: &str, style: BlogStyle) -> String {
    match style {
        BlogStyle::Informative => format!(
            "Write a comprehensive, informative blog post about {topic}. Use a professional tone with clear explanations and factual information."
        ),
        BlogStyle::Casual => format!(
            "Write a casual, friendly blog post about {topic}. Use a conversational tone as if talking to a friend."
        ),
        BlogStyle::Professional => format!(
            "Write a professional, business-oriented blog post about {topic}. Use formal language suitable for corporate audiences."
        ),
        BlogStyle::Creative => format!(
            "Write a creative, engaging blog post about {topic}. Use storytelling elements and imaginative language."
        ),
    }
}

pub fn blog_prompt(topic: &str, length: BlogLength, style: BlogStyle) -> String {
    format!(
        "{instruction}

Requirements:
- Length: {range}
- Include a compelling title
- Use proper headings and structure with markdown formatting
- Make it engaging and well-researched
- Include practical insights or actionable advice
- Use bullet points and numbered lists where appropriate
- Add a conclusion that summarizes key points

Topic: {topic}

Format the response with markdown headers (# ## ###).",
        instruction = style_instruction(topic, style),
        range = length.word_range(),
    )
}

fn fallback(topic: String, length: BlogLength, style: BlogStyle, kind: Fallback) -> BlogResponse {
    let (content, note) = match kind {
        Fallback::NotConfigured => (
            format!(
                "# {topic}

This is a sample blog post about {topic}.

Configure GEMINI_API_KEY in your .env file for AI-generated content.

## Sample Content

Your AI-generated blog post would appear here with proper formatting, engaging content, and a professional structure.
"
            ),
            NOTE_NOT_CONFIGURED,
        ),
        Fallback::Unavailable => (
            format!(
                "# {topic}

This is a sample blog post about {topic}.

## Introduction

{topic} is an important topic that deserves attention and discussion.

## Main Content

Here we would explore the various aspects of {topic}, providing insights and valuable information.

## Conclusion

In conclusion, {topic} offers many opportunities for learning and growth.

*The content generator is currently unavailable. Try again later.*
"
            ),
            NOTE_UNAVAILABLE,
        ),
    };

    BlogResponse {
        word_count: word_count(&content),
        content,
        topic,
        length,
        style,
        model: None,
        note: Some(note.to_string()),
    }
}
