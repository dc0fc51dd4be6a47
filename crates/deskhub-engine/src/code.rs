//! Code snippet generation: one call for the code, one for its explanation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{instrument, warn};

use deskhub_core::errors::UpstreamError;
use deskhub_core::generation::{snippet_title, CodeRequest, CodeResponse, DEFAULT_CODE_LANGUAGE};
use deskhub_core::provider::{GenerateOptions, GenerativeModel};
use deskhub_store::{CodeSnippet, Database, SnippetRepo};

use crate::budget::{within, DEFAULT_GENERATION_BUDGET};
use crate::error::{required, EngineError};

const NOTE_NOT_CONFIGURED: &str = "Configure GEMINI_API_KEY for AI code generation";
const NOTE_UNAVAILABLE: &str = "Fallback code - generation provider unavailable";

pub struct CodeGenerator {
    model: Option<Arc<dyn GenerativeModel>>,
    repo: SnippetRepo,
    budget: Duration,
}

impl CodeGenerator {
    pub fn new(db: Database, model: Option<Arc<dyn GenerativeModel>>) -> Self {
        Self {
            model,
            repo: SnippetRepo::new(db),
            budget: DEFAULT_GENERATION_BUDGET,
        }
    }

    /// Time allowed for both model calls together.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    #[instrument(skip_all, fields(language = %request.language))]
    pub async fn generate(&self, request: &CodeRequest) -> Result<CodeResponse, EngineError> {
        let description = required("description", &request.description)?;
        let language = match request.language.trim() {
            "" => DEFAULT_CODE_LANGUAGE.to_string(),
            lang => lang.to_string(),
        };
        let title = snippet_title(&description);

        let Some(model) = &self.model else {
            return Ok(fallback(description, language, title, false));
        };

        match within(self.budget, generate_live(model.as_ref(), &description, &language)).await {
            Ok((code, explanation)) => {
                self.repo.insert(&title, &language, &code, &explanation)?;
                Ok(CodeResponse {
                    code,
                    language,
                    description,
                    explanation,
                    title,
                    model: Some(model.display_name().to_string()),
                    note: None,
                })
            }
            Err(e) => {
                warn!(provider = model.name(), error_kind = e.error_kind(), error = %e, "code generation failed, using fallback");
                Ok(fallback(description, language, title, true))
            }
        }
    }

    /// Saved snippets, newest first.
    pub fn list(&self) -> Result<Vec<CodeSnippet>, EngineError> {
        Ok(self.repo.list()?)
    }
}

async fn generate_live(
    model: &dyn GenerativeModel,
    description: &str,
    language: &str,
) -> Result<(String, String), UpstreamError> {
    let options = GenerateOptions::default();
    let code = model.generate(&code_prompt(description, language), &options).await?;
    let explanation = model
        .generate(&explanation_prompt(&code, language), &options)
        .await?;
    Ok((code, explanation))
}

pub fn code_prompt(description: &str, language: &str) -> String {
    format!(
        "Generate {language} code for the following requirement:
{description}

Requirements:
- Write clean, well-commented code
- Include error handling where appropriate
- Add example usage if applicable
- Follow best practices for {language}
- Include docstrings/comments explaining the functionality
- Use modern {language} features and conventions

Provide only the code with comments, no additional explanation outside the code."
    )
}

pub fn explanation_prompt(code: &str, language: &str) -> String {
    format!(
        "Explain this {language} code in simple terms:

{code}

Provide:
1. What the code does (main purpose)
2. How it works (step by step)
3. Key features or concepts used
4. When and why to use this code
5. Any important notes about the implementation

Make the explanation clear for developers of all levels."
    )
}

/// Line-comment marker for the fallback snippet.
fn comment_prefix(language: &str) -> &'static str {
    match language.to_ascii_lowercase().as_str() {
        "rust" | "javascript" | "typescript" | "java" | "c" | "c++" | "cpp" | "c#" | "csharp"
        | "go" | "swift" | "kotlin" | "scala" | "dart" | "php" => "//",
        "sql" | "lua" | "haskell" => "--",
        _ => "#",
    }
}

fn fallback(description: String, language: String, title: String, provider_failed: bool) -> CodeResponse {
    let c = comment_prefix(&language);
    let (code, explanation, note) = if provider_failed {
        (
            format!(
                "{c} {description}\n{c} Sample {language} snippet.\n{c} The code generator is currently unavailable; try again later.\n"
            ),
            "This is a sample code snippet. The code generator could not be reached.".to_string(),
            NOTE_UNAVAILABLE,
        )
    } else {
        (
            format!(
                "{c} {description}\n{c} Configure GEMINI_API_KEY for AI-generated code.\n{c} Then you'll get generated {language} code here.\n"
            ),
            "Configure GEMINI_API_KEY in your .env file for AI-generated code.".to_string(),
            NOTE_NOT_CONFIGURED,
        )
    };

    CodeResponse {
        code,
        language,
        description,
        explanation,
        title,
        model: None,
        note: Some(note.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskhub_llm::{MockModel, MockResponse};

    fn request(description: &str, language: &str) -> CodeRequest {
        CodeRequest {
            description: description.into(),
            language: language.into(),
        }
    }

    #[tokio::test]
    async fn live_makes_two_calls_and_persists() {
        let mock = Arc::new(MockModel::new(vec![
            MockResponse::text("fn add(a: i32, b: i32) -> i32 { a + b }"),
            MockResponse::text("Adds two numbers."),
        ]));
        let gen = CodeGenerator::new(Database::in_memory().unwrap(), Some(mock.clone()));

        let resp = gen.generate(&request("add two numbers", "rust")).await.unwrap();
        assert_eq!(resp.code, "fn add(a: i32, b: i32) -> i32 { a + b }");
        assert_eq!(resp.explanation, "Adds two numbers.");
        assert_eq!(resp.title, "add two numbers");
        assert_eq!(resp.model.as_deref(), Some("Mock Model"));

        let prompts = mock.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Generate rust code"));
        assert!(prompts[1].contains("fn add"));

        let saved = gen.list().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].description, "Adds two numbers.");
        assert_eq!(saved[0].language, "rust");
    }

    #[tokio::test]
    async fn long_description_title_is_truncated() {
        let gen = CodeGenerator::new(Database::in_memory().unwrap(), None);
        let description = "parse a CSV file, group rows by the first column and sum the rest";
        let resp = gen.generate(&request(description, "python")).await.unwrap();
        assert_eq!(resp.title, format!("{}...", &description[..50]));
    }

    #[tokio::test]
    async fn unconfigured_fallback() {
        let gen = CodeGenerator::new(Database::in_memory().unwrap(), None);
        let resp = gen.generate(&request("reverse a list", "python")).await.unwrap();
        assert!(resp.code.starts_with("# reverse a list"));
        assert_eq!(resp.note.as_deref(), Some(NOTE_NOT_CONFIGURED));
        assert!(gen.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn explanation_failure_falls_back_without_persisting() {
        let mock = Arc::new(MockModel::new(vec![
            MockResponse::text("console.log('hi')"),
            MockResponse::Error(UpstreamError::ProviderOverloaded),
        ]));
        let gen = CodeGenerator::new(Database::in_memory().unwrap(), Some(mock));
        let resp = gen.generate(&request("say hi", "javascript")).await.unwrap();

        assert!(resp.code.starts_with("// say hi"));
        assert_eq!(resp.note.as_deref(), Some(NOTE_UNAVAILABLE));
        assert!(gen.list().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn budget_covers_both_calls() {
        let mock = Arc::new(MockModel::new(vec![
            MockResponse::delayed(Duration::from_millis(1500), MockResponse::text("print('hi')")),
            MockResponse::delayed(Duration::from_millis(1500), MockResponse::text("Prints hi.")),
        ]));
        let gen = CodeGenerator::new(Database::in_memory().unwrap(), Some(mock.clone()))
            .with_budget(Duration::from_secs(2));

        let resp = gen.generate(&request("say hi", "python")).await.unwrap();
        assert_eq!(mock.call_count(), 2);
        assert_eq!(resp.note.as_deref(), Some(NOTE_UNAVAILABLE));
        assert!(resp.model.is_none());
        assert!(gen.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_description_is_rejected() {
        let gen = CodeGenerator::new(Database::in_memory().unwrap(), None);
        assert!(matches!(
            gen.generate(&request("", "python")).await,
            Err(EngineError::Validation(_))
        ));
    }
}
