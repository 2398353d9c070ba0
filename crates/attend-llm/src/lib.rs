//! Name plausibility filter for attendance imports.
//!
//! Quiz exports collect whatever people typed into a name box, so the
//! participant list picks up placeholders ("Hi", "Test"), single letters and
//! stray header text. This crate asks an `OpenAI`-compatible chat completions
//! endpoint which of the names look like real people.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use attend_core::Screening;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BASE_URL: &str = "https://ai.hackclub.com/proxy/v1";
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
const SCREENING_TEMPERATURE: f32 = 0.1;

/// LLM client errors.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provided API key was invalid.
    #[error("invalid API key: {reason}")]
    InvalidApiKey { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error: {message}")]
    Api { message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Chat completions client.
///
/// Cloning shares the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client with the given API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or whitespace-only, or if
    /// the HTTP client fails to build.
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();

        if api_key.is_empty() {
            return Err(LlmError::InvalidApiKey {
                reason: "API key cannot be empty",
            });
        }
        if api_key.trim().is_empty() {
            return Err(LlmError::InvalidApiKey {
                reason: "API key cannot be whitespace-only",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(LlmError::ClientBuild)?;

        Ok(Self {
            http,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Points the client at another `OpenAI`-compatible endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Asks the model which of `names` are real person names.
    ///
    /// The result keeps input order and never contains a name that was not
    /// in `names`.
    pub async fn screen_names(&self, model: &str, names: &[String]) -> Result<Vec<String>, LlmError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let request = ChatRequest {
            model: model.to_string(),
            temperature: SCREENING_TEMPERATURE,
            messages: vec![Message {
                role: "user",
                content: build_screening_prompt(names),
            }],
        };
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(%url, count = names.len(), "screening participant names");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(&body).unwrap_or_else(|| LlmError::Api {
                message: format!("status {status}: {body}"),
            }));
        }

        let payload: ChatResponse = serde_json::from_str(&body)
            .map_err(|err| LlmError::InvalidResponse(err.to_string()))?;
        let content = payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))?;
        let verdict = parse_name_list(&content)?;
        Ok(keep_known(names, &verdict))
    }

    /// Screens `names`, reporting failures as [`Screening::Unavailable`].
    pub async fn screen(&self, model: &str, names: &[String]) -> Screening {
        match self.screen_names(model, names).await {
            Ok(kept) => Screening::Screened(kept),
            Err(err) => {
                warn!(error = %err, "name check failed, keeping all names");
                Screening::Unavailable(err.to_string())
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

fn parse_api_error(body: &str) -> Option<LlmError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| LlmError::Api {
            message: payload.error.message,
        })
}

fn build_screening_prompt(names: &[String]) -> String {
    let mut lines = vec![
        "You are a name validator. Given the following list of names from a quiz attendance \
         sheet, identify which ones are REAL person names and which are NOT real names."
            .to_string(),
        String::new(),
        "NOT real names include:".to_string(),
        "- Placeholder text (e.g. \"Hi\", \"Ho\", \"Test\")".to_string(),
        "- Single letters or very short text (e.g. \"N\", \"A\")".to_string(),
        "- System text or column headers (e.g. \"Average Time per Question\")".to_string(),
        "- Nonsensical combinations".to_string(),
        String::new(),
        "REAL names include:".to_string(),
        "- Full names (first + last)".to_string(),
        "- Single names that could be real first names".to_string(),
        "- Names from any culture or language".to_string(),
        String::new(),
        "Names to validate:".to_string(),
    ];
    lines.extend(
        names
            .iter()
            .enumerate()
            .map(|(idx, name)| format!("{}. {name}", idx + 1)),
    );
    lines.push(String::new());
    lines.push(
        "Respond with ONLY a JSON array of the real names. Example: [\"John Doe\", \"Jane Smith\"]"
            .to_string(),
    );
    lines.join("\n")
}

/// Parses the model's answer, tolerating a Markdown code fence around it.
fn parse_name_list(content: &str) -> Result<Vec<String>, LlmError> {
    let mut text = content.trim();
    if let Some(fenced) = text.split("```").nth(1) {
        text = fenced.strip_prefix("json").unwrap_or(fenced).trim();
    }
    serde_json::from_str(text).map_err(|err| LlmError::InvalidResponse(err.to_string()))
}

fn keep_known(input: &[String], verdict: &[String]) -> Vec<String> {
    let verdict: HashSet<&str> = verdict.iter().map(|name| name.trim()).collect();
    let mut seen = HashSet::new();
    input
        .iter()
        .filter(|name| verdict.contains(name.trim()) && seen.insert(name.as_str()))
        .cloned()
        .collect()
}
