//! HTTP collaborators against OpenAI-compatible or Anthropic endpoints.

use std::time::Duration;

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use coach_session::{
    AnswerScorer, ClarificationProvider, ClarificationRequest, CollaboratorError,
    FeedbackProvider, FollowupGenerator, FollowupRequest,
};
use coach_types::{LlmProvider, LlmSettings};

use crate::prompts;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Wire protocol spoken by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFlavor {
    /// `POST {base}/chat/completions`
    OpenAi,
    /// `POST {base}/messages`
    Anthropic,
}

/// Configuration for [`ApiCoach`].
#[derive(Debug, Clone)]
pub struct ApiCoachConfig {
    pub flavor: ApiFlavor,

    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    /// Model to use (e.g., "gpt-4o-mini")
    pub model: String,

    pub api_key: SecretString,

    /// Sampling temperature for feedback, follow-ups and clarifications
    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,

    /// Maximum attempts per call, including the first
    pub max_retries: u32,

    /// First backoff interval between attempts
    pub retry_interval: Duration,
}

impl ApiCoachConfig {
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_flavor(ApiFlavor::OpenAi, OPENAI_BASE_URL, api_key, model)
    }

    pub fn anthropic(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_flavor(ApiFlavor::Anthropic, ANTHROPIC_BASE_URL, api_key, model)
    }

    fn with_flavor(
        flavor: ApiFlavor,
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            flavor,
            base_url: base_url.to_string(),
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
            temperature: 0.7,
            timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_interval: Duration::from_millis(500),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build from the `llm` settings section. Needs an API key unless offline.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, CollaboratorError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                CollaboratorError::Config(
                    "llm.api_key is not set (use COACH_LLM__API_KEY)".to_string(),
                )
            })?;

        let mut config = match settings.provider {
            LlmProvider::Openai => Self::openai(api_key, &settings.model),
            LlmProvider::Anthropic => Self::anthropic(api_key, &settings.model),
            LlmProvider::Offline => {
                return Err(CollaboratorError::Config(
                    "offline provider has no HTTP client".to_string(),
                ))
            }
        };
        if let Some(url) = &settings.api_base_url {
            config = config.with_base_url(url.clone());
        }
        config.temperature = settings.temperature;
        config.max_retries = settings.max_retries.max(1);
        Ok(config)
    }
}

/// Scorer, feedback writer, follow-up generator and clarifier in one client.
pub struct ApiCoach {
    client: Client,
    config: ApiCoachConfig,
}

impl ApiCoach {
    pub fn new(config: ApiCoachConfig) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CollaboratorError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiCoachConfig {
        &self.config
    }

    /// Call the API with retry logic.
    async fn call_api(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, CollaboratorError> {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.config.retry_interval,
            max_elapsed_time: Some(Duration::from_secs(120)),
            ..Default::default()
        };

        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(attempt = attempts, model = %self.config.model, "Calling coach API");

            match self.make_request(system, prompt, max_tokens, temperature).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if attempts >= self.config.max_retries {
                        error!(error = %e, "Max retries exceeded");
                        return Err(e);
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                error = %e,
                                retry_in_ms = duration.as_millis() as u64,
                                "API call failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(error = %e, "Backoff exhausted");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    async fn make_request(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, CollaboratorError> {
        match self.config.flavor {
            ApiFlavor::OpenAi => {
                self.make_openai_request(system, prompt, max_tokens, temperature)
                    .await
            }
            ApiFlavor::Anthropic => {
                self.make_anthropic_request(system, prompt, max_tokens, temperature)
                    .await
            }
        }
    }

    async fn make_openai_request(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, CollaboratorError> {
        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            model: &'a str,
            messages: Vec<OpenAIMessage<'a>>,
            max_tokens: u32,
            temperature: f32,
        }

        #[derive(Serialize)]
        struct OpenAIMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            choices: Vec<OpenAIChoice>,
        }

        #[derive(Deserialize)]
        struct OpenAIChoice {
            message: OpenAIMessageResponse,
        }

        #[derive(Deserialize)]
        struct OpenAIMessageResponse {
            content: String,
        }

        let request = OpenAIRequest {
            model: &self.config.model,
            messages: vec![
                OpenAIMessage {
                    role: "system",
                    content: system,
                },
                OpenAIMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens,
            temperature,
        };

        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| CollaboratorError::Api(e.to_string()))?;

        let response = check_status(response).await?;
        let body: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Parse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CollaboratorError::Parse("No choices in response".to_string()))
    }

    async fn make_anthropic_request(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, CollaboratorError> {
        #[derive(Serialize)]
        struct AnthropicRequest<'a> {
            model: &'a str,
            max_tokens: u32,
            temperature: f32,
            system: &'a str,
            messages: Vec<AnthropicMessage<'a>>,
        }

        #[derive(Serialize)]
        struct AnthropicMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicContent>,
        }

        #[derive(Deserialize)]
        struct AnthropicContent {
            text: String,
        }

        let request = AnthropicRequest {
            model: &self.config.model,
            max_tokens,
            temperature,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let url = format!("{}/messages", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| CollaboratorError::Api(e.to_string()))?;

        let response = check_status(response).await?;
        let body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Parse(e.to_string()))?;

        body.content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| CollaboratorError::Parse("No content in response".to_string()))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CollaboratorError> {
    if response.status() == 429 {
        return Err(CollaboratorError::RateLimitExceeded);
    }

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(CollaboratorError::Api(format!("HTTP {}: {}", status, body)));
    }

    Ok(response)
}

#[async_trait]
impl AnswerScorer for ApiCoach {
    async fn score(&self, question: &str, answer: &str) -> Result<u8, CollaboratorError> {
        let prompt = prompts::score_prompt(question, answer);
        // Low temperature keeps scores consistent
        let reply = self.call_api(prompts::SCORE_SYSTEM, &prompt, 10, 0.1).await?;
        prompts::parse_score(&reply)
    }
}

#[async_trait]
impl FeedbackProvider for ApiCoach {
    async fn feedback(
        &self,
        question: &str,
        answer: &str,
        iteration: u32,
    ) -> Result<String, CollaboratorError> {
        let prompt = prompts::feedback_prompt(question, answer, iteration);
        let reply = self
            .call_api(prompts::FEEDBACK_SYSTEM, &prompt, 200, self.config.temperature)
            .await?;
        Ok(reply.trim().to_string())
    }
}

#[async_trait]
impl FollowupGenerator for ApiCoach {
    async fn generate(&self, request: &FollowupRequest) -> Result<String, CollaboratorError> {
        let prompt = prompts::followup_prompt(request);
        let reply = self
            .call_api(prompts::FOLLOWUP_SYSTEM, &prompt, 150, self.config.temperature)
            .await?;
        Ok(reply.trim().to_string())
    }
}

#[async_trait]
impl ClarificationProvider for ApiCoach {
    async fn clarify(&self, request: &ClarificationRequest) -> Result<String, CollaboratorError> {
        let prompt = prompts::clarify_prompt(request);
        let reply = self
            .call_api(prompts::CLARIFY_SYSTEM, &prompt, 500, self.config.temperature)
            .await?;
        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn openai_reply(text: &str) -> serde_json::Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": text } }] })
    }

    fn openai_coach(server: &MockServer, max_retries: u32) -> ApiCoach {
        let mut config = ApiCoachConfig::openai("sk-test", "gpt-4o-mini").with_base_url(server.uri());
        config.max_retries = max_retries;
        config.retry_interval = Duration::from_millis(10);
        ApiCoach::new(config).unwrap()
    }

    #[test]
    fn test_config_from_settings() {
        let mut settings = LlmSettings::default();
        assert!(matches!(
            ApiCoachConfig::from_settings(&settings),
            Err(CollaboratorError::Config(_))
        ));

        settings.api_key = Some("key".to_string());
        settings.provider = LlmProvider::Anthropic;
        settings.api_base_url = Some("http://localhost:9999/v1/".to_string());
        let config = ApiCoachConfig::from_settings(&settings).unwrap();
        assert_eq!(config.flavor, ApiFlavor::Anthropic);
        assert_eq!(config.base_url, "http://localhost:9999/v1");

        settings.provider = LlmProvider::Offline;
        assert!(ApiCoachConfig::from_settings(&settings).is_err());
    }

    #[tokio::test]
    async fn test_openai_score() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply("4")))
            .mount(&server)
            .await;

        let coach = openai_coach(&server, 1);
        assert_eq!(coach.score("What is a p-value?", "An answer").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply("9")))
            .mount(&server)
            .await;

        let coach = openai_coach(&server, 1);
        assert!(matches!(
            coach.score("q", "a").await,
            Err(CollaboratorError::OutOfRange(9))
        ));
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(openai_reply("  How would you test it?  ")),
            )
            .mount(&server)
            .await;

        let coach = openai_coach(&server, 3);
        let reply = coach.feedback("q", "a", 1).await.unwrap();
        assert_eq!(reply, "How would you test it?");
    }

    #[tokio::test]
    async fn test_rate_limit_surfaces_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&server)
            .await;

        let coach = openai_coach(&server, 2);
        assert!(matches!(
            coach.score("q", "a").await,
            Err(CollaboratorError::RateLimitExceeded)
        ));
    }

    #[tokio::test]
    async fn test_anthropic_clarify() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-ant"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{ "type": "text", "text": "The null hypothesis is the default claim." }]
            })))
            .mount(&server)
            .await;

        let mut config = ApiCoachConfig::anthropic("sk-ant", "claude-3-haiku").with_base_url(server.uri());
        config.max_retries = 1;
        let coach = ApiCoach::new(config).unwrap();

        let request = ClarificationRequest {
            question: "What is a p-value?".to_string(),
            answer: String::new(),
            student_question: "What is the null hypothesis?".to_string(),
            context: "No specific concept knowledge found.".to_string(),
        };
        assert_eq!(
            coach.clarify(&request).await.unwrap(),
            "The null hypothesis is the default claim."
        );
    }
}
