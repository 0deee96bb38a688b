//! Model backends for the crew.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ollama_rs::generation::chat::{request::ChatMessageRequest, ChatMessage};
use ollama_rs::models::ModelOptions;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{AppConfig, ProviderKind};

/// Sampling temperature used when a caller does not choose one
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate(&self, model: &str, prompt: String, system: Option<String>) -> Result<String>;

    /// Generate at an explicit sampling temperature. Backends without a
    /// temperature control fall back to `generate`.
    async fn generate_with_temperature(
        &self,
        model: &str,
        prompt: String,
        system: Option<String>,
        _temperature: f32,
    ) -> Result<String> {
        self.generate(model, prompt, system).await
    }
}

/// Local models served by Ollama
pub struct OllamaProvider {
    client: ollama_rs::Ollama,
}

impl OllamaProvider {
    pub fn new(client: ollama_rs::Ollama) -> Self {
        Self { client }
    }

    async fn chat(&self, model: &str, prompt: String, system: Option<String>, temperature: Option<f32>) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system {
            messages.push(ChatMessage::system(sys));
        }
        messages.push(ChatMessage::user(prompt));

        let mut request = ChatMessageRequest::new(model.to_string(), messages);
        if let Some(t) = temperature {
            request = request.options(ModelOptions::default().temperature(t));
        }

        let res = self
            .client
            .send_chat_messages(request)
            .await
            .with_context(|| format!("Ollama chat request to {} failed", model))?;
        Ok(res.message.content)
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    async fn generate(&self, model: &str, prompt: String, system: Option<String>) -> Result<String> {
        self.chat(model, prompt, system, None).await
    }

    async fn generate_with_temperature(
        &self,
        model: &str,
        prompt: String,
        system: Option<String>,
        temperature: f32,
    ) -> Result<String> {
        self.chat(model, prompt, system, Some(temperature)).await
    }
}

/// Any server exposing `/chat/completions` (vLLM, LM Studio, llama.cpp server, hosted APIs)
pub struct OpenAICompatibleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAICompatibleProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Chat-completions request body
fn completion_body(model: &str, prompt: &str, system: Option<&str>, temperature: f32) -> serde_json::Value {
    let mut messages = Vec::with_capacity(2);
    if let Some(sys) = system {
        messages.push(json!({ "role": "system", "content": sys }));
    }
    messages.push(json!({ "role": "user", "content": prompt }));

    json!({
        "model": model,
        "messages": messages,
        "temperature": temperature,
    })
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    async fn generate(&self, model: &str, prompt: String, system: Option<String>) -> Result<String> {
        self.generate_with_temperature(model, prompt, system, DEFAULT_TEMPERATURE).await
    }

    async fn generate_with_temperature(
        &self,
        model: &str,
        prompt: String,
        system: Option<String>,
        temperature: f32,
    ) -> Result<String> {
        let body = completion_body(model, &prompt, system.as_deref(), temperature);
        debug!("POST {} (model {}, temperature {})", self.completions_url(), model, temperature);

        let mut request = self.client.post(self.completions_url()).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await?.error_for_status()?;
        let json: serde_json::Value = res.json().await?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .context("Failed to parse content from chat completion response")
    }
}

/// Build the provider selected in configuration.
pub fn provider_from_config(config: &AppConfig) -> Result<Arc<dyn LLMProvider>> {
    match config.provider {
        ProviderKind::Ollama => {
            info!("Using Ollama at {}:{}", config.ollama_host, config.ollama_port);
            let ollama = ollama_rs::Ollama::new(config.ollama_host.clone(), config.ollama_port);
            Ok(Arc::new(OllamaProvider::new(ollama)))
        }
        ProviderKind::OpenAICompatible => {
            let base_url = config
                .openai_base_url
                .clone()
                .context("OPENAI_BASE_URL must be set when LLM_PROVIDER=openai")?;
            info!("Using OpenAI-compatible endpoint at {}", base_url);
            Ok(Arc::new(OpenAICompatibleProvider::new(base_url, config.openai_api_key.clone())))
        }
    }
}
