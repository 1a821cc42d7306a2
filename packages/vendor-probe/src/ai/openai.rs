//! OpenAI implementation of the query generator and contact extractor.
//!
//! Both use chat completions with a `json_schema` response format derived
//! from the response structs via `schemars`, at temperature 0.
//!
//! # Example
//!
//! ```rust,ignore
//! use vendor_probe::ai::OpenAI;
//!
//! let ai = Arc::new(OpenAI::from_env()?.with_model("gpt-4o-mini"));
//! let probe = Probe::builder(config)
//!     .generator(ai.clone())
//!     .extractor(ai)
//!     ...
//! ```

use async_trait::async_trait;
use reqwest::Client;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExtractError, ExtractResult};
use crate::security::ModelCredentials;
use crate::traits::ai::{ContactExtractor, QueryGenerator};
use crate::types::chunk::{ChunkId, ContentChunk};
use crate::types::record::{Contacts, ExtractedRecord};
use crate::types::request::QueryPlan;

const DEFAULT_MODEL: &str = "gpt-4o-mini";

const PLAN_SYSTEM: &str = "You plan web searches that find service providers or vendors \
who can help with the user's goal. Return the kinds of vendors to contact as `targets`, \
one to three web search `queries` that include the location, and a short \
`business_query` for a maps or business directory search (empty if not useful).";

const EXTRACT_SYSTEM: &str = "You extract vendor contact details from web page excerpts. \
Each excerpt has a `chunk_id`. For every vendor relevant to the user's goal, return its \
name, which target it matches, a one-line description, and its email, phone and address \
exactly as written. Use an empty string for anything not present. Never invent contact \
details. Cite the `chunk_id` of the excerpt the details came from.";

/// OpenAI-backed planner and extractor.
#[derive(Clone)]
pub struct OpenAI {
    client: Client,
    credentials: ModelCredentials,
}

impl OpenAI {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            credentials: ModelCredentials::new(api_key, DEFAULT_MODEL),
        }
    }

    /// Create from `OPENAI_API_KEY` (and `OPENAI_MODEL` if set).
    pub fn from_env() -> ExtractResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ExtractError::Config("OPENAI_API_KEY not set".into()))?;
        let mut ai = Self::new(api_key);
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            ai = ai.with_model(model);
        }
        Ok(ai)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.credentials.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.credentials = self.credentials.with_base_url(url);
        self
    }

    pub fn model(&self) -> &str {
        &self.credentials.model
    }

    /// Structured output with a JSON schema generated for `T`.
    async fn generate_structured<T>(&self, name: &str, system: &str, user: &str) -> ExtractResult<T>
    where
        T: JsonSchema + for<'de> Deserialize<'de>,
    {
        #[derive(Serialize)]
        struct StructuredRequest<'a> {
            model: &'a str,
            messages: [ChatMessage<'a>; 2],
            temperature: f32,
            response_format: ResponseFormat<'a>,
        }

        #[derive(Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct ResponseFormat<'a> {
            #[serde(rename = "type")]
            format_type: &'a str,
            json_schema: JsonSchemaFormat<'a>,
        }

        #[derive(Serialize)]
        struct JsonSchemaFormat<'a> {
            name: &'a str,
            strict: bool,
            schema: serde_json::Value,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatResponseMessage,
        }

        #[derive(Deserialize)]
        struct ChatResponseMessage {
            content: Option<String>,
        }

        let request = StructuredRequest {
            model: &self.credentials.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name,
                    strict: true,
                    schema: schema_for::<T>()?,
                },
            },
        };

        let response = self
            .client
            .post(self.credentials.chat_completions_url())
            .bearer_auth(self.credentials.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractError::Api(format!("status {status}: {error_text}")));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::Malformed(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ExtractError::Malformed("no content in response".into()))?;

        Ok(serde_json::from_str(&content)?)
    }
}

/// Inline, strict-mode compatible JSON schema for `T`.
fn schema_for<T: JsonSchema>() -> ExtractResult<serde_json::Value> {
    let generator = schemars::gen::SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .into_generator();
    let mut schema = serde_json::to_value(generator.into_root_schema_for::<T>())?;
    if let Some(object) = schema.as_object_mut() {
        object.remove("title");
    }
    Ok(schema)
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct PlanResponse {
    targets: Vec<String>,
    queries: Vec<String>,
    business_query: String,
}

impl From<PlanResponse> for QueryPlan {
    fn from(response: PlanResponse) -> Self {
        let business_query = Some(response.business_query.trim().to_string()).filter(|q| !q.is_empty());
        QueryPlan {
            targets: response.targets,
            web_queries: response.queries,
            business_query,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct ExtractionResponse {
    results: Vec<VendorItem>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct VendorItem {
    chunk_id: usize,
    name: String,
    target: String,
    info: String,
    contacts: ContactItem,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct ContactItem {
    email: String,
    phone: String,
    address: String,
}

impl From<VendorItem> for ExtractedRecord {
    fn from(item: VendorItem) -> Self {
        ExtractedRecord::new(
            ChunkId(item.chunk_id),
            item.name,
            Contacts {
                email: item.contacts.email,
                phone: item.contacts.phone,
                address: item.contacts.address,
            },
        )
        .with_target(item.target)
        .with_info(item.info)
    }
}

/// Render a batch as the JSON context the model reads.
fn render_batch(batch: &[ContentChunk]) -> String {
    let excerpts: Vec<serde_json::Value> = batch
        .iter()
        .map(|chunk| {
            serde_json::json!({
                "chunk_id": chunk.id.0,
                "source": chunk.source_link.url,
                "content": chunk.text,
            })
        })
        .collect();
    serde_json::Value::Array(excerpts).to_string()
}

#[async_trait]
impl QueryGenerator for OpenAI {
    async fn generate(&self, goal: &str, location: &str) -> ExtractResult<QueryPlan> {
        let user = format!("Goal: {goal}\nLocation: {location}");
        let plan: PlanResponse = self
            .generate_structured("search_plan", PLAN_SYSTEM, &user)
            .await?;
        debug!(targets = ?plan.targets, queries = ?plan.queries, "Generated search plan");
        Ok(plan.into())
    }
}

#[async_trait]
impl ContactExtractor for OpenAI {
    async fn extract(
        &self,
        batch: &[ContentChunk],
        goal: &str,
        targets: &[String],
    ) -> ExtractResult<Vec<ExtractedRecord>> {
        let user = format!(
            "Goal: {goal}\nTargets: {}\n\nExcerpts:\n{}",
            targets.join(", "),
            render_batch(batch)
        );
        let response: ExtractionResponse = self
            .generate_structured("vendor_contacts", EXTRACT_SYSTEM, &user)
            .await?;
        Ok(response.results.into_iter().map(ExtractedRecord::from).collect())
    }
}
