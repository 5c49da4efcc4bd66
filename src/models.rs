/// Wire types for the bridge.
///
/// Ollama lists its models natively at `/api/tags`; the bridge re-exposes that list in the shape
/// of the OpenAI `/v1/models` endpoint. Chat payloads are never modelled: the bridge only peeks at
/// a couple of fields for logging.
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Name the bridge reports as the owner of every model.
pub const BACKEND_NAME: &str = "ollama";

/// Characters of a chat reply shown in the log preview.
pub const PREVIEW_CHARS: usize = 50;

/// Ollama's native model listing, `GET /api/tags`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<TagModel>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TagModel {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl TagsResponse {
    pub fn names(&self) -> Vec<String> {
        self.models.iter().map(|m| m.name.clone()).collect()
    }
}

/// An entry of the `/v1/models` listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Model {
    /// The model identifier, as Ollama names it.
    pub id: String,
    /// The object type, which is always "model".
    pub object: String,
    /// The organization that owns the model.
    pub owned_by: String,
}

impl Model {
    fn from_tag(tag: &TagModel) -> Self {
        Model {
            id: tag.name.clone(),
            object: "model".into(),
            owned_by: BACKEND_NAME.into(),
        }
    }
}

/// The response from the /v1/models endpoint, which is a list of models.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ListModelResponse {
    /// The object type, which is always "list".
    pub object: String,
    /// A list of model objects.
    pub data: Vec<Model>,
}

impl From<&TagsResponse> for ListModelResponse {
    fn from(tags: &TagsResponse) -> Self {
        ListModelResponse {
            object: "list".into(),
            data: tags.models.iter().map(Model::from_tag).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    #[serde(rename = "backendAvailable")]
    pub backend_available: bool,
    /// Same as `backend_available`; the web client reads this key.
    pub ollama: bool,
    pub models: Vec<String>,
    pub version: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Model named by a chat request, if any.
pub fn requested_model(body: &Value) -> Option<&str> {
    body.get("model").and_then(Value::as_str)
}

/// Content of the first choice of a chat completion, or `""` when absent.
pub fn completion_content(body: &Value) -> &str {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

/// First [`PREVIEW_CHARS`] characters of `content`, with `...` appended when cut.
pub fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}
