//! Client for the external image-generation API.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use crate::constants::{DEFAULT_IMAGE_MODEL, DEFAULT_OPENAI_BASE_URL, IMAGE_SIZE};
use crate::rules::ImageKind;

/// A staged source image sent along as an edit reference.
#[derive(Clone, Debug)]
pub struct SourceImage {
    /// Where the staged copy lives.
    pub path: PathBuf,
    /// Name the client uploaded it under.
    pub file_name: String,
    /// Image format.
    pub kind: ImageKind,
}

/// One edit call: a prompt, how many images to make, and the references.
#[derive(Clone, Debug)]
pub struct EditRequest {
    /// Natural-language instruction.
    pub prompt: String,
    /// Number of images wanted, already clamped.
    pub count: u8,
    /// Reference images.
    pub images: Vec<SourceImage>,
}

/// Errors from the image API.
#[derive(Debug)]
pub enum EditError {
    /// The API answered with a non-success status.
    Api {
        /// HTTP status of the answer.
        status: u16,
        /// The `error.message` from the body, when there was one.
        message: Option<String>,
    },
    /// The request never got an answer.
    Transport(reqwest::Error),
    /// A staged image could not be read back.
    Io(std::io::Error),
    /// The answer did not look like an images response.
    InvalidResponse(String),
}

impl std::fmt::Display for EditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Api {
                status,
                message: Some(message),
            } => write!(f, "image API error {status}: {message}"),
            Self::Api {
                status,
                message: None,
            } => write!(f, "image API error {status}"),
            Self::Transport(err) => write!(f, "image API request failed: {err}"),
            Self::Io(err) => write!(f, "failed to read staged image: {err}"),
            Self::InvalidResponse(detail) => write!(f, "unexpected image API response: {detail}"),
        }
    }
}

impl std::error::Error for EditError {}

impl From<reqwest::Error> for EditError {
    fn from(err: reqwest::Error) -> Self {
        EditError::Transport(err)
    }
}

impl From<std::io::Error> for EditError {
    fn from(err: std::io::Error) -> Self {
        EditError::Io(err)
    }
}

/// Something that turns reference images and a prompt into base64 images.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    /// Runs one edit request, returning the base64 payload of every image produced.
    async fn edit(&self, request: EditRequest) -> Result<Vec<String>, EditError>;
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Option<Vec<ImageData>>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Pulls `error.message` out of an error body, if it has one.
fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
}

/// OpenAI `images/edits` client.
#[derive(Clone, Debug)]
pub struct OpenAiImageEditor {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiImageEditor {
    /// Creates an editor using the default model and the public API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_IMAGE_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }

    /// Overrides the image model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the API base URL, eg for a compatible gateway.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn edits_url(&self) -> String {
        format!("{}/images/edits", self.base_url)
    }

    async fn build_form(&self, request: &EditRequest) -> Result<Form, EditError> {
        let mut form = Form::new()
            .text("model", self.model.clone())
            .text("prompt", request.prompt.clone())
            .text("n", request.count.to_string())
            .text("size", IMAGE_SIZE);

        for image in &request.images {
            let bytes = tokio::fs::read(&image.path).await?;
            let part = Part::bytes(bytes)
                .file_name(image.file_name.clone())
                .mime_str(image.kind.mime())?;
            form = form.part("image[]", part);
        }
        Ok(form)
    }
}

#[async_trait]
impl ImageEditor for OpenAiImageEditor {
    async fn edit(&self, request: EditRequest) -> Result<Vec<String>, EditError> {
        let form = self.build_form(&request).await?;

        info!(
            "Calling image API model={} n={} references={}",
            self.model,
            request.count,
            request.images.len()
        );
        let resp = self
            .client
            .post(self.edits_url())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(EditError::Api {
                status: status.as_u16(),
                message: error_message(&bytes),
            });
        }

        let parsed: ImagesResponse = serde_json::from_slice(&bytes)
            .map_err(|err| EditError::InvalidResponse(err.to_string()))?;
        if let Some(err) = parsed.error {
            return Err(EditError::Api {
                status: 500,
                message: err.message,
            });
        }

        let data = parsed
            .data
            .ok_or_else(|| EditError::InvalidResponse("response has no data".to_string()))?;
        let total = data.len();
        let images: Vec<String> = data
            .into_iter()
            .filter_map(|item| item.b64_json)
            .collect();
        if images.len() < total {
            debug!("Skipped {} image entries without base64 data", total - images.len());
        }
        Ok(images)
    }
}
