//! Sends a [`Submission`] to the relay.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::Submission;
use crate::constants::{
    FIELD_GUIDANCE_PROMPT, FIELD_IMAGE, FIELD_NUMBER_OF_ADS, FIELD_PRODUCT_NAME,
    GENERATE_ADS_PATH,
};

const FALLBACK_FAILURE: &str = "Failed to generate images";
const FALLBACK_UNKNOWN: &str = "Something went wrong. Please try again.";

/// Why a submission did not produce images. `Display` is the banner text.
#[derive(Debug)]
pub enum SubmitError {
    /// The relay answered with a failure.
    Rejected {
        /// HTTP status of the answer.
        status: u16,
        /// Message for the user.
        message: String,
    },
    /// The relay could not be reached.
    Transport(reqwest::Error),
    /// The relay answered with something unreadable.
    InvalidResponse(String),
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected { message, .. } => write!(f, "{message}"),
            Self::Transport(err) => write!(f, "{err}"),
            Self::InvalidResponse(_) => write!(f, "{FALLBACK_UNKNOWN}"),
        }
    }
}

impl std::error::Error for SubmitError {}

impl From<reqwest::Error> for SubmitError {
    fn from(err: reqwest::Error) -> Self {
        SubmitError::Transport(err)
    }
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the relay's generate endpoint.
#[derive(Clone, Debug)]
pub struct AdClient {
    http: reqwest::Client,
    base: Url,
    endpoint: Url,
}

impl AdClient {
    /// Client for the relay at `base`, eg `http://localhost:3001`.
    pub fn new(base: Url) -> Result<Self, url::ParseError> {
        let endpoint = base.join(GENERATE_ADS_PATH)?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            endpoint,
        })
    }

    /// Turns a root-relative result URL into an absolute one.
    pub fn resolve(&self, image_url: &str) -> Result<Url, url::ParseError> {
        self.base.join(image_url)
    }

    fn build_form(submission: &Submission) -> Result<Form, SubmitError> {
        let mut form = Form::new()
            .text(FIELD_PRODUCT_NAME, submission.product_name.clone())
            .text(FIELD_GUIDANCE_PROMPT, submission.guidance_prompt.clone())
            .text(FIELD_NUMBER_OF_ADS, submission.ad_count.to_string());
        for file in &submission.images {
            let part = Part::bytes(file.bytes().to_vec())
                .file_name(file.name().to_string())
                .mime_str(file.mime())?;
            form = form.part(FIELD_IMAGE, part);
        }
        Ok(form)
    }

    /// Sends one submission, returning the generated image URLs.
    pub async fn generate(&self, submission: &Submission) -> Result<Vec<String>, SubmitError> {
        let form = Self::build_form(submission)?;
        debug!(
            "Submitting {} images to {}",
            submission.images.len(),
            self.endpoint
        );
        let resp = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        let reply = serde_json::from_slice::<Reply>(&bytes);

        if !status.is_success() {
            let message = reply
                .ok()
                .and_then(|reply| reply.message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| FALLBACK_FAILURE.to_string());
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let reply = reply.map_err(|err| SubmitError::InvalidResponse(err.to_string()))?;
        if !reply.success {
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
                message: reply
                    .message
                    .unwrap_or_else(|| FALLBACK_FAILURE.to_string()),
            });
        }
        Ok(reply.images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::Json;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use serde_json::json;

    use crate::wizard::SelectedFile;

    async fn spawn(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Url::parse(&format!("http://{addr}")).expect("url")
    }

    fn submission() -> Submission {
        Submission {
            product_name: "Widget".to_string(),
            guidance_prompt: "on a table".to_string(),
            ad_count: 2,
            images: vec![SelectedFile::new("w.png", "image/png", &b"png"[..])],
        }
    }

    #[tokio::test]
    async fn returns_image_urls() {
        let app = Router::new().route(
            GENERATE_ADS_PATH,
            axum::routing::post(|| async {
                Json(json!({"success": true, "images": ["/results/a.png"], "count": 1}))
            }),
        );
        let client = AdClient::new(spawn(app).await).expect("client");
        let images = client.generate(&submission()).await.expect("generate");
        assert_eq!(images, vec!["/results/a.png".to_string()]);
        assert!(
            client
                .resolve(&images[0])
                .expect("resolve")
                .as_str()
                .ends_with("/results/a.png")
        );
    }

    #[tokio::test]
    async fn failure_message_is_surfaced() {
        let app = Router::new().route(
            GENERATE_ADS_PATH,
            axum::routing::post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({"success": false, "message": "rate limited"})),
                )
            }),
        );
        let client = AdClient::new(spawn(app).await).expect("client");
        let err = client.generate(&submission()).await.expect_err("fails");
        assert!(matches!(err, SubmitError::Rejected { status: 429, .. }));
        assert_eq!(err.to_string(), "rate limited");
    }

    #[tokio::test]
    async fn failure_without_json_uses_fallback() {
        let app = Router::new().route(
            GENERATE_ADS_PATH,
            axum::routing::post(|| async {
                (StatusCode::BAD_GATEWAY, "upstream exploded").into_response()
            }),
        );
        let client = AdClient::new(spawn(app).await).expect("client");
        let err = client.generate(&submission()).await.expect_err("fails");
        assert_eq!(err.to_string(), FALLBACK_FAILURE);
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        // bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let client =
            AdClient::new(Url::parse(&format!("http://{addr}")).expect("url")).expect("client");
        let err = client.generate(&submission()).await.expect_err("fails");
        assert!(matches!(err, SubmitError::Transport(_)));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn endpoint_is_joined_onto_base() {
        let client =
            AdClient::new(Url::parse("http://example.org/some/page").expect("url")).expect("client");
        assert_eq!(
            client.endpoint.as_str(),
            "http://example.org/api/generate-ads"
        );
    }
}
