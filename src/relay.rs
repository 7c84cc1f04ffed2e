//! The relay: validates a generation request, forwards it to the image API
//! and publishes whatever comes back.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose;
use bytes::Bytes;
use tracing::{info, instrument};

use crate::error::RelayError;
use crate::rules::{
    ImageKind, MISSING_TEXT_MESSAGE, NO_IMAGES_MESSAGE, check_total, parse_ad_count,
};
use crate::storage::Storage;
use crate::upstream::{EditRequest, ImageEditor, SourceImage};

/// A source image received from the client, already type and size checked.
#[derive(Clone, Debug)]
pub struct IncomingImage {
    /// Name the client gave the file.
    pub file_name: String,
    /// Image format.
    pub kind: ImageKind,
    /// File contents.
    pub bytes: Bytes,
}

/// Raw form values as they came off the wire.
#[derive(Clone, Debug, Default)]
pub struct GenerationForm {
    /// `productName`, if sent.
    pub product_name: Option<String>,
    /// `guidancePrompt`, if sent.
    pub guidance_prompt: Option<String>,
    /// `numberOfAds`, if sent.
    pub number_of_ads: Option<String>,
    /// Every file part.
    pub images: Vec<IncomingImage>,
}

impl GenerationForm {
    /// Checks the form, producing a request that is safe to relay.
    pub fn validate(self) -> Result<GenerationRequest, RelayError> {
        if self.images.is_empty() {
            return Err(RelayError::Validation(NO_IMAGES_MESSAGE.to_string()));
        }
        check_total(0, self.images.len())?;

        let product_name = non_blank(self.product_name);
        let guidance_prompt = non_blank(self.guidance_prompt);
        let (Some(product_name), Some(guidance_prompt)) = (product_name, guidance_prompt) else {
            return Err(RelayError::Validation(MISSING_TEXT_MESSAGE.to_string()));
        };

        let ad_count = self
            .number_of_ads
            .as_deref()
            .map(parse_ad_count)
            .unwrap_or(crate::rules::MIN_ADS);

        Ok(GenerationRequest {
            product_name,
            guidance_prompt,
            ad_count,
            images: self.images,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// A validated request: non-blank text, 1 to 5 images, a clamped ad count.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    product_name: String,
    guidance_prompt: String,
    ad_count: u8,
    images: Vec<IncomingImage>,
}

impl GenerationRequest {
    /// The product being advertised.
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// What the ads should look like.
    pub fn guidance_prompt(&self) -> &str {
        &self.guidance_prompt
    }

    /// How many ads to make, always within `[1, 5]`.
    pub fn ad_count(&self) -> u8 {
        self.ad_count
    }

    /// The reference images.
    pub fn images(&self) -> &[IncomingImage] {
        &self.images
    }
}

/// Builds the instruction sent to the image API.
pub fn compose_prompt(product_name: &str, guidance_prompt: &str) -> String {
    format!(
        "Generate a photorealistic ad image for \"{product_name}\" with the following guidance: {guidance_prompt}"
    )
}

/// Public URLs of the images a request produced, in API order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneratedAds {
    /// Root-relative URLs.
    pub images: Vec<String>,
}

impl GeneratedAds {
    /// Number of images produced.
    pub fn count(&self) -> usize {
        self.images.len()
    }
}

/// Relays generation requests to an [`ImageEditor`] and stores the results.
#[derive(Clone)]
pub struct AdRelay {
    editor: Arc<dyn ImageEditor>,
    storage: Storage,
}

impl std::fmt::Debug for AdRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdRelay")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl AdRelay {
    /// Creates a relay over an editor and a storage layout.
    pub fn new(editor: Arc<dyn ImageEditor>, storage: Storage) -> Self {
        Self { editor, storage }
    }

    /// The storage layout in use.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Runs one request end to end. Staged uploads are removed whatever the outcome.
    #[instrument(skip_all, fields(product = %request.product_name, ads = request.ad_count, images = request.images.len()))]
    pub async fn generate(&self, request: GenerationRequest) -> Result<GeneratedAds, RelayError> {
        let prompt = compose_prompt(&request.product_name, &request.guidance_prompt);
        let staged = self.stage(&request.images).await?;

        let outcome = self
            .editor
            .edit(EditRequest {
                prompt,
                count: request.ad_count,
                images: staged.clone(),
            })
            .await;
        self.storage.discard(&staged).await;
        let payloads = outcome?;

        // nothing is written unless every payload decodes
        let decoded = payloads
            .iter()
            .map(|payload| general_purpose::STANDARD.decode(payload.trim()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut images = Vec::with_capacity(decoded.len());
        for bytes in decoded {
            images.push(self.storage.store_result(&bytes).await?);
        }
        info!("Generated {} ad images", images.len());
        Ok(GeneratedAds { images })
    }

    async fn stage(&self, images: &[IncomingImage]) -> Result<Vec<SourceImage>, RelayError> {
        let pending = images
            .iter()
            .map(|image| {
                self.storage
                    .stage_upload(&image.file_name, image.kind, &image.bytes)
            })
            .collect::<Vec<_>>();
        stage_in_order(&self.storage, pending).await
    }
}

/// Awaits each staging write in turn. If one fails, the files already
/// written are discarded before the error is returned.
async fn stage_in_order<I, F>(
    storage: &Storage,
    pending: I,
) -> Result<Vec<SourceImage>, RelayError>
where
    I: IntoIterator<Item = F>,
    F: std::future::Future<Output = std::io::Result<SourceImage>>,
{
    let mut staged = Vec::new();
    for write in pending {
        match write.await {
            Ok(source) => staged.push(source),
            Err(err) => {
                storage.discard(&staged).await;
                return Err(err.into());
            }
        }
    }
    Ok(staged)
}
