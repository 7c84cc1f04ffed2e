use axum::Json;
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use bytes::Bytes;
use serde_json::{Value, json};
use tracing::debug;

use super::AppState;
use crate::constants::{
    FIELD_GUIDANCE_PROMPT, FIELD_IMAGE, FIELD_NUMBER_OF_ADS, FIELD_PRODUCT_NAME,
};
use crate::error::RelayError;
use crate::relay::{GenerationForm, IncomingImage};
use crate::rules::{ImageKind, ImageRejection, MAX_IMAGE_BYTES, check_total};

/// handles the POST to /api/generate-ads
pub(crate) async fn generate_ads_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, RelayError> {
    let mut multipart = multipart.map_err(|err| RelayError::Malformed {
        status: err.status(),
        message: err.body_text(),
    })?;
    let form = read_form(&mut multipart).await?;
    let request = form.validate()?;
    let ads = state.relay.generate(request).await?;

    Ok(Json(json!({
        "success": true,
        "count": ads.count(),
        "images": ads.images,
    })))
}

fn multipart_error(err: MultipartError) -> RelayError {
    RelayError::Malformed {
        status: err.status(),
        message: err.body_text(),
    }
}

async fn read_form(multipart: &mut Multipart) -> Result<GenerationForm, RelayError> {
    let mut form = GenerationForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            FIELD_PRODUCT_NAME => {
                form.product_name = Some(field.text().await.map_err(multipart_error)?);
            }
            FIELD_GUIDANCE_PROMPT => {
                form.guidance_prompt = Some(field.text().await.map_err(multipart_error)?);
            }
            FIELD_NUMBER_OF_ADS => {
                form.number_of_ads = Some(field.text().await.map_err(multipart_error)?);
            }
            FIELD_IMAGE => {
                check_total(form.images.len(), 1)?;
                let kind = field
                    .content_type()
                    .and_then(ImageKind::from_mime)
                    .ok_or(ImageRejection::UnsupportedType)?;
                let file_name = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .unwrap_or("image")
                    .to_string();
                let bytes = read_image(&mut field).await?;
                debug!("Received {} ({} bytes)", file_name, bytes.len());
                form.images.push(IncomingImage {
                    file_name,
                    kind,
                    bytes,
                });
            }
            _ => debug!("Ignoring multipart field {:?}", field_name),
        }
    }

    Ok(form)
}

/// Reads a file part, refusing it once it passes the size limit.
async fn read_image(field: &mut Field<'_>) -> Result<Bytes, RelayError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if buffer.len() + chunk.len() > MAX_IMAGE_BYTES {
            return Err(ImageRejection::TooLarge.into());
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buffer))
}
