//! Shared constants for things
//!

/// Multipart field carrying the product name.
pub const FIELD_PRODUCT_NAME: &str = "productName";

/// Multipart field carrying the guidance prompt.
pub const FIELD_GUIDANCE_PROMPT: &str = "guidancePrompt";

/// Multipart field carrying the requested number of ads.
pub const FIELD_NUMBER_OF_ADS: &str = "numberOfAds";

/// Multipart field shared by every source image.
pub const FIELD_IMAGE: &str = "image";

/// Route that accepts generation requests.
pub const GENERATE_ADS_PATH: &str = "/api/generate-ads";

/// URL prefix generated images are published under.
pub const RESULTS_URL_PREFIX: &str = "/results";

/// Extension used for every generated image.
pub const RESULT_EXTENSION: &str = "png";

/// Square size requested from the image API.
pub const IMAGE_SIZE: &str = "1024x1024";

/// Default image model.
pub const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";

/// Default base URL for the OpenAI API.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Message used when a failure carries nothing worth showing the user.
pub const GENERIC_FAILURE_MESSAGE: &str = "Server error while generating ad images";

/// Multipart framing allowance on top of the image payloads.
pub const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Cache-Control value for generated image responses, their names are never reused.
pub const RESULT_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";
