//! Input rules shared by the wizard and the relay endpoint.

/// Most source images a single request may carry.
pub const MAX_IMAGES: usize = 5;

/// Largest accepted source image, in bytes.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Fewest ads a request produces.
pub const MIN_ADS: u8 = 1;

/// Most ads a request produces.
pub const MAX_ADS: u8 = 5;

/// Message shown when a request carries no images.
pub const NO_IMAGES_MESSAGE: &str = "No images uploaded";

/// Message shown when the product name or guidance prompt is blank.
pub const MISSING_TEXT_MESSAGE: &str = "Product name and guidance prompt are required";

/// Image formats accepted as source images.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ImageKind {
    /// image/jpeg
    Jpeg,
    /// image/png
    Png,
    /// image/webp
    Webp,
}

impl ImageKind {
    /// Matches a MIME type, ignoring case and any parameters.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or(mime)
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Canonical MIME type.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    /// File extension used when staging uploads.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

/// Why a source image (or a batch of them) was refused.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ImageRejection {
    /// The batch would take the total past [`MAX_IMAGES`].
    TooMany,
    /// The MIME type is not one of [`ImageKind`].
    UnsupportedType,
    /// The file is bigger than [`MAX_IMAGE_BYTES`].
    TooLarge,
}

impl std::fmt::Display for ImageRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooMany => write!(f, "You can upload a maximum of {MAX_IMAGES} images"),
            Self::UnsupportedType => write!(f, "Only JPG, PNG, and WEBP images are allowed"),
            Self::TooLarge => write!(f, "Image must be smaller than 5MB"),
        }
    }
}

impl std::error::Error for ImageRejection {}

/// Checks a single file's type and size.
pub fn check_image(mime: &str, size: usize) -> Result<ImageKind, ImageRejection> {
    let kind = ImageKind::from_mime(mime).ok_or(ImageRejection::UnsupportedType)?;
    if size > MAX_IMAGE_BYTES {
        return Err(ImageRejection::TooLarge);
    }
    Ok(kind)
}

/// Checks that adding `incoming` images to `existing` stays within [`MAX_IMAGES`].
pub fn check_total(existing: usize, incoming: usize) -> Result<(), ImageRejection> {
    if existing.saturating_add(incoming) > MAX_IMAGES {
        return Err(ImageRejection::TooMany);
    }
    Ok(())
}

/// Clamps any requested count into `[MIN_ADS, MAX_ADS]`.
pub fn clamp_ad_count(requested: i64) -> u8 {
    // the clamp keeps the value inside u8 range
    requested.clamp(i64::from(MIN_ADS), i64::from(MAX_ADS)) as u8
}

/// Parses a free-form ad count, defaulting to 1 for anything unusable.
///
/// Leading whitespace and a sign are allowed, parsing stops at the first
/// non-digit, so `"2 ads"` is 2 and `"-3"` clamps to 1. Zero counts as
/// unusable and becomes the default.
pub fn parse_ad_count(raw: &str) -> u8 {
    match leading_integer(raw) {
        Some(0) | None => MIN_ADS,
        Some(value) => clamp_ad_count(value),
    }
}

fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits: &str = &digits[..digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len())];
    if digits.is_empty() {
        return None;
    }
    // overlong inputs saturate, they clamp to the max anyway
    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ad_count_clamps_everything_into_range() {
        assert_eq!(parse_ad_count("2"), 2);
        assert_eq!(parse_ad_count("5"), 5);
        assert_eq!(parse_ad_count("6"), 5);
        assert_eq!(parse_ad_count("99999999999999999999999"), 5);
        assert_eq!(parse_ad_count("-3"), 1);
        assert_eq!(parse_ad_count("0"), 1);
        assert_eq!(parse_ad_count(""), 1);
        assert_eq!(parse_ad_count("many"), 1);
        assert_eq!(parse_ad_count("-"), 1);
    }

    #[test]
    fn ad_count_reads_leading_digits() {
        assert_eq!(parse_ad_count("  3"), 3);
        assert_eq!(parse_ad_count("4 ads"), 4);
        assert_eq!(parse_ad_count("2.9"), 2);
        assert_eq!(parse_ad_count("+2"), 2);
    }

    #[test]
    fn clamp_handles_extremes() {
        assert_eq!(clamp_ad_count(i64::MIN), MIN_ADS);
        assert_eq!(clamp_ad_count(i64::MAX), MAX_ADS);
        assert_eq!(clamp_ad_count(3), 3);
    }

    #[test]
    fn mime_matching() {
        assert_eq!(ImageKind::from_mime("image/png"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_mime("IMAGE/JPEG"), Some(ImageKind::Jpeg));
        assert_eq!(
            ImageKind::from_mime("image/webp; charset=binary"),
            Some(ImageKind::Webp)
        );
        assert_eq!(ImageKind::from_mime("image/gif"), None);
        assert_eq!(ImageKind::from_mime("image/jpg"), None);
        assert_eq!(ImageKind::from_mime("text/plain"), None);
    }

    #[test]
    fn image_checks() {
        assert_eq!(check_image("image/png", MAX_IMAGE_BYTES), Ok(ImageKind::Png));
        assert_eq!(
            check_image("image/png", MAX_IMAGE_BYTES + 1),
            Err(ImageRejection::TooLarge)
        );
        assert_eq!(
            check_image("application/pdf", 10),
            Err(ImageRejection::UnsupportedType)
        );
        assert!(check_total(0, 5).is_ok());
        assert_eq!(check_total(3, 3), Err(ImageRejection::TooMany));
    }

    #[test]
    fn rejection_messages() {
        assert_eq!(
            ImageRejection::TooMany.to_string(),
            "You can upload a maximum of 5 images"
        );
        assert_eq!(
            ImageRejection::TooLarge.to_string(),
            "Image must be smaller than 5MB"
        );
    }
}
