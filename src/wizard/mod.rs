//! The ad wizard: a four step state machine collecting a product name,
//! source images and guidance, then holding the generated results.
//!
//! The machine does no I/O. Submitting is split into
//! [`Wizard::begin_submission`], which hands back the [`Submission`] to send,
//! and [`Wizard::finish_submission`], which takes the outcome.

use std::path::Path;

use bytes::Bytes;

use crate::rules::{
    ImageRejection, MAX_ADS, MIN_ADS, check_image, check_total, clamp_ad_count, parse_ad_count,
};

mod client;
mod preview;

pub use client::{AdClient, SubmitError};
pub use preview::{PreviewRef, PreviewRegistry};

/// MIME type used when nothing better can be worked out.
const UNKNOWN_MIME: &str = "application/octet-stream";

/// Wizard steps, in order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Step {
    /// 1: product name.
    ProductInfo,
    /// 2: source images.
    UploadImages,
    /// 3: guidance prompt and ad count.
    Guidance,
    /// 4: generated images.
    Results,
}

impl Step {
    /// 1-based position of the step.
    pub fn number(self) -> u8 {
        match self {
            Step::ProductInfo => 1,
            Step::UploadImages => 2,
            Step::Guidance => 3,
            Step::Results => 4,
        }
    }

    /// Heading shown for the step.
    pub fn title(self) -> &'static str {
        match self {
            Step::ProductInfo => "Product Details",
            Step::UploadImages => "Upload Product Images",
            Step::Guidance => "Ad Specifics",
            Step::Results => "Your Ads",
        }
    }
}

/// Reasons a wizard operation was refused.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WizardError {
    /// The operation belongs to another step.
    WrongStep {
        /// Step the operation needs.
        expected: Step,
        /// Step the wizard is on.
        actual: Step,
    },
    /// Gate 1→2: the product name is blank.
    ProductNameRequired,
    /// Gate 2→3: no image has been accepted.
    ImagesRequired,
    /// Gate 3→submit: the guidance prompt is blank.
    GuidanceRequired,
    /// Gate 3→submit: ad count outside `[1, 5]`.
    AdCountOutOfRange,
    /// A selection was refused.
    Rejected(ImageRejection),
    /// No image at that index.
    NoSuchImage(usize),
    /// A submission is already running.
    SubmissionInFlight,
    /// `finish_submission` without a running submission.
    NotSubmitting,
}

impl std::fmt::Display for WizardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongStep { expected, actual } => write!(
                f,
                "That can only be done on step {} (currently on step {})",
                expected.number(),
                actual.number()
            ),
            Self::ProductNameRequired => write!(f, "Please enter a product name"),
            Self::ImagesRequired => write!(f, "Please upload at least one image"),
            Self::GuidanceRequired => write!(f, "Please enter a guidance prompt"),
            Self::AdCountOutOfRange => {
                write!(f, "Number of ads must be between {MIN_ADS} and {MAX_ADS}")
            }
            Self::Rejected(rejection) => write!(f, "{rejection}"),
            Self::NoSuchImage(index) => write!(f, "There is no image number {}", index + 1),
            Self::SubmissionInFlight => write!(f, "Still generating, please wait"),
            Self::NotSubmitting => write!(f, "Nothing is being generated"),
        }
    }
}

impl std::error::Error for WizardError {}

impl From<ImageRejection> for WizardError {
    fn from(rejection: ImageRejection) -> Self {
        WizardError::Rejected(rejection)
    }
}

/// A file picked by the user, not yet accepted.
#[derive(Clone, Debug)]
pub struct SelectedFile {
    name: String,
    mime: String,
    bytes: Bytes,
}

impl SelectedFile {
    /// Wraps already-loaded file contents.
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk. The MIME type comes from the extension,
    /// falling back to sniffing the contents.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let mime = image::ImageFormat::from_path(path)
            .ok()
            .or_else(|| image::guess_format(&bytes).ok())
            .map(|format| format.to_mime_type())
            .unwrap_or(UNKNOWN_MIME);
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self::new(name, mime, bytes))
    }

    /// File name without directories.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// MIME type.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// File contents.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// An accepted image and its preview.
#[derive(Debug)]
pub struct UploadedImage {
    file: SelectedFile,
    preview: PreviewRef,
}

impl UploadedImage {
    /// The accepted file.
    pub fn file(&self) -> &SelectedFile {
        &self.file
    }

    /// Its preview handle.
    pub fn preview(&self) -> &PreviewRef {
        &self.preview
    }
}

/// Everything the relay needs for one generation request.
#[derive(Clone, Debug)]
pub struct Submission {
    /// Product name as entered.
    pub product_name: String,
    /// Guidance prompt as entered.
    pub guidance_prompt: String,
    /// Requested ad count, within `[1, 5]`.
    pub ad_count: u8,
    /// Accepted images in selection order.
    pub images: Vec<SelectedFile>,
}

/// Wizard state.
#[derive(Debug)]
pub struct Wizard {
    step: Step,
    product_name: String,
    images: Vec<UploadedImage>,
    guidance_prompt: String,
    ad_count: u8,
    submitting: bool,
    error: Option<String>,
    generated: Vec<String>,
    previews: PreviewRegistry,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    /// A fresh wizard on step 1.
    pub fn new() -> Self {
        Self {
            step: Step::ProductInfo,
            product_name: String::new(),
            images: Vec::new(),
            guidance_prompt: String::new(),
            ad_count: MIN_ADS,
            submitting: false,
            error: None,
            generated: Vec::new(),
            previews: PreviewRegistry::default(),
        }
    }

    /// Current step.
    pub fn step(&self) -> Step {
        self.step
    }

    /// Product name as entered.
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// Accepted images.
    pub fn images(&self) -> &[UploadedImage] {
        &self.images
    }

    /// Guidance prompt as entered.
    pub fn guidance_prompt(&self) -> &str {
        &self.guidance_prompt
    }

    /// Requested ad count.
    pub fn ad_count(&self) -> u8 {
        self.ad_count
    }

    /// True while a submission is out.
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// The error banner, if one is showing.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// URLs returned by the last successful submission.
    pub fn generated_images(&self) -> &[String] {
        &self.generated
    }

    /// Preview data for the accepted images.
    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    fn require_step(&self, expected: Step) -> Result<(), WizardError> {
        if self.step != expected {
            return Err(WizardError::WrongStep {
                expected,
                actual: self.step,
            });
        }
        Ok(())
    }

    /// Sets the product name (step 1).
    pub fn set_product_name(&mut self, name: impl Into<String>) -> Result<(), WizardError> {
        self.require_step(Step::ProductInfo)?;
        self.product_name = name.into();
        Ok(())
    }

    /// Sets the guidance prompt (step 3).
    pub fn set_guidance_prompt(&mut self, prompt: impl Into<String>) -> Result<(), WizardError> {
        self.require_step(Step::Guidance)?;
        self.guidance_prompt = prompt.into();
        Ok(())
    }

    /// Sets the ad count (step 3), clamped into `[1, 5]`.
    pub fn set_ad_count(&mut self, count: i64) -> Result<u8, WizardError> {
        self.require_step(Step::Guidance)?;
        self.ad_count = clamp_ad_count(count);
        Ok(self.ad_count)
    }

    /// Sets the ad count from free text (step 3), see [`parse_ad_count`].
    pub fn set_ad_count_text(&mut self, raw: &str) -> Result<u8, WizardError> {
        self.require_step(Step::Guidance)?;
        self.ad_count = parse_ad_count(raw);
        Ok(self.ad_count)
    }

    /// Checks the gate out of the current step.
    pub fn check_gate(&self) -> Result<(), WizardError> {
        match self.step {
            Step::ProductInfo if self.product_name.trim().is_empty() => {
                Err(WizardError::ProductNameRequired)
            }
            Step::UploadImages if self.images.is_empty() => Err(WizardError::ImagesRequired),
            Step::Guidance if self.guidance_prompt.trim().is_empty() => {
                Err(WizardError::GuidanceRequired)
            }
            Step::Guidance if !(MIN_ADS..=MAX_ADS).contains(&self.ad_count) => {
                Err(WizardError::AdCountOutOfRange)
            }
            _ => Ok(()),
        }
    }

    /// True when the gate out of the current step is met.
    pub fn can_proceed(&self) -> bool {
        self.check_gate().is_ok()
    }

    /// Moves from step 1 to 2 or from 2 to 3. Leaving step 3 is done by submitting.
    pub fn next(&mut self) -> Result<Step, WizardError> {
        let target = match self.step {
            Step::ProductInfo => Step::UploadImages,
            Step::UploadImages => Step::Guidance,
            other => {
                return Err(WizardError::WrongStep {
                    expected: Step::UploadImages,
                    actual: other,
                });
            }
        };
        self.check_gate()?;
        self.step = target;
        Ok(target)
    }

    /// Moves back from step 2 or 3.
    pub fn back(&mut self) -> Result<Step, WizardError> {
        if self.submitting {
            return Err(WizardError::SubmissionInFlight);
        }
        let target = match self.step {
            Step::UploadImages => Step::ProductInfo,
            Step::Guidance => Step::UploadImages,
            other => {
                return Err(WizardError::WrongStep {
                    expected: Step::Guidance,
                    actual: other,
                });
            }
        };
        self.step = target;
        Ok(target)
    }

    /// Accepts a selection of files (step 2), all or nothing.
    ///
    /// On rejection the error banner is set and none of the batch is kept.
    /// Returns the number of images now held.
    pub fn add_images(&mut self, files: Vec<SelectedFile>) -> Result<usize, WizardError> {
        self.require_step(Step::UploadImages)?;
        if let Err(rejection) = Self::check_batch(self.images.len(), &files) {
            self.error = Some(rejection.to_string());
            return Err(rejection.into());
        }

        for file in files {
            let preview = self.previews.create(file.bytes.clone());
            self.images.push(UploadedImage { file, preview });
        }
        self.error = None;
        Ok(self.images.len())
    }

    fn check_batch(existing: usize, files: &[SelectedFile]) -> Result<(), ImageRejection> {
        check_total(existing, files.len())?;
        for file in files {
            check_image(&file.mime, file.size())?;
        }
        Ok(())
    }

    /// Removes an accepted image (step 2) and releases its preview.
    pub fn remove_image(&mut self, index: usize) -> Result<SelectedFile, WizardError> {
        self.require_step(Step::UploadImages)?;
        if index >= self.images.len() {
            return Err(WizardError::NoSuchImage(index));
        }
        let removed = self.images.remove(index);
        self.previews.release(&removed.preview);
        Ok(removed.file)
    }

    /// Checks gate 3 and marks a submission as running.
    pub fn begin_submission(&mut self) -> Result<Submission, WizardError> {
        self.require_step(Step::Guidance)?;
        if self.submitting {
            return Err(WizardError::SubmissionInFlight);
        }
        self.check_gate()?;

        self.submitting = true;
        self.error = None;
        Ok(Submission {
            product_name: self.product_name.clone(),
            guidance_prompt: self.guidance_prompt.clone(),
            ad_count: self.ad_count,
            images: self.images.iter().map(|image| image.file.clone()).collect(),
        })
    }

    /// Records the outcome of the running submission. Success moves to the
    /// results step, failure stays on step 3 with the message in the banner.
    pub fn finish_submission<E: std::fmt::Display>(
        &mut self,
        outcome: Result<Vec<String>, E>,
    ) -> Result<Step, WizardError> {
        if !self.submitting {
            return Err(WizardError::NotSubmitting);
        }
        self.submitting = false;
        match outcome {
            Ok(images) => {
                self.generated = images;
                self.step = Step::Results;
            }
            Err(err) => self.error = Some(err.to_string()),
        }
        Ok(self.step)
    }

    /// Goes back to step 1 from the results, forgetting everything.
    pub fn start_over(&mut self) -> Result<(), WizardError> {
        self.require_step(Step::Results)?;
        for image in self.images.drain(..) {
            self.previews.release(&image.preview);
        }
        *self = Self::new();
        Ok(())
    }
}
