//! Profile photo widget: optimistic preview, deferred upload, rollback on
//! failure.
//!
//! ```text
//! Idle/Failed --select--> Previewing --begin--> Committing --commit--> Idle
//!                                                          \--roll_back--> Failed
//! ```

use crate::web::errors::AppError;
use base64ct::{Base64, Encoding};
use std::future::Future;
use thiserror::Error;
use tracing::{debug, error, instrument};

/// Largest accepted image, in bytes.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Please select an image file")]
    NotAnImage,
    #[error("Image must be less than 5MB")]
    TooLarge,
    #[error(transparent)]
    Upload(#[from] AppError),
}

/// A file picked by the user.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageFile {
    #[must_use]
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    /// `data:<type>;base64,<payload>`
    #[must_use]
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            Base64::encode_string(&self.bytes)
        )
    }

    /// # Errors
    /// Returns an error for non-image types and files over [`MAX_IMAGE_BYTES`].
    pub fn validate(&self) -> Result<(), UploadError> {
        if !self.is_image() {
            return Err(UploadError::NotAnImage);
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(UploadError::TooLarge);
        }
        Ok(())
    }
}

/// Durable storage for the selected image.
pub trait Uploader: Send + Sync {
    fn upload(&self, file: &ImageFile) -> impl Future<Output = Result<(), AppError>> + Send;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadState {
    Idle {
        preview: Option<String>,
        committed: Option<String>,
    },
    /// Speculative preview shown, upload not started.
    Previewing {
        speculative: String,
        committed: Option<String>,
    },
    /// Upload in flight; the upload affordance is disabled.
    Committing {
        speculative: String,
        committed: Option<String>,
    },
    /// Last upload failed; the preview is back to `committed`.
    Failed {
        committed: Option<String>,
        message: String,
    },
}

impl Default for UploadState {
    fn default() -> Self {
        Self::Idle {
            preview: None,
            committed: None,
        }
    }
}

impl UploadState {
    #[must_use]
    pub fn idle(committed: Option<String>) -> Self {
        Self::Idle {
            preview: committed.clone(),
            committed,
        }
    }

    #[must_use]
    pub fn preview_uri(&self) -> Option<&str> {
        match self {
            Self::Idle { preview, .. } => preview.as_deref(),
            Self::Previewing { speculative, .. } | Self::Committing { speculative, .. } => {
                Some(speculative)
            }
            Self::Failed { committed, .. } => committed.as_deref(),
        }
    }

    #[must_use]
    pub fn committed_uri(&self) -> Option<&str> {
        match self {
            Self::Idle { committed, .. }
            | Self::Previewing { committed, .. }
            | Self::Committing { committed, .. }
            | Self::Failed { committed, .. } => committed.as_deref(),
        }
    }

    #[must_use]
    pub fn uploading(&self) -> bool {
        matches!(self, Self::Committing { .. })
    }

    fn into_committed(self) -> Option<String> {
        match self {
            Self::Idle { committed, .. }
            | Self::Previewing { committed, .. }
            | Self::Committing { committed, .. }
            | Self::Failed { committed, .. } => committed,
        }
    }

    /// Show `uri` before the upload is confirmed. Ignored while committing.
    #[must_use]
    pub fn preview(self, uri: String) -> Self {
        if self.uploading() {
            return self;
        }
        Self::Previewing {
            speculative: uri,
            committed: self.into_committed(),
        }
    }

    #[must_use]
    pub fn begin(self) -> Self {
        match self {
            Self::Previewing {
                speculative,
                committed,
            } => Self::Committing {
                speculative,
                committed,
            },
            other => other,
        }
    }

    /// The speculative preview becomes the committed image.
    #[must_use]
    pub fn commit(self) -> Self {
        match self {
            Self::Committing { speculative, .. } => Self::Idle {
                preview: Some(speculative.clone()),
                committed: Some(speculative),
            },
            other => other,
        }
    }

    /// Drop the speculative preview and fall back to the committed image.
    #[must_use]
    pub fn roll_back(self, message: impl Into<String>) -> Self {
        match self {
            Self::Committing { committed, .. } => Self::Failed {
                committed,
                message: message.into(),
            },
            other => other,
        }
    }

    /// Clear the preview to empty, not to the committed image.
    #[must_use]
    pub fn cleared(self) -> Self {
        Self::Idle {
            preview: None,
            committed: self.into_committed(),
        }
    }
}

pub struct PhotoUpload<U> {
    uploader: U,
    state: UploadState,
    selected: Option<ImageFile>,
}

impl<U: Uploader> PhotoUpload<U> {
    /// `src` is the image the server currently holds.
    #[must_use]
    pub fn new(uploader: U, src: Option<String>) -> Self {
        Self {
            uploader,
            state: UploadState::idle(src),
            selected: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &UploadState {
        &self.state
    }

    #[must_use]
    pub fn preview_uri(&self) -> Option<&str> {
        self.state.preview_uri()
    }

    #[must_use]
    pub fn uploading(&self) -> bool {
        self.state.uploading()
    }

    #[must_use]
    pub fn can_upload(&self) -> bool {
        !self.uploading()
    }

    #[must_use]
    pub fn selected(&self) -> Option<&ImageFile> {
        self.selected.as_ref()
    }

    /// Validate, preview, then upload `file`.
    ///
    /// Validation failures leave the widget untouched and never reach the
    /// uploader. An upload failure rolls the preview back to the committed
    /// image.
    ///
    /// # Errors
    /// Returns the validation error or the uploader's error.
    #[instrument(skip(self), fields(name = %file.name, len = file.bytes.len()))]
    pub async fn select(&mut self, file: ImageFile) -> Result<(), UploadError> {
        file.validate()?;

        let state = std::mem::take(&mut self.state);
        self.state = state.preview(file.data_uri()).begin();
        debug!("preview set, uploading");

        let result = self.uploader.upload(&file).await;
        self.selected = Some(file);

        let state = std::mem::take(&mut self.state);
        match result {
            Ok(()) => {
                self.state = state.commit();
                Ok(())
            }
            Err(err) => {
                error!("Upload failed: {err}");
                self.state = state.roll_back(err.to_string());
                Err(UploadError::Upload(err))
            }
        }
    }

    /// Clear the preview and forget the selected file.
    pub fn remove(&mut self) {
        let state = std::mem::take(&mut self.state);
        self.state = state.cleared();
        self.selected = None;
    }
}
