//! Label requests.
//!
//! A [`LabelRequest`] bundles everything needed to preview and print one
//! label. It is checked once at construction and immutable afterwards.

use crate::error::EtiquetaError;
use crate::symbology::Symbology;

/// One label to compose and print `copies` times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRequest {
    code: String,
    format: Symbology,
    caption_primary: Option<String>,
    caption_secondary: Option<String>,
    copies: u32,
}

impl LabelRequest {
    /// Create a request for a single copy without captions.
    ///
    /// ## Errors
    ///
    /// [`EtiquetaError::InvalidRequest`] for an empty code.
    pub fn new(format: Symbology, code: impl Into<String>) -> Result<Self, EtiquetaError> {
        let code = code.into();
        if code.is_empty() {
            return Err(EtiquetaError::InvalidRequest("code must not be empty".into()));
        }
        Ok(Self {
            code,
            format,
            caption_primary: None,
            caption_secondary: None,
            copies: 1,
        })
    }

    /// Set the primary caption. An empty string clears it.
    pub fn with_caption_primary(mut self, caption: impl Into<String>) -> Self {
        self.caption_primary = Some(caption.into()).filter(|c| !c.is_empty());
        self
    }

    /// Set the secondary caption. An empty string clears it.
    pub fn with_caption_secondary(mut self, caption: impl Into<String>) -> Self {
        self.caption_secondary = Some(caption.into()).filter(|c| !c.is_empty());
        self
    }

    /// Set the number of copies.
    ///
    /// ## Errors
    ///
    /// [`EtiquetaError::InvalidRequest`] for zero copies.
    pub fn with_copies(mut self, copies: u32) -> Result<Self, EtiquetaError> {
        if copies == 0 {
            return Err(EtiquetaError::InvalidRequest(
                "copies must be at least 1".into(),
            ));
        }
        self.copies = copies;
        Ok(self)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn format(&self) -> Symbology {
        self.format
    }

    pub fn caption_primary(&self) -> Option<&str> {
        self.caption_primary.as_deref()
    }

    pub fn caption_secondary(&self) -> Option<&str> {
        self.caption_secondary.as_deref()
    }

    pub fn copies(&self) -> u32 {
        self.copies
    }
}
