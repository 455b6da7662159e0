//! Input slots and the choices that drive them
//!
//! A slot is one of the two input areas of the form (the YAML context and the
//! JSON document). Each slot can take its value from inline text, an uploaded
//! file or a remote URL; which one is active is decided by its
//! [`InputSource`]. Nothing here validates anything, that is the job of
//! [`crate::gate`].

use std::fmt;

/// Where a slot takes its value from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputSource {
    #[default]
    Content,
    File,
    Url,
}

impl InputSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputSource::Content => "content",
            InputSource::File => "file",
            InputSource::Url => "url",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "content" => Some(InputSource::Content),
            "file" => Some(InputSource::File),
            "url" => Some(InputSource::Url),
            _ => None,
        }
    }

    pub fn all() -> Vec<InputSource> {
        vec![InputSource::Content, InputSource::File, InputSource::Url]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            InputSource::Content => "Text",
            InputSource::File => "File",
            InputSource::Url => "URL",
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output requested from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Ttl,
    Json,
    Expanded,
    /// Zip bundle with every output type
    All,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Ttl => "ttl",
            OutputFormat::Json => "json",
            OutputFormat::Expanded => "expanded",
            OutputFormat::All => "all",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ttl" => Some(OutputFormat::Ttl),
            "json" => Some(OutputFormat::Json),
            "expanded" => Some(OutputFormat::Expanded),
            "all" => Some(OutputFormat::All),
            _ => None,
        }
    }

    pub fn all() -> Vec<OutputFormat> {
        vec![
            OutputFormat::Ttl,
            OutputFormat::Json,
            OutputFormat::Expanded,
            OutputFormat::All,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OutputFormat::Ttl => "Turtle",
            OutputFormat::Json => "Uplifted JSON",
            OutputFormat::Expanded => "Expanded JSON-LD",
            OutputFormat::All => "All (zip)",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one of the two slots of the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    Context,
    Json,
}

impl SlotId {
    /// Multipart field carrying inline text or a file
    pub fn content_field(&self) -> &'static str {
        match self {
            SlotId::Context => "context",
            SlotId::Json => "json",
        }
    }

    /// Multipart field carrying a remote URL
    pub fn url_field(&self) -> &'static str {
        match self {
            SlotId::Context => "contexturl",
            SlotId::Json => "jsonurl",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SlotId::Context => "Context (YAML)",
            SlotId::Json => "JSON document",
        }
    }
}

/// A file picked by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// State of one input area
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSlot {
    pub source: InputSource,
    pub text: String,
    pub file: Option<UploadedFile>,
    pub url: Option<String>,
}

impl InputSlot {
    pub fn set_source(&mut self, source: InputSource) {
        self.source = source;
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_file(&mut self, file: Option<UploadedFile>) {
        self.file = file;
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = Some(url.into());
    }

    /// URL of the slot, empty when none was entered
    pub fn url_str(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }

    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }
}
