use bytes::Bytes;
use serde::Serialize;

const PDF_MAGIC: &[u8; 4] = b"%PDF";
const PNG_MAGIC: &[u8; 4] = &[0x89, b'P', b'N', b'G'];

/// Format of a rendered artifact, inferred from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Pdf,
    Png,
    Unknown,
}

impl ArtifactFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactFormat::Pdf => "pdf",
            ArtifactFormat::Png => "png",
            ArtifactFormat::Unknown => "unknown",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ArtifactFormat::Pdf => "application/pdf",
            ArtifactFormat::Png => "image/png",
            ArtifactFormat::Unknown => "application/octet-stream",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactFormat::Pdf => "pdf",
            ArtifactFormat::Png => "png",
            ArtifactFormat::Unknown => "bin",
        }
    }
}

/// Classifies bytes by magic number. Anything shorter than four bytes is unknown.
pub fn classify(bytes: &[u8]) -> ArtifactFormat {
    match bytes.get(..4) {
        Some(head) if head == PDF_MAGIC => ArtifactFormat::Pdf,
        Some(head) if head == PNG_MAGIC => ArtifactFormat::Png,
        _ => ArtifactFormat::Unknown,
    }
}

/// The rendered output handed back to the caller.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bytes: Bytes,
    pub format: ArtifactFormat,
    /// Name of the backend that produced it.
    pub backend: String,
}

impl Artifact {
    pub fn new(bytes: Bytes, backend: impl Into<String>) -> Self {
        let format = classify(&bytes);
        Self {
            bytes,
            format,
            backend: backend.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}
