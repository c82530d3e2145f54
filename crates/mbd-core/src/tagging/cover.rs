/// Cover image bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl CoverArt {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Guess the MIME type from magic bytes; thumbnails are JPEG unless they say otherwise.
    pub fn sniff(data: Vec<u8>) -> Self {
        let mime = if data.starts_with(&[0x89, b'P', b'N', b'G']) {
            "image/png"
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            "image/webp"
        } else {
            "image/jpeg"
        };
        Self::new(data, mime)
    }

    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}
