// Map a file name to the MIME type the generation service expects.

use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;

/// File types the client can upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeType {
    Png,
    Jpeg,
    Pdf,
}

impl MimeType {
    /// Resolve from the file extension. Matching ignores ASCII case, so
    /// `photo.JPG` is accepted as JPEG.
    pub fn from_path(path: &Path) -> Result<Self> {
        let unsupported = || Error::UnsupportedFileType(path.display().to_string());
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(unsupported)?;

        if ext.eq_ignore_ascii_case("png") {
            Ok(MimeType::Png)
        } else if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") {
            Ok(MimeType::Jpeg)
        } else if ext.eq_ignore_ascii_case("pdf") {
            Ok(MimeType::Pdf)
        } else {
            Err(unsupported())
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MimeType::Png => "image/png",
            MimeType::Jpeg => "image/jpeg",
            MimeType::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(name: &str) -> Result<MimeType> {
        MimeType::from_path(Path::new(name))
    }

    #[test]
    fn known_extensions() {
        assert_eq!(resolve("photo.png").unwrap(), MimeType::Png);
        assert_eq!(resolve("photo.jpg").unwrap(), MimeType::Jpeg);
        assert_eq!(resolve("photo.jpeg").unwrap(), MimeType::Jpeg);
        assert_eq!(resolve("doc.pdf").unwrap().as_str(), "application/pdf");
        assert_eq!(resolve("dir.v2/scan.png").unwrap().as_str(), "image/png");
    }

    #[test]
    fn uppercase_extensions_are_accepted() {
        assert_eq!(resolve("photo.JPG").unwrap(), MimeType::Jpeg);
        assert_eq!(resolve("scan.PNG").unwrap(), MimeType::Png);
    }

    #[test]
    fn other_extensions_are_rejected() {
        assert!(matches!(resolve("file.txt"), Err(Error::UnsupportedFileType(_))));
        assert!(matches!(resolve("noext"), Err(Error::UnsupportedFileType(_))));
        assert!(matches!(resolve(".png"), Err(Error::UnsupportedFileType(_))));
    }
}
