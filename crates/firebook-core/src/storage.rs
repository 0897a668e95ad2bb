//! Naming rules for the file storage: MIME mapping and the traversal guard.

use std::path::{Component, Path};
use std::str::FromStr;

/// Fallback type for files whose extension is not in the table.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Ordered, bidirectional extension <-> MIME type table.
///
/// Extensions are stored lower-case with their leading dot (`.png`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeTable {
    entries: Vec<(String, String)>,
}

impl MimeTable {
    pub fn new<I, E, M>(entries: I) -> Self
    where
        I: IntoIterator<Item = (E, M)>,
        E: AsRef<str>,
        M: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|(ext, mime)| {
                let ext = ext.as_ref().trim().to_ascii_lowercase();
                let ext = if ext.starts_with('.') { ext } else { format!(".{ext}") };
                (ext, mime.as_ref().trim().to_ascii_lowercase())
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(ext, mime)| (ext.as_str(), mime.as_str()))
    }

    /// Extension for a declared `Content-Type` header.
    ///
    /// The first entry whose MIME type prefixes the header wins, so
    /// parameters such as `; charset=binary` are tolerated.
    pub fn extension_for(&self, content_type: &str) -> Option<&str> {
        let content_type = content_type.trim().to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(_, mime)| content_type.starts_with(mime.as_str()))
            .map(|(ext, _)| ext.as_str())
    }

    /// MIME type for a stored filename, by its lower-cased extension.
    pub fn mime_for(&self, filename: &str) -> &str {
        let Some(ext) = Path::new(filename).extension().and_then(|e| e.to_str()) else {
            return OCTET_STREAM;
        };
        let ext = format!(".{}", ext.to_ascii_lowercase());
        self.entries
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, mime)| mime.as_str())
            .unwrap_or(OCTET_STREAM)
    }
}

impl Default for MimeTable {
    fn default() -> Self {
        Self::new([
            (".png", "image/png"),
            (".jpg", "image/jpg"),
            (".jpeg", "image/jpeg"),
            (".gif", "image/gif"),
        ])
    }
}

impl FromStr for MimeTable {
    type Err = MimeTableParseError;

    /// Parse `.png=image/png,.gif=image/gif`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = Vec::new();
        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.split_once('=') {
                Some((ext, mime))
                    if !ext.trim().is_empty()
                        && !ext.contains(['/', '\\'])
                        && mime.contains('/') =>
                {
                    entries.push((ext.to_string(), mime.to_string()));
                }
                _ => return Err(MimeTableParseError(entry.to_string())),
            }
        }
        if entries.is_empty() {
            return Err(MimeTableParseError(s.to_string()));
        }
        Ok(Self::new(entries))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid MIME table entry `{0}`, expected .ext=type/subtype")]
pub struct MimeTableParseError(pub String);

/// Accept `raw` only if it names a single file directly inside a directory.
///
/// Separators, `.`, `..`, empty names and NUL bytes are all rejected, so
/// the result can be joined onto the storage directory without escaping it.
pub fn leaf_name(raw: &str) -> Option<&str> {
    if raw.is_empty() || raw.contains(['/', '\\', '\0']) {
        return None;
    }
    let mut components = Path::new(raw).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(raw),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_matches_prefix() {
        let table = MimeTable::default();
        assert_eq!(table.extension_for("image/png"), Some(".png"));
        assert_eq!(table.extension_for("image/jpeg"), Some(".jpeg"));
        assert_eq!(table.extension_for("IMAGE/GIF; charset=binary"), Some(".gif"));
        assert_eq!(table.extension_for("application/pdf"), None);
        assert_eq!(table.extension_for(""), None);
    }

    #[test]
    fn test_mime_for_by_extension() {
        let table = MimeTable::default();
        assert_eq!(table.mime_for("1700000000000.png"), "image/png");
        assert_eq!(table.mime_for("1700000000000.JPG"), "image/jpg");
        assert_eq!(table.mime_for("notes.txt"), OCTET_STREAM);
        assert_eq!(table.mime_for("no-extension"), OCTET_STREAM);
    }

    #[test]
    fn test_parse_table() {
        let table: MimeTable = "png=image/png, .WEBP=image/webp".parse().unwrap();
        assert_eq!(table.extension_for("image/webp"), Some(".webp"));
        assert_eq!(table.mime_for("a.png"), "image/png");

        assert!("".parse::<MimeTable>().is_err());
        assert!(".png".parse::<MimeTable>().is_err());
        assert!(".png=png".parse::<MimeTable>().is_err());
        assert!("../x=image/png".parse::<MimeTable>().is_err());
    }

    #[test]
    fn test_leaf_name_rejects_traversal() {
        assert_eq!(leaf_name("1700000000000.png"), Some("1700000000000.png"));
        assert_eq!(leaf_name("..."), Some("..."));

        for bad in ["", ".", "..", "../../etc/passwd", "a/b.png", "/etc/passwd", "..\\x", "a\0b"] {
            assert_eq!(leaf_name(bad), None, "{bad:?} should be rejected");
        }
    }
}
