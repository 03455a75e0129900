use std::collections::HashMap;
use std::path::Path;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Overrides always installed on top of the `mime_guess` database.
pub const DEFAULT_OVERRIDES: &[(&str, &str)] = &[
    (".wasm", "application/wasm"),
    (".mjs", "application/javascript"),
];

/// Extension to content-type resolution: overrides first, then the
/// `mime_guess` database, then `application/octet-stream`.
#[derive(Debug, Clone)]
pub struct MimeTypes {
    overrides: HashMap<String, String>,
}

impl MimeTypes {
    /// Extra entries are keyed by dotted extension (`.wasm`) and replace
    /// default overrides with the same key.
    pub fn new(extra: &[(String, String)]) -> Self {
        let mut overrides: HashMap<String, String> = DEFAULT_OVERRIDES
            .iter()
            .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
            .collect();

        for (ext, mime) in extra {
            overrides.insert(ext.clone(), mime.clone());
        }

        Self { overrides }
    }

    pub fn content_type(&self, path: &Path) -> &str {
        let ext = match path.extension().and_then(|s| s.to_str()) {
            Some(ext) => ext,
            None => return OCTET_STREAM,
        };

        let dotted = format!(".{}", ext);
        if let Some(mime) = self.overrides.get(&dotted) {
            return mime;
        }

        let lower = dotted.to_lowercase();
        if let Some(mime) = self.overrides.get(&lower) {
            return mime;
        }

        mime_guess::from_ext(&lower[1..])
            .first_raw()
            .unwrap_or(OCTET_STREAM)
    }
}

impl Default for MimeTypes {
    fn default() -> Self {
        Self::new(&[])
    }
}
