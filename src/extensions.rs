use std::path::Path;

/// Case-insensitive set of file extensions
///
/// Accepts entries with or without the leading dot (".nes" and "nes" are the
/// same). Order is kept; it decides precedence when looking files up by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    exts: Vec<String>,
}

impl ExtensionSet {
    pub fn new<I, S>(exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for ext in exts {
            let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
            if !ext.is_empty() && !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }
        Self { exts: normalized }
    }

    /// Extensions without the dot, lowercase, in configured order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.exts.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.exts.is_empty()
    }

    /// Does the file name end in one of the extensions?
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_lowercase();
                self.exts.iter().any(|x| *x == e)
            })
            .unwrap_or(false)
    }
}
