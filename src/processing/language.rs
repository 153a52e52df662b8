//! Programming language definitions and detection.
//!
//! Detection is a pure function of the file extension, matched
//! case-insensitively against a fixed process-wide table.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Languages with a registered extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
    JavaScript,
    C,
    Cpp,
}

impl Language {
    /// Every supported language, in registration order.
    pub const ALL: [Language; 5] = [
        Language::Python,
        Language::Java,
        Language::JavaScript,
        Language::C,
        Language::Cpp,
    ];

    /// Get the language from a string identifier.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Some(Language::Python),
            "java" => Some(Language::Java),
            "javascript" | "js" | "jsx" => Some(Language::JavaScript),
            "c" => Some(Language::C),
            "cpp" | "c++" | "cxx" => Some(Language::Cpp),
            _ => None,
        }
    }

    /// Get a string representation of the language.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Java => "java",
            Language::JavaScript => "javascript",
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

lazy_static::lazy_static! {
    static ref EXTENSION_MAP: HashMap<&'static str, Language> = [
        ("py", Language::Python),
        ("java", Language::Java),
        ("js", Language::JavaScript),
        ("jsx", Language::JavaScript),
        ("c", Language::C),
        ("h", Language::C),
        ("cpp", Language::Cpp),
        ("hpp", Language::Cpp),
    ]
    .into_iter()
    .collect();
}

/// Extension-based language detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageDetector;

impl LanguageDetector {
    pub fn new() -> Self {
        Self
    }

    /// Detect the language of a file from its extension.
    ///
    /// Returns `None` for files without an extension or with an extension
    /// outside the table; callers skip such files.
    pub fn detect(&self, path: &Path) -> Option<Language> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        EXTENSION_MAP.get(extension.as_str()).copied()
    }

    /// Extensions (without the dot) mapped to `language`.
    pub fn extensions_for(&self, language: Language) -> Vec<&'static str> {
        let mut extensions: Vec<_> = EXTENSION_MAP
            .iter()
            .filter(|(_, &lang)| lang == language)
            .map(|(&ext, _)| ext)
            .collect();
        extensions.sort_unstable();
        extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_detection() {
        let detector = LanguageDetector::new();

        let cases = [
            ("main.py", Language::Python),
            ("Main.java", Language::Java),
            ("app.js", Language::JavaScript),
            ("view.jsx", Language::JavaScript),
            ("util.c", Language::C),
            ("util.h", Language::C),
            ("engine.cpp", Language::Cpp),
            ("engine.hpp", Language::Cpp),
        ];
        for (path, expected) in cases {
            assert_eq!(detector.detect(Path::new(path)), Some(expected), "{}", path);
        }
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let detector = LanguageDetector::new();
        assert_eq!(detector.detect(Path::new("SCRIPT.PY")), Some(Language::Python));
        assert_eq!(detector.detect(Path::new("Widget.JsX")), Some(Language::JavaScript));
    }

    #[test]
    fn test_unlisted_extensions() {
        let detector = LanguageDetector::new();
        for path in ["README.md", "lib.rs", "main.go", "Makefile", "archive.tar.gz", ".py"] {
            assert_eq!(detector.detect(Path::new(path)), None, "{}", path);
        }
    }

    #[test]
    fn test_extensions_for() {
        let detector = LanguageDetector::new();
        assert_eq!(detector.extensions_for(Language::JavaScript), vec!["js", "jsx"]);
        assert_eq!(detector.extensions_for(Language::Cpp), vec!["cpp", "hpp"]);
    }

    #[test]
    fn test_language_from_str() {
        assert_eq!(Language::from_str("python"), Some(Language::Python));
        assert_eq!(Language::from_str("C++"), Some(Language::Cpp));
        assert_eq!(Language::from_str("rust"), None);
    }
}
