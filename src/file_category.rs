//! Extension-based file categorization.
//!
//! This module maps file extensions to broad categories (e.g. "Images",
//! "Documents"). The mapping lives in an immutable [`CategoryTable`] that is
//! built once at startup and handed to the organizer by reference.
//!
//! # Examples
//!
//! ```
//! use dirsweep::file_category::{Category, CategoryTable};
//!
//! let table = CategoryTable::builtin();
//! assert_eq!(table.classify(Some("png")), Category::Images);
//! assert_eq!(table.classify(Some("PDF")), Category::Documents);
//! assert_eq!(table.classify(Some("xyz")), Category::Other);
//! assert_eq!(table.classify(None), Category::Other);
//! ```

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Represents a broad file category.
///
/// The declaration order is the order categories are listed in summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    /// Image files (JPG, PNG, SVG, etc.)
    Images,
    /// Document files (PDF, DOCX, TXT, office formats)
    Documents,
    /// Video files (MP4, MKV, MOV, etc.)
    Videos,
    /// Audio files (MP3, FLAC, WAV, etc.)
    Audio,
    /// Archive and disk image files (ZIP, 7Z, ISO, etc.)
    Archives,
    /// Source code files
    Code,
    /// Installers, scripts and application bundles
    Executables,
    /// Structured data files (JSON, CSV, SQL, etc.)
    Data,
    /// Unknown or uncategorized files
    Other,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 9] = [
        Category::Images,
        Category::Documents,
        Category::Videos,
        Category::Audio,
        Category::Archives,
        Category::Code,
        Category::Executables,
        Category::Data,
        Category::Other,
    ];

    /// Returns the category name, which is also its folder name.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirsweep::file_category::Category;
    ///
    /// assert_eq!(Category::Images.name(), "Images");
    /// assert_eq!(Category::Other.name(), "Other");
    /// ```
    pub fn name(&self) -> &'static str {
        match self {
            Category::Images => "Images",
            Category::Documents => "Documents",
            Category::Videos => "Videos",
            Category::Audio => "Audio",
            Category::Archives => "Archives",
            Category::Code => "Code",
            Category::Executables => "Executables",
            Category::Data => "Data",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised while building a [`CategoryTable`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// The same extension was declared for two categories.
    #[error("extension '{extension}' is declared for both {first} and {second}")]
    DuplicateExtension {
        extension: String,
        first: Category,
        second: Category,
    },
    /// `Other` is the fallback and cannot own extensions.
    #[error("the {0} category cannot be given extensions")]
    FallbackHasExtensions(Category),
    /// An empty extension string was declared.
    #[error("empty extension declared for {0}")]
    EmptyExtension(Category),
}

const BUILTIN: &[(Category, &[&str])] = &[
    (
        Category::Images,
        &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp", "ico", "tiff"],
    ),
    (
        Category::Documents,
        &["pdf", "doc", "docx", "txt", "xlsx", "xls", "ppt", "pptx", "odt"],
    ),
    (
        Category::Videos,
        &["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v"],
    ),
    (
        Category::Audio,
        &["mp3", "wav", "flac", "aac", "ogg", "wma", "m4a", "aiff"],
    ),
    (
        Category::Archives,
        &["zip", "rar", "7z", "tar", "gz", "bz2", "iso"],
    ),
    (
        Category::Code,
        &[
            "py", "js", "html", "css", "java", "cpp", "c", "php", "rb", "go", "rs",
        ],
    ),
    (
        Category::Executables,
        &["exe", "msi", "bat", "cmd", "sh", "app", "dmg"],
    ),
    (
        Category::Data,
        &["json", "xml", "csv", "sql", "db", "yml", "yaml"],
    ),
];

/// Maps file extensions to categories.
///
/// Extensions are stored lowercase without a leading dot and are disjoint
/// across categories. The table is immutable once built.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    entries: Vec<(Category, Vec<String>)>,
    extension_map: HashMap<String, Category>,
}

impl CategoryTable {
    /// Builds a table from `(category, extensions)` pairs.
    ///
    /// Extensions are lowercased and may be given with or without a leading
    /// dot.
    ///
    /// # Errors
    ///
    /// Returns a [`TableError`] if an extension appears twice, if an
    /// extension is empty, or if extensions are given for [`Category::Other`].
    pub fn new<I, E, S>(entries: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (Category, E)>,
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self {
            entries: Vec::new(),
            extension_map: HashMap::new(),
        };

        for (category, extensions) in entries {
            if category == Category::Other {
                return Err(TableError::FallbackHasExtensions(category));
            }

            let mut normalized = Vec::new();
            for ext in extensions {
                let ext = normalize_extension(ext.as_ref());
                if ext.is_empty() {
                    return Err(TableError::EmptyExtension(category));
                }
                if let Some(&first) = table.extension_map.get(&ext) {
                    return Err(TableError::DuplicateExtension {
                        extension: ext,
                        first,
                        second: category,
                    });
                }
                table.extension_map.insert(ext.clone(), category);
                normalized.push(ext);
            }
            table.entries.push((category, normalized));
        }

        Ok(table)
    }

    /// Returns the built-in table.
    pub fn builtin() -> Self {
        Self::new(BUILTIN.iter().map(|(category, exts)| (*category, exts.iter())))
            .expect("built-in category table must have disjoint extensions")
    }

    /// Maps an extension (without the dot) to its category.
    ///
    /// Absent and unknown extensions map to [`Category::Other`].
    ///
    /// # Examples
    ///
    /// ```
    /// use dirsweep::file_category::{Category, CategoryTable};
    ///
    /// let table = CategoryTable::builtin();
    /// assert_eq!(table.classify(Some("Mp3")), Category::Audio);
    /// assert_eq!(table.classify(None), Category::Other);
    /// ```
    pub fn classify(&self, extension: Option<&str>) -> Category {
        extension
            .and_then(|ext| self.extension_map.get(&normalize_extension(ext)))
            .copied()
            .unwrap_or(Category::Other)
    }

    /// Categories and their extensions in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (Category, &[String])> {
        self.entries
            .iter()
            .map(|(category, exts)| (*category, exts.as_slice()))
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names() {
        assert_eq!(Category::Images.name(), "Images");
        assert_eq!(Category::Documents.name(), "Documents");
        assert_eq!(Category::Videos.name(), "Videos");
        assert_eq!(Category::Audio.name(), "Audio");
        assert_eq!(Category::Archives.name(), "Archives");
        assert_eq!(Category::Code.name(), "Code");
        assert_eq!(Category::Executables.name(), "Executables");
        assert_eq!(Category::Data.name(), "Data");
        assert_eq!(Category::Other.name(), "Other");
    }

    #[test]
    fn test_every_declared_extension_maps_to_its_category() {
        let table = CategoryTable::builtin();
        for (category, extensions) in BUILTIN {
            for ext in extensions.iter() {
                assert_eq!(table.classify(Some(*ext)), *category, "extension {ext}");
            }
        }
    }

    #[test]
    fn test_classify_case_insensitive() {
        let table = CategoryTable::builtin();
        assert_eq!(table.classify(Some("JPG")), Category::Images);
        assert_eq!(table.classify(Some("Pdf")), Category::Documents);
        assert_eq!(table.classify(Some("ZIP")), Category::Archives);
    }

    #[test]
    fn test_classify_unknown_and_absent() {
        let table = CategoryTable::builtin();
        assert_eq!(table.classify(Some("xyz")), Category::Other);
        assert_eq!(table.classify(Some("")), Category::Other);
        assert_eq!(table.classify(None), Category::Other);
    }

    #[test]
    fn test_leading_dot_is_ignored() {
        let table = CategoryTable::builtin();
        assert_eq!(table.classify(Some(".rs")), Category::Code);
    }

    #[test]
    fn test_duplicate_extension_rejected() {
        let result = CategoryTable::new([
            (Category::Images, vec!["png"]),
            (Category::Documents, vec!["PNG"]),
        ]);
        assert_eq!(
            result.unwrap_err(),
            TableError::DuplicateExtension {
                extension: "png".to_string(),
                first: Category::Images,
                second: Category::Documents,
            }
        );
    }

    #[test]
    fn test_other_cannot_own_extensions() {
        let result = CategoryTable::new([(Category::Other, vec!["bin"])]);
        assert_eq!(
            result.unwrap_err(),
            TableError::FallbackHasExtensions(Category::Other)
        );
    }

    #[test]
    fn test_empty_extension_rejected() {
        let result = CategoryTable::new([(Category::Data, vec!["."])]);
        assert_eq!(result.unwrap_err(), TableError::EmptyExtension(Category::Data));
    }

    #[test]
    fn test_entries_keep_declaration_order() {
        let table = CategoryTable::builtin();
        let order: Vec<_> = table.entries().map(|(category, _)| category).collect();
        assert_eq!(order, Category::ALL[..8].to_vec());
    }
}
