/// Category table and file classification.
///
/// A [`CategoryTable`] maps category names (which double as folder names) to
/// sets of dot-prefixed, lowercase extensions. Classification looks the
/// extension up in the table first. An unknown extension falls back to the
/// MIME type guessed from the file name with `mime_guess`, then to sniffing
/// the file header with `infer`.
///
/// # Examples
///
/// ```
/// use declutter::category::CategoryTable;
///
/// let table = CategoryTable::default();
/// assert_eq!(table.classify("JPG", None), "Images");
/// assert_eq!(table.classify(".txt", None), "Documents");
/// assert_eq!(table.classify(".unknown", None), "Others");
/// ```
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

/// Category assigned when neither the table nor MIME sniffing matches.
pub const OTHERS: &str = "Others";

/// Broad categories the MIME fallback can produce, independent of the table.
pub const MIME_CATEGORIES: &[&str] = &[
    "Images",
    "Videos",
    "Music",
    "Documents",
    "Archives",
    "Installers",
    "Code",
];

const DOCUMENT_MIMES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/rtf",
    "application/epub+zip",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.ms-excel",
    "application/vnd.ms-powerpoint",
    "application/vnd.oasis.opendocument.text",
    "application/vnd.oasis.opendocument.spreadsheet",
    "application/vnd.oasis.opendocument.presentation",
];

const ARCHIVE_MIMES: &[&str] = &[
    "application/zip",
    "application/x-rar-compressed",
    "application/vnd.rar",
    "application/x-7z-compressed",
    "application/x-tar",
    "application/gzip",
    "application/x-bzip2",
    "application/x-xz",
    "application/zstd",
];

const INSTALLER_MIMES: &[&str] = &[
    "application/x-msdownload",
    "application/vnd.microsoft.portable-executable",
    "application/x-msi",
    "application/x-ole-storage",
    "application/x-apple-diskimage",
    "application/vnd.debian.binary-package",
    "application/x-rpm",
];

const DEFAULT_TABLE: &[(&str, &[&str])] = &[
    (
        "Images",
        &[
            ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".svg", ".tiff", ".ico", ".heic",
        ],
    ),
    (
        "Videos",
        &[".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm", ".3gp"],
    ),
    (
        "Music",
        &[".mp3", ".wav", ".flac", ".aac", ".ogg", ".m4a", ".wma"],
    ),
    (
        "Documents",
        &[
            ".pdf", ".doc", ".docx", ".txt", ".rtf", ".odt", ".md", ".xls", ".xlsx", ".ods",
            ".csv", ".ppt", ".pptx", ".odp", ".epub",
        ],
    ),
    (
        "Archives",
        &[".zip", ".rar", ".7z", ".tar", ".gz", ".bz2", ".xz", ".zst"],
    ),
    (
        "Installers",
        &[".exe", ".msi", ".dmg", ".pkg", ".deb", ".rpm", ".appimage"],
    ),
    (
        "Code",
        &[
            ".py", ".rs", ".js", ".ts", ".java", ".c", ".cpp", ".h", ".hpp", ".go", ".sh",
            ".html", ".css", ".json", ".xml", ".yaml", ".yml", ".toml",
        ],
    ),
];

/// A problem found while validating category definitions.
///
/// Each issue corresponds to one dropped entry; validation never fails as a
/// whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryIssue {
    /// A category with an empty (or whitespace-only) name.
    EmptyCategoryName,
    /// The category value was not a list of extensions.
    NotAList { category: String },
    /// A list element was not a string.
    NotAString { category: String, value: String },
    /// The extension does not look like `.ext`.
    InvalidExtension { category: String, extension: String },
    /// The extension was already claimed by an earlier category.
    DuplicateExtension {
        extension: String,
        kept_in: String,
        dropped_from: String,
    },
    /// Every extension of the category was dropped.
    EmptyCategory { category: String },
    /// Nothing valid remained; the built-in table is used instead.
    NoValidCategories,
}

impl fmt::Display for CategoryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCategoryName => write!(f, "category with an empty name dropped"),
            Self::NotAList { category } => {
                write!(f, "category '{}' is not a list of extensions", category)
            }
            Self::NotAString { category, value } => {
                write!(f, "category '{}': non-string entry {} dropped", category, value)
            }
            Self::InvalidExtension {
                category,
                extension,
            } => write!(
                f,
                "category '{}': extension '{}' must look like '.ext'",
                category, extension
            ),
            Self::DuplicateExtension {
                extension,
                kept_in,
                dropped_from,
            } => write!(
                f,
                "extension '{}' already belongs to '{}', dropped from '{}'",
                extension, kept_in, dropped_from
            ),
            Self::EmptyCategory { category } => {
                write!(f, "category '{}' has no valid extensions", category)
            }
            Self::NoValidCategories => {
                write!(f, "no valid categories left, using the built-in table")
            }
        }
    }
}

/// Validated mapping from category name to extensions.
///
/// Every extension belongs to at most one category and the table is never
/// empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    categories: BTreeMap<String, BTreeSet<String>>,
    by_extension: HashMap<String, String>,
}

impl CategoryTable {
    /// Builds a table from raw `(name, extensions)` pairs.
    ///
    /// Entries are validated in iteration order. Invalid names and
    /// extensions are dropped and reported; the first category to claim an
    /// extension keeps it. If nothing survives, the built-in table is
    /// returned together with [`CategoryIssue::NoValidCategories`].
    ///
    /// ```
    /// use declutter::category::{CategoryIssue, CategoryTable};
    ///
    /// let (table, issues) = CategoryTable::from_entries(vec![
    ///     ("Books".to_string(), vec![".EPUB".to_string(), "mobi".to_string()]),
    /// ]);
    /// assert_eq!(table.classify(".epub", None), "Books");
    /// assert_eq!(issues.len(), 1);
    /// ```
    pub fn from_entries<I>(entries: I) -> (Self, Vec<CategoryIssue>)
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut table = Self::empty();
        let mut issues = Vec::new();

        for (name, extensions) in entries {
            table.insert_validated(&name, extensions, false, &mut issues);
        }

        if table.is_empty() {
            issues.push(CategoryIssue::NoValidCategories);
            return (Self::default(), issues);
        }

        (table, issues)
    }

    /// Unions custom definitions into the built-in table.
    ///
    /// A custom category claiming an extension that a built-in category
    /// already owns takes it over.
    pub fn merged_with_defaults<I>(entries: I) -> (Self, Vec<CategoryIssue>)
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut table = Self::default();
        let mut issues = Vec::new();

        for (name, extensions) in entries {
            table.insert_validated(&name, extensions, true, &mut issues);
        }

        (table, issues)
    }

    fn empty() -> Self {
        Self {
            categories: BTreeMap::new(),
            by_extension: HashMap::new(),
        }
    }

    fn insert_validated(
        &mut self,
        name: &str,
        extensions: Vec<String>,
        take_over: bool,
        issues: &mut Vec<CategoryIssue>,
    ) {
        let name = name.trim();
        if name.is_empty() {
            issues.push(CategoryIssue::EmptyCategoryName);
            return;
        }

        let mut accepted = BTreeSet::new();
        for raw in extensions {
            let Some(extension) = validate_extension(&raw) else {
                issues.push(CategoryIssue::InvalidExtension {
                    category: name.to_string(),
                    extension: raw,
                });
                continue;
            };

            match self.by_extension.get(&extension) {
                Some(owner) if owner == name => {}
                Some(owner) if !take_over => {
                    issues.push(CategoryIssue::DuplicateExtension {
                        extension,
                        kept_in: owner.clone(),
                        dropped_from: name.to_string(),
                    });
                    continue;
                }
                Some(owner) => {
                    let owner = owner.clone();
                    self.release(&owner, &extension);
                }
                None => {}
            }

            self.by_extension
                .insert(extension.clone(), name.to_string());
            accepted.insert(extension);
        }

        if accepted.is_empty() && !self.categories.contains_key(name) {
            issues.push(CategoryIssue::EmptyCategory {
                category: name.to_string(),
            });
            return;
        }

        self.categories
            .entry(name.to_string())
            .or_default()
            .extend(accepted);
    }

    fn release(&mut self, owner: &str, extension: &str) {
        if let Some(set) = self.categories.get_mut(owner) {
            set.remove(extension);
            if set.is_empty() {
                self.categories.remove(owner);
            }
        }
        self.by_extension.remove(extension);
    }

    /// Returns true if the table holds no categories.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Number of categories in the table.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Iterates category names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Extensions registered for `category`, if it exists.
    pub fn extensions(&self, category: &str) -> Option<&BTreeSet<String>> {
        self.categories.get(category)
    }

    /// Every folder name a run can produce: table categories, MIME fallback
    /// categories, and [`OTHERS`].
    pub fn folder_names(&self) -> BTreeSet<&str> {
        self.names()
            .chain(MIME_CATEGORIES.iter().copied())
            .chain(std::iter::once(OTHERS))
            .collect()
    }

    /// Assigns a category to a file.
    ///
    /// The extension is matched case-insensitively against the table, with
    /// or without its leading dot. When that fails and `path` is given, a MIME
    /// type is guessed from the path and mapped to a broad category. Paths the
    /// guess can't place have their header sniffed. Anything else lands in
    /// [`OTHERS`].
    pub fn classify<'a>(&'a self, extension: &str, path: Option<&Path>) -> &'a str {
        if let Some(extension) = normalize_extension(extension)
            && let Some(category) = self.by_extension.get(&extension)
        {
            return category;
        }

        if let Some(path) = path
            && let Some(category) = guess_category(path).or_else(|| sniff_category(path))
        {
            return category;
        }

        OTHERS
    }

    /// Classifies a file by its own extension and content.
    pub fn classify_path<'a>(&'a self, path: &Path) -> &'a str {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.classify(&extension, Some(path))
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for (name, extensions) in DEFAULT_TABLE {
            let set: BTreeSet<String> = extensions.iter().map(|e| e.to_string()).collect();
            for extension in &set {
                table
                    .by_extension
                    .insert(extension.clone(), name.to_string());
            }
            table.categories.insert(name.to_string(), set);
        }
        table
    }
}

/// Lowercases an extension and prefixes the dot if missing.
fn normalize_extension(extension: &str) -> Option<String> {
    let trimmed = extension.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Some(format!(".{}", trimmed.to_lowercase()))
}

/// Config extensions must be written with their leading dot.
fn validate_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix('.')?;
    if body.is_empty() || body.starts_with('.') || body.contains(['/', '\\']) {
        return None;
    }
    Some(trimmed.to_lowercase())
}

/// Maps a MIME type to one of the broad fallback categories.
///
/// ```
/// use declutter::category::category_for_mime;
///
/// assert_eq!(category_for_mime("image/png"), Some("Images"));
/// assert_eq!(category_for_mime("text/x-python"), Some("Code"));
/// assert_eq!(category_for_mime("application/octet-stream"), None);
/// ```
pub fn category_for_mime(mime: &str) -> Option<&'static str> {
    let mime = mime.to_lowercase();
    if mime.starts_with("image/") {
        Some("Images")
    } else if mime.starts_with("video/") {
        Some("Videos")
    } else if mime.starts_with("audio/") {
        Some("Music")
    } else if DOCUMENT_MIMES.contains(&mime.as_str()) {
        Some("Documents")
    } else if ARCHIVE_MIMES.contains(&mime.as_str()) {
        Some("Archives")
    } else if INSTALLER_MIMES.contains(&mime.as_str()) {
        Some("Installers")
    } else if mime.starts_with("text/") {
        Some("Code")
    } else {
        None
    }
}

fn guess_category(path: &Path) -> Option<&'static str> {
    mime_guess::from_path(path)
        .first_raw()
        .and_then(category_for_mime)
}

fn sniff_category(path: &Path) -> Option<&'static str> {
    match infer::get_from_path(path) {
        Ok(Some(kind)) => category_for_mime(kind.mime_type()),
        Ok(None) => None,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "could not sniff file type");
            None
        }
    }
}
