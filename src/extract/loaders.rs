//! Structured-format loaders.
//!
//! A single registry maps file extensions to loader implementations, so
//! the format-to-handler mapping lives in one place and new formats are
//! added without touching the OCR core.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use super::error::ExtractError;

/// Pulls text out of one structured document format.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Extension-keyed loader registry.
pub struct LoaderRegistry {
    loaders: HashMap<String, Box<dyn DocumentLoader>>,
}

impl LoaderRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    /// Registry with the built-in loaders: txt, docx, epub.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("txt", Box::new(PlainTextLoader));
        registry.register("docx", Box::new(DocxLoader));
        registry.register("epub", Box::new(EpubLoader));
        registry
    }

    /// Register (or replace) the loader for an extension.
    pub fn register(&mut self, extension: &str, loader: Box<dyn DocumentLoader>) {
        self.loaders.insert(extension.to_ascii_lowercase(), loader);
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.loaders.contains_key(&extension.to_ascii_lowercase())
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.loaders.keys().map(|s| s.as_str()).collect();
        exts.sort_unstable();
        exts
    }

    /// Load a file through the loader registered for its extension.
    pub fn load(&self, path: &Path) -> Result<String, ExtractError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let loader = self
            .loaders
            .get(&ext)
            .ok_or_else(|| ExtractError::UnsupportedFormat(ext.clone()))?;
        tracing::info!("Loading {} via {} loader", path.display(), ext);
        loader.load(path)
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Plain text files, tolerating invalid UTF-8.
struct PlainTextLoader;

impl DocumentLoader for PlainTextLoader {
    fn load(&self, path: &Path) -> Result<String, ExtractError> {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Word documents: a zip container whose body lives in
/// `word/document.xml`.
struct DocxLoader;

impl DocumentLoader for DocxLoader {
    fn load(&self, path: &Path) -> Result<String, ExtractError> {
        let file = std::fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| ExtractError::Loader(format!("not a docx container: {}", e)))?;
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractError::Loader(format!("docx missing document.xml: {}", e)))?
            .read_to_string(&mut xml)
            .map_err(ExtractError::Io)?;

        // Paragraph ends become newlines before the tags are stripped
        let xml = xml.replace("</w:p>", "</w:p>\n");
        Ok(strip_markup(&xml))
    }
}

/// EPUB books: a zip of XHTML chapters.
struct EpubLoader;

impl DocumentLoader for EpubLoader {
    fn load(&self, path: &Path) -> Result<String, ExtractError> {
        let file = std::fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| ExtractError::Loader(format!("not an epub container: {}", e)))?;

        // Chapter order follows archive entry names; good enough without
        // parsing the OPF spine
        let mut chapter_names: Vec<String> = (0..archive.len())
            .filter_map(|i| archive.by_index(i).ok().map(|f| f.name().to_string()))
            .filter(|name| {
                name.ends_with(".xhtml") || name.ends_with(".html") || name.ends_with(".htm")
            })
            .collect();
        chapter_names.sort();

        if chapter_names.is_empty() {
            return Err(ExtractError::Loader("epub has no XHTML chapters".into()));
        }

        let mut chapters = Vec::with_capacity(chapter_names.len());
        for name in &chapter_names {
            let mut xhtml = String::new();
            archive
                .by_name(name)
                .map_err(|e| ExtractError::Loader(format!("epub entry {}: {}", name, e)))?
                .read_to_string(&mut xhtml)
                .map_err(ExtractError::Io)?;
            let text = strip_markup(&xhtml);
            if !text.is_empty() {
                chapters.push(text);
            }
        }

        Ok(chapters.join("\n\n"))
    }
}

/// Drop markup tags, decode the common entities, and collapse the
/// leftover whitespace.
fn strip_markup(markup: &str) -> String {
    static TAG_RE: OnceLock<regex::Regex> = OnceLock::new();
    static BLANK_RE: OnceLock<regex::Regex> = OnceLock::new();
    let tag_re = TAG_RE.get_or_init(|| regex::Regex::new(r"<[^>]*>").expect("valid regex"));
    let blank_re = BLANK_RE.get_or_init(|| regex::Regex::new(r"\n{3,}").expect("valid regex"));

    let text = tag_re.replace_all(markup, "");
    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ");

    let lines: Vec<&str> = text.lines().map(|l| l.trim()).collect();
    let joined = lines.join("\n");
    blank_re.replace_all(&joined, "\n\n").trim().to_string()
}
