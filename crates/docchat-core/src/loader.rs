//! Document loading for `txt`, `md`, `pdf` and `docx` files.
//!
//! Failures never abort a directory load: unsupported or unreadable files
//! are logged and skipped.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::types::Document;

pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["txt", "md", "pdf", "docx"];

#[derive(Debug, Clone)]
pub struct DocumentLoader {
    data_dir: PathBuf,
}

impl Default for DocumentLoader {
    fn default() -> Self { Self::new("data/raw") }
}

impl DocumentLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self { Self { data_dir: data_dir.into() } }

    pub fn data_dir(&self) -> &Path { &self.data_dir }

    pub fn is_supported(path: &Path) -> bool { extension_of(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str())) }

    /// Load one file. Returns `None` (after logging) for unsupported formats
    /// and for files that fail to read or parse.
    pub fn load_file(&self, path: &Path) -> Option<Document> {
        match read_document(path) {
            Ok(doc) => {
                info!("Loaded: {} ({} chars)", doc.source, doc.text.chars().count());
                Some(doc)
            }
            Err(Error::UnsupportedFormat(_)) => {
                warn!("Unsupported format: {}", path.display());
                None
            }
            Err(e) => {
                error!("Error loading {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Load every supported document under the configured data directory.
    pub fn load_directory(&self) -> Vec<Document> { self.load_from(&self.data_dir) }

    /// Load every supported document under `dir`, recursively, in path order.
    pub fn load_from(&self, dir: &Path) -> Vec<Document> {
        if !dir.is_dir() {
            warn!("Document directory {} does not exist", dir.display());
            return Vec::new();
        }
        let documents: Vec<Document> = self
            .list_supported_files(dir)
            .iter()
            .filter_map(|path| self.load_file(path))
            .collect();
        info!("Loaded {} documents from {}", documents.len(), dir.display());
        documents
    }

    fn list_supported_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|p| Self::is_supported(p))
            .collect();
        files.sort();
        files
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase)
}

fn read_document(path: &Path) -> Result<Document> {
    let text = match extension_of(path).as_deref() {
        Some("txt" | "md") => read_text(path)?,
        Some("pdf") => pdf_extract::extract_text(path).map_err(|e| Error::parse(path, e))?,
        Some("docx") => read_docx(path)?,
        _ => return Err(Error::UnsupportedFormat(path.to_path_buf())),
    };
    let source = path.file_name().map_or_else(|| path.to_string_lossy().to_string(), |n| n.to_string_lossy().to_string());
    Ok(Document { text, source, path: path.to_string_lossy().to_string() })
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => Ok(String::from_utf8_lossy(e.as_bytes()).to_string()),
    }
}

fn read_docx(path: &Path) -> Result<String> {
    let file = fs::File::open(path).map_err(|e| Error::io(path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| Error::parse(path, e))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| Error::parse(path, e))?
        .read_to_string(&mut xml)
        .map_err(|e| Error::io(path, e))?;
    docx_xml_to_text(&xml).map_err(|e| Error::parse(path, e))
}

/// Flatten WordprocessingML body XML into text, one line per paragraph.
pub fn docx_xml_to_text(xml: &str) -> std::result::Result<String, regex::Error> {
    // `<w:tab/>` in a run is a tab character; tab stops (`<w:tab w:val=..>`) live in paragraph properties.
    let run = Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab/>|<w:br(?:\s[^>]*)?/>|<w:cr/>")?;
    let numeric = Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);")?;
    let mut paragraphs = Vec::new();
    // The tail after the last </w:p> holds section properties only.
    let mut parts: Vec<&str> = xml.split("</w:p>").collect();
    parts.pop();
    for part in parts {
        let mut line = String::new();
        for caps in run.captures_iter(part) {
            match caps.get(1) {
                Some(text) => line.push_str(&unescape_xml(text.as_str(), &numeric)),
                None if caps[0].starts_with("<w:tab") => line.push('\t'),
                None => line.push('\n'),
            }
        }
        paragraphs.push(line);
    }
    Ok(paragraphs.join("\n"))
}

fn unescape_xml(s: &str, numeric: &Regex) -> String {
    let decoded = numeric.replace_all(s, |caps: &regex::Captures| {
        let code = &caps[1];
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        value.and_then(char::from_u32).map_or_else(|| caps[0].to_string(), String::from)
    });
    decoded
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
