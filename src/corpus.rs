//! Corpus discovery at the document-layer boundary.
//!
//! The markup pages themselves are parsed by an external collaborator;
//! it exports one JSON dump per reporting-period document with the
//! distinguished spans (event time, faction links, province names)
//! already pulled out of the tree. This module only finds and reads
//! those dumps.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::types::LogParagraph;

/// One exported document: the paragraph stream of a reporting period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParagraphDump {
    #[serde(default)]
    pub paragraphs: Vec<LogParagraph>,
}

/// A dump file discovered in the corpus.
#[derive(Debug)]
pub struct DumpFile {
    pub path: PathBuf,
}

/// Walk the corpus root collecting `*.json` paragraph dumps, sorted by
/// path so runs are reproducible.
pub fn scan_corpus(root: &Path) -> Vec<DumpFile> {
    let mut results: Vec<DumpFile> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
        .map(|path| DumpFile { path })
        .collect();
    results.sort_by(|a, b| a.path.cmp(&b.path));
    results
}

/// Read one dump. Unreadable or malformed files yield `None`; the
/// caller skips them and keeps scanning, like any other per-document
/// degradation.
pub fn read_dump(path: &Path) -> Option<ParagraphDump> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}
