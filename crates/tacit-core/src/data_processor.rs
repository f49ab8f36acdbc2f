use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::ChunkingSettings;
use crate::error::{Error, Result};
use crate::traits::TextExtractor;
use crate::types::DocumentChunk;

const PAGE_BREAK: char = '\u{000C}';
const PARAGRAPH_BREAK: &str = "\n\n";

/// Reads UTF-8 text files, falling back to a lossy decode for invalid bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                Ok(String::from_utf8_lossy(&fs::read(path)?).to_string())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Splits extracted text into page/paragraph chunks ready for indexing.
pub struct DataProcessor {
    chunking: ChunkingSettings,
    extractor: Box<dyn TextExtractor>,
}

impl Default for DataProcessor {
    fn default() -> Self {
        Self::new(ChunkingSettings::default())
    }
}

impl DataProcessor {
    pub fn new(chunking: ChunkingSettings) -> Self {
        Self { chunking, extractor: Box::new(PlainTextExtractor) }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Chunks one file; the source id is the file name.
    pub fn process_file(&self, file_path: &Path) -> Result<Vec<DocumentChunk>> {
        let source_id = source_id_for(file_path)?;
        let text = self.extractor.extract(file_path)?;
        let chunks = self.chunk_text(&text, &source_id);
        debug!(source = %source_id, chunks = chunks.len(), "processed file");
        Ok(chunks)
    }

    /// Chunks every `.txt` file under `data_dir`, in path order.
    ///
    /// Fails as a whole on the first unreadable file so callers never index a
    /// partial directory.
    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<DocumentChunk>> {
        if !data_dir.is_dir() {
            return Err(Error::NotFound { kind: "directory", name: data_dir.display().to_string() });
        }
        let files = list_txt_files(data_dir);
        let mut all_chunks = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            debug!("Processing file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            all_chunks.extend(self.process_file(file_path)?);
        }
        info!("Processed {} files into {} chunks", files.len(), all_chunks.len());
        Ok(all_chunks)
    }

    /// Applies the page/paragraph policy to already extracted text.
    ///
    /// Pages are separated by form feeds; blank pages are skipped and do not
    /// consume a page number. Within a page, paragraphs are separated by blank
    /// lines and kept when their trimmed length exceeds `min_chars`. A page with
    /// no qualifying paragraph is kept whole if it is itself long enough.
    pub fn chunk_text(&self, text: &str, source_id: &str) -> Vec<DocumentChunk> {
        let min_chars = self.chunking.min_chars;
        let long_enough = |s: &str| s.chars().count() > min_chars;

        let mut chunks = Vec::new();
        let pages = text.split(PAGE_BREAK).filter(|p| !p.trim().is_empty());
        for (page_index, page) in pages.enumerate() {
            let page_number = u32::try_from(page_index + 1).unwrap_or(u32::MAX);
            let paragraphs: Vec<&str> = page
                .split(PARAGRAPH_BREAK)
                .map(str::trim)
                .filter(|p| long_enough(p))
                .collect();

            if paragraphs.is_empty() {
                let whole = page.trim();
                if long_enough(whole) {
                    chunks.push(DocumentChunk::new(whole, page_number, source_id));
                }
                continue;
            }
            for paragraph in paragraphs {
                chunks.push(DocumentChunk::new(paragraph, page_number, source_id));
            }
        }
        chunks
    }
}

/// Source id recorded on a file's chunks: its file name.
pub fn source_id_for(file_path: &Path) -> Result<String> {
    file_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| Error::Extraction(format!("not a file path: {}", file_path.display())))
}

fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
        .map(|e| e.path().to_path_buf())
        .collect();
    txt_files.sort();
    txt_files
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_A: &str = "Diversify retirement holdings across at least three asset classes.";
    const LONG_B: &str = "Never move an entire emergency fund into a single speculative position.";

    #[test]
    fn short_lone_page_is_dropped() {
        let processor = DataProcessor::default();
        assert!(processor.chunk_text("Too short to index.", "a.txt").is_empty());
    }

    #[test]
    fn paragraphs_become_chunks_with_page_numbers() {
        let processor = DataProcessor::default();
        let text = format!("{LONG_A}\n\n{LONG_B}\u{000C}{LONG_B}");
        let chunks = processor.chunk_text(&text, "guide.txt");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, LONG_A);
        assert_eq!(chunks[0].metadata.page, 1);
        assert_eq!(chunks[1].metadata.page, 1);
        assert_eq!(chunks[2].metadata.page, 2);
        assert!(chunks.iter().all(|c| c.metadata.source_id == "guide.txt"));
    }

    #[test]
    fn blank_pages_do_not_consume_page_numbers() {
        let processor = DataProcessor::default();
        let text = format!("{LONG_A}\u{000C}   \n \u{000C}{LONG_B}");
        let chunks = processor.chunk_text(&text, "s");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].metadata.page, 2);
    }

    #[test]
    fn short_paragraphs_fall_back_to_whole_page() {
        let processor = DataProcessor::default();
        let text = "Rule one: hold cash.\n\nRule two: avoid margin.\n\nRule three: rebalance yearly.";
        let chunks = processor.chunk_text(text, "rules.txt");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
    }

    #[test]
    fn short_paragraphs_are_dropped_when_a_long_one_exists() {
        let processor = DataProcessor::default();
        let text = format!("Heading\n\n\n\n{LONG_A}\n\nFooter");
        let chunks = processor.chunk_text(&text, "s");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, LONG_A);
    }

    #[test]
    fn threshold_is_strict() {
        let processor = DataProcessor::new(ChunkingSettings { min_chars: 5 });
        assert!(processor.chunk_text("abcde", "s").is_empty());
        assert_eq!(processor.chunk_text("abcdef", "s").len(), 1);
    }
}
