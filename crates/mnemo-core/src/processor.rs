//! Document processor
//!
//! Format-specific text extraction (PDF, Excel, CSV, HTML, plain text,
//! URLs) and overlapped chunking. Extraction always yields plain
//! unicode text; the memory engine never stores raw bytes.

use std::path::Path;
use std::time::Duration;

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result};

/// Default chunk window, in characters
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between adjacent chunks
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
/// Fetched URL bodies are truncated to this many characters
const URL_BODY_LIMIT: usize = 50_000;
/// Timeout for URL fetches
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Format the extracted text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractedFormat {
    Text,
    Pdf,
    Excel,
    Csv,
    Html,
    Url,
    Unknown,
}

/// Result of format-specific extraction
#[derive(Debug, Clone)]
pub struct Extracted {
    /// Plain text ready for enrichment and embedding
    pub text: String,
    pub format: ExtractedFormat,
    /// Originating filename or URL, when there was one
    pub source: Option<String>,
}

/// Format dispatcher and chunker
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    chunk_size: usize,
    chunk_overlap: usize,
    client: reqwest::Client,
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl DocumentProcessor {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            chunk_size,
            chunk_overlap,
            client,
        }
    }

    /// Process an input that may be a URL, an existing file path, or
    /// plain text
    pub async fn process(&self, input: &str) -> Result<Extracted> {
        if input.starts_with("http://") || input.starts_with("https://") {
            return self.process_url(input).await;
        }

        let path = Path::new(input);
        if path.is_file() {
            return self.process_file(path);
        }

        Ok(Extracted {
            text: input.to_string(),
            format: ExtractedFormat::Text,
            source: None,
        })
    }

    /// Fetch a URL and extract its text
    ///
    /// HTML responses are stripped of scripts and styles; everything
    /// else is kept raw. The body is truncated to 50 000 characters.
    pub async fn process_url(&self, url: &str) -> Result<Extracted> {
        debug!("Fetching {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("text/html"))
            .unwrap_or(false);

        let body = response.text().await?;
        let text = if is_html { html_to_text(&body) } else { body };
        let text: String = text.chars().take(URL_BODY_LIMIT).collect();

        Ok(Extracted {
            text,
            format: ExtractedFormat::Url,
            source: Some(url.to_string()),
        })
    }

    /// Extract text from a file based on its extension
    pub fn process_file(&self, path: &Path) -> Result<Extracted> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let (text, format) = match ext.as_str() {
            "pdf" => (extract_pdf(path)?, ExtractedFormat::Pdf),
            "xlsx" | "xls" => (extract_excel(path)?, ExtractedFormat::Excel),
            "csv" => (std::fs::read_to_string(path)?, ExtractedFormat::Csv),
            "html" | "htm" => (
                html_to_text(&std::fs::read_to_string(path)?),
                ExtractedFormat::Html,
            ),
            "txt" | "md" | "markdown" => (std::fs::read_to_string(path)?, ExtractedFormat::Text),
            _ => (path.display().to_string(), ExtractedFormat::Unknown),
        };

        Ok(Extracted {
            text,
            format,
            source: Some(name),
        })
    }

    /// Split text into overlapping chunks, breaking at the last period
    /// or newline inside each window when possible
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.chunk_size {
            return if text.trim().is_empty() {
                Vec::new()
            } else {
                vec![text.to_string()]
            };
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < chars.len() {
            let mut end = (start + self.chunk_size).min(chars.len());

            if end < chars.len() {
                if let Some(bp) = chars[start..end].iter().rposition(|&c| c == '.' || c == '\n') {
                    if bp > 0 {
                        end = start + bp + 1;
                    }
                }
            }

            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim().to_string();
            if !chunk.is_empty() {
                chunks.push(chunk);
            }

            if end == chars.len() {
                break;
            }
            // Overlap must never move the window backwards
            start = end.saturating_sub(self.chunk_overlap).max(start + 1);
        }

        chunks
    }
}

/// Extract all pages of a PDF as concatenated text
fn extract_pdf(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path).map_err(|e| CoreError::Pdf(e.to_string()))
}

/// Render every sheet of a workbook as labelled CSV
fn extract_excel(path: &Path) -> Result<String> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| CoreError::Spreadsheet(e.to_string()))?;

    let mut parts = Vec::new();
    for (sheet_name, range) in workbook.worksheets() {
        parts.push(format!("## Sheet: {}\n", sheet_name));

        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in range.rows() {
            let record: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
            writer
                .write_record(&record)
                .map_err(|e| CoreError::Spreadsheet(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| CoreError::Spreadsheet(e.to_string()))?;
        parts.push(String::from_utf8_lossy(&bytes).to_string());
    }

    Ok(parts.join("\n"))
}

/// Strip scripts and styles, then join text nodes with newlines
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts = Vec::new();
    collect_text(document.root_element(), &mut parts);
    parts.join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            let name = el.value().name();
            if name == "script" || name == "style" {
                continue;
            }
            collect_text(el, out);
        } else if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_input_passes_through_unchunked() {
        let p = DocumentProcessor::default();
        assert_eq!(p.chunk("short text"), vec!["short text".to_string()]);
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        let p = DocumentProcessor::default();
        assert!(p.chunk("   ").is_empty());
    }

    #[test]
    fn test_chunks_break_at_sentence_boundary() {
        let p = DocumentProcessor::new(50, 10);
        let text = "First sentence here. Second sentence follows. Third one closes the set and runs longer.";
        let chunks = p.chunk(text);
        assert!(chunks.len() >= 2);
        assert!(chunks[0].ends_with('.'));
    }

    #[test]
    fn test_chunks_overlap() {
        let p = DocumentProcessor::new(30, 10);
        let text = "abcdefghij ".repeat(20);
        let chunks = p.chunk(&text);
        assert!(chunks.len() > 1);
        // Total material with overlap exceeds the input length
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert!(total > text.trim().len());
    }

    #[test]
    fn test_chunking_terminates_on_pathological_input() {
        // A period right at the window start must not stall the walk
        let p = DocumentProcessor::new(10, 8);
        let text = ".".repeat(100);
        let chunks = p.chunk(&text);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn test_html_to_text_strips_scripts() {
        let html = "<html><head><style>body{}</style></head>\
                    <body><p>Visible text</p><script>var x = 1;</script></body></html>";
        let text = html_to_text(html);
        assert!(text.contains("Visible text"));
        assert!(!text.contains("var x"));
        assert!(!text.contains("body{}"));
    }

    #[test]
    fn test_process_file_reads_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.md");
        std::fs::write(&path, "# Heading\nbody").unwrap();

        let p = DocumentProcessor::default();
        let extracted = p.process_file(&path).unwrap();
        assert_eq!(extracted.format, ExtractedFormat::Text);
        assert!(extracted.text.contains("Heading"));
        assert_eq!(extracted.source.as_deref(), Some("note.md"));
    }

    #[tokio::test]
    async fn test_process_plain_text_passthrough() {
        let p = DocumentProcessor::default();
        let extracted = p.process("just some text").await.unwrap();
        assert_eq!(extracted.format, ExtractedFormat::Text);
        assert_eq!(extracted.text, "just some text");
        assert!(extracted.source.is_none());
    }
}
