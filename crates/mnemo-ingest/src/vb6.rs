//! Legacy VB6 content filtering
//!
//! VB6 forms and data reports (`.frm`, `.dsr`, `.dca`, `.dsx`) embed
//! binary blobs next to the source. The filter strips non-ASCII bytes
//! and keeps only lines matching the language's structural patterns;
//! when that leaves almost nothing, it falls back to a short metadata
//! extraction of form-property lines. `.frm` files additionally get
//! structured metadata and a searchable header.

use once_cell::sync::Lazy;
use regex::Regex;

/// Extensions carrying binary-embedded VB6 source
pub const VB6_BINARY_EXTENSIONS: [&str; 4] = ["frm", "dsr", "dca", "dsx"];

/// Below this many surviving lines the filter falls back to metadata
const MIN_FILTERED_LINES: usize = 3;
/// Property lines kept by the metadata fallback
const METADATA_LINE_LIMIT: usize = 20;
/// Procedures listed in structured form metadata
const PROCEDURE_LIMIT: usize = 20;

static PROPERTY_ASSIGNMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+\w+\s*=\s*.").expect("valid regex"));
static GUID_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\{[\w-]+\}").expect("valid regex"));

static FORM_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Begin VB\.Form\s+(\w+)").expect("valid regex"));
static CAPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"Caption\s*=\s*"([^"]*)""#).expect("valid regex"));
static CONTROL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Begin VB\.(\w+)\s+(\w+)").expect("valid regex"));
static PROCEDURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(Private|Public)\s+(Sub|Function|Property)\s+(\w+)").expect("valid regex")
});
static MODULE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"Attribute VB_Name\s*=\s*"([^"]*)""#).expect("valid regex"));

/// True when the extension is a binary-embedded VB6 form
pub fn is_vb6_binary_extension(extension: &str) -> bool {
    VB6_BINARY_EXTENSIONS.contains(&extension.to_lowercase().as_str())
}

fn ascii_only(line: &str) -> String {
    line.chars().filter(|c| (*c as u32) < 128).collect()
}

fn is_structural(line: &str) -> bool {
    line.starts_with("VERSION")
        || line.starts_with("Begin VB.")
        || line.starts_with("Begin {")
        || line.starts_with("End")
        || line.starts_with("Attribute")
        || line.starts_with("Option ")
        || line.starts_with("Private ")
        || line.starts_with("Public ")
        || line.starts_with("EndProperty")
        || line.starts_with("BeginProperty")
        || PROPERTY_ASSIGNMENT.is_match(line)
        || GUID_LINE.is_match(line)
}

/// Strip embedded binary from VB6 form content
///
/// Keeps only structural lines; if fewer than three survive, extracts
/// up to twenty form-property lines instead.
pub fn filter_binary_content(content: &str) -> String {
    let mut filtered: Vec<String> = Vec::new();

    for line in content.lines() {
        let clean = ascii_only(line);
        if clean.trim().is_empty() {
            continue;
        }
        if is_structural(&clean) {
            filtered.push(clean);
        }
    }

    if filtered.len() < MIN_FILTERED_LINES {
        filtered = content
            .lines()
            .map(ascii_only)
            .filter(|clean| {
                !clean.trim().is_empty()
                    && ["Caption", "Height", "Width", "Top", "Left", "TabIndex"]
                        .iter()
                        .any(|p| clean.contains(p))
            })
            .take(METADATA_LINE_LIMIT)
            .collect();
    }

    filtered.join("\n")
}

/// Structured metadata parsed from a `.frm` file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormMetadata {
    pub form_name: Option<String>,
    pub caption: Option<String>,
    pub module_name: Option<String>,
    /// `Type:Name` pairs from `Begin VB.{type} {name}`
    pub controls: Vec<String>,
    /// `Scope Kind Name` signatures, capped at twenty
    pub procedures: Vec<String>,
}

impl FormMetadata {
    pub fn is_empty(&self) -> bool {
        self.form_name.is_none()
            && self.caption.is_none()
            && self.module_name.is_none()
            && self.controls.is_empty()
            && self.procedures.is_empty()
    }
}

/// Parse form name, caption, module name, controls and procedures
pub fn extract_form_metadata(content: &str) -> Option<FormMetadata> {
    let metadata = FormMetadata {
        form_name: FORM_NAME
            .captures(content)
            .map(|c| c[1].to_string()),
        caption: CAPTION.captures(content).map(|c| c[1].to_string()),
        module_name: MODULE_NAME.captures(content).map(|c| c[1].to_string()),
        controls: CONTROL
            .captures_iter(content)
            .map(|c| format!("{}:{}", &c[1], &c[2]))
            .collect(),
        procedures: PROCEDURE
            .captures_iter(content)
            .take(PROCEDURE_LIMIT)
            .map(|c| format!("{} {} {}", &c[1], &c[2], &c[3]))
            .collect(),
    };

    (!metadata.is_empty()).then_some(metadata)
}

/// Prepend the human-readable header that makes forms findable by
/// semantic search
pub fn searchable_header(metadata: &FormMetadata) -> Option<String> {
    let mut parts = Vec::new();

    if let Some(ref name) = metadata.form_name {
        parts.push(format!("FORMULARIO: {}", name));
    }
    if let Some(ref module) = metadata.module_name {
        parts.push(format!("MODULO: {}", module));
    }
    if let Some(ref caption) = metadata.caption {
        parts.push(format!("TITULO: {}", caption));
    }
    if !metadata.controls.is_empty() {
        let controls: Vec<&str> = metadata.controls.iter().take(10).map(|s| s.as_str()).collect();
        parts.push(format!("CONTROLES: {}", controls.join(", ")));
    }
    if !metadata.procedures.is_empty() {
        let procedures: Vec<&str> =
            metadata.procedures.iter().take(5).map(|s| s.as_str()).collect();
        parts.push(format!("PROCEDIMIENTOS: {}", procedures.join(" | ")));
    }

    (!parts.is_empty()).then(|| parts.join("\n"))
}
