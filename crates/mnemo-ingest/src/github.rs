//! GitHub client for repository ingestion
//!
//! Shells out to the `gh` CLI for cloning and repository metadata and
//! to `git` for commit history. Construction verifies the CLI is
//! installed and authenticated and fails with an actionable message
//! otherwise.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{IngestError, Result};
use crate::vb6;

/// Files larger than this are skipped
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Path components always excluded from the walk
pub static DEFAULT_EXCLUDES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "node_modules",
        ".git",
        "__pycache__",
        ".venv",
        "venv",
        "dist",
        "build",
        ".next",
        ".nuxt",
        "target",
        ".pytest_cache",
        ".mypy_cache",
        ".tox",
        ".eggs",
        ".DS_Store",
        ".idea",
        ".vscode",
        "vendor",
        "bin",
        "obj",
        "log",
    ]
    .into_iter()
    .collect()
});

/// Indexable extensions: mainstream languages, configs, docs, and the
/// legacy VB6 / Pascal families
static SUPPORTED_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Python
        "py", "pyw", "pyi",
        // JavaScript / TypeScript
        "js", "jsx", "ts", "tsx", "mjs", "cjs", "mts", "cts",
        // JVM
        "java", "kt", "kts", "scala", "groovy",
        // C / C++
        "c", "cpp", "cc", "cxx", "h", "hpp", "hh", "hxx",
        // C#
        "cs", "csx",
        // Go / Rust
        "go", "rs",
        // Ruby / PHP / Swift
        "rb", "erb", "rake", "php", "phtml", "swift",
        // Shell
        "sh", "bash", "zsh", "fish",
        // SQL
        "sql",
        // Data / config
        "yaml", "yml", "json", "toml", "xml", "ini", "cfg", "conf",
        // Web
        "html", "htm", "css", "scss", "sass", "less",
        // Docs
        "md", "markdown", "txt", "rst",
        // Visual Basic / VB6
        "vb", "cls", "frm", "bas", "mod", "dsr", "dca", "dsx", "vbp", "vbg", "vbw", "frx",
        // Pascal / Delphi
        "pas", "dpk", "dpr",
        // Other languages
        "r", "lua", "pl", "pm", "ex", "exs", "erl", "hs", "ml", "fs", "fsx", "clj", "cljs",
        "dart", "elm", "vue", "svelte", "jl", "nim", "zig",
        // Scripts
        "ps1", "psm1", "bat", "cmd", "awk",
        // Build files
        "gradle", "cmake", "make", "dockerfile",
        // Data files
        "csv", "tsv",
        // Legacy / enterprise
        "adb", "ads", "ada", "asm", "s", "m", "mm", "f", "f90", "f95", "cob", "cbl", "pro",
        "v", "sv", "vhdl",
    ]
    .into_iter()
    .collect()
});

/// Extension → language display name
pub fn get_language(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "py" | "pyw" | "pyi" => "Python",
        "js" | "jsx" | "mjs" | "cjs" => "JavaScript",
        "ts" | "tsx" | "mts" | "cts" => "TypeScript",
        "java" => "Java",
        "kt" | "kts" => "Kotlin",
        "scala" => "Scala",
        "groovy" => "Groovy",
        "c" => "C",
        "cpp" | "cc" | "cxx" => "C++",
        "h" => "C/C++ Header",
        "hpp" | "hh" | "hxx" => "C++ Header",
        "cs" => "C#",
        "csx" => "C# Script",
        "go" => "Go",
        "rs" => "Rust",
        "rb" | "erb" => "Ruby",
        "rake" => "Rake",
        "php" | "phtml" => "PHP",
        "swift" => "Swift",
        "sh" => "Shell",
        "bash" => "Bash",
        "zsh" => "Zsh",
        "fish" => "Fish",
        "sql" => "SQL",
        "yaml" | "yml" => "YAML",
        "json" => "JSON",
        "toml" => "TOML",
        "xml" => "XML",
        "ini" => "INI",
        "cfg" | "conf" => "Config",
        "html" | "htm" => "HTML",
        "css" => "CSS",
        "scss" => "SCSS",
        "sass" => "Sass",
        "less" => "Less",
        "md" | "markdown" => "Markdown",
        "txt" => "Text",
        "rst" => "reStructuredText",
        "vb" => "Visual Basic",
        "cls" => "VB Class",
        "frm" => "VB Form",
        "bas" | "mod" => "VB Module",
        "dsr" | "dca" | "dsx" => "VB Data Report",
        "vbp" => "VB Project",
        "vbg" => "VB Project Group",
        "vbw" => "VB Workspace",
        "frx" => "VB6 Form Binary",
        "pas" => "Pascal",
        "dpk" => "Delphi Package",
        "dpr" => "Delphi Project",
        "adb" | "ads" | "ada" => "Ada",
        "asm" | "s" => "Assembly",
        "m" | "mm" => "Objective-C",
        "f" | "f90" | "f95" => "Fortran",
        "cob" | "cbl" => "COBOL",
        "pro" => "Prolog",
        "jl" => "Julia",
        "nim" => "Nim",
        "zig" => "Zig",
        "v" => "Verilog",
        "sv" => "SystemVerilog",
        "vhdl" => "VHDL",
        "r" => "R",
        "lua" => "Lua",
        "pl" => "Perl",
        "pm" => "Perl Module",
        "ex" | "exs" => "Elixir",
        "erl" => "Erlang",
        "hs" => "Haskell",
        "ml" => "OCaml",
        "fs" => "F#",
        "fsx" => "F# Script",
        "clj" => "Clojure",
        "cljs" => "ClojureScript",
        "dart" => "Dart",
        "elm" => "Elm",
        "vue" => "Vue",
        "svelte" => "Svelte",
        "ps1" => "PowerShell",
        "psm1" => "PowerShell Module",
        "bat" | "cmd" => "Batch",
        "awk" => "AWK",
        "gradle" => "Gradle",
        "cmake" => "CMake",
        "make" => "Make",
        "dockerfile" => "Dockerfile",
        "csv" => "CSV",
        "tsv" => "TSV",
        _ => "Unknown",
    }
}

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"github\.com[/:]([^/]+)/([^/]+?)(?:\.git)?/?$").expect("valid regex"));

/// Parse `owner/repo` or a full GitHub URL into `(owner, repo)`
pub fn parse_repo_url(url: &str) -> Result<(String, String)> {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    if !trimmed.starts_with("http") && !trimmed.contains(':') {
        let parts: Vec<&str> = trimmed.split('/').collect();
        if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
            return Ok((parts[0].to_string(), parts[1].to_string()));
        }
    }

    if let Some(captures) = URL_PATTERN.captures(trimmed) {
        return Ok((captures[1].to_string(), captures[2].to_string()));
    }

    Err(IngestError::Validation(format!(
        "Invalid GitHub URL: {}",
        url
    )))
}

/// Repository metadata from the GitHub API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepoInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Last-commit info for one file
#[derive(Debug, Clone, Default)]
pub struct FileHistory {
    pub sha: Option<String>,
    pub date: Option<String>,
    pub author: Option<String>,
    pub email: Option<String>,
}

/// Client for the `gh` CLI and `git`
pub struct GhClient;

impl GhClient {
    /// Verify `gh` is installed and authenticated
    pub async fn new() -> Result<Self> {
        let installed = Command::new("gh")
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false);
        if !installed {
            return Err(IngestError::Precondition(
                "gh CLI not found. Install GitHub CLI first:\n\
                 \x20 macOS: brew install gh\n\
                 \x20 Linux: sudo apt install gh"
                    .to_string(),
            ));
        }

        let authed = Command::new("gh")
            .args(["auth", "status"])
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false);
        if !authed {
            return Err(IngestError::Precondition(
                "gh not authenticated. Run:\n\x20 gh auth login".to_string(),
            ));
        }

        Ok(Self)
    }

    /// Shallow-clone into a temp directory, removed when dropped
    pub async fn clone_repo(&self, repo_url: &str) -> Result<(TempDir, PathBuf)> {
        let (owner, repo) = parse_repo_url(repo_url)?;
        let target = format!("{}/{}", owner, repo);

        let temp = TempDir::with_prefix(format!("mnemo-{}-", repo))?;
        let clone_dir = temp.path().join(&repo);

        info!("Cloning {} (shallow)", target);
        let output = Command::new("gh")
            .args(["repo", "clone", &target])
            .arg(&clone_dir)
            .args(["--", "--depth", "1"])
            .output()
            .await?;

        if !output.status.success() {
            return Err(IngestError::subprocess(
                format!("gh repo clone {}", target),
                String::from_utf8_lossy(&output.stderr),
            ));
        }

        Ok((temp, clone_dir))
    }

    /// Fetch repository metadata via `gh api`
    pub async fn repo_info(&self, repo_url: &str) -> Result<RepoInfo> {
        let (owner, repo) = parse_repo_url(repo_url)?;
        let output = Command::new("gh")
            .args(["api", &format!("repos/{}/{}", owner, repo)])
            .output()
            .await?;

        if !output.status.success() {
            return Err(IngestError::subprocess(
                format!("gh api repos/{}/{}", owner, repo),
                String::from_utf8_lossy(&output.stderr),
            ));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    /// Current HEAD commit SHA and ISO date
    pub async fn current_commit(&self, repo_dir: &Path) -> Result<(String, String)> {
        let sha = self
            .git_stdout(repo_dir, &["rev-parse", "HEAD"])
            .await?
            .trim()
            .to_string();
        let date = self
            .git_stdout(repo_dir, &["log", "-1", "--format=%cI"])
            .await?
            .trim()
            .to_string();
        Ok((sha, date))
    }

    /// Last commit touching one file
    pub async fn file_history(&self, repo_dir: &Path, file_rel_path: &Path) -> FileHistory {
        let rel = file_rel_path.to_string_lossy().to_string();
        let stdout = self
            .git_stdout(repo_dir, &["log", "-1", "--format=%H|%cI|%an|%ae", "--", &rel])
            .await
            .unwrap_or_default();

        let line = stdout.trim();
        if line.is_empty() {
            return FileHistory::default();
        }

        let parts: Vec<&str> = line.split('|').collect();
        FileHistory {
            sha: parts.first().map(|s| s.to_string()),
            date: parts.get(1).map(|s| s.to_string()),
            author: parts.get(2).map(|s| s.to_string()),
            email: parts.get(3).map(|s| s.to_string()),
        }
    }

    async fn git_stdout(&self, repo_dir: &Path, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .await?;

        if !output.status.success() {
            return Err(IngestError::subprocess(
                format!("git {}", args.join(" ")),
                String::from_utf8_lossy(&output.stderr),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Enumerate indexable files under a repository
///
/// Rejects excluded path components, unsupported extensions, and files
/// over 1 MB.
pub fn list_files(repo_dir: &Path, extra_excludes: &[String]) -> Vec<PathBuf> {
    let extra: HashSet<&str> = extra_excludes.iter().map(|s| s.as_str()).collect();

    let mut files: Vec<PathBuf> = WalkDir::new(repo_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let rel = entry.path().strip_prefix(repo_dir).unwrap_or(entry.path());
            !rel.components().any(|c| {
                let name = c.as_os_str().to_string_lossy();
                DEFAULT_EXCLUDES.contains(name.as_ref()) || extra.contains(name.as_ref())
            })
        })
        .filter(|entry| {
            let ext = entry
                .path()
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            SUPPORTED_EXTENSIONS.contains(ext.as_str())
        })
        .filter(|entry| {
            entry
                .metadata()
                .map(|m| m.len() <= MAX_FILE_SIZE)
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    debug!("Enumerated {} indexable files", files.len());
    files
}

/// Read a file as UTF-8 with replacement, applying the VB6 filter for
/// binary-embedded legacy extensions
pub fn read_file_content(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes).to_string();

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if vb6::is_vb6_binary_extension(&ext) {
        return Ok(vb6::filter_binary_content(&content));
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owner_repo_form() {
        assert_eq!(
            parse_repo_url("acme/widget").unwrap(),
            ("acme".to_string(), "widget".to_string())
        );
    }

    #[test]
    fn test_parse_full_url() {
        assert_eq!(
            parse_repo_url("https://github.com/acme/widget").unwrap(),
            ("acme".to_string(), "widget".to_string())
        );
        assert_eq!(
            parse_repo_url("https://github.com/acme/widget.git").unwrap(),
            ("acme".to_string(), "widget".to_string())
        );
        assert_eq!(
            parse_repo_url("git@github.com:acme/widget.git").unwrap(),
            ("acme".to_string(), "widget".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_repo_url("not a repo").is_err());
        assert!(parse_repo_url("https://example.com/acme/widget").is_err());
        assert!(parse_repo_url("justoneword").is_err());
    }

    #[test]
    fn test_get_language() {
        assert_eq!(get_language(Path::new("main.rs")), "Rust");
        assert_eq!(get_language(Path::new("form.FRM")), "VB Form");
        assert_eq!(get_language(Path::new("unit.pas")), "Pascal");
        assert_eq!(get_language(Path::new("data.xyz")), "Unknown");
    }

    #[test]
    fn test_list_files_filters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        std::fs::write(root.join("main.rs"), "fn main() {}").unwrap();
        std::fs::write(root.join("notes.md"), "# notes").unwrap();
        std::fs::write(root.join("blob.bin"), [0u8; 16]).unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/lib.rs"), "pub fn f() {}").unwrap();

        let files = list_files(root, &[]);
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().to_string())
            .collect();

        assert!(names.contains(&"main.rs".to_string()));
        assert!(names.contains(&"notes.md".to_string()));
        assert!(names.iter().any(|n| n.ends_with("lib.rs")));
        assert!(!names.iter().any(|n| n.contains("node_modules")));
        assert!(!names.iter().any(|n| n.ends_with(".bin")));
    }

    #[test]
    fn test_list_files_respects_extra_excludes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("fixtures")).unwrap();
        std::fs::write(root.join("fixtures/data.json"), "{}").unwrap();
        std::fs::write(root.join("keep.json"), "{}").unwrap();

        let files = list_files(root, &["fixtures".to_string()]);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("keep.json"));
    }

    #[test]
    fn test_list_files_rejects_oversize() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("big.txt"), "x".repeat((MAX_FILE_SIZE + 1) as usize)).unwrap();
        std::fs::write(root.join("small.txt"), "small").unwrap();

        let files = list_files(root, &[]);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("small.txt"));
    }

    #[test]
    fn test_read_file_content_applies_vb6_filter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.frm");
        std::fs::write(
            &path,
            "VERSION 5.00\r\nBegin VB.Form frmTest\r\n\u{fe}\u{ff}binaryjunk\r\nEnd\r\n",
        )
        .unwrap();

        let content = read_file_content(&path).unwrap();
        assert!(content.contains("VERSION 5.00"));
        assert!(!content.contains("binaryjunk"));
    }
}
