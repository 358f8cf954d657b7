use crate::error::{Error, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\s]+").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static HYPHENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").unwrap());

/// Derive a filesystem-safe identifier from the seed URL.
///
/// `https://a.b.com/Docs/` becomes `a-b-com-docs`.
pub fn slugify(url: &str) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    let slug = NON_WORD.replace_all(stripped, "-");
    let slug = WHITESPACE.replace_all(&slug, "-");
    let slug = slug.replace('.', "-");
    let slug = HYPHENS.replace_all(&slug, "-");

    slug.trim_matches('-').to_lowercase()
}

/// Location of the assembled document for a seed URL under `output_dir`.
pub fn output_path(output_dir: &Path, url: &str) -> PathBuf {
    output_dir.join(format!("{}.pdf", slugify(url)))
}

/// Write `bytes` to the output path for `url`, creating `output_dir` if needed.
pub fn write_output(output_dir: &Path, url: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))?;
    let path = output_path(output_dir, url);
    std::fs::write(&path, bytes).map_err(|e| Error::io(&path, e))?;
    Ok(path)
}
