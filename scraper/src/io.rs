use std::borrow::Cow;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Replace `path` with `bytes` so that readers only ever see the old or the new content.
///
/// The data goes to a temp file in the same directory and is renamed over the target.
pub fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    let dir = parent_dir(path);
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Stream `reader` into `path` through a sibling temp file, returning the bytes written.
pub fn copy_atomic<P: AsRef<Path>, R: Read>(path: P, reader: &mut R) -> io::Result<u64> {
    let path = path.as_ref();
    let dir = parent_dir(path);
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    let written = io::copy(reader, &mut tmp)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(written)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Folder name for a newspaper title: word characters, whitespace and dashes only.
pub fn sanitize_title(input: &str) -> String {
    let sanitized: String = input
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace() || *c == '-')
        .collect();
    let sanitized = sanitized.trim();

    // If the name is empty after sanitization, provide a default
    if sanitized.is_empty() {
        "Unknown".to_string()
    } else {
        sanitized.to_string()
    }
}

/// Last path segment of a URL, percent-decoded and usable as a file name.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.last()?;
    let decoded = urlencoding::decode(last).unwrap_or(Cow::Borrowed(last));
    let name = decoded.replace(&['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\0'][..], "_");
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name)
    }
}
