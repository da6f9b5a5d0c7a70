use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};

pub fn ensure_parent(p: &Utf8Path) -> io::Result<()> {
    if let Some(dir) = p.parent().filter(|d| !d.as_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

pub fn write_all(p: &Utf8Path, bytes: &[u8]) -> io::Result<()> {
    ensure_parent(p)?;
    fs::write(p, bytes)
}

/// Chemin temporaire unique (`<tmp>/<prefix>-<pid>-<ms>.<ext>`), non créé.
pub fn tmp_file(prefix: &str, ext: &str) -> Utf8PathBuf {
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let name = format!("{prefix}-{}-{ts}.{}", std::process::id(), ext.trim_start_matches('.'));
    let dir = std::env::temp_dir();
    match Utf8PathBuf::from_path_buf(dir) {
        Ok(d) => d.join(name),
        Err(_) => Utf8PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_all_creates_missing_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8");
        let target = root.join("a/b/out.js");
        write_all(&target, b"ok").expect("écriture");
        assert_eq!(fs::read_to_string(&target).expect("lecture"), "ok");
    }

    #[test]
    fn tmp_files_keep_the_extension() {
        let p = tmp_file("pine2js-review", ".mjs");
        assert_eq!(p.extension(), Some("mjs"));
        assert!(p.file_name().is_some_and(|n| n.starts_with("pine2js-review-")));
    }
}
