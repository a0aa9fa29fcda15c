// ============================================================
// Layer 4 — Language Pair Inference
// ============================================================
// Binarized translation data is named
//
//   <split>.<src>-<tgt>.<lang>     e.g. train.de-en.de
//
// so the pair can be read off the first matching file name.
// Entries are visited in sorted order to keep the answer stable.

use std::{fs, path::Path};

use crate::error::{BertNmtError, Result};

/// Find `(source, target)` from the file names in `dir`.
pub fn infer_language_pair(dir: &Path) -> Result<(String, String)> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    names
        .iter()
        .find_map(|name| pair_from_file_name(name))
        .ok_or_else(|| BertNmtError::LanguagePair(dir.to_path_buf()))
}

fn pair_from_file_name(name: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() < 3 {
        return None;
    }
    let langs: Vec<&str> = parts[1].split('-').collect();
    match langs.as_slice() {
        [src, tgt] => Some((src.to_string(), tgt.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pair_from_binarized_name() {
        assert_eq!(pair_from_file_name("train.de-en.de"), Some(("de".into(), "en".into())));
        assert_eq!(pair_from_file_name("valid.zh-en.en.bin"), Some(("zh".into(), "en".into())));
        assert_eq!(pair_from_file_name("dict.en.txt"), None);
        assert_eq!(pair_from_file_name("README"), None);
    }

    #[test]
    fn test_infers_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("dict.en.txt"), "").unwrap();
        fs::write(dir.path().join("train.de-en.de"), "").unwrap();
        let (src, tgt) = infer_language_pair(dir.path()).unwrap();
        assert_eq!((src.as_str(), tgt.as_str()), ("de", "en"));
    }

    #[test]
    fn test_no_match_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("dict.en.txt"), "").unwrap();
        assert!(matches!(infer_language_pair(dir.path()), Err(BertNmtError::LanguagePair(_))));
    }
}
