use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::votes::random_base36;

pub const MAX_PROOF_FILES: usize = 5;
pub const MAX_PROOF_FILE_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_DESCRIPTION: &str = "No description provided";

lazy_static! {
    static ref EXTENSION: Regex = Regex::new(r"^[A-Za-z0-9]{1,10}$").unwrap();
}

/// Required free-text fields must have something left after trimming.
pub fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

pub fn description_or_default(description: Option<&str>) -> String {
    match description.map(str::trim) {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => DEFAULT_DESCRIPTION.to_string(),
    }
}

/// Escapes LIKE wildcards so the query matches as a plain substring.
pub fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// `<unix millis>-<random>.<ext>`; the blob store never refuses to overwrite
/// so names must not collide.
pub fn proof_file_name(original_name: &str, now_millis: i64) -> String {
    let suffix = random_base36(6);
    match original_name.rsplit_once('.').map(|(_, ext)| ext) {
        Some(ext) if EXTENSION.is_match(ext) => {
            format!("{now_millis}-{suffix}.{}", ext.to_lowercase())
        }
        _ => format!("{now_millis}-{suffix}"),
    }
}

pub fn is_video_url(url: &str) -> bool {
    let url = url.to_lowercase();
    [".mp4", ".mov", ".avi", ".webm", ".mkv"]
        .iter()
        .any(|ext| url.contains(ext))
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProofFileError {
    #[error("Invalid file type: please upload only images or videos.")]
    InvalidType,
    #[error("File too large: please upload files smaller than 10MB.")]
    TooLarge,
    #[error("Too many files: you can only upload up to 5 files.")]
    TooMany,
}

#[derive(Debug, Clone)]
pub struct ProofFile {
    pub name: String,
    pub content_type: mime::Mime,
    pub bytes: Vec<u8>,
}

impl ProofFile {
    pub fn check(&self) -> Result<(), ProofFileError> {
        check_proof_file(&self.content_type, self.bytes.len())
    }
}

pub fn check_proof_file(content_type: &mime::Mime, size: usize) -> Result<(), ProofFileError> {
    if content_type.type_() != mime::IMAGE && content_type.type_() != mime::VIDEO {
        return Err(ProofFileError::InvalidType);
    }
    if size > MAX_PROOF_FILE_BYTES {
        return Err(ProofFileError::TooLarge);
    }
    Ok(())
}

/// Files attached to a submission. A rejected addition leaves the selection
/// as it was.
#[derive(Debug, Default)]
pub struct ProofSelection {
    files: Vec<ProofFile>,
}

impl ProofSelection {
    pub fn add(&mut self, file: ProofFile) -> Result<(), ProofFileError> {
        file.check()?;
        if self.files.len() >= MAX_PROOF_FILES {
            return Err(ProofFileError::TooMany);
        }
        self.files.push(file);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn into_files(self) -> Vec<ProofFile> {
        self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content_type: &str, size: usize) -> ProofFile {
        ProofFile {
            name: "clip.mp4".to_string(),
            content_type: content_type.parse().unwrap(),
            bytes: vec![0; size],
        }
    }

    #[test]
    fn required_fields_and_defaults() {
        assert!(is_present(" PlayerX "));
        assert!(!is_present("   "));
        assert_eq!(description_or_default(None), DEFAULT_DESCRIPTION);
        assert_eq!(description_or_default(Some("  ")), DEFAULT_DESCRIPTION);
        assert_eq!(description_or_default(Some(" spins ")), "spins");
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("123"), "%123%");
        assert_eq!(like_pattern("a_b%c\\"), "%a\\_b\\%c\\\\%");
    }

    #[test]
    fn proof_file_names() {
        let name = proof_file_name("Evidence.PNG", 1_700_000_000_000);
        assert!(name.starts_with("1700000000000-"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "1700000000000-".len() + 6 + ".png".len());
        assert!(!proof_file_name("noext", 1).contains('.'));
        assert!(!proof_file_name("bad.ext/../x", 1).contains(".."));
        assert_ne!(proof_file_name("a.png", 1), proof_file_name("a.png", 1));
    }

    #[test]
    fn video_urls() {
        assert!(is_video_url("https://cdn/x/CLIP.MP4"));
        assert!(!is_video_url("https://cdn/x/shot.png"));
    }

    #[test]
    fn sixth_file_is_rejected_without_changing_selection() {
        let mut selection = ProofSelection::default();
        for _ in 0..5 {
            selection.add(file("image/png", 10)).unwrap();
        }
        assert_eq!(selection.add(file("image/png", 10)), Err(ProofFileError::TooMany));
        assert_eq!(selection.len(), 5);
    }

    #[test]
    fn oversized_and_wrong_type_files_are_rejected() {
        let mut selection = ProofSelection::default();
        assert_eq!(
            selection.add(file("video/mp4", MAX_PROOF_FILE_BYTES + 1)),
            Err(ProofFileError::TooLarge)
        );
        assert_eq!(
            selection.add(file("application/pdf", 10)),
            Err(ProofFileError::InvalidType)
        );
        assert!(selection.is_empty());
        selection.add(file("video/mp4", MAX_PROOF_FILE_BYTES)).unwrap();
        assert_eq!(selection.len(), 1);
    }
}
