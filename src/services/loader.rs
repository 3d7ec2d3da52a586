use crate::error::{ImportError, Result};
use crate::types::RawDocument;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};
use url::Url;
use walkdir::WalkDir;

/// Reads manuscripts from disk or over HTTP, enforcing the `.txt` boundary.
pub struct DocumentLoader;

impl DocumentLoader {
    /// Rejects anything whose name does not end in `.txt` (any case).
    pub fn ensure_txt(name: &str) -> Result<()> {
        if Self::is_txt(name) {
            Ok(())
        } else {
            Err(ImportError::UnsupportedFileType {
                name: name.to_string(),
            })
        }
    }

    fn is_txt(name: &str) -> bool {
        name.to_lowercase().ends_with(".txt")
    }

    pub async fn load(source: &str) -> Result<RawDocument> {
        if Self::is_url(source) {
            Self::load_from_url(source).await
        } else {
            Self::load_from_file(source).await
        }
    }

    async fn load_from_url(url: &str) -> Result<RawDocument> {
        let parsed_url = Url::parse(url)?;
        let file_name = Self::extract_filename_from_url(&parsed_url);
        Self::ensure_txt(&file_name)?;

        info!("Downloading manuscript from URL: {}", url);
        let response = reqwest::get(parsed_url).await?.error_for_status()?;
        let bytes = response.bytes().await?.to_vec();
        debug!("Downloaded {} bytes", bytes.len());

        Ok(RawDocument::new(file_name, bytes))
    }

    async fn load_from_file(file_path: &str) -> Result<RawDocument> {
        let path = Path::new(file_path);
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_path)
            .to_string();
        Self::ensure_txt(&file_name)?;

        if !path.is_file() {
            return Err(ImportError::FileNotFound {
                path: file_path.to_string(),
            });
        }

        info!("Reading manuscript: {}", file_path);
        let bytes = fs::read(path).await?;
        Ok(RawDocument::new(file_name, bytes))
    }

    fn is_url(source: &str) -> bool {
        source.starts_with("http://") || source.starts_with("https://")
    }

    fn extract_filename_from_url(url: &Url) -> String {
        url.path_segments()
            .and_then(|segments| segments.last())
            .filter(|name| !name.is_empty())
            .unwrap_or("download")
            .to_string()
    }

    /// Validates sources and expands directories into the `.txt` files beneath them.
    pub fn collect_sources(sources: &[String]) -> Result<Vec<String>> {
        let mut collected = Vec::new();

        for source in sources {
            if Self::is_url(source) {
                let url = Url::parse(source)?;
                Self::ensure_txt(&Self::extract_filename_from_url(&url))?;
                collected.push(source.clone());
                continue;
            }

            let path = Path::new(source);
            if path.is_dir() {
                let mut found: Vec<String> = WalkDir::new(path)
                    .into_iter()
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.file_type().is_file())
                    .filter(|entry| Self::is_txt(&entry.file_name().to_string_lossy()))
                    .map(|entry| entry.path().to_string_lossy().into_owned())
                    .collect();
                found.sort();
                debug!("Found {} .txt files under {}", found.len(), source);
                collected.extend(found);
            } else if path.is_file() {
                Self::ensure_txt(source)?;
                collected.push(source.clone());
            } else {
                return Err(ImportError::FileNotFound {
                    path: source.clone(),
                });
            }
        }

        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;

    #[test]
    fn test_extension_check_is_case_insensitive() {
        assert!(DocumentLoader::ensure_txt("book.txt").is_ok());
        assert!(DocumentLoader::ensure_txt("BOOK.TXT").is_ok());
        assert!(matches!(
            DocumentLoader::ensure_txt("book.md"),
            Err(ImportError::UnsupportedFileType { .. })
        ));
        assert!(DocumentLoader::ensure_txt("txt").is_err());
    }

    #[tokio::test]
    async fn test_load_reads_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("novel.TXT");
        std_fs::write(&path, [0xD4, 0xB6, 0xB7, 0xBD]).unwrap();

        let document = DocumentLoader::load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(document.file_name, "novel.TXT");
        assert_eq!(document.stem(), "novel");
        assert_eq!(document.bytes, vec![0xD4, 0xB6, 0xB7, 0xBD]);
    }

    #[tokio::test]
    async fn test_load_rejects_other_extensions_before_reading() {
        let err = DocumentLoader::load("/definitely/missing/notes.docx")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFileType { .. }));

        let err = DocumentLoader::load("/definitely/missing/notes.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound { .. }));
    }

    #[test]
    fn test_collect_sources_expands_directories() {
        let dir = tempfile::tempdir().unwrap();
        std_fs::write(dir.path().join("b.txt"), "b").unwrap();
        std_fs::write(dir.path().join("a.TXT"), "a").unwrap();
        std_fs::write(dir.path().join("c.md"), "c").unwrap();
        std_fs::create_dir(dir.path().join("nested")).unwrap();
        std_fs::write(dir.path().join("nested").join("d.txt"), "d").unwrap();

        let sources = DocumentLoader::collect_sources(&[dir.path().to_string_lossy().into_owned()])
            .unwrap();

        assert_eq!(sources.len(), 3);
        assert!(sources.iter().all(|s| s.to_lowercase().ends_with(".txt")));
    }

    #[test]
    fn test_collect_sources_checks_urls() {
        let ok = DocumentLoader::collect_sources(&["https://example.org/books/a.txt".to_string()]);
        assert!(ok.is_ok());

        let bad = DocumentLoader::collect_sources(&["https://example.org/books/a.pdf".to_string()]);
        assert!(matches!(bad, Err(ImportError::UnsupportedFileType { .. })));
    }
}
