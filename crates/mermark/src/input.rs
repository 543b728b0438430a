//! Document sources: a file, stdin (`-`) or an `http(s)://` URL.

use std::convert::Infallible;
use std::path::PathBuf;
use std::str::FromStr;

use tokio::io::AsyncReadExt;

use crate::error::CliError;

/// Where the document text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Input {
    Stdin,
    File(PathBuf),
    Url(String),
}

impl FromStr for Input {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s == "-" {
            Self::Stdin
        } else if s.starts_with("http://") || s.starts_with("https://") {
            Self::Url(s.to_owned())
        } else {
            Self::File(PathBuf::from(s))
        })
    }
}

impl Input {
    /// Read the whole document.
    pub(crate) async fn read(&self) -> Result<String, CliError> {
        match self {
            Self::Stdin => {
                let mut text = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut text)
                    .await
                    .map_err(|e| self.error(e))?;
                Ok(text)
            }
            Self::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| self.error(e)),
            Self::Url(url) => {
                let url = url.clone();
                tokio::task::spawn_blocking(move || fetch(&url))
                    .await
                    .map_err(|e| self.error(e))?
                    .map_err(|e| self.error(e))
            }
        }
    }

    /// Document title derived from the source name.
    pub(crate) fn title(&self) -> String {
        let name = match self {
            Self::Stdin => None,
            Self::File(path) => path.file_stem().and_then(|s| s.to_str()),
            Self::Url(url) => url
                .split(['?', '#'])
                .next()
                .and_then(|path| path.trim_end_matches('/').rsplit('/').next())
                .map(|name| name.rsplit_once('.').map_or(name, |(stem, _)| stem)),
        };
        name.filter(|name| !name.is_empty())
            .unwrap_or("Document")
            .to_owned()
    }

    fn error(&self, err: impl std::fmt::Display) -> CliError {
        CliError::Input {
            source_name: self.to_string(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdin => f.write_str("stdin"),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Fetch a document over HTTP.
fn fetch(url: &str) -> Result<String, ureq::Error> {
    ureq::get(url).call()?.body_mut().read_to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(s: &str) -> Input {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_sources() {
        assert_eq!(parse("-"), Input::Stdin);
        assert_eq!(parse("notes.md"), Input::File(PathBuf::from("notes.md")));
        assert_eq!(
            parse("https://example.com/notes.md"),
            Input::Url("https://example.com/notes.md".to_owned())
        );
        assert_eq!(
            parse("http://localhost/a"),
            Input::Url("http://localhost/a".to_owned())
        );
    }

    #[test]
    fn test_title() {
        assert_eq!(parse("docs/design.md").title(), "design");
        assert_eq!(parse("-").title(), "Document");
        assert_eq!(parse("https://example.com/plans/q3.md?raw=1").title(), "q3");
        assert_eq!(parse("https://example.com/").title(), "example");
    }

    #[tokio::test]
    async fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "# Title\n").unwrap();

        let text = Input::File(path).read().await.unwrap();
        assert_eq!(text, "# Title\n");
    }

    #[tokio::test]
    async fn test_read_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.md");

        let err = Input::File(path.clone()).read().await.unwrap_err();
        assert!(matches!(err, CliError::Input { .. }));
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[tokio::test]
    async fn test_unreachable_url_is_single_error() {
        let err = parse("http://127.0.0.1:1/doc.md").read().await.unwrap_err();
        assert!(matches!(err, CliError::Input { ref source_name, .. } if source_name == "http://127.0.0.1:1/doc.md"));
    }
}
