use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

use crate::crawler::error::StructureError;
use crate::crawler::lookup::{find_tag, parse_page, resolve_href, TagQuery};
use crate::crawler::session::Session;

/// Download the A4 PDF documentation archive into `downloads_dir`.
///
/// Returns the saved file's path, or `None` if the downloads page could not
/// be fetched.
pub async fn download(session: &mut dyn Session, main_doc_url: &Url, downloads_dir: &Path) -> Result<Option<PathBuf>> {
    let downloads_url = main_doc_url.join("download.html")?;
    let Some(page) = session.fetch(&downloads_url).await.into_text() else {
        return Ok(None);
    };

    let archive_url = archive_link(&page, &downloads_url)
        .with_context(|| format!("Unexpected markup on {}", downloads_url))?;
    let filename = archive_filename(&archive_url)?;

    tokio::fs::create_dir_all(downloads_dir)
        .await
        .context(format!("Failed to create directory: {}", downloads_dir.display()))?;
    let archive_path = downloads_dir.join(filename);

    session.download(&archive_url, &archive_path).await?;
    info!("Archive downloaded and saved: {}", archive_path.display());

    Ok(Some(archive_path))
}

/// Absolute URL of the A4 PDF archive listed in the downloads table
fn archive_link(html: &str, page_url: &Url) -> Result<Url, StructureError> {
    let doc = parse_page(html);
    let table = find_tag(doc.root_element(), &TagQuery::new("table").class("docutils"))?;

    let pattern = Regex::new(r".+pdf-a4\.zip$").expect("valid archive pattern");
    let link = find_tag(table, &TagQuery::new("a").attr_matches("href", pattern))?;
    resolve_href(page_url, link)
}

/// Last path segment of the archive URL
fn archive_filename(url: &Url) -> Result<&str> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .with_context(|| format!("Archive URL has no file name: {}", url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::HttpSettings;
    use crate::crawler::session::CachedSession;
    use crate::storage::cache::ResponseCache;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOWNLOAD_PAGE: &str = r#"
        <html><body>
          <p><a href="archives/python-3.12-docs-pdf-letter.zip">Letter</a></p>
          <table class="docutils align-default">
            <tr>
              <td>PDF (US-Letter paper size)</td>
              <td><a href="archives/python-3.12-docs-pdf-letter.zip">Download</a></td>
            </tr>
            <tr>
              <td>PDF (A4 paper size)</td>
              <td><a href="archives/python-3.12-docs-pdf-a4.zip">Download</a></td>
            </tr>
          </table>
        </body></html>
    "#;

    #[tokio::test]
    async fn test_archive_saved_under_last_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/download.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DOWNLOAD_PAGE))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/3/archives/python-3.12-docs-pdf-a4.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04zip".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloads_dir = dir.path().join("downloads");
        let root = Url::parse(&format!("{}/3/", server.uri())).unwrap();
        let mut session = CachedSession::new(&HttpSettings::default(), ResponseCache::in_memory(None)).unwrap();

        let saved = download(&mut session, &root, &downloads_dir).await.unwrap().unwrap();

        assert_eq!(saved, downloads_dir.join("python-3.12-docs-pdf-a4.zip"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"PK\x03\x04zip");
    }

    #[test]
    fn test_missing_archive_link_is_structural() {
        let page = r#"<table class="docutils"><tr><td><a href="docs.tar.bz2">x</a></td></tr></table>"#;
        let base = Url::parse("https://docs.example.org/3/download.html").unwrap();

        assert!(matches!(
            archive_link(page, &base),
            Err(StructureError::TagNotFound { .. })
        ));
    }

    #[test]
    fn test_archive_filename() {
        let url = Url::parse("https://docs.example.org/3/archives/python-docs-pdf-a4.zip").unwrap();
        assert_eq!(archive_filename(&url).unwrap(), "python-docs-pdf-a4.zip");

        let url = Url::parse("https://docs.example.org/3/archives/").unwrap();
        assert!(archive_filename(&url).is_err());
    }
}
