use anyhow::{Context, Result};
use regex::Regex;
use tracing::info;
use url::Url;

use crate::crawler::error::StructureError;
use crate::crawler::lookup::{attr, find_all, find_tag, parse_page, text_of, TagQuery};
use crate::crawler::session::Session;
use crate::crawler::table::Table;

/// Text that identifies the version list in the sidebar
const VERSIONS_MARKER: &str = "All versions";

/// List every documented Python version with its release status
pub async fn latest_versions(session: &mut dyn Session, main_doc_url: &Url) -> Result<Option<Table>> {
    let Some(page) = session.fetch(main_doc_url).await.into_text() else {
        return Ok(None);
    };

    let links = version_links(&page)
        .with_context(|| format!("Unexpected markup on {}", main_doc_url))?;
    info!("Found {} documented versions", links.len());

    let pattern = version_pattern();
    let mut table = Table::with_header(["Link to documentation", "Version", "Status"]);
    for (href, text) in links {
        let (version, status) = parse_version_label(&pattern, &text);
        table.push([href, version, status]);
    }

    Ok(Some(table))
}

/// `(href, text)` of each link in the first sidebar list holding the marker.
///
/// Finding no such list fails the whole mode.
fn version_links(html: &str) -> Result<Vec<(String, String)>, StructureError> {
    let doc = parse_page(html);
    let sidebar = find_tag(
        doc.root_element(),
        &TagQuery::new("div").class("sphinxsidebarwrapper"),
    )?;

    let list = find_all(sidebar, &TagQuery::new("ul"))
        .into_iter()
        .find(|ul| text_of(*ul).contains(VERSIONS_MARKER))
        .ok_or_else(|| StructureError::MarkerNotFound {
            marker: VERSIONS_MARKER.to_string(),
        })?;

    find_all(list, &TagQuery::new("a"))
        .into_iter()
        .map(|link| -> Result<_, StructureError> {
            Ok((attr(link, "href")?.to_string(), text_of(link)))
        })
        .collect()
}

fn version_pattern() -> Regex {
    Regex::new(r"Python (?P<version>\d\.\d+) \((?P<status>.*)\)").expect("valid version pattern")
}

/// Split a label like `Python 3.9 (stable)` into version and status.
///
/// Labels that do not follow that shape are kept whole with an empty status.
pub fn parse_version_label(pattern: &Regex, text: &str) -> (String, String) {
    match pattern.captures(text) {
        Some(caps) => (caps["version"].to_string(), caps["status"].to_string()),
        None => (text.to_string(), String::new()),
    }
}
