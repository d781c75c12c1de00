use anyhow::{Context, Result};
use tracing::{debug, info};
use url::Url;

use crate::crawler::error::StructureError;
use crate::crawler::lookup::{find_all, find_tag, parse_page, resolve_href, text_of, TagQuery};
use crate::crawler::session::Session;
use crate::crawler::table::Table;

/// Collect the title and editor line of every "What's New" article
pub async fn whats_new(session: &mut dyn Session, main_doc_url: &Url) -> Result<Option<Table>> {
    let whats_new_url = main_doc_url.join("whatsnew/")?;
    let Some(index) = session.fetch(&whats_new_url).await.into_text() else {
        return Ok(None);
    };

    let links = article_links(&index, &whats_new_url)
        .with_context(|| format!("Unexpected markup on {}", whats_new_url))?;
    info!("Found {} articles", links.len());

    let mut table = Table::with_header(["Link to article", "Title", "Editor, Author"]);
    for link in links {
        let Some(page) = session.fetch(&link).await.into_text() else {
            continue;
        };

        let (title, editors) = article_summary(&page)
            .with_context(|| format!("Unexpected markup on {}", link))?;
        debug!("Article {}: {}", link, title);
        table.push([link.to_string(), title, editors]);
    }

    Ok(Some(table))
}

/// Links to the per-version articles listed in the table of contents
fn article_links(html: &str, page_url: &Url) -> Result<Vec<Url>, StructureError> {
    let doc = parse_page(html);
    let section = find_tag(
        doc.root_element(),
        &TagQuery::new("section").attr("id", "what-s-new-in-python"),
    )?;
    let toc = find_tag(section, &TagQuery::new("div").class("toctree-wrapper"))?;

    find_all(toc, &TagQuery::new("li").class("toctree-l1"))
        .into_iter()
        .map(|item| {
            let link = find_tag(item, &TagQuery::new("a"))?;
            resolve_href(page_url, link)
        })
        .collect()
}

/// Top heading and the first description list, flattened to one line
fn article_summary(html: &str) -> Result<(String, String), StructureError> {
    let doc = parse_page(html);
    let root = doc.root_element();

    let h1 = find_tag(root, &TagQuery::new("h1"))?;
    let dl = find_tag(root, &TagQuery::new("dl"))?;

    Ok((text_of(h1), text_of(dl).replace('\n', " ")))
}
