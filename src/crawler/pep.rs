use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use url::Url;

use crate::cli::config::ExpectedStatus;
use crate::crawler::error::StructureError;
use crate::crawler::lookup::{
    find_all, find_tag, next_element_sibling, parse_page, resolve_href, text_of, TagQuery,
};
use crate::crawler::session::Session;
use crate::crawler::table::Table;

/// Label of the description-list term holding a PEP's status
const STATUS_LABEL: &str = "Status";

/// One row of the numerical index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Status letter shown on the index (may be empty)
    pub code: String,

    /// Detail page of the PEP
    pub link: Url,
}

/// Status seen on a detail page that the index code does not allow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub link: Url,
    pub observed: String,
    pub expected: Vec<String>,
}

/// Occurrences of each detail status, in first-seen order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatusCounter {
    counts: Vec<(String, usize)>,
}

impl StatusCounter {
    pub fn add(&mut self, status: &str) {
        match self.counts.iter_mut().find(|(seen, _)| seen == status) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((status.to_string(), 1)),
        }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(status, count)| (status.as_str(), *count))
    }
}

#[cfg(test)]
impl StatusCounter {
    pub fn get(&self, status: &str) -> usize {
        self.counts
            .iter()
            .find(|(seen, _)| seen == status)
            .map_or(0, |(_, count)| *count)
    }
}

/// Accumulated result of one cross-validation run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PepReport {
    pub counter: StatusCounter,
    pub mismatches: Vec<Mismatch>,
    /// Entries skipped because their detail page could not be fetched
    pub skipped: usize,
}

impl PepReport {
    /// Count a detail status and check it against the allowed set
    fn record(&mut self, link: Url, observed: String, expected: &[String]) {
        if !expected.iter().any(|status| *status == observed) {
            self.mismatches.push(Mismatch {
                link,
                observed: observed.clone(),
                expected: expected.to_vec(),
            });
        }
        self.counter.add(&observed);
    }

    /// Header, one row per status, then the total
    pub fn to_table(&self) -> Table {
        let mut table = Table::with_header(["Status", "Count"]);
        for (status, count) in self.counter.iter() {
            table.push([status.to_string(), count.to_string()]);
        }
        table.push(["Total".to_string(), self.counter.total().to_string()]);
        table
    }

    fn log_mismatches(&self) {
        if self.mismatches.is_empty() {
            return;
        }

        info!("Mismatched statuses:");
        for mismatch in &self.mismatches {
            warn!(
                "{} | status on page: {} | expected: {}",
                mismatch.link,
                mismatch.observed,
                mismatch.expected.join(", ")
            );
        }
    }
}

/// Count PEP statuses from their detail pages, reporting index mismatches
pub async fn pep(session: &mut dyn Session, pep_url: &Url, expected: &ExpectedStatus) -> Result<Option<Table>> {
    let Some(report) = cross_validate(session, pep_url, expected).await? else {
        return Ok(None);
    };

    report.log_mismatches();
    if report.skipped > 0 {
        info!("Skipped {} unreachable PEP pages", report.skipped);
    }

    Ok(Some(report.to_table()))
}

/// Walk the numerical index and compare every entry with its detail page.
///
/// An unreachable detail page only skips its entry. Unexpected markup or an
/// index code missing from `expected` aborts the run.
pub async fn cross_validate(
    session: &mut dyn Session,
    pep_url: &Url,
    expected: &ExpectedStatus,
) -> Result<Option<PepReport>> {
    let Some(index) = session.fetch(pep_url).await.into_text() else {
        return Ok(None);
    };

    let entries = index_entries(&index, pep_url)
        .with_context(|| format!("Unexpected markup on {}", pep_url))?;
    info!("Found {} PEPs in the index", entries.len());

    let mut report = PepReport::default();
    for entry in entries {
        let allowed = expected
            .get(&entry.code)
            .ok_or_else(|| StructureError::UnknownStatusCode {
                code: entry.code.clone(),
            })
            .with_context(|| format!("Index entry for {}", entry.link))?;

        let Some(page) = session.fetch(&entry.link).await.into_text() else {
            report.skipped += 1;
            continue;
        };

        let status = detail_status(&page)
            .with_context(|| format!("Unexpected markup on {}", entry.link))?;
        debug!("{}: index '{}', page '{}'", entry.link, entry.code, status);

        report.record(entry.link, status, allowed);
    }

    Ok(Some(report))
}

/// Rows of the numerical index table
fn index_entries(html: &str, page_url: &Url) -> Result<Vec<IndexEntry>, StructureError> {
    let doc = parse_page(html);
    let section = find_tag(
        doc.root_element(),
        &TagQuery::new("section").attr("id", "numerical-index"),
    )?;
    let table = find_tag(section, &TagQuery::new("table").class("pep-zero-table"))?;
    let tbody = find_tag(table, &TagQuery::new("tbody"))?;

    find_all(tbody, &TagQuery::new("tr"))
        .into_iter()
        .enumerate()
        .map(|(row, tr)| -> Result<IndexEntry, StructureError> {
            let cells = find_all(tr, &TagQuery::new("td"));
            if cells.len() < 3 {
                return Err(StructureError::MissingCell {
                    row,
                    found: cells.len(),
                    expected: 3,
                });
            }

            let link = find_tag(cells[2], &TagQuery::new("a"))?;
            Ok(IndexEntry {
                code: status_code(&text_of(cells[0])),
                link: resolve_href(page_url, link)?,
            })
        })
        .collect()
}

/// Status letter of a type/status cell such as `SF`.
///
/// The first character is the PEP type and is dropped; a cell holding only
/// the type yields an empty code.
fn status_code(cell: &str) -> String {
    cell.trim().chars().skip(1).collect()
}

/// Status value from a PEP's header description list
fn detail_status(html: &str) -> Result<String, StructureError> {
    let doc = parse_page(html);
    let dl = find_tag(doc.root_element(), &TagQuery::new("dl"))?;
    let term = find_tag(dl, &TagQuery::new("dt").text_contains(STATUS_LABEL))?;

    let value = next_element_sibling(term).ok_or_else(|| StructureError::MissingValue {
        label: STATUS_LABEL.to_string(),
    })?;

    Ok(text_of(value).split_whitespace().collect::<Vec<_>>().join(" "))
}
