use regex::Regex;
use scraper::{ElementRef, Html};
use std::fmt;
use url::Url;

use crate::crawler::error::StructureError;

/// Parse raw page text into a navigable document
pub fn parse_page(text: &str) -> Html {
    Html::parse_document(text)
}

/// A single condition an element must satisfy
enum Filter<'q> {
    Attr(&'q str, &'q str),
    Class(&'q str),
    AttrMatches(&'q str, Regex),
    TextContains(&'q str),
    Custom(&'q str, Box<dyn Fn(ElementRef<'_>) -> bool + 'q>),
}

/// Declarative description of the element to look for.
///
/// A query always names the element and may add any number of filters.
/// An element matches when every filter accepts it.
pub struct TagQuery<'q> {
    name: &'q str,
    filters: Vec<Filter<'q>>,
}

impl<'q> TagQuery<'q> {
    /// Match elements with the given tag name
    pub fn new(name: &'q str) -> Self {
        Self {
            name,
            filters: Vec::new(),
        }
    }

    /// Require an attribute with an exact value
    pub fn attr(mut self, name: &'q str, value: &'q str) -> Self {
        self.filters.push(Filter::Attr(name, value));
        self
    }

    /// Require one class among the element's classes
    pub fn class(mut self, class: &'q str) -> Self {
        self.filters.push(Filter::Class(class));
        self
    }

    /// Require an attribute whose value matches a pattern
    pub fn attr_matches(mut self, name: &'q str, pattern: Regex) -> Self {
        self.filters.push(Filter::AttrMatches(name, pattern));
        self
    }

    /// Require the element's text content to contain `needle`
    pub fn text_contains(mut self, needle: &'q str) -> Self {
        self.filters.push(Filter::TextContains(needle));
        self
    }

    /// Require an arbitrary predicate; `label` is used in error messages
    pub fn matching<F>(mut self, label: &'q str, predicate: F) -> Self
    where
        F: Fn(ElementRef<'_>) -> bool + 'q,
    {
        self.filters.push(Filter::Custom(label, Box::new(predicate)));
        self
    }

    /// Check whether an element satisfies this query
    pub fn matches(&self, element: ElementRef<'_>) -> bool {
        let value = element.value();
        if value.name() != self.name {
            return false;
        }

        self.filters.iter().all(|filter| match filter {
            Filter::Attr(name, expected) => value.attr(name) == Some(*expected),
            Filter::Class(class) => value.classes().any(|c| c == *class),
            Filter::AttrMatches(name, pattern) => {
                value.attr(name).map_or(false, |v| pattern.is_match(v))
            }
            Filter::TextContains(needle) => text_of(element).contains(*needle),
            Filter::Custom(_, predicate) => predicate(element),
        })
    }
}

impl fmt::Display for TagQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for filter in &self.filters {
            match filter {
                Filter::Attr(name, value) => write!(f, " {}=\"{}\"", name, value)?,
                Filter::Class(class) => write!(f, " class~=\"{}\"", class)?,
                Filter::AttrMatches(name, pattern) => write!(f, " {}=/{}/", name, pattern)?,
                Filter::TextContains(needle) => write!(f, " text*=\"{}\"", needle)?,
                Filter::Custom(label, _) => write!(f, " [{}]", label)?,
            }
        }
        write!(f, ">")
    }
}

/// Elements strictly below `scope`, in document order
fn descendants<'a>(scope: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    scope.descendants().skip(1).filter_map(ElementRef::wrap)
}

/// Find the first element below `scope` that matches `query`.
///
/// Missing structure is a hard error, never a silent `None`: once a page has
/// been fetched its markup is expected to have a fixed shape.
pub fn find_tag<'a>(scope: ElementRef<'a>, query: &TagQuery<'_>) -> Result<ElementRef<'a>, StructureError> {
    descendants(scope)
        .find(|element| query.matches(*element))
        .ok_or_else(|| StructureError::TagNotFound {
            query: query.to_string(),
        })
}

/// Find every element below `scope` that matches `query`
pub fn find_all<'a>(scope: ElementRef<'a>, query: &TagQuery<'_>) -> Vec<ElementRef<'a>> {
    descendants(scope)
        .filter(|element| query.matches(*element))
        .collect()
}

/// The next sibling that is an element, skipping text and comments
pub fn next_element_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

/// Concatenated text of an element and its descendants
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Read a required attribute
pub fn attr<'a>(element: ElementRef<'a>, name: &'static str) -> Result<&'a str, StructureError> {
    element
        .value()
        .attr(name)
        .ok_or_else(|| StructureError::MissingAttribute {
            tag: element.value().name().to_string(),
            attr: name,
        })
}

/// Resolve the `href` of a link against the page it was found on
pub fn resolve_href(base: &Url, link: ElementRef<'_>) -> Result<Url, StructureError> {
    let href = attr(link, "href")?;
    base.join(href).map_err(|source| StructureError::BadLink {
        href: href.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <section id="intro"><p>Hello</p></section>
          <table class="pep-zero-table docutils">
            <tr><td>first</td></tr>
          </table>
          <dl class="rfc2822 field-list">
            <dt class="field-odd">Author<span class="colon">:</span></dt>
            <dd class="field-odd">Someone</dd>
            <dt class="field-even">Status<span class="colon">:</span></dt>
            <dd class="field-even"><abbr title="Accepted and complete">Final</abbr></dd>
          </dl>
          <a href="archive/python-3.12-docs-pdf-a4.zip">PDF</a>
        </body></html>
    "#;

    #[test]
    fn test_find_tag_by_attr_and_class() {
        let doc = parse_page(PAGE);
        let root = doc.root_element();

        let section = find_tag(root, &TagQuery::new("section").attr("id", "intro")).unwrap();
        assert_eq!(text_of(section), "Hello");

        // Class filters match one class out of several
        let table = find_tag(root, &TagQuery::new("table").class("docutils")).unwrap();
        assert_eq!(table.value().name(), "table");
    }

    #[test]
    fn test_find_tag_missing_is_an_error() {
        let doc = parse_page(PAGE);
        let err = find_tag(doc.root_element(), &TagQuery::new("section").attr("id", "nope")).unwrap_err();

        match err {
            StructureError::TagNotFound { query } => assert_eq!(query, "<section id=\"nope\">"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_find_tag_first_text_match_wins() {
        let doc = parse_page(PAGE);
        let dl = find_tag(doc.root_element(), &TagQuery::new("dl")).unwrap();

        let term = find_tag(dl, &TagQuery::new("dt").text_contains("Status")).unwrap();
        let value = next_element_sibling(term).unwrap();
        assert_eq!(text_of(value), "Final");
    }

    #[test]
    fn test_find_tag_with_pattern_and_predicate() {
        let doc = parse_page(PAGE);
        let root = doc.root_element();

        let pattern = Regex::new(r".+pdf-a4\.zip$").unwrap();
        let link = find_tag(root, &TagQuery::new("a").attr_matches("href", pattern)).unwrap();
        let base = Url::parse("https://docs.example.org/3/download.html").unwrap();
        assert_eq!(
            resolve_href(&base, link).unwrap().as_str(),
            "https://docs.example.org/3/archive/python-3.12-docs-pdf-a4.zip"
        );

        let query = TagQuery::new("dd").matching("has abbr", |el| {
            find_tag(el, &TagQuery::new("abbr")).is_ok()
        });
        assert_eq!(find_all(root, &query).len(), 1);
    }

    #[test]
    fn test_find_tag_searches_below_scope_only() {
        let doc = parse_page(PAGE);
        let dl = find_tag(doc.root_element(), &TagQuery::new("dl")).unwrap();

        // The scope itself is not a candidate
        assert!(find_tag(dl, &TagQuery::new("dl")).is_err());
        assert!(find_tag(dl, &TagQuery::new("section")).is_err());
        assert_eq!(find_all(dl, &TagQuery::new("dt")).len(), 2);
    }

    #[test]
    fn test_missing_attribute() {
        let doc = parse_page(PAGE);
        let dl = find_tag(doc.root_element(), &TagQuery::new("dl")).unwrap();

        assert!(matches!(
            attr(dl, "href"),
            Err(StructureError::MissingAttribute { attr: "href", .. })
        ));
    }
}
