//! Link extraction from captured portal pages.
//!
//! The portal's DOM is fixed and known: directory links live in `p.rep`
//! paragraphs, file links in `p.doc` paragraphs, and the navigation menu
//! marks top-level directories with the `menurep` anchor class. Extraction
//! works on the rendered HTML string, so the same functions serve both the
//! traversal engine and its tests.

use std::sync::LazyLock;

use regex::Regex;

/// Anchor tags with their attribute list and inner markup.
#[allow(clippy::expect_used)]
static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a\b([^>]*)>(.*?)</a>"#).expect("anchor regex is valid")
});

/// Directory paragraphs (`<p class="rep...">`).
#[allow(clippy::expect_used)]
static REP_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<p\s+class="rep[^"]*"[^>]*>(.*?)</p>"#).expect("rep block regex is valid")
});

/// Document paragraphs (`<p class="doc...">`).
#[allow(clippy::expect_used)]
static DOC_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<p\s+class="doc[^"]*"[^>]*>(.*?)</p>"#).expect("doc block regex is valid")
});

#[allow(clippy::expect_used)]
static HREF_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]*)""#).expect("href regex is valid"));

#[allow(clippy::expect_used)]
static CLASS_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class="([^"]*)""#).expect("class regex is valid"));

#[allow(clippy::expect_used)]
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex is valid"));

/// A discovered link: the opaque remote identifier plus the display text that
/// was linked to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub id: String,
    pub label: String,
}

/// Whether captured content is an authenticated page.
///
/// The login control appearing without the logged-out control means the page
/// rendered as the anonymous login form: the session has expired or the
/// credentials never took.
#[must_use]
pub fn is_authenticated(html: &str) -> bool {
    !(html.contains("icon-connexion") && !html.contains("icon-deconnexion"))
}

/// Extracts the value of a query parameter from an href.
///
/// Matches the portal's link scheme by substring: the value after the last
/// `key=` occurrence, up to `&` or `#`. Returns `None` when the parameter is
/// absent or empty.
#[must_use]
pub fn query_param<'a>(href: &'a str, key: &str) -> Option<&'a str> {
    let marker = format!("{key}=");
    let start = href.rfind(&marker)? + marker.len();
    let rest = &href[start..];
    let end = rest.find(['&', '#']).unwrap_or(rest.len());
    let value = &rest[..end];
    (!value.is_empty()).then_some(value)
}

/// Top-level directory links from the portal navigation menu.
#[must_use]
pub fn menu_links(html: &str) -> Vec<LinkTarget> {
    let mut links = Vec::new();
    for anchor in ANCHOR.captures_iter(html) {
        let attrs = &anchor[1];
        let is_menu_entry = CLASS_ATTR
            .captures(attrs)
            .is_some_and(|c| c[1].split_whitespace().any(|class| class == "menurep"));
        if !is_menu_entry {
            continue;
        }
        if let Some(href) = HREF_ATTR.captures(attrs)
            && let Some(id) = query_param(&href[1], "rep")
        {
            links.push(LinkTarget {
                id: id.to_string(),
                label: anchor_text(&anchor[2]),
            });
        }
    }
    links
}

/// Child-directory links of a directory page, in document order.
#[must_use]
pub fn directory_links(html: &str) -> Vec<LinkTarget> {
    links_in_blocks(html, &REP_BLOCK, "rep", None)
}

/// File links of a directory page, in document order.
#[must_use]
pub fn file_links(html: &str) -> Vec<LinkTarget> {
    links_in_blocks(html, &DOC_BLOCK, "id", Some("download?id="))
}

fn links_in_blocks(
    html: &str,
    block: &Regex,
    key: &str,
    required_marker: Option<&str>,
) -> Vec<LinkTarget> {
    let mut links = Vec::new();
    for captures in block.captures_iter(html) {
        for anchor in ANCHOR.captures_iter(&captures[1]) {
            let Some(href) = HREF_ATTR.captures(&anchor[1]) else {
                continue;
            };
            let href = &href[1];
            if let Some(marker) = required_marker
                && !href.contains(marker)
            {
                continue;
            }
            if let Some(id) = query_param(href, key) {
                links.push(LinkTarget {
                    id: id.to_string(),
                    label: anchor_text(&anchor[2]),
                });
            }
        }
    }
    links
}

/// Visible text of an anchor: inner tags stripped, whitespace collapsed.
fn anchor_text(inner: &str) -> String {
    let stripped = TAG.replace_all(inner, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTORY_PAGE: &str = r#"
        <html><body>
        <div id="menu">
          <a class="menurep" href="docs?rep=1">Mathématiques</a>
          <a class="menurep actif" href="docs?rep=7">Physique</a>
          <a class="menuitem" href="agenda">Agenda</a>
        </div>
        <section>
          <p class="rep"><a href="?rep=12"><span class="icon-rep"></span> Chapitre 1</a></p>
          <p class="rep"><a href="docs?rep=13">Chapitre   2</a></p>
          <p class="doc"><a href="download?id=F99">Exam Subject #3 (2024).pdf</a> <span>1 Mo</span></p>
          <p class="doc"><a href="download?id=G4&amp;dl=1">TD 4</a></p>
          <p class="info"><a href="docs?rep=99">not a rep paragraph</a></p>
        </section>
        <span class="icon-deconnexion"></span>
        </body></html>
    "#;

    #[test]
    fn test_menu_links_finds_menurep_anchors_only() {
        let links = menu_links(DIRECTORY_PAGE);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].id, "1");
        assert_eq!(links[0].label, "Mathématiques");
        assert_eq!(links[1].id, "7");
        assert_eq!(links[1].label, "Physique");
    }

    #[test]
    fn test_directory_links_reads_rep_paragraphs_in_order() {
        let links = directory_links(DIRECTORY_PAGE);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].id, "12");
        assert_eq!(links[0].label, "Chapitre 1");
        assert_eq!(links[1].id, "13");
        assert_eq!(links[1].label, "Chapitre 2");
    }

    #[test]
    fn test_directory_links_ignores_other_paragraphs() {
        let links = directory_links(DIRECTORY_PAGE);
        assert!(links.iter().all(|l| l.id != "99"));
    }

    #[test]
    fn test_file_links_reads_doc_paragraphs() {
        let links = file_links(DIRECTORY_PAGE);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].id, "F99");
        assert_eq!(links[0].label, "Exam Subject #3 (2024).pdf");
        assert_eq!(links[1].id, "G4");
        assert_eq!(links[1].label, "TD 4");
    }

    #[test]
    fn test_query_param_takes_value_up_to_separator() {
        assert_eq!(query_param("docs?rep=42", "rep"), Some("42"));
        assert_eq!(query_param("?rep=5&page=2", "rep"), Some("5"));
        assert_eq!(query_param("download?id=AB12#frag", "id"), Some("AB12"));
        assert_eq!(query_param("docs", "rep"), None);
        assert_eq!(query_param("docs?rep=", "rep"), None);
    }

    #[test]
    fn test_is_authenticated_detects_login_form() {
        assert!(!is_authenticated(r#"<a class="icon-connexion">Connexion</a>"#));
        assert!(is_authenticated(
            r#"<a class="icon-connexion"></a><a class="icon-deconnexion"></a>"#
        ));
        assert!(is_authenticated("<html><body>plain page</body></html>"));
    }

    #[test]
    fn test_anchor_text_strips_nested_markup() {
        let html = r#"<p class="rep"><a href="?rep=3"><span class="icon"></span>  Devoirs
            <em>2024</em></a></p>"#;
        let links = directory_links(html);
        assert_eq!(links[0].label, "Devoirs 2024");
    }
}
