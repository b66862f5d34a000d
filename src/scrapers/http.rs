//! Plain HTTP snapshot fetcher.
//!
//! Downloads listing pages with `reqwest` and flattens them to line-oriented
//! text with `scraper`. Links keep their absolute target in parentheses and
//! `<time datetime>` values are kept in brackets, so the extractor still sees
//! the URLs and explicit date attributes it needs.
//!
//! Static HTML cannot grow, so a scroll re-reads the current document. A
//! click is emulated by following the `href` of the matched element.

use super::SnapshotFetcher;
use crate::models::{NavigationAction, Snapshot};
use scraper::{ElementRef, Html, Node, Selector};
use std::error::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

const SKIPPED: &[&str] = &["script", "style", "noscript", "svg", "template", "iframe", "head"];

const BLOCKS: &[&str] = &[
    "article", "aside", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hr", "li", "main", "nav", "ol", "p", "section", "table", "td", "th", "tr",
    "ul",
];

/// The page currently open in a [`HttpSnapshotFetcher`].
#[derive(Debug)]
struct PageSession {
    url: Url,
    html: String,
}

/// Fetches pages over HTTP; one instance per discovery run.
#[derive(Debug)]
pub struct HttpSnapshotFetcher {
    client: reqwest::Client,
    session: Option<PageSession>,
}

impl HttpSnapshotFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            session: None,
        }
    }

    /// Load `url` fresh, replacing the session.
    #[instrument(level = "info", skip(self))]
    async fn load(&mut self, url: &str) -> Result<Snapshot, Box<dyn Error>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let final_url = response.url().clone();
        let html = response.text().await?;

        let text = page_text(&html, &final_url);
        info!(bytes = html.len(), text_bytes = text.len(), resolved = %final_url, "Fetched page");

        let snapshot = Snapshot {
            success: true,
            text,
            resolved_url: final_url.to_string(),
        };
        self.session = Some(PageSession {
            url: final_url,
            html,
        });
        Ok(snapshot)
    }

    /// Follow the link behind `selector` on the current page.
    async fn click(&mut self, selector: &str) -> Result<Snapshot, Box<dyn Error>> {
        let Some(session) = &self.session else {
            return Err("click requested without an open page".into());
        };

        let target = match link_target(&session.html, &session.url, selector)? {
            Some(target) => target,
            None => {
                warn!(%selector, page = %session.url, "Click target has no link to follow");
                return Ok(Snapshot::failed(session.url.as_str()));
            }
        };
        debug!(%selector, %target, "Following click target");
        self.load(target.as_str()).await
    }
}

impl SnapshotFetcher for HttpSnapshotFetcher {
    #[instrument(level = "info", skip(self))]
    async fn observe(
        &mut self,
        url: &str,
        action: Option<&NavigationAction>,
        reuse_session: bool,
    ) -> Result<Snapshot, Box<dyn Error>> {
        if !reuse_session || self.session.is_none() {
            return self.load(url).await;
        }

        match action {
            None => self.load(url).await,
            Some(NavigationAction::Scroll) => {
                let session = self.session.as_ref().ok_or("scroll requested without an open page")?;
                Ok(Snapshot {
                    success: true,
                    text: page_text(&session.html, &session.url),
                    resolved_url: session.url.to_string(),
                })
            }
            Some(NavigationAction::Click { selector }) => self.click(selector).await,
        }
    }
}

/// Resolve the link behind the first element matching `selector`.
///
/// The element's own `href` wins; otherwise the first descendant link is used.
fn link_target(html: &str, base: &Url, selector: &str) -> Result<Option<Url>, Box<dyn Error>> {
    let selector = Selector::parse(selector).map_err(|e| format!("invalid selector {selector:?}: {e}"))?;
    let links = Selector::parse("a[href]").map_err(|e| e.to_string())?;
    let document = Html::parse_document(html);

    let Some(element) = document.select(&selector).next() else {
        return Ok(None);
    };
    let href = element
        .value()
        .attr("href")
        .or_else(|| element.select(&links).next().and_then(|a| a.value().attr("href")));

    Ok(href.and_then(|h| base.join(h).ok()))
}

/// Flatten an HTML document to text, one block element per line.
pub fn page_text(html: &str, base: &Url) -> String {
    let document = Html::parse_document(html);
    let root = Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());

    let mut lines = Vec::new();
    let mut line = String::new();
    render(root, base, &mut lines, &mut line);
    flush(&mut lines, &mut line);
    lines.join("\n")
}

fn render(element: ElementRef, base: &Url, lines: &mut Vec<String>, line: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                for word in text.split_whitespace() {
                    if !line.is_empty() {
                        line.push(' ');
                    }
                    line.push_str(word);
                }
            }
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED.contains(&name) {
                    continue;
                }
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCKS.contains(&name);
                if block {
                    flush(lines, line);
                }
                render(child_ref, base, lines, line);
                match name {
                    "a" => {
                        if let Some(href) = el.attr("href").and_then(|h| base.join(h).ok()) {
                            line.push_str(&format!(" ({href})"));
                        }
                    }
                    "time" => {
                        if let Some(datetime) = el.attr("datetime") {
                            line.push_str(&format!(" [datetime={datetime}]"));
                        }
                    }
                    _ => {}
                }
                if block {
                    flush(lines, line);
                }
            }
            _ => {}
        }
    }
}

fn flush(lines: &mut Vec<String>, line: &mut String) {
    let trimmed = line.trim();
    if !trimmed.is_empty() {
        lines.push(trimmed.to_string());
    }
    line.clear();
}
