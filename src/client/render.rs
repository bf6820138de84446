use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use scraper::{Html, Node};

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "pre", "blockquote", "tr",
];

/// Turn backend-supplied markup into plain text. Tags are dropped, block
/// elements and `<br>` become line breaks, and script/style bodies vanish, so
/// nothing from the backend is ever interpreted as markup.
pub fn plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();

    for node in fragment.root_element().descendants() {
        match node.value() {
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(|parent| parent.value().as_element().map(|el| el.name()))
                    .is_some_and(|name| name == "script" || name == "style");
                if !hidden {
                    out.push_str(text);
                }
            }
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            Node::Element(el) if BLOCK_ELEMENTS.iter().any(|name| *name == el.name()) => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }

    out.trim().to_string()
}

pub fn processing_time(seconds: f64) -> String {
    format!("{:.2} seconds", seconds)
}

/// Local time-of-day for an ISO-8601 timestamp, `None` if it does not parse.
/// Timestamps without an offset are taken as local time.
pub fn clock_time(timestamp: &str) -> Option<String> {
    let local = match DateTime::parse_from_rfc3339(timestamp) {
        Ok(ts) => ts.with_timezone(&Local),
        Err(_) => {
            let naive = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
            Local.from_local_datetime(&naive).earliest()?
        }
    };
    Some(local.format("%H:%M:%S").to_string())
}
