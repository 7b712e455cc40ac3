use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use url::Url;
use uuid::Uuid;

use super::parse::{self, RawItem};

/// Candidates shorter than this (after trimming) are junk, not ids.
const MIN_GUID_LEN: usize = 3;

const SLUG_MAX: usize = 32;

const BLURB_TRUNCATE_AT: usize = 200;

/// Hosts that are document shares even when the link text says nothing.
const DOC_HOSTS: &[&str] = &["drive.google.com", "docs.google.com", "dropbox.com"];

const EPISODE_PATH_MARKERS: &[&str] = &["episodes", "episode"];

/// A feed item normalized for persistence. `degenerate_guid` marks an
/// identity that came from the random last resort and must not be
/// written.
#[derive(Debug, Clone)]
pub struct NormalizedEpisode {
    pub guid: String,
    pub degenerate_guid: bool,
    pub title: String,
    pub description: Option<String>,
    pub blurb: Option<String>,
    pub audio_url: Option<String>,
    pub source_doc: Option<String>,
    pub pub_date: DateTime<Utc>,
    pub duration: Option<String>,
    pub link: Option<String>,
}

pub fn extract_episode(item: &RawItem) -> NormalizedEpisode {
    let (guid, degenerate_guid) = resolve_guid(item);
    let description = item.description.clone();
    let blurb = description.as_deref().and_then(extract_blurb);
    let source_doc = description.as_deref().and_then(extract_source_doc);
    let audio_url = item
        .enclosure_url
        .clone()
        .filter(|u| !u.trim().is_empty())
        .or_else(|| item.link.clone().filter(|u| !u.trim().is_empty()));
    let pub_date = item
        .pub_date
        .as_deref()
        .and_then(parse::parse_date)
        .unwrap_or_else(Utc::now);

    NormalizedEpisode {
        guid,
        degenerate_guid,
        title: item.title.clone().unwrap_or_default(),
        description,
        blurb,
        audio_url,
        source_doc,
        pub_date,
        duration: item.itunes_duration.clone(),
        link: item.link.clone(),
    }
}

type GuidStrategy = fn(&RawItem) -> Option<String>;

/// Identity chain, most trustworthy first. Each entry is a pure
/// function so the pieces stay independently testable.
const GUID_STRATEGIES: &[GuidStrategy] = &[
    guid_from_field,
    guid_from_alt_id,
    guid_from_link,
    guid_from_episode_slug,
    guid_from_title_date,
];

/// Walk the strategy chain; the first candidate of usable length wins.
/// Returns `(guid, degenerate)` where degenerate means a random token
/// that cannot deduplicate the item on the next sync.
pub fn resolve_guid(item: &RawItem) -> (String, bool) {
    for strategy in GUID_STRATEGIES {
        if let Some(candidate) = strategy(item) {
            let candidate = candidate.trim().to_string();
            if candidate.len() >= MIN_GUID_LEN {
                return (candidate, false);
            }
        }
    }
    (Uuid::new_v4().simple().to_string(), true)
}

fn guid_from_field(item: &RawItem) -> Option<String> {
    item.guid.resolve().map(str::to_string)
}

fn guid_from_alt_id(item: &RawItem) -> Option<String> {
    item.alt_id.clone().filter(|id| !id.trim().is_empty())
}

fn guid_from_link(item: &RawItem) -> Option<String> {
    item.link.clone().filter(|link| !link.trim().is_empty())
}

/// Slug of an `/episodes/<slug>` style page URL.
fn guid_from_episode_slug(item: &RawItem) -> Option<String> {
    let link = item.link.as_deref()?;
    let url = Url::parse(link).ok()?;
    let mut segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    let slug = segments.pop()?;
    let marker = segments.last()?.to_ascii_lowercase();
    if EPISODE_PATH_MARKERS.contains(&marker.as_str()) {
        Some(slug.to_string())
    } else {
        None
    }
}

fn guid_from_title_date(item: &RawItem) -> Option<String> {
    let published = item.pub_date.as_deref().and_then(parse::parse_date);
    synthetic_key(item.title.as_deref(), published)
}

/// Deterministic fallback identity: title slug plus a base-36 publish
/// timestamp. Either half may be missing; both missing yields nothing.
/// The timestamp half is only present when the feed supplied a real,
/// parsable date, otherwise repeated syncs would disagree.
pub fn synthetic_key(title: Option<&str>, published: Option<DateTime<Utc>>) -> Option<String> {
    let slug = title.map(slugify).unwrap_or_default();
    let stamp = published
        .map(|dt| base36(dt.timestamp_millis()))
        .unwrap_or_default();
    match (slug.is_empty(), stamp.is_empty()) {
        (true, true) => None,
        (false, true) => Some(slug),
        (true, false) => Some(stamp),
        (false, false) => Some(format!("{slug}-{stamp}")),
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.chars()
        .take(SLUG_MAX)
        .collect::<String>()
        .trim_end_matches('-')
        .to_string()
}

fn base36(n: i64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let negative = n < 0;
    let mut value = n.unsigned_abs();
    let mut buf: Vec<char> = Vec::new();
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize] as char);
        value /= 36;
    }
    if negative {
        buf.push('-');
    }
    buf.iter().rev().collect()
}

/// Derive a short plain-text teaser from the item's HTML description.
/// Prefers the first sentence when its length is reasonable, otherwise
/// truncates, otherwise returns the whole cleaned text.
pub fn extract_blurb(description: &str) -> Option<String> {
    let text = clean_text(description);
    if text.is_empty() {
        return None;
    }

    let first = first_sentence(&text);
    let sentence_len = first.chars().count();
    if sentence_len > 20 && sentence_len < 300 {
        return Some(first.trim_end().to_string());
    }

    if text.chars().count() > BLURB_TRUNCATE_AT {
        let cut: String = text.chars().take(BLURB_TRUNCATE_AT).collect();
        return Some(format!("{}...", cut.trim_end()));
    }

    Some(text)
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("static pattern"))
}

fn clean_text(html: &str) -> String {
    let stripped = tag_re().replace_all(html, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    collapse_whitespace(&decoded)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text up to (not including) the first sentence terminator that is
/// followed by whitespace; the whole text when there is none.
fn first_sentence(text: &str) -> &str {
    let mut iter = text.char_indices().peekable();
    while let Some((idx, ch)) = iter.next() {
        if matches!(ch, '.' | '!' | '?') {
            if let Some((_, next)) = iter.peek().copied() {
                if next.is_whitespace() {
                    return &text[..idx];
                }
            }
        }
    }
    text
}

/// Find a source-document link inside the description HTML. Three
/// passes over the anchors, in order of confidence: link text naming a
/// source sheet, href keywords, then known document hosts.
pub fn extract_source_doc(description: &str) -> Option<String> {
    let doc = Html::parse_fragment(description);
    let selector = Selector::parse("a").ok()?;

    let mut anchors: Vec<(String, String)> = Vec::new();
    for anchor in doc.select(&selector) {
        let Some(href) = anchor.value().attr("href") else { continue };
        let href = href.trim();
        if href.is_empty() {
            continue;
        }
        let text = anchor.text().collect::<String>();
        anchors.push((href.to_string(), text));
    }

    for (href, text) in &anchors {
        if mentions_source_sheet(text) {
            return Some(normalize_doc_url(href));
        }
    }
    for (href, _) in &anchors {
        let lower = href.to_lowercase();
        if lower.contains("source") || lower.contains("sheet") {
            return Some(normalize_doc_url(href));
        }
    }
    for (href, _) in &anchors {
        let lower = href.to_lowercase();
        if DOC_HOSTS.iter().any(|host| lower.contains(host)) {
            return Some(normalize_doc_url(href));
        }
    }
    None
}

/// "source sheet" with any (or no) whitespace between the words.
fn mentions_source_sheet(text: &str) -> bool {
    let squashed: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    squashed.contains("sourcesheet")
}

/// Feeds sometimes carry bare `host/path` references. Give those an
/// https scheme; leave anything already schemed or site-relative alone.
fn normalize_doc_url(href: &str) -> String {
    if href.contains("://") {
        return href.to_string();
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{rest}");
    }
    if href.starts_with('/') {
        return href.to_string();
    }
    format!("https://{href}")
}
