use anyhow::{anyhow, Result};
use atom_syndication::Feed;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rss::Channel;

/// How the feed encoded the item's guid. RSS wraps it in a `<guid>`
/// element with attributes, Atom carries a bare `<id>`, and some feeds
/// omit it entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum GuidValue {
    Plain(String),
    Wrapped { value: String },
    #[default]
    Absent,
}

impl GuidValue {
    /// Unwrap whichever shape is present; empty or whitespace-only
    /// values count as absent.
    pub fn resolve(&self) -> Option<&str> {
        let raw = match self {
            GuidValue::Plain(value) => value,
            GuidValue::Wrapped { value } => value,
            GuidValue::Absent => return None,
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() { None } else { Some(trimmed) }
    }
}

/// One feed item, format differences already flattened away. All
/// fields are raw strings straight from the document; normalization
/// happens in the extractor.
#[derive(Debug, Clone, Default)]
pub struct RawItem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub guid: GuidValue,
    pub alt_id: Option<String>,
    pub pub_date: Option<String>,
    pub enclosure_url: Option<String>,
    pub link: Option<String>,
    pub itunes_duration: Option<String>,
}

/// Parse a feed document, RSS 2.0 first, Atom as fallback.
pub fn parse_items(xml: &Bytes) -> Result<Vec<RawItem>> {
    match Channel::read_from(&xml[..]) {
        Ok(channel) => Ok(channel.items().iter().map(rss_item).collect()),
        Err(rss_err) => match Feed::read_from(&xml[..]) {
            Ok(feed) => Ok(feed.entries().iter().map(atom_entry).collect()),
            Err(_) => Err(anyhow!("document is neither RSS nor Atom: {rss_err}")),
        },
    }
}

/// Loose date parsing: RSS favors RFC 2822, Dublin Core and Atom
/// carry RFC 3339.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    None
}

fn rss_item(item: &rss::Item) -> RawItem {
    RawItem {
        title: item.title().map(str::to_string),
        // content:encoded tends to carry the full HTML body; plain
        // description is the fallback
        description: item.content().or(item.description()).map(str::to_string),
        guid: match item.guid() {
            Some(guid) => GuidValue::Wrapped { value: guid.value().to_string() },
            None => GuidValue::Absent,
        },
        alt_id: item
            .dublin_core_ext()
            .and_then(|dc| dc.identifiers().first().cloned()),
        pub_date: item.pub_date().map(str::to_string),
        enclosure_url: item.enclosure().map(|enc| enc.url().to_string()),
        link: item.link().map(str::to_string),
        itunes_duration: item.itunes_ext().and_then(|it| it.duration()).map(str::to_string),
    }
}

fn atom_entry(entry: &atom_syndication::Entry) -> RawItem {
    let links = entry.links();
    let alternate = links
        .iter()
        .find(|l| l.rel() == "alternate")
        .or_else(|| links.first());
    let enclosure = links.iter().find(|l| l.rel() == "enclosure");

    RawItem {
        title: Some(entry.title().to_string()),
        description: entry
            .content()
            .and_then(|c| c.value())
            .map(str::to_string)
            .or_else(|| entry.summary().map(|s| s.to_string())),
        guid: GuidValue::Plain(entry.id().to_string()),
        alt_id: None,
        pub_date: Some(
            entry
                .published()
                .unwrap_or_else(|| entry.updated())
                .to_rfc3339(),
        ),
        enclosure_url: enclosure.map(|l| l.href().to_string()),
        link: alternate.map(|l| l.href().to_string()),
        itunes_duration: None,
    }
}
