//! RSS and Atom documents built from a bucket listing

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;

use crate::error::{Error, Result};
use crate::traits::ListingEntry;
use crate::xml::{self, Element};

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// Media type placed on every RSS enclosure
pub const ENCLOSURE_TYPE: &str = "audio/mpeg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeedFormat::Rss => "rss",
            FeedFormat::Atom => "atom",
        })
    }
}

impl FromStr for FeedFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rss" => Ok(FeedFormat::Rss),
            "atom" => Ok(FeedFormat::Atom),
            _ => Err(Error::InvalidArgument(format!("unknown feed format '{s}'"))),
        }
    }
}

/// Canonical URL of a bucket
pub fn bucket_url(host: &str, bucket: &str) -> String {
    format!("http://{host}/{bucket}")
}

/// Canonical URL of an item
pub fn item_url(host: &str, bucket: &str, key: &str) -> String {
    format!("http://{host}/{bucket}/{key}")
}

/// Build a feed document for `entries`.
///
/// The output depends only on the arguments; `now` is stamped on the channel
/// and on every item.
pub fn build_feed(
    format: FeedFormat,
    host: &str,
    bucket: &str,
    entries: &[ListingEntry],
    now: Timestamp,
) -> Result<String> {
    let root = match format {
        FeedFormat::Rss => rss(host, bucket, entries, now),
        FeedFormat::Atom => atom(host, bucket, entries, now),
    };
    xml::to_document(&root)
}

fn rss_date(ts: Timestamp) -> String {
    ts.strftime("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn rss(host: &str, bucket: &str, entries: &[ListingEntry], now: Timestamp) -> Element {
    let link = bucket_url(host, bucket);
    let title = format!("Contents of bucket {link}");
    let date = rss_date(now);

    let mut channel = Element::new("channel")
        .text_child("title", &title)
        .text_child("link", &link)
        .text_child("description", &title)
        .text_child("language", "en")
        .text_child("pubDate", &date);

    for entry in entries {
        let url = item_url(host, bucket, &entry.key);
        channel.push(
            Element::new("item")
                .text_child("title", format!("Item {url}"))
                .text_child("link", &url)
                .text_child("description", format!("Item {url}"))
                .text_child("pubDate", &date)
                .text_child("guid", &url)
                .text_child("comments", format!("{url}?torrent"))
                .child(
                    Element::new("enclosure")
                        .attr("url", &url)
                        .attr("length", entry.size_bytes.to_string())
                        .attr("type", ENCLOSURE_TYPE),
                ),
        );
    }

    Element::new("rss").attr("version", "2.0").child(channel)
}

fn atom(host: &str, bucket: &str, entries: &[ListingEntry], now: Timestamp) -> Element {
    let link = bucket_url(host, bucket);
    let title = format!("Contents of bucket {link}");
    let updated = now.to_string();

    let mut feed = Element::new("feed")
        .attr("xmlns", ATOM_NAMESPACE)
        .text_child("title", &title)
        .text_child("subtitle", &title)
        .text_child("id", &link)
        .text_child("updated", &updated)
        .child(Element::new("author").text_child("name", host))
        .child(Element::new("link").attr("href", &link));

    for entry in entries {
        let url = item_url(host, bucket, &entry.key);
        feed.push(
            Element::new("entry")
                .text_child("title", format!("Item {url}"))
                .text_child("id", &url)
                .text_child("updated", &updated)
                .text_child("summary", format!("Item {url} ({} bytes)", entry.size_bytes))
                .child(Element::new("link").attr("rel", "alternate").attr("href", &url))
                .child(
                    Element::new("link")
                        .attr("rel", "related")
                        .attr("href", format!("{url}?torrent")),
                ),
        );
    }

    feed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Timestamp {
        "2024-03-05T07:08:09Z".parse().unwrap()
    }

    fn entries() -> Vec<ListingEntry> {
        vec![ListingEntry::new("song.mp3", 4096), ListingEntry::new("a&b", 1)]
    }

    #[test]
    fn test_rss_items() {
        let doc = build_feed(FeedFormat::Rss, "s3.example.com", "music", &entries(), now()).unwrap();
        assert!(doc.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel>"#));
        assert!(doc.contains("<title>Contents of bucket http://s3.example.com/music</title>"));
        assert!(doc.contains("<pubDate>Tue, 05 Mar 2024 07:08:09 GMT</pubDate>"));
        assert!(doc.contains("<language>en</language>"));
        assert!(doc.contains(
            r#"<enclosure url="http://s3.example.com/music/song.mp3" length="4096" type="audio/mpeg"/>"#
        ));
        assert!(doc.contains("<comments>http://s3.example.com/music/song.mp3?torrent</comments>"));
        assert!(doc.contains("<guid>http://s3.example.com/music/a&amp;b</guid>"));
        assert_eq!(doc.matches("<item>").count(), 2);
    }

    #[test]
    fn test_atom_entries() {
        let doc = build_feed(FeedFormat::Atom, "h", "b", &entries(), now()).unwrap();
        assert!(doc.contains(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#));
        assert!(doc.contains("<updated>2024-03-05T07:08:09Z</updated>"));
        assert!(doc.contains(r#"<link rel="alternate" href="http://h/b/song.mp3"/>"#));
        assert!(doc.contains(r#"<link rel="related" href="http://h/b/song.mp3?torrent"/>"#));
        assert!(doc.contains("<author><name>h</name></author>"));
        assert_eq!(doc.matches("<entry>").count(), 2);
    }

    #[test]
    fn test_empty_listing_still_has_channel() {
        let doc = build_feed(FeedFormat::Rss, "h", "b", &[], now()).unwrap();
        assert!(doc.contains("<channel>"));
        assert!(!doc.contains("<item>"));
    }

    #[test]
    fn test_output_is_deterministic_for_fixed_time() {
        let a = build_feed(FeedFormat::Atom, "h", "b", &entries(), now()).unwrap();
        let b = build_feed(FeedFormat::Atom, "h", "b", &entries(), now()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("rss".parse::<FeedFormat>().unwrap(), FeedFormat::Rss);
        assert!("json".parse::<FeedFormat>().is_err());
    }
}
