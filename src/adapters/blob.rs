//! Blob container object store over HTTP.
//!
//! Talks to an Azure-style blob container addressed by a container URL that
//! carries its access token in the query string
//! (`https://<account>.blob.core.windows.net/<container>?sv=...&sig=...`).
//!
//! - listing: `GET <container>?restype=container&comp=list&prefix=..&marker=..`
//!   returning an XML enumeration, followed across `NextMarker` pages
//! - fetching: `GET <container>/<path>?<token>`
//! - references: the same URL, handed to the consumer without a request

use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Url;
use tracing::debug;

use super::{ObjectStore, StoreEntry, StoreError};
use crate::domain::channel::SEPARATOR;

/// Upper bound on listing pages followed in one call
const MAX_PAGES: usize = 1000;

/// Object store backed by a remote blob container
pub struct BlobContainerStore {
    /// Container URL without the query string
    base: Url,

    /// Access token query string (without the leading `?`)
    token: Option<String>,

    client: reqwest::Client,
}

impl BlobContainerStore {
    /// Create a store from a container URL (token in the query string)
    pub fn new(container_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut base = Url::parse(container_url)
            .map_err(|e| anyhow::anyhow!("Invalid container URL: {}", e))?;
        let token = base.query().filter(|q| !q.is_empty()).map(str::to_string);
        base.set_query(None);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { base, token, client })
    }

    /// URL of a single blob, token attached
    fn blob_url(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(path.split(SEPARATOR));
        }
        url.set_query(self.token.as_deref());
        url
    }

    /// URL of one listing page
    fn list_url(&self, prefix: Option<&str>, marker: Option<&str>) -> Url {
        let mut url = self.base.clone();
        url.set_query(self.token.as_deref());
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("restype", "container");
            query.append_pair("comp", "list");
            if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
                query.append_pair("prefix", prefix);
            }
            if let Some(marker) = marker {
                query.append_pair("marker", marker);
            }
        }
        url
    }
}

/// One page of a container listing
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Blob names in listing order
    pub names: Vec<String>,

    /// Continuation marker for the next page, if any
    pub next_marker: Option<String>,
}

/// Parse an `EnumerationResults` document.
///
/// Only `Blobs/Blob/Name` and the top-level `NextMarker` are read. Text and
/// CDATA content are concatenated, entity and character references decoded.
pub fn parse_listing(xml: &str) -> Result<ListingPage, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut text = String::new();
    let mut page = ListingPage::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                path.push(e.local_name().as_ref().to_vec());
                text.clear();
            }
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(_) => {
                if is_blob_name(&path) {
                    page.names.push(std::mem::take(&mut text));
                } else if is_next_marker(&path) && !text.is_empty() {
                    page.next_marker = Some(std::mem::take(&mut text));
                }
                path.pop();
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(page)
}

fn ends_with(path: &[Vec<u8>], tail: &[&[u8]]) -> bool {
    path.len() >= tail.len()
        && path[path.len() - tail.len()..]
            .iter()
            .zip(tail)
            .all(|(a, b)| a.as_slice() == *b)
}

fn is_blob_name(path: &[Vec<u8>]) -> bool {
    ends_with(path, &[&b"Blobs"[..], &b"Blob"[..], &b"Name"[..]])
}

fn is_next_marker(path: &[Vec<u8>]) -> bool {
    path.len() == 2 && ends_with(path, &[&b"EnumerationResults"[..], &b"NextMarker"[..]])
}

#[async_trait]
impl ObjectStore for BlobContainerStore {
    fn name(&self) -> &str {
        "blob"
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<StoreEntry>, StoreError> {
        let mut entries = Vec::new();
        let mut marker: Option<String> = None;

        for page in 0..MAX_PAGES {
            let url = self.list_url(prefix, marker.as_deref());
            let response = self
                .client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| StoreError::list(prefix, e))?;

            let body = response.text().await.map_err(|e| StoreError::list(prefix, e))?;
            let listing = parse_listing(&body)
                .map_err(|e| StoreError::list(prefix, format!("malformed listing: {}", e)))?;
            debug!(page, count = listing.names.len(), "Listed blob page");

            entries.extend(listing.names.into_iter().map(StoreEntry::new));

            match listing.next_marker {
                Some(next) => marker = Some(next),
                None => return Ok(entries),
            }
        }

        Err(StoreError::list(
            prefix,
            format!("listing exceeded {} pages", MAX_PAGES),
        ))
    }

    async fn fetch_text(&self, path: &str) -> Result<String, StoreError> {
        let response = self
            .client
            .get(self.blob_url(path))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| StoreError::fetch(path, e))?;

        response.text().await.map_err(|e| StoreError::fetch(path, e))
    }

    fn fetch_ref(&self, path: &str) -> String {
        self.blob_url(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTAINER: &str = "https://acct.blob.core.windows.net/lessons?sv=2024-11-04&sig=abc%3D";

    fn store() -> BlobContainerStore {
        BlobContainerStore::new(CONTAINER, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_blob_url_keeps_token() {
        let url = store().fetch_ref("docA/audio.mp3");
        assert_eq!(
            url,
            "https://acct.blob.core.windows.net/lessons/docA/audio.mp3?sv=2024-11-04&sig=abc%3D"
        );
    }

    #[test]
    fn test_blob_url_encodes_segments() {
        let url = store().fetch_ref("my doc/image 1.png");
        assert!(url.contains("/lessons/my%20doc/image%201.png?"));
    }

    #[test]
    fn test_list_url() {
        let url = store().list_url(Some("docA/"), Some("m1")).to_string();
        assert!(url.starts_with("https://acct.blob.core.windows.net/lessons?sv=2024-11-04"));
        assert!(url.contains("restype=container"));
        assert!(url.contains("comp=list"));
        assert!(url.contains("prefix=docA%2F"));
        assert!(url.contains("marker=m1"));
    }

    #[test]
    fn test_parse_listing() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ContainerName="lessons">
  <Blobs>
    <Blob><Name>docA/original-text.txt</Name><Properties/></Blob>
    <Blob>
      <Name>docA/Q&amp;A image.png</Name>
    </Blob>
  </Blobs>
  <NextMarker>page-2</NextMarker>
</EnumerationResults>"#;

        let page = parse_listing(xml).unwrap();
        assert_eq!(page.names, vec!["docA/original-text.txt", "docA/Q&A image.png"]);
        assert_eq!(page.next_marker.as_deref(), Some("page-2"));

        let page = parse_listing("<EnumerationResults><NextMarker /></EnumerationResults>").unwrap();
        assert!(page.next_marker.is_none());
    }

    #[test]
    fn test_parse_listing_references_and_cdata() {
        let xml = r#"<EnumerationResults>
  <Blobs>
    <Blob Deleted="false"><Name>docA/Q&#38;A image.png</Name></Blob>
    <Blob><Name><![CDATA[docB/original-text.txt]]></Name></Blob>
    <BlobPrefix><Name>ignored/</Name></BlobPrefix>
  </Blobs>
  <NextMarker></NextMarker>
</EnumerationResults>"#;

        let page = parse_listing(xml).unwrap();
        assert_eq!(
            page.names,
            vec!["docA/Q&A image.png", "docB/original-text.txt"]
        );
        assert!(page.next_marker.is_none());
    }

    #[test]
    fn test_parse_listing_rejects_malformed_xml() {
        assert!(parse_listing("<EnumerationResults><Blobs></Blob></EnumerationResults>").is_err());
    }

    #[test]
    fn test_invalid_container_url() {
        assert!(BlobContainerStore::new("not a url", Duration::from_secs(1)).is_err());
    }
}
