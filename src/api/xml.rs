//! Parsers for storage service XML responses.
//!
//! List responses use `CommonPrefixes` for folder entries and `Contents` /
//! `Version` for file entries; version-history responses additionally carry
//! `DeleteMarker` entries. Parsing extracts tags with regular expressions
//! rather than a full XML tree, which is all these flat, well-known response
//! shapes need.

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::{FailedKey, Result, S3Error};

/// One object from a current-state listing.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    /// Object key.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modified timestamp.
    pub last_modified: Option<DateTime<Utc>>,
    /// Entity tag (MD5 for single-part uploads), quotes stripped.
    pub etag: Option<String>,
}

/// One page of a current-state listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Common prefixes (emulated folders).
    pub common_prefixes: Vec<String>,
    /// Object entries.
    pub objects: Vec<ObjectSummary>,
    /// Continuation token for the next page, if truncated.
    pub next_token: Option<String>,
}

/// One version record from a version-history listing.
#[derive(Debug, Clone)]
pub struct VersionRecord {
    /// Object key.
    pub key: String,
    /// Version identifier.
    pub version_id: String,
    /// Last modified timestamp.
    pub last_modified: Option<DateTime<Utc>>,
    /// Whether the provider marks this as the key's latest version.
    pub is_latest: bool,
    /// Whether this record is a delete marker.
    pub delete_marker: bool,
}

/// One page of a version-history listing.
#[derive(Debug, Clone, Default)]
pub struct VersionPage {
    /// Common prefixes (emulated folders).
    pub common_prefixes: Vec<String>,
    /// Version and delete-marker records. Callers group these per key and
    /// order them by timestamp; page order is not meaningful.
    pub records: Vec<VersionRecord>,
    /// Key marker for the next page, if truncated.
    pub next_key_marker: Option<String>,
    /// Version-id marker for the next page, if truncated.
    pub next_version_id_marker: Option<String>,
}

/// One acknowledged part from a multipart parts listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSummary {
    /// Part number, 1-based.
    pub part_number: u32,
    /// Entity tag the provider recorded for the part, quotes stripped.
    pub etag: String,
    /// Part size in bytes.
    pub size: u64,
}

/// One in-flight multipart upload from an uploads listing.
#[derive(Debug, Clone)]
pub struct UploadSummary {
    /// Destination key.
    pub key: String,
    /// Provider-assigned upload id.
    pub upload_id: String,
}

/// Extract the text content of the first occurrence of `tag`.
pub fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let pattern = format!(r"<{}[^>]*>([^<]*)</{}>", tag, tag);
    let re = Regex::new(&pattern).ok()?;
    let text = re.captures(xml)?.get(1)?.as_str().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(unescape(&text))
    }
}

/// Escape a key name for inclusion in an XML request body.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Undo the XML escaping the provider applies to key names.
fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn block_regex(tag: &str) -> Result<Regex> {
    Regex::new(&format!(r"(?s)<{}>(.*?)</{}>", tag, tag))
        .map_err(|e| S3Error::Parse(e.to_string()))
}

fn parse_timestamp(block: &str) -> Option<DateTime<Utc>> {
    extract_tag(block, "LastModified")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_common_prefixes(xml: &str) -> Result<Vec<String>> {
    let re = block_regex("CommonPrefixes")?;
    Ok(re
        .captures_iter(xml)
        .filter_map(|cap| extract_tag(cap.get(1)?.as_str(), "Prefix"))
        .collect())
}

/// Parse one page of a ListObjectsV2 response.
pub fn parse_list_page(xml: &str) -> Result<ListPage> {
    let mut page = ListPage {
        common_prefixes: parse_common_prefixes(xml)?,
        ..Default::default()
    };

    let contents_re = block_regex("Contents")?;
    for cap in contents_re.captures_iter(xml) {
        let block = match cap.get(1) {
            Some(m) => m.as_str(),
            None => continue,
        };
        let key = match extract_tag(block, "Key") {
            Some(k) => k,
            None => continue,
        };
        page.objects.push(ObjectSummary {
            key,
            size: extract_tag(block, "Size")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            last_modified: parse_timestamp(block),
            etag: extract_tag(block, "ETag").map(|s| s.trim_matches('"').to_string()),
        });
    }

    if extract_tag(xml, "IsTruncated").as_deref() == Some("true") {
        page.next_token = extract_tag(xml, "NextContinuationToken");
    }

    Ok(page)
}

/// Parse one page of a version-history (`?versions`) response.
///
/// `Version` and `DeleteMarker` blocks are both surfaced as records; the
/// caller groups them per key and orders them by timestamp.
pub fn parse_version_page(xml: &str) -> Result<VersionPage> {
    let mut page = VersionPage {
        common_prefixes: parse_common_prefixes(xml)?,
        ..Default::default()
    };

    for (tag, delete_marker) in [("Version", false), ("DeleteMarker", true)] {
        let re = block_regex(tag)?;
        for cap in re.captures_iter(xml) {
            let block = match cap.get(1) {
                Some(m) => m.as_str(),
                None => continue,
            };
            let key = match extract_tag(block, "Key") {
                Some(k) => k,
                None => continue,
            };
            page.records.push(VersionRecord {
                key,
                version_id: extract_tag(block, "VersionId").unwrap_or_default(),
                last_modified: parse_timestamp(block),
                is_latest: extract_tag(block, "IsLatest").as_deref() == Some("true"),
                delete_marker,
            });
        }
    }

    if extract_tag(xml, "IsTruncated").as_deref() == Some("true") {
        page.next_key_marker = extract_tag(xml, "NextKeyMarker");
        page.next_version_id_marker = extract_tag(xml, "NextVersionIdMarker");
    }

    Ok(page)
}

/// Parse a bulk-delete response into the keys that failed.
pub fn parse_delete_result(xml: &str) -> Result<Vec<FailedKey>> {
    let re = block_regex("Error")?;
    Ok(re
        .captures_iter(xml)
        .filter_map(|cap| {
            let block = cap.get(1)?.as_str();
            Some(FailedKey {
                key: extract_tag(block, "Key")?,
                message: extract_tag(block, "Message")
                    .or_else(|| extract_tag(block, "Code"))
                    .unwrap_or_else(|| "delete failed".to_string()),
            })
        })
        .collect())
}

/// Parse the upload id from an initiate-multipart response.
pub fn parse_initiate_upload(xml: &str) -> Result<String> {
    extract_tag(xml, "UploadId")
        .ok_or_else(|| S3Error::Parse("initiate response missing UploadId".to_string()))
}

/// Parse a parts listing into acknowledged part records.
pub fn parse_list_parts(xml: &str) -> Result<Vec<PartSummary>> {
    let re = block_regex("Part")?;
    let mut parts: Vec<PartSummary> = re
        .captures_iter(xml)
        .filter_map(|cap| {
            let block = cap.get(1)?.as_str();
            Some(PartSummary {
                part_number: extract_tag(block, "PartNumber")?.parse().ok()?,
                etag: extract_tag(block, "ETag")?.trim_matches('"').to_string(),
                size: extract_tag(block, "Size").and_then(|s| s.parse().ok())?,
            })
        })
        .collect();
    parts.sort_by_key(|p| p.part_number);
    Ok(parts)
}

/// Parse an in-flight multipart uploads listing.
pub fn parse_list_uploads(xml: &str) -> Result<Vec<UploadSummary>> {
    let re = block_regex("Upload")?;
    Ok(re
        .captures_iter(xml)
        .filter_map(|cap| {
            let block = cap.get(1)?.as_str();
            Some(UploadSummary {
                key: extract_tag(block, "Key")?,
                upload_id: extract_tag(block, "UploadId")?,
            })
        })
        .collect())
}

/// Parse a bucket versioning configuration response.
pub fn parse_versioning_status(xml: &str) -> bool {
    extract_tag(xml, "Status").as_deref() == Some("Enabled")
}
