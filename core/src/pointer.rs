#![deny(missing_docs)]

//! # Reference Pointers
//!
//! Turns `$ref` strings into canonical local [`Locator`]s.
//!
//! External documents are never fetched. An absolute or relative reference is
//! still treated as local when its document part matches the current
//! document's `$self` URI.

use percent_encoding::percent_decode_str;
use std::fmt;
use std::path::Path;
use url::Url;

/// A canonical JSON Pointer into the current document.
///
/// Segments are stored decoded, so `#/a~1b` and `#/a%2Fb` name the same target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    segments: Vec<String>,
}

impl Locator {
    /// The document root (`#`).
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parses a `$ref` value into a local locator.
    ///
    /// Returns the reason as `Err` when the reference is external, is not a
    /// JSON Pointer fragment (e.g. a plain-name anchor), or is empty.
    pub fn parse(reference: &str, self_uri: Option<&str>) -> Result<Self, String> {
        let pointer = local_fragment(reference, self_uri)
            .ok_or_else(|| "external documents are not loaded".to_string())?;

        if pointer.is_empty() {
            return Ok(Self::root());
        }
        if !pointer.starts_with('/') {
            return Err(format!(
                "'{}' is not a JSON Pointer fragment (anchors are not supported)",
                pointer
            ));
        }

        let segments = pointer[1..].split('/').map(decode_pointer_segment).collect();
        Ok(Self { segments })
    }

    /// Decoded segments from the root down.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// A short human name for the target: its last segment, or `root`.
    pub fn name(&self) -> &str {
        self.segments
            .last()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("root")
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("#")?;
        for segment in &self.segments {
            write!(f, "/{}", encode_pointer_segment(segment))?;
        }
        Ok(())
    }
}

/// The fragment of `reference` when its document part names the current
/// document; `None` for external references.
fn local_fragment<'r>(reference: &'r str, self_uri: Option<&str>) -> Option<&'r str> {
    let (document, fragment) = reference.split_once('#')?;
    if document.is_empty() {
        return Some(fragment);
    }
    let current = DocumentId::parse(self_uri?);
    DocumentId::parse(document)
        .same_document(&current)
        .then_some(fragment)
}

/// A document identity: an absolute URI or a bare path.
enum DocumentId<'s> {
    Absolute(Url),
    Bare(&'s str),
}

impl<'s> DocumentId<'s> {
    fn parse(raw: &'s str) -> Self {
        match Url::parse(raw) {
            Ok(url) => Self::Absolute(url),
            Err(_) => Self::Bare(raw),
        }
    }

    /// Query and fragment never distinguish documents. A root-relative path
    /// matches any absolute URI with that path.
    fn same_document(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Absolute(a), Self::Absolute(b)) => {
                a.scheme() == b.scheme()
                    && a.host() == b.host()
                    && a.port() == b.port()
                    && a.path() == b.path()
            }
            (Self::Absolute(url), Self::Bare(path)) | (Self::Bare(path), Self::Absolute(url)) => {
                path.starts_with('/') && url.path() == *path
            }
            (Self::Bare(a), Self::Bare(b)) => Path::new(a) == Path::new(b),
        }
    }
}

/// Decodes a JSON Pointer segment taken from a URI fragment.
///
/// Percent-decoding happens first, then `~1` and `~0` unescaping (RFC 6901 §6).
pub(crate) fn decode_pointer_segment(segment: &str) -> String {
    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    decoded.replace("~1", "/").replace("~0", "~")
}

/// Escapes a segment for display inside a pointer.
pub(crate) fn encode_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_pointer() {
        let locator = Locator::parse("#/components/schemas/User", None).unwrap();
        assert_eq!(locator.segments(), ["components", "schemas", "User"]);
        assert_eq!(locator.name(), "User");
        assert_eq!(locator.to_string(), "#/components/schemas/User");
    }

    #[test]
    fn test_parse_root_pointer() {
        let locator = Locator::parse("#", None).unwrap();
        assert_eq!(locator, Locator::root());
        assert_eq!(locator.to_string(), "#");
        assert_eq!(locator.name(), "root");
    }

    #[test]
    fn test_equivalent_spellings_share_locator() {
        let escaped = Locator::parse("#/paths/~1users~1{id}", None).unwrap();
        let percent = Locator::parse("#/paths/%2Fusers%2F%7Bid%7D", None).unwrap();
        assert_eq!(escaped, percent);
        assert_eq!(escaped.segments(), ["paths", "/users/{id}"]);
        assert_eq!(escaped.to_string(), "#/paths/~1users~1{id}");
    }

    #[test]
    fn test_tilde_roundtrip_in_display() {
        let locator = Locator::parse("#/definitions/a~0b", None).unwrap();
        assert_eq!(locator.segments(), ["definitions", "a~b"]);
        assert_eq!(locator.to_string(), "#/definitions/a~0b");
    }

    #[test]
    fn test_external_reference_rejected() {
        let err = Locator::parse("other.yaml#/components/schemas/User", None).unwrap_err();
        assert!(err.contains("external"));
    }

    #[test]
    fn test_anchor_fragment_rejected() {
        let err = Locator::parse("#UserAnchor", None).unwrap_err();
        assert!(err.contains("anchors"));
    }

    #[test]
    fn test_self_uri_makes_absolute_reference_local() {
        let self_uri = Some("https://example.com/openapi.yaml");
        let locator = Locator::parse(
            "https://example.com/openapi.yaml?v=2#/components/schemas/User",
            self_uri,
        )
        .unwrap();
        assert_eq!(locator.segments(), ["components", "schemas", "User"]);
    }

    #[test]
    fn test_root_relative_self_matches_uri_path() {
        let self_uri = Some("/api/openapi.yaml");
        let fragment = local_fragment(
            "https://example.com/api/openapi.yaml#/components/schemas/User",
            self_uri,
        );
        assert_eq!(fragment, Some("/components/schemas/User"));
        assert_eq!(
            local_fragment("/api/openapi.yaml#/paths", Some("https://example.com/api/openapi.yaml")),
            Some("/paths")
        );
    }

    #[test]
    fn test_relative_self_matches_same_path_only() {
        assert_eq!(
            local_fragment("specs/./api.yaml#/a", Some("specs/api.yaml")),
            Some("/a")
        );
        assert_eq!(local_fragment("other.yaml#/a", Some("specs/api.yaml")), None);
    }

    #[test]
    fn test_other_document_stays_external() {
        let self_uri = Some("https://example.com/openapi.yaml");
        assert_eq!(
            local_fragment("https://example.com/shared.yaml#/components/schemas/User", self_uri),
            None
        );
        assert_eq!(
            local_fragment("http://example.com/openapi.yaml#/components", self_uri),
            None
        );
        assert_eq!(local_fragment("openapi.yaml", self_uri), None);
    }
}
