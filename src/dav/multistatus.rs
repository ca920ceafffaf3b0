//! Multistatus documents and per-resource outcomes.
//!
//! # Responsibilities
//! - Model one outcome per target resource (status, propstats, error
//!   condition) and the ordered batch reply around them
//! - Decode RFC 4918 multistatus documents, including structured `<error>`
//!   conditions and status lines
//! - Encode batch replies for PROPFIND/REPORT responses
//!
//! # Design Decisions
//! - Response order is insertion order; it mirrors request processing order
//!   and is preserved through decode and encode
//! - The first recognized error condition wins; unrecognized conditions are
//!   tolerated and ignored
//! - A malformed document is a decode failure, never an empty result

use axum::http::StatusCode;
use quick_xml::events::Event;
use quick_xml::reader::NsReader;
use thiserror::Error;

use crate::dav::element::{dav, names, resolved_ns, Child, Element, QName, NS_DAV};
use crate::dav::error::DavError;

/// An HTTP status carried in a DAV status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub StatusCode);

impl Status {
    /// Parse a status line such as `HTTP/1.1 423 Locked`.
    pub fn parse(text: &str) -> Result<Self, DavError> {
        let mut parts = text.split_whitespace();
        let proto = parts.next().unwrap_or_default();
        if !proto.starts_with("HTTP/") {
            return Err(DavError::Decode(format!("bad status line {text:?}")));
        }
        parts
            .next()
            .and_then(|c| c.parse::<u16>().ok())
            .and_then(|c| StatusCode::from_u16(c).ok())
            .map(Self)
            .ok_or_else(|| DavError::Decode(format!("bad status line {text:?}")))
    }

    /// Canonical status line for encoding.
    pub fn line(&self) -> String {
        match self.0.canonical_reason() {
            Some(reason) => format!("HTTP/1.1 {} {}", self.0.as_u16(), reason),
            None => format!("HTTP/1.1 {}", self.0.as_u16()),
        }
    }
}

impl From<StatusCode> for Status {
    fn from(code: StatusCode) -> Self {
        Self(code)
    }
}

/// Machine-checkable error conditions from RFC 4918 §16.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    LockTokenMatchesRequestUri,
    LockTokenSubmitted,
    NoConflictingLock,
    NoExternalEntities,
    PreservedLiveProperties,
    PropfindFiniteDepth,
    CannotModifyProtectedProperty,
}

impl Condition {
    pub fn from_xml(ns: &[u8], local: &[u8]) -> Option<Self> {
        if ns != NS_DAV.as_bytes() {
            return None;
        }
        match local {
            b"lock-token-matches-request-uri" => Some(Self::LockTokenMatchesRequestUri),
            b"lock-token-submitted" => Some(Self::LockTokenSubmitted),
            b"no-conflicting-lock" => Some(Self::NoConflictingLock),
            b"no-external-entities" => Some(Self::NoExternalEntities),
            b"preserved-live-properties" => Some(Self::PreservedLiveProperties),
            b"propfind-finite-depth" => Some(Self::PropfindFiniteDepth),
            b"cannot-modify-protected-property" => Some(Self::CannotModifyProtectedProperty),
            _ => None,
        }
    }

    pub fn name(&self) -> QName {
        match self {
            Self::LockTokenMatchesRequestUri => dav("lock-token-matches-request-uri"),
            Self::LockTokenSubmitted => dav("lock-token-submitted"),
            Self::NoConflictingLock => dav("no-conflicting-lock"),
            Self::NoExternalEntities => dav("no-external-entities"),
            Self::PreservedLiveProperties => dav("preserved-live-properties"),
            Self::PropfindFiniteDepth => dav("propfind-finite-depth"),
            Self::CannotModifyProtectedProperty => dav("cannot-modify-protected-property"),
        }
    }
}

/// A machine-checkable failure: status code plus optional condition.
///
/// Distinct from display messages; clients branch on the condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{status}")]
pub struct StructuredError {
    pub status: StatusCode,
    pub condition: Option<Condition>,
}

/// Properties grouped under one status inside a response.
#[derive(Debug, Clone, PartialEq)]
pub struct PropStat {
    pub prop: Vec<Element>,
    pub status: Status,
}

impl PropStat {
    pub fn ok(prop: Vec<Element>) -> Self {
        Self {
            prop,
            status: Status(StatusCode::OK),
        }
    }

    pub fn not_found(prop: Vec<Element>) -> Self {
        Self {
            prop,
            status: Status(StatusCode::NOT_FOUND),
        }
    }

    fn to_element(&self) -> Element {
        Element::with_children(
            names::PROPSTAT,
            vec![
                Child::Element(Element::with_children(
                    names::PROP,
                    self.prop.iter().cloned().map(Child::Element).collect(),
                )),
                Child::Element(Element::text(names::STATUS, self.status.line())),
            ],
        )
    }
}

/// One outcome within a multistatus reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEntry {
    pub href: String,
    pub status: Option<Status>,
    pub propstats: Vec<PropStat>,
    pub error: Option<Condition>,
}

impl ResponseEntry {
    pub fn with_status(href: impl Into<String>, status: StatusCode) -> Self {
        Self {
            href: href.into(),
            status: Some(Status(status)),
            propstats: Vec::new(),
            error: None,
        }
    }

    pub fn with_propstats(href: impl Into<String>, propstats: Vec<PropStat>) -> Self {
        Self {
            href: href.into(),
            status: None,
            propstats,
            error: None,
        }
    }

    /// Success, or the structured error this entry reports.
    ///
    /// A propstat-style entry without a status line is a success at the
    /// resource level; per-property failures live in its propstats.
    pub fn outcome(&self) -> Result<(), StructuredError> {
        match self.status {
            Some(Status(code)) if code.is_success() => Ok(()),
            Some(Status(code)) => Err(StructuredError {
                status: code,
                condition: self.error,
            }),
            None => Ok(()),
        }
    }

    fn to_element(&self) -> Element {
        let mut children: Vec<Child> =
            vec![Child::Element(Element::text(names::HREF, &self.href))];
        for propstat in &self.propstats {
            children.push(Child::Element(propstat.to_element()));
        }
        if let Some(status) = self.status {
            children.push(Child::Element(Element::text(names::STATUS, status.line())));
        }
        if let Some(condition) = self.error {
            children.push(Child::Element(Element::with_children(
                names::ERROR,
                vec![Child::Empty(condition.name())],
            )));
        }
        Element::with_children(names::RESPONSE, children)
    }
}

/// An ordered batch of per-resource outcomes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiStatus {
    pub responses: Vec<ResponseEntry>,
}

impl MultiStatus {
    pub fn new(responses: Vec<ResponseEntry>) -> Self {
        Self { responses }
    }

    pub fn push(&mut self, entry: ResponseEntry) {
        self.responses.push(entry);
    }

    /// Serialize as a standalone multistatus document.
    pub fn encode(&self) -> Result<Vec<u8>, DavError> {
        let root = Element::with_children(
            names::MULTISTATUS,
            self.responses
                .iter()
                .map(|r| Child::Element(r.to_element()))
                .collect(),
        );
        crate::dav::element::encode_document(&root)
    }

    /// Namespace-aware decode of a multistatus document.
    pub fn decode(bytes: &[u8]) -> Result<MultiStatus, DavError> {
        let mut reader = NsReader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let mut responses = Vec::new();
        let mut saw_root = false;

        let mut cur: Option<EntryBuilder> = None;
        let mut text_target = TextTarget::None;
        let mut in_error = false;
        let mut in_propstat = false;
        let mut propstat_status: Option<Status> = None;
        // depth counter while skipping a <prop> subtree
        let mut skip_depth: Option<usize> = None;

        loop {
            let (resolve, event) = reader.read_resolved_event()?;

            if let Some(depth) = skip_depth {
                match event {
                    Event::Start(_) => skip_depth = Some(depth + 1),
                    Event::End(_) if depth == 0 => skip_depth = None,
                    Event::End(_) => skip_depth = Some(depth - 1),
                    Event::Eof => {
                        return Err(DavError::Decode("unexpected end of document".into()))
                    }
                    _ => {}
                }
                continue;
            }

            let ns = resolved_ns(&resolve);
            let ns_dav = ns == NS_DAV.as_bytes();
            match event {
                Event::Eof => break,
                Event::Start(e) => {
                    let local = e.local_name();
                    let local = local.as_ref();
                    if in_error {
                        if let Some(entry) = cur.as_mut() {
                            if entry.error.is_none() {
                                entry.error = Condition::from_xml(ns, local);
                            }
                        }
                    } else if ns_dav {
                        match local {
                            b"multistatus" => saw_root = true,
                            b"response" => cur = Some(EntryBuilder::default()),
                            b"href" if cur.is_some() => text_target = TextTarget::Href,
                            b"status" if cur.is_some() && in_propstat => {
                                text_target = TextTarget::PropstatStatus
                            }
                            b"status" if cur.is_some() => text_target = TextTarget::Status,
                            b"propstat" if cur.is_some() => {
                                in_propstat = true;
                                propstat_status = None;
                            }
                            b"prop" => skip_depth = Some(0),
                            b"error" if cur.is_some() => in_error = true,
                            _ => {}
                        }
                    }
                }
                Event::Empty(e) => {
                    if in_error {
                        if let Some(entry) = cur.as_mut() {
                            if entry.error.is_none() {
                                entry.error = Condition::from_xml(ns, e.local_name().as_ref());
                            }
                        }
                    }
                }
                Event::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|e| DavError::Decode(e.to_string()))?;
                    match text_target {
                        TextTarget::Href => {
                            if let Some(entry) = cur.as_mut() {
                                entry.href = text.into_owned();
                            }
                        }
                        TextTarget::Status => {
                            if let Some(entry) = cur.as_mut() {
                                entry.status = Some(Status::parse(&text)?);
                            }
                        }
                        TextTarget::PropstatStatus => {
                            propstat_status = Some(Status::parse(&text)?);
                        }
                        TextTarget::None => {}
                    }
                }
                Event::End(e) if ns_dav => match e.local_name().as_ref() {
                    b"href" | b"status" => text_target = TextTarget::None,
                    b"error" => in_error = false,
                    b"propstat" => {
                        in_propstat = false;
                        let status = propstat_status.take().ok_or_else(|| {
                            DavError::Decode("propstat without status".into())
                        })?;
                        if let Some(entry) = cur.as_mut() {
                            entry.propstats.push(PropStat {
                                prop: Vec::new(),
                                status,
                            });
                        }
                    }
                    b"response" => {
                        let entry = cur
                            .take()
                            .ok_or_else(|| DavError::Decode("unbalanced response".into()))?;
                        if entry.href.is_empty() {
                            return Err(DavError::Decode("response without href".into()));
                        }
                        responses.push(ResponseEntry {
                            href: entry.href,
                            status: entry.status,
                            propstats: entry.propstats,
                            error: entry.error,
                        });
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        if !saw_root {
            return Err(DavError::Decode("missing multistatus root".into()));
        }
        Ok(MultiStatus { responses })
    }
}

#[derive(Debug, Default)]
struct EntryBuilder {
    href: String,
    status: Option<Status>,
    propstats: Vec<PropStat>,
    error: Option<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    None,
    Href,
    Status,
    PropstatStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    // https://tools.ietf.org/html/rfc4918#section-9.6.2
    const EXAMPLE_DELETE_MULTISTATUS: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>http://www.example.com/container/resource3</d:href>
    <d:status>HTTP/1.1 423 Locked</d:status>
    <d:error><d:lock-token-submitted/></d:error>
  </d:response>
</d:multistatus>"#;

    #[test]
    fn test_decode_locked_response() {
        let ms = MultiStatus::decode(EXAMPLE_DELETE_MULTISTATUS.as_bytes()).unwrap();
        assert_eq!(ms.responses.len(), 1);

        let entry = &ms.responses[0];
        assert_eq!(entry.href, "http://www.example.com/container/resource3");

        let err = entry.outcome().unwrap_err();
        assert_eq!(err.status, StatusCode::LOCKED);
        assert_eq!(err.condition, Some(Condition::LockTokenSubmitted));
    }

    #[test]
    fn test_decode_status_without_condition() {
        let doc = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/x</d:href>
    <d:status>HTTP/1.1 404 Not Found</d:status>
  </d:response>
</d:multistatus>"#;
        let ms = MultiStatus::decode(doc.as_bytes()).unwrap();
        let err = ms.responses[0].outcome().unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.condition, None);
    }

    #[test]
    fn test_decode_preserves_response_order() {
        let doc = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:">
  <d:response><d:href>/b</d:href><d:status>HTTP/1.1 200 OK</d:status></d:response>
  <d:response><d:href>/a</d:href><d:status>HTTP/1.1 404 Not Found</d:status></d:response>
</d:multistatus>"#;
        let ms = MultiStatus::decode(doc.as_bytes()).unwrap();
        let hrefs: Vec<&str> = ms.responses.iter().map(|r| r.href.as_str()).collect();
        assert_eq!(hrefs, vec!["/b", "/a"]);
        assert!(ms.responses[0].outcome().is_ok());
        assert!(ms.responses[1].outcome().is_err());
    }

    #[test]
    fn test_decode_tolerates_propstat_and_foreign_elements() {
        let doc = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:" xmlns:x="urn:example:x">
  <d:response>
    <d:href>/contacts/alice.vcf</d:href>
    <d:propstat>
      <d:prop><d:getetag>"abc"</d:getetag><x:weird><x:nested/></x:weird></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
    <x:sidecar>ignored</x:sidecar>
  </d:response>
</d:multistatus>"#;
        let ms = MultiStatus::decode(doc.as_bytes()).unwrap();
        let entry = &ms.responses[0];
        assert!(entry.outcome().is_ok());
        assert_eq!(entry.propstats.len(), 1);
        assert_eq!(entry.propstats[0].status, Status(StatusCode::OK));
    }

    #[test]
    fn test_decode_rejects_malformed_documents() {
        assert!(MultiStatus::decode(b"not xml at all <<<").is_err());
        assert!(MultiStatus::decode(b"<d:other xmlns:d=\"DAV:\"/>").is_err());

        let bad_status = r#"<d:multistatus xmlns:d="DAV:">
  <d:response><d:href>/x</d:href><d:status>walrus</d:status></d:response>
</d:multistatus>"#;
        assert!(MultiStatus::decode(bad_status.as_bytes()).is_err());
    }

    #[test]
    fn test_encode_round_trips_through_decode() {
        let ms = MultiStatus::new(vec![
            ResponseEntry::with_status("/ZGU/contacts/default/alice.vcf", StatusCode::OK),
            ResponseEntry::with_status("/ZGU/contacts/default/ghost.vcf", StatusCode::NOT_FOUND),
        ]);
        let bytes = ms.encode().unwrap();
        let round = MultiStatus::decode(&bytes).unwrap();
        assert_eq!(round.responses.len(), 2);
        assert_eq!(round.responses[0].href, "/ZGU/contacts/default/alice.vcf");
        assert!(round.responses[0].outcome().is_ok());
        assert_eq!(
            round.responses[1].outcome().unwrap_err().status,
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_status_line_round_trip() {
        let status = Status(StatusCode::LOCKED);
        assert_eq!(status.line(), "HTTP/1.1 423 Locked");
        assert_eq!(Status::parse(&status.line()).unwrap(), status);
    }
}
