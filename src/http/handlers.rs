//! CardDAV method handlers.
//!
//! # Responsibilities
//! - Dispatch on the DAV method (OPTIONS/PROPFIND/REPORT/GET/HEAD/PUT/
//!   DELETE/MKCOL)
//! - Resolve the request path to principal, home set, collection or object
//! - Assemble multistatus listings, honoring the skip-on-allprop flag
//!
//! # Design Decisions
//! - Handlers talk to the backend trait only; no handler touches the fixed
//!   store directly
//! - Scope and mutation policy live in the backend; handlers just render
//!   the typed errors they get back
//! - Depth: infinity PROPFIND is refused with `propfind-finite-depth`

use std::time::Instant;

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use quick_xml::events::Event;
use quick_xml::reader::NsReader;

use crate::backend::{
    AddressBook, AddressBookQuery, AddressObject, MatchType, PropFilter, TextMatch,
};
use crate::dav::element::{
    self, names, props, resolved_ns, Child, Element, Property, QName, NS_CARDDAV, NS_DAV,
};
use crate::dav::error::DavError;
use crate::dav::multistatus::{Condition, MultiStatus, PropStat, ResponseEntry};
use crate::http::request::RequestIdExt;
use crate::http::response::{
    address_object_response, condition_response, error_response, multistatus_response,
    VCARD_CONTENT_TYPE,
};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::vcard::Card;

/// Catch-all entry point: dispatch on the DAV method.
pub async fn dav_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request.request_id().to_string();
    let depth = parse_depth(request.headers());

    let body = match to_bytes(request.into_body(), state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        body_len = body.len(),
        "Handling DAV request"
    );

    let response = match method.as_str() {
        "OPTIONS" => options_response(),
        "PROPFIND" => propfind(&state, &path, depth, &body),
        "REPORT" => report(&state, &path, &body),
        "GET" => fetch_object(&state, &path, true),
        "HEAD" => fetch_object(&state, &path, false),
        "PUT" => put_object(&state, &path, &body),
        "DELETE" => delete_resource(&state, &path),
        "MKCOL" => make_collection(&state, &path),
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Depth {
    Zero,
    One,
    Infinity,
}

fn parse_depth(headers: &HeaderMap) -> Depth {
    match headers.get("depth").and_then(|v| v.to_str().ok()) {
        Some("0") => Depth::Zero,
        Some("1") => Depth::One,
        // RFC 4918: a missing Depth header means infinity
        _ => Depth::Infinity,
    }
}

fn options_response() -> Response {
    (
        StatusCode::OK,
        [
            (
                header::ALLOW,
                "OPTIONS, GET, HEAD, PUT, DELETE, PROPFIND, REPORT, MKCOL",
            ),
            (HeaderName::from_static("dav"), "1, 3, addressbook"),
        ],
    )
        .into_response()
}

/// A resource the PROPFIND assembler can describe.
enum Resource {
    Principal { path: String },
    HomeSet { path: String },
    Book(AddressBook),
    Object(AddressObject),
}

impl Resource {
    fn href(&self) -> &str {
        match self {
            Resource::Principal { path } => path,
            Resource::HomeSet { path } => path,
            Resource::Book(book) => &book.path,
            Resource::Object(object) => &object.path,
        }
    }
}

fn propfind(state: &AppState, path: &str, depth: Depth, body: &[u8]) -> Response {
    let request = match parse_propfind(body) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };
    if depth == Depth::Infinity {
        return condition_response(StatusCode::FORBIDDEN, Condition::PropfindFiniteDepth);
    }

    let resources = match collect_resources(state, path, depth) {
        Ok(resources) => resources,
        Err(e) => return error_response(&e),
    };

    let responses = resources
        .iter()
        .map(|resource| propfind_entry(state, resource, &request))
        .collect();
    multistatus_response(&MultiStatus::new(responses))
}

/// Resolve the target resource, plus its children for Depth: 1.
fn collect_resources(
    state: &AppState,
    path: &str,
    depth: Depth,
) -> Result<Vec<Resource>, DavError> {
    let backend = state.backend.as_ref();
    let principal = backend.current_user_principal();
    let home_set = backend.address_book_home_set_path();

    if path == "/" || path == principal {
        let mut out = vec![Resource::Principal { path: principal }];
        if depth == Depth::One {
            out.push(Resource::HomeSet { path: home_set });
        }
        return Ok(out);
    }

    if path == home_set {
        let mut out = vec![Resource::HomeSet { path: home_set }];
        if depth == Depth::One {
            out.extend(backend.list_address_books()?.into_iter().map(Resource::Book));
        }
        return Ok(out);
    }

    if let Some(book) = backend
        .list_address_books()?
        .into_iter()
        .find(|book| book.path == path)
    {
        let mut out = vec![Resource::Book(book)];
        if depth == Depth::One {
            out.extend(
                backend
                    .list_address_objects(path)?
                    .into_iter()
                    .map(Resource::Object),
            );
        }
        return Ok(out);
    }

    backend
        .get_address_object(path)
        .map(|object| vec![Resource::Object(object)])
}

fn propfind_entry(state: &AppState, resource: &Resource, request: &PropfindRequest) -> ResponseEntry {
    let available = available_props(state, resource);
    let href = resource.href().to_string();

    match request {
        PropfindRequest::AllProp => {
            let prop = available
                .iter()
                .filter(|(property, _)| !property.skip_on_allprop)
                .map(|(_, elem)| elem.clone())
                .collect();
            ResponseEntry::with_propstats(href, vec![PropStat::ok(prop)])
        }
        PropfindRequest::PropName => {
            let prop = available
                .iter()
                .map(|(property, _)| Element::empty(property.name.clone()))
                .collect();
            ResponseEntry::with_propstats(href, vec![PropStat::ok(prop)])
        }
        PropfindRequest::Prop(requested) => {
            let mut found = Vec::new();
            let mut missing = Vec::new();
            for name in requested {
                match available.iter().find(|(property, _)| &property.name == name) {
                    Some((_, elem)) => found.push(elem.clone()),
                    None => missing.push(Element::empty(name.clone())),
                }
            }
            let mut propstats = Vec::new();
            if !found.is_empty() {
                propstats.push(PropStat::ok(found));
            }
            if !missing.is_empty() {
                propstats.push(PropStat::not_found(missing));
            }
            if propstats.is_empty() {
                propstats.push(PropStat::ok(Vec::new()));
            }
            ResponseEntry::with_propstats(href, propstats)
        }
    }
}

/// Live properties of a resource, fully built.
fn available_props(state: &AppState, resource: &Resource) -> Vec<(Property, Element)> {
    let backend = state.backend.as_ref();
    let principal = backend.current_user_principal();
    let home_set = backend.address_book_home_set_path();

    let current_user_principal = (
        props::CURRENT_USER_PRINCIPAL,
        props::CURRENT_USER_PRINCIPAL.build(vec![Child::Element(element::href(&principal))]),
    );
    let home_set_prop = (
        props::ADDRESSBOOK_HOME_SET,
        props::ADDRESSBOOK_HOME_SET.build(vec![Child::Element(element::href(&home_set))]),
    );

    match resource {
        Resource::Principal { .. } => vec![
            (
                props::RESOURCETYPE,
                props::RESOURCETYPE.build(vec![
                    Child::Empty(names::COLLECTION),
                    Child::Empty(names::PRINCIPAL),
                ]),
            ),
            (
                props::DISPLAYNAME,
                props::DISPLAYNAME.build(vec![Child::from(principal.trim_matches('/'))]),
            ),
            current_user_principal,
            home_set_prop,
        ],
        Resource::HomeSet { .. } => vec![
            (
                props::RESOURCETYPE,
                props::RESOURCETYPE.build(vec![Child::Empty(names::COLLECTION)]),
            ),
            current_user_principal,
            home_set_prop,
        ],
        Resource::Book(book) => {
            let mut out = vec![
                (
                    props::RESOURCETYPE,
                    props::RESOURCETYPE.build(vec![
                        Child::Empty(names::COLLECTION),
                        Child::Empty(names::ADDRESSBOOK),
                    ]),
                ),
                (
                    props::DISPLAYNAME,
                    props::DISPLAYNAME.build(vec![Child::from(book.name.as_str())]),
                ),
                (
                    props::ADDRESSBOOK_DESCRIPTION,
                    props::ADDRESSBOOK_DESCRIPTION
                        .build(vec![Child::from(book.description.as_str())]),
                ),
                (
                    props::MAX_RESOURCE_SIZE,
                    props::MAX_RESOURCE_SIZE
                        .build(vec![Child::from(book.max_resource_size.to_string())]),
                ),
                current_user_principal,
                home_set_prop,
            ];
            if let Some(types) = &book.supported_address_data {
                let children = types
                    .iter()
                    .map(|t| {
                        Child::Element(
                            Element::empty(names::ADDRESS_DATA_TYPE)
                                .attr("content-type", &t.content_type)
                                .attr("version", &t.version),
                        )
                    })
                    .collect();
                out.push((
                    props::SUPPORTED_ADDRESS_DATA,
                    props::SUPPORTED_ADDRESS_DATA.build(children),
                ));
            }
            out
        }
        Resource::Object(object) => vec![
            (props::RESOURCETYPE, props::RESOURCETYPE.build(Vec::new())),
            (
                props::GETETAG,
                props::GETETAG.build(vec![Child::from(format!("\"{}\"", object.etag))]),
            ),
            (
                props::GETLASTMODIFIED,
                props::GETLASTMODIFIED.build(vec![Child::from(object.mod_time.encode())]),
            ),
            (
                props::GETCONTENTTYPE,
                props::GETCONTENTTYPE.build(vec![Child::from(VCARD_CONTENT_TYPE)]),
            ),
        ],
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PropfindRequest {
    AllProp,
    PropName,
    Prop(Vec<QName>),
}

fn parse_propfind(body: &[u8]) -> Result<PropfindRequest, DavError> {
    // an empty request body means allprop
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(PropfindRequest::AllProp);
    }

    let mut reader = NsReader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut saw_root = false;
    let mut mode: Option<PropfindRequest> = None;
    let mut in_prop = false;
    let mut depth_in_prop = 0usize;

    loop {
        let (resolve, event) = reader.read_resolved_event()?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) => {
                let ns = resolved_ns(&resolve);
                let local = e.local_name();
                let local = local.as_ref();
                let is_dav = ns == NS_DAV.as_bytes();
                let is_empty = matches!(event, Event::Empty(_));

                if !saw_root {
                    if is_dav && local == b"propfind" {
                        saw_root = true;
                        continue;
                    }
                    return Err(DavError::Decode("expected DAV: propfind root".into()));
                }

                if in_prop {
                    if depth_in_prop == 0 {
                        let name = QName::owned(
                            String::from_utf8_lossy(ns).into_owned(),
                            String::from_utf8_lossy(local).into_owned(),
                        );
                        if let Some(PropfindRequest::Prop(requested)) = mode.as_mut() {
                            requested.push(name);
                        }
                    }
                    if !is_empty {
                        depth_in_prop += 1;
                    }
                } else if is_dav {
                    match local {
                        b"allprop" => mode = Some(PropfindRequest::AllProp),
                        b"propname" => mode = Some(PropfindRequest::PropName),
                        b"prop" => {
                            mode = Some(PropfindRequest::Prop(Vec::new()));
                            if !is_empty {
                                in_prop = true;
                                depth_in_prop = 0;
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::End(_) => {
                if in_prop {
                    if depth_in_prop == 0 {
                        in_prop = false;
                    } else {
                        depth_in_prop -= 1;
                    }
                }
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(DavError::Decode("expected DAV: propfind root".into()));
    }
    // a bare <propfind/> body is treated like allprop
    Ok(mode.unwrap_or(PropfindRequest::AllProp))
}

#[derive(Debug, Clone, PartialEq)]
enum ReportRequest {
    Query(AddressBookQuery),
    Multiget(Vec<String>),
}

fn report(state: &AppState, path: &str, body: &[u8]) -> Response {
    match parse_report(body) {
        Ok(ReportRequest::Query(query)) => {
            match state.backend.query_address_objects(path, &query) {
                Ok(objects) => {
                    let limited = match query.limit {
                        Some(limit) => objects.into_iter().take(limit).collect(),
                        None => objects,
                    };
                    let responses = limited.iter().map(object_report_entry).collect();
                    multistatus_response(&MultiStatus::new(responses))
                }
                Err(e) => error_response(&e),
            }
        }
        Ok(ReportRequest::Multiget(hrefs)) => {
            let mut multistatus = MultiStatus::default();
            for href in hrefs {
                match state.backend.get_address_object(&href) {
                    Ok(object) => multistatus.push(object_report_entry(&object)),
                    Err(e) => multistatus.push(ResponseEntry::with_status(href, e.status())),
                }
            }
            multistatus_response(&multistatus)
        }
        Err(e) => error_response(&e),
    }
}

fn object_report_entry(object: &AddressObject) -> ResponseEntry {
    let prop = vec![
        props::GETETAG.build(vec![Child::from(format!("\"{}\"", object.etag))]),
        Element::text(names::ADDRESS_DATA, object.card.to_vcf()),
    ];
    ResponseEntry::with_propstats(object.path.clone(), vec![PropStat::ok(prop)])
}

fn parse_report(body: &[u8]) -> Result<ReportRequest, DavError> {
    let mut reader = NsReader::from_reader(body);
    reader.config_mut().trim_text(true);

    #[derive(PartialEq)]
    enum Root {
        Query,
        Multiget,
    }
    #[derive(Clone, Copy, PartialEq)]
    enum TextTarget {
        None,
        Href,
        MatchValue,
    }

    let mut root: Option<Root> = None;
    let mut hrefs: Vec<String> = Vec::new();
    let mut query = AddressBookQuery::default();
    let mut cur_filter: Option<PropFilter> = None;
    let mut text_target = TextTarget::None;

    loop {
        let (resolve, event) = reader.read_resolved_event()?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) => {
                let ns = resolved_ns(&resolve);
                let local = e.local_name();
                let local = local.as_ref();
                let is_empty = matches!(event, Event::Empty(_));

                if root.is_none() {
                    root = match (ns, local) {
                        (ns, b"addressbook-query") if ns == NS_CARDDAV.as_bytes() => {
                            Some(Root::Query)
                        }
                        (ns, b"addressbook-multiget") if ns == NS_CARDDAV.as_bytes() => {
                            Some(Root::Multiget)
                        }
                        _ => return Err(DavError::Decode("unsupported report".into())),
                    };
                    continue;
                }

                if ns == NS_DAV.as_bytes() && local == b"href" && !is_empty {
                    text_target = TextTarget::Href;
                } else if ns == NS_CARDDAV.as_bytes() {
                    match local {
                        b"prop-filter" => {
                            let name = attribute(e, "name").unwrap_or_default();
                            let filter = PropFilter {
                                name,
                                text_match: None,
                            };
                            if is_empty {
                                query.prop_filters.push(filter);
                            } else {
                                cur_filter = Some(filter);
                            }
                        }
                        b"text-match" => {
                            if let Some(filter) = cur_filter.as_mut() {
                                let match_type = attribute(e, "match-type")
                                    .as_deref()
                                    .map(parse_match_type)
                                    .unwrap_or_default();
                                filter.text_match = Some(TextMatch {
                                    value: String::new(),
                                    match_type,
                                });
                                if !is_empty {
                                    text_target = TextTarget::MatchValue;
                                }
                            }
                        }
                        b"limit" | b"nresults" => {
                            // nresults carries the number as text; a bare
                            // limit wrapper is just structure
                        }
                        _ => {}
                    }
                }
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| DavError::Decode(e.to_string()))?
                    .into_owned();
                match text_target {
                    TextTarget::Href => hrefs.push(text),
                    TextTarget::MatchValue => {
                        if let Some(tm) =
                            cur_filter.as_mut().and_then(|f| f.text_match.as_mut())
                        {
                            tm.value = text;
                        }
                    }
                    TextTarget::None => {
                        // nresults payload
                        if let Ok(limit) = text.trim().parse::<usize>() {
                            query.limit = Some(limit);
                        }
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"href" | b"text-match" => text_target = TextTarget::None,
                b"prop-filter" => {
                    if let Some(filter) = cur_filter.take() {
                        query.prop_filters.push(filter);
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    match root {
        Some(Root::Query) => Ok(ReportRequest::Query(query)),
        Some(Root::Multiget) => Ok(ReportRequest::Multiget(hrefs)),
        None => Err(DavError::Decode("empty report body".into())),
    }
}

fn attribute(e: &quick_xml::events::BytesStart<'_>, key: &str) -> Option<String> {
    e.try_get_attribute(key)
        .ok()
        .flatten()
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

fn parse_match_type(text: &str) -> MatchType {
    match text {
        "equals" => MatchType::Equals,
        "starts-with" => MatchType::StartsWith,
        "ends-with" => MatchType::EndsWith,
        _ => MatchType::Contains,
    }
}

fn fetch_object(state: &AppState, path: &str, include_body: bool) -> Response {
    match state.backend.get_address_object(path) {
        Ok(object) => address_object_response(&object, include_body),
        Err(e) => error_response(&e),
    }
}

fn put_object(state: &AppState, path: &str, body: &[u8]) -> Response {
    // the write policy must not depend on body content, so a malformed
    // payload is replaced by an empty card rather than rejected up front
    let card = std::str::from_utf8(body)
        .ok()
        .and_then(|text| Card::from_vcf(text).ok())
        .unwrap_or_default();

    match state.backend.put_address_object(path, card) {
        Ok(object) => (
            StatusCode::CREATED,
            [(header::ETAG, format!("\"{}\"", object.etag))],
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

fn delete_resource(state: &AppState, path: &str) -> Response {
    let result = if path.ends_with('/') {
        state.backend.delete_address_book(path)
    } else {
        state.backend.delete_address_object(path)
    };
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

fn make_collection(state: &AppState, path: &str) -> Response {
    let path = if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    };
    let book = AddressBook {
        path,
        name: String::new(),
        description: String::new(),
        max_resource_size: 0,
        supported_address_data: None,
    };
    match state.backend.create_address_book(&book) {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_propfind_modes() {
        assert_eq!(parse_propfind(b"").unwrap(), PropfindRequest::AllProp);
        assert_eq!(parse_propfind(b"   \n").unwrap(), PropfindRequest::AllProp);

        let allprop = br#"<?xml version="1.0"?>
<d:propfind xmlns:d="DAV:"><d:allprop/></d:propfind>"#;
        assert_eq!(parse_propfind(allprop).unwrap(), PropfindRequest::AllProp);

        let propname = br#"<d:propfind xmlns:d="DAV:"><d:propname/></d:propfind>"#;
        assert_eq!(parse_propfind(propname).unwrap(), PropfindRequest::PropName);

        let prop = br#"<d:propfind xmlns:d="DAV:" xmlns:card="urn:ietf:params:xml:ns:carddav">
  <d:prop><d:resourcetype/><card:addressbook-home-set/></d:prop>
</d:propfind>"#;
        match parse_propfind(prop).unwrap() {
            PropfindRequest::Prop(names) => {
                assert_eq!(names.len(), 2);
                assert_eq!(names[0].local, "resourcetype");
                assert_eq!(names[1].ns, NS_CARDDAV);
            }
            other => panic!("expected prop request, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_propfind_rejects_foreign_root() {
        assert!(parse_propfind(b"<x:lockinfo xmlns:x=\"DAV:\"/>").is_err());
        assert!(parse_propfind(b"<propfind>no namespace</propfind>").is_err());
    }

    #[test]
    fn test_parse_report_multiget_collects_hrefs_in_order() {
        let body = br#"<?xml version="1.0"?>
<card:addressbook-multiget xmlns:d="DAV:" xmlns:card="urn:ietf:params:xml:ns:carddav">
  <d:prop><d:getetag/><card:address-data/></d:prop>
  <d:href>/ZGU/contacts/default/alice.vcf</d:href>
  <d:href>/ZGU/contacts/default/ghost.vcf</d:href>
</card:addressbook-multiget>"#;
        match parse_report(body).unwrap() {
            ReportRequest::Multiget(hrefs) => {
                assert_eq!(
                    hrefs,
                    vec![
                        "/ZGU/contacts/default/alice.vcf",
                        "/ZGU/contacts/default/ghost.vcf"
                    ]
                );
            }
            other => panic!("expected multiget, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_report_query_filters() {
        let body = br#"<?xml version="1.0"?>
<card:addressbook-query xmlns:d="DAV:" xmlns:card="urn:ietf:params:xml:ns:carddav">
  <d:prop><d:getetag/></d:prop>
  <card:filter>
    <card:prop-filter name="FN">
      <card:text-match match-type="starts-with">Fest</card:text-match>
    </card:prop-filter>
  </card:filter>
</card:addressbook-query>"#;
        match parse_report(body).unwrap() {
            ReportRequest::Query(query) => {
                assert_eq!(query.prop_filters.len(), 1);
                let filter = &query.prop_filters[0];
                assert_eq!(filter.name, "FN");
                let tm = filter.text_match.as_ref().unwrap();
                assert_eq!(tm.value, "Fest");
                assert_eq!(tm.match_type, MatchType::StartsWith);
            }
            other => panic!("expected query, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_report_rejects_unknown_reports() {
        assert!(parse_report(b"<d:sync-collection xmlns:d=\"DAV:\"/>").is_err());
        assert!(parse_report(b"").is_err());
    }

    #[test]
    fn test_parse_depth() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_depth(&headers), Depth::Infinity);
        headers.insert("depth", "0".parse().unwrap());
        assert_eq!(parse_depth(&headers), Depth::Zero);
        headers.insert("depth", "1".parse().unwrap());
        assert_eq!(parse_depth(&headers), Depth::One);
        headers.insert("depth", "infinity".parse().unwrap());
        assert_eq!(parse_depth(&headers), Depth::Infinity);
    }
}
