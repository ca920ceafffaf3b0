//! XML element composition for DAV documents.
//!
//! # Responsibilities
//! - Namespace-qualified element names and property metadata
//! - Build element trees from a closed set of child variants
//! - Serialize element trees with stable namespace prefixes
//!
//! # Design Decisions
//! - Children are a closed set of tagged variants (nested element, named
//!   tag only, character data), each with a single conversion — no runtime
//!   type inspection when assembling documents
//! - The `DAV:` and CardDAV namespaces get fixed prefixes; anything else is
//!   written with an inline `xmlns` declaration
//! - Generic XML tokenization belongs to quick-xml, not this module

use std::borrow::Cow;
use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::dav::error::DavError;

pub const NS_DAV: &str = "DAV:";
pub const NS_CARDDAV: &str = "urn:ietf:params:xml:ns:carddav";

/// Namespace-qualified element name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub ns: Cow<'static, str>,
    pub local: Cow<'static, str>,
}

impl QName {
    pub fn owned(ns: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            ns: Cow::Owned(ns.into()),
            local: Cow::Owned(local.into()),
        }
    }
}

/// Name in the `DAV:` namespace.
pub const fn dav(local: &'static str) -> QName {
    QName {
        ns: Cow::Borrowed(NS_DAV),
        local: Cow::Borrowed(local),
    }
}

/// Name in the CardDAV namespace.
pub const fn carddav(local: &'static str) -> QName {
    QName {
        ns: Cow::Borrowed(NS_CARDDAV),
        local: Cow::Borrowed(local),
    }
}

/// One child of an element.
///
/// A closed set of variants, each created through its own `From` impl, so
/// document assembly never inspects value kinds at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    /// Fully-built nested element.
    Element(Element),
    /// Named tag with no content, e.g. `<d:collection/>`.
    Empty(QName),
    /// Character data leaf.
    Text(String),
}

impl From<Element> for Child {
    fn from(elem: Element) -> Self {
        Child::Element(elem)
    }
}

impl From<QName> for Child {
    fn from(name: QName) -> Self {
        Child::Empty(name)
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

/// A namespaced XML element with ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: QName,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Child>,
}

impl Element {
    pub fn empty(name: QName) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(name: QName, text: impl Into<String>) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            children: vec![Child::Text(text.into())],
        }
    }

    pub fn with_children(name: QName, children: Vec<Child>) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            children,
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }
}

/// A DAV property with its listing metadata.
///
/// `skip_on_allprop` excludes the property from a PROPFIND allprop
/// response; it is still served when the client names it in a prop
/// request. The flag is consulted by the listing assembler, not here.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: QName,
    pub skip_on_allprop: bool,
}

impl Property {
    pub const fn new(name: QName) -> Self {
        Self {
            name,
            skip_on_allprop: false,
        }
    }

    /// Property hidden from allprop listings.
    pub const fn hidden(name: QName) -> Self {
        Self {
            name,
            skip_on_allprop: true,
        }
    }

    pub fn build(&self, children: Vec<Child>) -> Element {
        Element::with_children(self.name.clone(), children)
    }
}

/// Element names used across the document model.
pub mod names {
    use super::{carddav, dav, QName};

    pub const MULTISTATUS: QName = dav("multistatus");
    pub const RESPONSE: QName = dav("response");
    pub const HREF: QName = dav("href");
    pub const STATUS: QName = dav("status");
    pub const PROPSTAT: QName = dav("propstat");
    pub const PROP: QName = dav("prop");
    pub const ERROR: QName = dav("error");
    pub const COLLECTION: QName = dav("collection");
    pub const PRINCIPAL: QName = dav("principal");
    pub const PROPFIND: QName = dav("propfind");
    pub const ALLPROP: QName = dav("allprop");
    pub const PROPNAME: QName = dav("propname");
    pub const ADDRESSBOOK: QName = carddav("addressbook");
    pub const ADDRESS_DATA: QName = carddav("address-data");
    pub const ADDRESS_DATA_TYPE: QName = carddav("address-data-type");
}

/// Properties served by the listing assembler.
pub mod props {
    use super::{carddav, dav, Property};

    pub const RESOURCETYPE: Property = Property::new(dav("resourcetype"));
    pub const DISPLAYNAME: Property = Property::new(dav("displayname"));
    pub const GETETAG: Property = Property::new(dav("getetag"));
    pub const GETLASTMODIFIED: Property = Property::new(dav("getlastmodified"));
    pub const GETCONTENTTYPE: Property = Property::new(dav("getcontenttype"));
    pub const CURRENT_USER_PRINCIPAL: Property = Property::hidden(dav("current-user-principal"));
    pub const ADDRESSBOOK_HOME_SET: Property = Property::hidden(carddav("addressbook-home-set"));
    pub const ADDRESSBOOK_DESCRIPTION: Property =
        Property::new(carddav("addressbook-description"));
    pub const MAX_RESOURCE_SIZE: Property = Property::new(carddav("max-resource-size"));
    pub const SUPPORTED_ADDRESS_DATA: Property =
        Property::new(carddav("supported-address-data"));
}

/// `<d:href>` leaf pointing at a resource path.
pub fn href(path: impl Into<String>) -> Element {
    Element::text(names::HREF, path)
}

/// Namespace bytes of a resolved reader event, empty when unbound.
pub(crate) fn resolved_ns<'a>(
    resolve: &'a quick_xml::name::ResolveResult<'a>,
) -> &'a [u8] {
    match resolve {
        quick_xml::name::ResolveResult::Bound(quick_xml::name::Namespace(ns)) => ns,
        _ => b"",
    }
}

fn prefix(ns: &str) -> Option<&'static str> {
    match ns {
        NS_DAV => Some("d"),
        NS_CARDDAV => Some("card"),
        _ => None,
    }
}

/// Serialize a root element as a standalone document with an XML
/// declaration and namespace declarations on the root.
pub fn encode_document(root: &Element) -> Result<Vec<u8>, DavError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| DavError::Decode(e.to_string()))?;
    write_element(&mut writer, root, true)?;
    Ok(writer.into_inner().into_inner())
}

fn write_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    elem: &Element,
    declare_namespaces: bool,
) -> Result<(), DavError> {
    let tag = tag_name(&elem.name);
    let mut start = BytesStart::new(tag.as_ref());
    if declare_namespaces {
        start.push_attribute(("xmlns:d", NS_DAV));
        start.push_attribute(("xmlns:card", NS_CARDDAV));
    }
    if prefix(&elem.name.ns).is_none() && !elem.name.ns.is_empty() {
        start.push_attribute(("xmlns", elem.name.ns.as_ref()));
    }
    for (key, value) in &elem.attrs {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if elem.children.is_empty() {
        writer
            .write_event(Event::Empty(start))
            .map_err(|e| DavError::Decode(e.to_string()))?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| DavError::Decode(e.to_string()))?;
    for child in &elem.children {
        match child {
            Child::Element(nested) => write_element(writer, nested, false)?,
            Child::Empty(name) => {
                let tag = tag_name(name);
                let mut empty = BytesStart::new(tag.as_ref());
                if prefix(&name.ns).is_none() && !name.ns.is_empty() {
                    empty.push_attribute(("xmlns", name.ns.as_ref()));
                }
                writer
                    .write_event(Event::Empty(empty))
                    .map_err(|e| DavError::Decode(e.to_string()))?;
            }
            Child::Text(text) => {
                writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(|e| DavError::Decode(e.to_string()))?;
            }
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(tag.as_ref())))
        .map_err(|e| DavError::Decode(e.to_string()))?;
    Ok(())
}

fn tag_name(name: &QName) -> Cow<'_, str> {
    match prefix(&name.ns) {
        Some(p) => Cow::Owned(format!("{}:{}", p, name.local)),
        None => Cow::Borrowed(name.local.as_ref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_empty_and_text_children() {
        let root = Element::with_children(
            props::RESOURCETYPE.name.clone(),
            vec![
                Child::from(names::COLLECTION),
                Child::from(names::ADDRESSBOOK),
            ],
        );
        let doc = String::from_utf8(encode_document(&root).unwrap()).unwrap();
        assert!(doc.contains("<d:resourcetype"));
        assert!(doc.contains("<d:collection/>"));
        assert!(doc.contains("<card:addressbook/>"));
        assert!(doc.contains("xmlns:d=\"DAV:\""));
    }

    #[test]
    fn test_encode_escapes_text() {
        let root = Element::text(props::DISPLAYNAME.name.clone(), "Tom & Jerry <3");
        let doc = String::from_utf8(encode_document(&root).unwrap()).unwrap();
        assert!(doc.contains("Tom &amp; Jerry &lt;3"));
    }

    #[test]
    fn test_unknown_namespace_gets_inline_declaration() {
        let root = Element::with_children(
            names::PROP,
            vec![Child::Element(Element::empty(QName::owned(
                "urn:example:x",
                "custom",
            )))],
        );
        let doc = String::from_utf8(encode_document(&root).unwrap()).unwrap();
        assert!(doc.contains("<custom xmlns=\"urn:example:x\"/>"));
    }

    #[test]
    fn test_hidden_properties_are_flagged() {
        assert!(props::CURRENT_USER_PRINCIPAL.skip_on_allprop);
        assert!(props::ADDRESSBOOK_HOME_SET.skip_on_allprop);
        assert!(!props::RESOURCETYPE.skip_on_allprop);
    }
}
