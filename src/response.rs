// src/response.rs
use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value;

use crate::error::Error;

/// Rough payload classification from the Content-Type header, falling back
/// to sniffing the body when the header is missing or unhelpful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Xml,
    Text,
}

/// One fetch result. Immutable once produced by an extractor; the
/// transformer only ever sees it by reference.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl Response {
    /// Header names are stored lowercased so lookups are case-insensitive.
    pub fn new(status: u16, headers: BTreeMap<String, String>, body: Vec<u8>) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// True when the payload contains nothing but whitespace.
    pub fn is_empty(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn content_kind(&self) -> ContentKind {
        if let Some(content_type) = self.header("content-type") {
            let content_type = content_type.to_ascii_lowercase();
            if content_type.contains("json") {
                return ContentKind::Json;
            }
            if content_type.contains("xml") {
                return ContentKind::Xml;
            }
        }
        match self.body.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') | Some(b'[') => ContentKind::Json,
            Some(b'<') => ContentKind::Xml,
            _ => ContentKind::Text,
        }
    }

    pub fn json(&self) -> Result<Value, Error> {
        serde_json::from_slice(&self.body)
            .map_err(|err| Error::Transform(format!("invalid json payload: {err}")))
    }

    /// Decodes the payload and walks a dot-separated path into it.
    /// `None` when the path does not resolve.
    pub fn json_path(&self, path: &str) -> Result<Option<Value>, Error> {
        let root = self.json()?;
        Ok(crate::transform::path::json_get(&root, path).cloned())
    }

    /// Parses the payload into a generic element tree. The returned element
    /// is a virtual document node whose children are the top-level elements.
    pub fn xml(&self) -> Result<XmlElement, Error> {
        parse_document(&self.text())
    }
}

/// One XML element with its direct text content. Nested element text is not
/// folded into the parent, matching how feed fields are addressed by path.
/// Names keep their namespace prefix verbatim (`dc:creator`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Selects descendants by a slash-separated path evaluated against this
    /// element's children. Leading slashes are tolerated, so an absolute
    /// feed path like `/rss/channel/item` works from the document node.
    pub fn select(&self, path: &str) -> Vec<&XmlElement> {
        let mut current: Vec<&XmlElement> = vec![self];
        for segment in path.trim().split('/').filter(|s| !s.is_empty()) {
            if segment.starts_with('@') {
                break;
            }
            let mut next = Vec::new();
            for element in current {
                next.extend(element.children.iter().filter(|c| c.name == segment));
            }
            current = next;
        }
        current
    }

    /// First non-empty trimmed text at `path`. A trailing `@attr` segment
    /// reads an attribute instead of element text (`media:content/@url`).
    pub fn first_text(&self, path: &str) -> Option<String> {
        let path = path.trim();
        if path.is_empty() {
            return None;
        }

        if let Some(at) = path.rfind('@') {
            let attribute = &path[at + 1..];
            let element_path = path[..at].trim_end_matches('/');
            let targets = if element_path.is_empty() {
                vec![self]
            } else {
                self.select(element_path)
            };
            return targets.into_iter().find_map(|element| {
                let value = element.attributes.get(attribute)?.trim();
                (!value.is_empty()).then(|| value.to_string())
            });
        }

        let first = self.select(path).into_iter().next()?;
        let value = first.text.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

fn parse_document(input: &str) -> Result<XmlElement, Error> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut document = XmlElement::default();
    let mut stack: Vec<XmlElement> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(element_from_start(&start)),
            Ok(Event::Empty(start)) => {
                let element = element_from_start(&start);
                attach(&mut document, &mut stack, element);
            }
            Ok(Event::Text(text)) => {
                let value = text
                    .unescape()
                    .map_err(|err| Error::Transform(format!("invalid xml text: {err}")))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&value);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Transform("unbalanced xml".to_string()))?;
                attach(&mut document, &mut stack, element);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(Error::Transform(format!("invalid xml: {err}"))),
        }
    }

    if !stack.is_empty() {
        return Err(Error::Transform("unbalanced xml".to_string()));
    }

    Ok(document)
}

fn attach(document: &mut XmlElement, stack: &mut [XmlElement], element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => document.children.push(element),
    }
}

fn element_from_start(start: &BytesStart<'_>) -> XmlElement {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = BTreeMap::new();
    for attribute in start.attributes().with_checks(false).flatten() {
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_default();
        attributes.insert(key, value);
    }
    XmlElement {
        name,
        attributes,
        ..XmlElement::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(content_type: &str, body: &str) -> Response {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), content_type.to_string());
        Response::new(200, headers, body.as_bytes().to_vec())
    }

    #[test]
    fn content_kind_prefers_header_then_sniffs() {
        assert_eq!(
            response("application/json", "<x/>").content_kind(),
            ContentKind::Json
        );
        assert_eq!(
            response("application/rss+xml", "{}").content_kind(),
            ContentKind::Xml
        );
        assert_eq!(
            Response::new(200, BTreeMap::new(), b"  {\"a\":1}".to_vec()).content_kind(),
            ContentKind::Json
        );
    }

    #[test]
    fn xml_tree_selects_by_path() {
        let body = r#"<rss><channel><item><title>One</title></item><item><title>Two</title></item></channel></rss>"#;
        let doc = response("text/xml", body).xml().unwrap();
        let items = doc.select("/rss/channel/item");
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].first_text("title").as_deref(), Some("Two"));
    }

    #[test]
    fn first_text_reads_attributes_and_cdata() {
        let body = r#"<item><media:content url="https://img.test/a.jpg"/><description><![CDATA[<p>Hi</p>]]></description></item>"#;
        let doc = response("text/xml", body).xml().unwrap();
        let item = &doc.children[0];
        assert_eq!(
            item.first_text("media:content/@url").as_deref(),
            Some("https://img.test/a.jpg")
        );
        assert_eq!(item.first_text("description").as_deref(), Some("<p>Hi</p>"));
        assert_eq!(item.first_text("missing"), None);
    }

    #[test]
    fn empty_body_is_empty() {
        assert!(Response::new(200, BTreeMap::new(), b"  \n".to_vec()).is_empty());
        assert!(!response("text/xml", "<x/>").is_empty());
    }
}
