//! Base for typed response models.
//!
//! A domain response type keeps the raw [`Response`] next to its parsed
//! payload and implements [`ResponseModel`] to expose the usual passthroughs.
//! The parse helpers take the body text and never touch the network:
//!
//! ```ignore
//! struct UserResponse {
//!     response: Response,
//!     user: User,
//! }
//!
//! impl ResponseModel for UserResponse {
//!     fn response(&self) -> &Response {
//!         &self.response
//!     }
//! }
//!
//! let mut response = Request::get(url).get_response_async().await?;
//! let user = parse_json(response.body().await?)?;
//! let model = UserResponse { response, user };
//! ```

use crate::error::HttpError;
use crate::response::Response;
use http::{HeaderMap, StatusCode, Uri};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Passthrough accessors for types wrapping a [`Response`]
pub trait ResponseModel {
    fn response(&self) -> &Response;

    fn status(&self) -> StatusCode {
        self.response().status()
    }

    fn headers(&self) -> &HeaderMap {
        self.response().headers()
    }

    fn content_type(&self) -> Option<&str> {
        self.response().content_type()
    }

    fn response_uri(&self) -> &Uri {
        self.response().response_uri()
    }
}

/// Deserialize a JSON body
///
/// # Errors
/// Returns `HttpError::Json` if the body is not valid JSON for `T`
pub fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, HttpError> {
    Ok(serde_json::from_str(body)?)
}

/// [`parse_json`] that reports failure as `None`
#[must_use]
pub fn try_parse_json<T: DeserializeOwned>(body: &str) -> Option<T> {
    serde_json::from_str(body).ok()
}

/// Parse any JSON value
///
/// # Errors
/// Returns `HttpError::Json` for malformed JSON
pub fn parse_json_value(body: &str) -> Result<Value, HttpError> {
    parse_json(body)
}

/// Parse a JSON object
///
/// # Errors
/// Returns `HttpError::Json` for malformed JSON or a non-object document
pub fn parse_json_object(body: &str) -> Result<Map<String, Value>, HttpError> {
    parse_json(body)
}

#[must_use]
pub fn try_parse_json_object(body: &str) -> Option<Map<String, Value>> {
    try_parse_json(body)
}

/// Parse a JSON array
///
/// # Errors
/// Returns `HttpError::Json` for malformed JSON or a non-array document
pub fn parse_json_array(body: &str) -> Result<Vec<Value>, HttpError> {
    parse_json(body)
}

#[must_use]
pub fn try_parse_json_array(body: &str) -> Option<Vec<Value>> {
    try_parse_json(body)
}

/// Parse a JSON value and hand it to `map`
///
/// # Errors
/// Returns `HttpError::Json` for malformed JSON
pub fn parse_json_with<T, F>(body: &str, map: F) -> Result<T, HttpError>
where
    F: FnOnce(Value) -> T,
{
    parse_json_value(body).map(map)
}

/// Element of a parsed XML document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name, prefix included
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Concatenated, unescaped text and CDATA content
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First child element named `name`
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, HttpError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| HttpError::Xml(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| HttpError::Xml(e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            ..Default::default()
        })
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), HttpError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(HttpError::Xml("document has more than one root element".to_owned()));
    }
    *root = Some(element);
    Ok(())
}

/// Parse an XML document into its root element
///
/// Whitespace around text is trimmed; comments, processing instructions and
/// the XML declaration are skipped.
///
/// # Errors
/// Returns `HttpError::Xml` for malformed documents, documents without a root
/// element, or documents with several root elements
pub fn parse_xml_element(body: &str) -> Result<XmlElement, HttpError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;
    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(XmlElement::from_start(&start)?),
            Event::Empty(start) => {
                let element = XmlElement::from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| HttpError::Xml("unexpected closing tag".to_owned()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let unescaped = text.unescape().map_err(|e| HttpError::Xml(e.to_string()))?;
                    current.text.push_str(&unescaped);
                }
            }
            Event::CData(cdata) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&cdata));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(HttpError::Xml(format!("element <{}> is not closed", open.name)));
    }
    root.ok_or_else(|| HttpError::Xml("document has no root element".to_owned()))
}

#[must_use]
pub fn try_parse_xml_element(body: &str) -> Option<XmlElement> {
    parse_xml_element(body).ok()
}

/// Parse an XML document and hand its root element to `map`
///
/// # Errors
/// Same as [`parse_xml_element`]
pub fn parse_xml_with<T, F>(body: &str, map: F) -> Result<T, HttpError>
where
    F: FnOnce(XmlElement) -> T,
{
    parse_xml_element(body).map(map)
}
