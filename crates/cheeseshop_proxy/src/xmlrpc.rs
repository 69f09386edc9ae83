//! XML-RPC request encoding and response decoding.
//!
//! Covers the value types the package index actually sends: strings,
//! integers, booleans, doubles, arrays, structs and `nil`, plus fault
//! responses.

use cheeseshop_error::{CheeseshopResult, UpstreamError, UpstreamErrorKind};
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// One XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `<string>` or an untyped `<value>`
    String(String),
    /// `<int>`, `<i4>` or `<i8>`
    Int(i64),
    /// `<boolean>`
    Boolean(bool),
    /// `<double>`
    Double(f64),
    /// `<array>`
    Array(Vec<Value>),
    /// `<struct>`
    Struct(BTreeMap<String, Value>),
    /// `<nil/>`
    Nil,
}

impl Value {
    /// String contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer contents, if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Array elements, if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Struct members, if this is a struct.
    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// Consume an array of strings.
    pub fn into_strings(self) -> CheeseshopResult<Vec<String>> {
        match self {
            Self::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Self::String(s) => Ok(s),
                    other => Err(protocol(format!("expected string, got {:?}", other))),
                })
                .collect(),
            other => Err(protocol(format!("expected array, got {:?}", other))),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::Array(value.into_iter().map(Into::into).collect())
    }
}

/// Render a `methodCall` document.
///
/// # Examples
///
/// ```
/// use cheeseshop_proxy::xmlrpc::{Value, encode_call};
///
/// let body = encode_call("package_releases", &[Value::from("Django"), Value::from(true)]);
/// assert!(body.contains("<methodName>package_releases</methodName>"));
/// assert!(body.contains("<boolean>1</boolean>"));
/// ```
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall>");
    let _ = write!(out, "<methodName>{}</methodName><params>", escape(method));
    for param in params {
        out.push_str("<param>");
        encode_value(param, &mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>\n");
    out
}

fn encode_value(value: &Value, out: &mut String) {
    out.push_str("<value>");
    match value {
        Value::String(s) => {
            let _ = write!(out, "<string>{}</string>", escape(s.as_str()));
        }
        Value::Int(i) => {
            let _ = write!(out, "<int>{}</int>", i);
        }
        Value::Boolean(b) => {
            let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
        }
        Value::Double(d) => {
            let _ = write!(out, "<double>{}</double>", d);
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(item, out);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                let _ = write!(out, "<member><name>{}</name>", escape(name.as_str()));
                encode_value(member, out);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>");
}

/// Decode a `methodResponse` document into its single return value.
///
/// A `<fault>` becomes an [`UpstreamErrorKind::Fault`] error.
///
/// # Examples
///
/// ```
/// use cheeseshop_proxy::xmlrpc::{Value, decode_response};
///
/// let body = "<methodResponse><params><param><value><array><data>\
///             <value><string>1.0</string></value><value>1.1</value>\
///             </data></array></value></param></params></methodResponse>";
/// let value = decode_response(body).unwrap();
/// assert_eq!(value.into_strings().unwrap(), vec!["1.0", "1.1"]);
/// ```
pub fn decode_response(body: &str) -> CheeseshopResult<Value> {
    let root = parse_tree(body)?;
    if root.name != "methodResponse" {
        return Err(protocol(format!("unexpected root element <{}>", root.name)));
    }

    if let Some(fault) = root.child("fault") {
        let value = fault
            .child("value")
            .ok_or_else(|| protocol("fault without value"))
            .and_then(decode_value)?;
        let members = value
            .as_struct()
            .ok_or_else(|| protocol("fault value is not a struct"))?;
        let code = members
            .get("faultCode")
            .and_then(Value::as_i64)
            .unwrap_or_default();
        let message = members
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(UpstreamError::new(UpstreamErrorKind::Fault { code, message }).into());
    }

    root.child("params")
        .and_then(|params| params.child("param"))
        .and_then(|param| param.child("value"))
        .ok_or_else(|| protocol("response without a value"))
        .and_then(decode_value)
}

fn decode_value(element: &Element) -> CheeseshopResult<Value> {
    let Some(typed) = element.children.first() else {
        return Ok(Value::String(element.text.clone()));
    };

    let text = typed.text.trim();
    match typed.name.as_str() {
        "string" | "base64" | "dateTime.iso8601" => Ok(Value::String(typed.text.clone())),
        "int" | "i4" | "i8" => text
            .parse()
            .map(Value::Int)
            .map_err(|_| protocol(format!("bad integer '{}'", text))),
        "boolean" => match text {
            "1" => Ok(Value::Boolean(true)),
            "0" => Ok(Value::Boolean(false)),
            other => Err(protocol(format!("bad boolean '{}'", other))),
        },
        "double" => text
            .parse()
            .map(Value::Double)
            .map_err(|_| protocol(format!("bad double '{}'", text))),
        "nil" => Ok(Value::Nil),
        "array" => {
            let data = typed
                .child("data")
                .ok_or_else(|| protocol("array without data"))?;
            data.children
                .iter()
                .filter(|child| child.name == "value")
                .map(decode_value)
                .collect::<CheeseshopResult<Vec<_>>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut members = BTreeMap::new();
            for member in typed.children.iter().filter(|c| c.name == "member") {
                let name = member
                    .child("name")
                    .ok_or_else(|| protocol("struct member without name"))?;
                let value = member
                    .child("value")
                    .ok_or_else(|| protocol("struct member without value"))?;
                members.insert(name.text.clone(), decode_value(value)?);
            }
            Ok(Value::Struct(members))
        }
        other => Err(protocol(format!("unsupported type <{}>", other))),
    }
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn named(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }
}

fn parse_tree(body: &str) -> CheeseshopResult<Element> {
    let mut reader = Reader::from_str(body);
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                stack.push(Element::named(name));
            }
            Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let element = Element::named(name);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Ok(Event::End(_)) => {
                if let Some(element) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| protocol(format!("bad text: {}", e)))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(protocol(format!("XML parse error: {}", e))),
        }
    }

    root.ok_or_else(|| protocol("empty document"))
}

#[track_caller]
fn protocol(message: impl Into<String>) -> cheeseshop_error::CheeseshopError {
    UpstreamError::new(UpstreamErrorKind::Protocol(message.into())).into()
}
