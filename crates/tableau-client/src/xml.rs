//! `tsRequest` payload writing and response envelope decoding.

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::fmt::Display;
use std::io::Write;
use tableau_abstraction::{RestError, TsResponse};

/// An element of a request payload: a name, attributes, optional text and child elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: Vec::new(), text: None, children: Vec::new() }
    }

    pub(crate) fn attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.push((key.to_string(), value.into()));
        self
    }

    /// Adds the attribute only when `value` is set.
    pub(crate) fn attr_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.attr(key, v),
            None => self,
        }
    }

    /// Sets the element's text content. Text is written before any children.
    pub(crate) fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// `<name>text</name>`
    pub(crate) fn leaf(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).text(text)
    }

    pub(crate) fn child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub(crate) fn children(mut self, children: impl IntoIterator<Item = XmlElement>) -> Self {
        self.children.extend(children);
        self
    }

    fn write<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), RestError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_none() {
            writer.write_event(Event::Empty(start)).map_err(|e| xml_error(&e))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start)).map_err(|e| xml_error(&e))?;
        if let Some(text) = &self.text {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| xml_error(&e))?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(|e| xml_error(&e))?;
        Ok(())
    }
}

fn xml_error(e: &impl Display) -> RestError {
    RestError::Serialization(format!("Failed to write request payload: {e}"))
}

/// Wraps `body` in a `<tsRequest>` root and renders the document.
pub(crate) fn ts_request(body: Option<XmlElement>) -> Result<String, RestError> {
    let root = XmlElement::new("tsRequest").children(body);
    let mut writer = Writer::new(Vec::new());
    root.write(&mut writer)?;
    String::from_utf8(writer.into_inner())
        .map_err(|e| RestError::Serialization(format!("Request payload is not UTF-8: {e}")))
}

/// Decodes a response body into the envelope.
///
/// The rendering is sniffed from the body rather than taken from the request:
/// error bodies are sometimes XML even when JSON was requested. An empty body
/// decodes as an empty envelope.
pub(crate) fn decode_envelope(body: &[u8]) -> Result<TsResponse, RestError> {
    let text = std::str::from_utf8(body)
        .map_err(|e| RestError::Serialization(format!("Response is not UTF-8: {e}")))?;
    let trimmed = text.trim_start();

    if trimmed.is_empty() {
        return Ok(TsResponse::default());
    }

    if trimmed.starts_with('{') {
        serde_json::from_str(trimmed).map_err(|e| {
            RestError::Serialization(format!("Failed to parse JSON response: {e}"))
        })
    } else {
        quick_xml::de::from_str(trimmed)
            .map_err(|e| RestError::Serialization(format!("Failed to parse XML response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_payload() {
        let payload = ts_request(Some(
            XmlElement::new("credentials")
                .attr("name", "alice")
                .attr("password", "pw")
                .child(XmlElement::new("site").attr("contentUrl", "")),
        ))
        .unwrap();

        assert_eq!(
            payload,
            r#"<tsRequest><credentials name="alice" password="pw"><site contentUrl=""/></credentials></tsRequest>"#
        );
    }

    #[test]
    fn test_empty_request() {
        assert_eq!(ts_request(None).unwrap(), "<tsRequest/>");
    }

    #[test]
    fn test_attribute_values_are_escaped() {
        let payload = ts_request(Some(
            XmlElement::new("group").attr("name", r#"R&D "core" <team>"#),
        ))
        .unwrap();
        assert!(payload.contains("R&amp;D &quot;core&quot; &lt;team&gt;"));
    }

    #[test]
    fn test_attr_opt_skips_none() {
        let payload = ts_request(Some(
            XmlElement::new("project")
                .attr("name", "Finance")
                .attr_opt("parentProjectId", None),
        ))
        .unwrap();
        assert_eq!(payload, r#"<tsRequest><project name="Finance"/></tsRequest>"#);
    }

    #[test]
    fn test_text_content_is_escaped() {
        let payload = ts_request(Some(
            XmlElement::new("extensionsServerSettings")
                .child(XmlElement::leaf("extensionsGloballyEnabled", "true"))
                .child(XmlElement::leaf("blockList", "https://a.example.com/?x=1&y=2")),
        ))
        .unwrap();
        assert_eq!(
            payload,
            concat!(
                "<tsRequest><extensionsServerSettings>",
                "<extensionsGloballyEnabled>true</extensionsGloballyEnabled>",
                "<blockList>https://a.example.com/?x=1&amp;y=2</blockList>",
                "</extensionsServerSettings></tsRequest>",
            )
        );
    }

    #[test]
    fn test_decode_envelope_sniffs_rendering() {
        let xml = br#"<tsResponse><group id="G1" name="Analysts"/></tsResponse>"#;
        assert_eq!(decode_envelope(xml).unwrap().group.unwrap().name, "Analysts");

        let json = br#"{"group": {"id": "G1", "name": "Analysts"}}"#;
        assert_eq!(decode_envelope(json).unwrap().group.unwrap().id, "G1");

        assert_eq!(decode_envelope(b"  ").unwrap(), TsResponse::default());
    }

    #[test]
    fn test_decode_envelope_rejects_garbage() {
        assert!(matches!(
            decode_envelope(b"{not json"),
            Err(RestError::Serialization(_))
        ));
    }
}
