use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

// Error Handling
use miette::Result;
use vcprov_error::{LibError, VcprovError};

/**
* A decoded xml element.
*
* Names are local names: namespace prefixes are dropped
* ("soapenv:Body" -> "Body").
* The "xsi:type" attribute is moved to `kind`,
* any other attribute (ex: a reference "type") stays in `attributes`.
*/
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub kind: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn parse(xml: &str) -> Result<Self, VcprovError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = vec![];
        let mut root: Option<Element> = None;
        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(Self::from_start(&e)?),
                Event::Empty(e) => {
                    let element = Self::from_start(&e)?;
                    Self::attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        Self::attach(&mut stack, &mut root, element);
                    }
                }
                Event::Text(e) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&e.unescape()?);
                    }
                }
                Event::CData(e) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8(e.into_inner().to_vec())?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        match root {
            Some(root) => Ok(root),
            None => Err(LibError::builder()
                .msg("Couldn't find an xml root element")
                .help("The endpoint answered with an empty or truncated document")
                .build()
                .into()),
        }
    }

    fn from_start(start: &BytesStart) -> Result<Self, VcprovError> {
        let name = String::from_utf8(start.local_name().as_ref().to_vec())?;
        let mut element = Element {
            name,
            ..Default::default()
        };
        for attribute in start.attributes() {
            let attribute = attribute?;
            let raw_key = attribute.key.as_ref();
            // Namespace declarations
            if raw_key.starts_with(b"xmlns") {
                continue;
            }
            let key = String::from_utf8(attribute.key.local_name().as_ref().to_vec())?;
            let value = attribute.unescape_value()?.into_owned();
            if key == "type" && attribute.key.prefix().is_some() {
                element.kind = Some(strip_prefix(&value).to_owned());
            } else {
                element.attributes.push((key, value));
            }
        }
        Ok(element)
    }

    fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None => {
                if root.is_none() {
                    *root = Some(element);
                }
            }
        }
    }

    /// First child with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|e| e.name == name)
    }
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |e| e.name == name)
    }
    /// Descend through successive children.
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        let mut element = self;
        for name in path {
            element = element.child(name)?;
        }
        Some(element)
    }
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|e| e.text.as_str())
    }
    /// Child text or an error naming the missing field.
    pub fn required_text(&self, name: &str) -> Result<&str, VcprovError> {
        match self.child_text(name) {
            Some(text) => Ok(text),
            None => Err(missing(&self.name, name)),
        }
    }
    pub fn required_child(&self, name: &str) -> Result<&Element, VcprovError> {
        match self.child(name) {
            Some(child) => Ok(child),
            None => Err(missing(&self.name, name)),
        }
    }
}

fn missing(parent: &str, name: &str) -> VcprovError {
    let message = format!("Malformed response: <{parent}> has no <{name}>");
    LibError::builder()
        .msg(&message)
        .help("The endpoint may speak an unsupported api version")
        .build()
        .into()
}

fn strip_prefix(value: &str) -> &str {
    match value.split_once(':') {
        Some((_, local)) => local,
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_soap_response() -> Result<()> {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"
                xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
              <soapenv:Body>
                <RetrievePropertiesExResponse xmlns="urn:vim25">
                  <returnval>
                    <objects>
                      <obj type="Datacenter">datacenter-2</obj>
                      <propSet>
                        <name>name</name>
                        <val xsi:type="xsd:string">bogal &amp; co</val>
                      </propSet>
                    </objects>
                  </returnval>
                </RetrievePropertiesExResponse>
              </soapenv:Body>
            </soapenv:Envelope>"#;
        let root = Element::parse(xml)?;
        assert_eq!(root.name, "Envelope");

        let objects = root
            .find(&["Body", "RetrievePropertiesExResponse", "returnval", "objects"])
            .unwrap();
        let obj = objects.child("obj").unwrap();
        assert_eq!(obj.attr("type"), Some("Datacenter"));
        assert_eq!(obj.text, "datacenter-2");
        assert_eq!(obj.kind, None);

        let val = objects.find(&["propSet", "val"]).unwrap();
        assert_eq!(val.kind.as_deref(), Some("string"));
        assert_eq!(val.text, "bogal & co");
        Ok(())
    }

    #[test]
    fn parse_empty_elements() -> Result<()> {
        let root = Element::parse(r#"<a><b/><b x="1"></b><c>text</c></a>"#)?;
        assert_eq!(root.children_named("b").count(), 2);
        assert_eq!(root.children[1].attr("x"), Some("1"));
        assert_eq!(root.child_text("c"), Some("text"));
        assert!(root.required_text("d").is_err());
        Ok(())
    }

    #[test]
    fn reject_truncated_documents() {
        assert!(Element::parse("").is_err());
        assert!(Element::parse("<a><b></a>").is_err());
    }
}
