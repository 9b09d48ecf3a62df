use super::reference::ManagedObjectReference;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use std::fmt::{self, Display};

pub const SOAPENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const VIM25_NS: &str = "urn:vim25";

/**
* An append only xml buffer over a quick-xml writer.
* Element order matters to the vim25 schema,
* so values are written in the order the caller emits them.
*/
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct XmlBuf {
    inner: Vec<u8>,
}
impl Display for XmlBuf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl XmlBuf {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn as_str(&self) -> &str {
        // Only str events are ever written.
        std::str::from_utf8(&self.inner).unwrap_or_default()
    }
    fn write(&mut self, event: Event) -> &mut Self {
        {
            let mut writer = Writer::new(&mut self.inner);
            // Writing into a Vec can't fail.
            let _ = writer.write_event(event);
        }
        self
    }
    pub fn open(&mut self, name: &str) -> &mut Self {
        self.write(Event::Start(BytesStart::new(name)))
    }
    /// Open a tag carrying an explicit "xsi:type" for polymorphic vim25 values.
    pub fn open_typed(&mut self, name: &str, xsi_type: &str) -> &mut Self {
        self.open_with(name, &[("xsi:type", xsi_type)])
    }
    pub fn open_with(&mut self, name: &str, attributes: &[(&str, &str)]) -> &mut Self {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.write(Event::Start(start))
    }
    pub fn close(&mut self, name: &str) -> &mut Self {
        self.write(Event::End(BytesEnd::new(name)))
    }
    /// Escaped character data inside the current tag.
    fn chars(&mut self, value: &str) -> &mut Self {
        self.write(Event::Text(BytesText::new(value)))
    }
    /// <name>value</name>, value is escaped.
    pub fn text<V: Display>(&mut self, name: &str, value: V) -> &mut Self {
        let value = value.to_string();
        self.open(name).chars(&value).close(name)
    }
    /// <name xsi:type="xsd:string">value</name>, for polymorphic property values.
    pub fn typed_text<V: Display>(&mut self, name: &str, xsi_type: &str, value: V) -> &mut Self {
        let value = value.to_string();
        self.open_typed(name, xsi_type).chars(&value).close(name)
    }
    pub fn opt_text<V: Display>(&mut self, name: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.text(name, value);
        }
        self
    }
    /// <name type="Kind">value</name>
    pub fn reference(&mut self, name: &str, reference: &ManagedObjectReference) -> &mut Self {
        self.open_with(name, &[("type", &reference.kind)])
            .chars(&reference.value)
            .close(name)
    }
    /// A reference used as a polymorphic property value.
    pub fn typed_reference(
        &mut self,
        name: &str,
        reference: &ManagedObjectReference,
    ) -> &mut Self {
        self.open_with(
            name,
            &[
                ("xsi:type", "ManagedObjectReference"),
                ("type", &reference.kind),
            ],
        )
        .chars(&reference.value)
        .close(name)
    }
    pub fn append(&mut self, other: &XmlBuf) -> &mut Self {
        self.inner.extend_from_slice(&other.inner);
        self
    }
}

/// Wrap a vim25 method call into a soap request envelope.
pub fn request(method: &str, this: &ManagedObjectReference, args: &XmlBuf) -> String {
    let mut body = XmlBuf::new();
    body.open_with(method, &[("xmlns", VIM25_NS)])
        .reference("_this", this)
        .append(args)
        .close(method);
    wrap(&body)
}

/// Wrap a method response (ex: "LoginResponse") into a soap envelope.
pub fn response(method: &str, content: &XmlBuf) -> String {
    let name = format!("{method}Response");
    let mut body = XmlBuf::new();
    body.open_with(&name, &[("xmlns", VIM25_NS)])
        .append(content)
        .close(&name);
    wrap(&body)
}

/// A soap fault envelope with a vim25 fault detail.
pub fn fault(fault: &str, message: &str) -> String {
    let detail = format!("{fault}Fault");
    let mut body = XmlBuf::new();
    body.open("soapenv:Fault")
        .text("faultcode", "ServerFaultCode")
        .text("faultstring", message)
        .open("detail")
        .open_with(&detail, &[("xmlns", VIM25_NS), ("xsi:type", fault)])
        .close(&detail)
        .close("detail")
        .close("soapenv:Fault");
    wrap(&body)
}

fn wrap(body: &XmlBuf) -> String {
    let mut envelope = XmlBuf::new();
    envelope
        .write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .open_with(
            "soapenv:Envelope",
            &[
                ("xmlns:soapenv", SOAPENV_NS),
                ("xmlns:xsd", XSD_NS),
                ("xmlns:xsi", XSI_NS),
            ],
        )
        .open("soapenv:Body")
        .append(body)
        .close("soapenv:Body")
        .close("soapenv:Envelope");
    envelope.to_string()
}
