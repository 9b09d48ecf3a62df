use super::xml::Element;
use std::fmt;

// Error Handling
use miette::Result;
use vcprov_error::{LibError, VcprovError};

/// A server side object: its vim25 type and its identifier (ex: Datacenter:datacenter-2).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ManagedObjectReference {
    pub kind: String,
    pub value: String,
}
impl fmt::Display for ManagedObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

impl ManagedObjectReference {
    pub fn new(kind: &str, value: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            value: value.to_owned(),
        }
    }
    pub fn from_element(element: &Element) -> Result<Self, VcprovError> {
        match element.attr("type") {
            Some(kind) if !element.text.is_empty() => Ok(Self::new(kind, &element.text)),
            _ => {
                let message = format!(
                    "Malformed response: <{}> is not an object reference",
                    element.name
                );
                Err(LibError::builder()
                    .msg(&message)
                    .help("The endpoint may speak an unsupported api version")
                    .build()
                    .into())
            }
        }
    }
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_reference() -> Result<()> {
        let element = Element::parse(r#"<returnval type="Folder">group-v3</returnval>"#)?;
        let reference = ManagedObjectReference::from_element(&element)?;
        assert_eq!(reference, ManagedObjectReference::new("Folder", "group-v3"));
        assert_eq!(reference.to_string(), "Folder:group-v3");

        let element = Element::parse(r#"<returnval>group-v3</returnval>"#)?;
        assert!(ManagedObjectReference::from_element(&element).is_err());
        Ok(())
    }
}
