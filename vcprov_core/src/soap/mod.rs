pub mod envelope;
pub mod reference;
pub mod transport;
pub mod xml;

// Reexports
pub use envelope::XmlBuf;
pub use reference::ManagedObjectReference;
pub use transport::{HttpTransport, Response, Transport};
pub use xml::Element;

// Error Handling
use log::debug;
use miette::Result;
use vcprov_error::{LibError, SoapFault, VcprovError};

/**
* Call a vim25 method on a server side object.
* Returns the method response element (ex: <LoginResponse>).
*/
pub async fn call<T: Transport>(
    transport: &T,
    method: &str,
    this: &ManagedObjectReference,
    args: &XmlBuf,
) -> Result<Element, VcprovError> {
    debug!("soap call {} on {}", method, this);
    let body = envelope::request(method, this, args);
    let response = transport.round_trip(body).await?;
    decode(&response)
}

/// Extract the body content of a soap response, or its fault.
pub fn decode(response: &Response) -> Result<Element, VcprovError> {
    let root = match Element::parse(&response.body) {
        Ok(root) => root,
        Err(e) => {
            if response.is_success() {
                return Err(e);
            }
            return Err(http_error(response.status));
        }
    };
    let body = match root.child("Body") {
        Some(body) => body,
        None => {
            if !response.is_success() {
                return Err(http_error(response.status));
            }
            root.required_child("Body")?
        }
    };
    if let Some(fault) = body.child("Fault") {
        return Err(decode_fault(fault).into());
    }
    if !response.is_success() {
        return Err(http_error(response.status));
    }
    match body.children.first() {
        Some(content) => Ok(content.to_owned()),
        None => Err(LibError::builder()
            .msg("Malformed response: empty soap body")
            .help("The endpoint may speak an unsupported api version")
            .build()
            .into()),
    }
}

/**
* The fault name is the type of the first detail child
* (xsi:type="InvalidLogin" or <InvalidLoginFault>),
* or the soap faultcode when there is no detail.
*/
pub fn decode_fault(fault: &Element) -> SoapFault {
    let message = fault.child_text("faultstring").unwrap_or_default();
    let detail = fault.child("detail").and_then(|e| e.children.first());
    let name = match detail {
        Some(detail) => match &detail.kind {
            Some(kind) => kind.to_owned(),
            None => detail
                .name
                .strip_suffix("Fault")
                .unwrap_or(&detail.name)
                .to_owned(),
        },
        None => fault
            .child_text("faultcode")
            .unwrap_or("ServerFaultCode")
            .to_owned(),
    };
    SoapFault::builder().fault(&name).message(message).build()
}

fn http_error(status: u16) -> VcprovError {
    let message = format!("Http response error {}", status);
    LibError::builder()
        .msg(&message)
        .help("Check that the url points to the vSphere sdk endpoint (ex: https://<vcenter>/sdk)")
        .build()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_method_response() -> Result<()> {
        let mut content = XmlBuf::new();
        content.text("returnval", "ok");
        let response = Response::new(200, &envelope::response("Logout", &content));
        let element = decode(&response)?;
        assert_eq!(element.name, "LogoutResponse");
        assert_eq!(element.child_text("returnval"), Some("ok"));
        Ok(())
    }

    #[test]
    fn decode_vim_fault() {
        let body = envelope::fault(
            "InvalidLogin",
            "Cannot complete login due to an incorrect user name or password.",
        );
        let err = decode(&Response::new(500, &body)).unwrap_err();
        assert_eq!(err.fault_name(), Some("InvalidLogin"));
    }

    #[test]
    fn decode_fault_without_detail() -> Result<()> {
        let fault = Element::parse(
            "<Fault><faultcode>ClientFaultCode</faultcode><faultstring>bad</faultstring></Fault>",
        )?;
        let fault = decode_fault(&fault);
        assert_eq!(fault.fault, "ClientFaultCode");
        assert_eq!(fault.message, "bad");

        let fault = Element::parse(
            "<Fault><faultstring>nope</faultstring><detail><NotAuthenticatedFault/></detail></Fault>",
        )?;
        assert_eq!(decode_fault(&fault).fault, "NotAuthenticated");
        Ok(())
    }

    #[test]
    fn decode_http_error_without_soap_body() {
        let err = decode(&Response::new(404, "<html>not found</html>")).unwrap_err();
        assert_eq!(err.to_string(), "Http response error 404");

        let err = decode(&Response::new(503, "service unavailable")).unwrap_err();
        assert_eq!(err.to_string(), "Http response error 503");
    }
}
