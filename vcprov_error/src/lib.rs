use bon::bon;
use miette::{Diagnostic, Report};
pub use pipelight_error::{CastError, TomlError};

use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum VcprovError {
    ////////////////////////////////
    // Lib native errors
    #[error(transparent)]
    #[diagnostic(transparent)]
    WrapError(#[from] WrapError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    LibError(#[from] LibError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    SoapFault(#[from] SoapFault),

    ////////////////////////////////
    // Type convertion
    #[error(transparent)]
    #[diagnostic(code(parse::error))]
    ParseError(#[from] url::ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    CastError(#[from] CastError),

    #[error(transparent)]
    #[diagnostic(code(vcprov::io::error))]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(vcprov::io::error))]
    Utf8Error(#[from] std::string::FromUtf8Error),

    ////////////////////////////////
    // Soap
    #[error(transparent)]
    #[diagnostic(code(xml::error))]
    XmlError(#[from] quick_xml::Error),

    #[error(transparent)]
    #[diagnostic(code(xml::error))]
    XmlAttrError(#[from] quick_xml::events::attributes::AttrError),

    // Http
    #[error(transparent)]
    #[diagnostic(code(reqwest::error))]
    HttpError(#[from] reqwest::Error),
}

/**
A config error with help higher origin
Can be recursively chained.
*/
#[derive(Debug, Error, Diagnostic)]
#[error("{}", message)]
#[diagnostic(code(vcprov::wrap::error))]
pub struct WrapError {
    pub message: String,
    #[diagnostic_source]
    pub origin: Report,
    #[help]
    pub help: String,
}

#[bon]
impl WrapError {
    #[builder]
    pub fn new(msg: &str, help: &str, origin: Report) -> Self {
        Self {
            message: msg.to_owned(),
            help: help.to_owned(),
            origin,
        }
    }
}

/**
A root cause error with no inner origin
*/
#[derive(Debug, Error, Diagnostic)]
#[error("{}", message)]
#[diagnostic(code(vcprov::lib::error))]
pub struct LibError {
    pub message: String,
    #[help]
    pub help: String,
}

#[bon]
impl LibError {
    #[builder]
    pub fn new(msg: &str, help: &str) -> Self {
        Self {
            message: msg.to_owned(),
            help: help.to_owned(),
        }
    }
}

/**
A fault returned by the vSphere endpoint in a soap response body.
The fault name is the vim25 fault type when the endpoint sent a detail
(ex: "InvalidLogin"), or the raw soap faultcode otherwise.
*/
#[derive(Debug, Error, Diagnostic)]
#[error("{}: {}", fault, message)]
#[diagnostic(code(vcprov::soap::fault))]
pub struct SoapFault {
    pub fault: String,
    pub message: String,
}

#[bon]
impl SoapFault {
    #[builder]
    pub fn new(fault: &str, message: &str) -> Self {
        Self {
            fault: fault.to_owned(),
            message: message.to_owned(),
        }
    }
}

impl VcprovError {
    /// The vim25 fault name if this error is a soap fault.
    pub fn fault_name(&self) -> Option<&str> {
        match self {
            VcprovError::SoapFault(e) => Some(&e.fault),
            _ => None,
        }
    }
}
