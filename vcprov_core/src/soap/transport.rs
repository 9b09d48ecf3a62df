use std::future::Future;
use url::Url;

// Http
use reqwest::header::{HeaderValue, CONTENT_TYPE};

// Error Handling
use log::trace;
use miette::Result;
use vcprov_error::VcprovError;

pub const DEFAULT_API_VERSION: &str = "7.0";

pub trait Transport {
    /*
     * Send a soap envelope and return the raw answer.
     * Soap faults come back as a non 2xx response with a fault body,
     * they are decoded by the caller, not here.
     */
    fn round_trip(&self, body: String) -> impl Future<Output = Result<Response, VcprovError>> + Send;
}

impl<T> Transport for &T
where
    T: Transport + Sync,
{
    fn round_trip(&self, body: String) -> impl Future<Output = Result<Response, VcprovError>> + Send {
        (**self).round_trip(body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}
impl Response {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
        }
    }
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/**
* Soap over http(s).
* The session cookie set on login is kept in the client cookie jar
* and sent back on every following call.
*/
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
    action: String,
}

impl HttpTransport {
    pub fn new(url: &Url, insecure: bool, api_version: &str) -> Result<Self, VcprovError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(insecure)
            .build()?;
        Ok(Self {
            client,
            url: url.to_owned(),
            action: format!("urn:vim25/{api_version}"),
        })
    }
}

impl Transport for HttpTransport {
    async fn round_trip(&self, body: String) -> Result<Response, VcprovError> {
        trace!("{}", body);
        let response = self
            .client
            .post(self.url.clone())
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("text/xml; charset=utf-8"),
            )
            .header("SOAPAction", self.action.as_str())
            .body(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        trace!("{} {}", status, body);
        Ok(Response { status, body })
    }
}
