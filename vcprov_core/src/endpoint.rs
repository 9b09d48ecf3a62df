use std::fmt;
use url::Url;

// Error Handling
use log::debug;
use miette::Result;
use vcprov_error::{LibError, VcprovError};

pub const USERNAME_VAR: &str = "VC_USERNAME";
pub const PASSWORD_VAR: &str = "VC_PASSWORD";
pub const DEFAULT_PATH: &str = "/sdk";

/*
* A vSphere sdk endpoint.
* scheme://[username@]hostname[:port][/path]
*
* Only http and https are accepted.
* An empty path is completed with the default "/sdk" path.
*
* example:
* - "https://vcenter.example.com/sdk"
* - "https://10.0.0.12"
*/
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Endpoint {
    pub url: Url,
    pub credentials: Credentials,
}
impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Never print the password.
        let mut url = self.url.clone();
        if !self.credentials.username.is_empty() {
            url.set_username(&self.credentials.username).ok();
        }
        write!(f, "{}", url)
    }
}

#[derive(Default, Clone, Eq, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_owned(),
            password: password.to_owned(),
        }
    }
    /// Read credentials from VC_USERNAME and VC_PASSWORD.
    /// A missing variable is an empty string, the endpoint rejects it on login.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = lookup(USERNAME_VAR).unwrap_or_default();
        let password = lookup(PASSWORD_VAR).unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            debug!("incomplete credentials in {USERNAME_VAR}/{PASSWORD_VAR}");
        }
        Self { username, password }
    }
}

impl Endpoint {
    /// Helper to parse a url with lacking segments into a sdk endpoint.
    pub fn new(string: &str) -> Result<Self, VcprovError> {
        let mut url = Url::parse(string)?;
        match url.scheme() {
            "https" | "http" => {}
            scheme => {
                let message = format!("Unsupported endpoint scheme {:#?}", scheme);
                return Err(LibError::builder()
                    .msg(&message)
                    .help("Try https://<vcenter>/sdk")
                    .build()
                    .into());
            }
        };
        if url.host_str().is_none() {
            return Err(LibError::builder()
                .msg("Endpoint url has no host")
                .help("Try https://<vcenter>/sdk")
                .build()
                .into());
        }
        // An empty path is parsed as "/" by the Url lib.
        if url.path() == "/" || url.path().is_empty() {
            url.set_path(DEFAULT_PATH);
        }
        // Credentials only come from the environment.
        let res = url.set_username("").and(url.set_password(None));
        if res.is_err() {
            return Err(LibError::builder()
                .msg("Couldn't strip credentials from endpoint url")
                .help("Remove the user and password from the url, use VC_USERNAME and VC_PASSWORD")
                .build()
                .into());
        }
        Ok(Self {
            url,
            credentials: Credentials::default(),
        })
    }
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}
