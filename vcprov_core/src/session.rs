use crate::endpoint::{Credentials, Endpoint};
use crate::soap::{self, Element, ManagedObjectReference, Transport, XmlBuf};

use owo_colors::OwoColorize;

// Error Handling
use log::{debug, info};
use miette::Result;
use vcprov_error::VcprovError;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AboutInfo {
    pub full_name: String,
    pub api_version: String,
}

/// The entry points of the vSphere inventory and services.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ServiceContent {
    pub root_folder: ManagedObjectReference,
    pub property_collector: ManagedObjectReference,
    pub session_manager: ManagedObjectReference,
    pub search_index: ManagedObjectReference,
    pub about: AboutInfo,
}
impl ServiceContent {
    pub fn service_instance() -> ManagedObjectReference {
        ManagedObjectReference::new("ServiceInstance", "ServiceInstance")
    }
    pub fn from_element(returnval: &Element) -> Result<Self, VcprovError> {
        let reference = |name: &str| -> Result<ManagedObjectReference, VcprovError> {
            ManagedObjectReference::from_element(returnval.required_child(name)?)
        };
        let about = returnval.required_child("about")?;
        Ok(Self {
            root_folder: reference("rootFolder")?,
            property_collector: reference("propertyCollector")?,
            session_manager: reference("sessionManager")?,
            search_index: reference("searchIndex")?,
            about: AboutInfo {
                full_name: about.child_text("fullName").unwrap_or_default().to_owned(),
                api_version: about.child_text("apiVersion").unwrap_or_default().to_owned(),
            },
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UserSession {
    pub key: String,
    pub user_name: String,
}

/**
* An authenticated vim25 client.
* Every call goes through the same transport,
* so the session established on login is reused.
*/
#[derive(Debug)]
pub struct Client<T> {
    transport: T,
    pub service_content: ServiceContent,
    pub session: Option<UserSession>,
}

impl<T: Transport> Client<T> {
    /// Retrieve the service content and login with the endpoint credentials.
    pub async fn new(endpoint: &Endpoint, transport: T) -> Result<Self, VcprovError> {
        let mut client = Self::connect(transport).await?;
        info!(
            "{} connected to {} ({})",
            "[session]".yellow(),
            endpoint.host().bold(),
            client.service_content.about.full_name
        );
        client.login(&endpoint.credentials).await?;
        Ok(client)
    }
    /// Retrieve the service content without authenticating.
    pub async fn connect(transport: T) -> Result<Self, VcprovError> {
        let response = soap::call(
            &transport,
            "RetrieveServiceContent",
            &ServiceContent::service_instance(),
            &XmlBuf::new(),
        )
        .await?;
        let service_content = ServiceContent::from_element(response.required_child("returnval")?)?;
        debug!("{:#?}", service_content);
        Ok(Self {
            transport,
            service_content,
            session: None,
        })
    }
    pub async fn login(&mut self, credentials: &Credentials) -> Result<&UserSession, VcprovError> {
        let mut args = XmlBuf::new();
        args.text("userName", &credentials.username)
            .text("password", &credentials.password);
        let session_manager = self.service_content.session_manager.clone();
        let response = self.call("Login", &session_manager, &args).await?;
        let returnval = response.required_child("returnval")?;
        let session = UserSession {
            key: returnval.child_text("key").unwrap_or_default().to_owned(),
            user_name: returnval
                .child_text("userName")
                .unwrap_or(credentials.username.as_str())
                .to_owned(),
        };
        info!(
            "{} logged in as {}",
            "[session]".yellow(),
            session.user_name.green()
        );
        let session: &UserSession = self.session.insert(session);
        Ok(session)
    }
    pub async fn logout(&mut self) -> Result<(), VcprovError> {
        let session_manager = self.service_content.session_manager.clone();
        self.call("Logout", &session_manager, &XmlBuf::new()).await?;
        self.session = None;
        debug!("logged out");
        Ok(())
    }
    pub async fn call(
        &self,
        method: &str,
        this: &ManagedObjectReference,
        args: &XmlBuf,
    ) -> Result<Element, VcprovError> {
        soap::call(&self.transport, method, this, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{Inventory, Simulator};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn login_with_valid_credentials() -> Result<()> {
        let sim = Simulator::default();
        let endpoint = Endpoint::new("https://vcenter/sdk")?.with_credentials(sim.credentials());
        let mut client = Client::new(&endpoint, &sim).await?;
        assert_eq!(
            client.service_content.root_folder,
            ManagedObjectReference::new("Folder", "group-d1")
        );
        assert!(client.session.is_some());
        assert!(sim.logged_in());

        client.logout().await?;
        assert!(!sim.logged_in());
        Ok(())
    }

    #[tokio::test]
    async fn login_with_empty_credentials_fails() -> Result<()> {
        let sim = Simulator::new(Inventory::default());
        let endpoint = Endpoint::new("https://vcenter/sdk")?;
        let err = Client::new(&endpoint, &sim).await.unwrap_err();
        assert_eq!(err.fault_name(), Some("InvalidLogin"));
        assert_eq!(sim.calls(), vec!["RetrieveServiceContent", "Login"]);
        Ok(())
    }
}
