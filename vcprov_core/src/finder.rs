use crate::property::{self, PropertyFilter};
use crate::session::Client;
use crate::soap::{ManagedObjectReference, Transport, XmlBuf};

use owo_colors::OwoColorize;

// Error Handling
use log::{debug, info};
use miette::Result;
use vcprov_error::{LibError, VcprovError};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Datacenter {
    pub reference: ManagedObjectReference,
    /// Inventory path (ex: "bogal").
    pub path: String,
}
impl Datacenter {
    pub fn name(&self) -> &str {
        base_name(&self.path)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Datastore {
    pub reference: ManagedObjectReference,
    pub path: String,
}
impl Datastore {
    pub fn name(&self) -> &str {
        base_name(&self.path)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResourcePool {
    pub reference: ManagedObjectReference,
    pub path: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Folder {
    pub reference: ManagedObjectReference,
    pub path: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DatacenterFolders {
    pub vm_folder: Folder,
    pub host_folder: Folder,
    pub datastore_folder: Folder,
    pub network_folder: Folder,
}

impl Datacenter {
    /// Read the datacenter top level folders.
    pub async fn folders<T: Transport>(
        &self,
        client: &Client<T>,
    ) -> Result<DatacenterFolders, VcprovError> {
        let names = ["vmFolder", "hostFolder", "datastoreFolder", "networkFolder"];
        let filter = PropertyFilter::builder()
            .obj(self.reference.clone())
            .kind("Datacenter")
            .path_set(names.iter().map(|e| e.to_string()).collect())
            .build();
        let objects = property::retrieve(client, &filter).await?;
        let content = match objects.first() {
            Some(content) => content,
            None => return Err(not_found("datacenter", &self.path)),
        };
        let folder = |property: &str, dir: &str| -> Result<Folder, VcprovError> {
            match content.reference(property) {
                Some(reference) => Ok(Folder {
                    reference,
                    path: format!("{}/{}", self.path, dir),
                }),
                None => {
                    let message = format!("Datacenter {:#?} has no {}", self.path, property);
                    let help = "The account needs read access on the datacenter folders";
                    Err(LibError::builder().msg(&message).help(help).build().into())
                }
            }
        };
        let folders = DatacenterFolders {
            vm_folder: folder("vmFolder", "vm")?,
            host_folder: folder("hostFolder", "host")?,
            datastore_folder: folder("datastoreFolder", "datastore")?,
            network_folder: folder("networkFolder", "network")?,
        };
        debug!("{:#?}", folders);
        Ok(folders)
    }
}

/**
* Resolve inventory objects by path.
* Once a datacenter is set, relative datastore and resource pool
* paths are looked up under that datacenter folders.
*/
#[derive(Debug)]
pub struct Finder<'a, T> {
    client: &'a Client<T>,
    datacenter: Option<Datacenter>,
}

impl<'a, T: Transport> Finder<'a, T> {
    pub fn new(client: &'a Client<T>) -> Self {
        Self {
            client,
            datacenter: None,
        }
    }
    pub fn set_datacenter(&mut self, datacenter: &Datacenter) {
        self.datacenter = Some(datacenter.to_owned());
    }
    pub fn datacenter_or_err(&self) -> Result<&Datacenter, VcprovError> {
        match &self.datacenter {
            Some(datacenter) => Ok(datacenter),
            None => Err(LibError::builder()
                .msg("No default datacenter set")
                .help("Find a datacenter and set it as default first")
                .build()
                .into()),
        }
    }

    pub async fn datacenter(&self, path: &str) -> Result<Datacenter, VcprovError> {
        let path = normalize(path);
        let reference = self.lookup("datacenter", &path, "Datacenter").await?;
        info!("{} found datacenter {}", "[find]".yellow(), path.bold());
        Ok(Datacenter { reference, path })
    }

    pub async fn datastore(&self, name: &str) -> Result<Datastore, VcprovError> {
        let datacenter = self.datacenter_or_err()?;
        let path = format!("{}/datastore/{}", datacenter.path, normalize(name));
        let reference = self.lookup("datastore", &path, "Datastore").await?;
        info!("{} found datastore {}", "[find]".yellow(), path.bold());
        Ok(Datastore { reference, path })
    }

    /// A resource pool path relative to the datacenter host folder
    /// (ex: "cluster1/Resources/dev").
    pub async fn resource_pool(&self, path: &str) -> Result<ResourcePool, VcprovError> {
        let datacenter = self.datacenter_or_err()?;
        let path = format!("{}/host/{}", datacenter.path, normalize(path));
        let reference = self.lookup("resource pool", &path, "ResourcePool").await?;
        info!("{} found resource pool {}", "[find]".yellow(), path.bold());
        Ok(ResourcePool { reference, path })
    }

    /// The root pool of the single compute resource
    /// directly under the datacenter host folder ("*/Resources").
    pub async fn default_resource_pool(&self) -> Result<ResourcePool, VcprovError> {
        let datacenter = self.datacenter_or_err()?;
        let folders = datacenter.folders(self.client).await?;
        let filter = PropertyFilter::builder()
            .obj(folders.host_folder.reference.clone())
            .kind("ComputeResource")
            .path_set(vec!["name".to_owned(), "resourcePool".to_owned()])
            .skip(true)
            .traverse_children(true)
            .build();
        let objects = property::retrieve(self.client, &filter).await?;
        let wildcard = format!("{}/*/Resources", folders.host_folder.path);
        let mut pools = vec![];
        for object in &objects {
            if let Some(reference) = object.reference("resourcePool") {
                let name = object.text("name").unwrap_or(object.obj.value.as_str());
                let path = format!("{}/{}/Resources", folders.host_folder.path, name);
                pools.push(ResourcePool { reference, path });
            }
        }
        match pools.len() {
            0 => Err(not_found("resource pool", &wildcard)),
            1 => {
                let pool = pools.remove(0);
                info!(
                    "{} found default resource pool {}",
                    "[find]".yellow(),
                    pool.path.bold()
                );
                Ok(pool)
            }
            _ => {
                let paths = pools
                    .iter()
                    .map(|e| e.path.to_owned())
                    .collect::<Vec<String>>()
                    .join(",");
                let help = format!("Set one of [{paths}] as resource_pool in the configuration");
                Err(LibError::builder()
                    .msg("Default resource pool resolves to multiple instances")
                    .help(&help)
                    .build()
                    .into())
            }
        }
    }

    /// SearchIndex.FindByInventoryPath, checking the returned type.
    async fn lookup(
        &self,
        what: &str,
        path: &str,
        kind: &str,
    ) -> Result<ManagedObjectReference, VcprovError> {
        let search_index = self.client.service_content.search_index.clone();
        let mut args = XmlBuf::new();
        args.text("inventoryPath", path);
        let response = self
            .client
            .call("FindByInventoryPath", &search_index, &args)
            .await?;
        let reference = match response.child("returnval") {
            Some(returnval) => ManagedObjectReference::from_element(returnval)?,
            None => return Err(not_found(what, path)),
        };
        if !reference.is(kind) {
            let message = format!("{:#?} is a {}, not a {}", path, reference.kind, kind);
            let help = format!("Point the {what} setting at a {kind}");
            return Err(LibError::builder().msg(&message).help(&help).build().into());
        }
        debug!("{} {:#?} is {}", what, path, reference);
        Ok(reference)
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_owned()
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn not_found(what: &str, path: &str) -> VcprovError {
    let message = format!("{} {:#?} not found", what, path);
    let help = format!("Check that the {what} exists and is visible to this user");
    LibError::builder().msg(&message).help(&help).build().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Endpoint;
    use crate::simulator::{Inventory, Simulator};
    use pretty_assertions::assert_eq;

    async fn client(sim: &Simulator) -> Result<Client<&Simulator>> {
        let endpoint = Endpoint::new("https://vcenter/sdk")?.with_credentials(sim.credentials());
        Ok(Client::new(&endpoint, sim).await?)
    }

    #[tokio::test]
    async fn find_datacenter_and_folders() -> Result<()> {
        let sim = Simulator::default();
        let client = client(&sim).await?;
        let finder = Finder::new(&client);

        let dc = finder.datacenter("/bogal").await?;
        assert_eq!(dc.name(), "bogal");
        assert_eq!(dc.reference.kind, "Datacenter");

        let folders = dc.folders(&client).await?;
        assert_eq!(folders.vm_folder.path, "bogal/vm");
        assert_eq!(folders.vm_folder.reference.value, "group-v3");
        assert_eq!(folders.host_folder.reference.value, "group-h4");
        Ok(())
    }

    #[tokio::test]
    async fn missing_datacenter_is_not_found() -> Result<()> {
        let sim = Simulator::new(Inventory {
            datacenter: Some("other".to_owned()),
            ..Default::default()
        });
        let client = client(&sim).await?;
        let err = Finder::new(&client).datacenter("bogal").await.unwrap_err();
        assert_eq!(err.to_string(), "datacenter \"bogal\" not found");
        Ok(())
    }

    #[tokio::test]
    async fn reject_path_of_another_type() -> Result<()> {
        let sim = Simulator::default();
        let client = client(&sim).await?;
        let err = Finder::new(&client).datacenter("bogal/vm").await.unwrap_err();
        assert_eq!(err.to_string(), "\"bogal/vm\" is a Folder, not a Datacenter");
        Ok(())
    }

    #[tokio::test]
    async fn datastore_requires_a_datacenter() -> Result<()> {
        let sim = Simulator::default();
        let client = client(&sim).await?;
        let mut finder = Finder::new(&client);
        assert!(finder.datastore("datastore1").await.is_err());

        let dc = finder.datacenter("bogal").await?;
        finder.set_datacenter(&dc);
        let ds = finder.datastore("datastore1").await?;
        assert_eq!(ds.name(), "datastore1");
        assert_eq!(ds.path, "bogal/datastore/datastore1");

        let err = finder.datastore("datastore2").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "datastore \"bogal/datastore/datastore2\" not found"
        );
        Ok(())
    }

    #[tokio::test]
    async fn default_resource_pool_needs_a_single_compute_resource() -> Result<()> {
        let sim = Simulator::default();
        let client = client(&sim).await?;
        let mut finder = Finder::new(&client);
        let dc = finder.datacenter("bogal").await?;
        finder.set_datacenter(&dc);

        let pool = finder.default_resource_pool().await?;
        assert_eq!(pool.path, "bogal/host/cluster1/Resources");
        assert_eq!(pool.reference.kind, "ResourcePool");

        sim.add_compute_resource("cluster2");
        let err = finder.default_resource_pool().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Default resource pool resolves to multiple instances"
        );

        // A named pool is still reachable.
        let pool = finder.resource_pool("cluster2/Resources").await?;
        assert_eq!(pool.path, "bogal/host/cluster2/Resources");
        Ok(())
    }

    #[tokio::test]
    async fn default_resource_pool_without_compute_resource() -> Result<()> {
        let sim = Simulator::new(Inventory {
            compute_resources: vec![],
            ..Default::default()
        });
        let client = client(&sim).await?;
        let mut finder = Finder::new(&client);
        let dc = finder.datacenter("bogal").await?;
        finder.set_datacenter(&dc);
        let err = finder.default_resource_pool().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "resource pool \"bogal/host/*/Resources\" not found"
        );
        Ok(())
    }
}
