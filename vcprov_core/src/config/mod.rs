pub mod load;

use crate::device::disk::DEFAULT_CAPACITY_KB;
use crate::device::DiskMode;
use crate::soap::transport::DEFAULT_API_VERSION;
use crate::vm::Firmware;

// Config
use serde::{Deserialize, Serialize};

pub const CONFIG_DIR: &str = "/etc/vcprov";

/*
* The provisioning configuration.
* Every field has a built-in default,
* a toml file only needs to carry the values it overrides.
*/
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvisionConfig {
    pub datacenter: String,
    pub datastore: String,
    /// Resource pool path relative to the datacenter host folder.
    /// The compute resource root pool is used when unset.
    pub resource_pool: Option<String>,
    /// Skip tls certificate verification.
    pub insecure: bool,
    pub api_version: String,
    pub vm: VmTemplate,
    pub disk: DiskTemplate,
    pub net: NetTemplate,
}
impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            datacenter: "bogal".to_owned(),
            datastore: "datastore1".to_owned(),
            resource_pool: None,
            insecure: false,
            api_version: DEFAULT_API_VERSION.to_owned(),
            vm: VmTemplate::default(),
            disk: DiskTemplate::default(),
            net: NetTemplate::default(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VmTemplate {
    pub name: String,
    pub guest_id: String,
    pub vcpu: i32,
    /// Memory in MB
    pub memory_mb: i64,
    pub annotation: String,
    pub firmware: Firmware,
}
impl Default for VmTemplate {
    fn default() -> Self {
        Self {
            name: "test-vm".to_owned(),
            guest_id: "otherGuest".to_owned(),
            vcpu: 1,
            memory_mb: 1024,
            annotation: "Test annotation".to_owned(),
            firmware: Firmware::Efi,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiskTemplate {
    /// SCSI controller type (ex: "pvscsi", "lsilogic").
    pub controller: String,
    pub capacity_kb: i64,
    pub thin: bool,
    pub mode: DiskMode,
}
impl Default for DiskTemplate {
    fn default() -> Self {
        Self {
            controller: "pvscsi".to_owned(),
            capacity_kb: DEFAULT_CAPACITY_KB,
            thin: true,
            mode: DiskMode::Persistent,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetTemplate {
    /// Ethernet card type (ex: "vmxnet3", "e1000").
    pub adapter: String,
    pub port_group: String,
}
impl Default for NetTemplate {
    fn default() -> Self {
        Self {
            adapter: "vmxnet3".to_owned(),
            port_group: "VM Network".to_owned(),
        }
    }
}
