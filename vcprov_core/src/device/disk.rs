use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// 1 GiB
pub const DEFAULT_CAPACITY_KB: i64 = 1024 * 1024;

#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum DiskMode {
    #[default]
    #[strum(serialize = "persistent")]
    #[serde(rename = "persistent")]
    Persistent,
    #[strum(serialize = "nonpersistent")]
    #[serde(rename = "nonpersistent")]
    NonPersistent,
    #[strum(serialize = "undoable")]
    #[serde(rename = "undoable")]
    Undoable,
    #[strum(serialize = "independent_persistent")]
    #[serde(rename = "independent_persistent")]
    IndependentPersistent,
    #[strum(serialize = "independent_nonpersistent")]
    #[serde(rename = "independent_nonpersistent")]
    IndependentNonPersistent,
    #[strum(serialize = "append")]
    #[serde(rename = "append")]
    Append,
}

/**
* A flat vmdk backing.
* An empty file name lets the server place the disk next to the vm files.
*/
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DiskBacking {
    pub file_name: String,
    pub disk_mode: DiskMode,
    pub thin_provisioned: Option<bool>,
    /// Parent disk file of a child (delta) disk.
    pub parent: Option<String>,
}
impl DiskBacking {
    pub fn new(disk_mode: DiskMode, thin_provisioned: bool) -> Self {
        Self {
            file_name: String::new(),
            disk_mode,
            thin_provisioned: Some(thin_provisioned),
            parent: None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VirtualDisk {
    pub capacity_in_kb: i64,
    pub backing: DiskBacking,
}
impl VirtualDisk {
    /// A disk without capacity nor parent attaches an existing vmdk.
    pub fn is_existing(&self) -> bool {
        self.capacity_in_kb == 0 && self.backing.parent.is_none()
    }
}
