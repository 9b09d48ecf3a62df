use crate::config::VmTemplate;
use crate::device::DeviceConfigSpec;
use crate::finder::{Datastore, Folder, ResourcePool};
use crate::session::Client;
use crate::soap::{ManagedObjectReference, Transport, XmlBuf};
use crate::task::Task;

use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// Error Handling
use log::{debug, info};
use miette::Result;
use vcprov_error::{LibError, VcprovError};

#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Firmware {
    Bios,
    #[default]
    Efi,
}

#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct VmFileInfo {
    /// Datastore path of the vm directory (ex: "[datastore1]").
    pub vm_path_name: String,
}
impl VmFileInfo {
    /// Let the server create the vm directory at the datastore root.
    pub fn on_datastore(datastore: &Datastore) -> Self {
        Self {
            vm_path_name: format!("[{}]", datastore.name()),
        }
    }
}

/// The virtual machine creation request.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VmConfigSpec {
    pub name: String,
    pub guest_id: String,
    pub num_cpus: i32,
    pub memory_mb: i64,
    pub annotation: String,
    pub firmware: Firmware,
    pub files: Option<VmFileInfo>,
    pub device_change: Vec<DeviceConfigSpec>,
}

impl From<&VmTemplate> for VmConfigSpec {
    fn from(e: &VmTemplate) -> Self {
        Self {
            name: e.name.to_owned(),
            guest_id: e.guest_id.to_owned(),
            num_cpus: e.vcpu,
            memory_mb: e.memory_mb,
            annotation: e.annotation.to_owned(),
            firmware: e.firmware,
            files: None,
            device_change: vec![],
        }
    }
}

impl VmConfigSpec {
    pub fn write_xml(&self, name: &str, w: &mut XmlBuf) {
        w.open(name)
            .text("name", &self.name)
            .text("guestId", &self.guest_id)
            .text("annotation", &self.annotation);
        if let Some(files) = &self.files {
            w.open("files")
                .text("vmPathName", &files.vm_path_name)
                .close("files");
        }
        w.text("numCPUs", self.num_cpus)
            .text("memoryMB", self.memory_mb);
        for change in &self.device_change {
            change.write_xml("deviceChange", w);
        }
        w.text("firmware", self.firmware).close(name);
    }
}

impl Folder {
    /**
    * Submit CreateVM_Task on this vm folder.
    * Returns as soon as the server accepted the request,
    * the returned task tracks the actual creation.
    */
    pub async fn create_vm<T: Transport>(
        &self,
        client: &Client<T>,
        spec: &VmConfigSpec,
        pool: &ResourcePool,
        host: Option<&ManagedObjectReference>,
    ) -> Result<Task, VcprovError> {
        if spec.files.is_none() {
            return Err(LibError::builder()
                .msg("Missing vm file placement")
                .help("Set the vm files datastore before submitting the vm")
                .build()
                .into());
        }
        let mut args = XmlBuf::new();
        spec.write_xml("config", &mut args);
        args.reference("pool", &pool.reference);
        if let Some(host) = host {
            args.reference("host", host);
        }
        debug!("{}", args);

        let response = client.call("CreateVM_Task", &self.reference, &args).await?;
        let reference = ManagedObjectReference::from_element(response.required_child("returnval")?)?;
        info!(
            "{} submitted vm {} in {} ({})",
            "[create]".yellow(),
            spec.name.bold(),
            self.path,
            reference
        );
        Ok(Task { reference })
    }
}
