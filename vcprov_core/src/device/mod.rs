pub mod disk;
pub mod encode;
pub mod ethernet;
pub mod scsi;

// Reexports
pub use disk::{DiskBacking, DiskMode, VirtualDisk};
pub use ethernet::{EthernetCard, EthernetCardKind, NetworkBacking};
pub use scsi::{ScsiController, ScsiControllerKind, SharingMode};

use std::collections::HashSet;
use strum::Display;

// Error Handling
use log::trace;
use miette::Result;
use vcprov_error::{LibError, VcprovError};

/// Keys handed out to new devices start below this one.
pub const NEW_KEY_BASE: i32 = -200;
/// Unit slots scanned on a controller.
const MAX_UNIT_NUMBER: usize = 30;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DeviceKind {
    ScsiController(ScsiController),
    Disk(VirtualDisk),
    EthernetCard(EthernetCard),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VirtualDevice {
    /// Negative keys are placeholders the server replaces on creation.
    pub key: i32,
    pub controller_key: Option<i32>,
    pub unit_number: Option<i32>,
    pub kind: DeviceKind,
}

impl VirtualDevice {
    /// The short type name (ex: "pvscsi", "disk", "vmxnet3").
    pub fn type_name(&self) -> String {
        match &self.kind {
            DeviceKind::ScsiController(e) => e.kind.to_string(),
            DeviceKind::Disk(_) => "disk".to_owned(),
            DeviceKind::EthernetCard(e) => e.kind.to_string(),
        }
    }
    pub fn name(&self) -> String {
        format!("{}{}", self.type_name(), self.key)
    }
    pub fn xsi_type(&self) -> &'static str {
        match &self.kind {
            DeviceKind::ScsiController(e) => e.kind.xsi_type(),
            DeviceKind::Disk(_) => "VirtualDisk",
            DeviceKind::EthernetCard(e) => e.kind.xsi_type(),
        }
    }
    pub fn as_scsi_controller(&self) -> Option<&ScsiController> {
        match &self.kind {
            DeviceKind::ScsiController(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DeviceOperation {
    Add,
    Remove,
    Edit,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FileOperation {
    Create,
    Destroy,
    Replace,
}

/// One entry of a vm configuration device change-set.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeviceConfigSpec {
    pub operation: DeviceOperation,
    pub file_operation: Option<FileOperation>,
    pub device: VirtualDevice,
}

/**
* An ordered list of virtual hardware.
* Devices reference each other by key:
* a disk points to its controller through `controller_key`,
* a controller lists its devices keys.
*/
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct VirtualDeviceList {
    devices: Vec<VirtualDevice>,
}

impl VirtualDeviceList {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&mut self, device: VirtualDevice) {
        trace!("add device {}", device.name());
        self.devices.push(device);
    }
    pub fn iter(&self) -> impl Iterator<Item = &VirtualDevice> {
        self.devices.iter()
    }
    pub fn len(&self) -> usize {
        self.devices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
    pub fn find_by_key(&self, key: i32) -> Option<&VirtualDevice> {
        self.devices.iter().find(|e| e.key == key)
    }

    /// A key lower than every key in the list.
    pub fn new_key(&self) -> i32 {
        let lowest = self
            .devices
            .iter()
            .map(|e| e.key)
            .min()
            .unwrap_or(NEW_KEY_BASE)
            .min(NEW_KEY_BASE);
        lowest - 1
    }

    pub fn create_scsi_controller(&self, name: &str) -> Result<VirtualDevice, VcprovError> {
        let kind = ScsiControllerKind::from_name(name)?;
        let bus_number = self.new_scsi_bus_number()?;
        Ok(VirtualDevice {
            key: self.new_key(),
            controller_key: None,
            unit_number: None,
            kind: DeviceKind::ScsiController(ScsiController::new(kind, bus_number)),
        })
    }

    pub fn create_disk(&self, capacity_in_kb: i64, backing: DiskBacking) -> VirtualDevice {
        VirtualDevice {
            key: self.new_key(),
            controller_key: None,
            unit_number: None,
            kind: DeviceKind::Disk(VirtualDisk {
                capacity_in_kb,
                backing,
            }),
        }
    }

    pub fn create_ethernet_card(
        &self,
        name: &str,
        backing: NetworkBacking,
    ) -> Result<VirtualDevice, VcprovError> {
        let kind = EthernetCardKind::from_name(name)?;
        Ok(VirtualDevice {
            key: self.new_key(),
            controller_key: None,
            unit_number: None,
            kind: DeviceKind::EthernetCard(EthernetCard { kind, backing }),
        })
    }

    /**
    * Attach a device to a controller of this list:
    * set its controller key and its first free unit number,
    * and register its key on the controller.
    */
    pub fn assign_controller(
        &mut self,
        device: &mut VirtualDevice,
        controller_key: i32,
    ) -> Result<(), VcprovError> {
        let unit_number = self.new_unit_number(controller_key)?;
        if device.key == 0 {
            device.key = self.new_key();
        }
        device.controller_key = Some(controller_key);
        device.unit_number = Some(unit_number);

        for e in self.devices.iter_mut() {
            if e.key == controller_key {
                if let DeviceKind::ScsiController(controller) = &mut e.kind {
                    controller.devices.push(device.key);
                }
            }
        }
        Ok(())
    }

    /// First free SCSI bus number.
    fn new_scsi_bus_number(&self) -> Result<i32, VcprovError> {
        let used: HashSet<i32> = self
            .devices
            .iter()
            .filter_map(|e| e.as_scsi_controller())
            .map(|e| e.bus_number)
            .collect();
        match scsi::SCSI_BUS_NUMBERS.iter().find(|e| !used.contains(*e)) {
            Some(bus_number) => Ok(*bus_number),
            None => Err(LibError::builder()
                .msg("Too many SCSI controllers")
                .help("A vm has at most 4 SCSI buses")
                .build()
                .into()),
        }
    }

    /// First free unit on a controller, the controller own unit is reserved.
    fn new_unit_number(&self, controller_key: i32) -> Result<i32, VcprovError> {
        let controller = match self.find_by_key(controller_key).and_then(|e| e.as_scsi_controller()) {
            Some(controller) => controller,
            None => {
                let message = format!("No controller with key {} in the device list", controller_key);
                let help = "Push the controller to the list before attaching devices to it";
                return Err(LibError::builder().msg(&message).help(help).build().into());
            }
        };
        let mut units = [false; MAX_UNIT_NUMBER];
        if let Some(unit) = units.get_mut(controller.scsi_ctlr_unit_number as usize) {
            *unit = true;
        }
        for device in &self.devices {
            if device.controller_key == Some(controller_key) {
                if let Some(unit) = device.unit_number {
                    if let Some(slot) = units.get_mut(unit as usize) {
                        *slot = true;
                    }
                }
            }
        }
        match units.iter().position(|used| !used) {
            Some(unit) => Ok(unit as i32),
            None => {
                let message = format!("No free unit on controller {}", controller_key);
                let help = "Add another SCSI controller for the remaining disks";
                Err(LibError::builder().msg(&message).help(help).build().into())
            }
        }
    }

    /**
    * Turn the list into a device change-set.
    * New disks get a file operation, disks attaching an existing file do not.
    * Fails if keys are not unique or a controller reference dangles.
    */
    pub fn config_spec(
        &self,
        operation: DeviceOperation,
    ) -> Result<Vec<DeviceConfigSpec>, VcprovError> {
        self.check_references()?;

        let file_operation = match operation {
            DeviceOperation::Add => FileOperation::Create,
            DeviceOperation::Edit => FileOperation::Replace,
            DeviceOperation::Remove => FileOperation::Destroy,
        };
        let mut specs = vec![];
        for device in &self.devices {
            let mut spec = DeviceConfigSpec {
                operation,
                file_operation: None,
                device: device.to_owned(),
            };
            if let DeviceKind::Disk(disk) = &device.kind {
                spec.file_operation = Some(file_operation);
                if operation == DeviceOperation::Add && disk.is_existing() {
                    spec.file_operation = None;
                }
            }
            specs.push(spec);
        }
        Ok(specs)
    }

    fn check_references(&self) -> Result<(), VcprovError> {
        let mut keys = HashSet::new();
        for device in &self.devices {
            if !keys.insert(device.key) {
                let message = format!("Duplicate device key {}", device.key);
                let help = "Allocate device keys with VirtualDeviceList::new_key";
                return Err(LibError::builder().msg(&message).help(help).build().into());
            }
        }
        for device in &self.devices {
            if let Some(controller_key) = device.controller_key {
                let is_controller = self
                    .find_by_key(controller_key)
                    .and_then(|e| e.as_scsi_controller())
                    .is_some();
                if !is_controller {
                    let message = format!(
                        "Device {} references missing controller {}",
                        device.name(),
                        controller_key
                    );
                    let help = "Attach devices to a controller of the same list";
                    return Err(LibError::builder().msg(&message).help(help).build().into());
                }
            }
        }
        Ok(())
    }
}
