use super::{DeviceConfigSpec, DeviceKind, DiskBacking, NetworkBacking, VirtualDevice};
use crate::soap::XmlBuf;

// Element order follows the vim25 schema sequences:
// VirtualDevice fields first, then the subtype fields.

impl DeviceConfigSpec {
    pub fn write_xml(&self, name: &str, w: &mut XmlBuf) {
        w.open(name)
            .text("operation", self.operation)
            .opt_text("fileOperation", self.file_operation);
        self.device.write_xml("device", w);
        w.close(name);
    }
}

impl VirtualDevice {
    pub fn write_xml(&self, name: &str, w: &mut XmlBuf) {
        w.open_typed(name, self.xsi_type()).text("key", self.key);
        match &self.kind {
            DeviceKind::Disk(disk) => disk.backing.write_xml("backing", w),
            DeviceKind::EthernetCard(card) => card.backing.write_xml("backing", w),
            DeviceKind::ScsiController(_) => {}
        }
        w.opt_text("controllerKey", self.controller_key)
            .opt_text("unitNumber", self.unit_number);
        match &self.kind {
            DeviceKind::ScsiController(controller) => {
                w.text("busNumber", controller.bus_number);
                for key in &controller.devices {
                    w.text("device", key);
                }
                w.text("sharedBus", controller.shared_bus)
                    .text("scsiCtlrUnitNumber", controller.scsi_ctlr_unit_number);
            }
            DeviceKind::Disk(disk) => {
                w.text("capacityInKB", disk.capacity_in_kb);
            }
            DeviceKind::EthernetCard(_) => {}
        }
        w.close(name);
    }
}

impl DiskBacking {
    pub fn write_xml(&self, name: &str, w: &mut XmlBuf) {
        w.open_typed(name, "VirtualDiskFlatVer2BackingInfo")
            .text("fileName", &self.file_name)
            .text("diskMode", self.disk_mode)
            .opt_text("thinProvisioned", self.thin_provisioned);
        if let Some(parent) = &self.parent {
            w.open_typed("parent", "VirtualDiskFlatVer2BackingInfo")
                .text("fileName", parent)
                .text("diskMode", self.disk_mode)
                .close("parent");
        }
        w.close(name);
    }
}

impl NetworkBacking {
    pub fn write_xml(&self, name: &str, w: &mut XmlBuf) {
        w.open_typed(name, "VirtualEthernetCardNetworkBackingInfo")
            .text("deviceName", &self.device_name)
            .opt_text("useAutoDetect", self.use_auto_detect);
        if let Some(network) = &self.network {
            w.reference("network", network);
        }
        w.opt_text("inPassthroughMode", self.in_passthrough_mode)
            .close(name);
    }
}

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::soap::{Element, XmlBuf};
    use miette::Result;
    use pretty_assertions::assert_eq;

    fn parse(buf: &XmlBuf) -> Result<Element> {
        Ok(Element::parse(&format!(
            "<root xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">{}</root>",
            buf
        ))?)
    }
    fn names(element: &Element) -> Vec<&str> {
        element.children.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn encode_disk_change() -> Result<()> {
        let mut devices = VirtualDeviceList::new();
        let controller = devices.create_scsi_controller("pvscsi")?;
        let controller_key = controller.key;
        devices.push(controller);
        let mut disk = devices.create_disk(
            disk::DEFAULT_CAPACITY_KB,
            DiskBacking::new(DiskMode::Persistent, true),
        );
        devices.assign_controller(&mut disk, controller_key)?;
        devices.push(disk);

        let specs = devices.config_spec(DeviceOperation::Add)?;
        let mut buf = XmlBuf::new();
        for spec in &specs {
            spec.write_xml("deviceChange", &mut buf);
        }
        let root = parse(&buf)?;
        let changes: Vec<&Element> = root.children_named("deviceChange").collect();
        assert_eq!(changes.len(), 2);

        let controller = changes[0].child("device").unwrap();
        assert_eq!(controller.kind.as_deref(), Some("ParaVirtualSCSIController"));
        assert_eq!(
            names(controller),
            vec!["key", "busNumber", "device", "sharedBus", "scsiCtlrUnitNumber"]
        );
        assert_eq!(controller.child_text("device"), Some("-202"));
        assert_eq!(controller.child_text("sharedBus"), Some("noSharing"));

        assert_eq!(names(changes[1]), vec!["operation", "fileOperation", "device"]);
        assert_eq!(changes[1].child_text("fileOperation"), Some("create"));
        let disk = changes[1].child("device").unwrap();
        assert_eq!(disk.kind.as_deref(), Some("VirtualDisk"));
        assert_eq!(
            names(disk),
            vec!["key", "backing", "controllerKey", "unitNumber", "capacityInKB"]
        );
        assert_eq!(disk.child_text("capacityInKB"), Some("1048576"));
        let backing = disk.child("backing").unwrap();
        assert_eq!(backing.kind.as_deref(), Some("VirtualDiskFlatVer2BackingInfo"));
        assert_eq!(backing.child_text("fileName"), Some(""));
        assert_eq!(backing.child_text("diskMode"), Some("persistent"));
        assert_eq!(backing.child_text("thinProvisioned"), Some("true"));
        Ok(())
    }

    #[test]
    fn encode_network_change() -> Result<()> {
        let devices = VirtualDeviceList::new();
        let nic = devices.create_ethernet_card("vmxnet3", NetworkBacking::port_group("VM Network"))?;
        let mut buf = XmlBuf::new();
        nic.write_xml("device", &mut buf);

        let root = parse(&buf)?;
        let device = root.child("device").unwrap();
        assert_eq!(device.kind.as_deref(), Some("VirtualVmxnet3"));
        assert_eq!(names(device), vec!["key", "backing"]);
        let backing = device.child("backing").unwrap();
        assert_eq!(
            backing.kind.as_deref(),
            Some("VirtualEthernetCardNetworkBackingInfo")
        );
        assert_eq!(
            names(backing),
            vec!["deviceName", "useAutoDetect", "inPassthroughMode"]
        );
        assert_eq!(backing.child_text("deviceName"), Some("VM Network"));
        assert_eq!(backing.child_text("useAutoDetect"), Some("false"));
        Ok(())
    }
}
