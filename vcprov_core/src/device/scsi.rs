use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

// Error Handling
use miette::Result;
use vcprov_error::{LibError, VcprovError};

/// Unit number the SCSI controller itself occupies on its bus.
pub const SCSI_CONTROLLER_UNIT_NUMBER: i32 = 7;
/// Bus numbers a vm can give to SCSI controllers.
pub const SCSI_BUS_NUMBERS: [i32; 4] = [0, 1, 2, 3];

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumString, EnumIter)]
pub enum ScsiControllerKind {
    #[strum(serialize = "lsilogic")]
    LsiLogic,
    #[strum(serialize = "buslogic")]
    BusLogic,
    #[strum(serialize = "pvscsi")]
    ParaVirtual,
    #[strum(serialize = "lsilogic-sas")]
    LsiLogicSas,
}

impl ScsiControllerKind {
    pub fn xsi_type(&self) -> &'static str {
        match self {
            ScsiControllerKind::LsiLogic => "VirtualLsiLogicController",
            ScsiControllerKind::BusLogic => "VirtualBusLogicController",
            ScsiControllerKind::ParaVirtual => "ParaVirtualSCSIController",
            ScsiControllerKind::LsiLogicSas => "VirtualLsiLogicSASController",
        }
    }
    /**
    * Resolve a controller type name.
    * An empty name or "scsi" is the first known type (lsilogic),
    * "virtualscsi" is an alias of "pvscsi".
    */
    pub fn from_name(name: &str) -> Result<Self, VcprovError> {
        match name {
            "" | "scsi" => Ok(ScsiControllerKind::LsiLogic),
            "virtualscsi" => Ok(ScsiControllerKind::ParaVirtual),
            name => match name.parse::<Self>() {
                Ok(kind) => Ok(kind),
                Err(_) => {
                    let message = format!("Unknown SCSI controller type {:#?}", name);
                    let names = Self::iter()
                        .map(|e| e.to_string())
                        .collect::<Vec<String>>()
                        .join(",");
                    let help = format!("Available types are:\n[{names}]");
                    Err(LibError::builder().msg(&message).help(&help).build().into())
                }
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum SharingMode {
    #[strum(serialize = "noSharing")]
    NoSharing,
    #[strum(serialize = "virtualSharing")]
    VirtualSharing,
    #[strum(serialize = "physicalSharing")]
    PhysicalSharing,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ScsiController {
    pub kind: ScsiControllerKind,
    pub bus_number: i32,
    /// Keys of the devices attached to this controller.
    pub devices: Vec<i32>,
    pub shared_bus: SharingMode,
    pub scsi_ctlr_unit_number: i32,
}

impl ScsiController {
    pub fn new(kind: ScsiControllerKind, bus_number: i32) -> Self {
        Self {
            kind,
            bus_number,
            devices: vec![],
            shared_bus: SharingMode::NoSharing,
            scsi_ctlr_unit_number: SCSI_CONTROLLER_UNIT_NUMBER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolve_controller_names() -> Result<()> {
        assert_eq!(ScsiControllerKind::from_name("pvscsi")?, ScsiControllerKind::ParaVirtual);
        assert_eq!(ScsiControllerKind::from_name("virtualscsi")?, ScsiControllerKind::ParaVirtual);
        assert_eq!(ScsiControllerKind::from_name("")?, ScsiControllerKind::LsiLogic);
        assert_eq!(ScsiControllerKind::from_name("scsi")?, ScsiControllerKind::LsiLogic);
        assert_eq!(
            ScsiControllerKind::from_name("lsilogic-sas")?.xsi_type(),
            "VirtualLsiLogicSASController"
        );
        Ok(())
    }

    #[test]
    fn reject_unknown_controller() {
        let err = ScsiControllerKind::from_name("nvme").unwrap_err();
        assert_eq!(err.to_string(), "Unknown SCSI controller type \"nvme\"");
    }
}
