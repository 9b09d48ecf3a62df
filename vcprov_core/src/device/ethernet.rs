use crate::soap::ManagedObjectReference;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

// Error Handling
use miette::Result;
use vcprov_error::{LibError, VcprovError};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum EthernetCardKind {
    E1000,
    E1000e,
    Vmxnet2,
    Vmxnet3,
    Vmxnet3Vrdma,
    PcNet32,
    Sriov,
}

impl EthernetCardKind {
    pub fn xsi_type(&self) -> &'static str {
        match self {
            EthernetCardKind::E1000 => "VirtualE1000",
            EthernetCardKind::E1000e => "VirtualE1000e",
            EthernetCardKind::Vmxnet2 => "VirtualVmxnet2",
            EthernetCardKind::Vmxnet3 => "VirtualVmxnet3",
            EthernetCardKind::Vmxnet3Vrdma => "VirtualVmxnet3Vrdma",
            EthernetCardKind::PcNet32 => "VirtualPCNet32",
            EthernetCardKind::Sriov => "VirtualSriovEthernetCard",
        }
    }
    /// Resolve an adapter type name, an empty name is the first known type (e1000).
    pub fn from_name(name: &str) -> Result<Self, VcprovError> {
        if name.is_empty() {
            return Ok(EthernetCardKind::E1000);
        }
        match name.parse::<Self>() {
            Ok(kind) => Ok(kind),
            Err(_) => {
                let message = format!("Unknown ethernet card type {:#?}", name);
                let names = Self::iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<String>>()
                    .join(",");
                let help = format!("Available types are:\n[{names}]");
                Err(LibError::builder().msg(&message).help(&help).build().into())
            }
        }
    }
}

/**
* A standard port group backing (non distributed switch).
* The port group is named by `device_name`,
* `network` optionally pins the Network object.
*/
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NetworkBacking {
    pub device_name: String,
    pub use_auto_detect: Option<bool>,
    pub network: Option<ManagedObjectReference>,
    pub in_passthrough_mode: Option<bool>,
}
impl NetworkBacking {
    pub fn port_group(name: &str) -> Self {
        Self {
            device_name: name.to_owned(),
            use_auto_detect: Some(false),
            network: None,
            in_passthrough_mode: Some(false),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EthernetCard {
    pub kind: EthernetCardKind,
    pub backing: NetworkBacking,
}
