use crate::config::ProvisionConfig;
use crate::device::{DeviceOperation, DiskBacking, NetworkBacking, VirtualDeviceList};
use crate::endpoint::{Credentials, Endpoint};
use crate::finder::Finder;
use crate::session::Client;
use crate::soap::{HttpTransport, ManagedObjectReference, Transport};
use crate::task::DEFAULT_POLL_INTERVAL;
use crate::vm::{VmConfigSpec, VmFileInfo};

use bon::Builder;
use owo_colors::OwoColorize;
use std::time::Duration;
use strum::{Display, EnumIter};

// Error Handling
use log::{info, warn};
use miette::Result;
use vcprov_error::{VcprovError, WrapError};

/// What a successful run created.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Provisioned {
    pub name: String,
    pub task: ManagedObjectReference,
    /// Only known when the task was waited for.
    pub vm: Option<ManagedObjectReference>,
}

/**
* Creates one virtual machine on a vSphere endpoint.
*
* Every step is fatal: the first failure aborts the run
* with an error named after the failing operation
* (ex: "find datacenter"), the underlying error as its origin.
* The only mutating call is the final CreateVM_Task.
*/
#[derive(Debug, Clone, Builder)]
pub struct Provisioner {
    #[builder(default)]
    pub config: ProvisionConfig,
    /// Poll the creation task until it completes.
    #[builder(default)]
    pub wait: bool,
    #[builder(default = DEFAULT_POLL_INTERVAL)]
    pub poll_interval: Duration,
}

impl Provisioner {
    /// Run against the endpoint over https, credentials from the environment.
    pub async fn run(&self, url: &str) -> Result<Provisioned, VcprovError> {
        let endpoint = self.endpoint(url, Credentials::from_env())?;
        let transport = step(
            Step::NewClient,
            HttpTransport::new(&endpoint.url, self.config.insecure, &self.config.api_version),
        )?;
        self.provision(&endpoint, transport).await
    }

    /// Run through any transport.
    pub async fn run_with<T: Transport>(
        &self,
        url: &str,
        credentials: Credentials,
        transport: T,
    ) -> Result<Provisioned, VcprovError> {
        let endpoint = self.endpoint(url, credentials)?;
        self.provision(&endpoint, transport).await
    }

    fn endpoint(&self, url: &str, credentials: Credentials) -> Result<Endpoint, VcprovError> {
        let endpoint = step(Step::UrlParse, Endpoint::new(url))?;
        Ok(endpoint.with_credentials(credentials))
    }

    async fn provision<T: Transport>(
        &self,
        endpoint: &Endpoint,
        transport: T,
    ) -> Result<Provisioned, VcprovError> {
        let mut client = step(Step::NewClient, Client::new(endpoint, transport).await)?;
        let res = self.create(&client).await;
        if let Err(e) = client.logout().await {
            warn!("Couldn't logout from {}: {}", endpoint.host(), e);
        }
        res
    }

    async fn create<T: Transport>(&self, client: &Client<T>) -> Result<Provisioned, VcprovError> {
        let config = &self.config;

        let mut finder = Finder::new(client);
        let datacenter = step(Step::FindDatacenter, finder.datacenter(&config.datacenter).await)?;
        finder.set_datacenter(&datacenter);
        let folders = step(Step::Folders, datacenter.folders(client).await)?;

        let mut spec = VmConfigSpec::from(&config.vm);

        // Virtual hardware
        let mut devices = VirtualDeviceList::new();
        let controller = step(
            Step::CreateScsiController,
            devices.create_scsi_controller(&config.disk.controller),
        )?;
        let controller_key = controller.key;
        devices.push(controller);

        let mut disk = devices.create_disk(
            config.disk.capacity_kb,
            DiskBacking::new(config.disk.mode, config.disk.thin),
        );
        step(Step::CreateDisk, devices.assign_controller(&mut disk, controller_key))?;
        devices.push(disk);

        let nic = step(
            Step::CreateEthernetCard,
            devices.create_ethernet_card(
                &config.net.adapter,
                NetworkBacking::port_group(&config.net.port_group),
            ),
        )?;
        devices.push(nic);

        spec.device_change = step(Step::DeviceConfigSpec, devices.config_spec(DeviceOperation::Add))?;

        // Placement
        let datastore = step(Step::FindDatastore, finder.datastore(&config.datastore).await)?;
        spec.files = Some(VmFileInfo::on_datastore(&datastore));
        let pool = match &config.resource_pool {
            Some(path) => step(Step::ResourcePool, finder.resource_pool(path).await)?,
            None => step(Step::DefaultResourcePool, finder.default_resource_pool().await)?,
        };

        let task = step(
            Step::CreateVm,
            folders.vm_folder.create_vm(client, &spec, &pool, None).await,
        )?;
        let vm = match self.wait {
            true => step(Step::WaitTask, task.wait(client, self.poll_interval).await)?,
            false => None,
        };
        info!(
            "{} vm {} in {} on {}",
            "[create]".green(),
            spec.name.bold(),
            pool.path,
            datastore.name()
        );
        Ok(Provisioned {
            name: spec.name,
            task: task.reference,
            vm,
        })
    }
}

/// The operations of a run, each failure is reported under one of them.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, EnumIter)]
pub enum Step {
    #[strum(to_string = "url parse")]
    UrlParse,
    #[strum(to_string = "new client")]
    NewClient,
    #[strum(to_string = "find datacenter")]
    FindDatacenter,
    #[strum(to_string = "folders")]
    Folders,
    #[strum(to_string = "create SCSI controller")]
    CreateScsiController,
    #[strum(to_string = "create disk")]
    CreateDisk,
    #[strum(to_string = "create ethernet card")]
    CreateEthernetCard,
    #[strum(to_string = "device config spec")]
    DeviceConfigSpec,
    #[strum(to_string = "find datastore")]
    FindDatastore,
    #[strum(to_string = "resource pool")]
    ResourcePool,
    #[strum(to_string = "default resource pool")]
    DefaultResourcePool,
    #[strum(to_string = "create VM")]
    CreateVm,
    #[strum(to_string = "wait task")]
    WaitTask,
}

impl Step {
    pub fn help(&self) -> &'static str {
        match self {
            Step::UrlParse => "Pass the endpoint as https://<vcenter>/sdk",
            Step::NewClient => {
                "Check the endpoint is reachable and VC_USERNAME/VC_PASSWORD are set"
            }
            Step::FindDatacenter => "Set an existing datacenter in the configuration",
            Step::Folders => "The datacenter must expose its vm and host folders",
            Step::CreateScsiController => "Use one of lsilogic, buslogic, pvscsi, lsilogic-sas",
            Step::CreateDisk => "The disk must be attached to a SCSI controller of the vm",
            Step::CreateEthernetCard => {
                "Use one of e1000, e1000e, vmxnet2, vmxnet3, vmxnet3vrdma, pcnet32, sriov"
            }
            Step::DeviceConfigSpec => "Device keys must be unique and reference existing controllers",
            Step::FindDatastore => "Set an existing datastore in the configuration",
            Step::ResourcePool | Step::DefaultResourcePool => {
                "Set resource_pool to a pool path under the datacenter host folder"
            }
            Step::CreateVm => "Check the vm name is free and the account may create vms",
            Step::WaitTask => "Inspect the task in the vSphere client for details",
        }
    }
}

/// Name a failed step after its operation.
fn step<T>(step: Step, res: Result<T, VcprovError>) -> Result<T, VcprovError> {
    match res {
        Ok(e) => Ok(e),
        Err(e) => Err(WrapError::builder()
            .msg(&step.to_string())
            .help(step.help())
            .origin(e.into())
            .build()
            .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{Inventory, Simulator};
    use crate::soap::Element;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    const URL: &str = "https://vcenter.example.com/sdk";

    /// The operation name and the origin fault name of a failed run.
    fn failure(err: &VcprovError) -> (String, Option<String>) {
        match err {
            VcprovError::WrapError(e) => {
                let fault = e
                    .origin
                    .downcast_ref::<VcprovError>()
                    .and_then(|e| e.fault_name())
                    .map(|e| e.to_owned());
                (e.message.to_owned(), fault)
            }
            _ => panic!("expected an operation error, got {:?}", err),
        }
    }
    fn count(sim: &Simulator, method: &str) -> usize {
        sim.calls().iter().filter(|e| *e == method).count()
    }
    fn device_kinds(config: &Element) -> Vec<String> {
        config
            .children_named("deviceChange")
            .filter_map(|e| e.child("device"))
            .filter_map(|e| e.kind.to_owned())
            .collect()
    }

    #[tokio::test]
    async fn malformed_url_fails_before_any_call() -> Result<()> {
        let sim = Simulator::default();
        for url in ["not a url", "vcenter.example.com", "ftp://vcenter/sdk"] {
            let err = Provisioner::builder()
                .build()
                .run_with(url, sim.credentials(), &sim)
                .await
                .unwrap_err();
            assert_eq!(failure(&err).0, "url parse");
        }
        assert!(sim.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_credentials_fail_at_login() -> Result<()> {
        let sim = Simulator::default();
        let err = Provisioner::builder()
            .build()
            .run_with(URL, Credentials::default(), &sim)
            .await
            .unwrap_err();
        assert_eq!(
            failure(&err),
            ("new client".to_owned(), Some("InvalidLogin".to_owned()))
        );
        assert_eq!(sim.calls(), vec!["RetrieveServiceContent", "Login"]);
        Ok(())
    }

    #[test]
    fn every_step_has_help() {
        for step in Step::iter() {
            assert!(!step.help().is_empty(), "no help for {}", step);
        }
        assert_eq!(Step::CreateScsiController.to_string(), "create SCSI controller");
    }

    #[tokio::test]
    async fn failed_steps_carry_help() -> Result<()> {
        let sim = Simulator::new(Inventory {
            datastores: vec![],
            ..Default::default()
        });
        let err = Provisioner::builder()
            .build()
            .run_with(URL, sim.credentials(), &sim)
            .await
            .unwrap_err();
        match &err {
            VcprovError::WrapError(e) => {
                assert_eq!(e.help, Step::FindDatastore.help());
                match e.origin.downcast_ref::<VcprovError>() {
                    Some(VcprovError::LibError(origin)) => assert!(!origin.help.is_empty()),
                    origin => panic!("expected a lookup error, got {:?}", origin),
                }
            }
            _ => panic!("expected an operation error, got {:?}", err),
        }
        Ok(())
    }

    #[tokio::test]
    async fn missing_datacenter_creates_nothing() -> Result<()> {
        let sim = Simulator::new(Inventory {
            datacenter: None,
            ..Default::default()
        });
        let err = Provisioner::builder()
            .build()
            .run_with(URL, sim.credentials(), &sim)
            .await
            .unwrap_err();
        assert_eq!(failure(&err).0, "find datacenter");
        assert_eq!(count(&sim, "CreateVM_Task"), 0);
        // The session is closed on failure too.
        assert!(!sim.logged_in());
        Ok(())
    }

    #[tokio::test]
    async fn missing_datastore_creates_nothing() -> Result<()> {
        let sim = Simulator::new(Inventory {
            datastores: vec!["datastore2".to_owned()],
            ..Default::default()
        });
        let err = Provisioner::builder()
            .build()
            .run_with(URL, sim.credentials(), &sim)
            .await
            .unwrap_err();
        assert_eq!(failure(&err).0, "find datastore");
        assert_eq!(count(&sim, "CreateVM_Task"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn ambiguous_resource_pool_creates_nothing() -> Result<()> {
        let sim = Simulator::new(Inventory {
            compute_resources: vec!["cluster1".to_owned(), "cluster2".to_owned()],
            ..Default::default()
        });
        let err = Provisioner::builder()
            .build()
            .run_with(URL, sim.credentials(), &sim)
            .await
            .unwrap_err();
        assert_eq!(failure(&err).0, "default resource pool");
        assert_eq!(count(&sim, "CreateVM_Task"), 0);

        // A configured pool path lifts the ambiguity.
        let config = ProvisionConfig {
            resource_pool: Some("cluster2/Resources".to_owned()),
            ..Default::default()
        };
        Provisioner::builder()
            .config(config)
            .build()
            .run_with(URL, sim.credentials(), &sim)
            .await?;
        assert_eq!(count(&sim, "CreateVM_Task"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_device_types_create_nothing() -> Result<()> {
        let sim = Simulator::default();
        let mut config = ProvisionConfig::default();
        config.disk.controller = "nvme".to_owned();
        let err = Provisioner::builder()
            .config(config)
            .build()
            .run_with(URL, sim.credentials(), &sim)
            .await
            .unwrap_err();
        assert_eq!(failure(&err).0, "create SCSI controller");

        let mut config = ProvisionConfig::default();
        config.net.adapter = "virtio".to_owned();
        let err = Provisioner::builder()
            .config(config)
            .build()
            .run_with(URL, sim.credentials(), &sim)
            .await
            .unwrap_err();
        assert_eq!(failure(&err).0, "create ethernet card");
        assert_eq!(count(&sim, "CreateVM_Task"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn create_vm_with_default_hardware() -> Result<()> {
        let sim = Simulator::default();
        let res = Provisioner::builder()
            .build()
            .run_with(URL, sim.credentials(), &sim)
            .await?;
        assert_eq!(res.name, "test-vm");
        assert!(res.task.is("Task"));
        assert_eq!(res.vm, None);
        assert_eq!(count(&sim, "CreateVM_Task"), 1);
        assert_eq!(sim.calls().last().map(|e| e.as_str()), Some("Logout"));

        let created = sim.created();
        assert_eq!(created.len(), 1);
        let config = &created[0];
        assert_eq!(config.child_text("name"), Some("test-vm"));
        assert_eq!(config.child_text("guestId"), Some("otherGuest"));
        assert_eq!(config.child_text("numCPUs"), Some("1"));
        assert_eq!(config.child_text("memoryMB"), Some("1024"));
        assert_eq!(config.child_text("firmware"), Some("efi"));
        assert_eq!(
            config.find(&["files", "vmPathName"]).map(|e| e.text.as_str()),
            Some("[datastore1]")
        );
        assert_eq!(
            device_kinds(config),
            vec!["ParaVirtualSCSIController", "VirtualDisk", "VirtualVmxnet3"]
        );

        let changes: Vec<&Element> = config.children_named("deviceChange").collect();
        assert!(changes.iter().all(|e| e.child_text("operation") == Some("add")));

        let controller = changes[0].child("device").unwrap();
        assert_eq!(controller.child_text("key"), Some("-201"));
        assert_eq!(controller.child_text("busNumber"), Some("0"));
        assert_eq!(controller.child_text("device"), Some("-202"));

        assert_eq!(changes[1].child_text("fileOperation"), Some("create"));
        let disk = changes[1].child("device").unwrap();
        assert_eq!(disk.child_text("key"), Some("-202"));
        assert_eq!(disk.child_text("controllerKey"), Some("-201"));
        assert_eq!(disk.child_text("unitNumber"), Some("0"));
        assert_eq!(disk.child_text("capacityInKB"), Some("1048576"));
        assert_eq!(
            disk.find(&["backing", "thinProvisioned"]).map(|e| e.text.as_str()),
            Some("true")
        );
        assert_eq!(
            disk.find(&["backing", "diskMode"]).map(|e| e.text.as_str()),
            Some("persistent")
        );

        assert_eq!(changes[2].child_text("fileOperation"), None);
        let nic = changes[2].child("device").unwrap();
        assert_eq!(nic.child_text("key"), Some("-203"));
        let backing = nic.child("backing").unwrap();
        assert_eq!(backing.child_text("deviceName"), Some("VM Network"));
        assert_eq!(backing.child_text("useAutoDetect"), Some("false"));
        assert_eq!(backing.child_text("inPassthroughMode"), Some("false"));
        Ok(())
    }

    #[tokio::test]
    async fn rejected_creation_fails() -> Result<()> {
        let sim = Simulator::new(Inventory {
            create_vm_fault: Some((
                "InsufficientResourcesFault".to_owned(),
                "Insufficient resources to satisfy configured failover level".to_owned(),
            )),
            ..Default::default()
        });
        let err = Provisioner::builder()
            .build()
            .run_with(URL, sim.credentials(), &sim)
            .await
            .unwrap_err();
        assert_eq!(
            failure(&err),
            (
                "create VM".to_owned(),
                Some("InsufficientResourcesFault".to_owned())
            )
        );
        assert_eq!(count(&sim, "CreateVM_Task"), 1);
        assert!(sim.created().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn second_run_hits_duplicate_name() -> Result<()> {
        let sim = Simulator::default();
        let provisioner = Provisioner::builder().build();
        provisioner.run_with(URL, sim.credentials(), &sim).await?;
        let err = provisioner
            .run_with(URL, sim.credentials(), &sim)
            .await
            .unwrap_err();
        assert_eq!(
            failure(&err),
            ("create VM".to_owned(), Some("DuplicateName".to_owned()))
        );
        Ok(())
    }

    #[tokio::test]
    async fn wait_for_the_creation_task() -> Result<()> {
        let sim = Simulator::new(Inventory {
            task_running_polls: 2,
            ..Default::default()
        });
        let res = Provisioner::builder()
            .wait(true)
            .poll_interval(Duration::from_millis(1))
            .build()
            .run_with(URL, sim.credentials(), &sim)
            .await?;
        let vm = res.vm.unwrap();
        assert!(vm.is("VirtualMachine"));
        // 3 inventory reads, then 2 running answers and the final success.
        assert_eq!(count(&sim, "RetrievePropertiesEx"), 6);
        Ok(())
    }

    #[tokio::test]
    async fn failed_task_is_fatal_when_waiting() -> Result<()> {
        let sim = Simulator::new(Inventory {
            task_error: Some("Insufficient disk space on datastore 'datastore1'.".to_owned()),
            ..Default::default()
        });
        let provisioner = Provisioner::builder()
            .wait(true)
            .poll_interval(Duration::from_millis(1))
            .build();
        let err = provisioner
            .run_with(URL, sim.credentials(), &sim)
            .await
            .unwrap_err();
        match &err {
            VcprovError::WrapError(e) => {
                assert_eq!(e.message, "wait task");
                assert_eq!(
                    e.origin.to_string(),
                    "Insufficient disk space on datastore 'datastore1'."
                );
            }
            _ => panic!("expected an operation error"),
        }

        // Without waiting the run only submits the task.
        let sim = Simulator::new(Inventory {
            task_error: Some("Insufficient disk space on datastore 'datastore1'.".to_owned()),
            ..Default::default()
        });
        Provisioner::builder()
            .build()
            .run_with(URL, sim.credentials(), &sim)
            .await?;
        Ok(())
    }
}
