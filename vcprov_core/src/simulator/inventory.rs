use crate::soap::{Element, ManagedObjectReference, XmlBuf};
use std::collections::HashMap;

/// What the simulated endpoint contains, and how it misbehaves.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Inventory {
    pub username: String,
    pub password: String,
    /// The single datacenter under the root folder.
    pub datacenter: Option<String>,
    pub datastores: Vec<String>,
    pub port_groups: Vec<String>,
    /// Compute resources under the datacenter host folder,
    /// each with its root resource pool.
    pub compute_resources: Vec<String>,
    /// Fault (name, message) returned by CreateVM_Task.
    pub create_vm_fault: Option<(String, String)>,
    /// Number of task info reads answered with "running".
    pub task_running_polls: u32,
    /// Localized message of a failing creation task.
    pub task_error: Option<String>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            username: "user".to_owned(),
            password: "pass".to_owned(),
            datacenter: Some("bogal".to_owned()),
            datastores: vec!["datastore1".to_owned()],
            port_groups: vec!["VM Network".to_owned()],
            compute_resources: vec!["cluster1".to_owned()],
            create_vm_fault: None,
            task_running_polls: 0,
            task_error: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Object {
    pub reference: ManagedObjectReference,
    pub name: String,
    pub parent: Option<ManagedObjectReference>,
    /// Inventory children, walked by path lookups and folder traversal.
    pub children: Vec<ManagedObjectReference>,
    /// Reference valued properties (ex: "vmFolder", "resourcePool").
    pub links: Vec<(String, ManagedObjectReference)>,
}

#[derive(Debug, Clone)]
pub struct TaskEntry {
    pub polls_left: u32,
    pub result: Option<ManagedObjectReference>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct State {
    pub inventory: Inventory,
    pub objects: Vec<Object>,
    pub host_folder: Option<ManagedObjectReference>,
    next_id: u32,
    pub logged_in: bool,
    pub calls: Vec<String>,
    pub created: Vec<Element>,
    pub page_size: Option<usize>,
    pub pages: HashMap<String, Vec<XmlBuf>>,
    pub tasks: HashMap<String, TaskEntry>,
}

pub fn root_folder() -> ManagedObjectReference {
    ManagedObjectReference::new("Folder", "group-d1")
}

impl State {
    pub fn new(inventory: Inventory) -> Self {
        let mut state = Self {
            inventory,
            objects: vec![],
            host_folder: None,
            next_id: 2,
            logged_in: false,
            calls: vec![],
            created: vec![],
            page_size: None,
            pages: HashMap::new(),
            tasks: HashMap::new(),
        };
        let root = root_folder();
        state.insert(&root, "Datacenters", None);

        if let Some(name) = state.inventory.datacenter.clone() {
            let datacenter = ManagedObjectReference::new("Datacenter", "datacenter-2");
            state.insert(&datacenter, &name, Some(&root));
            for (property, name, value) in [
                ("vmFolder", "vm", "group-v3"),
                ("hostFolder", "host", "group-h4"),
                ("datastoreFolder", "datastore", "group-s5"),
                ("networkFolder", "network", "group-n6"),
            ] {
                let folder = ManagedObjectReference::new("Folder", value);
                state.insert(&folder, name, Some(&datacenter));
                state.link(&datacenter, property, &folder);
            }
            state.next_id = 7;
            state.host_folder = Some(ManagedObjectReference::new("Folder", "group-h4"));

            let datastore_folder = ManagedObjectReference::new("Folder", "group-s5");
            for name in state.inventory.datastores.clone() {
                let datastore = state.new_reference("Datastore", "datastore-");
                state.insert(&datastore, &name, Some(&datastore_folder));
            }
            let network_folder = ManagedObjectReference::new("Folder", "group-n6");
            for name in state.inventory.port_groups.clone() {
                let network = state.new_reference("Network", "network-");
                state.insert(&network, &name, Some(&network_folder));
            }
            for name in state.inventory.compute_resources.clone() {
                state.add_compute_resource(&name);
            }
        }
        state
    }

    pub fn new_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
    pub fn new_reference(&mut self, kind: &str, prefix: &str) -> ManagedObjectReference {
        let value = format!("{}{}", prefix, self.new_id());
        ManagedObjectReference::new(kind, &value)
    }

    pub fn insert(
        &mut self,
        reference: &ManagedObjectReference,
        name: &str,
        parent: Option<&ManagedObjectReference>,
    ) {
        self.objects.push(Object {
            reference: reference.to_owned(),
            name: name.to_owned(),
            parent: parent.cloned(),
            children: vec![],
            links: vec![],
        });
        if let Some(parent) = parent {
            if let Some(parent) = self.get_mut(parent) {
                parent.children.push(reference.to_owned());
            }
        }
    }
    fn link(&mut self, from: &ManagedObjectReference, property: &str, to: &ManagedObjectReference) {
        if let Some(object) = self.get_mut(from) {
            object.links.push((property.to_owned(), to.to_owned()));
        }
    }

    /// A cluster and its root "Resources" pool under the host folder.
    pub fn add_compute_resource(&mut self, name: &str) {
        let host_folder = match &self.host_folder {
            Some(e) => e.to_owned(),
            None => return,
        };
        let cluster = self.new_reference("ClusterComputeResource", "domain-c");
        self.insert(&cluster, name, Some(&host_folder));
        let pool = self.new_reference("ResourcePool", "resgroup-");
        self.insert(&pool, "Resources", Some(&cluster));
        self.link(&cluster, "resourcePool", &pool);
    }

    pub fn get(&self, reference: &ManagedObjectReference) -> Option<&Object> {
        self.objects.iter().find(|e| &e.reference == reference)
    }
    fn get_mut(&mut self, reference: &ManagedObjectReference) -> Option<&mut Object> {
        self.objects.iter_mut().find(|e| &e.reference == reference)
    }

    /// Walk names from the root folder ("bogal/host/cluster1/Resources").
    pub fn find_by_path(&self, path: &str) -> Option<ManagedObjectReference> {
        let mut current = self.get(&root_folder())?;
        for name in path.split('/').filter(|e| !e.is_empty()) {
            current = current
                .children
                .iter()
                .filter_map(|e| self.get(e))
                .find(|e| e.name == name)?;
        }
        Some(current.reference.to_owned())
    }

    /// Write one property value as a <val>, false if the object has no such property.
    pub fn write_property(&self, object: &Object, path: &str, w: &mut XmlBuf) -> bool {
        match path {
            "name" => {
                w.typed_text("val", "xsd:string", &object.name);
            }
            "parent" => match &object.parent {
                Some(parent) => {
                    w.typed_reference("val", parent);
                }
                None => return false,
            },
            "childEntity" if object.reference.is("Folder") => {
                w.open_typed("val", "ArrayOfManagedObjectReference");
                for child in &object.children {
                    w.reference("ManagedObjectReference", child);
                }
                w.close("val");
            }
            path => match object.links.iter().find(|(k, _)| k == path) {
                Some((_, reference)) => {
                    w.typed_reference("val", reference);
                }
                None => return false,
            },
        }
        true
    }
}

/// A property filter type also selects its subtypes.
pub fn is_kind(object_kind: &str, filter_kind: &str) -> bool {
    object_kind == filter_kind
        || filter_kind == "ManagedEntity"
        || (filter_kind == "ComputeResource" && object_kind == "ClusterComputeResource")
}
