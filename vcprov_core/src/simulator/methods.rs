use super::inventory::{is_kind, root_folder, State, TaskEntry};
use crate::soap::{envelope, Element, ManagedObjectReference, XmlBuf};

use vcprov_error::SoapFault;

fn fault(name: &str, message: &str) -> SoapFault {
    SoapFault::builder().fault(name).message(message).build()
}
fn not_found(reference: &ManagedObjectReference) -> SoapFault {
    let message = format!("The object '{}' has already been deleted or has not been completely created", reference);
    fault("ManagedObjectNotFound", &message)
}
fn invalid_argument(name: &str) -> SoapFault {
    let message = format!("A specified parameter was not correct: {}", name);
    fault("InvalidArgument", &message)
}
fn reference(element: &Element, name: &str) -> Result<ManagedObjectReference, SoapFault> {
    element
        .child(name)
        .and_then(|e| ManagedObjectReference::from_element(e).ok())
        .ok_or_else(|| invalid_argument(name))
}

impl State {
    /// Decode a soap request, run the method, and encode its response envelope.
    pub fn dispatch(&mut self, body: &str) -> Result<String, SoapFault> {
        let root = match Element::parse(body) {
            Ok(e) => e,
            Err(e) => return Err(fault("InvalidRequest", &e.to_string())),
        };
        let request = match root.child("Body").and_then(|e| e.children.first()) {
            Some(request) => request,
            None => return Err(fault("InvalidRequest", "Missing soap body")),
        };
        let method = request.name.as_str();
        self.calls.push(method.to_owned());

        match method {
            "RetrieveServiceContent" => return Ok(envelope::response(method, &self.service_content())),
            "Login" => return self.login(request).map(|e| envelope::response(method, &e)),
            _ => {}
        }
        if !self.logged_in {
            return Err(fault("NotAuthenticated", "The session is not authenticated."));
        }
        let content = match method {
            "Logout" => {
                self.logged_in = false;
                XmlBuf::new()
            }
            "FindByInventoryPath" => self.find_by_inventory_path(request)?,
            "RetrievePropertiesEx" => self.retrieve_properties(request)?,
            "ContinueRetrievePropertiesEx" => self.continue_retrieve_properties(request)?,
            "CreateVM_Task" => self.create_vm(request)?,
            _ => {
                let message = format!("{} is not implemented", method);
                return Err(fault("NotImplemented", &message));
            }
        };
        Ok(envelope::response(method, &content))
    }

    fn service_content(&self) -> XmlBuf {
        let mut w = XmlBuf::new();
        w.open("returnval")
            .reference("rootFolder", &root_folder())
            .reference(
                "propertyCollector",
                &ManagedObjectReference::new("PropertyCollector", "propertyCollector"),
            )
            .reference(
                "sessionManager",
                &ManagedObjectReference::new("SessionManager", "SessionManager"),
            )
            .reference(
                "searchIndex",
                &ManagedObjectReference::new("SearchIndex", "SearchIndex"),
            )
            .open("about")
            .text("name", "VMware vCenter Server")
            .text("fullName", "vcprov simulator 7.0.3")
            .text("apiVersion", "7.0.3.0")
            .close("about")
            .close("returnval");
        w
    }

    fn login(&mut self, request: &Element) -> Result<XmlBuf, SoapFault> {
        let username = request.child_text("userName").unwrap_or_default();
        let password = request.child_text("password").unwrap_or_default();
        if username.is_empty()
            || username != self.inventory.username
            || password != self.inventory.password
        {
            return Err(fault(
                "InvalidLogin",
                "Cannot complete login due to an incorrect user name or password.",
            ));
        }
        self.logged_in = true;
        let key = format!("session-{}", self.new_id());
        let mut w = XmlBuf::new();
        w.open("returnval")
            .text("key", key)
            .text("userName", username)
            .text("fullName", username)
            .close("returnval");
        Ok(w)
    }

    fn find_by_inventory_path(&self, request: &Element) -> Result<XmlBuf, SoapFault> {
        let path = match request.child_text("inventoryPath") {
            Some(path) => path,
            None => return Err(invalid_argument("inventoryPath")),
        };
        let mut w = XmlBuf::new();
        if let Some(reference) = self.find_by_path(path) {
            w.reference("returnval", &reference);
        }
        Ok(w)
    }

    fn retrieve_properties(&mut self, request: &Element) -> Result<XmlBuf, SoapFault> {
        let spec = match request.child("specSet") {
            Some(spec) => spec,
            None => return Err(invalid_argument("specSet")),
        };
        let prop_set = match spec.child("propSet") {
            Some(e) => e,
            None => return Err(invalid_argument("propSet")),
        };
        let object_set = match spec.child("objectSet") {
            Some(e) => e,
            None => return Err(invalid_argument("objectSet")),
        };
        let kind = prop_set.child_text("type").unwrap_or_default();
        let paths: Vec<&str> = prop_set
            .children_named("pathSet")
            .map(|e| e.text.as_str())
            .collect();
        let obj = reference(object_set, "obj")?;
        let skip = object_set.child_text("skip") == Some("true");
        let traverse = object_set.child("selectSet").is_some();

        if obj.is("Task") {
            let chunk = self.task_info(&obj)?;
            return Ok(self.page(vec![chunk]));
        }

        let start = match self.get(&obj) {
            Some(e) => e,
            None => return Err(not_found(&obj)),
        };
        let mut candidates = vec![];
        if !skip {
            candidates.push(start);
        }
        if traverse && start.reference.is("Folder") {
            candidates.extend(start.children.iter().filter_map(|e| self.get(e)));
        }
        let mut chunks = vec![];
        for object in candidates {
            if !is_kind(&object.reference.kind, kind) {
                continue;
            }
            let mut w = XmlBuf::new();
            w.open("objects").reference("obj", &object.reference);
            for path in &paths {
                let mut val = XmlBuf::new();
                if self.write_property(object, path, &mut val) {
                    w.open("propSet").text("name", path).append(&val).close("propSet");
                }
            }
            w.close("objects");
            chunks.push(w);
        }
        Ok(self.page(chunks))
    }

    fn continue_retrieve_properties(&mut self, request: &Element) -> Result<XmlBuf, SoapFault> {
        let token = request.child_text("token").unwrap_or_default();
        match self.pages.remove(token) {
            Some(chunks) => Ok(self.page(chunks)),
            None => Err(invalid_argument("token")),
        }
    }

    /// A RetrieveResult, cut after `page_size` objects with a continuation token.
    fn page(&mut self, mut chunks: Vec<XmlBuf>) -> XmlBuf {
        let mut w = XmlBuf::new();
        if chunks.is_empty() {
            return w;
        }
        let rest = match self.page_size {
            Some(size) if size > 0 && chunks.len() > size => chunks.split_off(size),
            _ => vec![],
        };
        w.open("returnval");
        if !rest.is_empty() {
            let token = self.new_id().to_string();
            w.text("token", &token);
            self.pages.insert(token, rest);
        }
        for chunk in &chunks {
            w.append(chunk);
        }
        w.close("returnval");
        w
    }

    fn task_info(&mut self, task: &ManagedObjectReference) -> Result<XmlBuf, SoapFault> {
        let entry = match self.tasks.get_mut(&task.value) {
            Some(e) => e,
            None => return Err(not_found(task)),
        };
        let state = if entry.polls_left > 0 {
            entry.polls_left -= 1;
            "running"
        } else if entry.error.is_some() {
            "error"
        } else {
            "success"
        };

        let mut w = XmlBuf::new();
        w.open("objects")
            .reference("obj", task)
            .open("propSet")
            .text("name", "info")
            .open_typed("val", "TaskInfo")
            .text("key", &task.value)
            .reference("task", task)
            .text("state", state);
        match state {
            "success" => {
                if let Some(result) = &entry.result {
                    w.typed_reference("result", result);
                }
            }
            "error" => {
                let message = entry.error.clone().unwrap_or_default();
                w.open("error")
                    .open_typed("fault", "SystemError")
                    .close("fault")
                    .text("localizedMessage", message)
                    .close("error");
            }
            _ => {}
        }
        w.close("val").close("propSet").close("objects");
        Ok(w)
    }

    fn create_vm(&mut self, request: &Element) -> Result<XmlBuf, SoapFault> {
        let folder = reference(request, "_this")?;
        match self.get(&folder) {
            Some(e) if e.reference.is("Folder") => {}
            _ => return Err(not_found(&folder)),
        }
        let config = match request.child("config") {
            Some(config) => config.to_owned(),
            None => return Err(invalid_argument("config")),
        };
        let pool = reference(request, "pool")?;
        if !pool.is("ResourcePool") || self.get(&pool).is_none() {
            return Err(not_found(&pool));
        }
        if let Some((name, message)) = &self.inventory.create_vm_fault {
            return Err(fault(name, message));
        }
        let name = config.child_text("name").unwrap_or_default().to_owned();
        if name.is_empty() {
            return Err(invalid_argument("config.name"));
        }
        let duplicate = self
            .objects
            .iter()
            .any(|e| e.reference.is("VirtualMachine") && e.name == name);
        if duplicate {
            let message = format!("The name '{}' already exists.", name);
            return Err(fault("DuplicateName", &message));
        }
        self.created.push(config);

        let result = match &self.inventory.task_error {
            Some(_) => None,
            None => {
                let vm = self.new_reference("VirtualMachine", "vm-");
                self.insert(&vm, &name, Some(&folder));
                Some(vm)
            }
        };
        let task = self.new_reference("Task", "task-");
        self.tasks.insert(
            task.value.to_owned(),
            TaskEntry {
                polls_left: self.inventory.task_running_polls,
                result,
                error: self.inventory.task_error.clone(),
            },
        );
        let mut w = XmlBuf::new();
        w.reference("returnval", &task);
        Ok(w)
    }
}
