mod inventory;
mod methods;

pub use inventory::Inventory;

use crate::endpoint::Credentials;
use crate::soap::{envelope, Element, Response, Transport};
use inventory::State;

use std::sync::{Mutex, MutexGuard};

// Error Handling
use log::trace;
use miette::Result;
use vcprov_error::VcprovError;

/**
* An in-memory vSphere endpoint.
*
* It answers the handful of vim25 calls a provisioning run makes
* and records them, so tests can assert on what reached the server.
* `handle` takes a raw soap request and returns the raw answer,
* it can be served behind any http server.
*/
#[derive(Debug)]
pub struct Simulator {
    state: Mutex<State>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(Inventory::default())
    }
}

impl Simulator {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            state: Mutex::new(State::new(inventory)),
        }
    }
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Credentials the endpoint accepts.
    pub fn credentials(&self) -> Credentials {
        let state = self.lock();
        Credentials::new(&state.inventory.username, &state.inventory.password)
    }
    pub fn logged_in(&self) -> bool {
        self.lock().logged_in
    }
    /// Names of the methods called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }
    /// The `config` of every accepted CreateVM_Task.
    pub fn created(&self) -> Vec<Element> {
        self.lock().created.clone()
    }
    /// Split property collector results in pages of `size` objects.
    pub fn set_page_size(&self, size: Option<usize>) {
        self.lock().page_size = size;
    }
    pub fn add_compute_resource(&self, name: &str) {
        self.lock().add_compute_resource(name);
    }

    pub fn handle(&self, body: &str) -> Response {
        let mut state = self.lock();
        match state.dispatch(body) {
            Ok(body) => Response::new(200, &body),
            Err(fault) => {
                trace!("simulator fault {}", fault);
                Response::new(500, &envelope::fault(&fault.fault, &fault.message))
            }
        }
    }
}

impl Transport for Simulator {
    async fn round_trip(&self, body: String) -> Result<Response, VcprovError> {
        Ok(self.handle(&body))
    }
}
