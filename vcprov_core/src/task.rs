use crate::property::{self, PropertyFilter};
use crate::session::Client;
use crate::soap::{Element, ManagedObjectReference, Transport};

use owo_colors::OwoColorize;
use std::time::Duration;
use strum::{Display, EnumString};

// Error Handling
use log::{debug, info};
use miette::Result;
use vcprov_error::{LibError, VcprovError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TaskState {
    Queued,
    Running,
    Success,
    Error,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TaskInfo {
    pub state: TaskState,
    /// The created object on success (ex: VirtualMachine:vm-7).
    pub result: Option<ManagedObjectReference>,
    /// The fault localized message on error.
    pub error: Option<String>,
}
impl TaskInfo {
    pub fn from_element(val: &Element) -> Result<Self, VcprovError> {
        let state = val.required_text("state")?;
        let state = match state.parse::<TaskState>() {
            Ok(state) => state,
            Err(_) => {
                let message = format!("Malformed response: unknown task state {:#?}", state);
                return Err(LibError::builder()
                    .msg(&message)
                    .help("The endpoint may speak an unsupported api version")
                    .build()
                    .into());
            }
        };
        let result = match val.child("result") {
            Some(e) => ManagedObjectReference::from_element(e).ok(),
            None => None,
        };
        let error = val.child("error").map(|e| {
            e.child_text("localizedMessage")
                .filter(|e| !e.is_empty())
                .or(e.find(&["fault"]).and_then(|e| e.kind.as_deref()))
                .unwrap_or("unknown error")
                .to_owned()
        });
        Ok(Self {
            state,
            result,
            error,
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Task {
    pub reference: ManagedObjectReference,
}

impl Task {
    pub async fn info<T: Transport>(&self, client: &Client<T>) -> Result<TaskInfo, VcprovError> {
        let filter = PropertyFilter::builder()
            .obj(self.reference.clone())
            .kind("Task")
            .path_set(vec!["info".to_owned()])
            .build();
        let objects = property::retrieve(client, &filter).await?;
        let val = objects.first().and_then(|e| e.get("info"));
        match val {
            Some(val) => TaskInfo::from_element(val),
            None => {
                let message = format!("Couldn't read {} info", self.reference);
                Err(LibError::builder()
                    .msg(&message)
                    .help("The task may have expired on the server")
                    .build()
                    .into())
            }
        }
    }

    /**
    * Poll the task until it completes.
    * Returns the task result reference on success,
    * or an error carrying the task fault message.
    */
    pub async fn wait<T: Transport>(
        &self,
        client: &Client<T>,
        interval: Duration,
    ) -> Result<Option<ManagedObjectReference>, VcprovError> {
        loop {
            let info = self.info(client).await?;
            debug!("{} is {}", self.reference, info.state);
            match info.state {
                TaskState::Success => {
                    if let Some(result) = &info.result {
                        info!("{} {} done: {}", "[task]".yellow(), self.reference, result.green());
                    }
                    return Ok(info.result);
                }
                TaskState::Error => {
                    let message = info.error.unwrap_or_else(|| "unknown error".to_owned());
                    let help = format!("{} failed on the server side", self.reference);
                    return Err(LibError::builder().msg(&message).help(&help).build().into());
                }
                TaskState::Queued | TaskState::Running => {
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }
}
