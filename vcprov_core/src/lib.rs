pub mod cli;
pub mod config;
pub mod device;
pub mod endpoint;
pub mod finder;
pub mod property;
pub mod provision;
pub mod session;
pub mod simulator;
pub mod soap;
pub mod task;
pub mod vm;

// Reexports
pub use cli::Cli;
pub use config::ProvisionConfig;
pub use endpoint::{Credentials, Endpoint};
pub use provision::{Provisioned, Provisioner};
pub use simulator::{Inventory, Simulator};
