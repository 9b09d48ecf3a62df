use super::Cli;

// Logger
use env_logger::Builder;
use log::trace;

// Error handling
use miette::Result;
use vcprov_error::VcprovError;

pub const LOG_VAR: &str = "VCPROV_LOG";

/// Build logger
pub fn set_logger(cli: &Cli) -> Result<(), VcprovError> {
    // Set verbosity
    let verbosity: log::LevelFilter = cli.verbose.log_level_filter();
    // Disable http client logs
    let filter = format!(
        "{},{}",
        verbosity.to_string().to_lowercase(),
        "hyper=error,reqwest=error"
    );
    std::env::set_var(LOG_VAR, filter);
    if Builder::from_env(LOG_VAR).try_init().is_err() {
        trace!("Logger already set.");
    }
    Ok(())
}
