mod types;
pub mod utils;
pub use types::*;

use crate::config::ProvisionConfig;
use crate::provision::Provisioner;

use clap::Parser;

// Spinners
use owo_colors::OwoColorize;
use spinoff::{spinners, Spinner};

// Error Handling
use miette::Result;

impl Cli {
    pub async fn run() -> Result<()> {
        let cli = Cli::parse();
        Self::switch(cli).await?;
        Ok(())
    }
    pub async fn switch(cli: Cli) -> Result<()> {
        utils::set_logger(&cli)?;

        let config = ProvisionConfig::get(cli.config.as_deref())?;
        let provisioner = Provisioner::builder()
            .config(config)
            .wait(cli.wait)
            .build();

        // Spinner
        let mut sp = Spinner::new(spinners::Toggle5, "Creating vm...", None);
        match provisioner.run(&cli.url).await {
            Ok(res) => {
                let message = match &res.vm {
                    Some(vm) => format!("Created {} ({})", res.name.bold().blue(), vm),
                    None => format!(
                        "Submitted {} ({})",
                        res.name.bold().blue(),
                        res.task.to_string().green()
                    ),
                };
                sp.stop_and_persist("✅", &message);
            }
            Err(e) => {
                sp.stop_and_persist("⛔️", "Couldn't create vm");
                return Err(e.into());
            }
        };
        Ok(())
    }
}
