use clap::{Parser, ValueHint};
use clap_verbosity_flag::Verbosity;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// The vSphere sdk endpoint (ex: https://vcenter.example.com/sdk).
    /// Credentials are read from VC_USERNAME and VC_PASSWORD.
    #[arg(value_name = "URL", value_hint = ValueHint::Url)]
    pub url: String,

    /// A toml file overriding the provisioning defaults.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    /// Wait for the creation task to complete.
    #[arg(long)]
    pub wait: bool,

    #[command(flatten)]
    pub verbose: Verbosity,
}
