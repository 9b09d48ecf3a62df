use super::{ProvisionConfig, CONFIG_DIR};

// Config
use std::fs;
use std::path::{Path, PathBuf};

// Error Handling
use log::{debug, info};
use miette::Result;
use vcprov_error::{CastError, TomlError, VcprovError, WrapError};

impl ProvisionConfig {
    /*
     * Get config from FHS path.
     */
    fn release_path() -> PathBuf {
        let mut path = PathBuf::from(CONFIG_DIR);
        path.push("config.toml");
        path
    }
    /**
    * Load the configuration:
    * - from the given file, which must exist,
    * - else from /etc/vcprov/config.toml if present,
    * - else the built-in defaults.
    */
    pub fn get(path: Option<&str>) -> Result<Self, VcprovError> {
        match path {
            Some(path) => {
                info!("Load config file {}.", path);
                match Self::from_file(path) {
                    Ok(config) => Ok(config),
                    Err(e) => {
                        let message = format!("Couldn't load config file {:#?}", path);
                        Err(WrapError::builder()
                            .msg(&message)
                            .help("Remove the --config flag to use the built-in defaults")
                            .origin(e.into())
                            .build()
                            .into())
                    }
                }
            }
            None => {
                let path = Self::release_path();
                if Path::new(&path).exists() {
                    info!("Load config file {}.", path.display());
                    Self::from_file(&path.display().to_string())
                } else {
                    debug!("No config file, using defaults.");
                    Ok(Self::default())
                }
            }
        }
    }
    pub fn from_file(path: &str) -> Result<Self, VcprovError> {
        let string = fs::read_to_string(path)?;
        Self::from_toml(&string)
    }
    pub fn from_toml(string: &str) -> Result<Self, VcprovError> {
        let res = toml::from_str::<Self>(string);
        let item = match res {
            Ok(res) => res,
            Err(e) => {
                let err = CastError::TomlError(TomlError::new(e, string));
                return Err(err.into());
            }
        };
        Ok(item)
    }
}
