use std::path::PathBuf;
use std::{env, fs, io};

use anyhow::{Context, Result};
use log::warn;
use serde::de::DeserializeOwned;

use crate::dirs::{self, ensure_dir_exists};

pub struct PathSet {
    pub config_path: PathBuf,
    pub data_path: PathBuf,
    pub pki_path: PathBuf,
}

impl PathSet {
    pub fn new(config_path: Option<PathBuf>, data_path: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => match env::var("MEDGATE_CONFIG") {
                Ok(path) => PathBuf::from(path),
                Err(_) => dirs::config_dir()?,
            },
        };

        let data_path = match data_path {
            Some(path) => path,
            None => match env::var("MEDGATE_DATA") {
                Ok(path) => PathBuf::from(path),
                Err(_) => dirs::data_dir()?,
            },
        };

        // PKI path is always under config path
        let pki_path = config_path.join("pki");

        ensure_dir_exists(&config_path)
            .with_context(|| format!("ensure config directory: {}", config_path.display()))?;
        ensure_dir_exists(&data_path)
            .with_context(|| format!("ensure data directory: {}", data_path.display()))?;
        ensure_dir_exists(&pki_path)
            .with_context(|| format!("ensure pki directory: {}", pki_path.display()))?;

        Ok(Self {
            config_path,
            data_path,
            pki_path,
        })
    }

    pub fn load_config<T>(&self, name: &str) -> Result<T>
    where
        T: CommonConfig + DeserializeOwned,
    {
        let path = self.config_path.join(format!("{name}.toml"));
        let mut cfg: T = match fs::read_to_string(&path) {
            Ok(s) => toml::from_str(&s)
                .with_context(|| format!("parse config toml: {}", path.display()))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!("Config file for {name} not found, using defaults");
                T::default()
            }
            Err(err) => {
                return Err(err).context(format!("read config file: {}", path.display()));
            }
        };

        cfg.complete(self).context("validate config")?;
        Ok(cfg)
    }
}

pub trait CommonConfig {
    fn default() -> Self;
    fn complete(&mut self, ps: &PathSet) -> Result<()>;
}

/// See: [`shellexpand::full`].
pub fn expandenv(name: &str, s: impl AsRef<str>) -> Result<String> {
    let s =
        shellexpand::full(s.as_ref()).with_context(|| format!("expand env value for '{name}'"))?;
    Ok(s.to_string())
}

#[cfg(test)]
impl PathSet {
    pub fn new_test(base: &std::path::Path) -> Self {
        let ps = Self {
            config_path: base.join("config"),
            data_path: base.join("data"),
            pki_path: base.join("config").join("pki"),
        };
        ensure_dir_exists(&ps.pki_path).unwrap();
        ensure_dir_exists(&ps.data_path).unwrap();
        ps
    }
}
