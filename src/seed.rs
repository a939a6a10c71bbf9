//! NoCloud seed reader
//!
//! A test harness usually hands the fixture to the guest through a NoCloud
//! seed: a directory (or a `cidata` volume) holding `user-data`,
//! `meta-data` and optionally `network-config`. [`Seed`] reads such a
//! directory the way the provisioning agent would, without changing it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs;
use tracing::debug;

use crate::config::ConfigDocument;
use crate::userdata::load_userdata;
use crate::{FixtureError, LoadError};

pub const USER_DATA: &str = "user-data";
pub const META_DATA: &str = "meta-data";
pub const NETWORK_CONFIG: &str = "network-config";

/// Instance identity from `meta-data`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SeedMetadata {
    pub instance_id: Option<String>,
    pub local_hostname: Option<String>,
}

impl SeedMetadata {
    /// Parse `meta-data` YAML; unknown keys are ignored
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Contents of a NoCloud seed directory
#[derive(Debug, Clone)]
pub struct Seed {
    dir: PathBuf,
    user_data: Vec<u8>,
    metadata: SeedMetadata,
    network_config: Option<String>,
}

impl Seed {
    /// Read a seed directory
    ///
    /// `user-data` and `meta-data` must exist; `network-config` is optional.
    pub async fn read(dir: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let dir = dir.as_ref();
        debug!("Reading NoCloud seed from {:?}", dir);

        let user_data_path = dir.join(USER_DATA);
        let user_data = fs::read(&user_data_path)
            .await
            .map_err(|e| FixtureError::io(&user_data_path, e))?;

        let meta_data_path = dir.join(META_DATA);
        let meta_data = fs::read_to_string(&meta_data_path)
            .await
            .map_err(|e| FixtureError::io(&meta_data_path, e))?;
        let metadata = SeedMetadata::parse(&meta_data)?;

        let network_config_path = dir.join(NETWORK_CONFIG);
        let network_config = match fs::read_to_string(&network_config_path).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(FixtureError::io(&network_config_path, e)),
        };

        Ok(Self {
            dir: dir.to_path_buf(),
            user_data,
            metadata,
            network_config,
        })
    }

    /// Load `user-data` as a cloud-config document
    pub fn document(&self) -> Result<ConfigDocument, FixtureError> {
        load_userdata(&self.user_data)
    }

    /// Directory the seed was read from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Raw `user-data` payload
    pub fn user_data(&self) -> &[u8] {
        &self.user_data
    }

    pub fn metadata(&self) -> &SeedMetadata {
        &self.metadata
    }

    /// Raw `network-config`, if the seed has one
    pub fn network_config(&self) -> Option<&str> {
        self.network_config.as_deref()
    }
}
