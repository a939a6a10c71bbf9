//! Cloud-config document model
//!
//! A [`ConfigDocument`] is the typed, immutable view of a cloud-config
//! `user_data` fixture. The two sections every fixture must carry,
//! `users` and `write_files`, get dedicated typed sequences; every other
//! top-level key becomes an independent [`Section`] so new cloud-init
//! modules can be recognised without reshaping existing fields.

pub mod loader;
pub mod render;

pub use loader::{ConfigFixtureLoader, load};
pub use render::CLOUD_CONFIG_HEADER;

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

use crate::userdata::{decode_base64, decompress_gzip};
use crate::{FixtureError, LoadError};

/// Root of a loaded cloud-config document
///
/// Constructed once by the loader and never mutated afterwards; all
/// access goes through the accessors below.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    users: Vec<UserSpec>,
    write_files: Vec<FileSpec>,
    sections: Vec<Section>,
}

impl ConfigDocument {
    pub(crate) fn new(users: Vec<UserSpec>, write_files: Vec<FileSpec>, sections: Vec<Section>) -> Self {
        Self {
            users,
            write_files,
            sections,
        }
    }

    /// Users to create, in source order
    pub fn users(&self) -> &[UserSpec] {
        &self.users
    }

    /// Files to write, in source order
    pub fn write_files(&self) -> &[FileSpec] {
        &self.write_files
    }

    /// All other top-level sections, in source order
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Look up a section by its top-level key
    pub fn section(&self, key: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.key() == key)
    }

    /// Look up a user by name
    pub fn user(&self, name: &str) -> Option<&UserSpec> {
        self.users.iter().find(|u| u.name == name)
    }

    /// The entry that ends up owning `path` on the guest
    ///
    /// Entries are applied in order, so the last one naming a path wins.
    pub fn file(&self, path: &str) -> Option<&FileSpec> {
        self.write_files.iter().rev().find(|f| f.path == path)
    }
}

impl FromStr for ConfigDocument {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        load(s)
    }
}

/// A user entry from the `users` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserSpec {
    pub name: String,
    /// Hashed password, passed through untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passwd: Option<String>,
    /// Sudoers grant lines
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sudo: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_passwd: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactive: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ssh_authorized_keys: Vec<String>,
}

impl UserSpec {
    /// A user with only a name, as produced by the `- name` shorthand
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A `write_files` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSpec {
    pub path: String,
    pub permissions: Permissions,
    /// Raw content exactly as it appeared in the document
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defer: Option<bool>,
}

impl FileSpec {
    /// Decode `content` according to `encoding`
    ///
    /// Nothing is written anywhere; this only shows the bytes the
    /// provisioning agent would put on disk.
    pub fn decoded_content(&self) -> Result<Vec<u8>, FixtureError> {
        match self.encoding.as_deref() {
            None => Ok(self.content.as_bytes().to_vec()),
            Some("base64") | Some("b64") => decode_base64(self.content.as_bytes()),
            // Raw gzip bytes carried in a YAML string (unusual but accepted)
            Some("gzip") | Some("gz") => decompress_gzip(self.content.as_bytes()),
            Some("gz+base64") | Some("gzip+base64") | Some("gz+b64") | Some("b64+gzip")
            | Some("base64+gzip") => decompress_gzip(&decode_base64(self.content.as_bytes())?),
            Some(other) => Err(FixtureError::InvalidData(format!(
                "Unknown encoding for {}: {}",
                self.path, other
            ))),
        }
    }
}

/// File mode from a `permissions` field
///
/// Keeps the original digits (`"0644"`) alongside the numeric mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permissions {
    raw: String,
    mode: u32,
}

impl Permissions {
    /// Parse a 3 or 4 digit octal string
    pub fn parse(value: &str) -> Option<Self> {
        let valid_len = value.len() == 3 || value.len() == 4;
        if !valid_len || !value.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
            return None;
        }
        let mode = u32::from_str_radix(value, 8).ok()?;
        Some(Self {
            raw: value.to_string(),
            mode,
        })
    }

    /// The digits as written in the document
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric mode, e.g. `0o644`
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Whether any execute bit is set
    pub fn is_executable(&self) -> bool {
        self.mode & 0o111 != 0
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Permissions {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

/// Command to run (can be string or list of args)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunCmd {
    /// Shell command as string
    Shell(String),
    /// Command with arguments; numbers and booleans keep their text
    Args(#[serde(deserialize_with = "scalar_list")] Vec<String>),
}

/// A `packages` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Package {
    /// Package name
    Name(String),
    /// `[name, version]` pin
    Pinned(#[serde(deserialize_with = "scalar_list")] Vec<String>),
}

/// Text of a YAML scalar, as the provisioning agent would pass it on
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Vec::<Value>::deserialize(deserializer)?
        .iter()
        .map(|item| scalar_text(item).ok_or_else(|| D::Error::custom("expected a scalar argument")))
        .collect()
}

/// Any top-level key other than `users` and `write_files`
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    /// `runcmd`: commands run late in boot
    RunCmd(Vec<RunCmd>),
    /// `bootcmd`: commands run early in boot
    BootCmd(Vec<RunCmd>),
    /// `packages`
    Packages(Vec<Package>),
    /// `ssh_pwauth`
    SshPwauth(bool),
    /// `hostname`
    Hostname(String),
    /// A key without a dedicated variant, kept as parsed
    Other { key: String, value: Value },
}

impl Section {
    /// The top-level key this section was read from
    pub fn key(&self) -> &str {
        match self {
            Self::RunCmd(_) => "runcmd",
            Self::BootCmd(_) => "bootcmd",
            Self::Packages(_) => "packages",
            Self::SshPwauth(_) => "ssh_pwauth",
            Self::Hostname(_) => "hostname",
            Self::Other { key, .. } => key.as_str(),
        }
    }

    pub(crate) fn from_entry(key: String, value: Value) -> Result<Self, LoadError> {
        let section = match (key.as_str(), value) {
            ("runcmd", value) => Self::RunCmd(commands("runcmd", value)?),
            ("bootcmd", value) => Self::BootCmd(commands("bootcmd", value)?),
            ("packages", value) => Self::Packages(
                serde_yaml::from_value(value)
                    .map_err(|_| LoadError::invalid_type("packages", "a sequence of packages"))?,
            ),
            ("hostname", Value::String(name)) => Self::Hostname(name),
            ("hostname", _) => return Err(LoadError::invalid_type("hostname", "a string")),
            // cloud-init also accepts "unchanged" here, which stays an Other
            ("ssh_pwauth", Value::Bool(enabled)) => Self::SshPwauth(enabled),
            (_, value) => Self::Other {
                key: key.clone(),
                value,
            },
        };
        Ok(section)
    }

    pub(crate) fn to_value(&self) -> Result<Value, LoadError> {
        let value = match self {
            Self::RunCmd(cmds) | Self::BootCmd(cmds) => serde_yaml::to_value(cmds),
            Self::Packages(packages) => serde_yaml::to_value(packages),
            Self::SshPwauth(enabled) => Ok(Value::Bool(*enabled)),
            Self::Hostname(name) => Ok(Value::String(name.clone())),
            Self::Other { value, .. } => Ok(value.clone()),
        };
        value.map_err(|e| LoadError::Render(e.to_string()))
    }
}

fn commands(key: &str, value: Value) -> Result<Vec<RunCmd>, LoadError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_yaml::from_value(value)
        .map_err(|_| LoadError::invalid_type(key, "a sequence of commands"))
}
