//! Cloud-config fixture loader
//!
//! Parses a cloud-config document with `serde_yaml` and checks the
//! structural contract a test fixture has to satisfy before it is handed
//! to a provisioning agent: `users` and `write_files` are present, every
//! user has a name and every file entry carries `path`, `permissions` and
//! `content`. The loader is a pure transform from text to data; it never
//! touches the filesystem or runs anything embedded in the document.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::{ConfigDocument, FileSpec, Permissions, Section, UserSpec, scalar_text};
use crate::LoadError;

/// Load a cloud-config document with the default loader settings
pub fn load(source: &str) -> Result<ConfigDocument, LoadError> {
    ConfigFixtureLoader::new().load(source)
}

/// Loader with a small amount of policy on top of the structural checks
#[derive(Debug, Clone)]
pub struct ConfigFixtureLoader {
    require_absolute_paths: bool,
}

impl ConfigFixtureLoader {
    /// Create a loader that requires absolute `write_files` paths
    pub fn new() -> Self {
        Self {
            require_absolute_paths: true,
        }
    }

    /// Accept relative `write_files` paths
    pub fn allow_relative_paths(mut self) -> Self {
        self.require_absolute_paths = false;
        self
    }

    /// Parse and validate `source`
    pub fn load(&self, source: &str) -> Result<ConfigDocument, LoadError> {
        let root: Value = serde_yaml::from_str(source)?;

        let root = match root {
            Value::Mapping(map) => map,
            Value::Null => Mapping::new(),
            other => {
                return Err(LoadError::Parse {
                    message: format!(
                        "expected a mapping at the document root, found {}",
                        kind(&other)
                    ),
                    location: None,
                });
            }
        };

        let users = root
            .get("users")
            .ok_or_else(|| LoadError::MissingField("users".to_string()))?;
        let write_files = root
            .get("write_files")
            .ok_or_else(|| LoadError::MissingField("write_files".to_string()))?;

        let users = sequence("users", users)?
            .iter()
            .enumerate()
            .map(|(index, entry)| parse_user(index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        let write_files = sequence("write_files", write_files)?
            .iter()
            .enumerate()
            .map(|(index, entry)| self.parse_file(index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        let mut sections = Vec::new();
        for (key, value) in root {
            let key = match key {
                Value::String(key) => key,
                other => {
                    return Err(LoadError::Parse {
                        message: format!(
                            "top-level key {} is not a string",
                            scalar_text(&other).unwrap_or_else(|| kind(&other).to_string())
                        ),
                        location: None,
                    });
                }
            };
            if key == "users" || key == "write_files" {
                continue;
            }
            sections.push(Section::from_entry(key, value)?);
        }

        debug!(
            "Loaded cloud-config with {} users, {} files and {} other sections",
            users.len(),
            write_files.len(),
            sections.len()
        );

        Ok(ConfigDocument::new(users, write_files, sections))
    }

    fn parse_file(&self, index: usize, entry: &Value) -> Result<FileSpec, LoadError> {
        let field = |name: &str| format!("write_files[{index}].{name}");
        let file = WriteFileEntry::deserialize(entry).map_err(|_| {
            LoadError::invalid_type(format!("write_files[{index}]"), "a write_files mapping")
        })?;

        let path = file.path.ok_or_else(|| LoadError::MissingField(field("path")))?;
        let permissions = file
            .permissions
            .ok_or_else(|| LoadError::MissingField(field("permissions")))?;
        let content = file
            .content
            .ok_or_else(|| LoadError::MissingField(field("content")))?;

        // Only a string keeps the digits as written; a number has already
        // lost its radix (0o644 and 420 are the same integer)
        let permissions = match &permissions {
            Value::String(digits) => Permissions::parse(digits),
            _ => None,
        }
        .ok_or_else(|| LoadError::InvalidPermissions {
            path: path.clone(),
            value: scalar_text(&permissions).unwrap_or_else(|| kind(&permissions).to_string()),
        })?;

        if self.require_absolute_paths && !path.starts_with('/') {
            return Err(LoadError::RelativePath { index, path });
        }

        Ok(FileSpec {
            path,
            permissions,
            content,
            owner: file.owner,
            encoding: file.encoding,
            append: file.append,
            defer: file.defer,
        })
    }
}

impl Default for ConfigFixtureLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// User entry (can be a bare name or a full mapping)
#[derive(Deserialize)]
#[serde(untagged)]
enum UserEntry {
    Name(String),
    Full(Box<UserFullEntry>),
}

/// Full user entry; `name` stays optional so its absence can be reported
#[derive(Default, Deserialize)]
#[serde(default)]
struct UserFullEntry {
    #[serde(deserialize_with = "present")]
    name: Option<String>,
    passwd: Option<String>,
    #[serde(deserialize_with = "string_or_list")]
    sudo: Vec<String>,
    shell: Option<String>,
    lock_passwd: Option<bool>,
    inactive: Option<bool>,
    #[serde(deserialize_with = "comma_list")]
    groups: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    ssh_authorized_keys: Vec<String>,
}

/// File entry; the required keys stay optional so their absence can be
/// reported by name
#[derive(Deserialize)]
struct WriteFileEntry {
    path: Option<String>,
    permissions: Option<Value>,
    content: Option<String>,
    owner: Option<String>,
    encoding: Option<String>,
    append: Option<bool>,
    defer: Option<bool>,
}

/// One string, a list of strings, or `false` for none
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
    Flag(bool),
}

/// A key that is present reads as `Some`, even when its value is null
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Some(Option::<String>::deserialize(deserializer)?.unwrap_or_default()))
}

fn string_or_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    match Option::<StringOrList>::deserialize(deserializer)? {
        None | Some(StringOrList::Flag(false)) => Ok(Vec::new()),
        Some(StringOrList::One(item)) => Ok(vec![item]),
        Some(StringOrList::Many(items)) => Ok(items),
        Some(StringOrList::Flag(true)) => Err(D::Error::custom(
            "expected a string or a sequence of strings",
        )),
    }
}

/// Like [`string_or_list`], but a single string is split on commas
/// ("wheel, docker")
fn comma_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(string_or_list(deserializer)?
        .iter()
        .flat_map(|item| item.split(','))
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect())
}

fn parse_user(index: usize, entry: &Value) -> Result<UserSpec, LoadError> {
    let user = UserEntry::deserialize(entry)
        .map_err(|_| LoadError::invalid_type(format!("users[{index}]"), "a mapping or a name"))?;

    let full = match user {
        UserEntry::Name(name) => UserFullEntry {
            name: Some(name),
            ..Default::default()
        },
        UserEntry::Full(full) => *full,
    };

    let name = full
        .name
        .ok_or_else(|| LoadError::MissingField(format!("users[{index}].name")))?;
    if name.trim().is_empty() {
        return Err(LoadError::EmptyUserName { index });
    }

    Ok(UserSpec {
        name,
        passwd: full.passwd,
        sudo: full.sudo,
        shell: full.shell,
        lock_passwd: full.lock_passwd,
        inactive: full.inactive,
        groups: full.groups,
        ssh_authorized_keys: full.ssh_authorized_keys,
    })
}

/// A top-level section that must be a sequence; an empty key counts as empty
fn sequence<'a>(key: &str, value: &'a Value) -> Result<&'a [Value], LoadError> {
    match value {
        Value::Sequence(seq) => Ok(seq.as_slice()),
        Value::Null => Ok(&[]),
        _ => Err(LoadError::invalid_type(key, "a sequence")),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
