//! Test metadata: the attribute bag shared by test programs and test cases.
//!
//! Properties are addressed by canonical name and can be set from strings,
//! which is how suite files, listing output and the result store all talk
//! about them. A program's metadata provides the defaults for its cases;
//! case-level [`MetadataOverrides`] are resolved on top of it once, when the
//! case list is built.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use harrow_utils::units::Bytes;

use crate::error::ModelError;

/// Timeout applied to test bodies that do not declare their own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Prefix of user-defined properties.
pub const CUSTOM_PREFIX: &str = "custom.";

/// Every recognized property name, custom ones excluded.
pub const PROPERTY_NAMES: &[&str] = &[
    "allowed_architectures",
    "allowed_platforms",
    "description",
    "has_cleanup",
    "is_exclusive",
    "required_configs",
    "required_disk_space",
    "required_files",
    "required_memory",
    "required_programs",
    "required_user",
    "timeout",
];

/// Privileges a test case needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequiredUser {
    #[default]
    Any,
    Root,
    Unprivileged,
}

impl FromStr for RequiredUser {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Self::Any),
            "root" => Ok(Self::Root),
            "unprivileged" => Ok(Self::Unprivileged),
            other => Err(ModelError::invalid(
                "required_user",
                other,
                "must be empty, 'root' or 'unprivileged'",
            )),
        }
    }
}

impl fmt::Display for RequiredUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Any => "",
            Self::Root => "root",
            Self::Unprivileged => "unprivileged",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub allowed_architectures: BTreeSet<String>,
    pub allowed_platforms: BTreeSet<String>,
    pub custom: BTreeMap<String, String>,
    pub description: String,
    pub has_cleanup: bool,
    pub is_exclusive: bool,
    pub required_configs: BTreeSet<String>,
    pub required_disk_space: Bytes,
    pub required_files: BTreeSet<PathBuf>,
    pub required_memory: Bytes,
    pub required_programs: BTreeSet<PathBuf>,
    pub required_user: RequiredUser,
    pub timeout: Duration,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            allowed_architectures: BTreeSet::new(),
            allowed_platforms: BTreeSet::new(),
            custom: BTreeMap::new(),
            description: String::new(),
            has_cleanup: false,
            is_exclusive: false,
            required_configs: BTreeSet::new(),
            required_disk_space: Bytes(0),
            required_files: BTreeSet::new(),
            required_memory: Bytes(0),
            required_programs: BTreeSet::new(),
            required_user: RequiredUser::Any,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Metadata {
    /// Every property rendered as a string, keyed by canonical name.
    ///
    /// Feeding the result back through [`MetadataBuilder::set`] reproduces
    /// an equal value.
    #[must_use]
    pub fn to_properties(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        props.insert(
            "allowed_architectures".to_string(),
            join_words(&self.allowed_architectures),
        );
        props.insert(
            "allowed_platforms".to_string(),
            join_words(&self.allowed_platforms),
        );
        for (key, value) in &self.custom {
            props.insert(format!("{CUSTOM_PREFIX}{key}"), value.clone());
        }
        props.insert("description".to_string(), self.description.clone());
        props.insert("has_cleanup".to_string(), self.has_cleanup.to_string());
        props.insert("is_exclusive".to_string(), self.is_exclusive.to_string());
        props.insert(
            "required_configs".to_string(),
            join_words(&self.required_configs),
        );
        props.insert(
            "required_disk_space".to_string(),
            self.required_disk_space.to_string(),
        );
        props.insert(
            "required_files".to_string(),
            join_paths(&self.required_files),
        );
        props.insert(
            "required_memory".to_string(),
            self.required_memory.to_string(),
        );
        props.insert(
            "required_programs".to_string(),
            join_paths(&self.required_programs),
        );
        props.insert("required_user".to_string(), self.required_user.to_string());
        props.insert("timeout".to_string(), self.timeout.as_secs().to_string());
        props
    }
}

fn join_words(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

fn join_paths(set: &BTreeSet<PathBuf>) -> String {
    set.iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_words(value: &str) -> BTreeSet<String> {
    value.split_whitespace().map(str::to_string).collect()
}

fn parse_bool(property: &str, value: &str) -> Result<bool, ModelError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ModelError::invalid(property, other, "expected 'true' or 'false'")),
    }
}

fn parse_bytes(property: &str, value: &str) -> Result<Bytes, ModelError> {
    value
        .parse::<Bytes>()
        .map_err(|e| ModelError::invalid(property, value, e.to_string()))
}

/// Builds a [`Metadata`] from string-valued properties on top of a base.
#[derive(Debug, Clone, Default)]
pub struct MetadataBuilder {
    metadata: Metadata,
}

impl MetadataBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing values; properties not set later are inherited.
    #[must_use]
    pub fn from_base(base: &Metadata) -> Self {
        Self {
            metadata: base.clone(),
        }
    }

    /// Set one property by canonical name.
    pub fn set(&mut self, name: &str, value: &str) -> Result<&mut Self, ModelError> {
        if let Some(key) = name.strip_prefix(CUSTOM_PREFIX) {
            if key.is_empty() {
                return Err(ModelError::UnknownProperty(name.to_string()));
            }
            self.metadata
                .custom
                .insert(key.to_string(), value.to_string());
            return Ok(self);
        }

        let md = &mut self.metadata;
        match name {
            "allowed_architectures" => md.allowed_architectures = split_words(value),
            "allowed_platforms" => md.allowed_platforms = split_words(value),
            "description" => md.description = value.to_string(),
            "has_cleanup" => md.has_cleanup = parse_bool(name, value)?,
            "is_exclusive" => md.is_exclusive = parse_bool(name, value)?,
            "required_configs" => md.required_configs = split_words(value),
            "required_disk_space" => md.required_disk_space = parse_bytes(name, value)?,
            "required_files" => {
                let mut files = BTreeSet::new();
                for word in value.split_whitespace() {
                    let path = Path::new(word);
                    if !path.is_absolute() {
                        return Err(ModelError::invalid(name, word, "path must be absolute"));
                    }
                    files.insert(path.to_path_buf());
                }
                md.required_files = files;
            }
            "required_memory" => md.required_memory = parse_bytes(name, value)?,
            "required_programs" => {
                md.required_programs = value.split_whitespace().map(PathBuf::from).collect();
            }
            "required_user" => md.required_user = value.parse()?,
            "timeout" => {
                let secs: u64 = value
                    .trim()
                    .parse()
                    .map_err(|_| ModelError::invalid(name, value, "expected whole seconds"))?;
                if secs == 0 {
                    return Err(ModelError::invalid(name, value, "must be positive"));
                }
                md.timeout = Duration::from_secs(secs);
            }
            _ => return Err(ModelError::UnknownProperty(name.to_string())),
        }
        Ok(self)
    }

    /// Apply every `(name, value)` pair in order.
    pub fn set_all<'a, I>(&mut self, properties: I) -> Result<&mut Self, ModelError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, value) in properties {
            self.set(name, value)?;
        }
        Ok(self)
    }

    #[must_use]
    pub fn set_timeout(mut self, timeout: Duration) -> Self {
        self.metadata.timeout = timeout;
        self
    }

    #[must_use]
    pub fn set_exclusive(mut self, exclusive: bool) -> Self {
        self.metadata.is_exclusive = exclusive;
        self
    }

    #[must_use]
    pub fn build(&self) -> Metadata {
        self.metadata.clone()
    }
}

/// A partial set of properties layered over a base [`Metadata`].
///
/// Names and values are validated on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataOverrides {
    properties: BTreeMap<String, String>,
}

impl MetadataOverrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name = value`, rejecting unknown names and malformed values.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<(), ModelError> {
        MetadataBuilder::new().set(name, value)?;
        self.properties.insert(name.to_string(), value.to_string());
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Effective metadata: `base` with these properties replacing its values.
    pub fn apply(&self, base: &Metadata) -> Result<Metadata, ModelError> {
        let mut builder = MetadataBuilder::from_base(base);
        builder.set_all(self.iter())?;
        Ok(builder.build())
    }
}
