//! Core types for IIS provisioning.

use crate::binding::Binding;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default site name when none is configured.
pub const DEFAULT_SITE: &str = "Default Web Site";

/// Default binding when neither a binding nor protocol/host/port are configured.
pub const DEFAULT_BINDING: &str = "http://*:80";

/// Default virtual path.
pub const ROOT_PATH: &str = "/";

/// Default managed runtime version for new application pools.
pub const DEFAULT_RUNTIME_VERSION: &str = "v4.0";

/// Kind of resource managed through appcmd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// Application pool
    #[serde(rename = "apppool")]
    AppPool,
    /// Web site
    Site,
    /// Virtual application
    App,
    /// Virtual directory
    Vdir,
}

impl ResourceType {
    /// All resource types, in dependency order.
    pub const ALL: [ResourceType; 4] = [Self::AppPool, Self::Site, Self::App, Self::Vdir];

    /// The appcmd object noun (`list <noun>`, `add <noun>`).
    pub fn noun(&self) -> &'static str {
        match self {
            Self::AppPool => "apppool",
            Self::Site => "site",
            Self::App => "app",
            Self::Vdir => "vdir",
        }
    }

    /// Element name of one record in `list <noun> /xml` output.
    pub fn element(&self) -> &'static str {
        match self {
            Self::AppPool => "APPPOOL",
            Self::Site => "SITE",
            Self::App => "APP",
            Self::Vdir => "VDIR",
        }
    }

    /// Attribute that identifies a record of this type.
    pub fn key_attribute(&self) -> &'static str {
        match self {
            Self::AppPool => "APPPOOL.NAME",
            Self::Site => "SITE.NAME",
            Self::App => "path",
            Self::Vdir => "VDIR.NAME",
        }
    }

    /// Parse a resource type from its appcmd noun.
    pub fn from_noun(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "apppool" | "pool" => Some(Self::AppPool),
            "site" => Some(Self::Site),
            "app" => Some(Self::App),
            "vdir" => Some(Self::Vdir),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.noun())
    }
}

/// One record from an inventory query.
///
/// Attributes are kept exactly as appcmd reported them; there is no schema
/// beyond the key attribute used for lookup. Descriptors are never cached,
/// every query produces fresh ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor {
    attributes: BTreeMap<String, String>,
}

impl Descriptor {
    /// Create an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an attribute value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Set an attribute value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Builder-style [`Descriptor::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Iterate over all attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the descriptor has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Descriptor {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            attributes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Result of a convergence operation.
///
/// The flags describe what this call changed, not persisted state: a
/// resource that already existed comes back with every flag unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Applied {
    /// Authoritative record, re-queried after any change
    pub descriptor: Descriptor,
    /// The resource was created by this call
    pub created: bool,
    /// A TLS certificate was bound to the new site's port
    pub cert_added: bool,
    /// The application's physical path was updated
    pub vdir_updated: bool,
    /// Captured output of every command this call ran
    pub output: String,
}

impl Applied {
    /// A resource that already existed.
    pub fn existing(descriptor: Descriptor) -> Self {
        Self {
            descriptor,
            ..Default::default()
        }
    }

    /// A resource created by this call.
    pub fn created(descriptor: Descriptor, output: impl Into<String>) -> Self {
        Self {
            descriptor,
            created: true,
            output: output.into(),
            ..Default::default()
        }
    }

    /// Whether this call changed anything.
    pub fn changed(&self) -> bool {
        self.created || self.cert_added || self.vdir_updated
    }
}

/// Derive an application pool name from a virtual path.
///
/// Every `/` becomes `_`, so `/foo/bar` gives `_foo_bar`.
pub fn derive_pool_name(path: &str) -> String {
    path.replace('/', "_")
}

/// Desired state for one provisioning run.
///
/// Built with [`DesiredConfig::builder`], which fills in defaults and
/// validates the binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesiredConfig {
    /// Site name
    pub site: String,
    /// Binding passed to `add site /bindings:`
    pub binding: Option<String>,
    /// TLS certificate thumbprint, bound when the site uses https
    pub cert: Option<String>,
    /// Virtual path of the application
    pub path: String,
    /// Application pool name
    pub pool: String,
    /// Managed runtime version for a new pool
    pub managed_runtime_version: String,
    /// Physical path of the application content
    pub physical_path: String,
}

impl DesiredConfig {
    /// Start building a configuration.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Whether the requested path is the site root.
    pub fn is_root(&self) -> bool {
        self.path.trim_matches('/').is_empty()
    }

    /// The same site, pool and physical path at the root path.
    pub fn for_root_app(&self) -> Self {
        Self {
            path: ROOT_PATH.to_string(),
            ..self.clone()
        }
    }

    /// The configured binding, parsed.
    ///
    /// For a comma-separated list the first https entry is returned,
    /// otherwise the first entry.
    pub fn parsed_binding(&self) -> Result<Option<Binding>> {
        let Some(binding) = self.binding.as_deref() else {
            return Ok(None);
        };
        let mut list = Binding::parse_all(binding)?;
        let index = list.iter().position(Binding::is_secure).unwrap_or(0);
        Ok(Some(list.swap_remove(index)))
    }
}

/// Builder for [`DesiredConfig`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    site: Option<String>,
    binding: Option<String>,
    protocol: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    cert: Option<String>,
    path: Option<String>,
    pool: Option<String>,
    managed_runtime_version: Option<String>,
    physical_path: Option<String>,
}

impl ConfigBuilder {
    /// Set the site name.
    pub fn site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    /// Set an explicit binding string.
    pub fn binding(mut self, binding: impl Into<String>) -> Self {
        self.binding = Some(binding.into());
        self
    }

    /// Set the binding protocol (used with host and port).
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// Set the binding host (used with protocol and port).
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the binding port (used with protocol and host).
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the certificate thumbprint.
    pub fn cert(mut self, cert: impl Into<String>) -> Self {
        self.cert = Some(cert.into());
        self
    }

    /// Set the virtual path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the application pool name.
    pub fn pool(mut self, pool: impl Into<String>) -> Self {
        self.pool = Some(pool.into());
        self
    }

    /// Set the managed runtime version.
    pub fn managed_runtime_version(mut self, version: impl Into<String>) -> Self {
        self.managed_runtime_version = Some(version.into());
        self
    }

    /// Set the physical path.
    pub fn physical_path(mut self, path: impl Into<String>) -> Self {
        self.physical_path = Some(path.into());
        self
    }

    /// Resolve defaults and validate.
    ///
    /// The physical path falls back to the current working directory.
    pub fn build(self) -> Result<DesiredConfig> {
        let site = non_empty(self.site).unwrap_or_else(|| DEFAULT_SITE.to_string());

        let binding = match non_empty(self.binding) {
            Some(binding) => binding,
            None => match (self.protocol, self.host, self.port) {
                (Some(protocol), Some(host), Some(port)) => {
                    Binding::format_url(&protocol, &host, port)
                }
                _ => DEFAULT_BINDING.to_string(),
            },
        };
        Binding::parse_all(&binding)?;

        let path = non_empty(self.path).unwrap_or_else(|| ROOT_PATH.to_string());
        let pool = non_empty(self.pool).unwrap_or_else(|| derive_pool_name(&path));
        let managed_runtime_version = non_empty(self.managed_runtime_version)
            .unwrap_or_else(|| DEFAULT_RUNTIME_VERSION.to_string());

        let physical_path = match non_empty(self.physical_path) {
            Some(path) => path,
            None => std::env::current_dir()?.display().to_string(),
        };

        let cert = non_empty(self.cert);
        if let Some(cert) = &cert
            && cert.chars().any(char::is_whitespace)
        {
            return Err(Error::invalid(
                "cert",
                cert,
                "thumbprint must not contain whitespace",
            ));
        }

        Ok(DesiredConfig {
            site,
            binding: Some(binding),
            cert,
            path,
            pool,
            managed_runtime_version,
            physical_path,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
