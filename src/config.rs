//! Target file: named sets of desired state.
//!
//! ```toml
//! [defaults]
//! physical_path = "~/sites"
//!
//! [targets.shop]
//! site = "Shop"
//! binding = "https://*:443"
//! cert = "0123456789abcdef"
//!
//! [targets.blog]
//! site = "Shop"
//! path = "blog"
//! physical_path = "~/sites/blog"
//! ```

use crate::cli::TargetArgs;
use crate::paths;
use anyhow::{Context, Result, bail};
use iiskit::{Binding, DesiredConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Name used for the target built from command-line flags alone.
pub const CLI_TARGET: &str = "cli";

/// One target's fields. Anything left out falls back to the defaults table,
/// then to the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,
    #[serde(
        alias = "runtime",
        alias = "managedRuntimeVersion",
        skip_serializing_if = "Option::is_none"
    )]
    pub managed_runtime_version: Option<String>,
    #[serde(alias = "physicalPath", skip_serializing_if = "Option::is_none")]
    pub physical_path: Option<String>,
}

impl TargetSpec {
    /// Layer `over` on top of `self`; fields set in `over` win.
    ///
    /// A binding and its protocol/host/port parts are one setting. A binding
    /// in `over` discards the parts of `self`. Parts in `over` replace the
    /// binding of `self`, and any part `over` leaves out is taken from
    /// `self`'s parts or from its binding.
    pub fn merged(&self, over: &Self) -> Self {
        let over_has_parts = over.protocol.is_some() || over.host.is_some() || over.port.is_some();
        let (binding, protocol, host, port) = if over.binding.is_some() {
            (over.binding.clone(), None, None, None)
        } else if over_has_parts {
            let base = self.binding.as_deref().and_then(primary_binding);
            (
                None,
                over.protocol
                    .clone()
                    .or_else(|| self.protocol.clone())
                    .or_else(|| base.as_ref().map(|b| b.protocol.clone())),
                over.host
                    .clone()
                    .or_else(|| self.host.clone())
                    .or_else(|| base.as_ref().map(|b| b.host.clone())),
                over.port.or(self.port).or(base.as_ref().map(|b| b.port)),
            )
        } else {
            (
                self.binding.clone(),
                self.protocol.clone(),
                self.host.clone(),
                self.port,
            )
        };

        Self {
            site: over.site.clone().or_else(|| self.site.clone()),
            binding,
            protocol,
            host,
            port,
            cert: over.cert.clone().or_else(|| self.cert.clone()),
            path: over.path.clone().or_else(|| self.path.clone()),
            pool: over.pool.clone().or_else(|| self.pool.clone()),
            managed_runtime_version: over
                .managed_runtime_version
                .clone()
                .or_else(|| self.managed_runtime_version.clone()),
            physical_path: over
                .physical_path
                .clone()
                .or_else(|| self.physical_path.clone()),
        }
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Build the desired configuration, filling in defaults.
    ///
    /// Without a binding, protocol/host/port must be given together or not
    /// at all.
    pub fn to_config(&self) -> Result<DesiredConfig> {
        if self.binding.is_none() {
            let missing: Vec<&str> = [
                ("protocol", self.protocol.is_none()),
                ("host", self.host.is_none()),
                ("port", self.port.is_none()),
            ]
            .into_iter()
            .filter_map(|(part, absent)| absent.then_some(part))
            .collect();
            if !missing.is_empty() && missing.len() < 3 {
                bail!(
                    "Incomplete binding: {} not set and no binding to take it from",
                    missing.join(", ")
                );
            }
        }

        let mut builder = DesiredConfig::builder();
        if let Some(site) = &self.site {
            builder = builder.site(site);
        }
        if let Some(binding) = &self.binding {
            builder = builder.binding(binding);
        }
        if let Some(protocol) = &self.protocol {
            builder = builder.protocol(protocol);
        }
        if let Some(host) = &self.host {
            builder = builder.host(host);
        }
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(cert) = &self.cert {
            builder = builder.cert(cert);
        }
        if let Some(path) = &self.path {
            builder = builder.path(path);
        }
        if let Some(pool) = &self.pool {
            builder = builder.pool(pool);
        }
        if let Some(version) = &self.managed_runtime_version {
            builder = builder.managed_runtime_version(version);
        }
        if let Some(physical_path) = &self.physical_path {
            builder = builder.physical_path(paths::expand_str(physical_path));
        }
        Ok(builder.build()?)
    }
}

impl From<&TargetArgs> for TargetSpec {
    fn from(args: &TargetArgs) -> Self {
        Self {
            site: args.site.clone(),
            binding: args.binding.clone(),
            protocol: args.protocol.clone(),
            host: args.host.clone(),
            port: args.port,
            cert: args.cert.clone(),
            path: args.path.clone(),
            pool: args.pool.clone(),
            managed_runtime_version: args.managed_runtime_version.clone(),
            physical_path: args.physical_path.clone(),
        }
    }
}

/// Parsed target file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetFile {
    pub defaults: TargetSpec,
    pub targets: BTreeMap<String, TargetSpec>,
}

impl TargetFile {
    /// Parse a target file from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid target file format")
    }

    /// Load a target file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load a target file, or `None` when it does not exist.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            log::debug!("No target file at {}", path.display());
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    /// Targets to run, with the defaults table applied.
    ///
    /// No names selects every target in name order.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<(String, TargetSpec)>> {
        if names.is_empty() {
            return Ok(self
                .targets
                .iter()
                .map(|(name, spec)| (name.clone(), self.defaults.merged(spec)))
                .collect());
        }

        names
            .iter()
            .map(|name| match self.targets.get(name) {
                Some(spec) => Ok((name.clone(), self.defaults.merged(spec))),
                None => bail!(
                    "Unknown target '{}' (available: {})",
                    name,
                    self.target_names().join(", ")
                ),
            })
            .collect()
    }

    /// Target names in order.
    pub fn target_names(&self) -> Vec<String> {
        self.targets.keys().cloned().collect()
    }
}

/// Resolve the targets to apply.
///
/// An explicit `file` must exist. Without one, the default target file is
/// used if present; otherwise the command-line flags form the only target.
/// Flags set on the command line override every file target.
pub fn resolve_targets(
    file: Option<&Path>,
    names: &[String],
    overrides: &TargetSpec,
) -> Result<Vec<(String, TargetSpec)>> {
    let target_file = match file {
        Some(path) => Some(TargetFile::load(path)?),
        None => TargetFile::load_optional(&paths::targets_file()?)?,
    };

    let Some(target_file) = target_file else {
        if !names.is_empty() {
            bail!("No target file found; cannot select targets by name");
        }
        if overrides.is_empty() {
            log::info!("No target file and no flags given, applying built-in defaults");
        }
        return Ok(vec![(CLI_TARGET.to_string(), overrides.clone())]);
    };

    if names.is_empty() && target_file.targets.is_empty() {
        return Ok(vec![(
            CLI_TARGET.to_string(),
            target_file.defaults.merged(overrides),
        )]);
    }

    Ok(target_file
        .resolve(names)?
        .into_iter()
        .map(|(name, spec)| (name, spec.merged(overrides)))
        .collect())
}

/// The target file path to use.
pub fn target_file_path(file: Option<PathBuf>) -> Result<PathBuf> {
    match file {
        Some(path) => Ok(path),
        None => paths::targets_file(),
    }
}

/// The https entry of a binding list, else its first entry.
fn primary_binding(binding: &str) -> Option<Binding> {
    let list = Binding::parse_all(binding).ok()?;
    let secure = list.iter().position(Binding::is_secure).unwrap_or(0);
    list.into_iter().nth(secure)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[defaults]
physical_path = 'C:\sites'
runtime = "v2.0"

[targets.shop]
site = "Shop"
binding = "https://*:443"
cert = "abc123"

[targets.blog]
site = "Shop"
path = "blog"
physicalPath = 'C:\sites\blog'
"#;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_sample() {
        let file = TargetFile::parse(SAMPLE).unwrap();
        assert_eq!(file.target_names(), vec!["blog", "shop"]);
        assert_eq!(file.defaults.managed_runtime_version.as_deref(), Some("v2.0"));
        assert_eq!(
            file.targets["blog"].physical_path.as_deref(),
            Some(r"C:\sites\blog")
        );
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(TargetFile::parse("[targets.a]\nsitename = \"x\"\n").is_err());
    }

    #[test]
    fn test_resolve_all_in_name_order_with_defaults() {
        let file = TargetFile::parse(SAMPLE).unwrap();
        let targets = file.resolve(&[]).unwrap();

        let names: Vec<_> = targets.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["blog", "shop"]);

        let shop = &targets[1].1;
        assert_eq!(shop.physical_path.as_deref(), Some(r"C:\sites"));
        assert_eq!(shop.managed_runtime_version.as_deref(), Some("v2.0"));

        // The target's own physical path wins over the default
        let blog = &targets[0].1;
        assert_eq!(blog.physical_path.as_deref(), Some(r"C:\sites\blog"));
    }

    #[test]
    fn test_resolve_named_keeps_requested_order() {
        let file = TargetFile::parse(SAMPLE).unwrap();
        let targets = file
            .resolve(&["shop".to_string(), "blog".to_string()])
            .unwrap();
        assert_eq!(targets[0].0, "shop");
        assert_eq!(targets[1].0, "blog");
    }

    #[test]
    fn test_resolve_unknown_target() {
        let file = TargetFile::parse(SAMPLE).unwrap();
        let err = file.resolve(&["nope".to_string()]).unwrap_err();
        assert!(err.to_string().contains("available: blog, shop"));
    }

    #[test]
    fn test_merge_binding_replaces_parts() {
        let base = TargetSpec {
            protocol: Some("http".into()),
            host: Some("*".into()),
            port: Some(80),
            ..Default::default()
        };
        let over = TargetSpec {
            binding: Some("https://*:443".into()),
            ..Default::default()
        };
        let merged = base.merged(&over);
        assert_eq!(merged.binding.as_deref(), Some("https://*:443"));
        assert!(merged.protocol.is_none() && merged.port.is_none());
    }

    #[test]
    fn test_merge_parts_replace_binding() {
        let base = TargetSpec {
            binding: Some("http://*:80".into()),
            protocol: Some("http".into()),
            host: Some("*".into()),
            ..Default::default()
        };
        let over = TargetSpec {
            port: Some(8080),
            ..Default::default()
        };
        let merged = base.merged(&over);
        assert!(merged.binding.is_none());
        assert_eq!(merged.port, Some(8080));
        assert_eq!(merged.protocol.as_deref(), Some("http"));

        let config = merged.to_config().unwrap();
        assert_eq!(config.binding.as_deref(), Some("http://*:8080"));
    }

    #[test]
    fn test_merge_port_keeps_file_binding_protocol_and_host() {
        let base = TargetSpec {
            binding: Some("https://*:443".into()),
            cert: Some("abc".into()),
            physical_path: Some(r"C:\x".into()),
            ..Default::default()
        };
        let over = TargetSpec {
            port: Some(8443),
            ..Default::default()
        };

        let config = base.merged(&over).to_config().unwrap();
        assert_eq!(config.binding.as_deref(), Some("https://*:8443"));
        assert_eq!(config.cert.as_deref(), Some("abc"));
    }

    #[test]
    fn test_merge_host_over_binding_list_uses_https_entry() {
        let base = TargetSpec {
            binding: Some("http://*:80/,https://*:443/".into()),
            physical_path: Some(r"C:\x".into()),
            ..Default::default()
        };
        let over = TargetSpec {
            host: Some("shop.example.com".into()),
            ..Default::default()
        };

        let config = base.merged(&over).to_config().unwrap();
        assert_eq!(
            config.binding.as_deref(),
            Some("https://shop.example.com:443")
        );
    }

    #[test]
    fn test_incomplete_parts_without_binding_rejected() {
        let spec = TargetSpec {
            port: Some(8443),
            physical_path: Some(r"C:\x".into()),
            ..Default::default()
        };
        let err = spec.to_config().unwrap_err();
        assert!(err.to_string().contains("protocol, host"));
    }

    #[test]
    fn test_to_config_fills_defaults() {
        let spec = TargetSpec {
            physical_path: Some(r"C:\x".into()),
            ..Default::default()
        };
        let config = spec.to_config().unwrap();
        assert_eq!(config.site, "Default Web Site");
        assert_eq!(config.binding.as_deref(), Some("http://*:80"));
        assert_eq!(config.path, "/");
        assert_eq!(config.pool, "_");
        assert_eq!(config.managed_runtime_version, "v4.0");
    }

    #[test]
    fn test_to_config_rejects_bad_binding() {
        let spec = TargetSpec {
            binding: Some("not a binding".into()),
            ..Default::default()
        };
        assert!(spec.to_config().is_err());
    }

    #[test]
    fn test_resolve_targets_from_explicit_file_with_overrides() {
        let file = write_temp(SAMPLE);
        let overrides = TargetSpec {
            cert: Some("fff".into()),
            ..Default::default()
        };

        let targets = resolve_targets(Some(file.path()), &[], &overrides).unwrap();
        assert_eq!(targets.len(), 2);
        assert!(targets.iter().all(|(_, s)| s.cert.as_deref() == Some("fff")));
    }

    #[test]
    fn test_resolve_targets_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(resolve_targets(Some(&missing), &[], &TargetSpec::default()).is_err());
    }

    #[test]
    fn test_resolve_targets_defaults_only_file() {
        let file = write_temp("[defaults]\nsite = \"Shop\"\n");
        let overrides = TargetSpec {
            path: Some("blog".into()),
            ..Default::default()
        };
        let targets = resolve_targets(Some(file.path()), &[], &overrides).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].0, CLI_TARGET);
        assert_eq!(targets[0].1.site.as_deref(), Some("Shop"));
        assert_eq!(targets[0].1.path.as_deref(), Some("blog"));
    }

    #[test]
    fn test_load_optional_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            TargetFile::load_optional(&dir.path().join("targets.toml"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_from_cli_args() {
        let args = TargetArgs {
            site: Some("Shop".into()),
            port: Some(8443),
            ..Default::default()
        };
        let spec = TargetSpec::from(&args);
        assert_eq!(spec.site.as_deref(), Some("Shop"));
        assert_eq!(spec.port, Some(8443));
        assert!(!spec.is_empty());
        assert!(TargetSpec::default().is_empty());
    }
}
