//! Convergence operations: ensure a resource exists, creating it if needed.
//!
//! Each operation checks the inventory first and runs at most one create
//! (or update) command. Success is judged by re-querying, never by the
//! command's output or exit status.

use crate::Client;
use crate::binding::Binding;
use crate::error::{Error, Result};
use crate::inventory;
use crate::types::{Applied, DesiredConfig, Descriptor, ResourceType};

/// Ensure the application pool exists.
pub fn ensure_pool(client: &Client, config: &DesiredConfig) -> Result<Applied> {
    let ty = ResourceType::AppPool;
    if let Some(pool) = inventory::find(client, ty, ty.key_attribute(), &config.pool)? {
        log::debug!("Application pool '{}' already exists", config.pool);
        return Ok(Applied::existing(pool));
    }

    let cmd = client
        .commands()
        .add_apppool(&config.pool, &config.managed_runtime_version)?;
    let output = client.run(&cmd)?;

    let pool = observed(
        inventory::find(client, ty, ty.key_attribute(), &config.pool)?,
        ty,
        &config.pool,
        &output,
    )?;
    log::info!("Created application pool '{}'", config.pool);
    Ok(Applied::created(pool, output))
}

/// Ensure the site exists, binding a certificate when it is new and secure.
pub fn ensure_site(client: &Client, config: &DesiredConfig) -> Result<Applied> {
    let ty = ResourceType::Site;
    if let Some(site) = inventory::find(client, ty, ty.key_attribute(), &config.site)? {
        log::debug!("Site '{}' already exists", config.site);
        return Ok(Applied::existing(site));
    }

    // Validate before anything is created
    let configured = config.parsed_binding()?;

    let cmd = client
        .commands()
        .add_site(&config.site, config.binding.as_deref())?;
    let output = client.run(&cmd)?;

    let site = observed(
        inventory::find(client, ty, ty.key_attribute(), &config.site)?,
        ty,
        &config.site,
        &output,
    )?;
    log::info!("Created site '{}'", config.site);
    let mut applied = Applied::created(site, output);

    let Some(cert) = config.cert.as_deref() else {
        return Ok(applied);
    };

    match secure_binding(&applied.descriptor, configured.as_ref()) {
        Some(binding) => {
            let cmd = client.commands().add_sslcert(binding.port, cert)?;
            let output = client.run(&cmd)?;
            log::info!(
                "Bound certificate {} to port {} for site '{}'",
                cert,
                binding.port,
                config.site
            );
            applied.output.push_str(&output);
            applied.cert_added = true;
        }
        None => {
            log::debug!(
                "Site '{}' has no https binding; certificate not bound",
                config.site
            );
        }
    }

    Ok(applied)
}

/// The https binding of a newly created site.
///
/// The bindings appcmd reports for the site are authoritative; the
/// configured binding is used only when the record carries none.
fn secure_binding(site: &Descriptor, configured: Option<&Binding>) -> Option<Binding> {
    match site.get("bindings").filter(|b| !b.trim().is_empty()) {
        Some(listed) => Binding::parse_list(listed)
            .into_iter()
            .find(Binding::is_secure),
        None => configured.filter(|b| b.is_secure()).cloned(),
    }
}

/// Ensure the application exists; update its physical path if it does.
pub fn ensure_application(client: &Client, config: &DesiredConfig) -> Result<Applied> {
    if let Some(app) = inventory::find_app(client, &config.site, &config.path)? {
        log::debug!(
            "Application '{}' already exists in site '{}'",
            config.path,
            config.site
        );
        return update_virtual_directory(client, app, config);
    }

    let cmd = client.commands().add_app(
        &config.site,
        &config.path,
        &config.physical_path,
        &config.pool,
    )?;
    let output = client.run(&cmd)?;

    let app = observed(
        inventory::find_app(client, &config.site, &config.path)?,
        ResourceType::App,
        &config.path,
        &output,
    )?;
    log::info!(
        "Created application '{}' in site '{}'",
        config.path,
        config.site
    );
    Ok(Applied::created(app, output))
}

/// Point an existing application's virtual directory at the configured
/// physical path.
pub fn update_virtual_directory(
    client: &Client,
    app: Descriptor,
    config: &DesiredConfig,
) -> Result<Applied> {
    let cmd = client
        .commands()
        .set_vdir(&config.site, &config.path, &config.physical_path)?;
    let output = client.run(&cmd)?;

    let app = match inventory::find_app(client, &config.site, &config.path)? {
        Some(found) => found,
        None => {
            return Err(Error::CreationNotObserved {
                resource_type: ResourceType::App,
                name: app
                    .get(ResourceType::App.key_attribute())
                    .unwrap_or(&config.path)
                    .to_string(),
                output,
            });
        }
    };

    log::info!(
        "Updated physical path of '{}' in site '{}' to {}",
        config.path,
        config.site,
        config.physical_path
    );
    Ok(Applied {
        descriptor: app,
        vdir_updated: true,
        output,
        ..Default::default()
    })
}

fn observed(
    found: Option<Descriptor>,
    resource_type: ResourceType,
    name: &str,
    output: &str,
) -> Result<Descriptor> {
    found.ok_or_else(|| Error::CreationNotObserved {
        resource_type,
        name: name.to_string(),
        output: output.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockExecutor;
    use crate::xml::XmlDeserializer;

    fn client(host: &MockExecutor) -> Client {
        Client::with_backend(Box::new(host.clone()), Box::new(XmlDeserializer)).with_appcmd("appcmd")
    }

    fn config() -> crate::types::ConfigBuilder {
        DesiredConfig::builder()
            .site("Shop")
            .physical_path(r"C:\sites\shop")
    }

    #[test]
    fn test_ensure_pool_creates_missing_pool() {
        let host = MockExecutor::new();
        let config = config().path("/foo/bar").build().unwrap();

        let applied = ensure_pool(&client(&host), &config).unwrap();
        assert!(applied.created);
        assert_eq!(applied.descriptor.get("APPPOOL.NAME"), Some("_foo_bar"));
        assert_eq!(applied.output, "APPPOOL object \"_foo_bar\" added\n");
        assert_eq!(
            host.commands_containing(" add apppool "),
            vec![r#"appcmd add apppool /name:"_foo_bar" /managedRuntimeVersion:"v4.0""#]
        );
    }

    #[test]
    fn test_ensure_pool_keeps_existing_pool() {
        let host = MockExecutor::new().with_pool("SHOP", "v2.0");
        let config = config().pool("shop").build().unwrap();

        let applied = ensure_pool(&client(&host), &config).unwrap();
        assert!(!applied.changed());
        assert_eq!(applied.descriptor.get("RuntimeVersion"), Some("v2.0"));
        assert!(host.commands_containing(" add ").is_empty());
    }

    #[test]
    fn test_ensure_pool_not_observed() {
        let host = MockExecutor::new().ignoring_changes();
        let config = config().pool("web").build().unwrap();

        let err = ensure_pool(&client(&host), &config).unwrap_err();
        assert!(matches!(
            err,
            Error::CreationNotObserved {
                resource_type: ResourceType::AppPool,
                ..
            }
        ));
    }

    #[test]
    fn test_ensure_pool_does_not_create_when_inventory_fails() {
        let host = MockExecutor::new().with_broken_listing(ResourceType::AppPool);
        let config = config().build().unwrap();

        let err = ensure_pool(&client(&host), &config).unwrap_err();
        assert!(matches!(err, Error::InventoryQuery { .. }));
        assert!(host.commands_containing(" add ").is_empty());
    }

    #[test]
    fn test_ensure_site_binds_certificate_after_creation() {
        let host = MockExecutor::new();
        let config = config()
            .binding("https://*:443/")
            .cert("0123456789abcdef")
            .build()
            .unwrap();

        let applied = ensure_site(&client(&host), &config).unwrap();
        assert!(applied.created);
        assert!(applied.cert_added);
        assert!(applied.output.starts_with("SITE object \"Shop\" added\n"));
        assert!(applied.output.contains("SSL Certificate successfully added"));

        let commands = host.commands();
        let add_site = commands
            .iter()
            .position(|c| c.contains(" add site "))
            .unwrap();
        let sslcert: Vec<_> = commands
            .iter()
            .enumerate()
            .filter(|(_, c)| c.starts_with("netsh http add sslcert"))
            .collect();
        assert_eq!(sslcert.len(), 1);
        assert!(sslcert[0].0 > add_site);
        assert_eq!(
            sslcert[0].1,
            "netsh http add sslcert ipport=0.0.0.0:443 certhash=0123456789abcdef appid={ab3c58f7-8316-42e3-bc6e-771d4ce4b201}"
        );
    }

    #[test]
    fn test_ensure_site_without_cert_skips_binding() {
        let host = MockExecutor::new();
        let config = config().binding("https://*:443/").build().unwrap();

        let applied = ensure_site(&client(&host), &config).unwrap();
        assert!(applied.created);
        assert!(!applied.cert_added);
        assert!(host.commands_containing("netsh").is_empty());
    }

    #[test]
    fn test_ensure_site_http_binding_skips_cert() {
        let host = MockExecutor::new();
        let config = config()
            .binding("http://*:8080")
            .cert("abc")
            .build()
            .unwrap();

        let applied = ensure_site(&client(&host), &config).unwrap();
        assert!(applied.created);
        assert!(!applied.cert_added);
        assert!(host.ssl_bindings().is_empty());
    }

    #[test]
    fn test_ensure_site_binding_list_binds_https_port() {
        let host = MockExecutor::new();
        let config = config()
            .binding("http://*:80/,https://*:8443/")
            .cert("abc")
            .build()
            .unwrap();

        let applied = ensure_site(&client(&host), &config).unwrap();
        assert!(applied.cert_added);
        assert_eq!(
            applied.descriptor.get("bindings"),
            Some("http/*:80:,https/*:8443:")
        );
        let bindings = host.ssl_bindings();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].get("port"), Some("8443"));
    }

    #[test]
    fn test_existing_site_never_gets_certificate() {
        let host = MockExecutor::new().with_site("shop", "https/*:443:");
        let config = config()
            .binding("https://*:443/")
            .cert("abc")
            .build()
            .unwrap();

        let applied = ensure_site(&client(&host), &config).unwrap();
        assert!(!applied.changed());
        assert!(host.commands_containing("netsh").is_empty());
    }

    #[test]
    fn test_ensure_site_not_observed() {
        let host = MockExecutor::new().ignoring_changes();
        let config = config().build().unwrap();

        let err = ensure_site(&client(&host), &config).unwrap_err();
        assert!(matches!(
            err,
            Error::CreationNotObserved {
                resource_type: ResourceType::Site,
                ..
            }
        ));
        assert!(host.commands_containing("netsh").is_empty());
    }

    #[test]
    fn test_secure_binding_prefers_listed_bindings() {
        let site = Descriptor::new().with("bindings", "http/*:80:,https/*:8443:");
        let configured = Binding::parse("https://*:443/").unwrap();
        let found = secure_binding(&site, Some(&configured)).unwrap();
        assert_eq!(found.port, 8443);

        let bare = Descriptor::new().with("SITE.NAME", "Shop");
        let found = secure_binding(&bare, Some(&configured)).unwrap();
        assert_eq!(found.port, 443);

        let plain = Descriptor::new().with("bindings", "http/*:80:");
        assert!(secure_binding(&plain, Some(&configured)).is_none());
    }

    #[test]
    fn test_ensure_application_creates_app() {
        let host = MockExecutor::new().with_site("Shop", "http/*:80:");
        let config = config().path("blog").build().unwrap();

        let applied = ensure_application(&client(&host), &config).unwrap();
        assert!(applied.created);
        assert_eq!(applied.descriptor.get("path"), Some("/blog"));
        assert_eq!(
            host.commands_containing(" add app "),
            vec![
                r#"appcmd add app /site.name:"Shop" /path:"/blog/" /physicalPath:"C:\sites\shop" /applicationPool:"blog""#
            ]
        );
    }

    #[test]
    fn test_ensure_application_updates_existing_vdir() {
        let host = MockExecutor::new()
            .with_site("Shop", "http/*:80:")
            .with_app("Shop", "/Blog", "blog", r"C:\old");
        let config = config()
            .path("blog")
            .physical_path(r"D:\new")
            .build()
            .unwrap();

        let applied = ensure_application(&client(&host), &config).unwrap();
        assert!(!applied.created);
        assert!(applied.vdir_updated);
        assert_eq!(applied.output, "VDIR object \"Shop/blog/\" changed\n");
        assert!(host.commands_containing(" add app ").is_empty());

        let vdirs = host.records(ResourceType::Vdir);
        assert_eq!(vdirs[0].get("physicalPath"), Some(r"D:\new"));
    }

    #[test]
    fn test_ensure_application_not_observed() {
        let host = MockExecutor::new()
            .with_site("Shop", "http/*:80:")
            .ignoring_changes();
        let config = config().path("blog").build().unwrap();

        let err = ensure_application(&client(&host), &config).unwrap_err();
        assert!(matches!(
            err,
            Error::CreationNotObserved {
                resource_type: ResourceType::App,
                ..
            }
        ));
    }
}
