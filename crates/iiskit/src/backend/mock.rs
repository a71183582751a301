//! In-memory IIS host for testing without appcmd.

use crate::backend::Executor;
use crate::binding::Binding;
use crate::error::Result;
use crate::types::{Descriptor, ResourceType};
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

static LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" list (\w+) /xml$").expect("valid regex"));

static ADD_POOL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#" add apppool /name:"([^"]*)" /managedRuntimeVersion:"([^"]*)"$"#)
        .expect("valid regex")
});

static ADD_SITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#" add site /name:"([^"]*)"(?: /bindings:(\S+))?$"#).expect("valid regex")
});

static ADD_APP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#" add app /site\.name:"([^"]*)" /path:"([^"]*)" /physicalPath:"([^"]*)" /applicationPool:"([^"]*)"$"#,
    )
    .expect("valid regex")
});

static SET_VDIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#" set vdir "([^"]*)" -physicalPath:"([^"]*)"$"#).expect("valid regex")
});

static ADD_SSLCERT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^netsh http add sslcert ipport=0\.0\.0\.0:(\d+) certhash=(\S+) appid=(\S+)$")
        .expect("valid regex")
});

#[derive(Debug, Default)]
struct HostState {
    pools: Vec<Descriptor>,
    sites: Vec<Descriptor>,
    apps: Vec<Descriptor>,
    vdirs: Vec<Descriptor>,
    ssl_bindings: Vec<Descriptor>,
    commands: Vec<String>,
    broken_listings: HashSet<ResourceType>,
    ignore_changes: bool,
}

/// Simulated appcmd/netsh host.
///
/// Understands exactly the command lines built by
/// [`CommandBuilder`](crate::command::CommandBuilder), keeps the resulting
/// pools, sites, applications and virtual directories in memory, and answers
/// `list <type> /xml` the way appcmd does. Every command is recorded.
/// Clones share state, so a clone handed to a client can be inspected
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct MockExecutor {
    state: Arc<Mutex<HostState>>,
}

impl MockExecutor {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an existing application pool.
    pub fn with_pool(self, name: &str, runtime_version: &str) -> Self {
        self.state().pools.push(pool_record(name, runtime_version));
        self
    }

    /// Add an existing site with bindings in appcmd form (`http/*:80:`).
    pub fn with_site(self, name: &str, bindings: &str) -> Self {
        {
            let mut state = self.state();
            let id = state.sites.len() + 1;
            state.sites.push(site_record(name, id, bindings));
        }
        self
    }

    /// Add an existing application and its root virtual directory.
    pub fn with_app(self, site: &str, path: &str, pool: &str, physical_path: &str) -> Self {
        {
            let mut state = self.state();
            let (app, vdir) = app_records(site, path, pool, physical_path);
            state.apps.push(app);
            state.vdirs.push(vdir);
        }
        self
    }

    /// Make `list <type> /xml` answer with a plain-text error.
    pub fn with_broken_listing(self, resource_type: ResourceType) -> Self {
        self.state().broken_listings.insert(resource_type);
        self
    }

    /// Accept `add`/`set` commands without changing anything.
    pub fn ignoring_changes(self) -> Self {
        self.state().ignore_changes = true;
        self
    }

    /// Every command executed so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.state().commands.clone()
    }

    /// Executed commands containing `needle`.
    pub fn commands_containing(&self, needle: &str) -> Vec<String> {
        self.state()
            .commands
            .iter()
            .filter(|c| c.contains(needle))
            .cloned()
            .collect()
    }

    /// Forget recorded commands, keeping host state.
    pub fn clear_commands(&self) {
        self.state().commands.clear();
    }

    /// Current records of one type.
    pub fn records(&self, resource_type: ResourceType) -> Vec<Descriptor> {
        let state = self.state();
        match resource_type {
            ResourceType::AppPool => state.pools.clone(),
            ResourceType::Site => state.sites.clone(),
            ResourceType::App => state.apps.clone(),
            ResourceType::Vdir => state.vdirs.clone(),
        }
    }

    /// Certificate bindings registered through netsh.
    pub fn ssl_bindings(&self) -> Vec<Descriptor> {
        self.state().ssl_bindings.clone()
    }
}

impl Executor for MockExecutor {
    fn execute(&self, command_line: &str) -> Result<String> {
        let mut state = self.state();
        state.commands.push(command_line.to_string());

        if let Some(caps) = LIST.captures(command_line) {
            return Ok(match ResourceType::from_noun(&caps[1]) {
                Some(ty) if state.broken_listings.contains(&ty) => {
                    "ERROR ( message:Configuration file is not well-formed XML )\n".to_string()
                }
                Some(ty) => render_list(ty, records_of(&state, ty)),
                None => format!("ERROR ( message:Unknown object type \"{}\". )\n", &caps[1]),
            });
        }

        if state.ignore_changes
            && (ADD_POOL.is_match(command_line)
                || ADD_SITE.is_match(command_line)
                || ADD_APP.is_match(command_line)
                || SET_VDIR.is_match(command_line))
        {
            return Ok(String::new());
        }

        if let Some(caps) = ADD_POOL.captures(command_line) {
            let name = &caps[1];
            if find(&state.pools, "APPPOOL.NAME", name).is_some() {
                return Ok(duplicate(name));
            }
            state.pools.push(pool_record(name, &caps[2]));
            return Ok(format!("APPPOOL object \"{name}\" added\n"));
        }

        if let Some(caps) = ADD_SITE.captures(command_line) {
            let name = &caps[1];
            if find(&state.sites, "SITE.NAME", name).is_some() {
                return Ok(duplicate(name));
            }
            let bindings = caps
                .get(2)
                .map(|b| to_appcmd_form(b.as_str()))
                .unwrap_or_default();
            let id = state.sites.len() + 1;
            state.sites.push(site_record(name, id, &bindings));
            return Ok(format!("SITE object \"{name}\" added\n"));
        }

        if let Some(caps) = ADD_APP.captures(command_line) {
            let site = &caps[1];
            if find(&state.sites, "SITE.NAME", site).is_none() {
                return Ok(format!(
                    "ERROR ( message:Cannot find SITE object with identifier \"{site}\". )\n"
                ));
            }
            let (app, vdir) = app_records(site, &caps[2], &caps[4], &caps[3]);
            let app_name = app.get("APP.NAME").unwrap_or_default().to_string();
            if find(&state.apps, "APP.NAME", &app_name).is_some() {
                return Ok(duplicate(&app_name));
            }
            let vdir_name = vdir.get("VDIR.NAME").unwrap_or_default().to_string();
            state.apps.push(app);
            state.vdirs.push(vdir);
            return Ok(format!(
                "APP object \"{app_name}\" added\nVDIR object \"{vdir_name}\" added\n"
            ));
        }

        if let Some(caps) = SET_VDIR.captures(command_line) {
            let name = &caps[1];
            let Some(index) = state
                .vdirs
                .iter()
                .position(|v| v.get("VDIR.NAME").is_some_and(|n| n.eq_ignore_ascii_case(name)))
            else {
                return Ok(format!(
                    "ERROR ( message:Cannot find VDIR object with identifier \"{name}\". )\n"
                ));
            };
            state.vdirs[index].insert("physicalPath", &caps[2]);
            return Ok(format!("VDIR object \"{name}\" changed\n"));
        }

        if let Some(caps) = ADD_SSLCERT.captures(command_line) {
            let record = Descriptor::new()
                .with("port", &caps[1])
                .with("certhash", &caps[2])
                .with("appid", &caps[3]);
            state.ssl_bindings.push(record);
            return Ok("\nSSL Certificate successfully added\n\n".to_string());
        }

        Ok("ERROR ( message:Unknown command. )\n".to_string())
    }
}

fn records_of(state: &HostState, resource_type: ResourceType) -> &[Descriptor] {
    match resource_type {
        ResourceType::AppPool => &state.pools,
        ResourceType::Site => &state.sites,
        ResourceType::App => &state.apps,
        ResourceType::Vdir => &state.vdirs,
    }
}

fn find<'a>(records: &'a [Descriptor], key: &str, value: &str) -> Option<&'a Descriptor> {
    records
        .iter()
        .find(|r| r.get(key).is_some_and(|v| v.eq_ignore_ascii_case(value)))
}

fn duplicate(name: &str) -> String {
    format!("ERROR ( message:Failed to add duplicate collection element \"{name}\". )\n")
}

fn pool_record(name: &str, runtime_version: &str) -> Descriptor {
    Descriptor::new()
        .with("APPPOOL.NAME", name)
        .with("PipelineMode", "Integrated")
        .with("RuntimeVersion", runtime_version)
        .with("state", "Started")
}

fn site_record(name: &str, id: usize, bindings: &str) -> Descriptor {
    Descriptor::new()
        .with("SITE.NAME", name)
        .with("SITE.ID", id.to_string())
        .with("bindings", bindings)
        .with("state", "Started")
}

fn app_records(site: &str, path: &str, pool: &str, physical_path: &str) -> (Descriptor, Descriptor) {
    let segment = path.trim_matches('/');
    let path = format!("/{segment}");
    let app_name = format!("{site}{path}");
    let vdir_name = if segment.is_empty() {
        app_name.clone()
    } else {
        format!("{app_name}/")
    };

    let app = Descriptor::new()
        .with("APP.NAME", &app_name)
        .with("APP.SITE.NAME", site)
        .with("path", &path)
        .with("APPPOOL.NAME", pool);
    let vdir = Descriptor::new()
        .with("VDIR.NAME", vdir_name)
        .with("APP.NAME", app_name)
        .with("path", "/")
        .with("physicalPath", physical_path);
    (app, vdir)
}

/// `https://*:443/` as appcmd lists it: `https/*:443:`.
fn to_appcmd_form(bindings: &str) -> String {
    bindings
        .split(',')
        .map(|binding| match Binding::parse(binding) {
            Ok(b) if b.host == "*" => format!("{}/*:{}:", b.protocol, b.port),
            Ok(b) => format!("{}/*:{}:{}", b.protocol, b.port, b.host),
            Err(_) => binding.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn render_list(resource_type: ResourceType, records: &[Descriptor]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<appcmd>\n");
    for record in records {
        xml.push_str("    <");
        xml.push_str(resource_type.element());
        for (key, value) in record.attributes() {
            xml.push_str(&format!(" {key}=\"{}\"", escape(value)));
        }
        xml.push_str(" />\n");
    }
    xml.push_str("</appcmd>\n");
    xml
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
