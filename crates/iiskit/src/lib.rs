//! # iiskit
//!
//! Idempotent provisioning of IIS resources through `appcmd`.
//!
//! This crate provides functionality for:
//! - Querying the pool, site, application and virtual directory inventory
//! - Locating resources by case-insensitive key
//! - Creating only what is missing and re-observing it afterwards
//! - Binding a TLS certificate to a newly created secure site
//!
//! ## Example
//!
//! ```no_run
//! use iiskit::{Client, DesiredConfig};
//! use iiskit::reconcile::NoObserver;
//!
//! let client = Client::new();
//! let config = DesiredConfig::builder()
//!     .site("Shop")
//!     .binding("https://*:443")
//!     .cert("0123456789abcdef")
//!     .path("blog")
//!     .physical_path(r"C:\inetpub\shop\blog")
//!     .build()
//!     .expect("valid configuration");
//!
//! let report = client.reconcile(&config, &NoObserver).expect("reconcile failed");
//! for step in &report.steps {
//!     println!("{}: {}", step.step, step.message());
//! }
//! ```
//!
//! ## Testing
//!
//! [`backend::MockExecutor`] simulates a host in memory, so everything above
//! can run without IIS:
//!
//! ```
//! use iiskit::backend::MockExecutor;
//! use iiskit::xml::XmlDeserializer;
//! use iiskit::{Client, ResourceType};
//!
//! let host = MockExecutor::new().with_pool("DefaultAppPool", "v4.0");
//! let client = Client::with_backend(Box::new(host.clone()), Box::new(XmlDeserializer));
//! let pools = client.list(ResourceType::AppPool).unwrap();
//! assert_eq!(pools[0].get("APPPOOL.NAME"), Some("DefaultAppPool"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod binding;
pub mod command;
pub mod converge;
pub mod error;
pub mod inventory;
pub mod reconcile;
pub mod types;
pub mod xml;

pub use binding::Binding;
pub use error::{Error, ErrorCategory, Result};
pub use reconcile::{Reconciler, Report, Status, Step, StepObserver, StepReport};
pub use types::{Applied, ConfigBuilder, Descriptor, DesiredConfig, ResourceType};

use backend::Executor;
use command::CommandBuilder;
use xml::{Deserializer, XmlDeserializer};

/// High-level client for IIS provisioning.
///
/// The client owns the executor that runs command lines, the deserializer
/// that reads listings, and the builder that renders commands.
pub struct Client {
    executor: Box<dyn Executor>,
    deserializer: Box<dyn Deserializer>,
    commands: CommandBuilder,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a client that runs commands through the system shell.
    pub fn new() -> Self {
        Self::with_backend(
            Box::new(backend::default_executor()),
            Box::new(XmlDeserializer),
        )
    }

    /// Create a client with a custom executor and deserializer (useful for testing).
    pub fn with_backend(executor: Box<dyn Executor>, deserializer: Box<dyn Deserializer>) -> Self {
        Self {
            executor,
            deserializer,
            commands: CommandBuilder::default(),
        }
    }

    /// Use a different appcmd executable.
    #[must_use]
    pub fn with_appcmd(mut self, appcmd: impl Into<String>) -> Self {
        self.commands = CommandBuilder::new(appcmd);
        self
    }

    /// The command builder in use.
    pub fn commands(&self) -> &CommandBuilder {
        &self.commands
    }

    /// The listing deserializer in use.
    pub fn deserializer(&self) -> &dyn Deserializer {
        self.deserializer.as_ref()
    }

    /// Run one command line and return its output.
    pub fn run(&self, command_line: &str) -> Result<String> {
        log::debug!("Running: {command_line}");
        let output = self.executor.execute(command_line)?;
        log::trace!("Output: {}", output.trim_end());
        Ok(output)
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// List every resource of one type.
    pub fn list(&self, resource_type: ResourceType) -> Result<Vec<Descriptor>> {
        inventory::list(self, resource_type)
    }

    /// Find a resource by its key attribute.
    pub fn find(
        &self,
        resource_type: ResourceType,
        key: &str,
        desired: &str,
    ) -> Result<Option<Descriptor>> {
        inventory::find(self, resource_type, key, desired)
    }

    /// Find a resource, treating a failed query as "not found".
    pub fn find_lenient(
        &self,
        resource_type: ResourceType,
        key: &str,
        desired: &str,
    ) -> Option<Descriptor> {
        inventory::find_lenient(self, resource_type, key, desired)
    }

    /// Find an application by path within a site.
    pub fn find_app(&self, site: &str, path: &str) -> Result<Option<Descriptor>> {
        inventory::find_app(self, site, path)
    }

    // =========================================================================
    // Convergence
    // =========================================================================

    /// Ensure the application pool exists.
    pub fn ensure_pool(&self, config: &DesiredConfig) -> Result<Applied> {
        converge::ensure_pool(self, config)
    }

    /// Ensure the site exists, binding the certificate when it is created.
    pub fn ensure_site(&self, config: &DesiredConfig) -> Result<Applied> {
        converge::ensure_site(self, config)
    }

    /// Ensure the application exists.
    pub fn ensure_application(&self, config: &DesiredConfig) -> Result<Applied> {
        converge::ensure_application(self, config)
    }

    /// Re-point an existing application's virtual directory.
    pub fn update_virtual_directory(
        &self,
        app: Descriptor,
        config: &DesiredConfig,
    ) -> Result<Applied> {
        converge::update_virtual_directory(self, app, config)
    }

    /// Run pool, site and application convergence in order.
    pub fn reconcile(
        &self,
        config: &DesiredConfig,
        observer: &dyn StepObserver,
    ) -> Result<Report> {
        Reconciler::new(self).with_observer(observer).run(config)
    }
}
