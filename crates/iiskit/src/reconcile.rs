//! Reconciliation driver: pool, then site, then applications.

use crate::Client;
use crate::converge;
use crate::error::Result;
use crate::types::{Applied, DesiredConfig};
use serde::Serialize;
use std::fmt;

/// Which step of a run produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Application pool
    Pool,
    /// Site (and its certificate binding)
    Site,
    /// Root application added alongside a new site
    RootApp,
    /// Requested application
    App,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Pool => "apppool",
            Step::Site => "site",
            Step::RootApp => "root app",
            Step::App => "app",
        };
        write!(f, "{name}")
    }
}

/// What a step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Resource was created
    Created,
    /// Existing resource was changed
    Updated,
    /// Resource already existed and was left alone
    AlreadyExists,
}

/// Outcome of one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// The step
    pub step: Step,
    /// Name or path the step worked on
    pub name: String,
    /// The convergence result
    pub applied: Applied,
}

impl StepReport {
    /// What the step did.
    pub fn status(&self) -> Status {
        if self.applied.created {
            Status::Created
        } else if self.applied.vdir_updated {
            Status::Updated
        } else {
            Status::AlreadyExists
        }
    }

    /// User-facing status line.
    pub fn message(&self) -> String {
        let output = self.applied.output.trim_end();
        match (self.step, self.status()) {
            (Step::Pool, Status::AlreadyExists) => "Apppool already exists.".to_string(),
            (Step::Site, Status::AlreadyExists) => "Site already exists.".to_string(),
            (Step::App | Step::RootApp, Status::AlreadyExists) => {
                "App already exists.".to_string()
            }
            (Step::App, Status::Created) => format!("App created. {output}"),
            (Step::App | Step::RootApp, Status::Updated) => {
                format!("App already exists. {output}")
            }
            _ => output.to_string(),
        }
    }
}

/// Receives each step's report as soon as it completes.
pub trait StepObserver {
    /// Called after a step finished successfully.
    fn on_step(&self, report: &StepReport);
}

/// Observer that ignores every step.
pub struct NoObserver;

impl StepObserver for NoObserver {
    fn on_step(&self, _report: &StepReport) {}
}

/// Reports from one reconciliation run, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    /// Completed steps
    pub steps: Vec<StepReport>,
}

impl Report {
    /// The report for a step, if it ran.
    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().find(|r| r.step == step)
    }

    /// Number of steps that created or updated something.
    pub fn changes(&self) -> usize {
        self.steps.iter().filter(|r| r.applied.changed()).count()
    }

    /// Whether the run changed nothing.
    pub fn is_unchanged(&self) -> bool {
        self.changes() == 0
    }
}

/// Runs reconciliations against one client.
pub struct Reconciler<'a> {
    client: &'a Client,
    observer: &'a dyn StepObserver,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler that reports nothing while running.
    pub fn new(client: &'a Client) -> Self {
        Self {
            client,
            observer: &NoObserver,
        }
    }

    /// Report each step to `observer` as it completes.
    pub fn with_observer(mut self, observer: &'a dyn StepObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Bring the host in line with `config`.
    pub fn run(&self, config: &DesiredConfig) -> Result<Report> {
        reconcile(self.client, config, self.observer)
    }
}

/// Bring the host in line with `config`.
///
/// Steps run strictly in order; each starts only after the previous one
/// returned. The first error aborts the run, leaving earlier steps applied.
pub fn reconcile(
    client: &Client,
    config: &DesiredConfig,
    observer: &dyn StepObserver,
) -> Result<Report> {
    let mut report = Report::default();
    let mut record = |step: Step, name: &str, applied: Applied| {
        let step_report = StepReport {
            step,
            name: name.to_string(),
            applied,
        };
        observer.on_step(&step_report);
        report.steps.push(step_report);
    };

    let pool = converge::ensure_pool(client, config)?;
    record(Step::Pool, &config.pool, pool);

    let site = converge::ensure_site(client, config)?;
    let site_created = site.created;
    record(Step::Site, &config.site, site);

    // A new site has no root application of its own
    if site_created && !config.is_root() {
        let root = config.for_root_app();
        let app = converge::ensure_application(client, &root)?;
        record(Step::RootApp, &root.path, app);
    }

    if !config.path.is_empty() {
        let app = converge::ensure_application(client, config)?;
        record(Step::App, &config.path, app);
    }

    Ok(report)
}
