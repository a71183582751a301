use anyhow::{Context as _, Result, bail};
use indicatif::ProgressBar;
use iiskit::{DesiredConfig, Reconciler, Report, StepObserver, StepReport};
use serde::Serialize;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::config::{self, TargetSpec};
use crate::progress;
use crate::ui;

/// A resolved target ready to reconcile.
struct Target {
    name: String,
    config: DesiredConfig,
}

/// Per-target outcome for `--json`.
#[derive(Serialize)]
struct TargetReport<'a> {
    target: &'a str,
    #[serde(flatten)]
    report: &'a Report,
}

/// Prints each step while the spinner keeps running.
struct LiveSteps<'a> {
    pb: &'a ProgressBar,
    enabled: bool,
}

impl StepObserver for LiveSteps<'_> {
    fn on_step(&self, report: &StepReport) {
        log::info!("{} '{}': {:?}", report.step, report.name, report.status());
        if self.enabled {
            self.pb.suspend(|| ui::step_report(report));
        }
    }
}

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let overrides = TargetSpec::from(&args.target);
    let specs = config::resolve_targets(args.file.as_deref(), &args.targets, &overrides)?;
    let targets = build_targets(specs)?;

    if targets.is_empty() {
        ui::info("No targets to apply.");
        return Ok(());
    }

    let chatty = !ctx.quiet && !args.json;
    if chatty {
        print_plan(&targets);
    }

    if !args.yes && !confirm_proceed()? {
        ui::warn("Aborted.");
        return Ok(());
    }

    let client = ctx.client();
    let mut reports = Vec::with_capacity(targets.len());

    for (i, target) in targets.iter().enumerate() {
        let pb = progress::spinner(&format!("Reconciling {}", target.name), !chatty);
        if chatty {
            pb.suspend(|| ui::step(i + 1, targets.len(), &target.name));
        }
        let observer = LiveSteps {
            pb: &pb,
            enabled: chatty,
        };

        match Reconciler::new(&client)
            .with_observer(&observer)
            .run(&target.config)
        {
            Ok(report) => {
                if chatty {
                    progress::finish_success(&pb, &format!("{} reconciled", target.name));
                } else {
                    progress::finish_clear(&pb);
                }
                reports.push((target.name.as_str(), report));
            }
            Err(e) => {
                progress::finish_error(&pb, &format!("{} failed", target.name));
                let category = e.category();
                ui::dim(&format!("{}: {}", category.description(), category.advice()));
                if let Some(output) = e.output() {
                    for line in output.lines().filter(|l| !l.trim().is_empty()) {
                        ui::dim(line.trim());
                    }
                }
                return Err(e).with_context(|| format!("Failed to apply target '{}'", target.name));
            }
        }
    }

    if args.json {
        let out: Vec<_> = reports
            .iter()
            .map(|(target, report)| TargetReport { target, report })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if !ctx.quiet {
        print_summary(&reports);
    }
    Ok(())
}

fn build_targets(specs: Vec<(String, TargetSpec)>) -> Result<Vec<Target>> {
    specs
        .into_iter()
        .map(|(name, spec)| {
            let config = spec
                .to_config()
                .with_context(|| format!("Invalid target '{name}'"))?;
            Ok(Target { name, config })
        })
        .collect()
}

fn print_plan(targets: &[Target]) {
    ui::header("Apply");
    for target in targets {
        let config = &target.config;
        ui::section(&target.name);
        ui::kv("site", &config.site);
        if let Some(binding) = &config.binding {
            ui::kv("binding", binding);
        }
        if let Some(cert) = &config.cert {
            ui::kv("cert", cert);
        }
        ui::kv("path", &config.path);
        ui::kv("pool", &config.pool);
        ui::kv("runtime", &config.managed_runtime_version);
        ui::kv("physical path", &config.physical_path);
    }
    println!();
}

fn print_summary(reports: &[(&str, Report)]) {
    println!();
    let changes: usize = reports.iter().map(|(_, r)| r.changes()).sum();
    let label = if reports.len() == 1 { "target" } else { "targets" };
    if changes == 0 {
        ui::success(&format!(
            "Nothing to do, {} {label} already in place",
            reports.len()
        ));
    } else {
        ui::success(&format!(
            "{changes} change(s) across {} {label}",
            reports.len()
        ));
    }
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    if !console_is_interactive() {
        bail!("Refusing to apply without confirmation; pass --yes to skip the prompt");
    }

    Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()
        .context("Failed to read confirmation")
}

fn console_is_interactive() -> bool {
    use std::io::IsTerminal;
    std::io::stdin().is_terminal()
}
