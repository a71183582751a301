use anyhow::Result;

use crate::Context;
use crate::cli::TargetsArgs;
use crate::config::{self, TargetFile};
use crate::ui;

pub fn run(ctx: &Context, args: TargetsArgs) -> Result<()> {
    let path = config::target_file_path(args.file)?;

    let Some(file) = TargetFile::load_optional(&path)? else {
        ui::info(&format!("No target file at {}", path.display()));
        ui::dim("apply uses command-line flags when there is no target file");
        return Ok(());
    };

    ui::header("Targets");
    if !ctx.quiet {
        ui::kv("file", &path.display().to_string());
    }

    if file.targets.is_empty() {
        ui::info("The target file defines no targets.");
        return Ok(());
    }

    for (name, spec) in file.resolve(&[])? {
        ui::section(&name);
        match spec.to_config() {
            Ok(config) => {
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
            Err(e) => ui::error(&format!("{e:#}")),
        }
    }

    Ok(())
}
