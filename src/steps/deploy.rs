// src/steps/deploy.rs

use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::info;

use crate::config::model::DeploySection;
use crate::steps::copy::copy_tree;

/// Publish the current output directory.
///
/// With `[deploy].cmd` set, the command runs via the platform shell from the
/// project root and its exit status decides success. Otherwise the output
/// tree is copied recursively into `[deploy].dir`. Deploy never rebuilds; it
/// fails if there is no output directory to publish.
pub async fn publish(deploy: &DeploySection, project_root: &Path, out_dir: &Path) -> Result<()> {
    if !out_dir.is_dir() {
        bail!(
            "output directory {:?} does not exist; run `sitepipe build` first",
            out_dir
        );
    }

    if let Some(cmd) = &deploy.cmd {
        info!(cmd = %cmd, "running deploy command");

        let mut command = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(cmd);
            c
        };

        let status = command
            .current_dir(project_root)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .context("spawning deploy command")?;

        if !status.success() {
            bail!("deploy command exited with {:?}", status.code());
        }
        return Ok(());
    }

    if let Some(dir) = &deploy.dir {
        let target = project_root.join(dir);
        let count = copy_tree(out_dir, &target)
            .with_context(|| format!("publishing {out_dir:?} to {target:?}"))?;
        info!(files = count, target = ?target, "published output directory");
        return Ok(());
    }

    bail!("no [deploy] target configured; set `dir` or `cmd` in the manifest");
}
