// src/runner/build.rs

//! Generate + build seam.
//!
//! The runner talks to a [`BuildStep`] instead of shelling out itself, so
//! tests can swap in a scripted build. [`GoToolchain`] is the production
//! implementation.

use std::env::consts::EXE_SUFFIX;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Output;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::{DevloopError, Result};

/// Future returned by [`BuildStep::generate_and_build`].
pub type BuildFuture<'a> = Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>>;

/// Produces a fresh executable.
pub trait BuildStep: Send {
    /// Run code generation (if any) and the build; return the executable path.
    fn generate_and_build(&mut self) -> BuildFuture<'_>;
}

/// Where the build output for `target` lands: `<abs bin_dir>/<base><EXE_SUFFIX>`,
/// with a trailing `.go` dropped from the base name.
pub fn output_path(bin_dir: &Path, target: &str) -> Result<PathBuf> {
    let base = Path::new(target)
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| DevloopError::ConfigError(format!("invalid build target {target:?}")))?;
    let base = base.strip_suffix(".go").unwrap_or(base);
    if base.is_empty() {
        return Err(DevloopError::ConfigError(format!(
            "build target {target:?} has an empty base name"
        )));
    }

    let bin_dir = std::path::absolute(bin_dir)?;
    Ok(bin_dir.join(format!("{base}{EXE_SUFFIX}")))
}

/// Helper tools installed by `--install-tools`.
pub const VUGU_TOOLS: [&str; 2] = [
    "github.com/vugu/vugu/cmd/vugugen@latest",
    "github.com/vugu/vgrouter/cmd/vgrgen@latest",
];

/// `<tool> install -x <pkg>` for each of [`VUGU_TOOLS`], stopping at the
/// first failure.
pub async fn install_tools(tool: &Path, verbose: bool) -> Result<()> {
    for package in VUGU_TOOLS {
        let mut cmd = Command::new(tool);
        cmd.arg("install").arg("-x").arg(package);
        debug!(command = ?cmd.as_std(), "installing tool");

        let output = cmd.kill_on_drop(true).output().await;
        match output {
            Ok(output) if output.status.success() => {
                if verbose {
                    info!(package, "{}", combined(&output).trim_end());
                }
                info!(package, "installed");
            }
            Ok(output) => {
                return Err(DevloopError::InstallFailed {
                    package: package.to_string(),
                    status: output.status.to_string(),
                    output: combined(&output),
                });
            }
            Err(e) => {
                return Err(DevloopError::InstallFailed {
                    package: package.to_string(),
                    status: e.to_string(),
                    output: String::new(),
                });
            }
        }
    }
    Ok(())
}

/// `go generate` + `go build` for one target.
#[derive(Debug, Clone)]
pub struct GoToolchain {
    tool: PathBuf,
    target: String,
    bin_dir: PathBuf,
    generate_dir: Option<PathBuf>,
    verbose: bool,
}

impl GoToolchain {
    /// `target` is either a `.go` file or a package directory.
    pub fn new(
        tool: impl Into<PathBuf>,
        target: impl Into<String>,
        bin_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tool: tool.into(),
            target: target.into(),
            bin_dir: bin_dir.into(),
            generate_dir: None,
            verbose: false,
        }
    }

    /// Run `<tool> generate` in `dir` before every build.
    pub fn with_generate_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.generate_dir = dir;
        self
    }

    /// Echo the toolchain output of successful steps.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    async fn generate(&self, dir: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.tool);
        cmd.arg("generate").current_dir(dir);

        match self.execute(cmd, "generate").await {
            Ok(output) if output.status.success() => {
                self.echo("generate", &output);
                Ok(())
            }
            Ok(output) => Err(DevloopError::GenerateFailed {
                status: output.status.to_string(),
                output: combined(&output),
            }),
            Err(e) => Err(DevloopError::GenerateFailed {
                status: e.to_string(),
                output: String::new(),
            }),
        }
    }

    async fn build(&self) -> Result<PathBuf> {
        if self.target.is_empty() {
            return Err(DevloopError::ConfigError("no build target specified".into()));
        }

        let out = output_path(&self.bin_dir, &self.target)?;
        if let Some(parent) = out.parent() {
            ensure_dir(parent).await;
        }

        let mut cmd = Command::new(&self.tool);
        cmd.arg("build").arg("-o").arg(&out);

        let target = Path::new(&self.target);
        if self.target.ends_with(".go") {
            cmd.arg(target);
        } else {
            cmd.current_dir(target);
        }

        match self.execute(cmd, "build").await {
            Ok(output) if output.status.success() => {
                self.echo("build", &output);
                Ok(out)
            }
            Ok(output) => Err(DevloopError::BuildFailed {
                status: output.status.to_string(),
                output: combined(&output),
            }),
            Err(e) => Err(DevloopError::BuildFailed {
                status: e.to_string(),
                output: String::new(),
            }),
        }
    }

    async fn execute(&self, mut cmd: Command, step: &str) -> std::io::Result<Output> {
        if self.verbose {
            info!(step, command = ?cmd.as_std(), "running toolchain");
        } else {
            debug!(step, command = ?cmd.as_std(), "running toolchain");
        }
        cmd.kill_on_drop(true).output().await
    }

    fn echo(&self, step: &str, output: &Output) {
        if !self.verbose {
            return;
        }
        let text = combined(output);
        if !text.trim().is_empty() {
            info!(step, "{}", text.trim_end());
        }
    }
}

impl BuildStep for GoToolchain {
    fn generate_and_build(&mut self) -> BuildFuture<'_> {
        Box::pin(async move {
            if let Some(dir) = &self.generate_dir {
                self.generate(dir).await?;
            }
            self.build().await
        })
    }
}

/// Create the output directory (one level only); an existing one is fine.
async fn ensure_dir(dir: &Path) {
    match tokio::fs::create_dir(dir).await {
        Ok(()) => debug!(dir = %dir.display(), "created output directory"),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
        // The build itself will report the real problem.
        Err(e) => warn!(dir = %dir.display(), error = %e, "could not create output directory"),
    }
}

fn combined(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}
