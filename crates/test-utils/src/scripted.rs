//! Shell-script stand-ins for built programs and the toolchain.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use devloop::errors::{DevloopError, Result};
use devloop::runner::{BuildFuture, BuildStep};

/// Program body that runs until interrupted, then exits cleanly.
pub const SERVE_FOREVER: &str = "trap 'exit 0' INT TERM\nwhile :; do sleep 0.05; done\n";

/// Program body that ignores interrupts and only dies to a kill.
pub const IGNORE_INTERRUPT: &str = "trap '' INT\nwhile :; do sleep 0.05; done\n";

/// Write an executable `#!/bin/sh` script.
pub fn write_script(path: &Path, body: &str) -> PathBuf {
    let _ = fs::remove_file(path);
    fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_path_buf()
}

/// Shared switches for a [`ScriptedBuild`] that tests keep after handing
/// the build to a runner.
#[derive(Debug, Clone, Default)]
pub struct BuildControls {
    fail: Arc<AtomicBool>,
    builds: Arc<AtomicUsize>,
}

impl BuildControls {
    /// Make every following build fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Number of builds attempted so far.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

/// A [`BuildStep`] that "builds" a pre-written script.
///
/// The script is written once at construction so no file is open for
/// writing while processes are being started.
#[derive(Debug)]
pub struct ScriptedBuild {
    exe: PathBuf,
    controls: BuildControls,
}

impl ScriptedBuild {
    pub fn new(dir: &Path, body: &str) -> Self {
        let exe = write_script(&dir.join("app"), body);
        Self {
            exe,
            controls: BuildControls::default(),
        }
    }

    pub fn controls(&self) -> BuildControls {
        self.controls.clone()
    }
}

impl BuildStep for ScriptedBuild {
    fn generate_and_build(&mut self) -> BuildFuture<'_> {
        Box::pin(async move {
            self.controls.builds.fetch_add(1, Ordering::SeqCst);
            if self.controls.fail.load(Ordering::SeqCst) {
                return Err(DevloopError::BuildFailed {
                    status: "exit status: 2".to_string(),
                    output: "scripted build failure".to_string(),
                });
            }
            Ok(self.exe.clone())
        })
    }
}

/// Write a fake `go` that handles `generate` and `build -o OUT [file]`.
///
/// `generate` appends its working directory to `dir/generate.log`. `build`
/// copies `program` (a script body) to `OUT`. Creating a file named
/// `fail-build` in `dir` makes builds fail with a compiler-like message.
pub fn write_fake_toolchain(dir: &Path, program: &str) -> PathBuf {
    let program_path = write_script(&dir.join("program.sh"), program);
    let body = format!(
        r#"case "$1" in
  generate) pwd -P >> "{dir}/generate.log"; exit 0 ;;
  build)
    if [ -f "{dir}/fail-build" ]; then echo "main.go:1: syntax error" >&2; exit 2; fi
    rm -f "$3"; cp "{program}" "$3"; chmod +x "$3"; exit 0 ;;
esac
echo "unknown command $1" >&2
exit 1
"#,
        dir = dir.display(),
        program = program_path.display(),
    );
    write_script(&dir.join("fakego"), &body)
}
