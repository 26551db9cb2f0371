//! Shared fixtures for the integration suites.
//!
//! Provides a throwaway repository on disk and recording implementations of
//! the pipeline's collaborator traits, so scenarios can drive the public API
//! end to end without launching real tools.

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use stagehand::error::ToolError;
use stagehand::executor::{CommandExecutor, CommandSpec};
use stagehand::minify::{Minifier, MinifyOutcome};
use stagehand::dependencies::DependencyInstaller;
use stagehand::packager::{PackageRequest, Packager};
use stagehand::pipeline::WorkDirs;
use stagehand::platform::Platform;
use std::fs;
use std::process::{ExitStatus, Output};
use std::sync::Mutex;
use tempfile::TempDir;

/// A repository and working area in a temporary directory.
pub struct TempRepo {
    _temp: TempDir,
    /// Root of the temporary directory.
    pub root: Utf8PathBuf,
}

impl TempRepo {
    /// Create a repository under `<root>/repo` with the given manifest and
    /// configuration.
    pub fn new(manifest: &str, config: &str) -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("temp dir is not UTF-8");
        let repo = Self { _temp: temp, root };
        repo.write("package.json", manifest);
        repo.write("stagehand.json", config);
        repo
    }

    /// Write `contents` to `relative` inside the repository.
    pub fn write(&self, relative: &str, contents: &str) -> Utf8PathBuf {
        let path = self.repository().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent");
        }
        fs::write(&path, contents).expect("failed to write file");
        path
    }

    /// Read `relative` inside the repository.
    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.repository().join(relative)).expect("failed to read file")
    }

    /// The repository root.
    pub fn repository(&self) -> Utf8PathBuf {
        self.root.join("repo")
    }

    /// Working directories beside the repository.
    pub fn work_dirs(&self) -> WorkDirs {
        WorkDirs::under(&self.root.join("work"))
    }
}

/// Minifier that rewrites `.js` files and records every call.
#[derive(Default)]
pub struct RecordingMinifier {
    calls: Mutex<Vec<Utf8PathBuf>>,
}

impl RecordingMinifier {
    /// Paths passed to the minifier, in call order.
    pub fn calls(&self) -> Vec<Utf8PathBuf> {
        self.calls.lock().expect("lock").clone()
    }
}

impl Minifier for RecordingMinifier {
    fn minify(&self, path: &Utf8Path) -> Result<MinifyOutcome, ToolError> {
        self.calls.lock().expect("lock").push(path.to_owned());
        if path.extension() != Some("js") {
            return Ok(MinifyOutcome::Unsupported);
        }
        fs::write(path, "/*min*/").map_err(|source| ToolError::Launch {
            program: "babel".to_owned(),
            source,
        })?;
        Ok(MinifyOutcome::Minified)
    }
}

/// Installer that drops a single package into `node_modules`.
#[derive(Default)]
pub struct RecordingInstaller {
    calls: Mutex<Vec<Utf8PathBuf>>,
}

impl RecordingInstaller {
    /// Staging roots passed to the installer.
    pub fn calls(&self) -> Vec<Utf8PathBuf> {
        self.calls.lock().expect("lock").clone()
    }
}

impl DependencyInstaller for RecordingInstaller {
    fn install(&self, staging_root: &Utf8Path) -> Result<(), ToolError> {
        self.calls.lock().expect("lock").push(staging_root.to_owned());
        let package = staging_root.join("node_modules/left-pad");
        fs::create_dir_all(&package)
            .and_then(|()| fs::write(package.join("index.js"), "module.exports = 0;"))
            .map_err(|source| ToolError::Launch {
                program: "npm".to_owned(),
                source,
            })
    }
}

/// Packager that copies nothing but creates the expected output directory.
pub struct FakePackager {
    fail: Option<Platform>,
    calls: Mutex<Vec<Platform>>,
}

impl FakePackager {
    /// A packager that succeeds for every platform except `fail`.
    pub fn failing_on(fail: Option<Platform>) -> Self {
        Self {
            fail,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Platforms packaged, in call order.
    pub fn calls(&self) -> Vec<Platform> {
        self.calls.lock().expect("lock").clone()
    }
}

impl Packager for FakePackager {
    fn package(&self, request: &PackageRequest<'_>) -> Result<Utf8PathBuf, ToolError> {
        self.calls.lock().expect("lock").push(request.platform);
        if self.fail == Some(request.platform) {
            return Err(ToolError::Failed {
                program: "electron-packager".to_owned(),
                status: "exit status: 1".to_owned(),
                stderr: "packaging exploded".to_owned(),
            });
        }
        let output = request.output_dir();
        fs::create_dir_all(&output)
            .and_then(|()| fs::write(output.join("version"), &request.metadata.version))
            .map_err(|source| ToolError::Launch {
                program: "electron-packager".to_owned(),
                source,
            })?;
        Ok(output)
    }
}

/// Executor that records invocations and emulates the packager's output.
#[derive(Default)]
pub struct ScriptedExecutor {
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedExecutor {
    /// Invocations, in call order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().expect("lock").clone()
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn run(&self, spec: &CommandSpec) -> std::io::Result<Output> {
        self.calls.lock().expect("lock").push(spec.clone());
        if spec.program == "electron-packager" {
            let out = spec
                .args
                .iter()
                .find_map(|arg| arg.strip_prefix("--out="))
                .expect("packager is given --out");
            let platform = spec
                .args
                .iter()
                .find_map(|arg| arg.strip_prefix("--platform="))
                .expect("packager is given --platform");
            let name = &spec.args[1];
            let dir = Utf8Path::new(out).join(format!("{name}-{platform}-x64"));
            fs::create_dir_all(&dir)?;
            fs::write(dir.join(name), "binary")?;
        }
        Ok(Output {
            status: success_status(),
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }
}

#[cfg(unix)]
fn success_status() -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(0)
}

#[cfg(windows)]
fn success_status() -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(0)
}
