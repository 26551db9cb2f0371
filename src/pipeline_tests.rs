//! Tests for stage ordering, failure handling and the platform fan-out.

use super::*;
use crate::archive::ZipArchiver;
use crate::config::CONFIG_FILE;
use crate::dependencies::MockDependencyInstaller;
use crate::error::ToolError;
use crate::manifest::MANIFEST_FILE;
use crate::minify::{MinifyOutcome, MockMinifier};
use crate::test_utils::TempTree;
use rstest::{fixture, rstest};
use std::fs;
use std::sync::Barrier;

struct FakePackager {
    fail: Option<Platform>,
    calls: Mutex<Vec<Platform>>,
}

impl FakePackager {
    fn new(fail: Option<Platform>) -> Self {
        Self {
            fail,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<Platform> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl Packager for FakePackager {
    fn package(&self, request: &PackageRequest<'_>) -> Result<Utf8PathBuf, ToolError> {
        self.calls.lock().expect("calls lock").push(request.platform);
        if self.fail == Some(request.platform) {
            return Err(ToolError::Failed {
                program: "electron-packager".to_owned(),
                status: "exit status: 1".to_owned(),
                stderr: format!("cannot package {}", request.platform),
            });
        }
        let output = request.output_dir();
        let launch = |source| ToolError::Launch {
            program: "electron-packager".to_owned(),
            source,
        };
        fs::create_dir_all(&output).map_err(launch)?;
        fs::write(output.join("app.bin"), request.metadata.version.as_bytes()).map_err(launch)?;
        Ok(output)
    }
}

/// Holds every job until all of them have been dispatched.
struct RendezvousPackager {
    inner: FakePackager,
    barrier: Barrier,
}

impl RendezvousPackager {
    fn new(fail: Option<Platform>, jobs: usize) -> Self {
        Self {
            inner: FakePackager::new(fail),
            barrier: Barrier::new(jobs),
        }
    }
}

impl Packager for RendezvousPackager {
    fn package(&self, request: &PackageRequest<'_>) -> Result<Utf8PathBuf, ToolError> {
        self.barrier.wait();
        self.inner.package(request)
    }
}

struct Repo {
    tree: TempTree,
}

impl Repo {
    fn new(version: &str, config: &str) -> Self {
        let tree = TempTree::new();
        tree.write(
            &format!("repo/{MANIFEST_FILE}"),
            &format!(r#"{{"name":"demo","version":"{version}","main":"app.js"}}"#),
        );
        tree.write(&format!("repo/{CONFIG_FILE}"), config);
        tree.write("repo/app.js", "const answer = 42;");
        tree.write("repo/styles/main.css", "a { color: red; }");
        tree.write("repo/node_modules/left-pad/index.js", "module.exports = 1;");
        Self { tree }
    }

    fn repository(&self) -> Utf8PathBuf {
        self.tree.root.join("repo")
    }

    fn work(&self) -> Utf8PathBuf {
        self.tree.root.join("work")
    }

    fn run(&self) -> PipelineRun {
        let env = Environment::read(&self.repository()).expect("repository is valid");
        PipelineRun::new(env, WorkDirs::under(&self.work()))
    }

    fn manifest_text(&self) -> String {
        fs::read_to_string(self.repository().join(MANIFEST_FILE)).expect("read manifest")
    }
}

const LINUX_CONFIG: &str =
    r#"{"ignoreList":["node_modules/"],"minifyList":["app.js"],"platforms":["linux"]}"#;

fn minifier() -> MockMinifier {
    let mut minifier = MockMinifier::new();
    minifier
        .expect_minify()
        .returning(|_| Ok(MinifyOutcome::Minified));
    minifier
}

fn installer() -> MockDependencyInstaller {
    let mut installer = MockDependencyInstaller::new();
    installer.expect_install().returning(|staging| {
        let package = staging.join("node_modules/left-pad");
        fs::create_dir_all(&package)
            .and_then(|()| fs::write(package.join("index.js"), "installed"))
            .map_err(|source| ToolError::Launch {
                program: "npm".to_owned(),
                source,
            })
    });
    installer
}

fn execute(
    run: &mut PipelineRun,
    minifier: &MockMinifier,
    installer: &MockDependencyInstaller,
    packager: &dyn Packager,
    options: PipelineOptions,
) -> (Result<RunSummary, StageError>, String) {
    let tools = Collaborators {
        minifier,
        installer,
        packager,
        archiver: &ZipArchiver,
    };
    let mut stderr = Vec::new();
    let result = Pipeline::new(tools, options).execute(run, &mut stderr);
    (result, String::from_utf8_lossy(&stderr).into_owned())
}

#[fixture]
fn linux_repo() -> Repo {
    Repo::new("0.1.0", LINUX_CONFIG)
}

#[rstest]
fn end_to_end_single_platform(linux_repo: Repo) {
    let mut run = linux_repo.run();
    let staging = run.dirs.staging.clone();

    let mut minifier = MockMinifier::new();
    let expected = staging.join("app.js");
    minifier
        .expect_minify()
        .withf(move |path| path == expected)
        .times(1)
        .returning(|_| Ok(MinifyOutcome::Minified));

    let mut installer = MockDependencyInstaller::new();
    installer.expect_install().times(1).returning(|staging| {
        assert!(staging.join("app.js").is_file());
        assert!(
            !staging.join("node_modules/left-pad/index.js").exists(),
            "ignored dependencies are not staged"
        );
        let package = staging.join("node_modules/left-pad");
        fs::create_dir_all(&package)
            .and_then(|()| fs::write(package.join("index.js"), "installed"))
            .map_err(|source| ToolError::Launch {
                program: "npm".to_owned(),
                source,
            })
    });

    let packager = FakePackager::new(None);
    let (result, progress) = execute(
        &mut run,
        &minifier,
        &installer,
        &packager,
        PipelineOptions::default(),
    );
    let summary = result.expect("pipeline succeeds");

    assert_eq!(summary.previous_version.to_string(), "0.1.0");
    assert_eq!(summary.version.to_string(), "0.1.1");
    assert!(linux_repo.manifest_text().contains("\"version\": \"0.1.1\""));
    assert!(!staging.exists(), "staging tree is removed after commit");

    assert_eq!(packager.calls(), vec![Platform::Linux]);
    let artifact = &summary.artifacts[0];
    let archive = artifact.archive.as_ref().expect("linux output is archived");
    assert_eq!(
        archive.path,
        linux_repo.work().join("releases/demo-linux-x64.zip")
    );
    assert!(archive.path.is_file());
    assert!(!artifact.output_dir.exists());

    assert!(!summary.cache_restored);
    assert!(summary.cache_saved);
    assert!(run.dirs.cache.join("left-pad/index.js").is_file());
    assert!(progress.contains("Packaging application for linux"));
}

#[rstest]
fn manifest_is_written_with_tabs_and_sorted_keys(linux_repo: Repo) {
    let mut run = linux_repo.run();
    let (result, _) = execute(
        &mut run,
        &minifier(),
        &installer(),
        &FakePackager::new(None),
        PipelineOptions::default(),
    );
    result.expect("pipeline succeeds");

    assert_eq!(
        linux_repo.manifest_text(),
        "{\n\t\"main\": \"app.js\",\n\t\"name\": \"demo\",\n\t\"version\": \"0.1.1\"\n}\n"
    );
}

#[test]
fn invalid_version_aborts_without_touching_manifest() {
    let repo = Repo::new("1.2", LINUX_CONFIG);
    let before = repo.manifest_text();
    let mut run = repo.run();
    let packager = FakePackager::new(None);

    let (result, _) = execute(
        &mut run,
        &minifier(),
        &installer(),
        &packager,
        PipelineOptions::default(),
    );
    let err = result.expect_err("version must have three components");

    assert_eq!(err.stage, StageName::BumpVersion);
    assert!(matches!(err.cause, StageFailure::InvalidVersion { .. }));
    assert_eq!(repo.manifest_text(), before);
    assert!(packager.calls().is_empty());
    assert!(run.dirs.staging.exists(), "staging is left for inspection");
}

#[rstest]
fn platform_failure_skips_commit() {
    let repo = Repo::new(
        "0.1.0",
        r#"{"minifyList":["app.js"],"platforms":["win32","linux"]}"#,
    );
    let before = repo.manifest_text();
    let mut run = repo.run();

    let (result, progress) = execute(
        &mut run,
        &minifier(),
        &installer(),
        &FakePackager::new(Some(Platform::Win32)),
        PipelineOptions::default(),
    );
    let err = result.expect_err("win32 packaging fails");

    assert_eq!(err.stage, StageName::Package);
    let StageFailure::PlatformJobs(failures) = &err.cause else {
        panic!("expected platform job failures, got {:?}", err.cause);
    };
    assert!(failures.iter().any(|f| f.platform == Platform::Win32
        && matches!(f.cause, JobFailure::Package(_))));
    assert!(err.to_string().contains("cannot package win32"));
    assert!(progress.contains("Packaging failed for win32"));

    assert_eq!(repo.manifest_text(), before, "bumped version is not persisted");
    assert!(!run.dirs.cache.exists(), "dependency snapshot is not cached");
    assert!(run.dirs.staging.exists());
}

#[test]
fn in_flight_jobs_finish_after_a_failure() {
    let repo = Repo::new("0.1.0", r#"{"platforms":["win32","linux"]}"#);
    let before = repo.manifest_text();
    let mut run = repo.run();
    let packager = RendezvousPackager::new(Some(Platform::Win32), 2);

    let (result, progress) = execute(
        &mut run,
        &minifier(),
        &installer(),
        &packager,
        PipelineOptions::default(),
    );
    let err = result.expect_err("win32 packaging fails");

    let mut calls = packager.inner.calls();
    calls.sort();
    assert_eq!(calls, vec![Platform::Win32, Platform::Linux]);
    assert!(repo.work().join("releases/demo-linux-x64.zip").is_file());
    assert!(progress.contains("Packaged linux to"));

    let StageFailure::PlatformJobs(failures) = err.cause else {
        panic!("expected platform job failures");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].platform, Platform::Win32);
    assert!(matches!(failures[0].cause, JobFailure::Package(_)));

    assert_eq!(repo.manifest_text(), before, "commit is skipped");
    assert!(!run.dirs.cache.exists());
}

#[test]
fn work_dirs_inside_the_repository_are_not_staged() {
    let repo = Repo::new("0.1.0", LINUX_CONFIG);
    repo.tree.write("repo/releases/demo-linux-x64.zip", "previous release");
    repo.tree.write("repo/cached_node_modules/left-pad/index.js", "cached");
    let env = Environment::read(&repo.repository()).expect("repository is valid");
    let mut run = PipelineRun::new(env, WorkDirs::under(&repo.repository()));

    let mut installer = MockDependencyInstaller::new();
    installer.expect_install().times(1).returning(|staging| {
        assert!(staging.join("app.js").is_file());
        assert!(!staging.join("releases").exists());
        assert!(!staging.join("cached_node_modules").exists());
        Ok(())
    });

    let (result, _) = execute(
        &mut run,
        &minifier(),
        &installer,
        &FakePackager::new(None),
        PipelineOptions::default(),
    );
    let summary = result.expect("pipeline succeeds");

    assert!(summary.cache_restored);
    assert_eq!(summary.staging.files_copied, 4);
    assert!(repo.repository().join("releases/demo-linux-x64.zip").is_file());
}

#[test]
fn dispatch_stops_after_first_failure() {
    let repo = Repo::new("0.1.0", r#"{"platforms":["win32","linux","darwin"]}"#);
    let mut run = repo.run();
    let packager = FakePackager::new(Some(Platform::Win32));

    let (result, _) = execute(
        &mut run,
        &minifier(),
        &installer(),
        &packager,
        PipelineOptions {
            jobs: NonZeroUsize::new(1),
            quiet: true,
        },
    );
    let err = result.expect_err("win32 packaging fails");

    assert_eq!(packager.calls(), vec![Platform::Win32]);
    let StageFailure::PlatformJobs(failures) = err.cause else {
        panic!("expected platform job failures");
    };
    let skipped: Vec<Platform> = failures
        .iter()
        .filter(|f| matches!(f.cause, JobFailure::Skipped))
        .map(|f| f.platform)
        .collect();
    assert_eq!(skipped, vec![Platform::Linux, Platform::Darwin]);
}

#[test]
fn every_platform_is_packaged_in_parallel() {
    let repo = Repo::new("2.0.9", r#"{"platforms":["darwin","linux","win32"]}"#);
    let mut run = repo.run();
    let packager = FakePackager::new(None);

    let (result, _) = execute(
        &mut run,
        &minifier(),
        &installer(),
        &packager,
        PipelineOptions::default(),
    );
    let summary = result.expect("pipeline succeeds");

    let mut calls = packager.calls();
    calls.sort();
    assert_eq!(calls, Platform::ALL.to_vec());

    let platforms: Vec<Platform> = summary.artifacts.iter().map(|a| a.platform).collect();
    assert_eq!(platforms, Platform::ALL.to_vec());
    let darwin = &summary.artifacts[2];
    assert!(darwin.archive.is_none(), "macOS output is never archived");
    assert!(darwin.output_dir.join("app.bin").is_file());
    let packaged_version = fs::read_to_string(darwin.output_dir.join("app.bin")).expect("read");
    assert_eq!(packaged_version, "2.0.10", "packages carry the bumped version");
}

#[test]
fn archiving_can_be_disabled() {
    let repo = Repo::new("0.1.0", r#"{"platforms":["linux"],"archiveOutput":false}"#);
    let mut run = repo.run();

    let (result, _) = execute(
        &mut run,
        &minifier(),
        &installer(),
        &FakePackager::new(None),
        PipelineOptions::default(),
    );
    let summary = result.expect("pipeline succeeds");

    assert!(summary.artifacts[0].archive.is_none());
    assert!(summary.artifacts[0].output_dir.is_dir());
}

#[rstest]
fn minifier_failure_is_fatal(linux_repo: Repo) {
    let mut run = linux_repo.run();
    let mut minifier = MockMinifier::new();
    minifier.expect_minify().returning(|_| {
        Err(ToolError::Failed {
            program: "babel".to_owned(),
            status: "exit status: 1".to_owned(),
            stderr: "SyntaxError".to_owned(),
        })
    });
    let mut installer = MockDependencyInstaller::new();
    installer.expect_install().never();

    let (result, _) = execute(
        &mut run,
        &minifier,
        &installer,
        &FakePackager::new(None),
        PipelineOptions::default(),
    );
    let err = result.expect_err("minifier failure aborts");

    assert_eq!(err.stage, StageName::Minify);
    assert!(err.to_string().contains("SyntaxError"));
}

#[rstest]
fn unsupported_minify_targets_are_reported_and_skipped() {
    let repo = Repo::new(
        "0.1.0",
        r#"{"minifyList":["styles/"],"platforms":["linux"]}"#,
    );
    repo.tree.write("repo/styles/logo.svg", "<svg/>");
    let mut run = repo.run();
    let mut minifier = MockMinifier::new();
    minifier.expect_minify().returning(|path| {
        Ok(if path.extension() == Some("css") {
            MinifyOutcome::Minified
        } else {
            MinifyOutcome::Unsupported
        })
    });

    let (result, progress) = execute(
        &mut run,
        &minifier,
        &installer(),
        &FakePackager::new(None),
        PipelineOptions::default(),
    );
    let summary = result.expect("unsupported files are not fatal");

    assert_eq!(summary.minify.minified.len(), 1);
    assert_eq!(summary.minify.unsupported.len(), 1);
    assert!(progress.contains("logo.svg cannot be minified"));
}

#[rstest]
fn cached_dependencies_are_restored_before_install(linux_repo: Repo) {
    linux_repo
        .tree
        .write("work/cached_node_modules/cached-dep/index.js", "cached");
    let mut run = linux_repo.run();

    let mut installer = MockDependencyInstaller::new();
    installer.expect_install().times(1).returning(|staging| {
        assert!(staging.join("node_modules/cached-dep/index.js").is_file());
        Ok(())
    });

    let (result, _) = execute(
        &mut run,
        &minifier(),
        &installer,
        &FakePackager::new(None),
        PipelineOptions::default(),
    );
    let summary = result.expect("pipeline succeeds");

    assert!(summary.cache_restored);
    assert!(!summary.cache_saved, "an existing cache is not replaced");
}

#[rstest]
fn installer_failure_is_fatal(linux_repo: Repo) {
    let mut run = linux_repo.run();
    let mut installer = MockDependencyInstaller::new();
    installer.expect_install().returning(|_| {
        Err(ToolError::Failed {
            program: "npm".to_owned(),
            status: "exit status: 1".to_owned(),
            stderr: "ERR! 404".to_owned(),
        })
    });
    let packager = FakePackager::new(None);

    let (result, _) = execute(
        &mut run,
        &minifier(),
        &installer,
        &packager,
        PipelineOptions::default(),
    );

    assert_eq!(
        result.expect_err("install fails").stage,
        StageName::InstallDependencies
    );
    assert!(packager.calls().is_empty());
    assert_eq!(run.manifest.version(), "0.1.0");
}

#[rstest]
fn quiet_suppresses_progress(linux_repo: Repo) {
    let mut run = linux_repo.run();
    let (result, progress) = execute(
        &mut run,
        &minifier(),
        &installer(),
        &FakePackager::new(None),
        PipelineOptions {
            jobs: None,
            quiet: true,
        },
    );
    result.expect("pipeline succeeds");
    assert!(progress.is_empty());
}

#[rstest]
#[case::default(None, 3, 3)]
#[case::bounded(NonZeroUsize::new(2), 3, 2)]
#[case::more_jobs_than_platforms(NonZeroUsize::new(8), 1, 1)]
fn worker_count(
    #[case] jobs: Option<NonZeroUsize>,
    #[case] platforms: usize,
    #[case] expected: usize,
) {
    let options = PipelineOptions { jobs, quiet: false };
    assert_eq!(options.workers_for(platforms), expected);
}

#[rstest]
fn run_carries_artifact_metadata(linux_repo: Repo) {
    linux_repo.tree.write(
        &format!("repo/{CONFIG_FILE}"),
        r#"{"platforms":["linux"],"versionString":{"CompanyName":"Acme"}}"#,
    );
    let run = linux_repo.run();

    assert_eq!(run.metadata.app_name, "demo");
    assert_eq!(run.metadata.copyright, "Acme");
    assert_eq!(run.metadata.icon_dir, linux_repo.repository().join("icons"));
    assert_eq!(
        run.package_request(Platform::Linux).output_dir(),
        linux_repo.work().join("releases/demo-linux-x64")
    );
}
