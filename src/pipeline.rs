//! Build pipeline orchestration.
//!
//! [`Pipeline::execute`] runs the stages in their fixed order through
//! [`StageRunner`] and stops at the first failure. Packaging is the only
//! concurrent stage: one job per platform runs on a scoped worker thread, and
//! the calling thread records each outcome in a [`PlatformJobTracker`]. The
//! manifest is persisted only once every job has succeeded.

use crate::archive::{ArchiveOutput, Archiver};
use crate::dependencies::{DependencyCache, DependencyInstaller};
use crate::environment::Environment;
use crate::error::{JobFailure, PlatformJobError, StageError, StageFailure};
use crate::manifest::{Manifest, Version};
use crate::matcher::{PathMatcher, RuleSet};
use crate::minify::{MinifyReport, Minifier, minify_targets};
use crate::output::write_stderr_line;
use crate::packager::{ArtifactMetadata, PackageRequest, Packager};
use crate::platform::Platform;
use crate::stage::{StageName, StageRunner};
use crate::staging::{StagingReport, remove_tree, stage_source};
use crate::tracker::PlatformJobTracker;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::collections::VecDeque;
use std::io::Write;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, mpsc};
use std::thread;

/// Default staging directory name.
pub const DEFAULT_STAGING_DIR: &str = "app";
/// Default releases directory name.
pub const DEFAULT_RELEASES_DIR: &str = "releases";
/// Default dependency cache directory name.
pub const DEFAULT_CACHE_DIR: &str = "cached_node_modules";

/// Working directories written by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDirs {
    /// Staging tree, removed at the start and end of every run.
    pub staging: Utf8PathBuf,
    /// Directory receiving packaged artifacts.
    pub releases: Utf8PathBuf,
    /// Dependency cache snapshot.
    pub cache: Utf8PathBuf,
}

impl WorkDirs {
    /// The default directory layout beneath `base`.
    #[must_use]
    pub fn under(base: &Utf8Path) -> Self {
        Self {
            staging: base.join(DEFAULT_STAGING_DIR),
            releases: base.join(DEFAULT_RELEASES_DIR),
            cache: base.join(DEFAULT_CACHE_DIR),
        }
    }
}

/// State threaded through one pipeline run.
#[derive(Debug)]
pub struct PipelineRun {
    /// Repository root.
    pub repository: Utf8PathBuf,
    /// Directory staged from.
    pub source_root: Utf8PathBuf,
    /// Working directories.
    pub dirs: WorkDirs,
    /// Exclusion rules applied while staging.
    pub matcher: PathMatcher,
    /// The manifest; its version is bumped in memory before packaging.
    pub manifest: Manifest,
    /// Metadata stamped into each artifact.
    pub metadata: ArtifactMetadata,
    /// Minify targets relative to the staging root.
    pub minify_targets: Vec<String>,
    /// Platforms to package for.
    pub platforms: Vec<Platform>,
    /// Whether packaged output is archived.
    pub archive_output: bool,
}

impl PipelineRun {
    /// Assemble a run from a validated environment.
    #[must_use]
    pub fn new(env: Environment, dirs: WorkDirs) -> Self {
        let Environment {
            repository,
            source_root,
            manifest,
            config,
            app_name,
            platforms,
            warnings: _,
        } = env;

        let metadata = ArtifactMetadata {
            app_name,
            version: manifest.version().to_owned(),
            icon_dir: repository.join("icons"),
            copyright: config.version_string.company_name.clone(),
            version_strings: config.version_string,
        };

        Self {
            repository,
            source_root,
            dirs,
            matcher: PathMatcher::new(RuleSet::from_patterns(&config.ignore_list)),
            manifest,
            metadata,
            minify_targets: config.minify_list,
            platforms,
            archive_output: config.archive_output,
        }
    }

    /// Packaging request for `platform`.
    #[must_use]
    pub fn package_request(&self, platform: Platform) -> PackageRequest<'_> {
        PackageRequest {
            platform,
            source_dir: &self.dirs.staging,
            releases_dir: &self.dirs.releases,
            metadata: &self.metadata,
        }
    }
}

/// A successfully packaged platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformArtifact {
    /// Platform packaged.
    pub platform: Platform,
    /// Directory the packager wrote. Removed when the output was archived.
    pub output_dir: Utf8PathBuf,
    /// The archive, when the output was archived.
    pub archive: Option<ArchiveOutput>,
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Staging counts.
    pub staging: StagingReport,
    /// Minified and unsupported files.
    pub minify: MinifyReport,
    /// Whether a cached dependency snapshot was restored.
    pub cache_restored: bool,
    /// Whether a new dependency snapshot was saved.
    pub cache_saved: bool,
    /// Version before the bump.
    pub previous_version: Version,
    /// Version persisted to the manifest.
    pub version: Version,
    /// One entry per platform, in platform order.
    pub artifacts: Vec<PlatformArtifact>,
}

/// External tools the pipeline drives.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Minifies staged sources.
    pub minifier: &'a dyn Minifier,
    /// Installs dependencies into the staging tree.
    pub installer: &'a dyn DependencyInstaller,
    /// Packages the staging tree per platform.
    pub packager: &'a dyn Packager,
    /// Archives packaged output.
    pub archiver: &'a dyn Archiver,
}

/// Runtime options that do not come from the repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Maximum concurrent packaging jobs; one per platform when `None`.
    pub jobs: Option<NonZeroUsize>,
    /// Suppress progress output.
    pub quiet: bool,
}

impl PipelineOptions {
    /// Number of packaging workers for `platforms` jobs.
    #[must_use]
    pub fn workers_for(&self, platforms: usize) -> usize {
        self.jobs.map_or(platforms, NonZeroUsize::get).min(platforms)
    }
}

/// Runs the build stages in order.
pub struct Pipeline<'a> {
    tools: Collaborators<'a>,
    options: PipelineOptions,
}

enum JobReport {
    Started(Platform),
    Finished(Platform, Result<PlatformArtifact, JobFailure>),
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline driving `tools`.
    #[must_use]
    pub fn new(tools: Collaborators<'a>, options: PipelineOptions) -> Self {
        Self { tools, options }
    }

    /// Run every stage against `run`, writing progress to `stderr`.
    ///
    /// # Errors
    ///
    /// Returns a [`StageError`] naming the first stage that failed. Stages
    /// after it do not run; in particular the manifest is not persisted
    /// unless every platform job succeeded.
    pub fn execute(
        &self,
        run: &mut PipelineRun,
        stderr: &mut dyn Write,
    ) -> Result<RunSummary, StageError> {
        let runner = StageRunner;
        let staging = run.dirs.staging.clone();

        self.progress(stderr, format!("Cleaning {staging}..."));
        runner.run(StageName::Clean, || remove_tree(&staging))?;

        self.progress(
            stderr,
            format!("Staging {} into {staging}...", run.source_root),
        );
        let staged = runner.run(StageName::StageSource, || {
            stage_source(
                &run.source_root,
                &staging,
                &run.matcher,
                &[run.dirs.releases.as_path(), run.dirs.cache.as_path()],
            )
        })?;
        debug!("staging finished: {staged:?}");

        self.progress(
            stderr,
            format!("Minifying {} target(s)...", run.minify_targets.len()),
        );
        let minified = runner.run(StageName::Minify, || {
            minify_targets(self.tools.minifier, &staging, &run.minify_targets)
        })?;
        for path in &minified.unsupported {
            self.progress(stderr, format!("  {path} cannot be minified, skipping"));
        }

        self.progress(stderr, "Installing dependencies...");
        let cache = DependencyCache::new(run.dirs.cache.clone());
        let cache_restored = self.restore_cache(&cache, &staging, stderr);
        let snapshot_pending = !cache.exists();
        runner.run(StageName::InstallDependencies, || {
            self.tools.installer.install(&staging)
        })?;

        let (previous_version, version) =
            runner.run(StageName::BumpVersion, || run.manifest.bump_version())?;
        run.metadata.version = version.to_string();
        self.progress(stderr, format!("Bumped version {previous_version} -> {version}"));

        self.progress(
            stderr,
            format!("Packaging for {} platform(s)...", run.platforms.len()),
        );
        let artifacts = runner.run(StageName::Package, || self.package_all(run, stderr))?;

        self.progress(stderr, format!("Saving {}...", run.manifest.path()));
        let cache_saved = runner.run(StageName::Commit, || {
            run.manifest.save()?;
            let saved = snapshot_pending && self.snapshot_cache(&cache, &staging, stderr);
            remove_tree(&staging)?;
            Ok::<_, StageFailure>(saved)
        })?;

        Ok(RunSummary {
            staging: staged,
            minify: minified,
            cache_restored,
            cache_saved,
            previous_version,
            version,
            artifacts,
        })
    }

    fn progress(&self, stderr: &mut dyn Write, message: impl std::fmt::Display) {
        if !self.options.quiet {
            write_stderr_line(stderr, message);
        }
    }

    fn restore_cache(
        &self,
        cache: &DependencyCache,
        staging: &Utf8Path,
        stderr: &mut dyn Write,
    ) -> bool {
        if !cache.exists() {
            return false;
        }
        match cache.restore_into(staging) {
            Ok(copied) => {
                self.progress(
                    stderr,
                    format!("  Restored {copied} file(s) from {}", cache.dir()),
                );
                true
            }
            Err(e) => {
                warn!("failed to restore dependency cache: {e}");
                self.progress(stderr, format!("  Dependency cache not restored: {e}"));
                false
            }
        }
    }

    fn snapshot_cache(
        &self,
        cache: &DependencyCache,
        staging: &Utf8Path,
        stderr: &mut dyn Write,
    ) -> bool {
        match cache.snapshot_from(staging) {
            Ok(copied) => {
                self.progress(
                    stderr,
                    format!("Cached {copied} dependency file(s) in {}", cache.dir()),
                );
                copied > 0
            }
            Err(e) => {
                warn!("failed to snapshot dependency cache: {e}");
                self.progress(stderr, format!("Dependency cache not saved: {e}"));
                false
            }
        }
    }

    /// Package every platform, stopping dispatch after the first failure.
    fn package_all(
        &self,
        run: &PipelineRun,
        stderr: &mut dyn Write,
    ) -> Result<Vec<PlatformArtifact>, StageFailure> {
        let mut tracker = PlatformJobTracker::new(&run.platforms);
        let mut artifacts = Vec::with_capacity(run.platforms.len());
        let queue = Mutex::new(run.platforms.iter().copied().collect::<VecDeque<_>>());
        let abort = AtomicBool::new(false);
        let workers = self.options.workers_for(run.platforms.len());
        let packager = self.tools.packager;
        let archiver = self.tools.archiver;

        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel();
            for _ in 0..workers {
                let tx = tx.clone();
                let queue = &queue;
                let abort = &abort;
                scope.spawn(move || {
                    while let Some(platform) = next_job(queue, abort) {
                        if tx.send(JobReport::Started(platform)).is_err() {
                            break;
                        }
                        let outcome = package_platform(packager, archiver, run, platform);
                        if outcome.is_err() {
                            abort.store(true, Ordering::SeqCst);
                        }
                        if tx.send(JobReport::Finished(platform, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            for report in rx {
                match report {
                    JobReport::Started(platform) => {
                        let line = format!("  Packaging application for {platform}...");
                        self.progress(stderr, line);
                    }
                    JobReport::Finished(platform, Ok(artifact)) => {
                        let location = artifact
                            .archive
                            .as_ref()
                            .map_or(&artifact.output_dir, |archive| &archive.path);
                        self.progress(stderr, format!("  Packaged {platform} to {location}"));
                        tracker.mark_done(platform, None);
                        artifacts.push(artifact);
                    }
                    JobReport::Finished(platform, Err(cause)) => {
                        let line = format!("  Packaging failed for {platform}: {cause}");
                        self.progress(stderr, line);
                        tracker.mark_done(platform, Some(PlatformJobError { platform, cause }));
                    }
                }
            }
        });

        let skipped: Vec<Platform> = tracker.pending().collect();
        for platform in skipped {
            debug!("{platform} was not packaged");
            tracker.mark_done(
                platform,
                Some(PlatformJobError {
                    platform,
                    cause: JobFailure::Skipped,
                }),
            );
        }

        if tracker.succeeded() {
            artifacts.sort_by_key(|artifact| artifact.platform);
            Ok(artifacts)
        } else {
            Err(StageFailure::PlatformJobs(tracker.into_failures()))
        }
    }
}

fn next_job(queue: &Mutex<VecDeque<Platform>>, abort: &AtomicBool) -> Option<Platform> {
    if abort.load(Ordering::SeqCst) {
        return None;
    }
    queue.lock().ok()?.pop_front()
}

fn package_platform(
    packager: &dyn Packager,
    archiver: &dyn Archiver,
    run: &PipelineRun,
    platform: Platform,
) -> Result<PlatformArtifact, JobFailure> {
    let output_dir = packager
        .package(&run.package_request(platform))
        .map_err(JobFailure::Package)?;

    let archive = if run.archive_output && platform.is_archived() {
        Some(archiver.archive(&output_dir).map_err(JobFailure::Archive)?)
    } else {
        None
    };

    Ok(PlatformArtifact {
        platform,
        output_dir,
        archive,
    })
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
