//! Operator-facing output.
//!
//! Everything here formats text for stderr: the welcome banner, the
//! configuration dump shown before a build, the dry-run plan and the run
//! summary. Diagnostics meant for debugging go through `log` instead.

use crate::pipeline::{PipelineRun, RunSummary};
use camino::Utf8Path;
use std::fmt::Display;
use std::io::Write;

/// Write `message` and a newline to `stderr`.
///
/// Output is best effort: a failed write is ignored.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Welcome banner printed before anything else.
#[must_use]
pub fn banner() -> String {
    let title = format!("stagehand {}", env!("CARGO_PKG_VERSION"));
    let rule = "=".repeat(title.len());
    format!("{rule}\n{title}\n{rule}")
}

/// Format the resolved configuration for review before a build.
///
/// # Example
///
/// ```no_run
/// use camino::Utf8Path;
/// use stagehand::environment::Environment;
/// use stagehand::output::config_dump;
/// use stagehand::pipeline::{PipelineRun, WorkDirs};
///
/// let env = Environment::read(Utf8Path::new("/work/demo"))?;
/// let run = PipelineRun::new(env, WorkDirs::under(Utf8Path::new("/work")));
/// assert!(config_dump(&run).contains("Application:"));
/// # Ok::<(), stagehand::error::EnvironmentError>(())
/// ```
#[must_use]
pub fn config_dump(run: &PipelineRun) -> String {
    let mut lines = vec![
        format!("Application: {}", run.metadata.app_name),
        format!("Current version: {}", run.manifest.version()),
        format!("Repository: {}", run.repository),
    ];
    if run.source_root != run.repository {
        lines.push(format!("Source directory: {}", run.source_root));
    }

    lines.push(String::new());
    push_list(
        &mut lines,
        "Ignore rules",
        run.matcher.rules().iter().map(ToString::to_string),
    );
    push_list(&mut lines, "Minify targets", run.minify_targets.iter().cloned());
    push_list(
        &mut lines,
        "Platforms",
        run.platforms.iter().map(ToString::to_string),
    );
    lines.push(format!(
        "Archive output: {}",
        if run.archive_output { "yes" } else { "no" }
    ));

    lines.join("\n")
}

fn push_list(lines: &mut Vec<String>, heading: &str, items: impl Iterator<Item = String>) {
    let items: Vec<String> = items.collect();
    if items.is_empty() {
        lines.push(format!("{heading}: (none)"));
        return;
    }
    lines.push(format!("{heading}:"));
    lines.extend(items.into_iter().map(|item| format!("  - {item}")));
}

/// Plan shown by `--dry-run`.
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// The resolved run.
    pub run: &'a PipelineRun,
    /// Worker threads used for packaging.
    pub workers: usize,
}

impl DryRunInfo<'_> {
    /// Format the plan for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let run = self.run;
        let dirs = &run.dirs;
        let next = run
            .manifest
            .version()
            .parse::<crate::manifest::Version>()
            .and_then(crate::manifest::Version::bumped)
            .map_or_else(|e| format!("unavailable ({e})"), |v| v.to_string());

        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            config_dump(run),
            String::new(),
            format!("Staging directory: {}", dirs.staging),
            format!("Releases directory: {}", dirs.releases),
            format!("Dependency cache: {}", describe_cache(&dirs.cache)),
            format!("Next version: {next}"),
            format!("Parallel packaging jobs: {}", self.workers),
            String::new(),
            "Artifacts:".to_owned(),
        ];
        for platform in &run.platforms {
            let request = run.package_request(*platform);
            let output = request.output_dir();
            if run.archive_output && platform.is_archived() {
                lines.push(format!("  - {platform}: {output}.zip"));
            } else {
                lines.push(format!("  - {platform}: {output}"));
            }
        }

        lines.join("\n")
    }
}

fn describe_cache(dir: &Utf8Path) -> String {
    if dir.is_dir() {
        format!("{dir} (present)")
    } else {
        format!("{dir} (empty, will be populated)")
    }
}

/// Format the summary printed after a successful run.
#[must_use]
pub fn summary_text(summary: &RunSummary) -> String {
    let staged = &summary.staging;
    let mut lines = vec![
        format!(
            "Staged {} file(s), excluded {} entr{}",
            staged.files_copied,
            staged.entries_excluded,
            if staged.entries_excluded == 1 { "y" } else { "ies" }
        ),
        format!(
            "Minified {} file(s), {} unsupported",
            summary.minify.minified.len(),
            summary.minify.unsupported.len()
        ),
        format!(
            "Dependency cache: {}",
            match (summary.cache_restored, summary.cache_saved) {
                (true, _) => "restored",
                (false, true) => "created",
                (false, false) => "not used",
            }
        ),
        format!(
            "Version: {} -> {}",
            summary.previous_version, summary.version
        ),
        String::new(),
        "Artifacts:".to_owned(),
    ];

    for artifact in &summary.artifacts {
        match &artifact.archive {
            Some(archive) => lines.push(format!(
                "  - {}: {} (sha256 {})",
                artifact.platform, archive.path, archive.sha256
            )),
            None => lines.push(format!(
                "  - {}: {}",
                artifact.platform, artifact.output_dir
            )),
        }
    }

    lines.join("\n")
}
