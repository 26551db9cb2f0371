//! Completion tracking for per-platform packaging jobs.

use crate::error::PlatformJobError;
use crate::platform::Platform;
use std::collections::BTreeMap;

/// State of one platform's packaging job.
#[derive(Debug, Default)]
pub struct PlatformJob {
    done: bool,
    error: Option<PlatformJobError>,
}

impl PlatformJob {
    /// Returns true once the job has finished, successfully or not.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The recorded failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&PlatformJobError> {
        self.error.as_ref()
    }
}

/// Maps each platform to the completion state of its job.
#[derive(Debug, Default)]
pub struct PlatformJobTracker {
    jobs: BTreeMap<Platform, PlatformJob>,
}

impl PlatformJobTracker {
    /// Track a pending job for every platform in `platforms`.
    #[must_use]
    pub fn new(platforms: &[Platform]) -> Self {
        let jobs = platforms
            .iter()
            .map(|&platform| (platform, PlatformJob::default()))
            .collect();
        Self { jobs }
    }

    /// Mark `platform` done, recording `error` when the job failed.
    ///
    /// Returns `false` without changing anything when the platform is not
    /// tracked or has already been marked done; a finished job is never
    /// reset.
    pub fn mark_done(&mut self, platform: Platform, error: Option<PlatformJobError>) -> bool {
        match self.jobs.get_mut(&platform) {
            Some(job) if !job.done => {
                job.done = true;
                job.error = error;
                true
            }
            _ => false,
        }
    }

    /// Returns true when every tracked job is done, regardless of outcome.
    ///
    /// # Examples
    ///
    /// ```
    /// use stagehand::platform::Platform;
    /// use stagehand::tracker::PlatformJobTracker;
    ///
    /// let mut tracker = PlatformJobTracker::new(&[Platform::Win32, Platform::Linux]);
    /// assert!(!tracker.all_done());
    /// tracker.mark_done(Platform::Win32, None);
    /// assert!(!tracker.all_done());
    /// tracker.mark_done(Platform::Linux, None);
    /// assert!(tracker.all_done());
    /// ```
    #[must_use]
    pub fn all_done(&self) -> bool {
        self.jobs.values().all(PlatformJob::is_done)
    }

    /// Returns true when every job is done and none recorded an error.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.all_done() && self.jobs.values().all(|job| job.error.is_none())
    }

    /// Platforms whose jobs have not finished.
    pub fn pending(&self) -> impl Iterator<Item = Platform> + '_ {
        self.jobs
            .iter()
            .filter(|(_, job)| !job.done)
            .map(|(&platform, _)| platform)
    }

    /// Jobs that finished with an error.
    pub fn failures(&self) -> impl Iterator<Item = &PlatformJobError> {
        self.jobs.values().filter_map(PlatformJob::error)
    }

    /// Look up the job for `platform`.
    #[must_use]
    pub fn job(&self, platform: Platform) -> Option<&PlatformJob> {
        self.jobs.get(&platform)
    }

    /// Consume the tracker and return every recorded failure.
    #[must_use]
    pub fn into_failures(self) -> Vec<PlatformJobError> {
        self.jobs.into_values().filter_map(|job| job.error).collect()
    }
}
