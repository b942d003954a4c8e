//! Job registry: the handler registration table and the parser that turns
//! configured job entries into ordered job descriptors.
//!
//! Entry format: `impl_ref|frequency[|HH:MM]`. Whitespace-only entries and
//! entries starting with `#` are ignored. Input order is preserved and
//! determines execution order in the orchestrator; that ordering is a
//! load-bearing invariant, not cosmetic.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SchedulerError};
use crate::jobs::Job;
use crate::schedule::{validate_schedule, AnchorTime, Frequency};

/// Explicit registration table mapping an implementation reference to a
/// job body, built by the hosting application at process start.
///
/// Lookup failures surface at registry-build time so that every
/// misconfiguration is discoverable with a single dry run instead of
/// failing mid-execution.
#[derive(Default)]
pub struct JobHandlers {
    handlers: BTreeMap<&'static str, Arc<dyn Job>>,
}

impl JobHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job body under its own name.
    pub fn register<J: Job + 'static>(&mut self, job: J) -> &mut Self {
        self.handlers.insert(job.name(), Arc::new(job));
        self
    }

    /// Resolve an implementation reference into a job body.
    pub fn resolve(&self, reference: &str) -> Result<Arc<dyn Job>> {
        self.handlers
            .get(reference)
            .cloned()
            .ok_or_else(|| SchedulerError::JobNotFound(reference.to_string()))
    }
}

/// Immutable descriptor for one configured job.
#[derive(Clone)]
pub struct JobSpec {
    /// Unique identifier; state-store key.
    pub name: String,
    /// The resolved job body.
    pub handler: Arc<dyn Job>,
    /// How often the job runs.
    pub frequency: Frequency,
    /// Optional wall-clock alignment; only valid for whole-day frequencies.
    pub anchor_time: Option<AnchorTime>,
    /// Names of jobs this one is gated on, in declaration order.
    pub depends_on: Vec<String>,
}

impl JobSpec {
    /// Human-readable schedule, e.g. `"7d"` or `"1d @ 03:00"`.
    pub fn schedule_display(&self) -> String {
        match &self.anchor_time {
            Some(anchor) => format!("{} @ {}", self.frequency, anchor),
            None => self.frequency.to_string(),
        }
    }
}

impl fmt::Debug for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSpec")
            .field("name", &self.name)
            .field("schedule", &self.schedule_display())
            .field("depends_on", &self.depends_on)
            .finish()
    }
}

/// The ordered list of configured jobs.
#[derive(Debug)]
pub struct JobRegistry {
    jobs: Vec<JobSpec>,
}

impl JobRegistry {
    /// Parse configured entries into job descriptors, preserving order.
    ///
    /// Fails on the first malformed entry with an error naming it; no job
    /// from a malformed entry is registered.
    pub fn build<I, S>(entries: I, handlers: &JobHandlers) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut jobs = Vec::new();
        for entry in entries {
            if let Some(spec) = parse_entry(entry.as_ref(), handlers)? {
                jobs.push(spec);
            }
        }
        Ok(Self { jobs })
    }

    /// All jobs, in registration (= execution) order.
    pub fn jobs(&self) -> &[JobSpec] {
        &self.jobs
    }

    /// Look up a job by name.
    pub fn get(&self, name: &str) -> Option<&JobSpec> {
        self.jobs.iter().find(|spec| spec.name == name)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Parse one entry; `Ok(None)` for blank/comment entries.
fn parse_entry(entry: &str, handlers: &JobHandlers) -> Result<Option<JobSpec>> {
    let trimmed = entry.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut fields = trimmed.split('|');
    let reference = fields.next().unwrap_or_default().trim();

    let Some(frequency_field) = fields.next() else {
        return Err(SchedulerError::JobDescription {
            entry: trimmed.to_string(),
            reason: "no frequency given".to_string(),
        });
    };
    let anchor_field = fields.next();
    if fields.next().is_some() {
        return Err(SchedulerError::JobDescription {
            entry: trimmed.to_string(),
            reason: "too many fields (expected impl_ref|frequency[|HH:MM])".to_string(),
        });
    }

    let handler = handlers.resolve(reference)?;
    let frequency = Frequency::parse(frequency_field)?;
    let anchor_time = anchor_field.map(AnchorTime::parse).transpose()?;
    validate_schedule(&frequency, anchor_time.as_ref())?;

    let depends_on = handler
        .depends_on()
        .into_iter()
        .map(str::to_string)
        .collect();

    Ok(Some(JobSpec {
        name: handler.name().to_string(),
        handler,
        frequency,
        anchor_time,
        depends_on,
    }))
}
