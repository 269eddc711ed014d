//! Output planning: map every group to a target path and a write policy.
//!
//! ## Layout
//!
//! ```text
//! <run_root>/<document stem>/CoA_<n>.pdf          overwrite
//! <keyed_root>/QB-<identifier>/PilotReport_V<version>.pdf   skip-if-exists
//! ```
//!
//! Run outputs are scoped to their source document, so two scans never
//! fight over `CoA_1.pdf`. Each document gets a directory name of its own:
//! when two inputs share a stem (`scan.pdf` and `scan.PDF`, or `a:b.pdf` and
//! `a_b.pdf` after sanitising), the later one in path order gets a numeric
//! suffix (`scan_2`). Names are compared ignoring case. Keyed outputs live in a namespace shared by all
//! documents and all runs; the skip-if-exists policy keeps them idempotent.
//!
//! The existence check made here is advisory. The processor persists
//! skip-if-exists outputs with a no-clobber rename, so a target that
//! appears between planning and writing is still not overwritten.

use crate::config::SplitterConfig;
use crate::error::GroupError;
use crate::grouping::{Group, GroupAssignment, RunGroup};
use crate::fields::GroupKey;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// What to do when the target file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Replace the existing file.
    Overwrite,
    /// Leave the existing file alone and report the group as skipped.
    SkipIfExists,
}

impl fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WritePolicy::Overwrite => "overwrite",
            WritePolicy::SkipIfExists => "skip-if-exists",
        })
    }
}

impl FromStr for WritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "overwrite" => Ok(WritePolicy::Overwrite),
            "skip-if-exists" | "skip" => Ok(WritePolicy::SkipIfExists),
            other => Err(format!(
                "unknown write policy '{other}' (expected overwrite or skip-if-exists)"
            )),
        }
    }
}

/// Where outputs go and how they are named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLayout {
    /// Root for run outputs. Each source document gets a subdirectory.
    pub run_root: PathBuf,
    /// Root for keyed outputs, shared by every document.
    pub keyed_root: PathBuf,
    /// File name prefix for run outputs, followed by the run number.
    pub run_file_prefix: String,
    /// Directory name prefix for keyed outputs, followed by the identifier.
    pub keyed_dir_prefix: String,
    /// File name prefix for keyed outputs, followed by the version.
    pub keyed_file_prefix: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            run_root: PathBuf::from("splits"),
            keyed_root: PathBuf::from("pilots"),
            run_file_prefix: "CoA_".into(),
            keyed_dir_prefix: "QB-".into(),
            keyed_file_prefix: "PilotReport_V".into(),
        }
    }
}

impl OutputLayout {
    /// `<run_root>/<document_dir>/<prefix><n>.pdf`
    pub fn run_path(&self, document_dir: &str, run: &RunGroup) -> PathBuf {
        self.run_root
            .join(document_dir)
            .join(format!("{}{}.pdf", self.run_file_prefix, run.sequence))
    }

    /// `<keyed_root>/<dir prefix><identifier>/<file prefix><version>.pdf`
    pub fn keyed_path(&self, key: &GroupKey) -> PathBuf {
        self.keyed_root
            .join(format!(
                "{}{}",
                self.keyed_dir_prefix,
                sanitize_component(&key.identifier)
            ))
            .join(format!(
                "{}{}.pdf",
                self.keyed_file_prefix,
                sanitize_component(&key.version)
            ))
    }
}

/// A destination path plus the policy to apply when writing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTarget {
    pub path: PathBuf,
    pub policy: WritePolicy,
}

impl OutputTarget {
    /// Directory the target lives in.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Why a group was dropped from the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The target exists and the policy forbids replacing it.
    TargetExists,
    /// An earlier group of the same plan already claimed the target.
    DuplicateTarget { claimed_by: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TargetExists => f.write_str("already exists"),
            SkipReason::DuplicateTarget { claimed_by } => {
                write!(f, "is already planned for {claimed_by}")
            }
        }
    }
}

/// Whether a planned group goes ahead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Skip(SkipReason),
}

/// One group, its target, and the decision for it.
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub group: Group,
    pub target: OutputTarget,
    pub decision: Decision,
}

impl PlanEntry {
    pub fn proceeds(&self) -> bool {
        self.decision == Decision::Proceed
    }
}

/// The execution plan for one document: one entry per group, runs first,
/// then keyed groups. Outputs are written in this order.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub entries: Vec<PlanEntry>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries that will be materialised.
    pub fn proceeding(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.proceeds())
    }

    /// Entries dropped from execution.
    pub fn skipped(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| !e.proceeds())
    }
}

/// Run directory names handed out so far, shared by every clone of a
/// planner.
#[derive(Debug, Default)]
struct RunDirs {
    by_source: HashMap<PathBuf, String>,
    taken: HashSet<String>,
}

impl RunDirs {
    fn assign(&mut self, source: &Path) -> String {
        if let Some(name) = self.by_source.get(source) {
            return name.clone();
        }
        let stem = document_stem(source);
        let mut name = stem.clone();
        let mut n = 1;
        while self.taken.contains(&name.to_lowercase()) {
            n += 1;
            name = format!("{stem}_{n}");
        }
        if n > 1 {
            debug!(
                "Run outputs of '{}' go to '{}' (stem '{}' already used)",
                source.display(),
                name,
                stem
            );
        }
        self.taken.insert(name.to_lowercase());
        self.by_source.insert(source.to_path_buf(), name.clone());
        name
    }
}

/// Turns a document's groups into an execution plan.
#[derive(Debug, Clone)]
pub struct OutputPlanner {
    layout: OutputLayout,
    run_policy: WritePolicy,
    keyed_policy: WritePolicy,
    run_dirs: Arc<Mutex<RunDirs>>,
}

impl OutputPlanner {
    pub fn new(layout: OutputLayout, run_policy: WritePolicy, keyed_policy: WritePolicy) -> Self {
        Self {
            layout,
            run_policy,
            keyed_policy,
            run_dirs: Arc::default(),
        }
    }

    pub fn from_config(config: &SplitterConfig) -> Self {
        Self::new(
            config.layout.clone(),
            config.run_policy,
            config.keyed_policy,
        )
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Hand out run directory names for a whole batch up front.
    ///
    /// Names go out in path order, so the same set of inputs always maps to
    /// the same directories no matter which document finishes first.
    /// Sources already known keep their name.
    pub fn reserve_run_dirs(&self, sources: &[PathBuf]) {
        let mut sorted: Vec<&PathBuf> = sources.iter().collect();
        sorted.sort();
        let mut dirs = self.run_dirs.lock().unwrap_or_else(PoisonError::into_inner);
        for source in sorted {
            dirs.assign(source);
        }
    }

    /// Directory name (under the run root) for the run outputs of `source`.
    ///
    /// A source not seen before is given the next free name.
    pub fn run_dir(&self, source: &Path) -> String {
        self.run_dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .assign(source)
    }

    /// Target for one group of the document at `source`.
    pub fn target_for(&self, source: &Path, group: &Group) -> OutputTarget {
        match group {
            Group::Run(run) => OutputTarget {
                path: self.layout.run_path(&self.run_dir(source), run),
                policy: self.run_policy,
            },
            Group::Keyed(keyed) => OutputTarget {
                path: self.layout.keyed_path(&keyed.key),
                policy: self.keyed_policy,
            },
        }
    }

    /// Build the plan for one document.
    ///
    /// A group is skipped when its skip-if-exists target is already on
    /// disk, or when an earlier group of this plan claimed the same target.
    /// Nothing is created on disk.
    pub async fn plan(&self, source: &Path, assignment: &GroupAssignment) -> Plan {
        let mut plan = Plan::default();
        let mut claimed: HashMap<PathBuf, String> = HashMap::new();

        for group in assignment.groups() {
            let target = self.target_for(source, &group);

            let decision = if let Some(owner) = claimed.get(&target.path) {
                Decision::Skip(SkipReason::DuplicateTarget {
                    claimed_by: owner.clone(),
                })
            } else if target.policy == WritePolicy::SkipIfExists
                && target_exists(&target.path).await
            {
                Decision::Skip(SkipReason::TargetExists)
            } else {
                Decision::Proceed
            };

            match decision {
                Decision::Proceed => {
                    debug!(
                        "Planned {} of '{}' -> '{}' ({})",
                        group.label(),
                        source.display(),
                        target.path.display(),
                        target.policy
                    );
                    claimed.insert(target.path.clone(), group.label());
                }
                Decision::Skip(ref reason) => {
                    info!(
                        "Skipping {} of '{}': '{}' {}",
                        group.label(),
                        source.display(),
                        target.path.display(),
                        reason
                    );
                }
            }

            plan.entries.push(PlanEntry {
                group,
                target,
                decision,
            });
        }

        plan
    }

    /// Create the target's directory (and any missing parents).
    pub async fn prepare(&self, target: &OutputTarget) -> Result<(), GroupError> {
        let dir = target.dir();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| GroupError::CreateDirFailed {
                path: dir.to_path_buf(),
                detail: e.to_string(),
            })
    }
}

async fn target_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Make an OCR token safe to use as one path component.
///
/// Path separators, characters reserved on Windows, and control characters
/// become `_`. A token made only of dots becomes `_` as well.
pub fn sanitize_component(token: &str) -> String {
    let cleaned: String = token
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}

fn document_stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| sanitize_component(&s.to_string_lossy()))
        .unwrap_or_else(|| "document".to_string())
}
