//! The context snapshot builder.
//!
//! Pulls each enabled scope from the store, serializes the result, and
//! drops whole sections in a fixed order until it fits the byte budget.
//! The contract describes what was available before truncation, so the
//! model can tell "you have no notes" apart from "notes were cut".

use chrono::{DateTime, Utc};
use gymcoach_config::{ContextConfig, ScopeLimits};
use gymcoach_core::fitness::{
    ExerciseHistoryEntry, SessionSummary, UserNote, UserSettings, WorkoutSpace, WorkoutTemplate,
};
use gymcoach_core::{FitnessStore, Scope, ScopeSet};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::fingerprint::{Fingerprint, canonical_json, fingerprint};

/// Per-scope row caps applied by [`SnapshotRequest::normalized`].
const MAX_ROWS_PER_SCOPE: usize = 50;
const MAX_MEMORY_CHARS: usize = 2_000;

/// What to put in one turn's snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotRequest {
    pub scopes: ScopeSet,
    pub limits: ScopeLimits,
    /// Caller-maintained summary of earlier conversations.
    pub memory_summary: Option<String>,
    /// Free JSON describing where the user opened the coach from.
    pub launch_context: Option<Value>,
    /// Space the user has selected; falls back to the store's active space.
    pub active_gym_id: Option<String>,
    pub max_bytes: usize,
}

impl SnapshotRequest {
    pub fn from_config(config: &ContextConfig) -> Self {
        Self {
            scopes: config.scopes.clone(),
            limits: config.limits.clone(),
            memory_summary: None,
            launch_context: None,
            active_gym_id: None,
            max_bytes: config.max_bytes,
        }
    }

    /// Clamp limits, drop blank optional inputs, and bound the memory text.
    pub fn normalized(mut self) -> Self {
        let clamp = |n: usize| n.clamp(1, MAX_ROWS_PER_SCOPE);
        self.limits.sessions = clamp(self.limits.sessions);
        self.limits.templates = clamp(self.limits.templates);
        self.limits.exercise_history = clamp(self.limits.exercise_history);
        self.limits.notes = clamp(self.limits.notes);

        self.memory_summary = self
            .memory_summary
            .map(|m| m.trim().chars().take(MAX_MEMORY_CHARS).collect::<String>())
            .filter(|m| !m.is_empty());
        self.launch_context = self.launch_context.filter(|v| !v.is_null());
        self.active_gym_id = self
            .active_gym_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        self
    }
}

/// Everything the model is shown about the user. Absent sections are
/// either disabled or were truncated away.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<SessionSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates: Option<Vec<WorkoutTemplate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_history: Option<Vec<ExerciseHistoryEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spaces: Option<Vec<WorkoutSpace>>,
    /// Equipment names in the active space.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<UserNote>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<UserSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_gym_id: Option<String>,
}

/// A removable snapshot section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Notes,
    Memory,
    ExerciseHistory,
    Sessions,
    Templates,
    Equipment,
    Spaces,
    Settings,
    LaunchContext,
    ActiveGymId,
}

/// Sections are dropped in this order when over budget. With all of them
/// gone the snapshot is `{}`, so any budget of two bytes or more is met.
pub const TRUNCATION_ORDER: [Section; 10] = [
    Section::Notes,
    Section::Memory,
    Section::ExerciseHistory,
    Section::Sessions,
    Section::Templates,
    Section::Equipment,
    Section::Spaces,
    Section::Settings,
    Section::LaunchContext,
    Section::ActiveGymId,
];

impl ContextSnapshot {
    /// Remove a section; returns whether it was present.
    fn remove(&mut self, section: Section) -> bool {
        match section {
            Section::Notes => self.notes.take().is_some(),
            Section::Memory => self.memory.take().is_some(),
            Section::ExerciseHistory => self.exercise_history.take().is_some(),
            Section::Sessions => self.sessions.take().is_some(),
            Section::Templates => self.templates.take().is_some(),
            Section::Equipment => self.equipment.take().is_some(),
            Section::Spaces => self.spaces.take().is_some(),
            Section::Settings => self.settings.take().is_some(),
            Section::LaunchContext => self.launch_context.take().is_some(),
            Section::ActiveGymId => self.active_gym_id.take().is_some(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Canonical JSON, the exact form sent to the model.
    pub fn canonical(&self) -> String {
        canonical_json(&self.to_value())
    }

    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(&self.to_value())
    }

    /// Exercise ids from recent history, most recent first.
    pub fn recent_exercise_ids(&self) -> Vec<i64> {
        self.exercise_history
            .iter()
            .flatten()
            .map(|h| h.exercise_id)
            .collect()
    }

    /// Short description of the active space, for prompts.
    pub fn gym_summary(&self) -> Option<String> {
        let id = self.active_gym_id.as_deref()?;
        let name = self
            .spaces
            .iter()
            .flatten()
            .find(|s| s.id == id)
            .map_or(id, |s| s.name.as_str());
        match &self.equipment {
            Some(items) if !items.is_empty() => Some(format!("{name} ({})", items.join(", "))),
            _ => Some(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    /// Canonical size after truncation.
    pub bytes: usize,
    pub truncated: bool,
    /// Removed sections, in removal order.
    pub omitted: Vec<Section>,
    pub build_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractFlags {
    pub has_memory: bool,
    pub has_launch_context: bool,
    pub has_active_gym: bool,
    pub truncated: bool,
}

/// Compact description of the shared context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextContract {
    /// Row counts before truncation, one entry per enabled scope.
    pub counts: BTreeMap<Scope, usize>,
    pub flags: ContractFlags,
    pub bytes: usize,
    pub built_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltContext {
    pub snapshot: ContextSnapshot,
    pub meta: SnapshotMeta,
    pub contract: ContextContract,
}

/// Builds snapshots from a store.
pub struct SnapshotBuilder {
    store: Arc<dyn FitnessStore>,
}

impl SnapshotBuilder {
    pub fn new(store: Arc<dyn FitnessStore>) -> Self {
        Self { store }
    }

    /// Never fails: a scope whose query errors is logged and left empty.
    pub async fn build(&self, request: SnapshotRequest) -> BuiltContext {
        let started = Instant::now();
        let request = request.normalized();
        let scopes = &request.scopes;
        let mut snapshot = ContextSnapshot {
            memory: request.memory_summary.clone(),
            launch_context: request.launch_context.clone(),
            ..ContextSnapshot::default()
        };

        if scopes.contains(Scope::Sessions) {
            snapshot.sessions = Some(or_empty(
                Scope::Sessions,
                self.store.recent_sessions(request.limits.sessions).await,
            ));
        }
        if scopes.contains(Scope::Templates) {
            snapshot.templates = Some(or_empty(
                Scope::Templates,
                self.store.templates(request.limits.templates).await,
            ));
        }
        if scopes.contains(Scope::ExerciseHistory) {
            snapshot.exercise_history = Some(or_empty(
                Scope::ExerciseHistory,
                self.store.exercise_history(None, request.limits.exercise_history).await,
            ));
        }
        if scopes.contains(Scope::Notes) {
            snapshot.notes = Some(or_empty(Scope::Notes, self.store.notes(request.limits.notes).await));
        }
        if scopes.contains(Scope::Settings) {
            snapshot.settings = match self.store.settings().await {
                Ok(settings) => Some(settings),
                Err(e) => {
                    warn!(scope = %Scope::Settings, error = %e, "Context query failed, treating scope as empty");
                    None
                }
            };
        }
        if scopes.contains(Scope::Spaces) {
            let spaces = or_empty(Scope::Spaces, self.store.workout_spaces().await);
            let active = request
                .active_gym_id
                .as_deref()
                .and_then(|id| spaces.iter().find(|s| s.id == id))
                .or_else(|| spaces.iter().find(|s| s.is_active))
                .map(|s| s.id.clone());
            if let Some(space_id) = &active {
                let items = or_empty(Scope::Spaces, self.store.equipment(space_id).await);
                snapshot.equipment = Some(items.into_iter().map(|item| item.name).collect());
            }
            snapshot.active_gym_id = active;
            snapshot.spaces = Some(spaces);
        }

        let contract_counts = counts(&snapshot, scopes);
        let mut flags = ContractFlags {
            has_memory: snapshot.memory.is_some(),
            has_launch_context: snapshot.launch_context.is_some(),
            has_active_gym: snapshot.active_gym_id.is_some(),
            truncated: false,
        };

        let mut bytes = snapshot.canonical().len();
        let mut omitted = Vec::new();
        for section in TRUNCATION_ORDER {
            if bytes <= request.max_bytes {
                break;
            }
            if snapshot.remove(section) {
                omitted.push(section);
                bytes = snapshot.canonical().len();
            }
        }
        let truncated = !omitted.is_empty();
        flags.truncated = truncated;
        if truncated {
            warn!(?omitted, bytes, max_bytes = request.max_bytes, "Context snapshot truncated");
        }

        let build_ms = started.elapsed().as_millis() as u64;
        debug!(bytes, build_ms, scopes = scopes.iter().count(), "Context snapshot built");

        BuiltContext {
            snapshot,
            meta: SnapshotMeta {
                bytes,
                truncated,
                omitted,
                build_ms,
            },
            contract: ContextContract {
                counts: contract_counts,
                flags,
                bytes,
                built_at: Utc::now(),
            },
        }
    }
}

fn or_empty<T>(scope: Scope, result: Result<Vec<T>, gymcoach_core::StoreError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!(scope = %scope, error = %e, "Context query failed, treating scope as empty");
        Vec::new()
    })
}

fn counts(snapshot: &ContextSnapshot, scopes: &ScopeSet) -> BTreeMap<Scope, usize> {
    scopes
        .iter()
        .map(|scope| {
            let n = match scope {
                Scope::Sessions => snapshot.sessions.as_ref().map_or(0, Vec::len),
                Scope::Templates => snapshot.templates.as_ref().map_or(0, Vec::len),
                Scope::ExerciseHistory => snapshot.exercise_history.as_ref().map_or(0, Vec::len),
                Scope::Notes => snapshot.notes.as_ref().map_or(0, Vec::len),
                Scope::Settings => usize::from(snapshot.settings.is_some()),
                Scope::Spaces => snapshot.spaces.as_ref().map_or(0, Vec::len),
            };
            (scope, n)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gymcoach_store::{FitnessData, InMemoryStore};

    fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new(Arc::new(InMemoryStore::from_data(FitnessData::demo())))
    }

    fn request(scopes: ScopeSet, max_bytes: usize) -> SnapshotRequest {
        SnapshotRequest {
            scopes,
            limits: ScopeLimits::default(),
            memory_summary: Some("Prefers short sessions.".into()),
            launch_context: None,
            active_gym_id: None,
            max_bytes,
        }
    }

    #[tokio::test]
    async fn includes_only_enabled_scopes() {
        let built = builder()
            .build(request(ScopeSet::none().with(Scope::Notes).with(Scope::Spaces), 100_000))
            .await;
        assert!(built.snapshot.notes.is_some());
        assert!(built.snapshot.sessions.is_none());
        assert_eq!(built.snapshot.active_gym_id.as_deref(), Some("home"));
        assert!(built.snapshot.equipment.as_ref().unwrap().contains(&"dumbbell".to_string()));
        assert_eq!(built.contract.counts.len(), 2);
        assert!(!built.meta.truncated);
    }

    #[tokio::test]
    async fn explicit_gym_overrides_active_space() {
        let mut req = request(ScopeSet::none().with(Scope::Spaces), 100_000);
        req.active_gym_id = Some(" club ".into());
        let built = builder().build(req).await;
        assert_eq!(built.snapshot.active_gym_id.as_deref(), Some("club"));
    }

    #[tokio::test]
    async fn truncates_in_fixed_order() {
        let builder = builder();
        let full = builder.build(request(ScopeSet::all(), 1_000_000)).await;
        let without_notes_memory = {
            let mut s = full.snapshot.clone();
            s.notes = None;
            s.memory = None;
            s.canonical().len()
        };

        let built = builder.build(request(ScopeSet::all(), without_notes_memory)).await;
        assert_eq!(built.meta.omitted, vec![Section::Notes, Section::Memory]);
        assert!(built.meta.truncated);
        assert!(built.contract.flags.truncated);
        assert!(built.meta.bytes <= without_notes_memory);
        // counts describe what was available before truncation
        assert_eq!(built.contract.counts[&Scope::Notes], full.contract.counts[&Scope::Notes]);
        assert!(built.contract.flags.has_memory);
    }

    #[tokio::test]
    async fn tiny_budget_empties_everything() {
        let req = request(ScopeSet::all(), 2);
        let max_bytes = req.max_bytes;
        let built = builder().build(req).await;
        assert!(built.meta.bytes <= max_bytes);
        assert_eq!(built.snapshot, ContextSnapshot::default());
        assert_eq!(built.meta.omitted.first(), Some(&Section::Notes));
        assert_eq!(built.meta.omitted.last(), Some(&Section::ActiveGymId));
        assert_eq!(built.contract.counts[&Scope::Notes], 1);
    }

    #[tokio::test]
    async fn small_budget_is_never_enlarged() {
        let req = request(ScopeSet::all(), 300);
        let max_bytes = req.max_bytes;
        let built = builder().build(req).await;
        assert!(built.meta.truncated);
        assert!(built.meta.bytes <= max_bytes, "{} > {max_bytes}", built.meta.bytes);
        assert_eq!(built.snapshot.canonical().len(), built.meta.bytes);
    }

    #[test]
    fn normalization_clamps_and_blanks() {
        let req = SnapshotRequest {
            scopes: ScopeSet::all(),
            limits: ScopeLimits {
                sessions: 0,
                templates: 500,
                exercise_history: 5,
                notes: 5,
            },
            memory_summary: Some("   ".into()),
            launch_context: Some(Value::Null),
            active_gym_id: Some("".into()),
            max_bytes: 10,
        }
        .normalized();
        assert_eq!(req.limits.sessions, 1);
        assert_eq!(req.limits.templates, MAX_ROWS_PER_SCOPE);
        assert_eq!(req.max_bytes, 10);
        assert!(req.memory_summary.is_none());
        assert!(req.launch_context.is_none());
        assert!(req.active_gym_id.is_none());
    }

    #[tokio::test]
    async fn fingerprint_is_stable_for_the_same_data() {
        let builder = builder();
        let a = builder.build(request(ScopeSet::all(), 100_000)).await;
        let b = builder.build(request(ScopeSet::all(), 100_000)).await;
        assert_eq!(a.snapshot.fingerprint(), b.snapshot.fingerprint());
        assert_eq!(a.snapshot.fingerprint().context_bytes, a.meta.bytes);
    }
}
