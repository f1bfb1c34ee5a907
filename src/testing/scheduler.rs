//! Cron schedule records kept by the simulation harness.
//!
//! The harness never evaluates cron expressions. A schedule is a stored
//! intent: the workflow to run, the expression it was registered under,
//! and the start options captured at registration time. Tests fire
//! schedules explicitly through the orchestrator.

use std::collections::HashMap;

use crate::options::StartOptions;

/// A registered cron schedule, keyed by its workflow id.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub workflow_name: String,
    pub cron_expression: String,
    pub input: String,
    /// Start options captured when the schedule was registered; replayed
    /// verbatim on every trigger.
    pub options: StartOptions,
}

#[derive(Debug, Default)]
pub(crate) struct CronSchedules {
    entries: HashMap<String, ScheduleEntry>,
}

impl CronSchedules {
    pub(crate) fn insert(&mut self, workflow_id: String, entry: ScheduleEntry) {
        self.entries.insert(workflow_id, entry);
    }

    pub(crate) fn get(&self, workflow_id: &str) -> Option<ScheduleEntry> {
        self.entries.get(workflow_id).cloned()
    }

    /// Every schedule, ordered by workflow id so triggering is
    /// deterministic.
    pub(crate) fn all(&self) -> Vec<(String, ScheduleEntry)> {
        let mut entries: Vec<(String, ScheduleEntry)> =
            self.entries.iter().map(|(id, entry)| (id.clone(), entry.clone())).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Workflow id to cron expression, for assertions on what is
    /// registered.
    pub(crate) fn cron_view(&self) -> HashMap<String, String> {
        self.entries
            .iter()
            .map(|(id, entry)| (id.clone(), entry.cron_expression.clone()))
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
