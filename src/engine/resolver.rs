//! Dependency Resolver
//!
//! Derives status partitions over the action set and decides which pending
//! actions are runnable.
//!
//! A pending action P is blocked by an incomplete action I (I is not P) when
//! - a pattern in `P.after` matches `I.name`, or
//! - a pattern in `I.before` matches `P.name`.
//!
//! Partitions are returned as indices into the set, in declaration order.

use std::fmt;

use crate::action::{Action, StatusCode};
use crate::context::Context;

/// Why one action blocks another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRule {
    /// The blocked action declared `after: <pattern>`
    After(String),
    /// The blocking action declared `before: <pattern>`
    Before(String),
}

/// An incomplete action standing in the way of a pending one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blocker {
    pub name: String,
    pub status: StatusCode,
    pub rule: BlockRule,
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            BlockRule::After(pattern) => {
                write!(f, "{} ({}, after '{}')", self.name, self.status, pattern)
            }
            BlockRule::Before(pattern) => write!(
                f,
                "{} ({}, declares before '{}')",
                self.name, self.status, pattern
            ),
        }
    }
}

/// Counts of each partition, for progress reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub incomplete: usize,
    pub runnable: usize,
}

impl Progress {
    /// Share of completed actions; 100 for an empty set.
    pub fn percent_complete(&self) -> usize {
        if self.total == 0 {
            return 100;
        }
        self.completed * 100 / self.total
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}% complete ({} running, {} runnable, {} pending, {} completed, {} incomplete)",
            self.percent_complete(),
            plural(self.running, "action"),
            plural(self.runnable, "action"),
            plural(self.pending, "action"),
            plural(self.completed, "action"),
            plural(self.incomplete, "action"),
        )
    }
}

/// The actions of one invocation.
#[derive(Debug, Default)]
pub struct ActionSet {
    actions: Vec<Action>,
}

impl ActionSet {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Action> {
        self.actions.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Action> {
        self.actions.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    /// Finds an action by its full name.
    pub fn find(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|action| action.name() == name)
    }

    fn with_status(&self, context: &Context, code: StatusCode) -> Vec<usize> {
        self.actions
            .iter()
            .enumerate()
            .filter(|(_, action)| action.status(context) == code)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn pending(&self, context: &Context) -> Vec<usize> {
        self.with_status(context, StatusCode::Pending)
    }

    pub fn running(&self, context: &Context) -> Vec<usize> {
        self.with_status(context, StatusCode::Running)
    }

    pub fn completed(&self, context: &Context) -> Vec<usize> {
        self.with_status(context, StatusCode::Complete)
    }

    pub fn failed(&self, context: &Context) -> Vec<usize> {
        self.with_status(context, StatusCode::Failed)
    }

    /// Everything not completed: pending, running and failed.
    pub fn incomplete(&self, context: &Context) -> Vec<usize> {
        self.actions
            .iter()
            .enumerate()
            .filter(|(_, action)| action.status(context) != StatusCode::Complete)
            .map(|(index, _)| index)
            .collect()
    }

    /// Incomplete actions blocking the action at `index`.
    pub fn blockers(&self, index: usize, context: &Context) -> Vec<Blocker> {
        let Some(candidate) = self.actions.get(index) else {
            return Vec::new();
        };

        let mut blockers = Vec::new();
        for other_index in self.incomplete(context) {
            if other_index == index {
                continue;
            }
            let other = &self.actions[other_index];

            let after = candidate
                .after()
                .iter()
                .find(|pattern| pattern.matches(other.name()))
                .map(|pattern| BlockRule::After(pattern.to_string()));
            let before = || {
                other
                    .before()
                    .iter()
                    .find(|pattern| pattern.matches(candidate.name()))
                    .map(|pattern| BlockRule::Before(pattern.to_string()))
            };

            if let Some(rule) = after.or_else(before) {
                blockers.push(Blocker {
                    name: other.name().to_string(),
                    status: other.status(context),
                    rule,
                });
            }
        }
        blockers
    }

    fn is_blocked(&self, index: usize, incomplete: &[usize]) -> bool {
        let candidate = &self.actions[index];

        incomplete
            .iter()
            .filter(|&&other_index| other_index != index)
            .map(|&other_index| &self.actions[other_index])
            .any(|other| {
                candidate
                    .after()
                    .iter()
                    .any(|pattern| pattern.matches(other.name()))
                    || other
                        .before()
                        .iter()
                        .any(|pattern| pattern.matches(candidate.name()))
            })
    }

    /// Pending actions with no incomplete blocker.
    pub fn runnable(&self, context: &Context) -> Vec<usize> {
        let incomplete = self.incomplete(context);
        self.pending(context)
            .into_iter()
            .filter(|&index| !self.is_blocked(index, &incomplete))
            .collect()
    }

    /// Partition counts.
    pub fn progress(&self, context: &Context) -> Progress {
        Progress {
            total: self.actions.len(),
            pending: self.pending(context).len(),
            running: self.running(context).len(),
            completed: self.completed(context).len(),
            failed: self.failed(context).len(),
            incomplete: self.incomplete(context).len(),
            runnable: self.runnable(context).len(),
        }
    }

    /// Explains why the pending actions can never run.
    ///
    /// Lists each pending action with the incomplete actions blocking it,
    /// and any of its `after` patterns that match no declared action.
    pub fn deadlock_report(&self, context: &Context) -> String {
        let pending = self.pending(context);
        let mut lines = vec![format!(
            "Deadlock: {} can never become runnable",
            plural(pending.len(), "pending action")
        )];

        for index in pending {
            let action = &self.actions[index];
            let blockers = self.blockers(index, context);

            if blockers.is_empty() {
                lines.push(format!("  {} has no blockers", action.name()));
            }
            for blocker in blockers {
                lines.push(format!("  {} waits on {}", action.name(), blocker));
            }

            for pattern in action.after() {
                if !self.actions.iter().any(|other| pattern.matches(other.name())) {
                    lines.push(format!(
                        "  {}: pattern '{}' matches no declared action (never declared)",
                        action.name(),
                        pattern
                    ));
                }
            }
        }

        lines.join("\n")
    }
}
