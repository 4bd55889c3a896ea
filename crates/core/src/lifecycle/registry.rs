use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::domain::status::{EntityKind, Status};
use crate::errors::DomainError;
use crate::lifecycle::tables;
use crate::lifecycle::validator::{DecisionReason, TransitionDecision};

/// Legal transitions for a single entity kind.
///
/// A status whose allowed-set is empty is terminal. Terminal statuses may only be
/// left through an edge listed in `reactivations`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionTable {
    kind: EntityKind,
    initial: Status,
    allowed: BTreeMap<Status, BTreeSet<Status>>,
    reactivations: BTreeMap<Status, BTreeSet<Status>>,
}

impl TransitionTable {
    pub fn new(
        kind: EntityKind,
        initial: Status,
        allowed: BTreeMap<Status, BTreeSet<Status>>,
        reactivations: BTreeMap<Status, BTreeSet<Status>>,
    ) -> Result<Self, DomainError> {
        let table = Self { kind, initial, allowed, reactivations };
        table.validate()?;
        Ok(table)
    }

    /// Builds a table from typed rows without validating it.
    pub(crate) fn assemble<S>(
        kind: EntityKind,
        initial: S,
        rows: &[(S, &[S])],
        reactivations: &[(S, S)],
    ) -> Self
    where
        S: Copy + Into<Status>,
    {
        let allowed = rows
            .iter()
            .map(|(from, targets)| {
                ((*from).into(), targets.iter().map(|to| (*to).into()).collect::<BTreeSet<_>>())
            })
            .collect();

        let mut reactivation_map: BTreeMap<Status, BTreeSet<Status>> = BTreeMap::new();
        for (from, to) in reactivations {
            reactivation_map.entry((*from).into()).or_default().insert((*to).into());
        }

        Self { kind, initial: initial.into(), allowed, reactivations: reactivation_map }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn initial_status(&self) -> Status {
        self.initial
    }

    pub fn statuses(&self) -> impl Iterator<Item = Status> + '_ {
        self.allowed.keys().copied()
    }

    pub fn is_terminal(&self, status: Status) -> Result<bool, DomainError> {
        Ok(self.row(status)?.is_empty())
    }

    /// Every destination reachable from `from` in one step, reactivations included.
    pub fn allowed_transitions(&self, from: Status) -> Result<Vec<Status>, DomainError> {
        let mut targets: BTreeSet<Status> = self.row(from)?.clone();
        if let Some(reactivations) = self.reactivations.get(&from) {
            targets.extend(reactivations.iter().copied());
        }
        Ok(targets.into_iter().collect())
    }

    pub fn decide(&self, from: Status, to: Status) -> Result<TransitionDecision, DomainError> {
        let row = self.row(from)?;
        self.row(to)?;

        let reactivation =
            self.reactivations.get(&from).is_some_and(|targets| targets.contains(&to));

        let (allowed, reason) = if row.contains(&to) {
            (true, DecisionReason::Allowed)
        } else if row.is_empty() && reactivation {
            (true, DecisionReason::Reactivation)
        } else if from == to {
            (false, DecisionReason::SelfTransition)
        } else if row.is_empty() {
            (false, DecisionReason::TerminalState)
        } else {
            (false, DecisionReason::NotInTable)
        };

        Ok(TransitionDecision { kind: self.kind, from, to, allowed, reason })
    }

    pub fn export(&self) -> TableExport {
        let render = |map: &BTreeMap<Status, BTreeSet<Status>>| -> BTreeMap<String, Vec<String>> {
            map.iter()
                .map(|(from, targets)| {
                    (
                        from.as_str().to_owned(),
                        targets.iter().map(|to| to.as_str().to_owned()).collect::<Vec<_>>(),
                    )
                })
                .collect()
        };

        TableExport {
            kind: self.kind,
            initial: self.initial.as_str().to_owned(),
            transitions: render(&self.allowed),
            reactivations: render(&self.reactivations),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let expected: BTreeSet<Status> = Status::all(self.kind).into_iter().collect();

        let mentioned = std::iter::once(&self.initial)
            .chain(self.allowed.keys())
            .chain(self.allowed.values().flatten())
            .chain(self.reactivations.keys())
            .chain(self.reactivations.values().flatten());
        for status in mentioned {
            if status.kind() != self.kind {
                return Err(DomainError::InvariantViolation(format!(
                    "{} table references {} status `{status}`",
                    self.kind,
                    status.kind()
                )));
            }
        }

        let missing: Vec<&str> = expected
            .iter()
            .filter(|status| !self.allowed.contains_key(*status))
            .map(Status::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::InvariantViolation(format!(
                "{} table has no row for: {}",
                self.kind,
                missing.join(", ")
            )));
        }

        for from in self.reactivations.keys() {
            if self.allowed.get(from).is_some_and(|row| !row.is_empty()) {
                return Err(DomainError::InvariantViolation(format!(
                    "{} reactivation edges may only leave terminal statuses, `{from}` is not terminal",
                    self.kind
                )));
            }
        }

        let reachable = self.reachable_from_initial();
        let unreachable: Vec<&str> = expected
            .iter()
            .filter(|status| !reachable.contains(*status))
            .map(Status::as_str)
            .collect();
        if !unreachable.is_empty() {
            return Err(DomainError::InvariantViolation(format!(
                "{} statuses unreachable from `{}`: {}",
                self.kind,
                self.initial,
                unreachable.join(", ")
            )));
        }

        Ok(())
    }

    fn reachable_from_initial(&self) -> BTreeSet<Status> {
        let mut seen = BTreeSet::from([self.initial]);
        let mut queue = VecDeque::from([self.initial]);

        while let Some(current) = queue.pop_front() {
            let next = self
                .allowed
                .get(&current)
                .into_iter()
                .chain(self.reactivations.get(&current))
                .flatten();
            for status in next {
                if seen.insert(*status) {
                    queue.push_back(*status);
                }
            }
        }

        seen
    }

    fn row(&self, status: Status) -> Result<&BTreeSet<Status>, DomainError> {
        if status.kind() != self.kind {
            return Err(DomainError::InvalidState {
                subject: format!("{} status", self.kind),
                value: format!("{}:{}", status.kind(), status),
            });
        }

        self.allowed.get(&status).ok_or_else(|| DomainError::InvalidState {
            subject: format!("{} status", self.kind),
            value: status.as_str().to_owned(),
        })
    }
}

/// Read-only, string-keyed view of a table for UI-side checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableExport {
    pub kind: EntityKind,
    pub initial: String,
    pub transitions: BTreeMap<String, Vec<String>>,
    pub reactivations: BTreeMap<String, Vec<String>>,
}

/// Process-wide lifecycle configuration: one transition table per entity kind.
///
/// Built once at startup and shared behind an `Arc`; never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusRegistry {
    tables: BTreeMap<EntityKind, TransitionTable>,
}

impl StatusRegistry {
    pub fn standard() -> Self {
        let tables = [
            tables::booking(),
            tables::appointment(),
            tables::expert_call(),
            tables::payment(),
            tables::prescription(),
        ]
        .into_iter()
        .map(|table| (table.kind(), table))
        .collect();

        Self { tables }
    }

    /// Replaces the table for `table.kind()`, validating it first.
    pub fn with_table(mut self, table: TransitionTable) -> Result<Self, DomainError> {
        table.validate()?;
        self.tables.insert(table.kind(), table);
        Ok(self)
    }

    /// Applies a TOML override document on top of the standard tables.
    ///
    /// ```toml
    /// [booking]
    /// initial = "pending"
    ///
    /// [booking.transitions]
    /// pending = ["confirmed", "cancelled"]
    /// confirmed = ["completed", "cancelled"]
    /// completed = []
    /// cancelled = []
    ///
    /// [booking.reactivations]
    /// cancelled = ["pending"]
    /// ```
    pub fn with_overrides_toml(self, document: &str) -> Result<Self, DomainError> {
        let overrides: BTreeMap<String, TableOverride> =
            toml::from_str(document).map_err(|error| {
                DomainError::InvariantViolation(format!(
                    "transition override is not valid TOML: {error}"
                ))
            })?;

        overrides.into_iter().try_fold(self, |registry, (kind, table_override)| {
            let kind = EntityKind::parse(&kind)?;
            let table = table_override.into_table(kind, registry.table(kind)?.initial_status())?;
            registry.with_table(table)
        })
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        for kind in EntityKind::ALL {
            self.table(kind)?.validate()?;
        }
        Ok(())
    }

    pub fn table(&self, kind: EntityKind) -> Result<&TransitionTable, DomainError> {
        self.tables.get(&kind).ok_or_else(|| DomainError::InvalidState {
            subject: "entity kind".to_owned(),
            value: kind.as_str().to_owned(),
        })
    }

    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.tables.keys().copied()
    }

    pub fn initial_status(&self, kind: EntityKind) -> Result<Status, DomainError> {
        Ok(self.table(kind)?.initial_status())
    }

    pub fn is_terminal(&self, kind: EntityKind, status: Status) -> Result<bool, DomainError> {
        self.table(kind)?.is_terminal(status)
    }

    pub fn allowed_transitions(
        &self,
        kind: EntityKind,
        from: Status,
    ) -> Result<Vec<Status>, DomainError> {
        self.table(kind)?.allowed_transitions(from)
    }

    pub fn decide(
        &self,
        kind: EntityKind,
        from: Status,
        to: Status,
    ) -> Result<TransitionDecision, DomainError> {
        self.table(kind)?.decide(from, to)
    }

    pub fn export(&self) -> Vec<TableExport> {
        self.tables.values().map(TransitionTable::export).collect()
    }
}

impl Default for StatusRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableOverride {
    initial: Option<String>,
    transitions: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    reactivations: BTreeMap<String, Vec<String>>,
}

impl TableOverride {
    fn into_table(
        self,
        kind: EntityKind,
        default_initial: Status,
    ) -> Result<TransitionTable, DomainError> {
        let initial = match self.initial {
            Some(initial) => Status::parse(kind, &initial)?,
            None => default_initial,
        };

        let parse_rows = |rows: BTreeMap<String, Vec<String>>| {
            rows.into_iter()
                .map(|(from, targets)| {
                    let from = Status::parse(kind, &from)?;
                    let targets = targets
                        .iter()
                        .map(|to| Status::parse(kind, to))
                        .collect::<Result<BTreeSet<_>, _>>()?;
                    Ok((from, targets))
                })
                .collect::<Result<BTreeMap<_, _>, DomainError>>()
        };

        TransitionTable::new(
            kind,
            initial,
            parse_rows(self.transitions)?,
            parse_rows(self.reactivations)?,
        )
    }
}
