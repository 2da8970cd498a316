//! Entity reconciliation: desired state + persisted state → create/update/delete plan.
//!
//! Numbering follows insertion order into the desired map:
//!
//! 1. explicit entities, in declaration order (or existing rows, in stored
//!    order, when the source document is invalid)
//! 2. implicit entities for undeclared known names, sorted by name
//! 3. the synthesized `Default` entity, if the collection has one (without
//!    a default factory, a referenced `Default` is implicit like any other name)
//! 4. extra entities whose names are still free
//!
//! Numbers are dense and start at 1. The function is pure; calling it twice
//! with the same inputs yields the same plan.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::entity::{DesiredEntity, ExistingEntity, OrderedEntities, SyncEntity, DEFAULT_ENTITY_NAME};

// ---------------------------------------------------------------------------
// Input / output
// ---------------------------------------------------------------------------

/// Everything the reconciler looks at for one collection.
#[derive(Debug)]
pub struct ReconcileInput<'a, T> {
    /// Explicitly declared entities, in declaration order. Duplicate names
    /// collapse to the last occurrence's attributes.
    pub course_entities: &'a [T],
    /// Caller-supplied entities that never override a desired name.
    pub extra_entities: &'a [T],
    /// Current persisted rows for this collection.
    pub existing_entities: &'a [ExistingEntity<T>],
    /// Names referenced elsewhere in the course.
    pub known_names: &'a BTreeSet<String>,
    /// `false` rebuilds the desired set from `existing_entities` and disables deletion.
    pub is_source_valid: bool,
    pub delete_unused: bool,
}

impl<'a, T> Clone for ReconcileInput<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for ReconcileInput<'a, T> {}

/// A three-way diff for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityPlan<T> {
    /// Desired entities with no persisted row, in number order.
    pub to_create: Vec<DesiredEntity<T>>,
    /// Desired entities that already have a row, in number order.
    pub to_update: Vec<DesiredEntity<T>>,
    pub to_delete: BTreeSet<String>,
}

/// Row counts of an [`EntityPlan`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl<T> Default for EntityPlan<T> {
    fn default() -> Self {
        Self {
            to_create: Vec::new(),
            to_update: Vec::new(),
            to_delete: BTreeSet::new(),
        }
    }
}

impl<T> EntityPlan<T> {
    /// `true` if the plan touches no rows at all.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            created: self.to_create.len(),
            updated: self.to_update.len(),
            deleted: self.to_delete.len(),
        }
    }

    /// Every desired entity (created and updated), sorted by number.
    pub fn desired(&self) -> Vec<&DesiredEntity<T>> {
        let mut all: Vec<_> = self.to_create.iter().chain(&self.to_update).collect();
        all.sort_by_key(|e| e.number);
        all
    }

    /// Owned version of [`EntityPlan::desired`].
    pub fn into_desired(self) -> Vec<DesiredEntity<T>> {
        let mut all: Vec<_> = self.to_create.into_iter().chain(self.to_update).collect();
        all.sort_by_key(|e| e.number);
        all
    }
}

impl PlanSummary {
    pub fn add(&mut self, other: PlanSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
    }
}

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

/// Reconcile one collection using explicit factories.
pub fn reconcile<T, I, D>(input: ReconcileInput<'_, T>, make_implicit: I, make_default: D) -> EntityPlan<T>
where
    T: SyncEntity,
    I: Fn(&str) -> T,
    D: FnOnce() -> Option<T>,
{
    // (implicit, attributes) keyed by name, in insertion order
    let mut desired: OrderedEntities<(bool, T)> = OrderedEntities::new();

    if input.is_source_valid {
        for entity in input.course_entities {
            desired.insert(entity.name(), (false, entity.clone()));
        }
    } else {
        for row in input.existing_entities {
            desired.insert(row.name(), (row.implicit, row.data.clone()));
        }
    }

    // `Default` is left for the factory only when the collection has one
    let default = make_default();

    // BTreeSet iterates in lexicographic order
    for name in input.known_names {
        if (default.is_some() && name == DEFAULT_ENTITY_NAME) || desired.contains(name) {
            continue;
        }
        desired.insert(name.as_str(), (true, make_implicit(name.as_str())));
    }

    if let Some(default) = default {
        desired.insert_if_absent(DEFAULT_ENTITY_NAME, (false, default));
    }

    for extra in input.extra_entities {
        desired.insert_if_absent(extra.name(), (false, extra.clone()));
    }

    let existing: HashSet<&str> = input.existing_entities.iter().map(|e| e.name()).collect();

    let mut plan = EntityPlan::default();
    let desired_names: HashSet<String> = desired.iter().map(|(name, _)| name.to_string()).collect();
    for (idx, (name, (implicit, data))) in desired.into_iter().enumerate() {
        let in_storage = existing.contains(name.as_str());
        let entity = DesiredEntity {
            name,
            number: (idx + 1) as u32,
            implicit,
            data,
        };
        if in_storage {
            plan.to_update.push(entity);
        } else {
            plan.to_create.push(entity);
        }
    }

    if input.delete_unused && input.is_source_valid {
        plan.to_delete = existing
            .into_iter()
            .filter(|name| !desired_names.contains(*name))
            .map(str::to_string)
            .collect();
    }

    plan
}

/// Reconcile one collection using the entity type's own factories.
pub fn reconcile_entities<T: SyncEntity>(input: ReconcileInput<'_, T>) -> EntityPlan<T> {
    reconcile(input, T::make_implicit, T::make_default)
}
