// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Entities and the observable collection that owns them.
//!
//! Every mutation of an [`EntityCollection`] is reported to its listeners as
//! a [`CollectionChanged`] batch.  Between [`EntityCollection::suspend_events`]
//! and the matching [`EntityCollection::resume_events`] the changes are
//! coalesced into a single batch:
//!
//! | Sequence while suspended | Reported as |
//! |--------------------------|-------------|
//! | add, then remove | nothing |
//! | remove, then add | changed |
//! | add, then change | added |

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::event::{Event, ListenerId};
use crate::interval::TimeInterval;
use crate::material::MaterialProperty;
use crate::position::{PositionProperty, PropertyResolver, ReferenceProperty, POSITION_PROPERTY};
use crate::property::Property;
use crate::JulianDate;

/// How an entity's path is drawn.  Unset fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathGraphics {
    pub show: Option<Property<bool>>,
    /// Maximum seconds between path vertices.
    pub resolution: Option<Property<f64>>,
    /// Line width in pixels.
    pub width: Option<Property<f64>>,
    pub material: Option<MaterialProperty>,
}

impl PathGraphics {
    /// Fills every unset field from `source`.
    pub fn merge(&mut self, source: &PathGraphics) {
        if self.show.is_none() {
            self.show.clone_from(&source.show);
        }
        if self.resolution.is_none() {
            self.resolution.clone_from(&source.resolution);
        }
        if self.width.is_none() {
            self.width.clone_from(&source.width);
        }
        if self.material.is_none() {
            self.material.clone_from(&source.material);
        }
    }
}

/// A time-dynamic object.
#[derive(Debug, Clone)]
pub struct Entity {
    id: String,
    pub position: Option<PositionProperty>,
    /// Times at which the entity exists; `None` means always.
    pub availability: Option<TimeInterval>,
    pub path: Option<PathGraphics>,
    pub show: bool,
}

impl Entity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position: None,
            availability: None,
            path: None,
            show: true,
        }
    }

    /// Entity with a random unique id.
    pub fn with_generated_id() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn with_position(mut self, position: impl Into<PositionProperty>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn with_availability(mut self, availability: TimeInterval) -> Self {
        self.availability = Some(availability);
        self
    }

    pub fn with_path(mut self, path: PathGraphics) -> Self {
        self.path = Some(path);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_showing(&self) -> bool {
        self.show
    }

    /// `true` if the entity exists at `time`.
    pub fn is_available(&self, time: JulianDate) -> bool {
        self.availability
            .as_ref()
            .map_or(true, |availability| availability.contains(time))
    }

    /// Fills unset properties from `source`; availability is always taken
    /// from `source` when it has one.
    pub fn merge(&mut self, source: &Entity) {
        if self.position.is_none() {
            self.position.clone_from(&source.position);
        }
        if source.availability.is_some() {
            self.availability.clone_from(&source.availability);
        }
        match (&mut self.path, &source.path) {
            (Some(path), Some(other)) => path.merge(other),
            (None, Some(other)) => self.path = Some(other.clone()),
            _ => {}
        }
    }
}

/// One batch of collection changes.
#[derive(Debug)]
pub struct CollectionChanged<'a> {
    pub added: Vec<&'a Entity>,
    pub removed: Vec<&'a Entity>,
    pub changed: Vec<&'a Entity>,
}

/// Callback type of [`EntityCollection`] change listeners.
pub type CollectionChangedListener = dyn FnMut(&CollectionChanged<'_>);

#[derive(Debug, Default)]
struct PendingChanges {
    added: BTreeSet<String>,
    removed: BTreeMap<String, Entity>,
    changed: BTreeSet<String>,
}

impl PendingChanges {
    fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Entities keyed by id.
#[derive(Debug, Default)]
pub struct EntityCollection {
    entities: BTreeMap<String, Entity>,
    pending: PendingChanges,
    suspend_count: usize,
    collection_changed: Event<CollectionChangedListener>,
}

impl EntityCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_collection_changed_listener(
        &mut self,
        listener: Box<CollectionChangedListener>,
    ) -> ListenerId {
        self.collection_changed.add_listener(listener)
    }

    pub fn remove_collection_changed_listener(&mut self, id: ListenerId) -> bool {
        self.collection_changed.remove_listener(id)
    }

    /// Adds `entity`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if an entity with the same id exists.
    pub fn add(&mut self, entity: Entity) -> Result<()> {
        let id = entity.id.clone();
        if self.entities.contains_key(&id) {
            return Err(Error::invalid_argument(format!(
                "an entity with id {id:?} already exists"
            )));
        }
        if self.pending.removed.remove(&id).is_some() {
            self.pending.changed.insert(id.clone());
        } else {
            self.pending.added.insert(id.clone());
        }
        self.entities.insert(id, entity);
        self.fire_changed_event();
        Ok(())
    }

    /// Removes the entity with `id`; `false` if there was none.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(entity) = self.entities.remove(id) else {
            return false;
        };
        if !self.pending.added.remove(id) {
            self.pending.changed.remove(id);
            self.pending.removed.insert(id.to_owned(), entity);
        }
        self.fire_changed_event();
        true
    }

    /// Removes every entity, reported as one batch.
    pub fn remove_all(&mut self) {
        self.suspend_events();
        let ids: Vec<String> = self.entities.keys().cloned().collect();
        for id in ids {
            self.remove(&id);
        }
        self.suspend_count -= 1;
        self.fire_changed_event();
    }

    /// Edits the entity with `id` in place and reports it as changed.
    /// Returns `false` if there is no such entity.
    pub fn update(&mut self, id: &str, edit: impl FnOnce(&mut Entity)) -> bool {
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        edit(entity);
        if !self.pending.added.contains(id) {
            self.pending.changed.insert(id.to_owned());
        }
        self.fire_changed_event();
        true
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Entities in id order.
    pub fn values(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Defers change notification until the matching [`resume_events`].
    /// Calls nest.
    ///
    /// [`resume_events`]: Self::resume_events
    pub fn suspend_events(&mut self) {
        self.suspend_count += 1;
    }

    /// Ends one [`suspend_events`](Self::suspend_events); the outermost
    /// call reports the coalesced batch.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if events are not suspended.
    pub fn resume_events(&mut self) -> Result<()> {
        if self.suspend_count == 0 {
            return Err(Error::invalid_argument(
                "resume_events called without a matching suspend_events",
            ));
        }
        self.suspend_count -= 1;
        self.fire_changed_event();
        Ok(())
    }

    fn fire_changed_event(&mut self) {
        if self.suspend_count > 0 || self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        let entities = &self.entities;
        let lookup = |ids: &BTreeSet<String>| {
            ids.iter()
                .filter_map(|id| entities.get(id))
                .collect::<Vec<_>>()
        };
        let args = CollectionChanged {
            added: lookup(&pending.added),
            removed: pending.removed.values().collect(),
            changed: lookup(&pending.changed),
        };
        trace!(
            added = args.added.len(),
            removed = args.removed.len(),
            changed = args.changed.len(),
            "entity collection changed"
        );
        self.collection_changed.raise_with(|listener| listener(&args));
    }
}

impl PropertyResolver for EntityCollection {
    fn resolve_position(&self, reference: &ReferenceProperty) -> Option<&PositionProperty> {
        if reference.property != POSITION_PROPERTY {
            return None;
        }
        self.entities.get(&reference.target_id)?.position.as_ref()
    }
}
