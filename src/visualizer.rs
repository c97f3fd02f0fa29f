// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Path visualization.
//!
//! A [`PathVisualizer`] keeps one polyline per entity that has both a
//! position and path graphics.  Polylines live in per-frame pools
//! ([`PolylineUpdater`]); each pool's model matrix maps its frame to the
//! fixed frame, so vertices are stored in the frame they were sampled in.
//!
//! Per item and per tick the slot moves through [`SlotState`]:
//!
//! ```text
//! Unallocated --show--> Allocated --sampled & styled--> Rendered
//!      ^                    |                              |
//!      +-------- hidden, removed or frame switch ----------+
//! ```
//!
//! Released slots go to a free list and are reused before the pool grows.

use std::cell::RefCell;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use nalgebra::Matrix4;
use qtty::Seconds;
use tracing::{debug, trace, warn};

use crate::entity::{CollectionChanged, Entity, EntityCollection};
use crate::error::{Error, Result};
use crate::event::ListenerId;
use crate::material::{Color, RevealMaterial};
use crate::position::{EvaluationContext, DEFAULT_MAX_REFERENCE_DEPTH};
use crate::property::{value_or_default, ReferenceFrame};
use crate::scene::{Polyline, PolylineCollection, Scene, SceneMode, SharedPolylineCollection};
use crate::subsample::subsample_into;
use crate::transforms::{inertial_to_fixed_matrix, EarthOrientation};
use crate::JulianDate;

/// Defaults applied when path graphics leave a value unset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct VisualizerOptions {
    /// Maximum seconds between path vertices.
    pub default_resolution: f64,
    /// Line width in pixels.
    pub default_width: f64,
    pub default_color: Color,
    /// Hop limit when following reference chains.
    pub max_reference_depth: usize,
}

impl Default for VisualizerOptions {
    fn default() -> Self {
        Self {
            default_resolution: 60.0,
            default_width: 1.0,
            default_color: Color::WHITE,
            max_reference_depth: DEFAULT_MAX_REFERENCE_DEPTH,
        }
    }
}

/// Where an entity's path stands in its updater's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No polyline.
    Unallocated,
    /// Owns the polyline at this index; not yet drawn this tick.
    Allocated(usize),
    /// Owns the polyline at this index, drawn for the latest tick.
    Rendered(usize),
}

impl SlotState {
    pub fn index(self) -> Option<usize> {
        match self {
            SlotState::Unallocated => None,
            SlotState::Allocated(index) | SlotState::Rendered(index) => Some(index),
        }
    }
}

#[derive(Debug)]
struct VisualizationItem {
    entity_id: String,
    state: SlotState,
    updater: Option<ReferenceFrame>,
}

impl VisualizationItem {
    fn new(entity_id: &str) -> Self {
        Self {
            entity_id: entity_id.to_owned(),
            state: SlotState::Unallocated,
            updater: None,
        }
    }
}

/// Pool of polylines drawn in one reference frame.
#[derive(Debug)]
pub struct PolylineUpdater {
    frame: ReferenceFrame,
    collection: SharedPolylineCollection,
    unused_indexes: Vec<usize>,
}

impl PolylineUpdater {
    /// Creates the pool and registers its collection with `scene`.
    pub fn new(scene: &mut Scene, frame: ReferenceFrame) -> Self {
        let collection = Rc::new(RefCell::new(PolylineCollection::new()));
        scene.add_primitive_collection(Rc::clone(&collection));
        debug!(%frame, "created polyline updater");
        Self {
            frame,
            collection,
            unused_indexes: Vec::new(),
        }
    }

    pub fn frame(&self) -> ReferenceFrame {
        self.frame
    }

    pub fn collection(&self) -> &SharedPolylineCollection {
        &self.collection
    }

    /// Indices released and waiting for reuse.
    pub fn unused_indexes(&self) -> &[usize] {
        &self.unused_indexes
    }

    /// Points the pool's model matrix at the fixed frame for `time`.
    pub fn update(
        &mut self,
        time: JulianDate,
        orientation: Option<&dyn EarthOrientation>,
    ) -> Result<()> {
        let model_matrix = match self.frame {
            ReferenceFrame::Fixed => Matrix4::identity(),
            ReferenceFrame::Inertial => inertial_to_fixed_matrix(time, orientation)?.to_homogeneous(),
        };
        self.collection.borrow_mut().model_matrix = model_matrix;
        Ok(())
    }

    /// Brings the polyline of `entity` up to date for `time`.
    fn update_object(
        &mut self,
        time: JulianDate,
        entity: &Entity,
        item: &mut VisualizationItem,
        ctx: &EvaluationContext<'_>,
        options: &VisualizerOptions,
    ) {
        let (Some(path), Some(position)) = (entity.path.as_ref(), entity.position.as_ref()) else {
            self.remove_object(item);
            return;
        };

        let show = entity.is_showing()
            && path
                .show
                .as_ref()
                .map_or(true, |show| show.value(time).unwrap_or(false));
        // A path needs a bounded, non-degenerate range to sample.
        let range = entity
            .availability
            .as_ref()
            .filter(|availability| availability.start < availability.stop)
            .map(|availability| (availability.start, availability.stop));
        let (start, stop) = match range {
            Some(range) if show => range,
            _ => {
                self.remove_object(item);
                return;
            }
        };

        let mut collection = self.collection.borrow_mut();
        let index = match item.state.index() {
            Some(index) => index,
            None => {
                let index = match self.unused_indexes.pop() {
                    Some(index) => index,
                    None => collection.add(Polyline::default()),
                };
                debug!(entity = entity.id(), frame = %self.frame, index, "allocated polyline slot");
                item.state = SlotState::Allocated(index);
                index
            }
        };
        let Some(polyline) = collection.get_mut(index) else {
            return;
        };
        polyline.id = Some(entity.id().to_owned());

        let resolution = value_or_default(path.resolution.as_ref(), time, options.default_resolution);
        let color = path
            .material
            .as_ref()
            .and_then(|material| material.reveal_color(time))
            .unwrap_or(options.default_color);

        if matches!(item.state, SlotState::Allocated(_)) || polyline.positions.is_empty() {
            if let Err(err) = subsample_into(
                position,
                start,
                stop,
                self.frame,
                Seconds::new(resolution),
                ctx,
                &mut polyline.positions,
            ) {
                warn!(entity = entity.id(), error = %err, "cannot sample path, hiding it");
                drop(collection);
                self.remove_object(item);
                return;
            }
            trace!(entity = entity.id(), vertices = polyline.positions.len(), "resampled path");
        }

        let total = stop.seconds_difference(&start).value();
        let elapsed = time.seconds_difference(&start).value();
        let material = polyline.material.get_or_insert_with(|| RevealMaterial::new(color));
        material.color = color;
        material.update_time.x = elapsed / total;
        material.update_time.y = resolution / total;

        polyline.show = true;
        polyline.width = value_or_default(path.width.as_ref(), time, options.default_width);
        item.state = SlotState::Rendered(index);
    }

    /// Returns the item's slot to the free list and hides its polyline.
    fn remove_object(&mut self, item: &mut VisualizationItem) {
        let Some(index) = item.state.index() else {
            return;
        };
        if let Some(polyline) = self.collection.borrow_mut().get_mut(index) {
            polyline.show = false;
            polyline.id = None;
            polyline.positions.clear();
        }
        self.unused_indexes.push(index);
        item.state = SlotState::Unallocated;
        debug!(entity = %item.entity_id, frame = %self.frame, index, "released polyline slot");
    }

    /// Unregisters the pool from `scene`.
    pub fn destroy(self, scene: &mut Scene) {
        scene.remove_primitive_collection(&self.collection);
        debug!(frame = %self.frame, "destroyed polyline updater");
    }
}

#[derive(Debug, Default)]
struct VisualizerState {
    items: BTreeMap<String, VisualizationItem>,
    updaters: BTreeMap<ReferenceFrame, PolylineUpdater>,
}

impl VisualizerState {
    fn on_collection_changed(&mut self, change: &CollectionChanged<'_>) {
        for entity in &change.added {
            if has_path(entity) {
                self.items
                    .entry(entity.id().to_owned())
                    .or_insert_with(|| VisualizationItem::new(entity.id()));
            }
        }
        for entity in &change.changed {
            if has_path(entity) {
                let item = self
                    .items
                    .entry(entity.id().to_owned())
                    .or_insert_with(|| VisualizationItem::new(entity.id()));
                // The drawn vertices may no longer match the entity.
                if let SlotState::Rendered(index) = item.state {
                    item.state = SlotState::Allocated(index);
                }
            } else {
                self.remove_item(entity.id());
            }
        }
        for entity in &change.removed {
            self.remove_item(entity.id());
        }
        debug!(items = self.items.len(), "visualized entities changed");
    }

    fn remove_item(&mut self, id: &str) {
        let Some(mut item) = self.items.remove(id) else {
            return;
        };
        if let Some(updater) = item.updater.and_then(|frame| self.updaters.get_mut(&frame)) {
            updater.remove_object(&mut item);
        }
    }
}

fn has_path(entity: &Entity) -> bool {
    entity.path.is_some() && entity.position.is_some()
}

/// Configures a [`PathVisualizer`].
#[derive(Default)]
pub struct PathVisualizerBuilder {
    scene: Option<Rc<RefCell<Scene>>>,
    entities: Option<Rc<RefCell<EntityCollection>>>,
    options: VisualizerOptions,
    orientation: Option<Rc<dyn EarthOrientation>>,
}

impl PathVisualizerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scene the polylines are rendered in.  Required.
    pub fn scene(mut self, scene: Rc<RefCell<Scene>>) -> Self {
        self.scene = Some(scene);
        self
    }

    /// Entities to visualize.  Required.
    pub fn entity_collection(mut self, entities: Rc<RefCell<EntityCollection>>) -> Self {
        self.entities = Some(entities);
        self
    }

    pub fn options(mut self, options: VisualizerOptions) -> Self {
        self.options = options;
        self
    }

    /// High-precision inertial-to-fixed rotation, used before the TEME
    /// approximation.
    pub fn earth_orientation(mut self, orientation: Rc<dyn EarthOrientation>) -> Self {
        self.orientation = Some(orientation);
        self
    }

    /// Subscribes to the entity collection and picks up the entities it
    /// already holds.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the scene or the entity collection is
    /// missing, or if the collection is mutably borrowed.
    pub fn build(self) -> Result<PathVisualizer> {
        let scene = self
            .scene
            .ok_or_else(|| Error::invalid_argument("scene is required"))?;
        let entities = self
            .entities
            .ok_or_else(|| Error::invalid_argument("entity collection is required"))?;

        let state = Rc::new(RefCell::new(VisualizerState::default()));
        let listener = {
            let mut collection = entities
                .try_borrow_mut()
                .map_err(|_| Error::invalid_argument("entity collection is in use"))?;
            let listener_state = Rc::clone(&state);
            let listener = collection.add_collection_changed_listener(Box::new(
                move |change: &CollectionChanged<'_>| match listener_state.try_borrow_mut() {
                    Ok(mut state) => state.on_collection_changed(change),
                    Err(_) => warn!("visualizer busy, dropped a collection change"),
                },
            ));
            let existing = CollectionChanged {
                added: collection.values().collect(),
                removed: Vec::new(),
                changed: Vec::new(),
            };
            state.borrow_mut().on_collection_changed(&existing);
            listener
        };

        Ok(PathVisualizer {
            scene,
            entities,
            options: self.options,
            orientation: self.orientation,
            state,
            listener: Some(listener),
            destroyed: false,
        })
    }
}

/// Draws the paths of an [`EntityCollection`] into a [`Scene`].
pub struct PathVisualizer {
    scene: Rc<RefCell<Scene>>,
    entities: Rc<RefCell<EntityCollection>>,
    options: VisualizerOptions,
    orientation: Option<Rc<dyn EarthOrientation>>,
    state: Rc<RefCell<VisualizerState>>,
    listener: Option<ListenerId>,
    destroyed: bool,
}

impl PathVisualizer {
    pub fn builder() -> PathVisualizerBuilder {
        PathVisualizerBuilder::new()
    }

    /// Visualizer with default options.
    pub fn new(scene: Rc<RefCell<Scene>>, entities: Rc<RefCell<EntityCollection>>) -> Result<Self> {
        Self::builder().scene(scene).entity_collection(entities).build()
    }

    pub fn options(&self) -> &VisualizerOptions {
        &self.options
    }

    /// Updates every path for `time`.  Always returns `true`.
    pub fn update(&mut self, time: JulianDate) -> bool {
        if self.destroyed {
            debug!("update called on a destroyed path visualizer");
            return true;
        }
        if !time.is_finite() {
            warn!("path visualizer update skipped for a non-finite time");
            return true;
        }

        let entities = self.entities.borrow();
        let scene_mode = self.scene.borrow().mode;
        let orientation = self.orientation.as_deref();
        let ctx = EvaluationContext::new(&*entities)
            .with_orientation(orientation)
            .with_max_reference_depth(self.options.max_reference_depth);

        let mut state = self.state.borrow_mut();
        let VisualizerState { items, updaters } = &mut *state;

        // Pool transforms first, so every item drawn below sees them.
        for updater in updaters.values_mut() {
            if let Err(err) = updater.update(time, orientation) {
                warn!(frame = %updater.frame(), error = %err, "cannot update frame transform");
            }
        }

        for item in items.values_mut() {
            let Some(entity) = entities.get(&item.entity_id) else {
                continue;
            };
            let Some(position) = entity.position.as_ref() else {
                continue;
            };

            let frame = if scene_mode == SceneMode::Scene3D {
                match position.reference_frame(&ctx) {
                    Ok(frame) => frame,
                    Err(err) => {
                        warn!(entity = entity.id(), error = %err, "cannot resolve reference frame");
                        if let Some(updater) = item.updater.and_then(|frame| updaters.get_mut(&frame)) {
                            updater.remove_object(item);
                        }
                        continue;
                    }
                }
            } else {
                ReferenceFrame::Fixed
            };

            if item.updater != Some(frame) {
                if let Some(previous) = item.updater.and_then(|last| updaters.get_mut(&last)) {
                    previous.remove_object(item);
                }
                item.updater = Some(frame);
            }

            let updater = match updaters.entry(frame) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let mut updater = PolylineUpdater::new(&mut self.scene.borrow_mut(), frame);
                    if let Err(err) = updater.update(time, orientation) {
                        warn!(%frame, error = %err, "cannot update frame transform");
                    }
                    entry.insert(updater)
                }
            };
            updater.update_object(time, entity, item, &ctx, &self.options);
        }
        true
    }

    /// Releases every polyline pool and unsubscribes from the entity
    /// collection.  Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        if let Some(listener) = self.listener.take() {
            match self.entities.try_borrow_mut() {
                Ok(mut entities) => {
                    entities.remove_collection_changed_listener(listener);
                }
                Err(_) => warn!("entity collection in use, listener left registered"),
            }
        }
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.items.clear();
            let updaters = std::mem::take(&mut state.updaters);
            match self.scene.try_borrow_mut() {
                Ok(mut scene) => {
                    for updater in updaters.into_values() {
                        updater.destroy(&mut scene);
                    }
                }
                Err(_) => warn!("scene in use, polyline collections left registered"),
            }
        }
        self.destroyed = true;
        debug!("destroyed path visualizer");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Slot state of the entity with `id`; `None` if it is not visualized.
    pub fn item_state(&self, id: &str) -> Option<SlotState> {
        self.state.borrow().items.get(id).map(|item| item.state)
    }

    /// Frame of the updater currently drawing the entity with `id`.
    pub fn item_frame(&self, id: &str) -> Option<ReferenceFrame> {
        self.state.borrow().items.get(id).and_then(|item| item.updater)
    }

    /// Number of entities being visualized.
    pub fn item_count(&self) -> usize {
        self.state.borrow().items.len()
    }

    /// Polyline pool of `frame`, once one has been created.
    pub fn primitives(&self, frame: ReferenceFrame) -> Option<SharedPolylineCollection> {
        self.state
            .borrow()
            .updaters
            .get(&frame)
            .map(|updater| Rc::clone(updater.collection()))
    }

    /// Free-list of the pool of `frame`.
    pub fn unused_indexes(&self, frame: ReferenceFrame) -> Vec<usize> {
        self.state
            .borrow()
            .updaters
            .get(&frame)
            .map(|updater| updater.unused_indexes().to_vec())
            .unwrap_or_default()
    }
}

impl Drop for PathVisualizer {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for PathVisualizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathVisualizer")
            .field("options", &self.options)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::PathGraphics;
    use crate::interval::{TimeInterval, TimeIntervalCollection};
    use crate::material::MaterialProperty;
    use crate::position::{DynamicPosition, PositionProperty};
    use crate::property::{Property, SampledProperty};
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Vector3};

    fn at(seconds: f64) -> JulianDate {
        JulianDate::J2000.add_seconds(Seconds::new(seconds))
    }

    fn track(id: &str) -> Entity {
        let mut samples = SampledProperty::new();
        samples.add_samples([
            (at(0.0), Vector3::new(7e6, 0.0, 0.0)),
            (at(600.0), Vector3::new(0.0, 7e6, 0.0)),
        ]);
        Entity::new(id)
            .with_position(PositionProperty::sampled(samples))
            .with_availability(TimeInterval::new(at(0.0), at(600.0)))
            .with_path(PathGraphics::default())
    }

    fn setup(
        entities: Vec<Entity>,
    ) -> (Rc<RefCell<Scene>>, Rc<RefCell<EntityCollection>>, PathVisualizer) {
        let scene = Rc::new(RefCell::new(Scene::new(SceneMode::Scene3D)));
        let collection = Rc::new(RefCell::new(EntityCollection::new()));
        for entity in entities {
            collection.borrow_mut().add(entity).unwrap();
        }
        let visualizer = PathVisualizer::new(Rc::clone(&scene), Rc::clone(&collection)).unwrap();
        (scene, collection, visualizer)
    }

    #[test]
    fn build_requires_scene_and_collection() {
        let err = PathVisualizer::builder().build().unwrap_err();
        assert_eq!(err, Error::invalid_argument("scene is required"));

        let err = PathVisualizer::builder()
            .scene(Rc::default())
            .build()
            .unwrap_err();
        assert_eq!(err, Error::invalid_argument("entity collection is required"));
    }

    #[test]
    fn only_entities_with_position_and_path_are_tracked() {
        let bare = Entity::new("bare").with_path(PathGraphics::default());
        let (_scene, collection, visualizer) = setup(vec![track("sat"), bare]);
        assert_eq!(visualizer.item_count(), 1);
        assert_eq!(visualizer.item_state("sat"), Some(SlotState::Unallocated));
        assert_eq!(visualizer.item_state("bare"), None);

        collection
            .borrow_mut()
            .update("bare", |e| e.position = Some(Vector3::x().into()));
        assert_eq!(visualizer.item_state("bare"), Some(SlotState::Unallocated));

        collection.borrow_mut().update("sat", |e| e.path = None);
        assert_eq!(visualizer.item_state("sat"), None);
    }

    #[test]
    fn update_renders_with_reveal_material() {
        let (scene, _collection, mut visualizer) = setup(vec![track("sat")]);
        assert!(visualizer.update(at(150.0)));

        assert_eq!(visualizer.item_state("sat"), Some(SlotState::Rendered(0)));
        assert_eq!(scene.borrow().primitive_collections().len(), 1);

        let pool = visualizer.primitives(ReferenceFrame::Fixed).unwrap();
        let pool = pool.borrow();
        let polyline = pool.get(0).unwrap();
        assert!(polyline.show);
        assert_eq!(polyline.id.as_deref(), Some("sat"));
        assert_eq!(polyline.width, 1.0);
        // 600 s gap at 60 s resolution: both ends plus nine inner points.
        assert_eq!(polyline.positions.len(), 11);

        let material = polyline.material.as_ref().unwrap();
        assert_eq!(material.color, Color::WHITE);
        assert_relative_eq!(material.update_time.x, 0.25);
        assert_relative_eq!(material.update_time.y, 0.1);
    }

    #[test]
    fn changed_positions_are_resampled() {
        let (_scene, collection, mut visualizer) = setup(vec![track("sat")]);
        visualizer.update(at(0.0));
        let pool = visualizer.primitives(ReferenceFrame::Fixed).unwrap();
        assert_eq!(pool.borrow().get(0).unwrap().positions.len(), 11);

        let parked = Vector3::new(0.0, 0.0, 7e6);
        collection
            .borrow_mut()
            .update("sat", |e| e.position = Some(parked.into()));
        assert_eq!(visualizer.item_state("sat"), Some(SlotState::Allocated(0)));
        visualizer.update(at(60.0));

        assert_eq!(visualizer.item_state("sat"), Some(SlotState::Rendered(0)));
        assert_eq!(pool.borrow().get(0).unwrap().positions, vec![parked]);
    }

    #[derive(Debug)]
    struct Parked;

    impl DynamicPosition for Parked {
        fn value(&self, _time: JulianDate) -> Option<Vector3<f64>> {
            Some(Vector3::x())
        }
    }

    #[test]
    fn enormous_resolutions_draw_the_range_ends() {
        for resolution in [1e30, f64::INFINITY] {
            let mut entity = track("sat").with_position(PositionProperty::Dynamic(Rc::new(Parked)));
            entity.path = Some(PathGraphics {
                resolution: Some(Property::Constant(resolution)),
                ..PathGraphics::default()
            });
            let (_scene, _collection, mut visualizer) = setup(vec![entity]);
            visualizer.update(at(100.0));

            assert_eq!(visualizer.item_state("sat"), Some(SlotState::Rendered(0)));
            let pool = visualizer.primitives(ReferenceFrame::Fixed).unwrap();
            assert_eq!(pool.borrow().get(0).unwrap().positions, vec![Vector3::x(); 2]);
        }
    }

    #[test]
    fn styling_follows_current_property_values() {
        let mut entity = track("sat");
        entity.path = Some(PathGraphics {
            width: Some(Property::Constant(4.0)),
            resolution: Some(Property::Constant(300.0)),
            material: Some(MaterialProperty::from(Color::RED)),
            ..PathGraphics::default()
        });
        let (_scene, collection, mut visualizer) = setup(vec![entity]);
        visualizer.update(at(0.0));

        collection.borrow_mut().update("sat", |e| {
            if let Some(path) = e.path.as_mut() {
                path.material = Some(MaterialProperty::from(Color::YELLOW));
            }
        });
        visualizer.update(at(300.0));

        let pool = visualizer.primitives(ReferenceFrame::Fixed).unwrap();
        let pool = pool.borrow();
        let polyline = pool.get(0).unwrap();
        assert_eq!(polyline.width, 4.0);
        assert_eq!(polyline.positions.len(), 3);
        let material = polyline.material.as_ref().unwrap();
        assert_eq!(material.color, Color::YELLOW);
        assert_relative_eq!(material.update_time.x, 0.5);
        assert_relative_eq!(material.update_time.y, 0.5);
    }

    #[test]
    fn degenerate_or_missing_availability_hides_the_path() {
        let mut endless = track("endless");
        endless.availability = None;
        let mut instant = track("instant");
        instant.availability = Some(TimeInterval::new(at(10.0), at(10.0)));
        let (_scene, _collection, mut visualizer) = setup(vec![endless, instant]);

        visualizer.update(at(10.0));
        assert_eq!(visualizer.item_state("endless"), Some(SlotState::Unallocated));
        assert_eq!(visualizer.item_state("instant"), Some(SlotState::Unallocated));
    }

    #[test]
    fn show_property_false_or_undefined_hides_the_path() {
        let mut entity = track("sat");
        let show =
            TimeIntervalCollection::from_intervals([TimeInterval::with_data(at(0.0), at(100.0), true)])
                .unwrap();
        entity.path = Some(PathGraphics {
            show: Some(Property::Intervals(show)),
            ..PathGraphics::default()
        });
        let (_scene, _collection, mut visualizer) = setup(vec![entity]);

        visualizer.update(at(50.0));
        assert_eq!(visualizer.item_state("sat"), Some(SlotState::Rendered(0)));
        visualizer.update(at(200.0));
        assert_eq!(visualizer.item_state("sat"), Some(SlotState::Unallocated));
        assert_eq!(visualizer.unused_indexes(ReferenceFrame::Fixed), vec![0]);
    }

    #[test]
    fn unresolvable_paths_are_hidden_not_fatal() {
        let broken = Entity::new("broken")
            .with_position(PositionProperty::reference("nobody"))
            .with_availability(TimeInterval::new(at(0.0), at(600.0)))
            .with_path(PathGraphics::default());
        let (_scene, _collection, mut visualizer) = setup(vec![broken, track("sat")]);

        assert!(visualizer.update(at(10.0)));
        assert_eq!(visualizer.item_state("broken"), Some(SlotState::Unallocated));
        assert!(matches!(visualizer.item_state("sat"), Some(SlotState::Rendered(_))));
    }

    #[derive(Debug)]
    struct QuarterTurn;

    impl EarthOrientation for QuarterTurn {
        fn icrf_to_fixed(&self, _time: JulianDate) -> Option<Matrix3<f64>> {
            Some(Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0))
        }
    }

    #[test]
    fn inertial_pool_uses_the_orientation_provider() {
        let scene = Rc::new(RefCell::new(Scene::new(SceneMode::Scene3D)));
        let collection = Rc::new(RefCell::new(EntityCollection::new()));
        let mut entity = track("sat");
        entity.position = entity
            .position
            .take()
            .map(|p| p.with_frame(ReferenceFrame::Inertial));
        collection.borrow_mut().add(entity).unwrap();

        let mut visualizer = PathVisualizer::builder()
            .scene(Rc::clone(&scene))
            .entity_collection(collection)
            .earth_orientation(Rc::new(QuarterTurn))
            .build()
            .unwrap();
        visualizer.update(at(0.0));

        assert_eq!(visualizer.item_frame("sat"), Some(ReferenceFrame::Inertial));
        let pool = visualizer.primitives(ReferenceFrame::Inertial).unwrap();
        let model = pool.borrow().model_matrix;
        assert_eq!(model[(0, 1)], -1.0);
        assert_eq!(model[(1, 0)], 1.0);
        assert_eq!(model[(3, 3)], 1.0);
    }

    #[test]
    fn non_3d_scenes_draw_everything_fixed() {
        let scene = Rc::new(RefCell::new(Scene::new(SceneMode::Scene2D)));
        let collection = Rc::new(RefCell::new(EntityCollection::new()));
        let mut entity = track("sat");
        entity.position = entity
            .position
            .take()
            .map(|p| p.with_frame(ReferenceFrame::Inertial));
        collection.borrow_mut().add(entity).unwrap();
        let mut visualizer = PathVisualizer::new(scene, collection).unwrap();

        visualizer.update(at(0.0));
        assert_eq!(visualizer.item_frame("sat"), Some(ReferenceFrame::Fixed));
        assert!(visualizer.primitives(ReferenceFrame::Inertial).is_none());
    }

    #[test]
    fn destroy_unregisters_everything() {
        let (scene, collection, mut visualizer) = setup(vec![track("sat")]);
        visualizer.update(at(0.0));
        assert_eq!(scene.borrow().primitive_collections().len(), 1);

        visualizer.destroy();
        assert!(visualizer.is_destroyed());
        assert!(scene.borrow().primitive_collections().is_empty());
        assert_eq!(visualizer.item_count(), 0);

        // No longer listening.
        collection.borrow_mut().add(track("late")).unwrap();
        assert_eq!(visualizer.item_count(), 0);
        assert!(visualizer.update(at(1.0)));
        visualizer.destroy();
    }

    #[test]
    fn drop_destroys() {
        let (scene, collection, mut visualizer) = setup(vec![track("sat")]);
        visualizer.update(at(0.0));
        drop(visualizer);
        assert!(scene.borrow().primitive_collections().is_empty());
        // Adding after drop must not reach a dangling listener.
        collection.borrow_mut().add(track("late")).unwrap();
    }

    #[cfg(feature = "serde")]
    #[test]
    fn options_deserialize_with_defaults() {
        let options: VisualizerOptions =
            serde_json::from_str(r#"{ "default_width": 2.5 }"#).unwrap();
        assert_eq!(options.default_width, 2.5);
        assert_eq!(options.default_resolution, 60.0);
        assert_eq!(options.max_reference_depth, 32);
    }
}
