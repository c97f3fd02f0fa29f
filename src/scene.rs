// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Retained-mode render targets.
//!
//! A [`Scene`] holds shared [`PolylineCollection`]s.  Each collection has one
//! model matrix applied to all of its polylines, so a collection can hold
//! every path drawn in one reference frame.

use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::{Matrix4, Vector3};

use crate::material::RevealMaterial;

/// Projection the scene is rendered in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SceneMode {
    Scene2D,
    ColumbusView,
    #[default]
    Scene3D,
    /// Transitioning between two of the other modes.
    Morphing,
}

/// One drawable line strip.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub show: bool,
    pub width: f64,
    pub positions: Vec<Vector3<f64>>,
    pub material: Option<RevealMaterial>,
    /// Id of the entity drawn by this polyline.
    pub id: Option<String>,
}

impl Default for Polyline {
    fn default() -> Self {
        Self {
            show: true,
            width: 1.0,
            positions: Vec::new(),
            material: None,
            id: None,
        }
    }
}

/// Polylines sharing a model matrix.  Indices are stable.
#[derive(Debug, Clone, PartialEq)]
pub struct PolylineCollection {
    polylines: Vec<Polyline>,
    pub model_matrix: Matrix4<f64>,
}

impl Default for PolylineCollection {
    fn default() -> Self {
        Self {
            polylines: Vec::new(),
            model_matrix: Matrix4::identity(),
        }
    }
}

impl PolylineCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `polyline` and returns its index.
    pub fn add(&mut self, polyline: Polyline) -> usize {
        self.polylines.push(polyline);
        self.polylines.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Polyline> {
        self.polylines.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Polyline> {
        self.polylines.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Polyline> {
        self.polylines.iter()
    }

    pub fn len(&self) -> usize {
        self.polylines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polylines.is_empty()
    }

    /// Number of polylines with `show` set.
    pub fn visible_count(&self) -> usize {
        self.polylines.iter().filter(|polyline| polyline.show).count()
    }
}

/// Shared handle to a collection registered with a [`Scene`].
pub type SharedPolylineCollection = Rc<RefCell<PolylineCollection>>;

/// The set of root-level primitives being rendered.
#[derive(Debug, Default)]
pub struct Scene {
    pub mode: SceneMode,
    primitives: Vec<SharedPolylineCollection>,
}

impl Scene {
    pub fn new(mode: SceneMode) -> Self {
        Self {
            mode,
            primitives: Vec::new(),
        }
    }

    pub fn add_primitive_collection(&mut self, collection: SharedPolylineCollection) {
        self.primitives.push(collection);
    }

    /// Unregisters `collection`; `false` if it was not registered.
    pub fn remove_primitive_collection(&mut self, collection: &SharedPolylineCollection) -> bool {
        let before = self.primitives.len();
        self.primitives
            .retain(|existing| !Rc::ptr_eq(existing, collection));
        self.primitives.len() != before
    }

    pub fn contains_primitive_collection(&self, collection: &SharedPolylineCollection) -> bool {
        self.primitives
            .iter()
            .any(|existing| Rc::ptr_eq(existing, collection))
    }

    pub fn primitive_collections(&self) -> &[SharedPolylineCollection] {
        &self.primitives
    }
}
