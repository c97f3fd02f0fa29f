// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Synchronous listener registry.

use std::fmt;

/// Handle returned by [`Event::add_listener`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// A list of boxed callbacks of type `F`, e.g. `dyn FnMut(&Args)`.
///
/// Listeners run in registration order, on the caller's stack, when the owner
/// raises the event.
pub struct Event<F: ?Sized> {
    listeners: Vec<(ListenerId, Box<F>)>,
    next_id: u64,
}

impl<F: ?Sized> Default for Event<F> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }
}

impl<F: ?Sized> Event<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: Box<F>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Invokes `call` on every listener.
    pub fn raise_with(&mut self, mut call: impl FnMut(&mut F)) {
        for (_, listener) in &mut self.listeners {
            call(listener.as_mut());
        }
    }
}

impl<F: ?Sized> fmt::Debug for Event<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
