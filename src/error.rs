// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Error types shared by every module of the crate.

use thiserror::Error;

/// Errors raised by transforms, property resolution and visualizer setup.
///
/// Values that are merely undefined at a given time, or entities whose
/// availability cannot bound a path, are *not* errors: they surface as
/// `None` or as "nothing drawn" respectively.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A required input was missing or not finite.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A chain of reference / scaled properties did not bottom out.
    #[error("reference chain starting at entity {entity_id:?} exceeded {max_depth} hops")]
    CyclicReference { entity_id: String, max_depth: usize },

    /// A reference property names an entity or property that does not exist.
    #[error("unresolved reference {entity_id}#{property}")]
    UnresolvedReference { entity_id: String, property: String },

    /// An interval was added on top of one already present in a collection.
    #[error("interval overlaps an existing interval: {0}")]
    OverlappingInterval(String),

    /// A time or interval string could not be parsed.
    #[error("failed to parse {input:?}: {reason}")]
    Parse { input: String, reason: String },
}

impl Error {
    /// Creates an [`Error::InvalidArgument`].
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Creates an [`Error::Parse`].
    pub fn parse(input: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Parse {
            input: input.into(),
            reason: reason.to_string(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
