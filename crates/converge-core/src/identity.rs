// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Composite identifiers.
//!
//! Resources addressed by the remote API through nested IDs (workspace,
//! instance, volume, ...) are exposed under one opaque token made of 2 to 4
//! segments joined with [`SEPARATOR`]. Decoding a token with the wrong number
//! of segments is a [`ConvergeError::Structural`] error, never a not-found:
//! a corrupted stored identity must not be mistaken for a deleted resource.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{ConvergeError, Result};

/// Separator between segments of a composite identifier.
pub const SEPARATOR: char = '/';

/// Smallest number of segments in a composite identifier.
pub const MIN_SEGMENTS: usize = 2;

/// Largest number of segments in a composite identifier.
pub const MAX_SEGMENTS: usize = 4;

/// Join segments into a composite identifier token.
pub fn encode<S: AsRef<str>>(segments: &[S]) -> Result<String> {
    check_count(segments.len())?;
    for (index, segment) in segments.iter().enumerate() {
        check_segment(index, segment.as_ref())?;
    }

    let parts: Vec<&str> = segments.iter().map(AsRef::as_ref).collect();
    Ok(parts.join(&SEPARATOR.to_string()))
}

/// Split a composite identifier token into exactly `expected` segments.
pub fn decode(token: &str, expected: usize) -> Result<Vec<String>> {
    check_count(expected)?;

    let parts: Vec<&str> = token.split(SEPARATOR).collect();
    if parts.len() != expected {
        return Err(ConvergeError::Structural(format!(
            "identifier {:?} has {} segment(s), expected {}",
            token,
            parts.len(),
            expected
        )));
    }
    if let Some(index) = parts.iter().position(|part| part.is_empty()) {
        return Err(ConvergeError::Structural(format!(
            "identifier {:?} has an empty segment at position {}",
            token, index
        )));
    }

    Ok(parts.into_iter().map(str::to_string).collect())
}

fn check_count(count: usize) -> Result<()> {
    if !(MIN_SEGMENTS..=MAX_SEGMENTS).contains(&count) {
        return Err(ConvergeError::Structural(format!(
            "composite identifiers have {} to {} segments, got {}",
            MIN_SEGMENTS, MAX_SEGMENTS, count
        )));
    }
    Ok(())
}

fn check_segment(index: usize, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(ConvergeError::Structural(format!(
            "segment {} is empty",
            index
        )));
    }
    if segment.contains(SEPARATOR) {
        return Err(ConvergeError::Structural(format!(
            "segment {} ({:?}) contains the separator {:?}",
            index, segment, SEPARATOR
        )));
    }
    Ok(())
}

/// A validated composite identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeId {
    segments: Vec<String>,
}

impl CompositeId {
    /// Build an identifier from its segments, validating each one.
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        check_count(segments.len())?;
        for (index, segment) in segments.iter().enumerate() {
            check_segment(index, segment)?;
        }
        Ok(Self { segments })
    }

    /// Parse a token that must contain exactly `expected` segments.
    pub fn parse(token: &str, expected: usize) -> Result<Self> {
        let segments = decode(token, expected)?;
        Ok(Self { segments })
    }

    /// All segments, outermost scope first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Segment at `index`, if present.
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    /// The outermost scope (e.g. the workspace / cloud instance ID).
    pub fn scope(&self) -> &str {
        // Constructors reject fewer than two segments.
        self.segments.first().map(String::as_str).unwrap_or_default()
    }

    /// The innermost resource ID.
    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: a composite identifier has at least two segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Encoded token.
    pub fn encode(&self) -> String {
        self.segments.join(&SEPARATOR.to_string())
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for CompositeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}
