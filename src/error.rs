// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Error types for timebloom operations

use std::fmt;

/// ErrorKind is all kinds of Error of timebloom.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A construction parameter is out of range.
    InvalidParameter,
    /// A countdown filter refused an insertion because it is full.
    AtCapacity,
    /// A snapshot file is unreadable or its length does not match.
    SnapshotCorrupt,
    /// A snapshot's bit length disagrees with the filter's.
    HeterogeneousSnapshot,
    /// The archive backend failed transiently.
    ArchiveUnavailable,
    /// A plain filesystem operation failed.
    Io,
}

impl ErrorKind {
    /// Convert this error kind instance into static str.
    pub const fn into_static(self) -> &'static str {
        match self {
            ErrorKind::InvalidParameter => "InvalidParameter",
            ErrorKind::AtCapacity => "AtCapacity",
            ErrorKind::SnapshotCorrupt => "SnapshotCorrupt",
            ErrorKind::HeterogeneousSnapshot => "HeterogeneousSnapshot",
            ErrorKind::ArchiveUnavailable => "ArchiveUnavailable",
            ErrorKind::Io => "Io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

/// Error returned by every fallible timebloom operation.
///
/// Carries a [`ErrorKind`], a message, optional key/value context attached
/// along the way, and an optional underlying cause.
pub struct Error {
    kind: ErrorKind,
    message: String,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::new(),
            source: None,
        }
    }

    /// Attaches a key/value pair to the error.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Attaches the underlying cause, replacing any previous one.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the message the error was created with.
    pub fn message(&self) -> &str {
        &self.message
    }
}

// Convenience constructors for the recurring failure cases
impl Error {
    pub(crate) fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParameter, msg)
    }

    pub(crate) fn at_capacity(count: u64, capacity: u64) -> Self {
        Self::new(ErrorKind::AtCapacity, "filter is at capacity")
            .with_context("count", count)
            .with_context("capacity", capacity)
    }

    pub(crate) fn snapshot_corrupt(msg: impl fmt::Display) -> Self {
        Self::new(ErrorKind::SnapshotCorrupt, format!("corrupt snapshot: {msg}"))
    }

    pub(crate) fn heterogeneous_snapshot(expected: u64, actual: u64) -> Self {
        Self::new(
            ErrorKind::HeterogeneousSnapshot,
            format!("snapshot bit length {actual} does not match filter bit length {expected}"),
        )
    }

    pub(crate) fn io(msg: impl fmt::Display, src: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, msg.to_string()).with_source(src)
    }
}

// One line, everything in order: kind, message, context pairs, cause.
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        for (key, value) in &self.context {
            write!(f, " [{key}={value}]")?;
        }
        if let Some(source) = &self.source {
            write!(f, ": caused by {source}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Error");
        out.field("kind", &self.kind);
        out.field("message", &self.message);
        if !self.context.is_empty() {
            out.field("context", &self.context);
        }
        if let Some(source) = &self.source {
            out.field("source", source);
        }
        out.finish()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.source {
            Some(source) => Some(source.as_ref()),
            None => None,
        }
    }
}
