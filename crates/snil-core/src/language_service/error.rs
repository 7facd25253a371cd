// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Errors raised by the language service itself.
//!
//! **DDD Context:** Language Service
//!
//! Malformed SNIL never produces one of these; it produces diagnostics.
//! [`EditError`] rejects an edit the buffer cannot apply, and
//! [`InternalError`] reports a snapshot that failed its consistency checks.

use crate::graph::NodeId;

/// An edit that does not fit the current buffer text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("edit range {start}..{end} is outside the document (length {len})")]
    OutOfBounds { start: u32, end: u32, len: u32 },

    #[error("edit range {start}..{end} is inverted")]
    Inverted { start: u32, end: u32 },

    #[error("edit offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: u32 },

    #[error("document text would exceed 4 GiB")]
    TooLarge,
}

/// A snapshot failed validation and was not published.
///
/// These never appear in the user-facing diagnostic list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InternalError {
    #[error("syntax tree covers {tree} bytes but the text has {text}")]
    TreeLengthMismatch { tree: u32, text: u32 },

    #[error("graph edge {source_node} -> {target} references a missing node")]
    DanglingEdge { source_node: NodeId, target: NodeId },

    #[error("graph node identifier {0} is not unique")]
    DuplicateNodeId(NodeId),

    #[error("analysis worker stopped")]
    WorkerStopped,
}
