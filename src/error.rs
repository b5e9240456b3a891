//! Frame graph error types.

use thiserror::Error;

use crate::graph::{PassId, ResourceHandle};
use crate::types::ResourceKind;

/// Errors that abort a declaration, a compile, or a whole frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A resource descriptor has zero or unsupported dimensions/format.
    #[error("invalid descriptor for resource '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },

    /// The frame's declaration scope has closed (the frame was compiled).
    #[error("declaration scope is closed; the frame has already been compiled")]
    DeclarationClosed,

    /// A handle that was not issued by this frame's registry.
    #[error("unknown resource handle {0:?}")]
    UnknownResource(ResourceHandle),

    /// A texture intent was recorded against a buffer, or vice versa.
    #[error("resource '{name}' is a {actual:?}, but a {expected:?} access was declared")]
    ResourceKindMismatch {
        name: String,
        expected: ResourceKind,
        actual: ResourceKind,
    },

    /// A pass id that does not belong to this frame.
    #[error("unknown pass {0:?}")]
    UnknownPass(PassId),

    /// A plan executed against a frame it was not compiled from.
    #[error("execution plan covers {planned} passes but the frame declares {declared}")]
    PlanMismatch { planned: usize, declared: usize },

    /// An explicit dependency from a pass onto itself.
    #[error("pass {0:?} cannot depend on itself")]
    SelfDependency(PassId),

    /// Two pass recipes registered under the same name.
    #[error("pass '{0}' is already registered")]
    DuplicatePass(String),

    /// The dependency graph contains a cycle.
    #[error("frame graph contains a cycle between passes: {}", passes.join(", "))]
    GraphCycle { passes: Vec<String> },

    /// Two passes write the same resource with no ordering between them.
    #[error("passes '{first}' and '{second}' both write '{resource}' without an ordering constraint")]
    UnorderedWrites {
        resource: String,
        first: String,
        second: String,
    },

    /// A pass reads a transient resource that no earlier pass writes.
    #[error("pass '{pass}' reads transient resource '{resource}' before anything writes it")]
    UninitializedRead { resource: String, pass: String },

    /// The transient pool cannot satisfy an allocation request.
    #[error("cannot allocate transient resource '{resource}': {reason}")]
    AllocationExhausted { resource: String, reason: String },
}

impl GraphError {
    /// Returns true for structural errors detected while compiling a frame.
    ///
    /// Structural errors mean the declared frame itself is ill-formed; the
    /// caller should drop the frame rather than retry it.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::GraphCycle { .. } | Self::UnorderedWrites { .. } | Self::UninitializedRead { .. }
        )
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Recoverable, per-pass failures reported by execution callbacks.
///
/// The scheduler logs these, marks the pass as skipped, and keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PassError {
    /// A required payload field was absent (e.g. no material bound).
    #[error("missing payload: {0}")]
    MissingPayload(String),
    /// The callback decided not to run for some other reason.
    #[error("skipped: {0}")]
    Skipped(String),
}
