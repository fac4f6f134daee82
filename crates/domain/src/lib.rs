//! Document lifecycle layer.
//!
//! This crate owns everything that happens when an order-like document is
//! created or changed:
//! - reference formatting ([`reference`]) and allocation from durable
//!   counters ([`ReferenceAllocator`])
//! - the lifecycle controller ([`DocumentService`]): creation, saves, status
//!   transitions with history, fulfillment steps, line management
//! - the entity directory seam used for accounting prefixes, backed by memory
//!   or by the `entities` table

pub mod document;
pub mod entity;
pub mod error;
pub mod policy;
pub mod reference;
pub mod sequencing;

pub use document::{
    AddLine, CreateDocument, DocumentService, EditLine, ParentLink, RecordFulfillment,
    ReorderLine, TransitionStatus, UpdateLineQuantity,
};
pub use entity::{
    EntityDirectory, EntityLookupError, InMemoryEntityDirectory, PostgresEntityDirectory,
};
pub use error::{DomainError, Result};
pub use policy::{LifecycleConfig, TransitionPolicy};
pub use reference::{ReferenceFormat, ReferenceRule, parse_sequence, prefix_for};
pub use sequencing::{AssignedReference, ReferenceAllocator};
