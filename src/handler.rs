// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operation handler contract shared by both resource kinds.
//!
//! The external watch machinery delivers one event at a time per resource
//! kind and invokes the matching method below. Each method returns once the
//! reconciliation step completes, whether it succeeded or the failure was
//! handled. Handlers never retry internally; recovery comes from the next
//! delivered event or the next drift-sweep pass.

use anyhow::Result;
use async_trait::async_trait;

/// Tri-state result of a reconciliation step.
///
/// Distinguishing "nothing needed doing" from "done" from "failed but
/// repairable" lets the drift sweep and any future retry policy consume the
/// outcome instead of parsing log lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Live state was changed to match the resource.
    Applied,
    /// Live state already matched the resource; nothing was done.
    AlreadySatisfied,
    /// The step failed in a way a later event or sweep pass may repair.
    /// The handler has already logged the cause.
    FailedNeedsRetry,
}

/// Event-driven reconciliation entry points for one resource kind.
///
/// Implemented once per kind ([`InstanceHandler`](crate::reconcilers::InstanceHandler),
/// [`DatabaseHandler`](crate::reconcilers::DatabaseHandler)). The cluster
/// client handle lives inside the implementing handler; the dispatcher only
/// supplies the resource the event is about.
///
/// Every entry point acquires its kind's [`Store`](crate::state::Store) lock
/// for its full duration, including the blocking cluster and SQL calls it
/// performs.
///
/// # Errors
///
/// A returned error is a configuration error fatal to that single operation
/// (missing secret, unresolvable instance, failed rename). It is never
/// retried automatically.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    /// Resource kind this handler reconciles.
    type Resource: Send + 'static;

    /// A resource of this kind was added (or replayed by the initial listing).
    async fn on_added(&self, resource: Self::Resource) -> Result<Outcome>;

    /// A tracked resource of this kind was updated.
    async fn on_updated(&self, resource: Self::Resource) -> Result<Outcome>;

    /// A resource of this kind was deleted.
    async fn on_deleted(&self, resource: Self::Resource) -> Result<Outcome>;

    /// A watch bookmark was delivered for this kind. Logged only.
    async fn on_bookmarked(&self, resource: Self::Resource) -> Result<()>;

    /// The watch machinery reported an error for this resource. Logged only.
    async fn on_error(&self, resource: Self::Resource) -> Result<()>;

    /// Walk the tracked set and repair divergence between tracked resources
    /// and live state.
    async fn check_current_state(&self) -> Result<()>;
}
