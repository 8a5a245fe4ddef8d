//! Application layer orchestrating the remote billing collaborators.
//!
//! `PaymentMethodCoordinator` runs card provisioning attempts and
//! `SubscriptionManager` drives cancellation. Both keep a per-account
//! in-flight guard so a second submission for the same account is rejected
//! instead of issuing duplicate remote calls.

pub mod guard;
pub mod lifecycle;
pub mod provisioning;
