//! Domain types for billing accounts, subscriptions and card provisioning,
//! plus the ports the application layer talks to remote collaborators through.

pub mod account;
pub mod attempt;
pub mod billing_details;
pub mod display;
pub mod events;
pub mod payment_method;
pub mod ports;
pub mod subscription;
