//! Unit-of-work trees and root transactions.
//!
//! A [`UnitOfWork`] declares the [`ResourceKind`] it needs. Units are
//! attached into a tree under a [`RootTransaction`], which acquires one
//! [`ResourceContext`] from its [`TransactionProvider`] and runs the whole
//! tree inside it: all units commit together, or every unit that ran is
//! compensated and the context rolled back.

mod output;
mod provider;
mod resource;
mod root;
mod unit;

pub use output::Output;
pub use provider::{begin, DetachedProvider, ProviderRegistry, TransactionProvider};
pub use resource::{DetachedContext, ResourceContext, ResourceKind, TypedContext};
pub use root::RootTransaction;
pub use unit::{TypedWork, UnitOfWork, UnitState, Work};
