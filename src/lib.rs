//! # ctxcell
//!
//! Context-local storage cells.
//!
//! A [`ContextLocalCell`] holds one value per logical execution context: a
//! thread, or an async task chain entered through the [`context`] helpers.
//! Reads and writes never fail, even when racing with thread teardown.
//!
//! ## Quick Start
//!
//! ```
//! use ctxcell::ContextLocalCell;
//!
//! let cell = ContextLocalCell::with_initial(|| "init".to_string());
//! assert_eq!(cell.get(), "init");
//!
//! cell.set("A".to_string());
//! assert_eq!(cell.get(), "A");
//! ```
//!
//! ## Async Contexts
//!
//! ```
//! use ctxcell::{context, ContextLocalCell};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cell = Arc::new(ContextLocalCell::<u32>::new());
//!
//! context::isolate({
//!     let cell = Arc::clone(&cell);
//!     async move {
//!         cell.set(1);
//!
//!         let child = Arc::clone(&cell);
//!         let seen = context::spawn(async move {
//!             let inherited = child.get();
//!             child.set(2);
//!             inherited
//!         })
//!         .await
//!         .unwrap();
//!
//!         assert_eq!(seen, 1);
//!         assert_eq!(cell.get(), 1);
//!     }
//! })
//! .await;
//! # }
//! ```
//!
//! ## Storage Strategies
//!
//! - Default: context keys propagate through async forks; values live in a
//!   shared concurrent map.
//! - `thread-affine` feature: values live in native thread-local storage and
//!   every OS thread is its own context.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cell;
mod error;
mod guard;
mod key;
mod storage;

pub mod context;
pub mod prelude;

// Re-export main entry points
pub use cell::{CellBuilder, ContextLocalCell};
pub use key::ContextKey;
