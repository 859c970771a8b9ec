//! Convenient imports for ctxcell.
//!
//! ```
//! use ctxcell::prelude::*;
//!
//! let cell = ContextLocalCell::with_initial(|| 1u32);
//! assert_eq!(cell.get(), 1);
//! ```

// Main entry point
pub use crate::cell::{CellBuilder, ContextLocalCell};

// Context helpers
pub use crate::context::{fork, isolate, ContextSnapshot};

// Identity
pub use crate::key::ContextKey;
