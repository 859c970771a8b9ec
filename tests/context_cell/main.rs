//! ContextLocalCell Test Suite
//!
//! Verifies the public get/set contract:
//!
//! 1. Isolation between concurrent contexts
//! 2. Persistence and lazy initialization within a context
//! 3. Inheritance on fork without merge back (async and threads)
//! 4. No panics when storage is torn down under an access
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test context_cell
//!
//! # Teardown tests only
//! cargo test --test context_cell teardown::
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ctxcell::ContextLocalCell;

pub mod teardown;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Install a fmt subscriber that writes through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Cell whose factory counts its invocations
pub fn counting_cell(start: usize) -> (Arc<ContextLocalCell<usize>>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let cell = ContextLocalCell::with_initial(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        start
    });
    (Arc::new(cell), calls)
}
