//! Clubdues - membership dues lifecycle for service clubs
//!
//! Clubdues is built on top of Axum and Tokio and models the dues
//! subsystem of a club membership portal: dues cycles with per-type
//! pricing, per-member payment records, hosted checkout, and the
//! offline payment approval workflow.
//!
//! # Features
//!
//! - **Cycles**: named dues periods with pricing, grace periods, and a
//!   single active cycle enforced atomically
//! - **Records**: one versioned record per (member, cycle), transitioned
//!   through `UNPAID`, `PAID`, `PAID_OFFLINE`, and `WAIVED`
//! - **Checkout**: hosted checkout initiation with idempotent settlement
//! - **Approvals**: treasurer/president workflow for offline payments,
//!   waivers, and resets, with an audit log of every transition
//! - **Reporting**: manage view with per-member entries and aggregate stats
//! - **Testing**: fluent in-process HTTP testing utilities
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use clubdues::routes::{router, DuesContext};
//!
//! #[tokio::main]
//! async fn main() {
//!     clubdues::init_tracing();
//!
//!     let ctx = DuesContext::new(my_dues_store, my_member_directory)
//!         .with_checkout(my_checkout_client, my_checkout_config);
//!     let app = router(ctx);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

pub mod approval;
pub mod audit;
pub mod checkout;
pub mod cycles;
mod error;
pub mod members;
pub mod payment;
pub mod records;
pub mod roles;
pub mod routes;
pub mod settings;
pub mod storage;
pub mod summary;
pub mod testing;
mod utils;

// Re-exports for public API
pub use approval::{ApprovalManager, ApproveOfflineRequest};
pub use audit::{DuesAuditEvent, DuesAuditLogger, NoOpAuditLogger, TracingAuditLogger};
pub use checkout::{CheckoutClient, CheckoutConfig, CheckoutSession};
pub use cycles::{CreateCycleRequest, CycleManager, DuesCycle, UpdateCycleRequest};
pub use error::{ApiError, DuesError, Result};
pub use members::{MemberDirectory, MemberProfile, MembershipType};
pub use payment::{MyDuesView, PaymentManager, PaymentOutcome};
pub use records::{DuesStatus, MemberDuesRecord, PaymentMethod};
pub use roles::{Actor, ClubRole, DuesPermissions};
pub use routes::{router, DuesContext};
pub use settings::{PaymentSettings, SettingsManager};
pub use storage::DuesStore;
pub use summary::{DuesStats, ManageView, SummaryManager};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, typically in main().
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "clubdues=debug")
/// - `CLUBDUES_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("CLUBDUES_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
