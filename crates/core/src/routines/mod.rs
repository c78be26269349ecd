//! Administrative routines.
//!
//! Each service wraps a shared [`Connection`](crate::Connection) and runs one short sequence of
//! dependent store and identity calls. Steps run strictly in order; a later step never starts
//! unless every earlier step succeeded.

pub mod billing;
pub mod diagnostics;
pub mod seeding;
pub mod users;

pub use billing::BillingService;
pub use diagnostics::{CollectionCount, DiagnosticsService};
pub use seeding::{CounterSeed, SeedingService};
pub use users::{DeletedUser, NewUser, UserService, UserState};
