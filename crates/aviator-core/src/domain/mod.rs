//! Domain entities for Aviator Desk.
//!
//! Pure business rules with no infrastructure dependencies:
//!
//! - **`apps`** – Application records returned by `fcli ... --output json`
//!   for both backends, plus the search filter used by the front end.
//! - **`mapping`** – Selection sets and the rule for turning two selections
//!   into `SSC version -> Aviator app` mappings.

pub mod apps;
pub mod mapping;
