//! Disruption scenarios
//!
//! Builds a ladder of progressively damaged copies of one completed run:
//!
//! 1. [`make_disruption_scenarios`] copies the baseline into
//!    `<base>_<TYPE>_disrupt/disruptNN` for every step, dropping stale
//!    `Reports/` and `Maps/`.
//! 2. [`disrupt_network`] ranks edges by `sum_BC` or `volume`, and in step `k`
//!    sets the route cost of the top `k` edges to a sentinel, then renames the
//!    scenario in its `scenario.xml`.
//!
//! Step `k` always disables a superset of step `k - 1`.

pub mod error;
pub mod importance;
pub mod inject;
pub mod layout;
pub mod metadata;
pub mod replicate;
pub mod store;

pub use error::ScenarioError;
pub use importance::{
    disruption_order, edges_for_step, load_importance, read_importance_csv, EdgeImportance,
    SortOrder,
};
pub use inject::{disrupt_network, InjectOptions, RetryPolicy, StepDisruption};
pub use layout::{step_label, step_name, DisruptionType, ScenarioLayout};
pub use metadata::{rename_scenario, ScenarioDocument, DEFAULT_SCHEMA_NAMESPACE};
pub use replicate::{make_disruption_scenarios, ReplicationSummary};
pub use store::{EdgeCostStore, DEFAULT_BUSY_TIMEOUT, DEFAULT_SENTINEL_COST};
