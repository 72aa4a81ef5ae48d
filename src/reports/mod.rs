// Reports module - Yield arithmetic, scenarios and income projections

pub mod projection;
pub mod scenario;
pub mod yields;

pub use projection::{compute_projection, MonthlyReturn, ProjectionResult};
pub use scenario::{Scenario, ScenarioPreset};
pub use yields::{annualized_yield, with_yields, yield_percent};
