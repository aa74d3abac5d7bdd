//! Token-budget planning and manuscript measurement for thinking-enabled
//! LLM drafting tools.

pub mod budget;
pub mod config;
pub mod error;
pub mod report;
pub mod text;

pub use budget::{BudgetRequest, BudgetResult, ModelLimits, TokenBudgetPlanner};
pub use error::{Result, ToolkitError};
