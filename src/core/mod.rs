pub mod assembler;
pub mod planner;
pub mod presenter;
pub mod timetable;

pub use crate::domain::model::{CommutePlan, CommuteQuery, DirectionsResult, TransitResult};
pub use crate::domain::ports::{CredentialSource, DirectionsProvider, TransitProvider};
pub use crate::utils::error::Result;
