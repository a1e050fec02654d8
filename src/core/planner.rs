use crate::core::assembler::assemble_plan;
use crate::domain::model::{CommutePlan, CommuteQuery, TransitRequest};
use crate::domain::ports::{DirectionsProvider, TransitProvider};
use crate::utils::error::Result;

/// Runs one planning pass: directions, then transit, then assembly.
/// The first failing step ends the run.
pub struct CommutePlanner<D: DirectionsProvider, T: TransitProvider> {
    directions: D,
    transit: T,
}

impl<D: DirectionsProvider, T: TransitProvider> CommutePlanner<D, T> {
    pub fn new(directions: D, transit: T) -> Self {
        Self {
            directions,
            transit,
        }
    }

    pub async fn plan(&self, query: &CommuteQuery, transit_request: &TransitRequest) -> Result<CommutePlan> {
        tracing::info!(
            "Planning commute from '{}' to '{}' at {}",
            query.origin,
            query.destination,
            query.departure.format("%H:%M")
        );

        tracing::info!("Fetching driving directions from {}", self.directions.name());
        let directions = self.directions.directions(query).await?;

        tracing::info!(
            "Fetching line {} departures from {}",
            transit_request.line,
            self.transit.name()
        );
        let transit = self.transit.departures(transit_request).await?;
        tracing::debug!("{} candidate departures", transit.departures.len());

        let plan = assemble_plan(query, &directions, &transit)?;
        tracing::info!(
            "Plan ready: drive {} min, bus {} min, recommending {:?}",
            plan.driving.duration_minutes,
            plan.bus.total_minutes(),
            plan.recommendation
        );

        Ok(plan)
    }
}
