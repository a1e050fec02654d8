use crate::domain::model::{
    add_secs, minutes_between, secs_to_minutes, BusOption, CommutePlan, CommuteQuery,
    DirectionsResult, DrivingOption, Recommendation, TrafficLevel, TransitDeparture,
    TransitResult,
};
use crate::utils::error::{PlanError, Result};
use chrono::Duration;

const LIGHT_TRAFFIC_RATIO: f64 = 1.10;
const MODERATE_TRAFFIC_RATIO: f64 = 1.35;

/// Merges both provider answers into a plan. Pure and deterministic.
pub fn assemble_plan(
    query: &CommuteQuery,
    directions: &DirectionsResult,
    transit: &TransitResult,
) -> Result<CommutePlan> {
    let driving = driving_option(query, directions)?;
    let bus = bus_option(query, transit)?;

    let recommendation = if bus.arrival <= driving.arrival {
        Recommendation::Bus
    } else {
        Recommendation::Drive
    };

    Ok(CommutePlan {
        origin: query.origin.clone(),
        destination: query.destination.clone(),
        requested_departure: query.departure,
        driving,
        bus,
        recommendation,
    })
}

pub fn traffic_level(duration_secs: Option<u64>, in_traffic_secs: Option<u64>) -> TrafficLevel {
    match (duration_secs, in_traffic_secs) {
        (Some(base), Some(traffic)) if base > 0 => {
            let ratio = traffic as f64 / base as f64;
            if ratio < LIGHT_TRAFFIC_RATIO {
                TrafficLevel::Light
            } else if ratio < MODERATE_TRAFFIC_RATIO {
                TrafficLevel::Moderate
            } else {
                TrafficLevel::Heavy
            }
        }
        _ => TrafficLevel::Unknown,
    }
}

fn driving_option(query: &CommuteQuery, directions: &DirectionsResult) -> Result<DrivingOption> {
    let secs = directions.best_duration_secs().ok_or_else(|| {
        PlanError::assembly("directions result has neither a duration nor a duration in traffic")
    })?;

    let out_of_range = || {
        PlanError::assembly(format!(
            "driving duration of {} seconds is out of range",
            secs
        ))
    };
    let duration_minutes = secs_to_minutes(secs).ok_or_else(out_of_range)?;
    let arrival = add_secs(query.departure, secs).ok_or_else(out_of_range)?;

    let traffic_delay_minutes = match (
        directions.duration_secs.and_then(secs_to_minutes),
        directions.duration_in_traffic_secs.and_then(secs_to_minutes),
    ) {
        (Some(base), Some(traffic)) => (traffic - base).max(0),
        _ => 0,
    };

    Ok(DrivingOption {
        summary: directions.summary.clone(),
        start_address: directions.start_address.clone(),
        end_address: directions.end_address.clone(),
        distance_meters: directions.distance_meters,
        duration_minutes,
        traffic_delay_minutes,
        traffic: traffic_level(directions.duration_secs, directions.duration_in_traffic_secs),
        departure: query.departure,
        arrival,
    })
}

fn next_departure<'a>(query: &CommuteQuery, transit: &'a TransitResult) -> Option<&'a TransitDeparture> {
    transit
        .departures
        .iter()
        .filter(|d| d.departure_time() >= query.departure)
        .min_by_key(|d| (d.departure_time(), d.aimed_departure))
}

fn bus_option(query: &CommuteQuery, transit: &TransitResult) -> Result<BusOption> {
    let departure = next_departure(query, transit).ok_or_else(|| {
        PlanError::assembly(format!(
            "no line {} departure from {} at or after {}",
            transit.line,
            transit.boarding_stop_name,
            query.departure.format("%H:%M")
        ))
    })?;

    let aimed_arrival = departure.aimed_arrival.ok_or_else(|| {
        PlanError::assembly(format!(
            "line {} departure at {} has no arrival time for {}",
            transit.line,
            departure.aimed_departure.format("%H:%M"),
            transit.alighting_stop_name
        ))
    })?;

    let ride_minutes = minutes_between(departure.aimed_departure, aimed_arrival);
    if ride_minutes <= 0 {
        return Err(PlanError::assembly(format!(
            "line {} departure at {} arrives before it leaves",
            transit.line,
            departure.aimed_departure.format("%H:%M")
        )));
    }

    let actual_departure = departure.departure_time();
    let delay_minutes = minutes_between(departure.aimed_departure, actual_departure);
    let arrival = aimed_arrival
        .checked_add_signed(Duration::minutes(delay_minutes))
        .ok_or_else(|| {
            PlanError::assembly(format!(
                "line {} arrival time is out of range",
                transit.line
            ))
        })?;

    Ok(BusOption {
        line: transit.line.clone(),
        operator: transit.operator.clone(),
        boarding_stop: transit.boarding_stop_name.clone(),
        alighting_stop: transit.alighting_stop_name.clone(),
        scheduled_departure: departure.aimed_departure,
        departure: actual_departure,
        delay_minutes,
        wait_minutes: minutes_between(query.departure, actual_departure),
        ride_minutes,
        arrival,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn query() -> CommuteQuery {
        CommuteQuery {
            origin: "Home".to_string(),
            destination: "Office".to_string(),
            departure: at(8, 0),
            leave_now: true,
        }
    }

    fn directions(duration: Option<u64>, in_traffic: Option<u64>) -> DirectionsResult {
        DirectionsResult {
            departure: at(8, 0),
            summary: Some("A40".to_string()),
            start_address: Some("Home".to_string()),
            end_address: Some("Office".to_string()),
            distance_meters: Some(12_400),
            distance_text: Some("12.4 km".to_string()),
            duration_secs: duration,
            duration_in_traffic_secs: in_traffic,
        }
    }

    fn departure(aimed: NaiveDateTime, expected: Option<NaiveDateTime>, arrival: Option<NaiveDateTime>) -> TransitDeparture {
        TransitDeparture {
            aimed_departure: aimed,
            expected_departure: expected,
            aimed_arrival: arrival,
        }
    }

    fn transit(departures: Vec<TransitDeparture>) -> TransitResult {
        TransitResult {
            line: "X90".to_string(),
            operator: None,
            boarding_stop_name: "Home Stop".to_string(),
            alighting_stop_name: "Office Stop".to_string(),
            departures,
        }
    }

    #[test]
    fn test_traffic_levels() {
        assert_eq!(traffic_level(Some(1000), Some(1050)), TrafficLevel::Light);
        assert_eq!(traffic_level(Some(1020), Some(1200)), TrafficLevel::Moderate);
        assert_eq!(traffic_level(Some(1000), Some(1400)), TrafficLevel::Heavy);
        assert_eq!(traffic_level(Some(1000), None), TrafficLevel::Unknown);
        assert_eq!(traffic_level(Some(0), Some(10)), TrafficLevel::Unknown);
    }

    #[test]
    fn test_plan_with_both_options() {
        let plan = assemble_plan(
            &query(),
            &directions(Some(1020), Some(1200)),
            &transit(vec![
                departure(at(7, 50), None, Some(at(8, 20))),
                departure(at(8, 5), None, Some(at(8, 40))),
                departure(at(8, 35), None, Some(at(9, 10))),
            ]),
        )
        .unwrap();

        assert_eq!(plan.driving.duration_minutes, 20);
        assert_eq!(plan.driving.traffic_delay_minutes, 3);
        assert_eq!(plan.driving.traffic, TrafficLevel::Moderate);
        assert_eq!(plan.driving.arrival, at(8, 20));

        assert_eq!(plan.bus.scheduled_departure, at(8, 5));
        assert_eq!(plan.bus.wait_minutes, 5);
        assert_eq!(plan.bus.ride_minutes, 35);
        assert_eq!(plan.bus.total_minutes(), 40);
        assert_eq!(plan.bus.arrival, at(8, 40));
        assert_eq!(plan.recommendation, Recommendation::Drive);
    }

    #[test]
    fn test_late_bus_shifts_arrival_and_ties_go_to_bus() {
        let plan = assemble_plan(
            &query(),
            &directions(Some(2400), Some(2700)),
            &transit(vec![departure(at(8, 0), Some(at(8, 5)), Some(at(8, 40)))]),
        )
        .unwrap();

        assert_eq!(plan.bus.delay_minutes, 5);
        assert_eq!(plan.bus.departure, at(8, 5));
        assert_eq!(plan.bus.arrival, at(8, 45));
        assert_eq!(plan.driving.arrival, at(8, 45));
        assert_eq!(plan.recommendation, Recommendation::Bus);
    }

    #[test]
    fn test_missing_duration_is_assembly_error() {
        let err = assemble_plan(
            &query(),
            &directions(None, None),
            &transit(vec![departure(at(8, 5), None, Some(at(8, 40)))]),
        )
        .unwrap_err();

        assert!(matches!(err, PlanError::AssemblyError { .. }));
    }

    #[test]
    fn test_oversized_driving_duration_is_assembly_error() {
        let bus = transit(vec![departure(at(8, 5), None, Some(at(8, 40)))]);

        let err = assemble_plan(&query(), &directions(Some(1_000_000_000_000_000), None), &bus)
            .unwrap_err();
        assert!(matches!(err, PlanError::AssemblyError { .. }));
        assert!(err.to_string().contains("out of range"));

        let err = assemble_plan(&query(), &directions(Some(900), Some(u64::MAX)), &bus).unwrap_err();
        assert!(matches!(err, PlanError::AssemblyError { .. }));
    }

    #[test]
    fn test_free_flow_duration_is_used_without_traffic() {
        let plan = assemble_plan(
            &query(),
            &directions(Some(900), None),
            &transit(vec![departure(at(8, 5), None, Some(at(8, 40)))]),
        )
        .unwrap();

        assert_eq!(plan.driving.duration_minutes, 15);
        assert_eq!(plan.driving.traffic, TrafficLevel::Unknown);
        assert_eq!(plan.driving.traffic_delay_minutes, 0);
    }

    #[test]
    fn test_no_upcoming_departure_is_assembly_error() {
        let err = assemble_plan(
            &query(),
            &directions(Some(900), Some(900)),
            &transit(vec![departure(at(7, 30), None, Some(at(8, 5)))]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("no line X90 departure"));

        let err = assemble_plan(&query(), &directions(Some(900), None), &transit(vec![])).unwrap_err();
        assert!(matches!(err, PlanError::AssemblyError { .. }));
    }

    #[test]
    fn test_departure_without_arrival_is_assembly_error() {
        let err = assemble_plan(
            &query(),
            &directions(Some(900), None),
            &transit(vec![departure(at(8, 10), None, None)]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("has no arrival time"));

        let err = assemble_plan(
            &query(),
            &directions(Some(900), None),
            &transit(vec![departure(at(8, 10), None, Some(at(8, 10)))]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("arrives before it leaves"));
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let q = query();
        let d = directions(Some(1020), Some(1200));
        let t = transit(vec![
            departure(at(8, 20), None, Some(at(8, 55))),
            departure(at(8, 5), Some(at(8, 7)), Some(at(8, 40))),
        ]);

        let first = assemble_plan(&q, &d, &t).unwrap();
        for _ in 0..10 {
            assert_eq!(assemble_plan(&q, &d, &t).unwrap(), first);
        }
        assert_eq!(first.bus.departure, at(8, 7));
    }
}
