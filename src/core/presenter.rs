use crate::core::timetable::{StopStatus, TimetableReport};
use crate::domain::model::{
    secs_to_minutes, CommutePlan, DirectionsResult, Recommendation, TrafficLevel,
};
use crate::utils::error::{PlanError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

const REPORT_HEADERS: [&str; 4] = ["Stop", "Timetable", "Extra Traffic (min)", "Predicted Arrival"];

pub fn render_plan(plan: &CommutePlan, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_plan_text(plan)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(plan)?),
        OutputFormat::Csv => Err(PlanError::InvalidConfigValueError {
            field: "format".to_string(),
            value: "csv".to_string(),
            reason: "csv output is only available for timetable analysis".to_string(),
        }),
    }
}

pub fn render_plan_text(plan: &CommutePlan) -> String {
    let driving = &plan.driving;
    let bus = &plan.bus;
    let mut lines = vec![
        format!("Commute plan: {} -> {}", plan.origin, plan.destination),
        format!(
            "Leaving: {}",
            plan.requested_departure.format("%a %d %b %Y, %H:%M")
        ),
        String::new(),
    ];

    let traffic = match driving.traffic {
        TrafficLevel::Unknown => "traffic unknown".to_string(),
        level if driving.traffic_delay_minutes > 0 => {
            format!("{} traffic, +{} min", level, driving.traffic_delay_minutes)
        }
        level => format!("{} traffic", level),
    };
    lines.push(format!(
        "Drive:   {} min ({}), arrive {}",
        driving.duration_minutes,
        traffic,
        driving.arrival.format("%H:%M")
    ));

    let mut route = Vec::new();
    if let Some(summary) = &driving.summary {
        route.push(format!("via {}", summary));
    }
    if let Some(meters) = driving.distance_meters {
        route.push(format!("{:.1} km", meters as f64 / 1000.0));
    }
    if !route.is_empty() {
        lines.push(format!("         {}", route.join(", ")));
    }

    lines.push(format!(
        "Bus {}: {} min ({} min wait + {} min ride), arrive {}",
        bus.line,
        bus.total_minutes(),
        bus.wait_minutes,
        bus.ride_minutes,
        bus.arrival.format("%H:%M")
    ));

    let mut departs = format!(
        "departs {} from {} to {}",
        bus.departure.format("%H:%M"),
        bus.boarding_stop,
        bus.alighting_stop
    );
    if bus.delay_minutes > 0 {
        departs.push_str(&format!(
            ", running {} min late (timetabled {})",
            bus.delay_minutes,
            bus.scheduled_departure.format("%H:%M")
        ));
    }
    if let Some(operator) = &bus.operator {
        departs.push_str(&format!(", operated by {}", operator));
    }
    lines.push(format!("         {}", departs));
    lines.push(String::new());

    let margin = (driving.arrival - bus.arrival).num_minutes().abs();
    let recommendation = match (plan.recommendation, margin) {
        (Recommendation::Bus, 0) => "Recommended: bus (same arrival time as driving)".to_string(),
        (Recommendation::Bus, m) => format!("Recommended: bus (arrives {} min earlier)", m),
        (Recommendation::Drive, m) => format!("Recommended: drive (arrives {} min earlier)", m),
    };
    lines.push(recommendation);

    lines.join("\n")
}

/// Plain listing of a single directions lookup.
pub fn render_directions(result: &DirectionsResult) -> String {
    let mut lines = vec!["Route found!".to_string()];
    if let Some(summary) = &result.summary {
        lines.push(format!("Via: {}", summary));
    }
    match (&result.distance_text, result.distance_meters) {
        (Some(text), _) => lines.push(format!("Distance: {}", text)),
        (None, Some(meters)) => lines.push(format!("Distance: {:.1} km", meters as f64 / 1000.0)),
        (None, None) => {}
    }
    if let Some(minutes) = result.duration_secs.and_then(secs_to_minutes) {
        lines.push(format!("Duration: {} min", minutes));
    }
    if let Some(minutes) = result.duration_in_traffic_secs.and_then(secs_to_minutes) {
        lines.push(format!("Duration in traffic: {} min", minutes));
    }
    if let Some(address) = &result.start_address {
        lines.push(format!("Start address: {}", address));
    }
    if let Some(address) = &result.end_address {
        lines.push(format!("End address: {}", address));
    }
    lines.join("\n")
}

pub fn render_report(report: &TimetableReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_report_text(report)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => render_report_csv(report),
    }
}

fn report_cells(report: &TimetableReport) -> Vec<[String; 4]> {
    report
        .stops
        .iter()
        .map(|row| {
            let dash = || "-".to_string();
            match row.status {
                StopStatus::NotStopping => [row.stop.clone(), dash(), dash(), dash()],
                StopStatus::Failed => [
                    row.stop.clone(),
                    row.scheduled.clone().unwrap_or_else(dash),
                    "failed".to_string(),
                    dash(),
                ],
                StopStatus::Origin | StopStatus::Served => [
                    row.stop.clone(),
                    row.scheduled.clone().unwrap_or_else(dash),
                    row.extra_traffic_minutes
                        .map(|m| format!("{:.1}", m))
                        .unwrap_or_else(dash),
                    row.predicted_arrival.clone().unwrap_or_else(dash),
                ],
            }
        })
        .collect()
}

pub fn render_report_text(report: &TimetableReport) -> String {
    let cells = report_cells(report);
    let mut widths = REPORT_HEADERS.map(|h| h.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let border = |fill: char| {
        let parts: Vec<String> = widths
            .iter()
            .map(|w| fill.to_string().repeat(w + 2))
            .collect();
        format!("+{}+", parts.join("+"))
    };
    let line = |values: &[String]| {
        let parts: Vec<String> = values
            .iter()
            .zip(widths.iter())
            .map(|(v, w)| format!(" {:<width$} ", v, width = *w))
            .collect();
        format!("|{}|", parts.join("|"))
    };

    let mut lines = Vec::new();
    if let Some(name) = &report.line {
        lines.push(format!("Line {} timetable analysis", name));
    }
    lines.push(border('-'));
    lines.push(line(&REPORT_HEADERS.map(String::from)));
    lines.push(border('='));
    for row in &cells {
        lines.push(line(row));
        lines.push(border('-'));
    }

    lines.push(String::new());
    lines.push("Summary:".to_string());
    lines.push(format!(
        "Total extra traffic delay: {:.1} minutes",
        report.summary.total_extra_traffic_minutes
    ));
    lines.push(format!(
        "Maximum delay at single stop: {:.1} minutes",
        report.summary.max_extra_traffic_minutes
    ));
    if let Some(journey) = &report.summary.journey {
        lines.push(format!("Journey: {}", journey));
    }

    let failed: Vec<&str> = report
        .stops
        .iter()
        .filter(|s| s.status == StopStatus::Failed)
        .map(|s| s.stop.as_str())
        .collect();
    if !failed.is_empty() {
        lines.push(format!("Skipped after provider errors: {}", failed.join(", ")));
    }

    lines.join("\n")
}

pub fn render_report_csv(report: &TimetableReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(REPORT_HEADERS.iter().chain(std::iter::once(&"Status")))?;

    for (cells, row) in report_cells(report).iter().zip(report.stops.iter()) {
        let status = match row.status {
            StopStatus::Origin => "origin",
            StopStatus::Served => "served",
            StopStatus::NotStopping => "not_stopping",
            StopStatus::Failed => "failed",
        };
        writer.write_record(cells.iter().map(String::as_str).chain(std::iter::once(status)))?;
    }

    let bytes = writer.into_inner().map_err(|e| PlanError::IoError(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| PlanError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timetable::{summarize, StopPrediction};
    use crate::domain::model::{BusOption, DrivingOption};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn plan() -> CommutePlan {
        CommutePlan {
            origin: "Home".to_string(),
            destination: "Office".to_string(),
            requested_departure: at(8, 0),
            driving: DrivingOption {
                summary: Some("A40".to_string()),
                start_address: None,
                end_address: None,
                distance_meters: Some(12_400),
                duration_minutes: 20,
                traffic_delay_minutes: 3,
                traffic: TrafficLevel::Moderate,
                departure: at(8, 0),
                arrival: at(8, 20),
            },
            bus: BusOption {
                line: "X90".to_string(),
                operator: Some("Oxford Bus Company".to_string()),
                boarding_stop: "Home Stop".to_string(),
                alighting_stop: "Office Stop".to_string(),
                scheduled_departure: at(8, 5),
                departure: at(8, 5),
                delay_minutes: 0,
                wait_minutes: 5,
                ride_minutes: 35,
                arrival: at(8, 40),
            },
            recommendation: Recommendation::Drive,
        }
    }

    fn report() -> TimetableReport {
        let stops = vec![
            StopPrediction {
                stop: "Oxford Gloucester Green".to_string(),
                scheduled: Some("07:00".to_string()),
                status: StopStatus::Origin,
                extra_traffic_minutes: Some(0.0),
                predicted_arrival: Some("07:00".to_string()),
                error: None,
            },
            StopPrediction {
                stop: "White City".to_string(),
                scheduled: None,
                status: StopStatus::NotStopping,
                extra_traffic_minutes: None,
                predicted_arrival: None,
                error: None,
            },
            StopPrediction {
                stop: "Marble Arch, Park Lane".to_string(),
                scheduled: Some("09:29".to_string()),
                status: StopStatus::Served,
                extra_traffic_minutes: Some(6.5),
                predicted_arrival: Some("09:35".to_string()),
                error: None,
            },
        ];
        let summary = summarize(&stops);
        TimetableReport {
            line: Some("X90".to_string()),
            stops,
            summary,
        }
    }

    #[test]
    fn test_plan_text_names_both_options() {
        let text = render_plan_text(&plan());

        assert!(text.contains("Commute plan: Home -> Office"));
        assert!(text.contains("Drive:   20 min (moderate traffic, +3 min), arrive 08:20"));
        assert!(text.contains("via A40, 12.4 km"));
        assert!(text.contains("Bus X90: 40 min (5 min wait + 35 min ride), arrive 08:40"));
        assert!(text.contains("operated by Oxford Bus Company"));
        assert!(text.contains("Recommended: drive (arrives 20 min earlier)"));
    }

    #[test]
    fn test_plan_json_and_csv_rejection() {
        let json = render_plan(&plan(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["recommendation"], "drive");
        assert_eq!(value["driving"]["traffic"], "moderate");
        assert_eq!(value["bus"]["ride_minutes"], 35);

        assert!(render_plan(&plan(), OutputFormat::Csv).is_err());
    }

    #[test]
    fn test_report_grid_table() {
        let text = render_report_text(&report());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Line X90 timetable analysis");
        assert!(lines[1].starts_with("+---"));
        assert!(lines[2].contains("| Stop "));
        assert!(lines[3].starts_with("+==="));
        assert!(text.contains("| White City              | -         | -                   | -                 |"));
        assert!(text.contains("Total extra traffic delay: 6.5 minutes"));
        assert!(text.contains("Journey: 07:00 -> 09:35"));

        let widths: Vec<usize> = lines[1..8].iter().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_report_csv() {
        let csv = render_report(&report(), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "Stop,Timetable,Extra Traffic (min),Predicted Arrival,Status"
        );
        assert_eq!(lines[1], "Oxford Gloucester Green,07:00,0.0,07:00,origin");
        assert_eq!(lines[2], "White City,-,-,-,not_stopping");
        assert_eq!(lines[3], "\"Marble Arch, Park Lane\",09:29,6.5,09:35,served");
    }

    #[test]
    fn test_render_directions() {
        let text = render_directions(&DirectionsResult {
            departure: at(8, 0),
            summary: None,
            start_address: Some("Victoria Coach Station".to_string()),
            end_address: Some("Marylebone Town Hall".to_string()),
            distance_meters: Some(4800),
            distance_text: Some("4.8 km".to_string()),
            duration_secs: Some(1020),
            duration_in_traffic_secs: None,
        });

        assert!(text.contains("Distance: 4.8 km"));
        assert!(text.contains("Duration: 17 min"));
        assert!(!text.contains("Duration in traffic"));
        assert!(text.contains("End address: Marylebone Town Hall"));
    }
}
