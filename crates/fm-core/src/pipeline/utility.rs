//! Utility (boiler/chiller) pipeline.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::info;

use fm_common::{Error, Result};
use fm_config::{ConfigSnapshot, UtilityDatasetConfig};
use fm_dataset::{ColumnData, Columns};

use crate::aggregate::{Aggregation, GroupBy, GroupKey, KeyValue, Predicate};
use crate::chart::{Chart, ChartKind, ChartReduction, ChartSpec};
use crate::generate::generate_utility;
use crate::generate::utility::{
    BOILER_LOAD, CHILLER_LOAD, DATE, ENERGY_COST, PRODUCT_LINE, SHIFT, STATUS,
};
use crate::generate::UtilityRecord;
use crate::inject::{inject_anomalies, AnomalyKind};
use crate::render::Renderer;
use crate::rng::seeded_rng;

use super::{
    export_path, export_records, render_all, schema_version, PipelineKind, RunContext, RunOptions,
    RunReport, SeedInfo,
};

const TOTAL_COST: &str = "Total_Energy_Cost";
const AVG_COST: &str = "Avg_Energy_Cost";
const AVG_BOILER: &str = "Avg_Boiler_Load";
const AVG_CHILLER: &str = "Avg_Chiller_Load";
const WASTE_EVENTS: &str = "Waste_Events";

/// Per-day totals, rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_energy_cost: f64,
    pub avg_energy_cost: f64,
    pub avg_boiler_load: f64,
    pub avg_chiller_load: f64,
    pub waste_events: u64,
}

fn waste_predicate() -> Predicate {
    Predicate::one_of(STATUS, &AnomalyKind::waste_statuses())
}

pub fn daily_summary(rows: &[UtilityRecord]) -> Result<Vec<DailySummary>> {
    let table = GroupBy::new()
        .date_key(DATE)
        .agg(Aggregation::sum(ENERGY_COST).alias(TOTAL_COST))
        .agg(Aggregation::mean(ENERGY_COST).alias(AVG_COST))
        .agg(Aggregation::mean(BOILER_LOAD).alias(AVG_BOILER))
        .agg(Aggregation::mean(CHILLER_LOAD).alias(AVG_CHILLER))
        .agg(Aggregation::count_where(WASTE_EVENTS, waste_predicate()))
        .round(2)
        .run(rows)?;

    table
        .rows
        .iter()
        .map(|row| {
            let KeyValue::Date(date) = row.keys[0] else {
                return Err(Error::Aggregation(format!(
                    "daily summary key {} is not a date",
                    row.keys[0]
                )));
            };
            Ok(DailySummary {
                date,
                total_energy_cost: row.values[0],
                avg_energy_cost: row.values[1],
                avg_boiler_load: row.values[2],
                avg_chiller_load: row.values[3],
                waste_events: row.values[4] as u64,
            })
        })
        .collect()
}

/// Daily summary as a table for display.
pub fn daily_summary_columns(days: &[DailySummary]) -> Result<Columns> {
    let floats = |f: fn(&DailySummary) -> f64| ColumnData::Float(days.iter().map(f).collect());
    let mut out = Columns::new();
    out.push(DATE, ColumnData::Date(days.iter().map(|d| d.date).collect()))?;
    out.push(TOTAL_COST, floats(|d| d.total_energy_cost))?;
    out.push(AVG_COST, floats(|d| d.avg_energy_cost))?;
    out.push(AVG_BOILER, floats(|d| d.avg_boiler_load))?;
    out.push(AVG_CHILLER, floats(|d| d.avg_chiller_load))?;
    out.push(
        WASTE_EVENTS,
        ColumnData::Int(days.iter().map(|d| d.waste_events as i64).collect()),
    )?;
    Ok(out)
}

/// Chart catalogue for the post-injection utility table.
pub fn utility_charts(start: NaiveDateTime) -> Vec<ChartSpec> {
    let month = start.format("%B %Y");
    vec![
        ChartSpec::new(
            ChartKind::Pie,
            format!("Status Distribution ({month})"),
            GroupKey::column(STATUS),
        ),
        ChartSpec::new(
            ChartKind::Bar,
            "Average Energy Cost per Shift",
            GroupKey::column(SHIFT),
        )
        .y(ENERGY_COST)
        .labels("", "Avg Cost (USD)")
        .round(2),
        ChartSpec::new(
            ChartKind::Line,
            format!("Daily Waste Events ({month})"),
            GroupKey::date_of(DATE),
        )
        .reduce(ChartReduction::Count)
        .filter(waste_predicate())
        .labels("Date", "Number of Waste Events"),
        ChartSpec::new(
            ChartKind::Line,
            "Daily Energy Cost by Product Line",
            GroupKey::date_of(DATE),
        )
        .y(ENERGY_COST)
        .hue(PRODUCT_LINE)
        .reduce(ChartReduction::Sum)
        .labels("Date", "Energy Cost (USD)"),
        ChartSpec::new(
            ChartKind::Line,
            "Daily Energy Cost by Shift",
            GroupKey::date_of(DATE),
        )
        .y(ENERGY_COST)
        .hue(SHIFT)
        .reduce(ChartReduction::Sum)
        .labels("Date", "Energy Cost (USD)"),
        ChartSpec::new(
            ChartKind::Scatter,
            "Boiler Load vs Chiller Load (Colored by Status)",
            GroupKey::column(BOILER_LOAD),
        )
        .y(CHILLER_LOAD)
        .hue(STATUS)
        .labels("Boiler Load (kg/hr)", "Chiller Load (kW)"),
    ]
}

/// Generate, inject, summarize, chart, export, and render the utility
/// dataset.
pub fn run_utility(
    cfg: &UtilityDatasetConfig,
    snapshot: &ConfigSnapshot,
    options: &RunOptions,
    renderer: &mut dyn Renderer,
) -> Result<RunReport> {
    let seed = SeedInfo::resolve(cfg.seed);
    let ctx = RunContext::start(PipelineKind::Utility, &seed, snapshot);
    let mut rng = seeded_rng(seed.value);

    let mut rows = generate_utility(cfg, &mut rng)?;
    let injection = inject_anomalies(&mut rows, &cfg.anomalies, &mut rng)?;
    let summary = daily_summary(&rows)?;
    let charts = utility_charts(cfg.start)
        .into_iter()
        .map(|spec| Chart::build(spec, &rows))
        .collect::<Result<Vec<_>>>()?;

    let export = export_records(&rows, &export_path(&cfg.output, cfg.format), cfg.format)?;
    render_all(renderer, "Utility readings", &rows, &charts, options)?;

    let report = RunReport {
        schema_version: schema_version(),
        run_id: ctx.run_id.clone(),
        pipeline: PipelineKind::Utility,
        seed,
        config: snapshot.clone(),
        rows: rows.len(),
        export,
        injection: Some(injection),
        daily_summary: summary,
        charts: charts.iter().map(|c| c.title().to_string()).collect(),
        started_at: ctx.started_at,
        duration_ms: ctx.elapsed_ms(),
    };
    info!(
        run_id = %report.run_id,
        rows = report.rows,
        days = report.daily_summary.len(),
        charts = report.charts.len(),
        duration_ms = report.duration_ms,
        "utility pipeline finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::NullRenderer;
    use fm_common::ExportFormat;
    use fm_config::{AnomalyConfig, ConfigSource, FactoryConfig};

    fn snapshot() -> ConfigSnapshot {
        ConfigSnapshot::capture(&FactoryConfig::default(), &ConfigSource::Defaults).unwrap()
    }

    fn rows() -> Vec<UtilityRecord> {
        let cfg = UtilityDatasetConfig::default();
        let mut rng = seeded_rng(42);
        let mut rows = generate_utility(&cfg, &mut rng).unwrap();
        inject_anomalies(&mut rows, &cfg.anomalies, &mut rng).unwrap();
        rows
    }

    #[test]
    fn daily_summary_has_one_row_per_day() {
        let rows = rows();
        let summary = daily_summary(&rows).unwrap();
        assert_eq!(summary.len(), 30);
        assert_eq!(summary[0].date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());

        let waste: u64 = summary.iter().map(|d| d.waste_events).sum();
        let expected = rows
            .iter()
            .filter(|r| AnomalyKind::waste_statuses().contains(&r.status))
            .count() as u64;
        assert_eq!(waste, expected);

        let total: f64 = summary.iter().map(|d| d.total_energy_cost).sum();
        let expected: i64 = rows.iter().map(|r| r.energy_cost).sum();
        assert_eq!(total, expected as f64);
        for day in &summary {
            assert_eq!(fm_math::round_to(day.avg_energy_cost, 2), day.avg_energy_cost);
        }
    }

    #[test]
    fn daily_summary_table_has_six_columns() {
        let summary = daily_summary(&rows()).unwrap();
        let cols = daily_summary_columns(&summary).unwrap();
        assert_eq!(cols.num_columns(), 6);
        assert_eq!(cols.num_rows(), Some(30));
        assert!(cols.to_record_batch().is_ok());
    }

    #[test]
    fn catalogue_titles_use_start_month() {
        let specs = utility_charts(UtilityDatasetConfig::default().start);
        assert_eq!(specs.len(), 6);
        assert_eq!(specs[0].title, "Status Distribution (June 2025)");
        assert_eq!(specs[2].title, "Daily Waste Events (June 2025)");
        for spec in &specs {
            spec.validate_against::<UtilityRecord>().unwrap();
        }
    }

    #[test]
    fn run_exports_post_injection_table() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = UtilityDatasetConfig {
            output: dir.path().join("test.csv"),
            ..UtilityDatasetConfig::default()
        };
        let report =
            run_utility(&cfg, &snapshot(), &RunOptions::default(), &mut NullRenderer).unwrap();
        assert_eq!(report.rows, 720);
        assert_eq!(report.daily_summary.len(), 30);
        let injection = report.injection.as_ref().unwrap();
        assert_eq!(injection.boiler_waste.len(), 20);

        let text = std::fs::read_to_string(&cfg.output).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Date,Shift,Boiler_Load_kg_hr,Boiler_Steam_ton_hr,Boiler_Fuel_L,Chiller_Load_kW,Chiller_RunTime_hr,Product_Line,Energy_Cost_USD,Status"
        );
        assert!(lines.next().unwrap().starts_with("2025-06-01 00:00:00,Night,"));
        assert!(text.contains("Boiler Waste"));
        assert_eq!(text.lines().count(), 721);
    }

    #[test]
    fn parquet_export_swaps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = UtilityDatasetConfig {
            days: 2,
            anomalies: AnomalyConfig::none(),
            output: dir.path().join("test.csv"),
            format: ExportFormat::Parquet,
            ..UtilityDatasetConfig::default()
        };
        let report =
            run_utility(&cfg, &snapshot(), &RunOptions::default(), &mut NullRenderer).unwrap();
        assert_eq!(report.export.path, dir.path().join("test.parquet"));
        assert!(report.export.path.exists());
        assert!(!cfg.output.exists());
    }

    #[test]
    fn too_many_anomalies_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = UtilityDatasetConfig {
            days: 1,
            output: dir.path().join("test.csv"),
            ..UtilityDatasetConfig::default()
        };
        cfg.anomalies.boiler_waste.count = 25;
        let err = run_utility(&cfg, &snapshot(), &RunOptions::default(), &mut NullRenderer)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCount { .. }));
        assert!(!cfg.output.exists());
    }
}
