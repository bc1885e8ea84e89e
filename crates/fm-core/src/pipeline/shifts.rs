//! Shift production pipeline.

use tracing::info;

use fm_common::Result;
use fm_config::{ConfigSnapshot, ShiftDatasetConfig};

use crate::aggregate::GroupKey;
use crate::chart::{Chart, ChartKind, ChartSpec};
use crate::derive::{derive_shift_metrics, DEFECT_RATE, DOWNTIME_RATE, ENERGY_PER_UNIT};
use crate::generate::generate_shifts;
use crate::generate::shifts::{COOKIES_PRODUCED, MACHINE_LOCATION, SHIFT};
use crate::render::Renderer;
use crate::rng::seeded_rng;

use super::{
    export_path, export_records, render_all, schema_version, PipelineKind, RunContext, RunOptions,
    RunReport, SeedInfo,
};

/// Chart catalogue for the derived shift table.
pub fn shift_charts() -> Vec<ChartSpec> {
    let location = || GroupKey::column(MACHINE_LOCATION);
    vec![
        ChartSpec::new(
            ChartKind::Bar,
            "Average Cookie Production per Location",
            location(),
        )
        .y(COOKIES_PRODUCED)
        .labels(MACHINE_LOCATION, "Cookies Produced"),
        ChartSpec::new(ChartKind::Bar, "Average Defect Rate per Location", location())
            .y(DEFECT_RATE)
            .labels(MACHINE_LOCATION, "Defect Rate"),
        ChartSpec::new(
            ChartKind::GroupedBar,
            "Energy per Unit by Machine and Shift",
            location(),
        )
        .y(ENERGY_PER_UNIT)
        .hue(SHIFT)
        .labels(MACHINE_LOCATION, "kWh per Cookie"),
        ChartSpec::new(
            ChartKind::GroupedBar,
            "Downtime Rate by Machine and Shift",
            location(),
        )
        .y(DOWNTIME_RATE)
        .hue(SHIFT)
        .labels(MACHINE_LOCATION, "Downtime Rate (per shift)"),
        ChartSpec::new(
            ChartKind::Heatmap,
            "Energy per Unit (kWh per Cookie) by Machine and Shift",
            location(),
        )
        .y(ENERGY_PER_UNIT)
        .hue(SHIFT)
        .round(3),
        ChartSpec::new(
            ChartKind::Heatmap,
            "Downtime Rate by Machine and Shift",
            location(),
        )
        .y(DOWNTIME_RATE)
        .hue(SHIFT)
        .round(3),
    ]
}

/// Generate, derive, chart, export, and render the shift dataset.
///
/// The export holds the raw columns only; derived ratios feed the charts.
pub fn run_shifts(
    cfg: &ShiftDatasetConfig,
    snapshot: &ConfigSnapshot,
    options: &RunOptions,
    renderer: &mut dyn Renderer,
) -> Result<RunReport> {
    let seed = SeedInfo::resolve(cfg.seed);
    let ctx = RunContext::start(PipelineKind::Shifts, &seed, snapshot);
    let mut rng = seeded_rng(seed.value);

    let raw = generate_shifts(cfg, &mut rng)?;
    let derived = derive_shift_metrics(&raw, cfg.shift_minutes);
    let charts = shift_charts()
        .into_iter()
        .map(|spec| Chart::build(spec, &derived))
        .collect::<Result<Vec<_>>>()?;

    let export = export_records(&raw, &export_path(&cfg.output, cfg.format), cfg.format)?;
    render_all(renderer, "Shift production", &raw, &charts, options)?;

    let report = RunReport {
        schema_version: schema_version(),
        run_id: ctx.run_id.clone(),
        pipeline: PipelineKind::Shifts,
        seed,
        config: snapshot.clone(),
        rows: raw.len(),
        export,
        injection: None,
        daily_summary: Vec::new(),
        charts: charts.iter().map(|c| c.title().to_string()).collect(),
        started_at: ctx.started_at,
        duration_ms: ctx.elapsed_ms(),
    };
    info!(
        run_id = %report.run_id,
        rows = report.rows,
        charts = report.charts.len(),
        duration_ms = report.duration_ms,
        "shift pipeline finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::DerivedShiftRecord;
    use crate::render::NullRenderer;
    use fm_config::{ConfigSource, FactoryConfig};

    #[test]
    fn catalogue_validates_against_derived_schema() {
        let specs = shift_charts();
        assert_eq!(specs.len(), 6);
        for spec in &specs {
            spec.validate_against::<DerivedShiftRecord>().unwrap();
        }
    }

    #[test]
    fn run_writes_raw_csv() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ShiftDatasetConfig {
            output: dir.path().join("manufacturing_data.csv"),
            ..ShiftDatasetConfig::default()
        };
        let snapshot =
            ConfigSnapshot::capture(&FactoryConfig::default(), &ConfigSource::Defaults).unwrap();
        let report =
            run_shifts(&cfg, &snapshot, &RunOptions::default(), &mut NullRenderer).unwrap();

        assert_eq!(report.rows, 200);
        assert_eq!(report.seed.value, 34);
        assert_eq!(report.charts.len(), 6);
        let text = std::fs::read_to_string(&cfg.output).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Machine Location,Shift,Cookies Produced,Downtime Minutes,Defected Cookies,Energy Used in kWh"
        );
        assert_eq!(lines.count(), 200);
    }

    #[test]
    fn failing_generation_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ShiftDatasetConfig {
            output: dir.path().join("manufacturing_data.csv"),
            shifts: vec![],
            ..ShiftDatasetConfig::default()
        };
        let snapshot =
            ConfigSnapshot::capture(&FactoryConfig::default(), &ConfigSource::Defaults).unwrap();
        assert!(run_shifts(&cfg, &snapshot, &RunOptions::default(), &mut NullRenderer).is_err());
        assert!(!cfg.output.exists());
    }
}
