//! Anomaly injection for the utility table.
//!
//! Three event kinds are injected in a fixed sequence: boiler waste, then
//! chiller waste, then scheduling issues. Each kind draws its own row subset
//! without replacement; subsets are independent and may overlap. On an
//! overlapping row the cost increments accumulate and the status of the
//! last kind applied wins.
//!
//! RNG consumption per kind: the index sample, then any re-drawn column
//! values in sampled-index order.

use std::collections::BTreeSet;
use std::fmt;

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fm_common::{Error, Result};
use fm_config::AnomalyConfig;

use crate::generate::utility::{BOILER_FUEL, CHILLER_RUNTIME};
use crate::generate::{check_int_range, FloatDraw, UtilityRecord};

/// Kind of injected inefficiency event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    BoilerWaste,
    ChillerWaste,
    SchedulingIssue,
}

impl AnomalyKind {
    /// Injection order.
    pub const SEQUENCE: [AnomalyKind; 3] = [
        AnomalyKind::BoilerWaste,
        AnomalyKind::ChillerWaste,
        AnomalyKind::SchedulingIssue,
    ];

    /// Status label written to affected rows.
    pub fn status_label(self) -> &'static str {
        match self {
            AnomalyKind::BoilerWaste => "Boiler Waste",
            AnomalyKind::ChillerWaste => "Chiller Waste",
            AnomalyKind::SchedulingIssue => "Scheduling Issue",
        }
    }

    /// Status labels of all kinds, in injection order.
    pub fn waste_statuses() -> Vec<String> {
        Self::SEQUENCE
            .iter()
            .map(|k| k.status_label().to_string())
            .collect()
    }

    fn count(self, cfg: &AnomalyConfig) -> usize {
        match self {
            AnomalyKind::BoilerWaste => cfg.boiler_waste.count,
            AnomalyKind::ChillerWaste => cfg.chiller_waste.count,
            AnomalyKind::SchedulingIssue => cfg.scheduling_issue.count,
        }
    }

    fn cost_increment(self, cfg: &AnomalyConfig) -> i64 {
        match self {
            AnomalyKind::BoilerWaste => cfg.boiler_waste.cost_increment,
            AnomalyKind::ChillerWaste => cfg.chiller_waste.cost_increment,
            AnomalyKind::SchedulingIssue => cfg.scheduling_issue.cost_increment,
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_label())
    }
}

/// Row indices touched by each kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionReport {
    pub boiler_waste: Vec<usize>,
    pub chiller_waste: Vec<usize>,
    pub scheduling_issue: Vec<usize>,
}

impl InjectionReport {
    pub fn indices(&self, kind: AnomalyKind) -> &[usize] {
        match kind {
            AnomalyKind::BoilerWaste => &self.boiler_waste,
            AnomalyKind::ChillerWaste => &self.chiller_waste,
            AnomalyKind::SchedulingIssue => &self.scheduling_issue,
        }
    }

    fn indices_mut(&mut self, kind: AnomalyKind) -> &mut Vec<usize> {
        match kind {
            AnomalyKind::BoilerWaste => &mut self.boiler_waste,
            AnomalyKind::ChillerWaste => &mut self.chiller_waste,
            AnomalyKind::SchedulingIssue => &mut self.scheduling_issue,
        }
    }

    /// Number of distinct rows touched by any kind.
    pub fn affected_rows(&self) -> usize {
        AnomalyKind::SEQUENCE
            .iter()
            .flat_map(|k| self.indices(*k).iter().copied())
            .collect::<BTreeSet<usize>>()
            .len()
    }

    /// Rows touched by more than one kind.
    pub fn overlapping_rows(&self) -> Vec<usize> {
        let mut seen = BTreeSet::new();
        let mut overlap = BTreeSet::new();
        for kind in AnomalyKind::SEQUENCE {
            for idx in self.indices(kind) {
                if !seen.insert(*idx) {
                    overlap.insert(*idx);
                }
            }
        }
        overlap.into_iter().collect()
    }
}

fn cost_overflow(kind: AnomalyKind) -> Error {
    Error::Generation(format!("energy cost overflows while injecting {kind}"))
}

/// Checks counts, re-draw ranges, and cost headroom; returns the runtime
/// sampler for chiller waste.
fn validate(rows: &[UtilityRecord], cfg: &AnomalyConfig) -> Result<FloatDraw> {
    for kind in AnomalyKind::SEQUENCE {
        let count = kind.count(cfg);
        if count > rows.len() {
            return Err(Error::InvalidCount {
                what: kind.status_label().to_string(),
                count,
                population: rows.len(),
            });
        }
    }
    let fuel = cfg.boiler_waste.fuel;
    check_int_range(BOILER_FUEL, fuel.min, fuel.max)?;
    let runtime = cfg.chiller_waste.runtime;
    let runtime = FloatDraw::new(CHILLER_RUNTIME, runtime.low, runtime.high, runtime.decimals)?;

    // Any row may receive every active kind.
    let (mut raise, mut lower) = (0i64, 0i64);
    for kind in AnomalyKind::SEQUENCE {
        if kind.count(cfg) == 0 {
            continue;
        }
        let inc = kind.cost_increment(cfg);
        let total = if inc >= 0 { &mut raise } else { &mut lower };
        *total = total.checked_add(inc).ok_or_else(|| cost_overflow(kind))?;
    }
    for row in rows {
        if row.energy_cost.checked_add(raise).is_none()
            || row.energy_cost.checked_add(lower).is_none()
        {
            return Err(Error::Generation(format!(
                "energy cost {} cannot absorb anomaly increments",
                row.energy_cost
            )));
        }
    }
    Ok(runtime)
}

/// Inject all configured anomalies into `rows` in place.
///
/// Counts and ranges are validated before any row is touched. The row
/// count never changes.
pub fn inject_anomalies<R: Rng + ?Sized>(
    rows: &mut [UtilityRecord],
    cfg: &AnomalyConfig,
    rng: &mut R,
) -> Result<InjectionReport> {
    let runtime = validate(rows, cfg)?;

    let mut report = InjectionReport::default();
    for kind in AnomalyKind::SEQUENCE {
        let picked = index::sample(rng, rows.len(), kind.count(cfg)).into_vec();
        debug!(kind = %kind, count = picked.len(), "injecting anomaly");
        for &i in &picked {
            apply(kind, &mut rows[i], cfg, &runtime, rng)?;
        }
        *report.indices_mut(kind) = picked;
    }

    info!(
        boiler_waste = report.boiler_waste.len(),
        chiller_waste = report.chiller_waste.len(),
        scheduling_issue = report.scheduling_issue.len(),
        affected = report.affected_rows(),
        "injected anomalies"
    );
    Ok(report)
}

fn apply<R: Rng + ?Sized>(
    kind: AnomalyKind,
    row: &mut UtilityRecord,
    cfg: &AnomalyConfig,
    runtime: &FloatDraw,
    rng: &mut R,
) -> Result<()> {
    match kind {
        AnomalyKind::BoilerWaste => {
            let fuel = cfg.boiler_waste.fuel;
            row.boiler_load = 0;
            row.boiler_steam = 0.0;
            row.boiler_fuel = rng.random_range(fuel.min..=fuel.max);
        }
        AnomalyKind::ChillerWaste => {
            row.chiller_load = 0;
            row.chiller_runtime = runtime.sample(rng);
        }
        AnomalyKind::SchedulingIssue => {}
    }
    row.energy_cost = row
        .energy_cost
        .checked_add(kind.cost_increment(cfg))
        .ok_or_else(|| cost_overflow(kind))?;
    row.status = kind.status_label().to_string();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::generate_utility;
    use crate::rng::{seeded_rng, FactoryRng};
    use fm_config::UtilityDatasetConfig;

    fn base_table(rng: &mut FactoryRng) -> Vec<UtilityRecord> {
        generate_utility(&UtilityDatasetConfig::default(), rng).unwrap()
    }

    fn only_boiler(count: usize) -> AnomalyConfig {
        let mut cfg = AnomalyConfig::none();
        cfg.boiler_waste.count = count;
        cfg
    }

    #[test]
    fn boiler_waste_marks_exactly_k_rows() {
        let mut rng = seeded_rng(42);
        let mut rows = base_table(&mut rng);
        let before = rows.clone();
        let report = inject_anomalies(&mut rows, &only_boiler(20), &mut rng).unwrap();

        assert_eq!(rows.len(), 720);
        let marked: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.status == "Boiler Waste")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(marked.len(), 20);
        let mut picked = report.boiler_waste.clone();
        picked.sort_unstable();
        assert_eq!(marked, picked);

        for &i in &report.boiler_waste {
            assert_eq!(rows[i].boiler_load, 0);
            assert_eq!(rows[i].boiler_steam, 0.0);
            assert!((400..=499).contains(&rows[i].boiler_fuel));
            assert_eq!(rows[i].energy_cost, before[i].energy_cost + 200);
        }
    }

    #[test]
    fn untouched_rows_unchanged() {
        let mut rng = seeded_rng(42);
        let mut rows = base_table(&mut rng);
        let before = rows.clone();
        let report =
            inject_anomalies(&mut rows, &AnomalyConfig::default(), &mut rng).unwrap();
        let touched: BTreeSet<usize> = AnomalyKind::SEQUENCE
            .iter()
            .flat_map(|k| report.indices(*k).iter().copied())
            .collect();
        for (i, (a, b)) in rows.iter().zip(before.iter()).enumerate() {
            if !touched.contains(&i) {
                assert_eq!(a, b, "row {i} changed");
            }
        }
        assert_eq!(rows.len(), before.len());
    }

    #[test]
    fn subsets_have_distinct_indices() {
        let mut rng = seeded_rng(7);
        let mut rows = base_table(&mut rng);
        let report =
            inject_anomalies(&mut rows, &AnomalyConfig::default(), &mut rng).unwrap();
        for kind in AnomalyKind::SEQUENCE {
            let idx = report.indices(kind);
            let unique: BTreeSet<usize> = idx.iter().copied().collect();
            assert_eq!(unique.len(), idx.len());
        }
        assert_eq!(report.boiler_waste.len(), 20);
        assert_eq!(report.chiller_waste.len(), 15);
        assert_eq!(report.scheduling_issue.len(), 10);
    }

    #[test]
    fn overlapping_rows_accumulate_cost_and_last_status_wins() {
        // With every row selected by every kind, all subsets overlap fully.
        let mut rng = seeded_rng(1);
        let mut rows = base_table(&mut rng);
        rows.truncate(12);
        let before = rows.clone();
        let mut cfg = AnomalyConfig::default();
        cfg.boiler_waste.count = 12;
        cfg.chiller_waste.count = 12;
        cfg.scheduling_issue.count = 12;

        let report = inject_anomalies(&mut rows, &cfg, &mut rng).unwrap();
        assert_eq!(report.overlapping_rows().len(), 12);
        for (after, before) in rows.iter().zip(before.iter()) {
            assert_eq!(after.energy_cost, before.energy_cost + 200 + 150 + 300);
            assert_eq!(after.status, "Scheduling Issue");
            assert_eq!(after.boiler_load, 0);
            assert_eq!(after.chiller_load, 0);
            assert!((4.0..7.0).contains(&after.chiller_runtime));
        }
    }

    #[test]
    fn count_above_rows_fails_without_mutation() {
        let mut rng = seeded_rng(1);
        let mut rows = base_table(&mut rng);
        rows.truncate(5);
        let before = rows.clone();
        let mut cfg = AnomalyConfig::default();
        cfg.boiler_waste.count = 2;
        cfg.chiller_waste.count = 2;
        cfg.scheduling_issue.count = 6;
        let err = inject_anomalies(&mut rows, &cfg, &mut rng).unwrap_err();
        assert!(matches!(err, Error::InvalidCount { count: 6, population: 5, .. }));
        assert_eq!(rows, before);
    }

    #[test]
    fn invalid_fuel_range_rejected() {
        let mut rng = seeded_rng(1);
        let mut rows = base_table(&mut rng);
        let mut cfg = only_boiler(1);
        cfg.boiler_waste.fuel = fm_config::IntRange::new(500, 400);
        assert!(matches!(
            inject_anomalies(&mut rows, &cfg, &mut rng),
            Err(Error::InvalidRange { .. })
        ));
    }

    #[test]
    fn runtime_range_with_infinite_width_rejected() {
        let mut rng = seeded_rng(1);
        let mut rows = base_table(&mut rng);
        let before = rows.clone();
        let mut cfg = AnomalyConfig::none();
        cfg.chiller_waste.count = 3;
        cfg.chiller_waste.runtime = fm_config::FloatRange::new(-1e308, 1e308);
        let err = inject_anomalies(&mut rows, &cfg, &mut rng).unwrap_err();
        assert!(matches!(err, Error::InvalidRange { ref column, .. } if column == CHILLER_RUNTIME));
        assert_eq!(rows, before);
    }

    #[test]
    fn cost_overflow_fails_without_mutation() {
        let mut rng = seeded_rng(1);
        let mut rows = base_table(&mut rng);
        rows.truncate(4);
        rows[2].energy_cost = i64::MAX - 100;
        let before = rows.clone();
        let err = inject_anomalies(&mut rows, &only_boiler(4), &mut rng).unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
        assert_eq!(rows, before);
    }

    #[test]
    fn increments_summing_past_i64_rejected() {
        let mut rng = seeded_rng(1);
        let mut rows = base_table(&mut rng);
        let mut cfg = only_boiler(1);
        cfg.boiler_waste.cost_increment = i64::MAX;
        cfg.scheduling_issue.count = 1;
        cfg.scheduling_issue.cost_increment = i64::MAX;
        assert!(matches!(
            inject_anomalies(&mut rows, &cfg, &mut rng),
            Err(Error::Generation(_))
        ));
    }

    #[test]
    fn injection_is_reproducible() {
        let run = |seed| {
            let mut rng = seeded_rng(seed);
            let mut rows = base_table(&mut rng);
            let report =
                inject_anomalies(&mut rows, &AnomalyConfig::default(), &mut rng).unwrap();
            (rows, report)
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn waste_statuses_in_sequence_order() {
        assert_eq!(
            AnomalyKind::waste_statuses(),
            vec!["Boiler Waste", "Chiller Waste", "Scheduling Issue"]
        );
    }
}
