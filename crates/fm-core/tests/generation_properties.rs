//! Property-based tests for generation, derivation, injection, and grouping.

use std::collections::BTreeSet;

use proptest::prelude::*;

use fm_config::{AnomalyConfig, IntRange, ShiftDatasetConfig, UtilityDatasetConfig};
use fm_core::generate::shifts::{MACHINE_LOCATION, SHIFT};
use fm_core::generate::utility::{DATE, PRODUCT_LINE};
use fm_core::{
    derive_shift_metrics, generate_shifts, generate_utility, inject_anomalies, seeded_rng,
    Aggregation, GroupBy,
};

fn anomaly_counts(max: usize) -> impl Strategy<Value = (usize, usize, usize)> {
    (0..=max, 0..=max, 0..=max)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn same_seed_same_shift_table(seed in any::<u64>(), rows in 1usize..300) {
        let cfg = ShiftDatasetConfig { rows, ..ShiftDatasetConfig::default() };
        let a = generate_shifts(&cfg, &mut seeded_rng(seed)).unwrap();
        let b = generate_shifts(&cfg, &mut seeded_rng(seed)).unwrap();
        prop_assert_eq!(a.len(), rows);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn values_stay_in_inclusive_bounds(
        seed in any::<u64>(),
        lo in -1000i64..1000,
        width in 0i64..50,
    ) {
        let range = IntRange::new(lo, lo + width);
        let cfg = ShiftDatasetConfig {
            rows: 100,
            downtime_min: range,
            ..ShiftDatasetConfig::default()
        };
        let rows = generate_shifts(&cfg, &mut seeded_rng(seed)).unwrap();
        for r in &rows {
            prop_assert!(range.contains(r.downtime_min));
        }
    }

    #[test]
    fn defect_rate_at_most_one_under_default_ranges(seed in any::<u64>()) {
        let cfg = ShiftDatasetConfig::default();
        let rows = generate_shifts(&cfg, &mut seeded_rng(seed)).unwrap();
        for d in derive_shift_metrics(&rows, cfg.shift_minutes) {
            prop_assert!(d.metrics.defect_rate <= 1.0);
            prop_assert!(d.metrics.is_finite());
        }
    }

    #[test]
    fn injection_preserves_row_count(
        seed in any::<u64>(),
        days in 1u32..4,
        (k1, k2, k3) in anomaly_counts(24),
    ) {
        let mut cfg = UtilityDatasetConfig { days, ..UtilityDatasetConfig::default() };
        let mut anomalies = AnomalyConfig::none();
        anomalies.boiler_waste.count = k1;
        anomalies.chiller_waste.count = k2;
        anomalies.scheduling_issue.count = k3;
        cfg.anomalies = anomalies;

        let mut rng = seeded_rng(seed);
        let mut rows = generate_utility(&cfg, &mut rng).unwrap();
        let before = rows.clone();
        let report = inject_anomalies(&mut rows, &cfg.anomalies, &mut rng).unwrap();

        prop_assert_eq!(rows.len(), before.len());
        prop_assert_eq!(report.boiler_waste.len(), k1);
        prop_assert_eq!(report.chiller_waste.len(), k2);
        prop_assert_eq!(report.scheduling_issue.len(), k3);

        // Cost increments accumulate per kind on every touched row.
        for (i, (after, orig)) in rows.iter().zip(before.iter()).enumerate() {
            let mut expected = orig.energy_cost;
            if report.boiler_waste.contains(&i) { expected += 200; }
            if report.chiller_waste.contains(&i) { expected += 150; }
            if report.scheduling_issue.contains(&i) { expected += 300; }
            prop_assert_eq!(after.energy_cost, expected);
        }
    }

    #[test]
    fn group_rows_equal_distinct_keys(seed in any::<u64>(), rows in 1usize..200) {
        let cfg = ShiftDatasetConfig { rows, ..ShiftDatasetConfig::default() };
        let table = generate_shifts(&cfg, &mut seeded_rng(seed)).unwrap();
        let summary = GroupBy::new()
            .key(MACHINE_LOCATION)
            .key(SHIFT)
            .agg(Aggregation::count("n"))
            .run(&table)
            .unwrap();
        let distinct: BTreeSet<(String, String)> = table
            .iter()
            .map(|r| (r.location.clone(), r.shift.clone()))
            .collect();
        prop_assert_eq!(summary.len(), distinct.len());
        let total: f64 = summary.column("n").unwrap().iter().sum();
        prop_assert_eq!(total as usize, rows);
    }

    #[test]
    fn daily_product_groups_bounded(seed in any::<u64>(), days in 1u32..5) {
        let cfg = UtilityDatasetConfig { days, ..UtilityDatasetConfig::default() };
        let table = generate_utility(&cfg, &mut seeded_rng(seed)).unwrap();
        let summary = GroupBy::new()
            .date_key(DATE)
            .key(PRODUCT_LINE)
            .agg(Aggregation::sum("Energy_Cost_USD"))
            .run(&table)
            .unwrap();
        prop_assert!(summary.len() <= days as usize * cfg.product_lines.len());
        prop_assert!(summary.len() >= days as usize);
    }
}
