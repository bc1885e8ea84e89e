//! Factory Metrics core library.
//!
//! Synthesizes per-shift production and hourly utility datasets from an
//! explicit draw plan and a seeded RNG, derives ratio columns, injects
//! anomalies, aggregates, and hands chart data to a renderer.

pub mod aggregate;
pub mod chart;
pub mod cli;
pub mod derive;
pub mod exit_codes;
pub mod generate;
pub mod inject;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod rng;

pub use aggregate::{
    pivot, value_counts, Aggregation, GroupBy, GroupKey, KeyValue, PivotTable, Predicate,
    Reduction, SummaryTable, ValueCount,
};
pub use chart::{Chart, ChartData, ChartKind, ChartReduction, ChartSpec};
pub use derive::{derive_shift_metrics, DerivedShiftRecord, ShiftMetrics};
pub use exit_codes::ExitCode;
pub use generate::{
    generate_shifts, generate_utility, DrawPlan, Shift, ShiftRecord, UtilityRecord,
};
pub use inject::{inject_anomalies, AnomalyKind, InjectionReport};
pub use pipeline::{run_shifts, run_utility, DailySummary, RunOptions, RunReport};
pub use render::{NullRenderer, Renderer, TextRenderer};
pub use rng::{resolve_seed, seeded_rng, FactoryRng};
