//! Per-shift production records.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use fm_common::Result;
use fm_config::ShiftDatasetConfig;
use fm_dataset::{Cell, ColumnDef, ColumnKind, Record};

use super::DrawPlan;

pub const MACHINE_LOCATION: &str = "Machine Location";
pub const SHIFT: &str = "Shift";
pub const COOKIES_PRODUCED: &str = "Cookies Produced";
pub const DOWNTIME_MINUTES: &str = "Downtime Minutes";
pub const DEFECTED_COOKIES: &str = "Defected Cookies";
pub const ENERGY_KWH: &str = "Energy Used in kWh";

pub(crate) const SHIFT_COLUMNS: [ColumnDef; 6] = [
    ColumnDef::new(MACHINE_LOCATION, ColumnKind::Text),
    ColumnDef::new(SHIFT, ColumnKind::Text),
    ColumnDef::new(COOKIES_PRODUCED, ColumnKind::Int),
    ColumnDef::new(DOWNTIME_MINUTES, ColumnKind::Int),
    ColumnDef::new(DEFECTED_COOKIES, ColumnKind::Int),
    ColumnDef::new(ENERGY_KWH, ColumnKind::Int),
];

/// One production shift at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftRecord {
    pub location: String,
    pub shift: String,
    pub produced: i64,
    pub downtime_min: i64,
    pub defects: i64,
    pub energy_kwh: i64,
}

impl Record for ShiftRecord {
    fn schema() -> &'static [ColumnDef] {
        &SHIFT_COLUMNS
    }

    fn cell(&self, column: usize) -> Cell<'_> {
        match column {
            0 => Cell::Text(&self.location),
            1 => Cell::Text(&self.shift),
            2 => Cell::Int(self.produced),
            3 => Cell::Int(self.downtime_min),
            4 => Cell::Int(self.defects),
            5 => Cell::Int(self.energy_kwh),
            _ => panic!("shift record has no column {column}"),
        }
    }
}

/// Draw plan for the shift table, in column declaration order.
pub fn shift_draw_plan(cfg: &ShiftDatasetConfig) -> DrawPlan {
    DrawPlan::new()
        .choice(MACHINE_LOCATION, &cfg.locations)
        .choice(SHIFT, &cfg.shifts)
        .int(COOKIES_PRODUCED, cfg.produced)
        .int(DOWNTIME_MINUTES, cfg.downtime_min)
        .int(DEFECTED_COOKIES, cfg.defects)
        .int(ENERGY_KWH, cfg.energy_kwh)
}

/// Generate `cfg.rows` shift records.
pub fn generate_shifts<R: Rng + ?Sized>(
    cfg: &ShiftDatasetConfig,
    rng: &mut R,
) -> Result<Vec<ShiftRecord>> {
    let mut drawn = shift_draw_plan(cfg).execute(cfg.rows, rng)?;

    let locations = drawn.take_labels(MACHINE_LOCATION)?;
    let shifts = drawn.take_labels(SHIFT)?;
    let produced = drawn.take_ints(COOKIES_PRODUCED)?;
    let downtime = drawn.take_ints(DOWNTIME_MINUTES)?;
    let defects = drawn.take_ints(DEFECTED_COOKIES)?;
    let energy = drawn.take_ints(ENERGY_KWH)?;

    let rows: Vec<ShiftRecord> = locations
        .into_iter()
        .zip(shifts)
        .zip(produced)
        .zip(downtime)
        .zip(defects)
        .zip(energy)
        .map(
            |(((((location, shift), produced), downtime_min), defects), energy_kwh)| ShiftRecord {
                location,
                shift,
                produced,
                downtime_min,
                defects,
                energy_kwh,
            },
        )
        .collect();

    info!(rows = rows.len(), "generated shift table");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded_rng;
    use fm_common::Error;
    use fm_config::IntRange;

    #[test]
    fn default_config_generates_200_rows_in_range() {
        let cfg = ShiftDatasetConfig::default();
        let rows = generate_shifts(&cfg, &mut seeded_rng(34)).unwrap();
        assert_eq!(rows.len(), 200);
        for r in &rows {
            assert!(cfg.locations.contains(&r.location));
            assert!(cfg.shifts.contains(&r.shift));
            assert!(cfg.produced.contains(r.produced));
            assert!(cfg.downtime_min.contains(r.downtime_min));
            assert!(cfg.defects.contains(r.defects));
            assert!(cfg.energy_kwh.contains(r.energy_kwh));
        }
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let cfg = ShiftDatasetConfig::default();
        let a = generate_shifts(&cfg, &mut seeded_rng(34)).unwrap();
        let b = generate_shifts(&cfg, &mut seeded_rng(34)).unwrap();
        let c = generate_shifts(&cfg, &mut seeded_rng(35)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn plan_follows_declaration_order() {
        let plan = shift_draw_plan(&ShiftDatasetConfig::default());
        let declared: Vec<&str> = ShiftRecord::schema().iter().map(|c| c.name).collect();
        assert_eq!(plan.columns(), declared);
    }

    #[test]
    fn invalid_range_fails() {
        let cfg = ShiftDatasetConfig {
            energy_kwh: IntRange::new(700, 500),
            ..ShiftDatasetConfig::default()
        };
        let err = generate_shifts(&cfg, &mut seeded_rng(34)).unwrap_err();
        assert!(
            matches!(err, Error::InvalidRange { ref column, .. } if column == ENERGY_KWH)
        );
    }

    #[test]
    fn empty_domain_fails() {
        let cfg = ShiftDatasetConfig {
            locations: vec![],
            ..ShiftDatasetConfig::default()
        };
        assert!(matches!(
            generate_shifts(&cfg, &mut seeded_rng(34)),
            Err(Error::EmptyDomain { .. })
        ));
    }

    #[test]
    fn cells_follow_schema() {
        let rec = ShiftRecord {
            location: "East Blg.".into(),
            shift: "Night".into(),
            produced: 300,
            downtime_min: 12,
            defects: 5,
            energy_kwh: 600,
        };
        let idx = ShiftRecord::column_index(ENERGY_KWH).unwrap();
        assert_eq!(rec.cell(idx), Cell::Int(600));
        assert_eq!(rec.cell(0).as_text(), Some("East Blg."));
    }
}
