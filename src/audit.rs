// Reporting-quality audits: submission compliance against the reference
// roster and mandatory-field completeness of the submitted rows.
use crate::period::PeriodWindow;
use crate::types::{EntityKey, GroupingRole, ReferenceVillage, SurveyRecord};
use crate::util::pct;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Essential indicator columns of the survey schema; these define the
/// completeness denominator. Accessor functions keep the column list data,
/// not a chain of if/else over field names.
pub const MANDATORY_COLUMNS: &[(&str, fn(&SurveyRecord) -> u32)] = &[
    ("Sasaran", |r| r.target_total()),
    ("Ditimbang", |r| r.weighed),
    ("Diukur", |r| r.measured),
    ("DitimbangDiukur", |r| r.weighed_measured),
    ("Naik", |r| r.gained_weight),
    ("PunyaKIA", |r| r.kia_booklet),
];

/// What "populated" means for a coerced count column. Ingestion turns
/// missing cells into 0, so after the boundary a literal zero is the only
/// remaining signal; which way it counts is a calibration choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroPolicy {
    /// Any value, including 0, counts as reported.
    ZeroCountsAsReported,
    /// Only strictly positive values count as reported.
    ZeroCountsAsMissing,
}

impl ZeroPolicy {
    fn is_populated(self, value: u32) -> bool {
        match self {
            ZeroPolicy::ZeroCountsAsReported => true,
            ZeroPolicy::ZeroCountsAsMissing => value > 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceEntity {
    pub name: String,
    /// Number of roster villages in the entity; `None` when the entity is
    /// itself a village.
    pub village_count: Option<usize>,
    pub target_count: u64,
    pub actual_count: u64,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceResult {
    pub overall_rate: f64,
    pub per_entity: Vec<ComplianceEntity>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletenessColumn {
    pub name: &'static str,
    pub populated: u64,
    pub records: u64,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletenessEntity {
    pub name: String,
    pub populated_cells: u64,
    pub total_cells: u64,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletenessResult {
    pub overall_rate: f64,
    pub per_column: Vec<CompletenessColumn>,
    pub per_entity: Vec<CompletenessEntity>,
}

fn in_current_window(r: &SurveyRecord, window: &PeriodWindow) -> bool {
    r.year == window.year && window.current_months.contains(&r.month)
}

/// Village identity is the (Puskesmas, village) pair; names alone repeat
/// across health centers.
fn village_of(r: &SurveyRecord) -> (String, String) {
    (
        r.puskesmas.clone(),
        r.village.clone().unwrap_or_else(|| r.puskesmas.clone()),
    )
}

/// Did every roster entity submit a form for every expected month?
///
/// One form is expected per village per month in the current window; a
/// Puskesmas entity therefore expects `villages x months`. The actual count
/// is the number of distinct (village, month) pairs with at least one
/// record, so duplicate submissions never inflate the rate. The overall
/// rate is submission-weighted (sum of actuals over sum of targets), not an
/// average of per-entity rates.
pub fn compliance(
    roster: &[ReferenceVillage],
    records: &[SurveyRecord],
    window: &PeriodWindow,
    role: GroupingRole,
) -> ComplianceResult {
    // Distinct months submitted per village, limited to the window.
    let mut submitted: HashMap<(String, String), HashSet<u32>> = HashMap::new();
    for r in records.iter().filter(|r| in_current_window(r, window)) {
        submitted.entry(village_of(r)).or_default().insert(r.month);
    }

    // Roster villages per entity; BTreeMap keeps the output ordering stable.
    let mut entities: BTreeMap<EntityKey, Vec<&ReferenceVillage>> = BTreeMap::new();
    for v in roster {
        entities.entry(role.roster_key(v)).or_default().push(v);
    }

    let month_count = window.current_month_count as u64;
    let mut sum_actual = 0u64;
    let mut sum_target = 0u64;
    let mut per_entity = Vec::with_capacity(entities.len());
    for (key, villages) in entities {
        let actual: u64 = villages
            .iter()
            .map(|v| {
                submitted
                    .get(&(v.puskesmas.clone(), v.village.clone()))
                    .map(|months| months.len() as u64)
                    .unwrap_or(0)
            })
            .sum();
        let (village_count, target) = match role {
            GroupingRole::ByPuskesmas => {
                (Some(villages.len()), villages.len() as u64 * month_count)
            }
            GroupingRole::ByVillage => (None, month_count),
        };
        sum_actual += actual;
        sum_target += target;
        per_entity.push(ComplianceEntity {
            name: key.display_name(),
            village_count,
            target_count: target,
            actual_count: actual,
            rate: pct(actual, target),
        });
    }

    ComplianceResult {
        overall_rate: pct(sum_actual, sum_target),
        per_entity,
    }
}

/// How complete are the mandatory fields of the in-window records?
///
/// Per-column rate is populated records over all records; the overall rate
/// is the equal-weighted mean of the per-column rates (across fields, not
/// rows). Per-entity completeness is the populated-cell share of that
/// entity's records across all mandatory columns.
pub fn completeness(
    records: &[SurveyRecord],
    window: &PeriodWindow,
    role: GroupingRole,
    policy: ZeroPolicy,
) -> CompletenessResult {
    let in_window: Vec<&SurveyRecord> = records
        .iter()
        .filter(|r| in_current_window(r, window))
        .collect();
    let total = in_window.len() as u64;

    let per_column: Vec<CompletenessColumn> = MANDATORY_COLUMNS
        .iter()
        .map(|(name, accessor)| {
            let populated = in_window
                .iter()
                .filter(|r| policy.is_populated(accessor(r)))
                .count() as u64;
            CompletenessColumn {
                name,
                populated,
                records: total,
                rate: pct(populated, total),
            }
        })
        .collect();

    let overall_rate = if per_column.is_empty() {
        0.0
    } else {
        per_column.iter().map(|c| c.rate).sum::<f64>() / per_column.len() as f64
    };

    let mut cells: BTreeMap<EntityKey, (u64, u64)> = BTreeMap::new();
    for r in &in_window {
        let entry = cells.entry(role.record_key(r)).or_insert((0, 0));
        for (_, accessor) in MANDATORY_COLUMNS {
            entry.1 += 1;
            if policy.is_populated(accessor(r)) {
                entry.0 += 1;
            }
        }
    }
    let per_entity = cells
        .into_iter()
        .map(|(key, (populated_cells, total_cells))| CompletenessEntity {
            name: key.display_name(),
            populated_cells,
            total_cells,
            rate: pct(populated_cells, total_cells),
        })
        .collect();

    CompletenessResult {
        overall_rate,
        per_column,
        per_entity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::{resolve, ReportKind};

    fn record(puskesmas: &str, village: &str, month: u32) -> SurveyRecord {
        SurveyRecord {
            puskesmas: puskesmas.to_string(),
            village: Some(village.to_string()),
            year: 2024,
            month,
            target_male: 20,
            target_female: 20,
            weighed: 30,
            measured: 28,
            weighed_measured: 28,
            very_short: 2,
            short: 3,
            wasted_severe: 1,
            wasted_moderate: 1,
            underweight: 3,
            overweight: 1,
            gained_weight: 20,
            no_gain: 5,
            not_weighed_prior: 3,
            kia_booklet: 25,
            weighed_measured_corrected: 26,
        }
    }

    fn roster_entry(id: u32, village: &str, puskesmas: &str) -> ReferenceVillage {
        ReferenceVillage {
            id,
            village: village.to_string(),
            puskesmas: puskesmas.to_string(),
        }
    }

    #[test]
    fn compliance_per_village_over_a_quarter() {
        // Three villages under one Puskesmas; Q1 expects 3 forms per village.
        let roster = vec![
            roster_entry(1, "V1", "X"),
            roster_entry(2, "V2", "X"),
            roster_entry(3, "V3", "X"),
        ];
        let records = vec![
            record("X", "V1", 1),
            record("X", "V1", 2),
            record("X", "V1", 3),
            record("X", "V2", 1),
        ];
        let window = resolve(ReportKind::Quarterly, 1, 2024);
        let result = compliance(&roster, &records, &window, GroupingRole::ByVillage);

        assert_eq!(result.per_entity.len(), 3);
        let by_name: Vec<(&str, u64, f64)> = result
            .per_entity
            .iter()
            .map(|e| (e.name.as_str(), e.target_count, e.rate))
            .collect();
        assert_eq!(by_name[0], ("V1", 3, 100.0));
        assert_eq!(by_name[1].0, "V2");
        assert_eq!(by_name[1].1, 3);
        assert!((by_name[1].2 - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(by_name[2], ("V3", 3, 0.0));
    }

    #[test]
    fn overall_rate_is_submission_weighted() {
        // P1 has one village fully compliant, P2 has three villages silent.
        // A mean of entity rates would say 50%; the weighted overall is 25%.
        let roster = vec![
            roster_entry(1, "A1", "P1"),
            roster_entry(2, "B1", "P2"),
            roster_entry(3, "B2", "P2"),
            roster_entry(4, "B3", "P2"),
        ];
        let records = vec![record("P1", "A1", 1), record("P1", "A1", 2)];
        let mut window = resolve(ReportKind::Monthly, 2, 2024);
        window.current_months = vec![1, 2];
        window.current_month_count = 2;
        let result = compliance(&roster, &records, &window, GroupingRole::ByPuskesmas);

        assert_eq!(result.per_entity[0].rate, 100.0);
        assert_eq!(result.per_entity[0].village_count, Some(1));
        assert_eq!(result.per_entity[1].rate, 0.0);
        assert_eq!(result.per_entity[1].target_count, 6);
        assert!((result.overall_rate - 25.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_submissions_do_not_inflate_compliance() {
        let roster = vec![roster_entry(1, "V1", "X")];
        let records = vec![record("X", "V1", 1), record("X", "V1", 1)];
        let window = resolve(ReportKind::Monthly, 1, 2024);
        let result = compliance(&roster, &records, &window, GroupingRole::ByVillage);
        assert_eq!(result.per_entity[0].actual_count, 1);
        assert_eq!(result.overall_rate, 100.0);
    }

    #[test]
    fn same_named_villages_in_different_puskesmas_stay_distinct() {
        // "SUKAMAJU" exists under both P1 and P2; only P1's submitted.
        let roster = vec![
            roster_entry(1, "SUKAMAJU", "P1"),
            roster_entry(2, "SUKAMAJU", "P2"),
        ];
        let records = vec![record("P1", "SUKAMAJU", 1)];
        let window = resolve(ReportKind::Monthly, 1, 2024);

        let by_village = compliance(&roster, &records, &window, GroupingRole::ByVillage);
        assert_eq!(by_village.per_entity.len(), 2);
        assert_eq!(by_village.per_entity[0].actual_count, 1);
        assert_eq!(by_village.per_entity[0].rate, 100.0);
        assert_eq!(by_village.per_entity[1].actual_count, 0);
        assert_eq!(by_village.per_entity[1].rate, 0.0);
        assert!((by_village.overall_rate - 50.0).abs() < 1e-9);

        // The silent P2 must not be credited with P1's submission.
        let by_puskesmas = compliance(&roster, &records, &window, GroupingRole::ByPuskesmas);
        assert_eq!(by_puskesmas.per_entity[0].name, "P1");
        assert_eq!(by_puskesmas.per_entity[0].rate, 100.0);
        assert_eq!(by_puskesmas.per_entity[1].name, "P2");
        assert_eq!(by_puskesmas.per_entity[1].actual_count, 0);
    }

    #[test]
    fn compliance_with_empty_roster_is_zero_not_nan() {
        let window = resolve(ReportKind::Monthly, 5, 2024);
        let result = compliance(&[], &[record("X", "V1", 5)], &window, GroupingRole::ByVillage);
        assert_eq!(result.overall_rate, 0.0);
        assert!(result.per_entity.is_empty());
    }

    #[test]
    fn completeness_counts_zero_per_policy() {
        let mut r = record("X", "V1", 3);
        r.kia_booklet = 0;
        let window = resolve(ReportKind::Monthly, 3, 2024);

        let strict = completeness(
            std::slice::from_ref(&r),
            &window,
            GroupingRole::ByVillage,
            ZeroPolicy::ZeroCountsAsMissing,
        );
        let kia = strict
            .per_column
            .iter()
            .find(|c| c.name == "PunyaKIA")
            .unwrap();
        assert_eq!(kia.rate, 0.0);
        // Five of six mandatory columns populated.
        let expected = 5.0 / 6.0 * 100.0;
        assert!((strict.overall_rate - expected).abs() < 1e-9);
        assert!((strict.per_entity[0].rate - expected).abs() < 1e-9);

        let lenient = completeness(
            std::slice::from_ref(&r),
            &window,
            GroupingRole::ByVillage,
            ZeroPolicy::ZeroCountsAsReported,
        );
        assert_eq!(lenient.overall_rate, 100.0);
    }

    #[test]
    fn completeness_overall_is_column_weighted() {
        // Two records: one fully populated, one with two empty columns.
        // Column-weighted mean differs from the row-cell ratio only in
        // weighting, but must equal mean(per-column rates) exactly.
        let full = record("X", "V1", 2);
        let mut partial = record("X", "V2", 2);
        partial.weighed = 0;
        partial.kia_booklet = 0;
        let window = resolve(ReportKind::Monthly, 2, 2024);
        let result = completeness(
            &[full, partial],
            &window,
            GroupingRole::ByVillage,
            ZeroPolicy::ZeroCountsAsMissing,
        );
        let mean: f64 = result.per_column.iter().map(|c| c.rate).sum::<f64>()
            / result.per_column.len() as f64;
        assert!((result.overall_rate - mean).abs() < 1e-9);
    }

    #[test]
    fn completeness_on_empty_period_is_zero() {
        let window = resolve(ReportKind::Monthly, 6, 2024);
        let result = completeness(
            &[],
            &window,
            GroupingRole::ByPuskesmas,
            ZeroPolicy::ZeroCountsAsMissing,
        );
        assert_eq!(result.overall_rate, 0.0);
        assert!(result.per_entity.is_empty());
    }
}
