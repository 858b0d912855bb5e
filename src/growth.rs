// Growth scorecards (current vs. previous period) and the 12-month trend.
//
// Multi-month periods are cumulative sums of counts, never averages of
// monthly rates; each period's prevalence uses that period's own
// weighed-and-measured denominator. The only place the month count enters
// is the D/S coverage base: the target population is a per-village monthly
// figure, so a k-month window expects each village's target k times.
use crate::types::{EntityKey, GroupingRole, SurveyRecord};
use crate::util::{month_label, pct};
use std::collections::{BTreeMap, HashMap};

pub const IND_STUNTING: &str = "stunting_prevalence";
pub const IND_WASTING: &str = "wasting_prevalence";
pub const IND_UNDERWEIGHT: &str = "underweight_prevalence";
pub const IND_OVERWEIGHT: &str = "overweight_prevalence";
pub const IND_COVERAGE_DS: &str = "weighing_coverage_ds";
pub const IND_GAIN_ND: &str = "weight_gain_nd";
pub const IND_GAIN_ND_CORRECTED: &str = "weight_gain_nd_corrected";

/// Which direction counts as an improvement for an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Adverse prevalence: a decrease is an improvement.
    LowerIsBetter,
    /// Coverage/process indicator: an increase is an improvement.
    HigherIsBetter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorScore {
    pub current: f64,
    pub previous: f64,
    pub delta: f64,
    pub is_improvement: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrowthEntityRow {
    pub name: String,
    pub ds: f64,
    pub nd: f64,
    pub nd_corrected: f64,
    pub stunting: f64,
    pub wasting: f64,
    pub underweight: f64,
    pub overweight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrowthMetricsResult {
    pub indicators: BTreeMap<String, IndicatorScore>,
    pub per_entity: Vec<GrowthEntityRow>,
}

/// One observed month of the trend series. Months wholly absent from the
/// input are omitted, not zero-filled.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub month: u32,
    pub month_label: String,
    pub rates: BTreeMap<String, f64>,
}

/// Cumulative counts over a set of records.
#[derive(Debug, Default, Clone)]
struct Totals {
    weighed: u64,
    measured: u64,
    weighed_measured: u64,
    stunting: u64,
    wasting: u64,
    underweight: u64,
    overweight: u64,
    gained: u64,
    no_gain: u64,
    not_weighed_prior: u64,
    kia: u64,
    corrected: u64,
    target_rows: u64,
}

impl Totals {
    fn add(&mut self, r: &SurveyRecord) {
        self.weighed += r.weighed as u64;
        self.measured += r.measured as u64;
        self.weighed_measured += r.weighed_measured as u64;
        self.stunting += r.stunting_cases() as u64;
        self.wasting += r.wasting_cases() as u64;
        self.underweight += r.underweight as u64;
        self.overweight += r.overweight as u64;
        self.gained += r.gained_weight as u64;
        self.no_gain += r.no_gain as u64;
        self.not_weighed_prior += r.not_weighed_prior as u64;
        self.kia += r.kia_booklet as u64;
        self.corrected += r.weighed_measured_corrected as u64;
        self.target_rows += r.target_total() as u64;
    }

    fn of(records: &[&SurveyRecord]) -> Totals {
        let mut t = Totals::default();
        for r in records {
            t.add(r);
        }
        t
    }
}

/// Monthly target population base: each village's target counted once,
/// robust against the same figure being repeated on every monthly row.
fn monthly_target_base<'a, I>(records: I) -> u64
where
    I: IntoIterator<Item = &'a SurveyRecord>,
{
    let mut per_village: HashMap<(String, String), u64> = HashMap::new();
    for r in records {
        let key = (r.puskesmas.clone(), r.village.clone().unwrap_or_default());
        let e = per_village.entry(key).or_insert(0);
        *e = (*e).max(r.target_total() as u64);
    }
    per_village.values().sum()
}

fn score(current: f64, previous: f64, direction: Direction) -> IndicatorScore {
    let delta = current - previous;
    let is_improvement = match direction {
        Direction::LowerIsBetter => delta < 0.0,
        Direction::HigherIsBetter => delta > 0.0,
    };
    IndicatorScore {
        current,
        previous,
        delta,
        is_improvement,
    }
}

fn period_rates(records: &[SurveyRecord], month_count: usize) -> (Totals, f64, f64, f64) {
    let refs: Vec<&SurveyRecord> = records.iter().collect();
    let totals = Totals::of(&refs);
    let base = monthly_target_base(records) * month_count as u64;
    let ds = pct(totals.weighed, base);
    let nd = pct(totals.gained, totals.weighed);
    let nd_corrected = pct(totals.gained, totals.corrected);
    (totals, ds, nd, nd_corrected)
}

/// Current-vs-previous scorecard for the fixed indicator set, plus the
/// per-entity summary table grouped by `role`.
pub fn growth_metrics(
    current: &[SurveyRecord],
    previous: &[SurveyRecord],
    role: GroupingRole,
    current_month_count: usize,
    previous_month_count: usize,
) -> GrowthMetricsResult {
    let (cur, cur_ds, cur_nd, cur_ndc) = period_rates(current, current_month_count);
    let (prev, prev_ds, prev_nd, prev_ndc) = period_rates(previous, previous_month_count);

    let mut indicators = BTreeMap::new();
    indicators.insert(
        IND_STUNTING.to_string(),
        score(
            pct(cur.stunting, cur.weighed_measured),
            pct(prev.stunting, prev.weighed_measured),
            Direction::LowerIsBetter,
        ),
    );
    indicators.insert(
        IND_WASTING.to_string(),
        score(
            pct(cur.wasting, cur.weighed_measured),
            pct(prev.wasting, prev.weighed_measured),
            Direction::LowerIsBetter,
        ),
    );
    indicators.insert(
        IND_UNDERWEIGHT.to_string(),
        score(
            pct(cur.underweight, cur.weighed_measured),
            pct(prev.underweight, prev.weighed_measured),
            Direction::LowerIsBetter,
        ),
    );
    indicators.insert(
        IND_OVERWEIGHT.to_string(),
        score(
            pct(cur.overweight, cur.weighed_measured),
            pct(prev.overweight, prev.weighed_measured),
            Direction::LowerIsBetter,
        ),
    );
    indicators.insert(
        IND_COVERAGE_DS.to_string(),
        score(cur_ds, prev_ds, Direction::HigherIsBetter),
    );
    indicators.insert(
        IND_GAIN_ND.to_string(),
        score(cur_nd, prev_nd, Direction::HigherIsBetter),
    );
    indicators.insert(
        IND_GAIN_ND_CORRECTED.to_string(),
        score(cur_ndc, prev_ndc, Direction::HigherIsBetter),
    );

    // Per-entity table over the current period only.
    let mut groups: BTreeMap<EntityKey, Vec<&SurveyRecord>> = BTreeMap::new();
    for r in current {
        groups.entry(role.record_key(r)).or_default().push(r);
    }
    let per_entity = groups
        .into_iter()
        .map(|(key, rows)| {
            let totals = Totals::of(&rows);
            let base =
                monthly_target_base(rows.iter().copied()) * current_month_count as u64;
            GrowthEntityRow {
                name: key.display_name(),
                ds: pct(totals.weighed, base),
                nd: pct(totals.gained, totals.weighed),
                nd_corrected: pct(totals.gained, totals.corrected),
                stunting: pct(totals.stunting, totals.weighed_measured),
                wasting: pct(totals.wasting, totals.weighed_measured),
                underweight: pct(totals.underweight, totals.weighed_measured),
                overweight: pct(totals.overweight, totals.weighed_measured),
            }
        })
        .collect();

    GrowthMetricsResult {
        indicators,
        per_entity,
    }
}

/// Monthly trend series over one year of records, ignoring any month
/// filter the caller may have applied elsewhere.
pub fn trend_metrics(year_records: &[SurveyRecord]) -> Vec<TrendPoint> {
    let mut by_month: BTreeMap<u32, Vec<&SurveyRecord>> = BTreeMap::new();
    for r in year_records {
        by_month.entry(r.month).or_default().push(r);
    }

    by_month
        .into_iter()
        .map(|(month, rows)| {
            let totals = Totals::of(&rows);
            // Single-month group: the summed row targets are the base.
            let target = totals.target_rows;
            let mut rates = BTreeMap::new();
            rates.insert(IND_STUNTING.to_string(), pct(totals.stunting, totals.weighed_measured));
            rates.insert(IND_WASTING.to_string(), pct(totals.wasting, totals.weighed_measured));
            rates.insert(
                IND_UNDERWEIGHT.to_string(),
                pct(totals.underweight, totals.weighed_measured),
            );
            rates.insert(
                IND_OVERWEIGHT.to_string(),
                pct(totals.overweight, totals.weighed_measured),
            );
            rates.insert("weighed_ds".to_string(), pct(totals.weighed, target));
            rates.insert("measured".to_string(), pct(totals.measured, target));
            rates.insert(
                "weighed_measured".to_string(),
                pct(totals.weighed_measured, target),
            );
            rates.insert("kia_ownership".to_string(), pct(totals.kia, target));
            rates.insert("gained_nd".to_string(), pct(totals.gained, totals.weighed));
            rates.insert(
                "gained_nd_corrected".to_string(),
                pct(totals.gained, totals.corrected),
            );
            rates.insert("no_gain_t".to_string(), pct(totals.no_gain, totals.weighed));
            rates.insert(
                "not_weighed_o".to_string(),
                pct(totals.not_weighed_prior, totals.weighed),
            );
            TrendPoint {
                month,
                month_label: month_label(month),
                rates,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(village: &str, month: u32) -> SurveyRecord {
        SurveyRecord {
            puskesmas: "P".to_string(),
            village: Some(village.to_string()),
            year: 2024,
            month,
            target_male: 25,
            target_female: 25,
            weighed: 40,
            measured: 38,
            weighed_measured: 36,
            very_short: 2,
            short: 2,
            wasted_severe: 1,
            wasted_moderate: 2,
            underweight: 4,
            overweight: 1,
            gained_weight: 28,
            no_gain: 8,
            not_weighed_prior: 4,
            kia_booklet: 35,
            weighed_measured_corrected: 34,
        }
    }

    #[test]
    fn adverse_indicator_improves_downward() {
        // Current: 10 of 100 stunted; previous: 20 of 100.
        let mut cur = record("V", 7);
        cur.very_short = 4;
        cur.short = 6;
        cur.weighed_measured = 100;
        let mut prev = record("V", 6);
        prev.very_short = 8;
        prev.short = 12;
        prev.weighed_measured = 100;

        let result = growth_metrics(&[cur], &[prev], GroupingRole::ByVillage, 1, 1);
        let s = &result.indicators[IND_STUNTING];
        assert_eq!(s.current, 10.0);
        assert_eq!(s.previous, 20.0);
        assert_eq!(s.delta, -10.0);
        assert!(s.is_improvement);
    }

    #[test]
    fn coverage_indicator_improves_upward() {
        let mut cur = record("V", 3);
        cur.weighed = 45;
        let mut prev = record("V", 2);
        prev.weighed = 40;
        let result = growth_metrics(&[cur], &[prev], GroupingRole::ByVillage, 1, 1);
        let ds = &result.indicators[IND_COVERAGE_DS];
        assert_eq!(ds.current, 90.0);
        assert_eq!(ds.previous, 80.0);
        assert!(ds.is_improvement);
    }

    #[test]
    fn cumulative_periods_sum_counts_not_average_rates() {
        // Nine identical monthly rows; Q3's current window covers all nine,
        // its previous window the first six. Rates must come from summed
        // counts, so both windows land on the same per-row prevalence.
        let rows: Vec<SurveyRecord> = (1..=9).map(|m| record("V", m)).collect();
        let current: Vec<SurveyRecord> = rows.clone();
        let previous: Vec<SurveyRecord> = rows[..6].to_vec();
        let result = growth_metrics(&current, &previous, GroupingRole::ByVillage, 9, 6);

        let s = &result.indicators[IND_STUNTING];
        // 4 stunted of 36 measured each month, cumulatively unchanged.
        let expected = 4.0 / 36.0 * 100.0;
        assert!((s.current - expected).abs() < 1e-9);
        assert!((s.previous - expected).abs() < 1e-9);

        // D/S: 40 weighed per month against a 50-child monthly target.
        let ds = &result.indicators[IND_COVERAGE_DS];
        assert!((ds.current - 80.0).abs() < 1e-9);
        assert!((ds.previous - 80.0).abs() < 1e-9);
    }

    #[test]
    fn empty_previous_period_yields_zero_rates() {
        let cur = record("V", 1);
        let result = growth_metrics(&[cur], &[], GroupingRole::ByVillage, 1, 12);
        let s = &result.indicators[IND_UNDERWEIGHT];
        assert_eq!(s.previous, 0.0);
        assert!(s.current > 0.0);
    }

    #[test]
    fn per_entity_rows_follow_grouping_role() {
        let records = vec![record("V1", 5), record("V2", 5)];
        let by_village = growth_metrics(&records, &[], GroupingRole::ByVillage, 1, 1);
        assert_eq!(by_village.per_entity.len(), 2);
        let by_puskesmas = growth_metrics(&records, &[], GroupingRole::ByPuskesmas, 1, 1);
        assert_eq!(by_puskesmas.per_entity.len(), 1);
        assert_eq!(by_puskesmas.per_entity[0].name, "P");
    }

    #[test]
    fn same_named_villages_in_different_puskesmas_get_separate_rows() {
        let a = record("SUKAMAJU", 5);
        let mut b = record("SUKAMAJU", 5);
        b.puskesmas = "P2".to_string();
        let result = growth_metrics(&[a, b], &[], GroupingRole::ByVillage, 1, 1);
        assert_eq!(result.per_entity.len(), 2);
        assert_eq!(result.per_entity[0].name, "SUKAMAJU");
        assert_eq!(result.per_entity[1].name, "SUKAMAJU");
        // Each row carries only its own village's counts.
        assert!((result.per_entity[0].ds - 80.0).abs() < 1e-9);
        assert!((result.per_entity[1].ds - 80.0).abs() < 1e-9);
    }

    #[test]
    fn trend_omits_absent_months() {
        let records = vec![record("V", 1), record("V", 2), record("V", 5)];
        let points = trend_metrics(&records);
        let months: Vec<u32> = points.iter().map(|p| p.month).collect();
        assert_eq!(months, vec![1, 2, 5]);
        assert_eq!(points[0].month_label, "Jan");
        assert_eq!(points[2].month_label, "May");
    }

    #[test]
    fn trend_rates_use_the_right_denominators() {
        let r = record("V", 4);
        let points = trend_metrics(&[r]);
        let rates = &points[0].rates;
        // Prevalence over weighed-and-measured (36).
        assert!((rates[IND_STUNTING] - 4.0 / 36.0 * 100.0).abs() < 1e-9);
        // Coverage over target population (50).
        assert!((rates["weighed_ds"] - 80.0).abs() < 1e-9);
        // N over weighed (40), corrected over Daksen denominator (34).
        assert!((rates["gained_nd"] - 70.0).abs() < 1e-9);
        assert!((rates["gained_nd_corrected"] - 28.0 / 34.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn growth_metrics_is_deterministic() {
        let records = vec![record("V1", 1), record("V2", 2)];
        let a = growth_metrics(&records, &records, GroupingRole::ByVillage, 2, 2);
        let b = growth_metrics(&records, &records, GroupingRole::ByVillage, 2, 2);
        assert_eq!(a, b);
    }
}
