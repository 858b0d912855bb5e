// Composite Index of Anthropometric Failure (Nandy et al., 2005).
//
// Input rows carry aggregate marginal counts (total stunting, wasting and
// underweight cases per village-month), not per-child joint flags, so the
// intersection counts are estimated. The estimator, the risk-score weights
// and the triage-band thresholds are all named configuration on
// `CiafConfig`, never inline literals, so they can be recalibrated without
// touching the classification math.
use crate::types::SurveyRecord;
use crate::util::pct;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// How joint failure counts are derived from marginal counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapEstimator {
    /// Inclusion-bounded minimum: triple failure = min(S, W, U), pairwise
    /// overlaps bounded the same way. Maximizes overlap, so the failure
    /// union is the most conservative (smallest) consistent estimate.
    MinimumBound,
    /// Independence products: overlaps proportional to marginal prevalence,
    /// rounded and capped by the minimum bounds.
    Proportional,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskWeights {
    pub triple: f64,
    pub double: f64,
    pub single: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandThresholds {
    pub critical: f64,
    pub elevated: f64,
    pub watch: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CiafConfig {
    pub estimator: OverlapEstimator,
    pub weights: RiskWeights,
    pub bands: BandThresholds,
}

impl Default for CiafConfig {
    fn default() -> Self {
        CiafConfig {
            estimator: OverlapEstimator::MinimumBound,
            weights: RiskWeights {
                triple: 5.0,
                double: 3.0,
                single: 1.0,
            },
            bands: BandThresholds {
                critical: 40.0,
                elevated: 20.0,
                watch: 8.0,
            },
        }
    }
}

/// Mutually exclusive CIAF groups. Group letters follow the Nandy scheme;
/// there is no stunting+wasting-without-underweight group in the taxonomy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CiafGroups {
    /// A: no anthropometric failure.
    pub none_a: u64,
    /// B: wasting only.
    pub wasting_only_b: u64,
    /// C: wasting and underweight.
    pub wasting_underweight_c: u64,
    /// D: stunting, wasting and underweight (triple failure).
    pub triple_d: u64,
    /// E: stunting and underweight.
    pub stunting_underweight_e: u64,
    /// F: stunting only.
    pub stunting_only_f: u64,
    /// Y: underweight only.
    pub underweight_only_y: u64,
}

impl CiafGroups {
    pub fn failure_total(&self) -> u64 {
        self.wasting_only_b
            + self.wasting_underweight_c
            + self.triple_d
            + self.stunting_underweight_e
            + self.stunting_only_f
            + self.underweight_only_y
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CiafKpi {
    pub total_failure: u64,
    pub total_children: u64,
    pub failure_rate: f64,
    pub triple_failure_count: u64,
    pub triple_failure_rate: f64,
}

/// Pairwise overlap counts, inclusive of the triple-failure group.
#[derive(Debug, Clone, PartialEq)]
pub struct CiafOverlaps {
    pub stunting_underweight: u64,
    pub wasting_underweight: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CiafGroupShare {
    pub code: &'static str,
    pub label: &'static str,
    pub count: u64,
    /// Share of total children, not of the failure subset.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CiafSummary {
    pub kpi: CiafKpi,
    pub overlaps: CiafOverlaps,
    pub groups: CiafGroups,
    pub distribution: Vec<CiafGroupShare>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationBand {
    Critical,
    Elevated,
    Watch,
    Normal,
}

impl RecommendationBand {
    pub fn label(self) -> &'static str {
        match self {
            RecommendationBand::Critical => "Critical",
            RecommendationBand::Elevated => "Elevated",
            RecommendationBand::Watch => "Watch",
            RecommendationBand::Normal => "Normal",
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            RecommendationBand::Critical => "Immediate field intervention and case audit",
            RecommendationBand::Elevated => "Priority follow-up within the month",
            RecommendationBand::Watch => "Increase monitoring frequency",
            RecommendationBand::Normal => "Routine monthly monitoring",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CiafVillageSummary {
    /// 1-based triage rank after sorting by descending risk score.
    pub id: usize,
    pub village: String,
    pub puskesmas: String,
    pub total_children: u64,
    pub total_failure: u64,
    pub failure_rate: f64,
    pub triple_failure_count: u64,
    /// Wasting+underweight double failures (group C).
    pub double_failure_count: u64,
    pub stunting_only: u64,
    pub wasting_only: u64,
    pub underweight_only: u64,
    pub risk_score: f64,
    pub recommendation: &'static str,
    pub band: RecommendationBand,
}

fn min3(a: u64, b: u64, c: u64) -> u64 {
    a.min(b).min(c)
}

/// Derive the six failure groups from marginal counts.
///
/// The marginals alone cannot pin down the joint distribution; both
/// estimators guarantee non-negative groups, triple <= min(S, W, U), and a
/// partition A+B+C+D+E+F+Y = children. When inconsistent marginals push the
/// estimated failure union past the population, groups are reconciled
/// least-severe-first (B, F, Y, C, E, D) until the partition fits.
pub fn classify(
    stunting: u64,
    wasting: u64,
    underweight: u64,
    children: u64,
    estimator: OverlapEstimator,
) -> CiafGroups {
    let (d, c, e) = match estimator {
        OverlapEstimator::MinimumBound => {
            let d = min3(stunting, wasting, underweight);
            let c = wasting.min(underweight) - d;
            let e = stunting.min(underweight) - d;
            (d, c, e)
        }
        OverlapEstimator::Proportional => {
            if children == 0 {
                (0, 0, 0)
            } else {
                let n = children as f64;
                let ps = (stunting as f64 / n).min(1.0);
                let pw = (wasting as f64 / n).min(1.0);
                let pu = (underweight as f64 / n).min(1.0);
                let d_cap = min3(stunting, wasting, underweight);
                let d = ((n * ps * pw * pu).round() as u64).min(d_cap);
                let c_cap = wasting.min(underweight) - d;
                let c = ((n * pw * pu * (1.0 - ps)).round() as u64).min(c_cap);
                let e_cap = stunting.min(underweight) - d;
                let e = ((n * ps * pu * (1.0 - pw)).round() as u64).min(e_cap);
                (d, c, e)
            }
        }
    };

    let mut groups = CiafGroups {
        none_a: 0,
        wasting_only_b: wasting.saturating_sub(d + c),
        wasting_underweight_c: c,
        triple_d: d,
        stunting_underweight_e: e,
        stunting_only_f: stunting.saturating_sub(d + e),
        underweight_only_y: underweight.saturating_sub(d + c + e),
    };

    let mut excess = groups.failure_total().saturating_sub(children);
    if excess > 0 {
        let order: [&mut u64; 6] = [
            &mut groups.wasting_only_b,
            &mut groups.stunting_only_f,
            &mut groups.underweight_only_y,
            &mut groups.wasting_underweight_c,
            &mut groups.stunting_underweight_e,
            &mut groups.triple_d,
        ];
        for slot in order {
            let cut = excess.min(*slot);
            *slot -= cut;
            excess -= cut;
            if excess == 0 {
                break;
            }
        }
    }
    groups.none_a = children - groups.failure_total();
    groups
}

fn summarize(groups: &CiafGroups, children: u64) -> (CiafKpi, CiafOverlaps, Vec<CiafGroupShare>) {
    let total_failure = groups.failure_total();
    let kpi = CiafKpi {
        total_failure,
        total_children: children,
        failure_rate: pct(total_failure, children),
        triple_failure_count: groups.triple_d,
        triple_failure_rate: pct(groups.triple_d, children),
    };
    let overlaps = CiafOverlaps {
        stunting_underweight: groups.triple_d + groups.stunting_underweight_e,
        wasting_underweight: groups.triple_d + groups.wasting_underweight_c,
    };
    let distribution = vec![
        share("B", "Wasting only", groups.wasting_only_b, children),
        share(
            "C",
            "Wasting and underweight",
            groups.wasting_underweight_c,
            children,
        ),
        share("D", "Triple failure", groups.triple_d, children),
        share(
            "E",
            "Stunting and underweight",
            groups.stunting_underweight_e,
            children,
        ),
        share("F", "Stunting only", groups.stunting_only_f, children),
        share("Y", "Underweight only", groups.underweight_only_y, children),
    ];
    (kpi, overlaps, distribution)
}

fn share(code: &'static str, label: &'static str, count: u64, children: u64) -> CiafGroupShare {
    CiafGroupShare {
        code,
        label,
        count,
        share: pct(count, children),
    }
}

/// Aggregate CIAF classification over all input records.
pub fn ciaf_metrics(records: &[SurveyRecord], config: &CiafConfig) -> CiafSummary {
    let mut stunting = 0u64;
    let mut wasting = 0u64;
    let mut underweight = 0u64;
    let mut children = 0u64;
    for r in records {
        stunting += r.stunting_cases() as u64;
        wasting += r.wasting_cases() as u64;
        underweight += r.underweight as u64;
        children += r.weighed_measured as u64;
    }
    let groups = classify(stunting, wasting, underweight, children, config.estimator);
    let (kpi, overlaps, distribution) = summarize(&groups, children);
    CiafSummary {
        kpi,
        overlaps,
        groups,
        distribution,
    }
}

fn risk_score(groups: &CiafGroups, children: u64, weights: &RiskWeights) -> f64 {
    if children == 0 {
        return 0.0;
    }
    let singles =
        groups.wasting_only_b + groups.stunting_only_f + groups.underweight_only_y;
    let doubles = groups.wasting_underweight_c + groups.stunting_underweight_e;
    let weighted = weights.triple * groups.triple_d as f64
        + weights.double * doubles as f64
        + weights.single * singles as f64;
    weighted / children as f64 * 100.0
}

fn band_of(score: f64, bands: &BandThresholds) -> RecommendationBand {
    if score >= bands.critical {
        RecommendationBand::Critical
    } else if score >= bands.elevated {
        RecommendationBand::Elevated
    } else if score >= bands.watch {
        RecommendationBand::Watch
    } else {
        RecommendationBand::Normal
    }
}

/// Per-village CIAF triage, sorted by descending risk score. The `id` is
/// the triage rank after sorting.
pub fn ciaf_per_village(records: &[SurveyRecord], config: &CiafConfig) -> Vec<CiafVillageSummary> {
    #[derive(Default)]
    struct Acc {
        stunting: u64,
        wasting: u64,
        underweight: u64,
        children: u64,
    }

    // Village names repeat across health centers; the grouping key is the
    // (Puskesmas, village) pair.
    let mut map: BTreeMap<(String, String), Acc> = BTreeMap::new();
    for r in records {
        let village = r.village.clone().unwrap_or_else(|| r.puskesmas.clone());
        let e = map.entry((r.puskesmas.clone(), village)).or_default();
        e.stunting += r.stunting_cases() as u64;
        e.wasting += r.wasting_cases() as u64;
        e.underweight += r.underweight as u64;
        e.children += r.weighed_measured as u64;
    }

    let mut rows: Vec<CiafVillageSummary> = map
        .into_iter()
        .map(|((puskesmas, village), acc)| {
            let groups = classify(
                acc.stunting,
                acc.wasting,
                acc.underweight,
                acc.children,
                config.estimator,
            );
            let score = risk_score(&groups, acc.children, &config.weights);
            let band = band_of(score, &config.bands);
            CiafVillageSummary {
                id: 0, // assigned after sorting
                village,
                puskesmas,
                total_children: acc.children,
                total_failure: groups.failure_total(),
                failure_rate: pct(groups.failure_total(), acc.children),
                triple_failure_count: groups.triple_d,
                double_failure_count: groups.wasting_underweight_c,
                stunting_only: groups.stunting_only_f,
                wasting_only: groups.wasting_only_b,
                underweight_only: groups.underweight_only_y,
                risk_score: score,
                recommendation: band.recommendation(),
                band,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.risk_score
            .partial_cmp(&a.risk_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.village.cmp(&b.village))
            .then_with(|| a.puskesmas.cmp(&b.puskesmas))
    });
    for (idx, row) in rows.iter_mut().enumerate() {
        row.id = idx + 1;
    }
    rows
}
