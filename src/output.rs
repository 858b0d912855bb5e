// Presentation layer: turns the numeric engine results into formatted
// display rows, markdown console previews and CSV/JSON exports. All
// rounding for display happens here, never inside the engines.
use crate::audit::{ComplianceResult, CompletenessResult};
use crate::ciaf::CiafVillageSummary;
use crate::growth::{GrowthMetricsResult, TrendPoint};
use crate::types::{
    CiafVillageDisplayRow, ComplianceDisplayRow, CompletenessColumnDisplayRow,
    GrowthEntityDisplayRow, GrowthIndicatorDisplayRow, TrendDisplayRow,
};
use crate::util::format_number;
use serde::Serialize;
use std::error::Error;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &str, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn compliance_rows(result: &ComplianceResult) -> Vec<ComplianceDisplayRow> {
    result
        .per_entity
        .iter()
        .map(|e| ComplianceDisplayRow {
            entity: e.name.clone(),
            villages: e
                .village_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
            expected: e.target_count,
            submitted: e.actual_count,
            compliance_rate: format_number(e.rate, 2),
        })
        .collect()
}

pub fn completeness_rows(result: &CompletenessResult) -> Vec<CompletenessColumnDisplayRow> {
    result
        .per_column
        .iter()
        .map(|c| CompletenessColumnDisplayRow {
            column: c.name.to_string(),
            populated: c.populated,
            records: c.records,
            completeness_rate: format_number(c.rate, 2),
        })
        .collect()
}

pub fn growth_indicator_rows(result: &GrowthMetricsResult) -> Vec<GrowthIndicatorDisplayRow> {
    result
        .indicators
        .iter()
        .map(|(name, s)| GrowthIndicatorDisplayRow {
            indicator: name.clone(),
            current: format_number(s.current, 2),
            previous: format_number(s.previous, 2),
            delta: format_number(s.delta, 2),
            direction: if s.is_improvement {
                "Improved".to_string()
            } else {
                "Not improved".to_string()
            },
        })
        .collect()
}

pub fn growth_entity_rows(result: &GrowthMetricsResult) -> Vec<GrowthEntityDisplayRow> {
    result
        .per_entity
        .iter()
        .map(|e| GrowthEntityDisplayRow {
            entity: e.name.clone(),
            ds: format_number(e.ds, 2),
            nd: format_number(e.nd, 2),
            nd_corrected: format_number(e.nd_corrected, 2),
            stunting: format_number(e.stunting, 2),
            wasting: format_number(e.wasting, 2),
            underweight: format_number(e.underweight, 2),
            overweight: format_number(e.overweight, 2),
        })
        .collect()
}

pub fn trend_rows(points: &[TrendPoint]) -> Vec<TrendDisplayRow> {
    let rate = |p: &TrendPoint, key: &str| {
        format_number(p.rates.get(key).copied().unwrap_or(0.0), 2)
    };
    points
        .iter()
        .map(|p| TrendDisplayRow {
            month: p.month_label.clone(),
            stunting: rate(p, crate::growth::IND_STUNTING),
            wasting: rate(p, crate::growth::IND_WASTING),
            underweight: rate(p, crate::growth::IND_UNDERWEIGHT),
            overweight: rate(p, crate::growth::IND_OVERWEIGHT),
            ds: rate(p, "weighed_ds"),
            nd: rate(p, "gained_nd"),
            kia: rate(p, "kia_ownership"),
        })
        .collect()
}

pub fn ciaf_village_rows(rows: &[CiafVillageSummary]) -> Vec<CiafVillageDisplayRow> {
    rows.iter()
        .map(|v| CiafVillageDisplayRow {
            rank: v.id,
            village: v.village.clone(),
            puskesmas: v.puskesmas.clone(),
            children: v.total_children,
            failure: v.total_failure,
            failure_rate: format_number(v.failure_rate, 2),
            triple: v.triple_failure_count,
            risk_score: format_number(v.risk_score, 2),
            band: v.band.label().to_string(),
            recommendation: v.recommendation.to_string(),
        })
        .collect()
}
