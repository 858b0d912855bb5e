use crate::types::{RawRosterRow, RawSurveyRow, ReferenceVillage, SurveyRecord};
use crate::util::{parse_i32_safe, parse_u32_safe};
use csv::ReaderBuilder;
use std::error::Error;

/// Puskesmas-name fragments that mark district-level aggregator accounts.
/// Matching rows are excluded at ingestion; they are never roster entities
/// and never contribute survey counts.
const AGGREGATOR_PATTERNS: &[&str] = &["DINAS", "KABUPATEN"];

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub parse_errors: usize,
    pub excluded_aggregators: usize,
}

fn is_aggregator(puskesmas: &str) -> bool {
    let upper = puskesmas.to_uppercase();
    AGGREGATOR_PATTERNS.iter().any(|p| upper.contains(p))
}

/// Load and clean the survey recap CSV.
///
/// Identity fields (Puskesmas, year, month 1-12) must parse or the row is
/// dropped as a parse error; every count column is coerced to 0 when
/// missing or unparsable, per the ingestion contract the engines rely on.
pub fn load_survey(path: &str) -> Result<(Vec<SurveyRecord>, LoadReport), Box<dyn Error>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut excluded_aggregators = 0usize;
    let mut records: Vec<SurveyRecord> = Vec::new();

    for result in rdr.deserialize::<RawSurveyRow>() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                parse_errors += 1;
                continue;
            }
        };

        let puskesmas = match row.puskesmas.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => {
                parse_errors += 1;
                continue;
            }
        };
        if is_aggregator(&puskesmas) {
            excluded_aggregators += 1;
            continue;
        }
        let year = match parse_i32_safe(row.tahun.as_deref()) {
            Some(y) => y,
            None => {
                parse_errors += 1;
                continue;
            }
        };
        let month = match parse_u32_safe(row.bulan.as_deref()) {
            Some(m) if (1..=12).contains(&m) => m,
            _ => {
                parse_errors += 1;
                continue;
            }
        };
        let village = row
            .desa
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string());

        let count = |s: &Option<String>| parse_u32_safe(s.as_deref()).unwrap_or(0);
        records.push(SurveyRecord {
            puskesmas,
            village,
            year,
            month,
            target_male: count(&row.sasaran_laki),
            target_female: count(&row.sasaran_perempuan),
            weighed: count(&row.ditimbang),
            measured: count(&row.diukur),
            weighed_measured: count(&row.ditimbang_diukur),
            very_short: count(&row.sangat_pendek),
            short: count(&row.pendek),
            wasted_severe: count(&row.gizi_buruk),
            wasted_moderate: count(&row.gizi_kurang),
            underweight: count(&row.bb_kurang),
            overweight: count(&row.gemuk),
            gained_weight: count(&row.naik),
            no_gain: count(&row.tidak_naik),
            not_weighed_prior: count(&row.tidak_ditimbang_bulan_lalu),
            kia_booklet: count(&row.punya_kia),
            weighed_measured_corrected: count(&row.daksen),
        });
    }

    let report = LoadReport {
        total_rows,
        kept_rows: records.len(),
        parse_errors,
        excluded_aggregators,
    };
    Ok((records, report))
}

/// Load the reference-village roster that defines the compliance
/// denominator. District aggregator accounts are dropped here so no
/// downstream consumer ever sees them.
pub fn load_roster(path: &str) -> Result<(Vec<ReferenceVillage>, LoadReport), Box<dyn Error>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut excluded_aggregators = 0usize;
    let mut roster: Vec<ReferenceVillage> = Vec::new();

    for result in rdr.deserialize::<RawRosterRow>() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                parse_errors += 1;
                continue;
            }
        };
        let (Some(village), Some(puskesmas)) = (
            row.desa.as_deref().map(str::trim).filter(|v| !v.is_empty()),
            row.puskesmas
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty()),
        ) else {
            parse_errors += 1;
            continue;
        };
        if is_aggregator(puskesmas) {
            excluded_aggregators += 1;
            continue;
        }
        let id = parse_u32_safe(row.id.as_deref()).unwrap_or(total_rows as u32);
        roster.push(ReferenceVillage {
            id,
            village: village.to_string(),
            puskesmas: puskesmas.to_string(),
        });
    }

    let report = LoadReport {
        total_rows,
        kept_rows: roster.len(),
        parse_errors,
        excluded_aggregators,
    };
    Ok((roster, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregator_patterns_match_case_insensitively() {
        assert!(is_aggregator("Dinas Kesehatan"));
        assert!(is_aggregator("KABUPATEN BANDUNG"));
        assert!(!is_aggregator("Puskesmas Cibiru"));
    }
}
