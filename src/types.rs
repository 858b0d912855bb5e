use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One raw survey row as exported from the e-PPGBM recap sheet. Every count
/// arrives as an optional string; the loader coerces missing/unparsable
/// cells to 0 per the ingestion contract.
#[derive(Debug, Deserialize)]
pub struct RawSurveyRow {
    #[serde(rename = "Puskesmas")]
    pub puskesmas: Option<String>,
    #[serde(rename = "Desa")]
    pub desa: Option<String>,
    #[serde(rename = "Tahun")]
    pub tahun: Option<String>,
    #[serde(rename = "Bulan")]
    pub bulan: Option<String>,
    #[serde(rename = "SasaranLaki")]
    pub sasaran_laki: Option<String>,
    #[serde(rename = "SasaranPerempuan")]
    pub sasaran_perempuan: Option<String>,
    #[serde(rename = "Ditimbang")]
    pub ditimbang: Option<String>,
    #[serde(rename = "Diukur")]
    pub diukur: Option<String>,
    #[serde(rename = "DitimbangDiukur")]
    pub ditimbang_diukur: Option<String>,
    #[serde(rename = "SangatPendek")]
    pub sangat_pendek: Option<String>,
    #[serde(rename = "Pendek")]
    pub pendek: Option<String>,
    #[serde(rename = "GiziBuruk")]
    pub gizi_buruk: Option<String>,
    #[serde(rename = "GiziKurang")]
    pub gizi_kurang: Option<String>,
    #[serde(rename = "BBKurang")]
    pub bb_kurang: Option<String>,
    #[serde(rename = "Gemuk")]
    pub gemuk: Option<String>,
    #[serde(rename = "Naik")]
    pub naik: Option<String>,
    #[serde(rename = "TidakNaik")]
    pub tidak_naik: Option<String>,
    #[serde(rename = "TidakDitimbangBulanLalu")]
    pub tidak_ditimbang_bulan_lalu: Option<String>,
    #[serde(rename = "PunyaKIA")]
    pub punya_kia: Option<String>,
    #[serde(rename = "Daksen")]
    pub daksen: Option<String>,
}

/// One raw roster row from the reference-village master list.
#[derive(Debug, Deserialize)]
pub struct RawRosterRow {
    #[serde(rename = "ID")]
    pub id: Option<String>,
    #[serde(rename = "Desa")]
    pub desa: Option<String>,
    #[serde(rename = "Puskesmas")]
    pub puskesmas: Option<String>,
}

/// One clean village-month observation. All counts are non-negative and
/// already coerced; `village` is absent for Puskesmas-level datasets.
#[derive(Debug, Clone)]
pub struct SurveyRecord {
    pub puskesmas: String,
    pub village: Option<String>,
    pub year: i32,
    pub month: u32,
    pub target_male: u32,
    pub target_female: u32,
    /// Children weighed this month ("D" / Ditimbang).
    pub weighed: u32,
    /// Children whose height/length was measured.
    pub measured: u32,
    /// Children both weighed and measured; the prevalence denominator.
    pub weighed_measured: u32,
    pub very_short: u32,
    pub short: u32,
    pub wasted_severe: u32,
    pub wasted_moderate: u32,
    pub underweight: u32,
    pub overweight: u32,
    /// Children who gained weight since last month ("N" / Naik).
    pub gained_weight: u32,
    /// Children weighed but with no weight gain ("T" / Tidak naik).
    pub no_gain: u32,
    /// Children not weighed the previous month ("O").
    pub not_weighed_prior: u32,
    pub kia_booklet: u32,
    /// Daksen-corrected weighed-and-measured denominator.
    pub weighed_measured_corrected: u32,
}

impl SurveyRecord {
    pub fn target_total(&self) -> u32 {
        self.target_male + self.target_female
    }

    /// Stunting caseload: very-short plus short height-for-age.
    pub fn stunting_cases(&self) -> u32 {
        self.very_short + self.short
    }

    /// Wasting caseload: severe plus moderate weight-for-height deficit.
    pub fn wasting_cases(&self) -> u32 {
        self.wasted_severe + self.wasted_moderate
    }
}

/// Authoritative roster entry; defines the compliance denominator.
#[derive(Debug, Clone)]
pub struct ReferenceVillage {
    pub id: u32,
    pub village: String,
    pub puskesmas: String,
}

/// Identity of one reporting entity. Village names repeat across health
/// centers, so a village-level entity is always qualified by its
/// Puskesmas; the bare name is only a display label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey {
    pub puskesmas: String,
    pub village: Option<String>,
}

impl EntityKey {
    pub fn display_name(&self) -> String {
        match &self.village {
            Some(v) => v.clone(),
            None => self.puskesmas.clone(),
        }
    }
}

/// How records and roster entries are grouped into reporting entities.
///
/// District-scoped viewers group by Puskesmas; a viewer scoped to a single
/// Puskesmas groups by village. The key selection lives here so no engine
/// ever branches on the role internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingRole {
    ByPuskesmas,
    ByVillage,
}

impl GroupingRole {
    pub fn record_key(self, r: &SurveyRecord) -> EntityKey {
        match self {
            GroupingRole::ByPuskesmas => EntityKey {
                puskesmas: r.puskesmas.clone(),
                village: None,
            },
            // Puskesmas-level datasets carry no village column; fall back to
            // the Puskesmas name so the row still lands in one bucket.
            GroupingRole::ByVillage => EntityKey {
                puskesmas: r.puskesmas.clone(),
                village: Some(r.village.clone().unwrap_or_else(|| r.puskesmas.clone())),
            },
        }
    }

    pub fn roster_key(self, v: &ReferenceVillage) -> EntityKey {
        match self {
            GroupingRole::ByPuskesmas => EntityKey {
                puskesmas: v.puskesmas.clone(),
                village: None,
            },
            GroupingRole::ByVillage => EntityKey {
                puskesmas: v.puskesmas.clone(),
                village: Some(v.village.clone()),
            },
        }
    }
}

// --- Display rows -----------------------------------------------------------
//
// String-field rows for console previews and CSV export. Engines return
// numeric results; the output layer formats them into these.

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ComplianceDisplayRow {
    #[serde(rename = "Entity")]
    #[tabled(rename = "Entity")]
    pub entity: String,
    #[serde(rename = "Villages")]
    #[tabled(rename = "Villages")]
    pub villages: String,
    #[serde(rename = "Expected")]
    #[tabled(rename = "Expected")]
    pub expected: u64,
    #[serde(rename = "Submitted")]
    #[tabled(rename = "Submitted")]
    pub submitted: u64,
    #[serde(rename = "ComplianceRate")]
    #[tabled(rename = "ComplianceRate")]
    pub compliance_rate: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CompletenessColumnDisplayRow {
    #[serde(rename = "Column")]
    #[tabled(rename = "Column")]
    pub column: String,
    #[serde(rename = "Populated")]
    #[tabled(rename = "Populated")]
    pub populated: u64,
    #[serde(rename = "Records")]
    #[tabled(rename = "Records")]
    pub records: u64,
    #[serde(rename = "CompletenessRate")]
    #[tabled(rename = "CompletenessRate")]
    pub completeness_rate: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GrowthIndicatorDisplayRow {
    #[serde(rename = "Indicator")]
    #[tabled(rename = "Indicator")]
    pub indicator: String,
    #[serde(rename = "Current")]
    #[tabled(rename = "Current")]
    pub current: String,
    #[serde(rename = "Previous")]
    #[tabled(rename = "Previous")]
    pub previous: String,
    #[serde(rename = "Delta")]
    #[tabled(rename = "Delta")]
    pub delta: String,
    #[serde(rename = "Direction")]
    #[tabled(rename = "Direction")]
    pub direction: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GrowthEntityDisplayRow {
    #[serde(rename = "Entity")]
    #[tabled(rename = "Entity")]
    pub entity: String,
    #[serde(rename = "DS")]
    #[tabled(rename = "D/S")]
    pub ds: String,
    #[serde(rename = "ND")]
    #[tabled(rename = "N/D")]
    pub nd: String,
    #[serde(rename = "NDCorrected")]
    #[tabled(rename = "N/D'")]
    pub nd_corrected: String,
    #[serde(rename = "Stunting")]
    #[tabled(rename = "Stunting")]
    pub stunting: String,
    #[serde(rename = "Wasting")]
    #[tabled(rename = "Wasting")]
    pub wasting: String,
    #[serde(rename = "Underweight")]
    #[tabled(rename = "Underweight")]
    pub underweight: String,
    #[serde(rename = "Overweight")]
    #[tabled(rename = "Overweight")]
    pub overweight: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CiafVillageDisplayRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Village")]
    #[tabled(rename = "Village")]
    pub village: String,
    #[serde(rename = "Puskesmas")]
    #[tabled(rename = "Puskesmas")]
    pub puskesmas: String,
    #[serde(rename = "Children")]
    #[tabled(rename = "Children")]
    pub children: u64,
    #[serde(rename = "Failure")]
    #[tabled(rename = "Failure")]
    pub failure: u64,
    #[serde(rename = "FailureRate")]
    #[tabled(rename = "FailureRate")]
    pub failure_rate: String,
    #[serde(rename = "Triple")]
    #[tabled(rename = "Triple")]
    pub triple: u64,
    #[serde(rename = "RiskScore")]
    #[tabled(rename = "RiskScore")]
    pub risk_score: String,
    #[serde(rename = "Band")]
    #[tabled(rename = "Band")]
    pub band: String,
    #[serde(rename = "Recommendation")]
    #[tabled(rename = "Recommendation")]
    pub recommendation: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TrendDisplayRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "Stunting")]
    #[tabled(rename = "Stunting")]
    pub stunting: String,
    #[serde(rename = "Wasting")]
    #[tabled(rename = "Wasting")]
    pub wasting: String,
    #[serde(rename = "Underweight")]
    #[tabled(rename = "Underweight")]
    pub underweight: String,
    #[serde(rename = "Overweight")]
    #[tabled(rename = "Overweight")]
    pub overweight: String,
    #[serde(rename = "DS")]
    #[tabled(rename = "D/S")]
    pub ds: String,
    #[serde(rename = "ND")]
    #[tabled(rename = "N/D")]
    pub nd: String,
    #[serde(rename = "KIA")]
    #[tabled(rename = "KIA")]
    pub kia: String,
}

/// Headline numbers for the `summary.json` export.
#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub total_records: usize,
    pub total_villages: usize,
    pub total_puskesmas: usize,
    pub compliance_rate: f64,
    pub completeness_rate: f64,
    pub ciaf_failure_rate: f64,
    pub ciaf_triple_failure_count: u64,
}
