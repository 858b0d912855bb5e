// Entry point and high-level CLI flow.
//
// - Option [1] loads and cleans the survey recap and village roster CSVs,
//   printing diagnostics.
// - Option [2] asks for the report window (monthly or quarterly/triwulan),
//   year and grouping, then runs the audit, growth and CIAF engines and
//   writes per-report CSVs plus a JSON summary.
// - After generating reports, the user can choose to go back to the
//   selection menu or exit.
mod audit;
mod ciaf;
mod growth;
mod loader;
mod output;
mod period;
mod types;
mod util;

use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::Mutex;
use types::{GroupingRole, ReferenceVillage, SummaryStats, SurveyRecord};

// Simple in-memory app state so we only load/clean the CSVs once but can
// generate reports multiple times in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        survey: None,
        roster: None,
    })
});

struct AppState {
    survey: Option<Vec<SurveyRecord>>,
    roster: Option<Vec<ReferenceVillage>>,
}

/// Read a single line of input after printing a prompt.
fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Keep asking until the input parses as a number within `range`.
fn read_number(prompt: &str, range: std::ops::RangeInclusive<i64>) -> i64 {
    loop {
        if let Ok(n) = read_line(prompt).parse::<i64>() {
            if range.contains(&n) {
                return n;
            }
        }
        println!(
            "Invalid choice. Please enter a number between {} and {}.",
            range.start(),
            range.end()
        );
    }
}

/// Ask the user whether to go back to the report selection menu after
/// generating reports.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        match read_line("Back to Report Selection (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: load and clean the survey and roster CSVs.
fn handle_load() {
    let survey_path = "survey_recap.csv";
    let roster_path = "village_roster.csv";

    let survey = match loader::load_survey(survey_path) {
        Ok((data, report)) => {
            println!(
                "Survey: {} rows loaded, {} kept, {} parse errors, {} aggregator rows excluded.",
                util::format_int(report.total_rows as i64),
                util::format_int(report.kept_rows as i64),
                util::format_int(report.parse_errors as i64),
                util::format_int(report.excluded_aggregators as i64)
            );
            data
        }
        Err(e) => {
            eprintln!("Failed to load {}: {}\n", survey_path, e);
            return;
        }
    };
    let roster = match loader::load_roster(roster_path) {
        Ok((data, report)) => {
            println!(
                "Roster: {} villages kept, {} aggregator rows excluded.\n",
                util::format_int(report.kept_rows as i64),
                util::format_int(report.excluded_aggregators as i64)
            );
            data
        }
        Err(e) => {
            eprintln!("Failed to load {}: {}\n", roster_path, e);
            return;
        }
    };

    let mut state = APP_STATE.lock().unwrap();
    state.survey = Some(survey);
    state.roster = Some(roster);
}

/// Handle option [2]: resolve the period, run all three engines and write
/// the report files.
fn handle_generate_reports() {
    let (survey, roster) = {
        let state = APP_STATE.lock().unwrap();
        (state.survey.clone(), state.roster.clone())
    };
    let (Some(survey), Some(roster)) = (survey, roster) else {
        println!("Error: No data loaded. Please load the CSV files first (option 1).\n");
        return;
    };

    println!("Report type: [1] Monthly  [2] Quarterly (triwulan)");
    let kind = if read_number("Enter choice: ", 1..=2) == 1 {
        period::ReportKind::Monthly
    } else {
        period::ReportKind::Quarterly
    };
    let selector = match kind {
        period::ReportKind::Monthly => read_number("Month (1-12): ", 1..=12) as u32,
        period::ReportKind::Quarterly => read_number("Quarter (1-4): ", 1..=4) as u32,
    };
    let year = read_number("Year: ", 2000..=2100) as i32;
    println!("Grouping: [1] By Puskesmas  [2] By village");
    let role = if read_number("Enter choice: ", 1..=2) == 1 {
        GroupingRole::ByPuskesmas
    } else {
        GroupingRole::ByVillage
    };

    let window = period::resolve(kind, selector, year);
    let current: Vec<SurveyRecord> = survey
        .iter()
        .filter(|r| r.year == window.year && window.current_months.contains(&r.month))
        .cloned()
        .collect();
    let previous: Vec<SurveyRecord> = survey
        .iter()
        .filter(|r| r.year == window.previous_year && window.previous_months.contains(&r.month))
        .cloned()
        .collect();
    let year_records: Vec<SurveyRecord> = survey
        .iter()
        .filter(|r| r.year == window.year)
        .cloned()
        .collect();

    println!("\nGenerating reports...");
    println!("Outputs saved to individual files...\n");

    let compliance = audit::compliance(&roster, &survey, &window, role);
    let compliance_rows = output::compliance_rows(&compliance);
    let file1 = "report1_compliance.csv";
    if let Err(e) = output::write_csv(file1, &compliance_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 1: Reporting Compliance Audit");
    println!(
        "(Overall rate: {}%)\n",
        util::format_number(compliance.overall_rate, 2)
    );
    output::preview_table_rows(&compliance_rows, 5);
    println!("(Full table exported to {})\n", file1);

    let completeness = audit::completeness(
        &survey,
        &window,
        role,
        audit::ZeroPolicy::ZeroCountsAsMissing,
    );
    let completeness_rows = output::completeness_rows(&completeness);
    let file2 = "report2_completeness.csv";
    if let Err(e) = output::write_csv(file2, &completeness_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 2: Mandatory Field Completeness");
    println!(
        "(Overall rate: {}%)\n",
        util::format_number(completeness.overall_rate, 2)
    );
    output::preview_table_rows(&completeness_rows, 6);
    println!("(Full table exported to {})\n", file2);

    let growth = growth::growth_metrics(
        &current,
        &previous,
        role,
        window.current_month_count,
        window.previous_month_count,
    );
    let indicator_rows = output::growth_indicator_rows(&growth);
    let entity_rows = output::growth_entity_rows(&growth);
    let file3 = "report3_growth_scorecard.csv";
    if let Err(e) = output::write_csv(file3, &indicator_rows) {
        eprintln!("Write error: {}", e);
    }
    let file4 = "report4_growth_entities.csv";
    if let Err(e) = output::write_csv(file4, &entity_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Reports 3 and 4: Growth Scorecard vs. Previous Period\n");
    output::preview_table_rows(&indicator_rows, 7);
    println!("(Full tables exported to {} and {})\n", file3, file4);

    let trend = growth::trend_metrics(&year_records);
    let trend_rows = output::trend_rows(&trend);
    let file5 = "report5_monthly_trend.csv";
    if let Err(e) = output::write_csv(file5, &trend_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 5: Monthly Trend ({})", window.year);
    output::preview_table_rows(&trend_rows, 12);
    println!("(Full table exported to {})\n", file5);

    let ciaf_config = ciaf::CiafConfig::default();
    let ciaf_summary = ciaf::ciaf_metrics(&current, &ciaf_config);
    let villages = ciaf::ciaf_per_village(&current, &ciaf_config);
    let village_rows = output::ciaf_village_rows(&villages);
    let file6 = "report6_ciaf_triage.csv";
    if let Err(e) = output::write_csv(file6, &village_rows) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 6: CIAF Classification and Village Triage");
    println!(
        "(Failure: {} of {} children, {}%; triple failure: {})\n",
        util::format_int(ciaf_summary.kpi.total_failure as i64),
        util::format_int(ciaf_summary.kpi.total_children as i64),
        util::format_number(ciaf_summary.kpi.failure_rate, 2),
        util::format_int(ciaf_summary.kpi.triple_failure_count as i64)
    );
    output::preview_table_rows(&village_rows, 5);
    println!("(Full table exported to {})\n", file6);

    let villages_seen: std::collections::HashSet<(&str, &str)> = survey
        .iter()
        .filter_map(|r| r.village.as_deref().map(|v| (r.puskesmas.as_str(), v)))
        .collect();
    let puskesmas_seen: std::collections::HashSet<&str> =
        survey.iter().map(|r| r.puskesmas.as_str()).collect();
    let summary = SummaryStats {
        total_records: survey.len(),
        total_villages: villages_seen.len(),
        total_puskesmas: puskesmas_seen.len(),
        compliance_rate: compliance.overall_rate,
        completeness_rate: completeness.overall_rate,
        ciaf_failure_rate: ciaf_summary.kpi.failure_rate,
        ciaf_triple_failure_count: ciaf_summary.kpi.triple_failure_count,
    };
    if let Err(e) = output::write_json("summary.json", &summary) {
        eprintln!("Write error: {}", e);
    }
    println!("Summary Stats (summary.json):");
    println!(
        "{{\"compliance_rate\": {}, \"ciaf_failure_rate\": {}}}\n",
        util::format_number(summary.compliance_rate, 2),
        util::format_number(summary.ciaf_failure_rate, 2)
    );
}

fn main() {
    loop {
        println!("Select an option:");
        println!("[1] Load the data files");
        println!("[2] Generate Reports\n");
        match read_line("Enter choice: ").as_str() {
            "1" => {
                handle_load();
            }
            "2" => {
                println!("");
                handle_generate_reports();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}
