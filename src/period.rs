// Period resolution for monthly and quarterly (triwulan) reports.
//
// Quarterly windows follow the domain convention of being cumulative from
// January: Q1 = {1..3}, Q2 = {1..6}, Q3 = {1..9}, Q4 = {1..12}. That also
// defines what "previous period" means: Q2's previous window is Q1, and
// Q1's previous window is the entire prior year. Every consumer must get
// its month windows from here so the convention is applied exactly once.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Monthly,
    Quarterly,
}

/// Resolved current and comparison windows for one report request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodWindow {
    pub year: i32,
    pub current_months: Vec<u32>,
    pub current_month_count: usize,
    pub previous_year: i32,
    pub previous_months: Vec<u32>,
    pub previous_month_count: usize,
}

/// Resolve a report selector into month windows.
///
/// `selector` is a month (1-12) for monthly reports or a quarter (1-4) for
/// quarterly ones. Validity is the caller's contract and is not re-checked.
pub fn resolve(kind: ReportKind, selector: u32, year: i32) -> PeriodWindow {
    match kind {
        ReportKind::Monthly => {
            let (previous_year, previous_months) = if selector == 1 {
                (year - 1, vec![12])
            } else {
                (year, vec![selector - 1])
            };
            window(year, vec![selector], previous_year, previous_months)
        }
        ReportKind::Quarterly => {
            let current_months: Vec<u32> = (1..=selector * 3).collect();
            let (previous_year, previous_months) = if selector == 1 {
                (year - 1, (1..=12).collect())
            } else {
                (year, (1..=(selector - 1) * 3).collect())
            };
            window(year, current_months, previous_year, previous_months)
        }
    }
}

fn window(
    year: i32,
    current_months: Vec<u32>,
    previous_year: i32,
    previous_months: Vec<u32>,
) -> PeriodWindow {
    PeriodWindow {
        year,
        current_month_count: current_months.len(),
        previous_month_count: previous_months.len(),
        current_months,
        previous_year,
        previous_months,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monthly_mid_year() {
        let w = resolve(ReportKind::Monthly, 7, 2024);
        assert_eq!(w.current_months, vec![7]);
        assert_eq!(w.current_month_count, 1);
        assert_eq!(w.previous_year, 2024);
        assert_eq!(w.previous_months, vec![6]);
    }

    #[test]
    fn monthly_january_rolls_to_prior_december() {
        let w = resolve(ReportKind::Monthly, 1, 2024);
        assert_eq!(w.previous_year, 2023);
        assert_eq!(w.previous_months, vec![12]);
        assert_eq!(w.previous_month_count, 1);
    }

    #[test]
    fn quarterly_is_cumulative_from_january() {
        let w = resolve(ReportKind::Quarterly, 3, 2024);
        assert_eq!(w.current_months, (1..=9).collect::<Vec<u32>>());
        assert_eq!(w.current_month_count, 9);
        // Q3's comparison window is Q2, also cumulative.
        assert_eq!(w.previous_year, 2024);
        assert_eq!(w.previous_months, (1..=6).collect::<Vec<u32>>());
        assert_eq!(w.previous_month_count, 6);
    }

    #[test]
    fn first_quarter_compares_against_full_prior_year() {
        let w = resolve(ReportKind::Quarterly, 1, 2024);
        assert_eq!(w.current_months, vec![1, 2, 3]);
        assert_eq!(w.previous_year, 2023);
        assert_eq!(w.previous_months, (1..=12).collect::<Vec<u32>>());
        assert_eq!(w.previous_month_count, 12);
    }

    #[test]
    fn fourth_quarter_spans_whole_year() {
        let w = resolve(ReportKind::Quarterly, 4, 2024);
        assert_eq!(w.current_month_count, 12);
        assert_eq!(w.previous_months, (1..=9).collect::<Vec<u32>>());
    }
}
