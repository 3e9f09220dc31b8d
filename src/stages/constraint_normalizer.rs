use chrono::NaiveDate;

use crate::types::{
    BudgetCategory, Constraints, Pace, ParsedConstraints, DEFAULT_TRIP_DAYS,
};

const LONG_TRIP_DAYS: i64 = 30;
const SHORT_RELAXED_TRIP_DAYS: i64 = 4;

/// Inclusive day count of a `YYYY-MM-DD to YYYY-MM-DD` range.
///
/// `None` when the text cannot be read as such a range.
pub fn trip_duration(dates: &str) -> Option<i64> {
    let (start, end) = dates.split_once(" to ")?;
    let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d").ok()?;
    let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d").ok()?;
    Some((end - start).num_days() + 1)
}

struct BudgetAssessment {
    category: BudgetCategory,
    daily_budget: f64,
    warning: Option<&'static str>,
}

fn assess_budget(budget: Option<f64>, duration: i64) -> BudgetAssessment {
    let Some(budget) = budget.filter(|budget| *budget > 0.0) else {
        return BudgetAssessment {
            category: BudgetCategory::Unspecified,
            daily_budget: 0.0,
            warning: Some("Budget not specified - will provide general recommendations"),
        };
    };

    let daily_budget = if duration > 0 {
        budget / duration as f64
    } else {
        budget
    };

    let (category, warning) = if daily_budget < 50.0 {
        (
            BudgetCategory::Budget,
            Some("Budget is very tight - expect basic accommodations and limited activities"),
        )
    } else if daily_budget < 100.0 {
        (BudgetCategory::Budget, None)
    } else if daily_budget < 300.0 {
        (BudgetCategory::Moderate, None)
    } else if daily_budget < 500.0 {
        (BudgetCategory::Comfortable, None)
    } else {
        (BudgetCategory::Luxury, None)
    };

    BudgetAssessment {
        category,
        daily_budget,
        warning,
    }
}

/// Derive duration and budget band, and flag warnings and conflicts.
///
/// Makes no model call. Supplied fields are kept as given; only an absent
/// pace is filled in.
pub fn normalize(constraints: &Constraints) -> ParsedConstraints {
    let mut constraints = constraints.clone();
    let mut warnings = Vec::new();
    let mut assumptions = Vec::new();
    let mut conflicts = Vec::new();

    let duration = match constraints.dates.as_deref().filter(|dates| !dates.trim().is_empty()) {
        Some(dates) => {
            let duration = trip_duration(dates).unwrap_or(DEFAULT_TRIP_DAYS);
            if duration < 1 {
                conflicts.push("Invalid date range".to_string());
            } else if duration > LONG_TRIP_DAYS {
                warnings.push("Very long trip - may need multiple destinations".to_string());
            }
            duration
        }
        None => {
            assumptions.push(format!("Assuming {DEFAULT_TRIP_DAYS}-day trip"));
            DEFAULT_TRIP_DAYS
        }
    };

    let budget = assess_budget(constraints.budget, duration);
    if let Some(warning) = budget.warning {
        warnings.push(warning.to_string());
    }

    let luxury_style = constraints
        .style()
        .is_some_and(|style| style.eq_ignore_ascii_case("luxury"));
    if luxury_style && budget.category == BudgetCategory::Budget {
        conflicts.push("Luxury travel style conflicts with budget constraints".to_string());
    }

    if constraints.pace == Some(Pace::Relaxed) && duration < SHORT_RELAXED_TRIP_DAYS {
        warnings.push("Short trip with relaxed pace - limited time per activity".to_string());
    }

    if constraints.pace.is_none() {
        constraints.pace = Some(Pace::Moderate);
        assumptions.push("Assuming moderate pace".to_string());
    }

    ParsedConstraints {
        constraints,
        duration,
        budget_category: budget.category,
        daily_budget: budget.daily_budget,
        warnings,
        assumptions,
        conflicts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_budget(budget: f64, dates: &str) -> Constraints {
        Constraints {
            budget: Some(budget),
            dates: Some(dates.to_string()),
            ..Constraints::default()
        }
    }

    #[test]
    fn test_duration_is_inclusive() {
        assert_eq!(trip_duration("2024-07-01 to 2024-07-03"), Some(3));
        assert_eq!(trip_duration("2024-07-01 to 2024-07-01"), Some(1));
        assert_eq!(trip_duration("2024-07-05 to 2024-07-01"), Some(-3));
        assert_eq!(trip_duration("next week"), None);
    }

    #[test]
    fn test_budget_scenario_lands_in_moderate_band() {
        let parsed = normalize(&Constraints {
            travel_style: Some("budget".to_string()),
            ..with_budget(500.0, "2024-07-01 to 2024-07-03")
        });

        assert_eq!(parsed.duration, 3);
        assert!((parsed.daily_budget - 166.666).abs() < 0.01);
        assert_eq!(parsed.budget_category, BudgetCategory::Moderate);
        assert!(parsed.conflicts.is_empty());
    }

    #[test]
    fn test_band_boundaries() {
        let one_day = "2024-07-01 to 2024-07-01";
        let cases = [
            (49.0, BudgetCategory::Budget),
            (50.0, BudgetCategory::Budget),
            (99.99, BudgetCategory::Budget),
            (100.0, BudgetCategory::Moderate),
            (299.0, BudgetCategory::Moderate),
            (300.0, BudgetCategory::Comfortable),
            (499.0, BudgetCategory::Comfortable),
            (500.0, BudgetCategory::Luxury),
        ];
        for (budget, expected) in cases {
            let parsed = normalize(&with_budget(budget, one_day));
            assert_eq!(parsed.budget_category, expected, "budget {budget}");
        }

        let tight = normalize(&with_budget(49.0, one_day));
        assert!(tight.warnings.iter().any(|w| w.contains("very tight")));
        let comfortable = normalize(&with_budget(50.0, one_day));
        assert!(!comfortable.warnings.iter().any(|w| w.contains("very tight")));
    }

    #[test]
    fn test_missing_budget_is_unspecified() {
        for budget in [None, Some(0.0), Some(-20.0)] {
            let parsed = normalize(&Constraints {
                budget,
                ..Constraints::default()
            });
            assert_eq!(parsed.budget_category, BudgetCategory::Unspecified);
            assert_eq!(parsed.daily_budget, 0.0);
            assert!(!parsed.warnings.is_empty());
        }
    }

    #[test]
    fn test_reversed_dates_conflict() {
        let parsed = normalize(&with_budget(1000.0, "2024-07-05 to 2024-07-01"));
        assert!(parsed.has_conflicts());
        assert_eq!(parsed.conflicts[0], "Invalid date range");
    }

    #[test]
    fn test_luxury_style_on_budget_spend_conflicts() {
        let parsed = normalize(&Constraints {
            travel_style: Some("luxury".to_string()),
            ..with_budget(300.0, "2024-07-01 to 2024-07-05")
        });
        assert_eq!(parsed.budget_category, BudgetCategory::Budget);
        assert!(parsed.has_conflicts());
    }

    #[test]
    fn test_defaults_only_fill_absent_fields() {
        let parsed = normalize(&Constraints::default());
        assert_eq!(parsed.duration, DEFAULT_TRIP_DAYS);
        assert_eq!(parsed.constraints.pace, Some(Pace::Moderate));
        assert!(parsed
            .assumptions
            .contains(&"Assuming moderate pace".to_string()));
        assert!(parsed.assumptions.contains(&"Assuming 7-day trip".to_string()));
        assert_eq!(parsed.constraints.travel_style, None);

        let packed = normalize(&Constraints {
            pace: Some(Pace::Packed),
            ..Constraints::default()
        });
        assert_eq!(packed.constraints.pace, Some(Pace::Packed));
        assert!(!packed.assumptions.contains(&"Assuming moderate pace".to_string()));
    }

    #[test]
    fn test_long_and_short_relaxed_trips_warn() {
        let long = normalize(&with_budget(10_000.0, "2024-07-01 to 2024-08-15"));
        assert!(long.warnings.iter().any(|w| w.contains("Very long trip")));
        assert!(!long.has_conflicts());

        let short = normalize(&Constraints {
            pace: Some(Pace::Relaxed),
            ..with_budget(900.0, "2024-07-01 to 2024-07-03")
        });
        assert!(short.warnings.iter().any(|w| w.contains("relaxed pace")));
    }

    #[test]
    fn test_unreadable_dates_default_without_assumption() {
        let parsed = normalize(&Constraints {
            dates: Some("sometime in July".to_string()),
            ..Constraints::default()
        });
        assert_eq!(parsed.duration, DEFAULT_TRIP_DAYS);
        assert!(!parsed.assumptions.contains(&"Assuming 7-day trip".to_string()));
    }
}
