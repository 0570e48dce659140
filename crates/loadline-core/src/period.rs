use crate::table::Table;
use chrono::Month;
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Calendar month the patronage data covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Period {
    pub year: i32,
    /// 1-based.
    pub month: u8,
}

impl Period {
    /// English month name, e.g. `"March"`.
    pub fn month_name(&self) -> &'static str {
        Month::try_from(self.month).map(|m| m.name()).unwrap_or("")
    }
}

fn year_month_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d{4})-(\d{1,2})\b").expect("static regex"))
}

/// Parses a `YYYY-MM` token (trailing day/time is ignored).
pub fn parse_year_month(text: &str) -> Option<Period> {
    let caps = year_month_re().captures(text)?;
    let year = caps[1].parse().ok()?;
    let month: u8 = caps[2].parse().ok()?;
    (1..=12).contains(&month).then_some(Period { year, month })
}

/// Most frequent period in `column`; the earliest-seen wins ties.
pub fn detect_period(table: &Table, column: usize) -> Option<Period> {
    let mut counts: IndexMap<Period, usize> = IndexMap::new();
    for record in table.records() {
        if let Some(period) = parse_year_month(record.get(column)) {
            *counts.entry(period).or_insert(0) += 1;
        }
    }
    let mut best: Option<(Period, usize)> = None;
    for (period, count) in counts {
        if best.is_none_or(|(_, n)| count > n) {
            best = Some((period, count));
        }
    }
    best.map(|(p, _)| p)
}

/// `"{route} {direction} – {Month} {Year}"`, or just `"{route} {direction}"`.
pub fn diagram_title(route: &str, direction: &str, period: Option<Period>) -> String {
    match period {
        Some(p) => format!("{route} {direction} \u{2013} {} {}", p.month_name(), p.year),
        None => format!("{route} {direction}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_frequent_month_wins() {
        let table =
            Table::parse("month,q\n2023-02,1\n2023-03,1\n2023-03-15,1\nsoon,1\n2023-02,1\n2023-03,1\n")
                .unwrap();
        assert_eq!(
            detect_period(&table, 0),
            Some(Period {
                year: 2023,
                month: 3
            })
        );
    }

    #[test]
    fn invalid_months_are_ignored() {
        assert_eq!(parse_year_month("2023-13"), None);
        assert_eq!(parse_year_month("March 2023"), None);
        assert_eq!(parse_year_month("2024-1").map(|p| p.month_name()), Some("January"));
    }

    #[test]
    fn title_includes_period_when_known() {
        let p = parse_year_month("2019-07");
        assert_eq!(diagram_title("100", "Inbound", p), "100 Inbound \u{2013} July 2019");
        assert_eq!(diagram_title("100", "Inbound", None), "100 Inbound");
    }
}
