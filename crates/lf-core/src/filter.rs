//! # Filter-Sort Engine
//!
//! Derives the displayed list from a collection snapshot and the current list
//! selections. Nothing is cached between calls; the whole list is rebuilt on
//! every change of either input.

use crate::models::{Report, ReportQuery, SearchFields, SortKey};

/// Keeps the reports of the selected kind that match the query text, ordered
/// by `occurred_at`.
pub fn filter_and_sort(records: &[Report], query: &ReportQuery) -> Vec<Report> {
    // Whitespace is part of the needle; only a truly empty query matches all.
    let needle = query.text.to_lowercase();

    let mut visible: Vec<Report> = records
        .iter()
        .filter(|r| r.kind == query.kind)
        .filter(|r| needle.is_empty() || matches_text(r, &needle, query.search_fields))
        .cloned()
        .collect();

    sort_reports(&mut visible, query.sort);
    visible
}

pub fn sort_reports(reports: &mut [Report], sort: SortKey) {
    match sort {
        SortKey::Latest => reports.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at)),
        SortKey::Oldest => reports.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at)),
    }
}

/// `needle` must already be lowercase.
fn matches_text(report: &Report, needle: &str, fields: SearchFields) -> bool {
    if report.title.to_lowercase().contains(needle) {
        return true;
    }
    match fields {
        SearchFields::TitleOnly => false,
        SearchFields::TitleDescriptionTags => {
            report.description.to_lowercase().contains(needle)
                || report.tags.iter().any(|t| t.to_lowercase().contains(needle))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportKind;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn report(id: &str, title: &str, kind: ReportKind, at: DateTime<Utc>) -> Report {
        Report {
            id: id.into(),
            title: title.into(),
            kind,
            description: "Left on the number 9 bus".into(),
            tags: vec!["bus".into()],
            color: "blue".into(),
            occurred_at: at,
            location: "Downtown".into(),
            reporter_name: "Sam Doe".into(),
            reporter_email: "sam@example.com".into(),
            image_ref: None,
            resolved: false,
            created_at: at,
        }
    }

    fn titles(reports: &[Report]) -> Vec<&str> {
        reports.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn wallet_scenario() {
        let records = vec![
            report("1", "Blue Wallet", ReportKind::Lost, t(1)),
            report("2", "Red Wallet", ReportKind::Lost, t(2)),
            report("3", "Blue Cap", ReportKind::Found, t(3)),
        ];
        let query = ReportQuery::new(ReportKind::Lost).with_text("wallet").with_sort(SortKey::Latest);
        assert_eq!(titles(&filter_and_sort(&records, &query)), vec!["Red Wallet", "Blue Wallet"]);
    }

    #[test]
    fn only_selected_kind_survives() {
        let records = vec![
            report("1", "Umbrella", ReportKind::Found, t(5)),
            report("2", "Scarf", ReportKind::Lost, t(4)),
            report("3", "Keys", ReportKind::Found, t(3)),
        ];
        let out = filter_and_sort(&records, &ReportQuery::new(ReportKind::Found));
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.kind == ReportKind::Found));
    }

    #[test]
    fn text_match_is_case_insensitive_and_title_only_by_default() {
        let records = vec![
            report("1", "Silver KEYRING", ReportKind::Lost, t(1)),
            report("2", "Phone", ReportKind::Lost, t(2)),
        ];
        let out = filter_and_sort(&records, &ReportQuery::new(ReportKind::Lost).with_text("keyRing"));
        assert_eq!(titles(&out), vec!["Silver KEYRING"]);

        let by_description = ReportQuery::new(ReportKind::Lost).with_text("bus");
        assert!(filter_and_sort(&records, &by_description).is_empty());
    }

    #[test]
    fn extended_search_covers_description_and_tags() {
        let mut tagged = report("1", "Backpack", ReportKind::Lost, t(1));
        tagged.tags = vec!["Hiking".into()];
        tagged.description = "Green canvas with a broken zip".into();
        let records = vec![tagged, report("2", "Phone", ReportKind::Lost, t(2))];

        let query = ReportQuery::new(ReportKind::Lost).with_search_fields(SearchFields::TitleDescriptionTags);
        assert_eq!(titles(&filter_and_sort(&records, &query.clone().with_text("hiking"))), vec!["Backpack"]);
        assert_eq!(titles(&filter_and_sort(&records, &query.with_text("ZIP"))), vec!["Backpack"]);
    }

    #[test]
    fn sort_orders_and_is_idempotent() {
        let records = vec![
            report("1", "A", ReportKind::Lost, t(2)),
            report("2", "B", ReportKind::Lost, t(9)),
            report("3", "C", ReportKind::Lost, t(-4)),
            report("4", "D", ReportKind::Lost, t(2)),
        ];

        let latest = filter_and_sort(&records, &ReportQuery::new(ReportKind::Lost));
        assert!(latest.windows(2).all(|w| w[0].occurred_at >= w[1].occurred_at));
        let again = filter_and_sort(&latest, &ReportQuery::new(ReportKind::Lost));
        assert_eq!(latest, again);

        let oldest_query = ReportQuery::new(ReportKind::Lost).with_sort(SortKey::Oldest);
        let oldest = filter_and_sort(&records, &oldest_query);
        assert!(oldest.windows(2).all(|w| w[0].occurred_at <= w[1].occurred_at));
        assert_eq!(filter_and_sort(&oldest, &oldest_query), oldest);
    }

    #[test]
    fn whitespace_is_matched_literally() {
        let records = vec![
            report("1", "Blue Wallet", ReportKind::Lost, t(1)),
            report("2", "Keys", ReportKind::Lost, t(2)),
            report("3", "Wallet", ReportKind::Lost, t(3)),
        ];
        let blank = ReportQuery::new(ReportKind::Lost).with_text(" ");
        assert_eq!(titles(&filter_and_sort(&records, &blank)), vec!["Blue Wallet"]);

        let leading = ReportQuery::new(ReportKind::Lost).with_text(" wallet");
        assert_eq!(titles(&filter_and_sort(&records, &leading)), vec!["Blue Wallet"]);

        let empty = ReportQuery::new(ReportKind::Lost).with_text("");
        assert_eq!(filter_and_sort(&records, &empty).len(), 3);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(filter_and_sort(&[], &ReportQuery::new(ReportKind::Lost).with_text("x")).is_empty());
    }
}
