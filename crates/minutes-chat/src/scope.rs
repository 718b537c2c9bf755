//! Scope filter rules and the option lists derived from the meeting catalog.
//!
//! The meeting selector refines the date selector: choosing a date drops a
//! selected meeting that was not recorded on that day.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use minutes_core::{MeetingSummary, ScopeFilter};

/// Whether `meeting_id` names a catalog meeting recorded on `date`.
///
/// A meeting missing from the catalog is never within a date.
pub fn meeting_within_date(catalog: &[MeetingSummary], meeting_id: i64, date: NaiveDate) -> bool {
    catalog
        .iter()
        .any(|meeting| meeting.id == meeting_id && meeting.date() == date)
}

/// Set the date filter, clearing a selected meeting that falls outside it.
///
/// Clearing the date keeps the meeting selection.
pub fn apply_date(scope: &mut ScopeFilter, date: Option<NaiveDate>, catalog: &[MeetingSummary]) {
    if let (Some(date), Some(meeting_id)) = (date, scope.meeting_id) {
        if !meeting_within_date(catalog, meeting_id, date) {
            tracing::debug!(meeting_id, %date, "Selected meeting not on date; clearing it");
            scope.meeting_id = None;
        }
    }
    scope.date = date;
}

/// Distinct meeting dates, newest first.
pub fn available_dates(candidates: &[MeetingSummary]) -> Vec<NaiveDate> {
    let dates: BTreeSet<NaiveDate> = candidates.iter().map(MeetingSummary::date).collect();
    dates.into_iter().rev().collect()
}

/// Candidates recorded on `date`, in catalog order. All of them without a date.
pub fn meetings_on(candidates: &[MeetingSummary], date: Option<NaiveDate>) -> Vec<&MeetingSummary> {
    candidates
        .iter()
        .filter(|meeting| date.map_or(true, |d| meeting.date() == d))
        .collect()
}
