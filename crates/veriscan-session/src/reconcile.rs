//! Report reconciliation
//!
//! Merges the session's verified/rejected sets with the complement of the
//! address range (serials never seen on air) into the full, ordered row set.
//! Pure function of the session sets: re-running it over the same state
//! yields identical rows, and the caller emits the whole set at once, never
//! partially.

use veriscan_core::ReportRow;

use crate::session::SessionState;

/// Build the complete report row set for a terminated (or stopping) session.
///
/// Verified and rejected rows come first, each sorted by label for stable
/// output; never-observed serials follow in range order.
pub fn build_report(state: &SessionState) -> Vec<ReportRow> {
    let mut rows = Vec::new();

    let mut verified: Vec<ReportRow> = state
        .verified()
        .map(|dev| ReportRow::verified(dev.advertised_name.clone(), dev.address.as_str()))
        .collect();
    verified.sort_by(|a, b| a.label.cmp(&b.label));
    rows.extend(verified);

    let mut rejected: Vec<ReportRow> = state
        .rejected()
        .map(|(dev, reason)| {
            ReportRow::rejected(dev.advertised_name.clone(), dev.address.as_str(), reason)
        })
        .collect();
    rejected.sort_by(|a, b| a.label.cmp(&b.label));
    rows.extend(rejected);

    let observed = state.observed_suffixes();
    rows.extend(state.range().complement(&observed).map(ReportRow::not_found));

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriscan_core::{
        AddressRange, DeviceIdentity, RejectReason, ReportStatus, TransportAddress,
    };

    fn device(addr: &str, name: &str) -> DeviceIdentity {
        DeviceIdentity::new(TransportAddress::new(addr), name)
    }

    fn scenario_state() -> SessionState {
        let range = AddressRange::parse("2405000001", "2405000003").unwrap();
        let mut state = SessionState::new(range, "A".parse().unwrap());
        let a = device("aa:01", "VS-0001");
        let b = device("aa:02", "VS-0002");
        state.mark_found(a.clone());
        state.mark_found(b.clone());
        state.mark_verified(&a, "A2405000001".into());
        state.mark_rejected(&b, RejectReason::CredentialError);
        state
    }

    #[test]
    fn test_report_merges_all_three_statuses() {
        let rows = build_report(&scenario_state());
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].status, ReportStatus::Verified);
        assert_eq!(rows[0].label, "A2405000001");
        assert_eq!(rows[0].address, "aa:01");

        assert_eq!(rows[1].status, ReportStatus::Rejected);
        assert_eq!(rows[1].note, RejectReason::CredentialError.description());

        assert_eq!(rows[2].status, ReportStatus::NotFound);
        assert_eq!(rows[2].address, "2405000003");
    }

    #[test]
    fn test_report_is_idempotent() {
        let state = scenario_state();
        assert_eq!(build_report(&state), build_report(&state));
    }

    #[test]
    fn test_unclassified_found_device_yields_no_row() {
        let range = AddressRange::parse("2405000001", "2405000002").unwrap();
        let mut state = SessionState::new(range, "A".parse().unwrap());
        let a = device("aa:01", "VS-0001");
        state.mark_found(a.clone());
        state.mark_unchecked(&a);

        let rows = build_report(&state);
        // The sighted-but-unclassified device suppresses its NotFound row
        // without gaining a verified/rejected one
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, ReportStatus::NotFound);
        assert_eq!(rows[0].address, "2405000002");
    }
}
