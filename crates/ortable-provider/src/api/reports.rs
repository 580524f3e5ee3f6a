//! Report log endpoint.
//!
//! Consumers poll `/api/reports?after=N` with the highest sequence number
//! they have seen. The log is bounded, so a consumer that falls far behind
//! receives only the newest reports.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;

use ortable_core::ReportsResponse;

use crate::state::SharedState;

/// Query parameters for the reports endpoint.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ReportsQuery {
    /// Only return reports with a larger sequence number. Defaults to 0.
    #[param(example = 12)]
    pub after: Option<u64>,
}

/// Get reports newer than a sequence number.
#[utoipa::path(
    get,
    path = "/api/reports",
    tag = "reports",
    operation_id = "getReports",
    summary = "Poll reports",
    description = "Returns metric, episodic alert, episodic context and operation-invoked \
        reports with a sequence number greater than `after`, oldest first. Pass the returned \
        `latest_sequence` as `after` on the next poll.",
    params(ReportsQuery),
    responses(
        (status = 200, description = "Reports", body = ReportsResponse)
    )
)]
pub async fn get_reports(
    State(state): State<SharedState>,
    Query(query): Query<ReportsQuery>,
) -> Json<ReportsResponse> {
    let hub = state.hub();
    let after = query.after.unwrap_or(0);
    let snapshot = hub.snapshot();
    let reports = hub.reports_after(after);
    let latest_sequence = reports
        .last()
        .map_or(snapshot.latest_sequence, |r| r.sequence.max(snapshot.latest_sequence));

    Json(ReportsResponse {
        reports,
        latest_sequence,
        mdib_version: snapshot.mdib_version,
    })
}
