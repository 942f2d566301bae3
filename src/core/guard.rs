use crate::service::{ApiClient, ProbeOutcome};

/// Authorization decision for a privileged view. Every state is terminal
/// for the current view; re-entering the view re-runs the probe, and the
/// decision is never cached across navigations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    Checking,
    Authorized,
    /// Valid session, insufficient privilege. Session is preserved and the
    /// caller routes to the regular dashboard.
    Forbidden,
    /// No or expired credential. Session is cleared and the caller routes
    /// to login.
    Unauthenticated,
}

/// Pure mapping from probe outcome to decision. Transport failures and
/// unexpected statuses fail closed to Forbidden.
pub fn resolve(outcome: ProbeOutcome) -> AccessState {
    match outcome {
        ProbeOutcome::Success => AccessState::Authorized,
        ProbeOutcome::Forbidden => AccessState::Forbidden,
        ProbeOutcome::Unauthorized => AccessState::Unauthenticated,
        ProbeOutcome::Failed => AccessState::Forbidden,
    }
}

/// Run the guard against the server. The locally cached role is only a
/// hint; the server is authoritative. With no token present this returns
/// Unauthenticated without issuing any network call, and a 401 reply
/// clears the credential store.
pub fn check_admin_access(client: &ApiClient) -> AccessState {
    if client.store().token().is_none() {
        return AccessState::Unauthenticated;
    }

    let state = resolve(client.admin_probe());
    if state == AccessState::Unauthenticated {
        if let Err(e) = client.store().clear() {
            tracing::warn!("Failed to clear session after rejected probe: {}", e);
        }
    }
    state
}
