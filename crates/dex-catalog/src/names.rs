//! Submitter name resolution shared by the listing and single-entry reads.

use dex_core::models::Entry;
use dex_core::traits::CatalogGateway;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;
use uuid::Uuid;

pub const UNKNOWN_SUBMITTER: &str = "Unknown";

/// Fills every blank `submitter_name` from the profiles table in one batched
/// lookup, falling back to [`UNKNOWN_SUBMITTER`].
///
/// A name already stored on the row wins. A failed lookup is logged and
/// leaves every unresolved entry as unknown.
pub async fn resolve_submitter_names(gateway: &dyn CatalogGateway, entries: &mut [Entry]) {
    let unnamed: BTreeSet<Uuid> = entries
        .iter()
        .filter(|e| e.submitter_name.trim().is_empty())
        .filter_map(|e| e.submitter_id)
        .collect();

    let usernames: HashMap<Uuid, String> = if unnamed.is_empty() {
        HashMap::new()
    } else {
        let ids: Vec<Uuid> = unnamed.into_iter().collect();
        match gateway.fetch_profiles(&ids).await {
            Ok(profiles) => profiles
                .into_iter()
                .filter_map(|p| p.username.map(|name| (p.id, name)))
                .filter(|(_, name)| !name.trim().is_empty())
                .collect(),
            Err(err) => {
                warn!(error = %err, "failed to resolve submitter names");
                HashMap::new()
            }
        }
    };

    for entry in entries.iter_mut() {
        if !entry.submitter_name.trim().is_empty() {
            continue;
        }
        entry.submitter_name = entry
            .submitter_id
            .and_then(|id| usernames.get(&id).cloned())
            .unwrap_or_else(|| UNKNOWN_SUBMITTER.to_string());
    }
}
