//! System-instruction composition.

use dukkan_core::catalog::CatalogSnapshot;

/// Compose the system instruction for one orchestration run.
///
/// The persona/policy head comes from config unless the catalog snapshot
/// carries a remote override; the rendered product listing is always
/// appended. Pure: same policy and snapshot, same prompt.
pub fn compose_system_prompt(policy: &str, snapshot: &CatalogSnapshot) -> String {
    let policy = snapshot.policy_override.as_deref().unwrap_or(policy);
    format!("{}\n\nالمخزون:\n{}", policy.trim(), snapshot.render_listing())
}
