//! Federation helpers
//!
//! A cluster is the primary of a federation when the federation view names
//! it as the primary datacenter and at least one secondary is joined. That
//! predicate gates cluster deletion and federation-token minting.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use consulama_client::FederationResponse;
use serde_json::Value;

/// True when the named cluster is the primary of a federation that still
/// has secondary datacenters attached.
pub fn is_primary_with_secondaries(
    managed_app_name: &str,
    resource_group_name: &str,
    federation: &FederationResponse,
) -> bool {
    let Some(primary) = &federation.primary_datacenter else {
        return false;
    };
    if federation.secondary_datacenters.is_empty() {
        return false;
    }

    primary.name == managed_app_name && primary.resource_group == resource_group_name
}

/// True when two federation tokens (JWTs) carry the same `Primary` claim,
/// which denotes that they belong to the same primary cluster.
///
/// The claims are read without signature validation; the service validates
/// tokens on use. Any decoding failure makes the tokens count as different.
pub fn federation_tokens_have_same_primary(token_a: &str, token_b: &str) -> bool {
    let (Some(claims_a), Some(claims_b)) = (extract_claims(token_a), extract_claims(token_b))
    else {
        return false;
    };

    claims_a.get("Primary") == claims_b.get("Primary")
}

/// Decode the payload segment of a JWT into its claim object.
fn extract_claims(token: &str) -> Option<Value> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    claims.is_object().then_some(claims)
}
