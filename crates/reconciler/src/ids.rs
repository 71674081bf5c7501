//! Azure resource id parsing
//!
//! Azure ids are of the form
//! `/subscriptions/{guid}/resourceGroups/{name}/{provider}/{type}/{resource}`.

use crate::error::ReconcileError;

/// Parse the resource group name out of an Azure resource id. Works for
/// resource groups themselves and for resources nested under one.
pub fn parse_resource_group_name_from_id(id: &str) -> Result<String, ReconcileError> {
    let parts: Vec<&str> = id.trim_start_matches('/').split('/').collect();
    if parts.len() < 4 || parts[2] != "resourceGroups" {
        return Err(ReconcileError::InvalidResourceId(id.to_string()));
    }

    Ok(parts[3].to_string())
}

/// Parse the resource name (the last path segment) out of an Azure resource
/// id.
pub fn parse_resource_name_from_id(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

/// Parse a composite import id of the form
/// `managed_application_id:cluster_name`.
pub fn parse_import_id(s: &str) -> Result<(&str, &str), ReconcileError> {
    if !s.contains(':') {
        return Err(ReconcileError::InvalidImportId(format!(
            "id string must be of format `managed_application_id:cluster_name`; id string: {} does not contain `:`",
            s
        )));
    }

    let segments: Vec<&str> = s.split(':').collect();
    if segments.len() != 2 {
        return Err(ReconcileError::InvalidImportId(format!(
            "id string must be of format `managed_application_id:cluster_name`; id string: {} contains more than one `:`",
            s
        )));
    }

    if segments[0].is_empty() {
        return Err(ReconcileError::InvalidImportId(format!(
            "id string must be of format `managed_application_id:cluster_name`; id string: {} has empty string to left of `:`",
            s
        )));
    }

    if segments[1].is_empty() {
        return Err(ReconcileError::InvalidImportId(format!(
            "id string must be of format `managed_application_id:cluster_name`; id string: {} has empty string to right of `:`",
            s
        )));
    }

    Ok((segments[0], segments[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP_ID: &str =
        "/subscriptions/guid/resourceGroups/my-rg/providers/Microsoft.Solutions/applications/my-app";

    #[test]
    fn resource_group_name_from_nested_resource_id() {
        assert_eq!(parse_resource_group_name_from_id(APP_ID).unwrap(), "my-rg");
    }

    #[test]
    fn resource_group_name_from_resource_group_id() {
        assert_eq!(
            parse_resource_group_name_from_id("/subscriptions/guid/resourceGroups/my-rg").unwrap(),
            "my-rg"
        );
    }

    #[test]
    fn resource_group_name_rejects_malformed_ids() {
        assert!(parse_resource_group_name_from_id("/subscriptions/guid").is_err());
        assert!(parse_resource_group_name_from_id("/subscriptions/guid/notResourceGroups/x").is_err());
        assert!(parse_resource_group_name_from_id("").is_err());
    }

    #[test]
    fn resource_name_is_last_segment() {
        assert_eq!(parse_resource_name_from_id(APP_ID), "my-app");
        assert_eq!(parse_resource_name_from_id("just-a-name"), "just-a-name");
    }

    #[test]
    fn import_id_splits_on_single_colon() {
        let (id, name) = parse_import_id("/subscriptions/s/resourceGroups/rg:dc1").unwrap();
        assert_eq!(id, "/subscriptions/s/resourceGroups/rg");
        assert_eq!(name, "dc1");
    }

    #[test]
    fn import_id_rejects_malformed_input() {
        for bad in ["no-colon", "a:b:c", ":name", "id:", ":"] {
            let err = parse_import_id(bad).unwrap_err();
            let message = err.to_string();
            assert!(
                message.contains(bad.split(':').next().unwrap_or(bad)) || message.contains(bad),
                "error should echo the input: {}",
                message
            );
        }
    }
}
