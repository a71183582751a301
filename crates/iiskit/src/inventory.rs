//! Inventory listing and resource lookup.
//!
//! `list` turns `appcmd list <type> /xml` into descriptors; `find` and its
//! variants locate one descriptor by key.

use crate::Client;
use crate::error::{Error, Result};
use crate::types::{Descriptor, ResourceType};
use crate::xml::ATTRIBUTES_KEY;
use serde_json::Value;

/// Attribute naming the site an application belongs to.
pub const APP_SITE_ATTRIBUTE: &str = "APP.SITE.NAME";

/// List every resource of one type.
pub fn list(client: &Client, resource_type: ResourceType) -> Result<Vec<Descriptor>> {
    let output = client.run(&client.commands().list(resource_type))?;

    let document = client
        .deserializer()
        .parse(&output)
        .map_err(|e| Error::InventoryQuery {
            resource_type,
            message: e.to_string(),
        })?;

    let records = normalize(resource_type, &document)?;
    log::trace!("Listed {} {} record(s)", records.len(), resource_type);
    Ok(records)
}

/// Normalize a deserialized listing into descriptors.
///
/// One record arrives as a bare object, several as an array, none as a
/// missing key; the result is always a list.
pub fn normalize(resource_type: ResourceType, document: &Value) -> Result<Vec<Descriptor>> {
    let Value::Object(root) = document else {
        return Err(Error::InventoryQuery {
            resource_type,
            message: "document root is not an element".to_string(),
        });
    };

    let records = match root.get(resource_type.element()) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(unwrap_record).collect(),
        Some(record) => vec![unwrap_record(record)],
    };
    Ok(records)
}

/// Pull a record's attributes out of the `"@"` wrapper.
fn unwrap_record(record: &Value) -> Descriptor {
    match record.get(ATTRIBUTES_KEY) {
        Some(Value::Object(attributes)) => attributes
            .iter()
            .map(|(k, v)| (k.clone(), value_to_string(v)))
            .collect(),
        _ => Descriptor::new(),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Normalize a key for comparison: one leading `/` dropped, case folded.
pub fn normalize_key(value: &str) -> String {
    value.strip_prefix('/').unwrap_or(value).to_lowercase()
}

/// Whether a descriptor's `key` attribute matches `desired`.
pub fn key_matches(descriptor: &Descriptor, key: &str, desired: &str) -> bool {
    descriptor
        .get(key)
        .is_some_and(|actual| normalize_key(actual) == normalize_key(desired))
}

/// Find the first resource whose `key` attribute matches `desired`.
///
/// `Ok(None)` means the inventory was read and nothing matched. A failed
/// inventory query is an error, not an absence.
pub fn find(
    client: &Client,
    resource_type: ResourceType,
    key: &str,
    desired: &str,
) -> Result<Option<Descriptor>> {
    let records = list(client, resource_type)?;
    Ok(records
        .into_iter()
        .find(|record| key_matches(record, key, desired)))
}

/// [`find`], treating a failed inventory query as "not found".
pub fn find_lenient(
    client: &Client,
    resource_type: ResourceType,
    key: &str,
    desired: &str,
) -> Option<Descriptor> {
    match find(client, resource_type, key, desired) {
        Ok(found) => found,
        Err(e) => {
            log::warn!("Treating {resource_type} '{desired}' as absent: {e}");
            None
        }
    }
}

/// Find an application by path within one site.
///
/// Records without a site attribute are matched on path alone.
pub fn find_app(client: &Client, site: &str, path: &str) -> Result<Option<Descriptor>> {
    let key = ResourceType::App.key_attribute();
    let records = list(client, ResourceType::App)?;
    Ok(records.into_iter().find(|record| {
        let same_site = record
            .get(APP_SITE_ATTRIBUTE)
            .is_none_or(|s| s.eq_ignore_ascii_case(site));
        same_site && key_matches(record, key, path)
    }))
}
