//! `minSdkVersion` clamp.

use manifest_doc::names::attr;
use manifest_doc::{AttributeMutation, ManifestDocument};

pub(super) fn plan(doc: &ManifestDocument, floor: i64) -> Vec<AttributeMutation> {
    if floor <= 0 {
        return Vec::new();
    }
    let Some((path, uses_sdk)) = doc.uses_sdk() else {
        return Vec::new();
    };
    let Some(min_sdk) = uses_sdk.android_attribute(attr::MIN_SDK_VERSION) else {
        return Vec::new();
    };

    let declared = min_sdk.value();
    let Ok(version) = declared.trim().parse::<i64>() else {
        tracing::debug!(value = %declared, "minSdkVersion is not an integer, left untouched");
        return Vec::new();
    };
    if version <= floor {
        return Vec::new();
    }

    tracing::info!(
        declared = version,
        floor,
        "minSdkVersion is greater than the application's configured minimum"
    );
    vec![AttributeMutation {
        target: path,
        element: uses_sdk.name().to_string(),
        name: min_sdk.name().clone(),
        value: floor.to_string(),
        previous: Some(declared.into_owned()),
    }]
}
