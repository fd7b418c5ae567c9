//! `android:exported` fixup for components with intent filters.

use manifest_doc::names::attr;
use manifest_doc::{AttributeMutation, ManifestDocument, QName};

/// Value written on components that need the attribute.
pub const EXPORTED_VALUE: &str = "true";

pub(super) fn plan(doc: &ManifestDocument) -> Vec<AttributeMutation> {
    let prefix = doc.android_prefix();
    let mut mutations = Vec::new();

    for component in doc.components() {
        if component.declares_exported() {
            tracing::debug!(
                component = %component.display_name(),
                "android:exported already declared"
            );
            continue;
        }
        if !component.has_intent_filter() {
            continue;
        }
        mutations.push(AttributeMutation {
            target: component.path.clone(),
            element: component.kind.as_str().to_string(),
            name: QName::android(&prefix, attr::EXPORTED),
            value: EXPORTED_VALUE.to_string(),
            previous: None,
        });
    }

    mutations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_for(xml: &str) -> Vec<AttributeMutation> {
        plan(&ManifestDocument::parse(xml).unwrap())
    }

    #[test]
    fn test_component_with_intent_filter_gets_exported() {
        let mutations = plan_for(
            r#"<application><activity android:name=".Main"><intent-filter/></activity></application>"#,
        );
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].element, "activity");
        assert_eq!(mutations[0].name.qualified(), "android:exported");
        assert_eq!(mutations[0].value, "true");
    }

    #[test]
    fn test_existing_exported_is_left_alone() {
        let mutations = plan_for(
            r#"<application><activity android:name=".Main" android:exported="false"><intent-filter/></activity></application>"#,
        );
        assert!(mutations.is_empty());
    }

    #[test]
    fn test_component_without_intent_filter_is_left_alone() {
        let mutations =
            plan_for(r#"<application><service android:name=".Sync"/></application>"#);
        assert!(mutations.is_empty());
    }

    #[test]
    fn test_all_component_kinds_are_checked() {
        let mutations = plan_for(
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android">
  <application>
    <activity android:name=".A"><intent-filter/></activity>
    <service android:name=".S"><intent-filter/></service>
    <receiver android:name=".R"><intent-filter/></receiver>
    <provider android:name=".P"><intent-filter/></provider>
    <activity-alias android:name=".Alias"><intent-filter/></activity-alias>
  </application>
</manifest>"#,
        );
        let kinds: Vec<&str> = mutations.iter().map(|m| m.element.as_str()).collect();
        assert_eq!(kinds, vec!["activity", "service", "receiver"]);
    }

    #[test]
    fn test_nested_components_are_ignored() {
        let mutations = plan_for(
            r#"<manifest><activity android:name=".Stray"><intent-filter/></activity><application/></manifest>"#,
        );
        assert!(mutations.is_empty());
    }

    #[test]
    fn test_uses_declared_prefix() {
        let mutations = plan_for(
            r#"<manifest xmlns:a="http://schemas.android.com/apk/res/android"><application><activity a:name=".M"><intent-filter/></activity></application></manifest>"#,
        );
        assert_eq!(mutations[0].name.qualified(), "a:exported");
    }

    #[test]
    fn test_exported_in_other_namespace_does_not_count() {
        let mutations = plan_for(
            r#"<manifest xmlns:tools="http://schemas.android.com/tools"><application><activity tools:exported="true"><intent-filter/></activity></application></manifest>"#,
        );
        assert_eq!(mutations.len(), 1);
    }
}
