//! Attribute rules.
//!
//! A rule inspects a document and returns the attribute changes it wants;
//! it never edits the document itself. The rewriter decides whether those
//! changes are applied or reported.

mod exported;
mod min_sdk;

use manifest_doc::{AttributeMutation, ManifestDocument};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a rule in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Exported,
    MinSdkClamp,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Exported => write!(f, "exported"),
            RuleKind::MinSdkClamp => write!(f, "min-sdk-clamp"),
        }
    }
}

/// The closed set of rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    /// Declare `android:exported="true"` on components that have an intent
    /// filter but no `exported` attribute.
    Exported,

    /// Lower `uses-sdk/@android:minSdkVersion` to `floor` when it exceeds it.
    /// A floor of zero or less disables the rule.
    MinSdkClamp { floor: i64 },
}

impl Rule {
    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::Exported => RuleKind::Exported,
            Rule::MinSdkClamp { .. } => RuleKind::MinSdkClamp,
        }
    }

    /// Changes this rule wants to make to `doc`.
    pub fn plan(&self, doc: &ManifestDocument) -> Vec<AttributeMutation> {
        match *self {
            Rule::Exported => exported::plan(doc),
            Rule::MinSdkClamp { floor } => min_sdk::plan(doc, floor),
        }
    }
}

/// Rules applied to manifests contributed by dependency modules.
pub fn dependency_rules(min_sdk_floor: i64) -> Vec<Rule> {
    let mut rules = vec![Rule::Exported];
    if min_sdk_floor > 0 {
        rules.push(Rule::MinSdkClamp {
            floor: min_sdk_floor,
        });
    }
    rules
}

/// Rules checked against the application module's own manifest.
pub fn primary_rules() -> Vec<Rule> {
    vec![Rule::Exported]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_rules_skip_clamp_without_floor() {
        assert_eq!(dependency_rules(0), vec![Rule::Exported]);
        assert_eq!(dependency_rules(-3), vec![Rule::Exported]);
        assert_eq!(
            dependency_rules(21),
            vec![Rule::Exported, Rule::MinSdkClamp { floor: 21 }]
        );
    }

    #[test]
    fn test_rules_commute() {
        let xml = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android">
    <uses-sdk android:minSdkVersion="28"/>
    <application>
        <receiver android:name=".Boot"><intent-filter/></receiver>
    </application>
</manifest>"#;
        let exported_first = [Rule::Exported, Rule::MinSdkClamp { floor: 21 }];
        let clamp_first = [Rule::MinSdkClamp { floor: 21 }, Rule::Exported];

        let run = |rules: &[Rule]| {
            let mut doc = ManifestDocument::parse(xml).unwrap();
            for rule in rules {
                let mutations = rule.plan(&doc);
                doc.apply_all(&mutations).unwrap();
            }
            doc.to_xml_string()
        };
        assert_eq!(run(&exported_first), run(&clamp_first));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(Rule::Exported.kind().to_string(), "exported");
        assert_eq!(
            Rule::MinSdkClamp { floor: 1 }.kind().to_string(),
            "min-sdk-clamp"
        );
    }
}
