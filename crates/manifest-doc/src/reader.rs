//! XML reader built on quick-xml events.
//!
//! Every event is stored together with the exact slice of input it was read
//! from, which is what makes serialization loss-free.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::document::{Attribute, Element, ManifestDocument, Node, QName};
use crate::names::{ANDROID_NS, ANDROID_PREFIX, XMLNS_NS};
use crate::ManifestError;

/// Namespace bindings declared on one open element.
type Scope = Vec<(String, String)>;

/// UTF-8 byte order mark.
const BOM: &str = "\u{FEFF}";

/// Parse a manifest document from XML text.
///
/// A leading byte order mark is kept as raw text in front of the prolog;
/// the reader never sees it, so recorded slices line up with `xml`.
pub fn parse_document(input: &str) -> Result<ManifestDocument, ManifestError> {
    let mut top_level: Vec<Node> = Vec::new();
    let xml = match input.strip_prefix(BOM) {
        Some(rest) => {
            top_level.push(Node::Raw(BOM.to_string()));
            rest
        }
        None => input,
    };

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut open: Vec<Element> = Vec::new();
    let mut scopes: Vec<Scope> = Vec::new();
    let mut root: Option<usize> = None;
    let mut last = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            ManifestError::parse(reader.error_position() as u64, e.to_string())
        })?;
        let position = reader.buffer_position() as usize;
        let raw = xml
            .get(last..position)
            .ok_or_else(|| ManifestError::parse(position as u64, "event boundary inside a character"))?
            .to_string();
        last = position;

        match event {
            Event::Start(ref start) => {
                let (element, scope) = read_element(start, raw, &scopes, position)?;
                scopes.push(scope);
                open.push(element);
            }
            Event::Empty(ref start) => {
                let (element, _) = read_element(start, raw, &scopes, position)?;
                attach(Node::Element(element), &mut open, &mut top_level, &mut root)?;
            }
            Event::End(_) => {
                let mut element = open
                    .pop()
                    .ok_or_else(|| ManifestError::parse(position as u64, "unexpected end tag"))?;
                scopes.pop();
                element.end_tag = Some(raw);
                attach(Node::Element(element), &mut open, &mut top_level, &mut root)?;
            }
            Event::Eof => break,
            _ => {
                if !raw.is_empty() {
                    attach(Node::Raw(raw), &mut open, &mut top_level, &mut root)?;
                }
            }
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(ManifestError::Unclosed(unclosed.name.clone()));
    }
    let root = root.ok_or(ManifestError::NoRoot)?;

    // Anything after the last event (normally nothing) stays verbatim.
    if last < xml.len() {
        top_level.push(Node::Raw(xml[last..].to_string()));
    }

    Ok(ManifestDocument {
        nodes: top_level,
        root,
    })
}

/// Append a finished node to its parent, or to the top level.
fn attach(
    node: Node,
    open: &mut [Element],
    top_level: &mut Vec<Node>,
    root: &mut Option<usize>,
) -> Result<(), ManifestError> {
    if let Some(parent) = open.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    if matches!(node, Node::Element(_)) {
        if root.is_some() {
            return Err(ManifestError::MultipleRoots);
        }
        *root = Some(top_level.len());
    }
    top_level.push(node);
    Ok(())
}

/// Build an element from a start tag, resolving attribute namespaces.
fn read_element(
    start: &BytesStart<'_>,
    start_tag: String,
    scopes: &[Scope],
    position: usize,
) -> Result<(Element, Scope), ManifestError> {
    let name = utf8(start.name().as_ref(), "element name")?;

    let mut raw_attributes: Vec<(String, String)> = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ManifestError::parse(position as u64, e.to_string()))?;
        let key = utf8(attr.key.as_ref(), "attribute name")?;
        let value = utf8(&attr.value, "attribute value")?;
        raw_attributes.push((key, value));
    }

    let scope: Scope = raw_attributes
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix("xmlns:")
                .map(|prefix| (prefix.to_string(), value.clone()))
        })
        .collect();

    let attributes = raw_attributes
        .into_iter()
        .map(|(key, raw_value)| Attribute {
            name: resolve_name(&key, &scope, scopes),
            raw_value,
        })
        .collect();

    let element = Element {
        name,
        attributes,
        children: Vec::new(),
        start_tag,
        end_tag: None,
    };
    Ok((element, scope))
}

/// Resolve a written attribute name against the bindings in scope.
fn resolve_name(key: &str, own: &Scope, outer: &[Scope]) -> QName {
    let Some((prefix, local)) = key.split_once(':') else {
        if key == "xmlns" {
            return QName {
                prefix: None,
                local: key.to_string(),
                namespace: Some(XMLNS_NS.to_string()),
            };
        }
        return QName {
            prefix: None,
            local: key.to_string(),
            namespace: None,
        };
    };

    let namespace = if prefix == "xmlns" {
        Some(XMLNS_NS.to_string())
    } else {
        own.iter()
            .chain(outer.iter().rev().flatten())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.clone())
            // Fragments often use `android:` without declaring it.
            .or_else(|| (prefix == ANDROID_PREFIX).then(|| ANDROID_NS.to_string()))
    };

    QName {
        prefix: Some(prefix.to_string()),
        local: local.to_string(),
        namespace,
    }
}

fn utf8(bytes: &[u8], context: &str) -> Result<String, ManifestError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| ManifestError::Utf8 {
            context: context.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::attr;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!-- library manifest -->
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    xmlns:tools="http://schemas.android.com/tools"
    package="com.example.lib">

    <uses-sdk android:minSdkVersion="24" />

    <application android:label="@string/app_name" tools:replace="android:label">
        <activity android:name=".MainActivity">
            <intent-filter>
                <action android:name="android.intent.action.MAIN" />
            </intent-filter>
        </activity>
        <service android:name=".SyncService" android:exported="false"/>
        <![CDATA[ raw & unescaped ]]>
        <meta-data android:name="k" android:value="a &amp; b"/>
    </application>
</manifest>
"#;

    #[test]
    fn test_byte_order_mark_is_kept_and_tags_line_up() {
        let xml = format!("\u{FEFF}{}", MANIFEST);
        let doc = parse_document(&xml).unwrap();
        assert_eq!(doc.to_xml_string(), xml);

        let (_, sdk) = doc.uses_sdk().unwrap();
        assert_eq!(sdk.start_tag(), r#"<uses-sdk android:minSdkVersion="24" />"#);
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let doc = parse_document(MANIFEST).unwrap();
        assert_eq!(doc.to_xml_string(), MANIFEST);
    }

    #[test]
    fn test_namespaces_resolved() {
        let doc = parse_document(MANIFEST).unwrap();
        let (_, app) = doc.application().unwrap();
        let replace = app
            .attributes()
            .iter()
            .find(|a| a.name().local == "replace")
            .unwrap();
        assert_eq!(
            replace.name().namespace.as_deref(),
            Some("http://schemas.android.com/tools")
        );
        assert!(app.android_attribute("label").is_some());
    }

    #[test]
    fn test_undeclared_android_prefix() {
        let doc = parse_document(r#"<application><activity android:name=".Main"/></application>"#)
            .unwrap();
        let components = doc.components();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].declared_name().as_deref(), Some(".Main"));
    }

    #[test]
    fn test_components_and_intent_filters() {
        let doc = parse_document(MANIFEST).unwrap();
        let components = doc.components();
        assert_eq!(components.len(), 2);
        assert!(components[0].has_intent_filter());
        assert!(!components[0].declares_exported());
        assert!(!components[1].has_intent_filter());
        assert!(components[1].declares_exported());
        assert_eq!(components[1].display_name(), ".SyncService");
    }

    #[test]
    fn test_prefixed_tags_are_not_components() {
        let doc = parse_document(
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    xmlns:dist="http://schemas.android.com/apk/distribution">
    <application>
        <dist:activity android:name=".Delivery"><intent-filter/></dist:activity>
        <receiver android:name=".Boot"><intent-filter/></receiver>
    </application>
</manifest>"#,
        )
        .unwrap();
        let components = doc.components();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].display_name(), ".Boot");
    }

    #[test]
    fn test_uses_sdk_lookup() {
        let doc = parse_document(MANIFEST).unwrap();
        let (path, uses_sdk) = doc.uses_sdk().unwrap();
        assert_eq!(
            uses_sdk.android_attribute(attr::MIN_SDK_VERSION).unwrap().raw_value(),
            "24"
        );
        assert_eq!(doc.element(&path).unwrap().name(), "uses-sdk");
        assert!(uses_sdk.is_self_closing());
    }

    #[test]
    fn test_attribute_value_unescaped() {
        let doc = parse_document(MANIFEST).unwrap();
        let (_, app) = doc.application().unwrap();
        let meta = app
            .child_elements()
            .find(|(_, e)| e.name() == "meta-data")
            .unwrap()
            .1;
        let value = meta.android_attribute("value").unwrap();
        assert_eq!(value.raw_value(), "a &amp; b");
        assert_eq!(value.value(), "a & b");
    }

    #[test]
    fn test_android_prefix_from_declaration() {
        let doc = parse_document(
            r#"<manifest xmlns:a="http://schemas.android.com/apk/res/android"><application/></manifest>"#,
        )
        .unwrap();
        assert_eq!(doc.android_prefix(), "a");
    }

    #[test]
    fn test_malformed_documents() {
        assert!(parse_document("<manifest><application></manifest>").is_err());
        assert!(matches!(
            parse_document("<manifest>"),
            Err(ManifestError::Unclosed(_)) | Err(ManifestError::Parse { .. })
        ));
        assert!(matches!(
            parse_document("   "),
            Err(ManifestError::NoRoot)
        ));
        assert!(matches!(
            parse_document("<a/><b/>"),
            Err(ManifestError::MultipleRoots)
        ));
        assert!(parse_document(r#"<a x="1" x="2"/>"#).is_err());
    }
}
