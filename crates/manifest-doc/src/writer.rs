//! Serialization and start-tag editing.

use crate::document::{Element, ManifestDocument, Node};

/// Serialize a document back to XML text.
pub(crate) fn write_document(doc: &ManifestDocument) -> String {
    let mut out = String::new();
    for node in &doc.nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Raw(raw) => out.push_str(raw),
        Node::Element(element) => write_element(element, out),
    }
}

fn write_element(element: &Element, out: &mut String) {
    out.push_str(&element.start_tag);
    for child in &element.children {
        write_node(child, out);
    }
    if let Some(end) = &element.end_tag {
        out.push_str(end);
    }
}

/// Replace the quoted value of `qname` inside a start tag.
///
/// Returns `None` when the attribute cannot be located with `old_raw` as its
/// current value.
pub(crate) fn replace_attribute_value(
    tag: &str,
    qname: &str,
    old_raw: &str,
    new_raw: &str,
) -> Option<String> {
    let bytes = tag.as_bytes();
    let mut from = 0;
    while let Some(offset) = tag[from..].find(qname) {
        let start = from + offset;
        from = start + qname.len();

        if start == 0 || !bytes[start - 1].is_ascii_whitespace() {
            continue;
        }
        let mut i = skip_whitespace(bytes, start + qname.len());
        if bytes.get(i) != Some(&b'=') {
            continue;
        }
        i = skip_whitespace(bytes, i + 1);
        let quote = match bytes.get(i) {
            Some(&q) if q == b'"' || q == b'\'' => q as char,
            _ => continue,
        };
        let value_start = i + 1;
        let value_end = value_start + tag[value_start..].find(quote)?;
        if &tag[value_start..value_end] != old_raw {
            continue;
        }

        let mut edited = String::with_capacity(tag.len() + new_raw.len());
        edited.push_str(&tag[..value_start]);
        edited.push_str(new_raw);
        edited.push_str(&tag[value_end..]);
        return Some(edited);
    }
    None
}

/// Append ` qname="raw"` just before the closing `>` or `/>`.
pub(crate) fn append_attribute(tag: &str, qname: &str, raw: &str) -> String {
    let close_len = if tag.ends_with("/>") { 2 } else { 1 };
    let body = &tag[..tag.len().saturating_sub(close_len)];
    let kept = body.trim_end();
    format!("{} {}=\"{}\"{}", kept, qname, raw, &tag[kept.len()..])
}

/// Render a start tag from scratch.
pub(crate) fn render_start_tag(element: &Element) -> String {
    let mut tag = format!("<{}", element.name);
    for attr in &element.attributes {
        tag.push(' ');
        tag.push_str(&attr.name.qualified());
        tag.push_str("=\"");
        if attr.raw_value.contains('"') {
            tag.push_str(&quick_xml::escape::escape(attr.value().as_ref()));
        } else {
            tag.push_str(&attr.raw_value);
        }
        tag.push('"');
    }
    tag.push_str(if element.end_tag.is_none() { "/>" } else { ">" });
    tag
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).is_some_and(|b| b.is_ascii_whitespace()) {
        i += 1;
    }
    i
}
