//! Schema-less tree to XML codec
//!
//! Policy documents are arbitrary YAML trees. Element names come from
//! mapping keys, with two naming conventions:
//! - `.name: value` on a mapping becomes the attribute `name="value"` of the
//!   enclosing element (scalar values only)
//! - `.@anything: value` renders `value` inline, without a wrapping element
//!
//! A sequence under a key renders as one element wrapping all items.
//! Elements are written one per line and indented, except inside an element
//! that mixes inline text with child elements: that element is written on a
//! single line so its text stays exactly as authored.

use serde_yaml::Value;

/// Prolog written at the top of every generated XML document
pub const XML_PROLOG: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const INDENT: &str = "  ";

/// Render a tree as a complete XML document
pub fn to_xml(tree: &Value) -> String {
    let mut body = String::new();
    render_content(&mut body, tree, Layout::Indented(0));

    let mut document = String::with_capacity(XML_PROLOG.len() + body.len() + 2);
    document.push_str(XML_PROLOG);
    document.push('\n');
    document.push_str(body.trim_end_matches('\n'));
    document.push('\n');
    document
}

/// Escape text content
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escape an attribute value (always double-quoted)
pub fn escape_attribute(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Where rendered elements go: one per line at a depth, or run together
/// inside mixed content
#[derive(Clone, Copy)]
enum Layout {
    Indented(usize),
    Compact,
}

impl Layout {
    fn nested(self) -> Self {
        match self {
            Layout::Indented(depth) => Layout::Indented(depth + 1),
            Layout::Compact => Layout::Compact,
        }
    }
}

/// What `render_content` wrote
#[derive(Default)]
struct Written {
    elements: bool,
    text: bool,
}

impl Written {
    fn merge(&mut self, other: Written) {
        self.elements |= other.elements;
        self.text |= other.text;
    }
}

/// Render `value` without a wrapping element
fn render_content(out: &mut String, value: &Value, layout: Layout) -> Written {
    let mut written = Written::default();
    match value {
        Value::Mapping(mapping) => {
            for (key, child) in mapping {
                let key = key_text(key);
                match KeyKind::of(&key) {
                    KeyKind::Attribute(_) if is_scalar(child) => {}
                    KeyKind::Attribute(_) | KeyKind::Inline => {
                        written.merge(render_content(out, child, layout));
                    }
                    KeyKind::Element => {
                        render_element(out, &key, child, layout);
                        written.elements = true;
                    }
                }
            }
        }
        Value::Sequence(items) => {
            for item in items {
                written.merge(render_content(out, item, layout));
            }
        }
        Value::Tagged(tagged) => written = render_content(out, &tagged.value, layout),
        scalar => {
            let text = escape_text(&scalar_text(scalar));
            written.text = !text.is_empty();
            out.push_str(&text);
        }
    }
    written
}

fn render_element(out: &mut String, tag: &str, value: &Value, layout: Layout) {
    let indent = match layout {
        Layout::Indented(depth) => INDENT.repeat(depth),
        Layout::Compact => String::new(),
    };
    out.push_str(&indent);
    out.push('<');
    out.push_str(tag);

    if let Value::Mapping(mapping) = untagged(value) {
        for (key, child) in mapping {
            let key = key_text(key);
            if let KeyKind::Attribute(name) = KeyKind::of(&key) {
                if is_scalar(child) {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(&scalar_text(child)));
                    out.push('"');
                }
            }
        }
    }
    out.push('>');

    let mut content = String::new();
    let written = render_content(&mut content, value, layout.nested());
    match layout {
        Layout::Indented(_) if written.elements && written.text => {
            // Padding would become part of the text
            content.clear();
            render_content(&mut content, value, Layout::Compact);
            out.push_str(&content);
        }
        Layout::Indented(_) if written.elements => {
            out.push('\n');
            out.push_str(&content);
            out.push_str(&indent);
        }
        _ => out.push_str(&content),
    }

    out.push_str("</");
    out.push_str(tag);
    out.push('>');
    if let Layout::Indented(_) = layout {
        out.push('\n');
    }
}

enum KeyKind<'a> {
    /// `.name`, carrying the attribute name
    Attribute(&'a str),
    /// `.@anything`
    Inline,
    Element,
}

impl<'a> KeyKind<'a> {
    fn of(key: &'a str) -> Self {
        if key.starts_with(".@") {
            KeyKind::Inline
        } else if let Some(name) = key.strip_prefix('.').filter(|name| !name.is_empty()) {
            KeyKind::Attribute(name)
        } else {
            KeyKind::Element
        }
    }
}

fn untagged(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untagged(&tagged.value),
        other => other,
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(
        untagged(value),
        Value::Mapping(_) | Value::Sequence(_)
    )
}

fn scalar_text(value: &Value) -> String {
    match untagged(value) {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

fn key_text(key: &Value) -> String {
    match untagged(key) {
        Value::String(s) => s.clone(),
        other => scalar_text(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_attributes_and_nesting() {
        let tree = yaml(
            r#"
RaiseFault:
  .name: RF-HTTP404
  .enabled: true
  FaultResponse:
    Set:
      StatusCode: 404
"#,
        );

        assert_eq!(
            to_xml(&tree),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<RaiseFault name="RF-HTTP404" enabled="true">
  <FaultResponse>
    <Set>
      <StatusCode>404</StatusCode>
    </Set>
  </FaultResponse>
</RaiseFault>
"#
        );
    }

    #[test]
    fn test_inline_keys_render_without_wrapper() {
        let tree = yaml(
            r#"
Parameter:
  .name: target
  .@value: orders
"#,
        );

        assert_eq!(
            to_xml(&tree),
            format!("{XML_PROLOG}\n<Parameter name=\"target\">orders</Parameter>\n")
        );
    }

    #[test]
    fn test_mixed_content_is_not_padded() {
        let tree = yaml(
            r#"
Outer:
  Parameter:
    .name: p1
    .@text: Literal
    Child:
      Leaf: x
  After: y
"#,
        );

        assert_eq!(
            to_xml(&tree),
            format!(
                "{XML_PROLOG}\n<Outer>\n{}{}</Outer>\n",
                "  <Parameter name=\"p1\">Literal<Child><Leaf>x</Leaf></Child></Parameter>\n",
                "  <After>y</After>\n",
            )
        );
    }

    #[test]
    fn test_empty_inline_text_keeps_indentation() {
        let tree = yaml("Outer:\n  .@text: ~\n  Inner: x\n");

        assert_eq!(
            to_xml(&tree),
            format!("{XML_PROLOG}\n<Outer>\n  <Inner>x</Inner>\n</Outer>\n")
        );
    }

    #[test]
    fn test_sequence_wraps_all_items_in_one_element() {
        let tree = yaml(
            r#"
Headers:
  - Header:
      .name: a
      .@v: "1"
  - Header:
      .name: b
      .@v: "2"
"#,
        );

        assert_eq!(
            to_xml(&tree),
            format!(
                "{XML_PROLOG}\n<Headers>\n{}{}</Headers>\n",
                "  <Header name=\"a\">1</Header>\n", "  <Header name=\"b\">2</Header>\n",
            )
        );
    }

    #[test]
    fn test_empty_and_null_elements_close_inline() {
        let tree = yaml("Policy:\n  Empty: ~\n  Nothing: {}\n  Items: []\n");

        assert_eq!(
            to_xml(&tree),
            format!(
                "{XML_PROLOG}\n<Policy>\n{}</Policy>\n",
                "  <Empty></Empty>\n  <Nothing></Nothing>\n  <Items></Items>\n",
            )
        );
    }

    #[test]
    fn test_escaping() {
        let tree = yaml(
            r#"
AssignMessage:
  .name: 'say "hi" & <bye>'
  Payload: "a < b && c > d"
"#,
        );
        let xml = to_xml(&tree);

        assert!(xml.contains(r#"name="say &quot;hi&quot; &amp; &lt;bye&gt;""#));
        assert!(xml.contains("<Payload>a &lt; b &amp;&amp; c &gt; d</Payload>"));
    }

    #[test]
    fn test_nonscalar_dot_keys_are_not_attributes() {
        let tree = yaml("Outer:\n  .meta:\n    Inner: x\n");

        assert_eq!(
            to_xml(&tree),
            format!("{XML_PROLOG}\n<Outer>\n  <Inner>x</Inner>\n</Outer>\n")
        );
    }

    #[test]
    fn test_output_is_deterministic() {
        let tree = yaml("A:\n  .x: 1\n  B: [1, 2]\n  C: {D: e}\n");
        assert_eq!(to_xml(&tree), to_xml(&tree.clone()));
    }

    #[test]
    fn test_scalar_root() {
        assert_eq!(
            to_xml(&Value::String("plain".into())),
            format!("{XML_PROLOG}\nplain\n")
        );
    }
}
