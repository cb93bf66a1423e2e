//! Template loading and management

use crate::xml::{escape_attribute, escape_text};
use spec2proxy_common::{GeneratorError, Result};
use std::collections::HashMap;
use tera::{Tera, Value};

/// Load all templates
pub fn load_templates() -> Result<Tera> {
    let mut tera = Tera::default();

    // Escaping is explicit through `xml_escape`, tera would otherwise
    // HTML-escape every `.xml` template
    tera.autoescape_on(vec![]);

    tera.register_filter("xml_escape", xml_escape_filter);
    tera.register_filter("xml_attr", xml_attr_filter);

    // Macros must be registered before the templates importing them
    tera.add_raw_template("flows.xml", include_str!("../templates/flows.xml.tera"))
        .map_err(|e| {
            GeneratorError::Generation(format!("Failed to load flows.xml template: {}", e))
        })?;

    tera.add_raw_template("manifest.xml", include_str!("../templates/manifest.xml.tera"))
        .map_err(|e| {
            GeneratorError::Generation(format!("Failed to load manifest.xml template: {}", e))
        })?;

    tera.add_raw_template(
        "proxy_endpoint.xml",
        include_str!("../templates/proxy_endpoint.xml.tera"),
    )
    .map_err(|e| {
        GeneratorError::Generation(format!(
            "Failed to load proxy_endpoint.xml template: {}",
            e
        ))
    })?;

    tera.add_raw_template(
        "target_endpoint.xml",
        include_str!("../templates/target_endpoint.xml.tera"),
    )
    .map_err(|e| {
        GeneratorError::Generation(format!(
            "Failed to load target_endpoint.xml template: {}",
            e
        ))
    })?;

    Ok(tera)
}

/// Filter to escape element text
fn xml_escape_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(escape_text(&value_text(value)?)))
}

/// Filter to escape a double-quoted attribute value
fn xml_attr_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(escape_attribute(&value_text(value)?)))
}

fn value_text(value: &Value) -> tera::Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(tera::Error::msg(
            "xml_escape filter expects a string, number or boolean",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_templates() {
        let tera = load_templates().unwrap();
        let names: Vec<&str> = tera.get_template_names().collect();
        assert!(names.contains(&"manifest.xml"));
        assert!(names.contains(&"proxy_endpoint.xml"));
        assert!(names.contains(&"target_endpoint.xml"));
    }

    #[test]
    fn test_xml_escape_filter() {
        let escaped = xml_escape_filter(
            &Value::String("a < b & c".to_string()),
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(escaped, Value::String("a &lt; b &amp; c".to_string()));

        let number = xml_escape_filter(&Value::from(404), &HashMap::new()).unwrap();
        assert_eq!(number, Value::String("404".to_string()));

        assert!(xml_escape_filter(&Value::Array(vec![]), &HashMap::new()).is_err());
    }

    #[test]
    fn test_xml_attr_filter_escapes_quotes() {
        let escaped =
            xml_attr_filter(&Value::String("say \"hi\"".to_string()), &HashMap::new()).unwrap();
        assert_eq!(escaped, Value::String("say &quot;hi&quot;".to_string()));
    }
}
