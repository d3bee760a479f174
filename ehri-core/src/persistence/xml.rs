// SPDX-License-Identifier: MIT OR Apache-2.0

//! XML rendering of bundles.
//!
//! ```xml
//! <item id="c1" type="DocumentaryUnit">
//!   <data>
//!     <property name="identifier" type="xs:string">c1</property>
//!   </data>
//!   <relationships>
//!     <describes>
//!       <item id="c1.eng" type="DocumentaryUnitDescription">...</item>
//!     </describes>
//!   </relationships>
//! </item>
//! ```
use std::fmt::Write;

use serde_json::Value;

use crate::persistence::Bundle;

const INDENT: &str = "  ";

pub(crate) fn bundle_to_xml(bundle: &Bundle) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write_item(&mut out, bundle, 0);
    out
}

fn write_item(out: &mut String, bundle: &Bundle, level: usize) {
    let pad = INDENT.repeat(level);
    let _ = write!(out, "{pad}<item");
    if let Some(id) = bundle.id() {
        let _ = write!(out, " id=\"{}\"", escape(id));
    }
    let _ = writeln!(out, " type=\"{}\">", bundle.class().name());

    if !bundle.data().is_empty() {
        let _ = writeln!(out, "{pad}{INDENT}<data>");
        for (key, value) in bundle.data() {
            write_property(out, key, value, level + 2);
        }
        let _ = writeln!(out, "{pad}{INDENT}</data>");
    }

    let relations: Vec<_> = bundle
        .relations()
        .iter()
        .filter(|(_, bundles)| !bundles.is_empty())
        .collect();
    if !relations.is_empty() {
        let _ = writeln!(out, "{pad}{INDENT}<relationships>");
        for (name, bundles) in relations {
            let _ = writeln!(out, "{pad}{INDENT}{INDENT}<{name}>");
            for related in bundles {
                write_item(out, related, level + 3);
            }
            let _ = writeln!(out, "{pad}{INDENT}{INDENT}</{name}>");
        }
        let _ = writeln!(out, "{pad}{INDENT}</relationships>");
    }
    let _ = writeln!(out, "{pad}</item>");
}

fn write_property(out: &mut String, name: &str, value: &Value, level: usize) {
    let pad = INDENT.repeat(level);
    match value {
        Value::Array(values) => {
            let _ = writeln!(out, "{pad}<property name=\"{}\" type=\"array\">", escape(name));
            for value in values {
                let _ = writeln!(
                    out,
                    "{pad}{INDENT}<value type=\"{}\">{}</value>",
                    xml_type(value),
                    escape(&text(value))
                );
            }
            let _ = writeln!(out, "{pad}</property>");
        }
        value => {
            let _ = writeln!(
                out,
                "{pad}<property name=\"{}\" type=\"{}\">{}</property>",
                escape(name),
                xml_type(value),
                escape(&text(value))
            );
        }
    }
}

fn xml_type(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "xs:string",
        Value::Bool(_) => "xs:boolean",
        Value::Number(number) if number.is_i64() || number.is_u64() => "xs:long",
        Value::Number(_) => "xs:double",
        Value::Array(_) => "array",
        Value::Null | Value::Object(_) => "unknown",
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        value => value.to_string(),
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::models::EntityClass;
    use crate::persistence::Bundle;

    #[test]
    fn renders_nested_items() {
        let bundle = Bundle::builder(EntityClass::DocumentaryUnit)
            .id("c1")
            .data_value("identifier", "c1")
            .data_value("extent", 12)
            .data_value("languages", json!(["eng", "fra"]))
            .relation(
                "describes",
                Bundle::builder(EntityClass::DocumentaryUnitDescription)
                    .id("c1.eng")
                    .data_value("name", "Fish & <Chips>")
                    .build(),
            )
            .build();

        let xml = bundle.to_xml_string();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<item id=\"c1\" type=\"DocumentaryUnit\">"));
        assert!(xml.contains("<property name=\"extent\" type=\"xs:long\">12</property>"));
        assert!(xml.contains("<property name=\"languages\" type=\"array\">"));
        assert!(xml.contains("<value type=\"xs:string\">fra</value>"));
        assert!(xml.contains("<describes>"));
        assert!(xml.contains("Fish &amp; &lt;Chips&gt;"));
    }
}
