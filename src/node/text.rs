//! Parses a full `.apx` node definition document into a `Node`.
//!
//! This is the line-oriented outer grammar that wraps the two grammars
//! spec.md §4.2/§4.3 actually specify (data signatures, attributes): a
//! version header line, then one declaration per line —
//! `N"Name"` (node name), `T"Name"<signature>[:attributes]` (type),
//! `P"Name"<signature>[:attributes]` (provide port), or
//! `R"Name"<signature>[:attributes]` (require port) — matching the example
//! documents in spec.md §8 (S1-S3).
//!
//! Per spec.md §7, `build_node` surfaces the first error together with the
//! 1-based line number it occurred on, so a caller can point a user at the
//! exact line in their source text.

use crate::error::{ApxError, Result};
use crate::node::data_type::TypeAttributes;
use crate::node::Node;
use crate::parser::attribute::{parse_attributes, PortAttributes};
use crate::parser::signature::parse_signature;
use crate::types::PortType;

/// `build_node`'s error type: the underlying `ApxError` plus the 1-based
/// source line it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeParseError {
    pub error: ApxError,
    pub line: usize,
}

impl std::fmt::Display for NodeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.error)
    }
}

impl std::error::Error for NodeParseError {}

/// Parse a complete `.apx` document (version header, `N"..."`, then any
/// number of `T`/`P`/`R` declarations) into an unfinalized `Node`. Does not
/// call `Node::finalize`; callers do that once all nodes sharing a
/// connection's type namespace are in scope.
pub fn build_node(text: &str) -> std::result::Result<Node, NodeParseError> {
    let mut lines = text.lines().enumerate();

    let (header_no, header) = lines.next().ok_or(NodeParseError { error: ApxError::Parse(0), line: 1 })?;
    if !header.starts_with("APX/") {
        return Err(NodeParseError { error: ApxError::InvalidHeader, line: header_no + 1 });
    }

    let mut node: Option<Node> = None;

    for (idx, raw_line) in lines {
        let line_no = idx + 1;
        let line = raw_line.trim_end();
        if line.is_empty() {
            continue;
        }
        let tag = line.as_bytes()[0];
        let rest = &line[1..];
        match tag {
            b'N' => {
                let name = parse_quoted_name(rest).map_err(|e| at(e, line_no))?;
                node = Some(Node::new(name));
            }
            b'T' => {
                let current = node.as_mut().ok_or(at(ApxError::Parse(0), line_no))?;
                let (name, sig, attr_text) = split_declaration(rest).map_err(|e| at(e, line_no))?;
                let element = parse_signature(sig).map_err(|e| at(e, line_no))?;
                let attrs = parse_attributes(attr_text).map_err(|e| at(e, line_no))?;
                if attrs.is_parameter || attrs.queue_len.is_some() {
                    return Err(at(ApxError::InvalidAttribute(0), line_no));
                }
                let type_attrs = if attrs.value_table.is_empty() && attrs.rational_scaling.is_none() {
                    None
                } else {
                    Some(TypeAttributes {
                        value_tables: if attrs.value_table.is_empty() { Vec::new() } else { vec![attrs.value_table] },
                        rational_scalings: attrs.rational_scaling.into_iter().collect(),
                    })
                };
                let id = current.declare_type(name, element);
                current.types[id].attributes = type_attrs;
                current.types[id].line = line_no;
            }
            b'P' | b'R' => {
                let current = node.as_mut().ok_or(at(ApxError::Parse(0), line_no))?;
                let (name, sig, attr_text) = split_declaration(rest).map_err(|e| at(e, line_no))?;
                let element = parse_signature(sig).map_err(|e| at(e, line_no))?;
                let attrs: PortAttributes = parse_attributes(attr_text).map_err(|e| at(e, line_no))?;
                if !attrs.value_table.is_empty() || attrs.rational_scaling.is_some() {
                    return Err(at(ApxError::InvalidAttribute(0), line_no));
                }
                let port_type = if tag == b'P' { PortType::Provide } else { PortType::Require };
                current.declare_port_at_line(port_type, name, element, attrs, line_no);
            }
            _ => return Err(at(ApxError::Parse(0), line_no)),
        }
    }

    node.ok_or(NodeParseError { error: ApxError::Parse(0), line: header_no + 1 })
}

fn at(error: ApxError, line: usize) -> NodeParseError {
    NodeParseError { error, line }
}

fn parse_quoted_name(rest: &str) -> Result<String> {
    let bytes = rest.as_bytes();
    if bytes.first() != Some(&b'"') {
        return Err(ApxError::Parse(0));
    }
    let end = bytes[1..].iter().position(|&b| b == b'"').ok_or(ApxError::UnmatchedString(0))?;
    Ok(rest[1..1 + end].to_string())
}

/// Split a `"Name"<signature>[:attributes]` tail into its three parts. The
/// signature grammar never contains a top-level `:`, so the first `:` found
/// outside of a quoted string (if any) is the attribute separator.
fn split_declaration(rest: &str) -> Result<(String, &str, &str)> {
    let bytes = rest.as_bytes();
    if bytes.first() != Some(&b'"') {
        return Err(ApxError::Parse(0));
    }
    let name_end = bytes[1..].iter().position(|&b| b == b'"').ok_or(ApxError::UnmatchedString(0))?;
    let name = rest[1..1 + name_end].to_string();
    let after_name = &rest[1 + name_end + 1..];

    let mut in_quotes = false;
    let mut split_at = after_name.len();
    for (i, c) in after_name.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => {
                split_at = i;
                break;
            }
            _ => {}
        }
    }
    let (sig, attr_part) = after_name.split_at(split_at);
    let attr_text = attr_part.strip_prefix(':').unwrap_or("");
    Ok((name, sig, attr_text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeCode;

    #[test]
    fn parses_scenario_s1_client_publishes_three_files() {
        let text = "APX/1.2\nN\"TestNode\"\nP\"U16Signal\"S:=65535\nP\"U8Signal1\"C:=7\nP\"U8Signal2\"C:=15\nR\"U8Signal3\"C:=7\nR\"U32Signal\"L:=0\n";
        let mut node = build_node(text).unwrap();
        assert_eq!(node.name, "TestNode");
        assert_eq!(node.provide_ports.len(), 3);
        assert_eq!(node.require_ports.len(), 2);
        node.finalize().unwrap();
        assert_eq!(node.provide_ports[0].proper_init_value, Some(crate::parser::attribute::InitValue::Integer(65535)));
    }

    #[test]
    fn parses_scenario_s2_value_table_typed_port() {
        let text = "APX/1.3\nN\"X\"\nT\"V_T\"S:VT(0xFE00,0xFEFF,\"Error\"),VT(0xFF00,0xFFFF,\"NotAvailable\"),RS(0,0xFDFF,0,1,64,\"km/h\")\nP\"V\"T[0]\n";
        let node = build_node(text).unwrap();
        assert_eq!(node.types.len(), 1);
        assert_eq!(node.types[0].name, "V_T");
        assert_eq!(node.types[0].element, crate::parser::data_element::DataElement::scalar(TypeCode::U16));
        let attrs = node.types[0].attributes.as_ref().unwrap();
        assert_eq!(attrs.value_tables[0].len(), 2);
        assert_eq!(attrs.rational_scalings.len(), 1);
    }

    #[test]
    fn rejects_missing_header() {
        let err = build_node("N\"X\"\n").unwrap_err();
        assert_eq!(err.error, ApxError::InvalidHeader);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn reports_line_number_of_first_error() {
        let text = "APX/1.2\nN\"X\"\nP\"Bad\"Z\n";
        let err = build_node(text).unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn rejects_parameter_flag_on_type_declaration() {
        let text = "APX/1.2\nN\"X\"\nT\"Foo\"C:P\n";
        let err = build_node(text).unwrap_err();
        assert_eq!(err.error, ApxError::InvalidAttribute(0));
    }
}
