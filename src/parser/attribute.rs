//! Parser for the port/type attribute grammar:
//!
//! ```text
//! attributes := attribute (',' attribute)*
//! attribute  := '=' value          ; init value
//!             | 'P'                ; parameter flag
//!             | 'Q' '[' digits ']' ; queued, length > 0
//!             | 'V' 'T' '(' int ',' int ',' string ')'   ; value table entry
//!             | 'R' 'S' '(' int ',' int ',' num ',' num ',' num ',' string ')' ; rational scaling
//! value      := int | string | '{' value (',' value)* '}'
//! ```
//!
//! Follows the top-level loop shape of `attribute_parser.c`'s
//! `apx_attributeParser_parse`: skip whitespace, parse one attribute,
//! require a comma before the next, and track the byte offset of the first
//! failing attribute for error reporting.

use crate::error::{ApxError, Result};

/// A parsed initialization value, mirroring the shape a `DataElement` can
/// take (scalar, string, array, or record) but untyped until finalize
/// checks it against the port's effective element.
#[derive(Debug, Clone, PartialEq)]
pub enum InitValue {
    Integer(i64),
    String(String),
    Array(Vec<InitValue>),
    Record(Vec<(String, InitValue)>),
}

/// One labeled sub-range of a `VT(...)` value table.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTableEntry {
    pub low: i64,
    pub high: i64,
    pub text: String,
}

pub type ValueTable = Vec<ValueTableEntry>;

/// A single `RS(lo, hi, offset, num, denom, "unit")` rational-scaling rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RationalScaling {
    pub low: i64,
    pub high: i64,
    pub offset: f64,
    pub numerator: f64,
    pub denominator: f64,
    pub unit: String,
}

/// The full set of attributes attached to one port or type declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortAttributes {
    pub init_value: Option<InitValue>,
    pub is_parameter: bool,
    pub queue_len: Option<u32>,
    pub value_table: ValueTable,
    pub rational_scaling: Option<RationalScaling>,
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { bytes: text.as_bytes(), pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b == b' ' || b == b'\t') {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: u8) -> Result<()> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(ApxError::InvalidAttribute(self.pos))
        }
    }

    fn parse_signed_int(&mut self) -> Result<i64> {
        let start = self.pos;
        let negative = self.peek() == Some(b'-');
        if negative {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return Err(ApxError::InvalidAttribute(start));
        }
        let text = std::str::from_utf8(&self.bytes[digits_start..self.pos]).unwrap();
        let magnitude: i64 = text.parse().map_err(|_| ApxError::NumberTooLarge)?;
        Ok(if negative { -magnitude } else { magnitude })
    }

    fn parse_unsigned_int(&mut self) -> Result<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(ApxError::InvalidAttribute(start));
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
        text.parse().map_err(|_| ApxError::NumberTooLarge)
    }

    fn parse_float(&mut self) -> Result<f64> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|b| b.is_ascii_digit() || b == b'.') {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(ApxError::InvalidAttribute(start));
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .unwrap()
            .parse()
            .map_err(|_| ApxError::InvalidAttribute(start))
    }

    fn parse_quoted_string(&mut self) -> Result<String> {
        let start = self.pos;
        self.expect(b'"').map_err(|_| ApxError::InvalidAttribute(start))?;
        let content_start = self.pos;
        while self.peek().is_some() && self.peek() != Some(b'"') {
            self.pos += 1;
        }
        if self.peek() != Some(b'"') {
            return Err(ApxError::UnmatchedString(start));
        }
        let s = std::str::from_utf8(&self.bytes[content_start..self.pos])
            .map_err(|_| ApxError::InvalidAttribute(content_start))?
            .to_string();
        self.pos += 1;
        Ok(s)
    }

    fn parse_init_value(&mut self) -> Result<InitValue> {
        match self.peek().ok_or(ApxError::InvalidAttribute(self.pos))? {
            b'"' => Ok(InitValue::String(self.parse_quoted_string()?)),
            b'{' => {
                let start = self.pos;
                self.pos += 1;
                let mut values = Vec::new();
                self.skip_whitespace();
                while self.peek() != Some(b'}') {
                    if self.peek().is_none() {
                        return Err(ApxError::UnmatchedBrace(start));
                    }
                    values.push(self.parse_init_value()?);
                    self.skip_whitespace();
                    if self.peek() == Some(b',') {
                        self.pos += 1;
                        self.skip_whitespace();
                    }
                }
                self.expect(b'}').map_err(|_| ApxError::UnmatchedBrace(start))?;
                Ok(InitValue::Array(values))
            }
            _ => Ok(InitValue::Integer(self.parse_signed_int()?)),
        }
    }

    fn parse_attribute(&mut self, attrs: &mut PortAttributes) -> Result<()> {
        let start = self.pos;
        match self.peek().ok_or(ApxError::InvalidAttribute(start))? {
            b'=' => {
                self.pos += 1;
                attrs.init_value = Some(self.parse_init_value()?);
            }
            b'P' => {
                self.pos += 1;
                attrs.is_parameter = true;
            }
            b'Q' => {
                self.pos += 1;
                self.expect(b'[').map_err(|_| ApxError::ExpectedBracket(self.pos))?;
                let n = self.parse_unsigned_int()?;
                if n == 0 {
                    return Err(ApxError::InvalidAttribute(start));
                }
                self.expect(b']').map_err(|_| ApxError::UnmatchedBracket(start))?;
                attrs.queue_len = Some(n);
            }
            b'V' => {
                self.expect_literal("VT")?;
                self.expect(b'(')?;
                let low = self.parse_signed_int()?;
                self.expect(b',')?;
                let high = self.parse_signed_int()?;
                self.expect(b',')?;
                let text = self.parse_quoted_string()?;
                self.expect(b')')?;
                if low > high {
                    return Err(ApxError::ValueRange);
                }
                attrs.value_table.push(ValueTableEntry { low, high, text });
            }
            b'R' => {
                self.expect_literal("RS")?;
                self.expect(b'(')?;
                let low = self.parse_signed_int()?;
                self.expect(b',')?;
                let high = self.parse_signed_int()?;
                self.expect(b',')?;
                let offset = self.parse_float()?;
                self.expect(b',')?;
                let numerator = self.parse_float()?;
                self.expect(b',')?;
                let denominator = self.parse_float()?;
                self.expect(b',')?;
                let unit = self.parse_quoted_string()?;
                self.expect(b')')?;
                attrs.rational_scaling = Some(RationalScaling { low, high, offset, numerator, denominator, unit });
            }
            _ => return Err(ApxError::InvalidAttribute(start)),
        }
        Ok(())
    }

    fn expect_literal(&mut self, literal: &str) -> Result<()> {
        let start = self.pos;
        if self.bytes[self.pos..].starts_with(literal.as_bytes()) {
            self.pos += literal.len();
            Ok(())
        } else {
            Err(ApxError::InvalidAttribute(start))
        }
    }
}

/// Parse a full attribute list (the text that follows a port/type's `:` in
/// an `.apx` declaration).
pub fn parse_attributes(text: &str) -> Result<PortAttributes> {
    let mut parser = Parser::new(text);
    let mut attrs = PortAttributes::default();
    parser.skip_whitespace();
    if parser.peek().is_none() {
        return Ok(attrs);
    }
    loop {
        parser.parse_attribute(&mut attrs)?;
        parser.skip_whitespace();
        match parser.peek() {
            Some(b',') => {
                parser.pos += 1;
                parser.skip_whitespace();
            }
            None => break,
            Some(_) => return Err(ApxError::InvalidAttribute(parser.pos)),
        }
    }
    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_attribute_string_is_fine() {
        assert_eq!(parse_attributes("").unwrap(), PortAttributes::default());
    }

    #[test]
    fn parses_scalar_init_value() {
        let attrs = parse_attributes("=5").unwrap();
        assert_eq!(attrs.init_value, Some(InitValue::Integer(5)));
    }

    #[test]
    fn parses_array_init_value_and_parameter_flag() {
        let attrs = parse_attributes("={1,2,3},P").unwrap();
        assert_eq!(attrs.init_value, Some(InitValue::Array(vec![InitValue::Integer(1), InitValue::Integer(2), InitValue::Integer(3)])));
        assert!(attrs.is_parameter);
    }

    #[test]
    fn parses_queue_length() {
        let attrs = parse_attributes("Q[8]").unwrap();
        assert_eq!(attrs.queue_len, Some(8));
    }

    #[test]
    fn rejects_zero_length_queue() {
        assert_eq!(parse_attributes("Q[0]"), Err(ApxError::InvalidAttribute(0)));
    }

    #[test]
    fn parses_value_table() {
        let attrs = parse_attributes("VT(0,0,\"Off\"),VT(1,1,\"On\")").unwrap();
        assert_eq!(
            attrs.value_table,
            vec![
                ValueTableEntry { low: 0, high: 0, text: "Off".into() },
                ValueTableEntry { low: 1, high: 1, text: "On".into() },
            ]
        );
    }

    #[test]
    fn parses_rational_scaling() {
        let attrs = parse_attributes("RS(0,65535,0,1,100,\"km/h\")").unwrap();
        let rs = attrs.rational_scaling.unwrap();
        assert_eq!(rs.unit, "km/h");
        assert_eq!(rs.numerator, 1.0);
        assert_eq!(rs.denominator, 100.0);
    }

    #[test]
    fn rejects_missing_comma_between_attributes() {
        assert_eq!(parse_attributes("PP"), Err(ApxError::InvalidAttribute(1)));
    }
}
