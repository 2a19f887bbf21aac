//! Recursive-descent parser for the data-signature grammar:
//!
//! ```text
//! element   := scalar | record | typeref
//! scalar    := <one of C S L Q c s l q a A u U b B> [limits] [array]
//! record    := '{' ( '"' name '"' element )+ '}' [array]
//! typeref   := 'T' '[' ( digits | '"' name '"' ) ']' [array]
//! limits    := '(' int ',' int ')'
//! array     := '[' digits [ '*' ] ']'
//! ```
//!
//! Every error carries the byte offset of the character that caused it, so
//! callers can point at the exact failing position in the source `.apx`
//! text.

use crate::error::{ApxError, Result};
use crate::parser::data_element::{DataElement, TypeRef};
use crate::types::TypeCode;

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

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn expect(&mut self, c: u8) -> Result<()> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(ApxError::Parse(self.pos))
        }
    }

    fn parse_element(&mut self) -> Result<DataElement> {
        let base = match self.peek().ok_or(ApxError::Parse(self.pos))? {
            b'{' => self.parse_record()?,
            b'T' => self.parse_type_ref()?,
            _ => self.parse_scalar()?,
        };
        self.parse_array_suffix(base)
    }

    fn parse_scalar(&mut self) -> Result<DataElement> {
        let start = self.pos;
        let c = self.advance().ok_or(ApxError::Parse(start))?;
        let type_code = match c {
            b'C' => TypeCode::U8,
            b'S' => TypeCode::U16,
            b'L' => TypeCode::U32,
            b'Q' => TypeCode::U64,
            b'c' => TypeCode::I8,
            b's' => TypeCode::I16,
            b'l' => TypeCode::I32,
            b'q' => TypeCode::I64,
            b'a' => TypeCode::Char,
            b'A' => TypeCode::Char8,
            b'u' => TypeCode::Char16,
            b'U' => TypeCode::Char32,
            b'b' => TypeCode::Bool,
            b'B' => TypeCode::Byte,
            _ => return Err(ApxError::DataSignature(start)),
        };
        let limits = if self.peek() == Some(b'(') {
            if !type_code.accepts_limits() {
                return Err(ApxError::InvalidAttribute(self.pos));
            }
            Some(self.parse_limits()?)
        } else {
            None
        };
        Ok(DataElement::Scalar { type_code, limits })
    }

    fn parse_limits(&mut self) -> Result<(i64, i64)> {
        self.expect(b'(')?;
        let lo = self.parse_signed_int()?;
        self.expect(b',')?;
        let hi = self.parse_signed_int()?;
        self.expect(b')')?;
        if lo > hi {
            return Err(ApxError::ValueRange);
        }
        Ok((lo, hi))
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
            return Err(ApxError::Parse(start));
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
            return Err(ApxError::Parse(start));
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
        text.parse().map_err(|_| ApxError::NumberTooLarge)
    }

    fn parse_quoted_string(&mut self) -> Result<String> {
        let start = self.pos;
        self.expect(b'"').map_err(|_| ApxError::Parse(start))?;
        let content_start = self.pos;
        while self.peek().is_some() && self.peek() != Some(b'"') {
            self.pos += 1;
        }
        if self.peek() != Some(b'"') {
            return Err(ApxError::UnmatchedString(start));
        }
        let s = std::str::from_utf8(&self.bytes[content_start..self.pos])
            .map_err(|_| ApxError::Parse(content_start))?
            .to_string();
        self.pos += 1; // closing quote
        Ok(s)
    }

    fn parse_record(&mut self) -> Result<DataElement> {
        let start = self.pos;
        self.expect(b'{')?;
        let mut fields = Vec::new();
        while self.peek() != Some(b'}') {
            if self.peek().is_none() {
                return Err(ApxError::UnmatchedBrace(start));
            }
            let name = self.parse_quoted_string()?;
            let element = self.parse_element()?;
            fields.push((name, element));
        }
        self.expect(b'}').map_err(|_| ApxError::UnmatchedBrace(start))?;
        if fields.is_empty() {
            return Err(ApxError::EmptyRecord);
        }
        Ok(DataElement::Record { fields })
    }

    fn parse_type_ref(&mut self) -> Result<DataElement> {
        let start = self.pos;
        self.expect(b'T')?;
        self.expect(b'[').map_err(|_| ApxError::ExpectedBracket(self.pos))?;
        let reference = if self.peek() == Some(b'"') {
            TypeRef::Name(self.parse_quoted_string()?)
        } else {
            TypeRef::Id(self.parse_unsigned_int().map_err(|_| ApxError::InvalidTypeRef)?)
        };
        self.expect(b']').map_err(|_| ApxError::UnmatchedBracket(start))?;
        Ok(DataElement::TypeRef(reference))
    }

    fn parse_array_suffix(&mut self, base: DataElement) -> Result<DataElement> {
        if self.peek() != Some(b'[') {
            return Ok(base);
        }
        let start = self.pos;
        self.pos += 1;
        let len = self.parse_unsigned_int()?;
        let dynamic = self.peek() == Some(b'*');
        if dynamic {
            self.pos += 1;
        }
        self.expect(b']').map_err(|_| ApxError::UnmatchedBracket(start))?;
        Ok(DataElement::Array { element: Box::new(base), len, dynamic })
    }
}

/// Parse one data-signature string into a `DataElement` tree, rejecting any
/// trailing characters after a complete element.
pub fn parse_signature(text: &str) -> Result<DataElement> {
    let mut parser = Parser::new(text);
    let element = parser.parse_element()?;
    if parser.pos != parser.bytes.len() {
        return Err(ApxError::StrayCharactersAfterParse(parser.pos));
    }
    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_scalar() {
        assert_eq!(parse_signature("C").unwrap(), DataElement::scalar(TypeCode::U8));
        assert_eq!(parse_signature("q").unwrap(), DataElement::scalar(TypeCode::I64));
    }

    #[test]
    fn parses_scalar_with_limits() {
        let element = parse_signature("L(0,100)").unwrap();
        assert_eq!(element, DataElement::Scalar { type_code: TypeCode::U32, limits: Some((0, 100)) });
    }

    #[test]
    fn rejects_limits_on_non_numeric_type() {
        assert_eq!(parse_signature("a(0,1)"), Err(ApxError::InvalidAttribute(1)));
    }

    #[test]
    fn parses_fixed_and_dynamic_arrays() {
        let fixed = parse_signature("C[8]").unwrap();
        assert_eq!(fixed, DataElement::Array { element: Box::new(DataElement::scalar(TypeCode::U8)), len: 8, dynamic: false });
        let dynamic = parse_signature("C[8*]").unwrap();
        assert_eq!(dynamic, DataElement::Array { element: Box::new(DataElement::scalar(TypeCode::U8)), len: 8, dynamic: true });
        assert!(dynamic.has_dynamic_array());
    }

    #[test]
    fn parses_record_with_named_fields() {
        let element = parse_signature("{\"First\"C\"Second\"L}").unwrap();
        assert_eq!(
            element,
            DataElement::Record {
                fields: vec![
                    ("First".to_string(), DataElement::scalar(TypeCode::U8)),
                    ("Second".to_string(), DataElement::scalar(TypeCode::U32)),
                ]
            }
        );
    }

    #[test]
    fn rejects_empty_record() {
        assert_eq!(parse_signature("{}"), Err(ApxError::EmptyRecord));
    }

    #[test]
    fn parses_type_ref_by_id_and_name() {
        assert_eq!(parse_signature("T[5]").unwrap(), DataElement::TypeRef(TypeRef::Id(5)));
        assert_eq!(parse_signature("T[\"Point\"]").unwrap(), DataElement::TypeRef(TypeRef::Name("Point".into())));
    }

    #[test]
    fn rejects_unmatched_brace() {
        assert_eq!(parse_signature("{\"A\"C"), Err(ApxError::UnmatchedBrace(0)));
    }

    #[test]
    fn rejects_stray_trailing_characters() {
        assert_eq!(parse_signature("CC"), Err(ApxError::StrayCharactersAfterParse(1)));
    }
}
