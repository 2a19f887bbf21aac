//! The APX definition-language front end: the data-signature grammar (types)
//! and the attribute grammar (init values, parameter/queue flags, value
//! tables, rational scaling), plus the parse-tree types they build.

pub mod attribute;
pub mod data_element;
pub mod signature;

pub use attribute::{parse_attributes, PortAttributes, ValueTable};
pub use data_element::{DataElement, TypeRef};
pub use signature::parse_signature;
