//! A provide or require port declared on a node (`apx_portInstance_t`'s
//! parse-time counterpart before packed-buffer offsets are known).

use crate::parser::data_element::DataElement;
use crate::parser::attribute::{InitValue, PortAttributes};
use crate::types::PortType;

#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    /// Sequential id assigned at declaration time, in declaration order
    /// within this port's own side only: provide ports and require ports
    /// each start from 0 in their own namespace.
    pub id: usize,
    pub name: String,
    pub port_type: PortType,
    pub line: usize,
    pub element: DataElement,
    pub attributes: PortAttributes,

    /// Populated by finalize: the element with all type references inlined
    /// (the "effective" data element: no type references left unresolved).
    pub effective_element: Option<DataElement>,

    /// Populated by finalize: the validated, fully-structured init value
    /// this port's packed buffer is seeded with.
    pub proper_init_value: Option<InitValue>,
}

impl Port {
    pub fn new(id: usize, name: impl Into<String>, port_type: PortType, element: DataElement, attributes: PortAttributes) -> Self {
        Self {
            id,
            name: name.into(),
            port_type,
            line: 0,
            element,
            attributes,
            effective_element: None,
            proper_init_value: None,
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn is_queued(&self) -> bool {
        self.attributes.queue_len.is_some()
    }

    pub fn is_parameter(&self) -> bool {
        self.attributes.is_parameter
    }
}
