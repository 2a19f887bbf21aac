//! A parsed `.apx` node: its locally declared types plus provide/require
//! ports, before (`Node::new`) and after (`Node::finalize`) the finalize
//! pass described in `node::finalize`.

use crate::error::Result;
use crate::node::data_type::DataType;
use crate::node::finalize;
use crate::node::port::Port;
use crate::parser::data_element::DataElement;
use crate::parser::attribute::PortAttributes;
use crate::types::PortType;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub types: Vec<DataType>,
    pub provide_ports: Vec<Port>,
    pub require_ports: Vec<Port>,
    finalized: bool,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), types: Vec::new(), provide_ports: Vec::new(), require_ports: Vec::new(), finalized: false }
    }

    pub fn declare_type(&mut self, name: impl Into<String>, element: DataElement) -> usize {
        let id = self.types.len();
        self.types.push(DataType::new(id, name, element));
        id
    }

    pub fn declare_port(
        &mut self,
        port_type: PortType,
        name: impl Into<String>,
        element: DataElement,
        attributes: PortAttributes,
    ) -> usize {
        self.declare_port_at_line(port_type, name, element, attributes, 0)
    }

    pub fn declare_port_at_line(
        &mut self,
        port_type: PortType,
        name: impl Into<String>,
        element: DataElement,
        attributes: PortAttributes,
        line: usize,
    ) -> usize {
        let id = match port_type {
            PortType::Provide => self.provide_ports.len(),
            PortType::Require => self.require_ports.len(),
        };
        let port = Port::new(id, name, port_type, element, attributes).with_line(line);
        match port_type {
            PortType::Provide => self.provide_ports.push(port),
            PortType::Require => self.require_ports.push(port),
        }
        id
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Resolve type references, flatten each port's effective element, and
    /// derive/validate each port's proper init value. Idempotent.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        finalize::finalize_node(self)?;
        self.finalized = true;
        Ok(())
    }

    pub fn all_ports(&self) -> impl Iterator<Item = &Port> {
        self.provide_ports.iter().chain(self.require_ports.iter())
    }

    pub fn find_type_by_name(&self, name: &str) -> Option<&DataType> {
        self.types.iter().find(|t| t.name == name)
    }
}
