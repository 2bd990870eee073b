// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pin identifiers.

use std::fmt;
use tablegraph_document::{ColumnId, RowId};

/// A pin on a node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PinId {
    /// Execution input, top centre
    ExecIn,
    /// Execution output, bottom centre
    ExecOut,
    /// Data pin backed by a node-table column
    Data(ColumnId),
    /// Execution output of one embedded child row
    Embedded {
        /// Subtable column of the node table
        column: ColumnId,
        /// Child row
        row: RowId,
    },
}

impl PinId {
    /// Whether this pin carries execution flow
    pub fn is_execution(&self) -> bool {
        !matches!(self, Self::Data(_))
    }

    /// Data column of this pin
    pub fn data_column(&self) -> Option<&ColumnId> {
        match self {
            Self::Data(column) => Some(column),
            _ => None,
        }
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecIn => write!(f, "exec:in"),
            Self::ExecOut => write!(f, "exec:out"),
            Self::Data(column) => write!(f, "{}", column),
            Self::Embedded { column, row } => write!(f, "embedded:{}:{}", column, row),
        }
    }
}

/// Side of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinDirection {
    /// Receives a connection
    Input,
    /// Starts a connection
    Output,
}

/// A pin on a specific node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PinRef {
    /// Owning node row
    pub node: RowId,
    /// Pin on that node
    pub pin: PinId,
    /// Side
    pub direction: PinDirection,
}

impl PinRef {
    /// Execution input of a node
    pub fn exec_in(node: RowId) -> Self {
        Self {
            node,
            pin: PinId::ExecIn,
            direction: PinDirection::Input,
        }
    }

    /// Execution output of a node
    pub fn exec_out(node: RowId) -> Self {
        Self {
            node,
            pin: PinId::ExecOut,
            direction: PinDirection::Output,
        }
    }

    /// Data input pin
    pub fn input(node: RowId, column: impl Into<ColumnId>) -> Self {
        Self {
            node,
            pin: PinId::Data(column.into()),
            direction: PinDirection::Input,
        }
    }

    /// Data output pin
    pub fn output(node: RowId, column: impl Into<ColumnId>) -> Self {
        Self {
            node,
            pin: PinId::Data(column.into()),
            direction: PinDirection::Output,
        }
    }

    /// Execution output of an embedded child row
    pub fn embedded(node: RowId, column: impl Into<ColumnId>, row: RowId) -> Self {
        Self {
            node,
            pin: PinId::Embedded {
                column: column.into(),
                row,
            },
            direction: PinDirection::Output,
        }
    }
}

impl fmt::Display for PinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_id_display() {
        let row = RowId::new();
        assert_eq!(PinId::ExecIn.to_string(), "exec:in");
        assert_eq!(PinId::ExecOut.to_string(), "exec:out");
        assert_eq!(PinId::Data("In".into()).to_string(), "In");
        assert_eq!(
            PinId::Embedded { column: "Choices".into(), row }.to_string(),
            format!("embedded:Choices:{}", row)
        );
    }

    #[test]
    fn test_execution_pins() {
        let node = RowId::new();
        assert!(PinRef::exec_in(node).pin.is_execution());
        assert!(PinRef::embedded(node, "Choices", RowId::new()).pin.is_execution());
        assert!(!PinRef::input(node, "In").pin.is_execution());
        assert_eq!(PinRef::embedded(node, "Choices", RowId::new()).direction, PinDirection::Output);
    }
}
