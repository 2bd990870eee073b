// SPDX-License-Identifier: MIT OR Apache-2.0
//! Column kinds and typed cell values.

use crate::ids::RowId;
use serde::{Deserialize, Serialize};

/// Kind of data a column holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Floating point number
    Number,
    /// Free text
    Text,
    /// One of a fixed set of options (stored as text)
    Select,
    /// Boolean
    Checkbox,
    /// 2D vector
    Vec2,
    /// 3D vector
    Vec3,
    /// 4D vector
    Vec4,
    /// Color (RGBA, stored as a 4D vector)
    Color,
    /// Reference to a row in another (or the same) table
    Relation,
    /// Embedded child table
    Subtable,
    /// Computed value driven by a formula expression
    Formula,
}

impl ColumnKind {
    /// Get the color used for pins and wires of this kind (for UI)
    pub fn color(&self) -> [u8; 3] {
        match self {
            Self::Number => [80, 200, 80],
            Self::Text => [200, 180, 150],
            Self::Select => [200, 150, 80],
            Self::Checkbox => [200, 80, 80],
            Self::Vec2 => [200, 200, 80],
            Self::Vec3 => [200, 150, 80],
            Self::Vec4 => [200, 100, 200],
            Self::Color => [255, 200, 100],
            Self::Relation => [100, 150, 200],
            Self::Subtable => [150, 100, 200],
            Self::Formula => [80, 200, 200],
        }
    }

    /// Display name of this kind
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Number => "Number",
            Self::Text => "Text",
            Self::Select => "Select",
            Self::Checkbox => "Checkbox",
            Self::Vec2 => "Vec2",
            Self::Vec3 => "Vec3",
            Self::Vec4 => "Vec4",
            Self::Color => "Color",
            Self::Relation => "Relation",
            Self::Subtable => "Subtable",
            Self::Formula => "Formula",
        }
    }

    /// Whether cells of this kind are edited as wrapped text
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }

    /// Get all kinds, in menu order
    pub fn all() -> &'static [ColumnKind] {
        &[
            Self::Number,
            Self::Text,
            Self::Select,
            Self::Checkbox,
            Self::Vec2,
            Self::Vec3,
            Self::Vec4,
            Self::Color,
            Self::Relation,
            Self::Subtable,
            Self::Formula,
        ]
    }

    /// Default value for a freshly created cell of this kind
    pub fn default_value(&self) -> CellValue {
        match self {
            Self::Number | Self::Formula => CellValue::Number(0.0),
            Self::Text | Self::Select => CellValue::Text(String::new()),
            Self::Checkbox => CellValue::Bool(false),
            Self::Vec2 => CellValue::Vec2([0.0; 2]),
            Self::Vec3 => CellValue::Vec3([0.0; 3]),
            Self::Vec4 | Self::Color => CellValue::Vec4([0.0; 4]),
            Self::Relation | Self::Subtable => CellValue::Empty,
        }
    }
}

/// Value stored in a cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    /// No value
    #[default]
    Empty,
    /// Number
    Number(f64),
    /// Text
    Text(String),
    /// Boolean
    Bool(bool),
    /// 2D vector
    Vec2([f32; 2]),
    /// 3D vector
    Vec3([f32; 3]),
    /// 4D vector / color
    Vec4([f32; 4]),
    /// Reference to a row
    Relation(RowId),
}

impl CellValue {
    /// Get the value as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Get the value as a number, if it is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the value as a 2D vector
    pub fn as_vec2(&self) -> Option<[f32; 2]> {
        match self {
            Self::Vec2(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the referenced row, if this is a relation
    pub fn as_relation(&self) -> Option<RowId> {
        match self {
            Self::Relation(id) => Some(*id),
            _ => None,
        }
    }

    /// Whether the cell holds no value
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Render the value as display text
    pub fn display_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Number(n) => format!("{n}"),
            Self::Text(text) => text.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Vec2([x, y]) => format!("{x}, {y}"),
            Self::Vec3([x, y, z]) => format!("{x}, {y}, {z}"),
            Self::Vec4([x, y, z, w]) => format!("{x}, {y}, {z}, {w}"),
            Self::Relation(id) => id.to_string(),
        }
    }

    /// Parse user-entered text into a value of the given kind.
    ///
    /// Returns `None` when the text cannot be read as that kind.
    pub fn parse(kind: ColumnKind, text: &str) -> Option<Self> {
        let text = text.trim();
        let floats = || -> Option<Vec<f32>> {
            text.split(',')
                .map(|part| part.trim().parse::<f32>().ok())
                .collect()
        };
        match kind {
            ColumnKind::Number | ColumnKind::Formula => text.parse().ok().map(Self::Number),
            ColumnKind::Text | ColumnKind::Select => Some(Self::Text(text.to_string())),
            ColumnKind::Checkbox => match text.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(Self::Bool(true)),
                "false" | "0" | "no" | "" => Some(Self::Bool(false)),
                _ => None,
            },
            ColumnKind::Vec2 => floats().and_then(|v| Some(Self::Vec2(v.try_into().ok()?))),
            ColumnKind::Vec3 => floats().and_then(|v| Some(Self::Vec3(v.try_into().ok()?))),
            ColumnKind::Vec4 | ColumnKind::Color => {
                floats().and_then(|v| Some(Self::Vec4(v.try_into().ok()?)))
            }
            ColumnKind::Relation | ColumnKind::Subtable => None,
        }
    }
}

/// A formula expression with its last evaluation result
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Formula {
    /// Expression text
    pub expression: String,
    /// Cached result of the last evaluation
    pub cached: Option<CellValue>,
    /// Error from the last evaluation
    pub error: Option<String>,
}

impl Formula {
    /// Create a formula that has not been evaluated yet
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            cached: None,
            error: None,
        }
    }
}

/// A cell: a value plus an optional formula
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cell {
    /// Stored value
    pub value: CellValue,
    /// Formula driving the value, if any
    pub formula: Option<Formula>,
}

impl Cell {
    /// Create a plain cell
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            formula: None,
        }
    }

    /// Get the formula expression, if any
    pub fn expression(&self) -> Option<&str> {
        self.formula.as_ref().map(|f| f.expression.as_str())
    }

    /// Text shown in an inline editor: the formula when present, else the value
    pub fn edit_text(&self) -> String {
        match &self.formula {
            Some(formula) => format!("={}", formula.expression),
            None => self.value.display_text(),
        }
    }
}
