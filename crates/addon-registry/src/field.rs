//! Field declarations.
//!
//! Fields deserialize from tables such as
//!
//! ```toml
//! name = "partner_id"
//! type = "many2one"
//! comodel = "res.partner"
//! label = "Customer"
//! required = true
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Semantic type of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Text,
    Integer,
    Float {
        /// `(digits, decimals)`.
        #[serde(default)]
        digits: Option<(u32, u32)>,
    },
    Boolean,
    Date,
    Datetime,
    Monetary {
        #[serde(default)]
        currency_field: Option<String>,
    },
    Binary,
    /// Fixed `(value, label)` pairs.
    Selection { options: Vec<(String, String)> },
    Many2one { comodel: String },
    One2many { comodel: String, inverse: String },
    Many2many { comodel: String },
    /// Derived by a named producer from the listed fields.
    Computed {
        producer: String,
        #[serde(default)]
        depends: Vec<String>,
    },
    /// Alias reached by following a chain of field names.
    Related { path: Vec<String> },
}

impl FieldKind {
    /// Target model of a relational field.
    pub fn comodel(&self) -> Option<&str> {
        match self {
            Self::Many2one { comodel } | Self::One2many { comodel, .. } | Self::Many2many { comodel } => {
                Some(comodel)
            }
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float { .. } => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Monetary { .. } => "monetary",
            Self::Binary => "binary",
            Self::Selection { .. } => "selection",
            Self::Many2one { .. } => "many2one",
            Self::One2many { .. } => "one2many",
            Self::Many2many { .. } => "many2many",
            Self::Computed { .. } => "computed",
            Self::Related { .. } => "related",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDefault {
    Literal(Value),
    /// Name of a producer evaluated by the host.
    Producer(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Storage {
    #[default]
    Stored,
    /// Recomputed on every read.
    Recomputed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub default: Option<FieldDefault>,
    #[serde(default)]
    pub storage: Storage,
    /// Access groups allowed to see the field; empty means everyone.
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub help: Option<String>,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            label: None,
            default: None,
            storage: Storage::Stored,
            groups: Vec::new(),
            required: false,
            help: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(FieldDefault::Literal(value));
        self
    }

    pub fn default_producer(mut self, producer: impl Into<String>) -> Self {
        self.default = Some(FieldDefault::Producer(producer.into()));
        self
    }

    pub fn recomputed(mut self) -> Self {
        self.storage = Storage::Recomputed;
        self
    }

    pub fn groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Display label, falling back to the field name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}
