//! Call frame records produced by a stack capture

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token placed between an owner type and a function name when rendering a
/// method call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CallOperator {
    /// Instance-style call (`->`)
    Instance,
    /// Static/associated call (`::`)
    Static,
    /// Any other token a host runtime reports
    Other(String),
}

impl CallOperator {
    pub fn as_str(&self) -> &str {
        match self {
            CallOperator::Instance => "->",
            CallOperator::Static => "::",
            CallOperator::Other(token) => token,
        }
    }
}

impl fmt::Display for CallOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for CallOperator {
    fn from(token: String) -> Self {
        match token.as_str() {
            "->" => CallOperator::Instance,
            "::" => CallOperator::Static,
            _ => CallOperator::Other(token),
        }
    }
}

impl From<&str> for CallOperator {
    fn from(token: &str) -> Self {
        CallOperator::from(token.to_string())
    }
}

impl From<CallOperator> for String {
    fn from(op: CallOperator) -> Self {
        match op {
            CallOperator::Other(token) => token,
            other => other.as_str().to_string(),
        }
    }
}

/// Enclosing type of a method call together with the operator used to call it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameOwner {
    pub type_name: String,
    pub operator: CallOperator,
}

impl FrameOwner {
    pub fn new(type_name: impl Into<String>, operator: impl Into<CallOperator>) -> Self {
        Self {
            type_name: type_name.into(),
            operator: operator.into(),
        }
    }
}

/// One entry of a captured stack, innermost first.
///
/// Every field is optional: a frame the runtime could not resolve still
/// renders, using fallback text for the missing parts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallFrame {
    pub source_file: Option<String>,
    pub source_line: Option<u32>,
    pub function_name: Option<String>,
    pub owner: Option<FrameOwner>,
    /// Only populated for argument-preserving captures
    pub arguments: Option<Vec<Value>>,
}

impl CallFrame {
    /// Free-function frame with no location information
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            function_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.source_file = Some(file.into());
        self.source_line = Some(line);
        self
    }

    pub fn with_owner(mut self, owner: FrameOwner) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_arguments(mut self, arguments: Vec<Value>) -> Self {
        self.arguments = Some(arguments);
        self
    }
}

/// Frame record as reported by a [`FrameSource`](crate::snapshot::FrameSource).
///
/// Unlike [`CallFrame`], the owner type and call operator are independent
/// here since a runtime may resolve one without the other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub function: Option<String>,
    pub owner_type: Option<String>,
    pub operator: Option<CallOperator>,
    pub args: Option<Vec<Value>>,
}

impl RawFrame {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: Some(function.into()),
            ..Self::default()
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn method_of(
        mut self,
        owner_type: impl Into<String>,
        operator: impl Into<CallOperator>,
    ) -> Self {
        self.owner_type = Some(owner_type.into());
        self.operator = Some(operator.into());
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = Some(args);
        self
    }

    /// Convert into a [`CallFrame`].
    ///
    /// An owner type without an operator (or the reverse) is dropped
    /// entirely. Arguments are kept only when `keep_arguments` is set.
    pub fn into_call_frame(self, keep_arguments: bool) -> CallFrame {
        let owner = match (self.owner_type, self.operator) {
            (Some(type_name), Some(operator)) => Some(FrameOwner {
                type_name,
                operator,
            }),
            _ => None,
        };

        CallFrame {
            source_file: self.file,
            source_line: self.line,
            function_name: self.function,
            owner,
            arguments: if keep_arguments { self.args } else { None },
        }
    }
}
