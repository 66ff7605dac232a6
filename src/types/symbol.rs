use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    Enum,
    EnumMember,
    TypeAlias,
    Module,
    Property,
    Variable,
    Constant,
    Parameter,
    Import,
}

impl SymbolKind {
    /// Kinds that own a member scope (their children are addressed via `a.b`).
    pub fn is_container(self) -> bool {
        matches!(
            self,
            SymbolKind::Class | SymbolKind::Interface | SymbolKind::Enum | SymbolKind::Module
        )
    }

    pub fn is_member(self) -> bool {
        matches!(
            self,
            SymbolKind::Method | SymbolKind::Property | SymbolKind::EnumMember
        )
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolKind::Function => write!(f, "function"),
            SymbolKind::Method => write!(f, "method"),
            SymbolKind::Class => write!(f, "class"),
            SymbolKind::Interface => write!(f, "interface"),
            SymbolKind::Enum => write!(f, "enum"),
            SymbolKind::EnumMember => write!(f, "enum_member"),
            SymbolKind::TypeAlias => write!(f, "type_alias"),
            SymbolKind::Module => write!(f, "module"),
            SymbolKind::Property => write!(f, "property"),
            SymbolKind::Variable => write!(f, "variable"),
            SymbolKind::Constant => write!(f, "constant"),
            SymbolKind::Parameter => write!(f, "parameter"),
            SymbolKind::Import => write!(f, "import"),
        }
    }
}

/// A definition site rendered with 1-indexed coordinates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionLocation {
    pub file_name: String,
    pub line: u32,
    pub character: u32,
    pub kind: SymbolKind,
    pub name: String,
    pub container_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceLocation {
    pub file_name: String,
    pub line: u32,
    pub character: u32,
    pub is_write_access: bool,
    pub is_definition: bool,
}

/// One node of a file outline. Children keep the order the engine produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutlineNode {
    pub text: String,
    pub kind: SymbolKind,
    pub line: u32,
    pub character: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineNode>,
}
