use crate::types::{Language, SymbolKind};

pub trait LanguageSupport: Send + Sync {
    fn get_language(&self) -> tree_sitter::Language;

    /// Maps a grammar node kind to the symbol it declares. Variable
    /// declarators, parameters and imports are handled by the extractor
    /// because their kind depends on surrounding nodes.
    fn declaration_kind(&self, node_kind: &str) -> Option<SymbolKind>;
}

fn ecmascript_declaration_kind(node_kind: &str) -> Option<SymbolKind> {
    match node_kind {
        "function_declaration" | "generator_function_declaration" => Some(SymbolKind::Function),
        "class_declaration" => Some(SymbolKind::Class),
        "method_definition" => Some(SymbolKind::Method),
        _ => None,
    }
}

pub struct TypeScriptSupport;
impl LanguageSupport for TypeScriptSupport {
    fn get_language(&self) -> tree_sitter::Language {
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
    }

    fn declaration_kind(&self, node_kind: &str) -> Option<SymbolKind> {
        typescript_declaration_kind(node_kind)
    }
}

pub struct TsxSupport;
impl LanguageSupport for TsxSupport {
    fn get_language(&self) -> tree_sitter::Language {
        tree_sitter_typescript::LANGUAGE_TSX.into()
    }

    fn declaration_kind(&self, node_kind: &str) -> Option<SymbolKind> {
        typescript_declaration_kind(node_kind)
    }
}

fn typescript_declaration_kind(node_kind: &str) -> Option<SymbolKind> {
    match node_kind {
        "function_signature" => Some(SymbolKind::Function),
        "abstract_class_declaration" => Some(SymbolKind::Class),
        "interface_declaration" => Some(SymbolKind::Interface),
        "enum_declaration" => Some(SymbolKind::Enum),
        "enum_assignment" => Some(SymbolKind::EnumMember),
        "type_alias_declaration" => Some(SymbolKind::TypeAlias),
        "internal_module" | "module" => Some(SymbolKind::Module),
        "method_signature" | "abstract_method_signature" => Some(SymbolKind::Method),
        "public_field_definition" | "property_signature" => Some(SymbolKind::Property),
        other => ecmascript_declaration_kind(other),
    }
}

pub struct JavaScriptSupport;
impl LanguageSupport for JavaScriptSupport {
    fn get_language(&self) -> tree_sitter::Language {
        tree_sitter_javascript::LANGUAGE.into()
    }

    fn declaration_kind(&self, node_kind: &str) -> Option<SymbolKind> {
        match node_kind {
            "field_definition" => Some(SymbolKind::Property),
            other => ecmascript_declaration_kind(other),
        }
    }
}

pub fn get_language_support(lang: Language) -> Option<Box<dyn LanguageSupport>> {
    match lang {
        Language::TypeScript => Some(Box::new(TypeScriptSupport)),
        Language::Tsx => Some(Box::new(TsxSupport)),
        Language::JavaScript => Some(Box::new(JavaScriptSupport)),
        Language::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typescript_kinds() {
        let ts = TypeScriptSupport;
        assert_eq!(
            ts.declaration_kind("interface_declaration"),
            Some(SymbolKind::Interface)
        );
        assert_eq!(
            ts.declaration_kind("function_declaration"),
            Some(SymbolKind::Function)
        );
        assert_eq!(ts.declaration_kind("identifier"), None);
    }

    #[test]
    fn test_javascript_has_no_interfaces() {
        let js = JavaScriptSupport;
        assert_eq!(js.declaration_kind("interface_declaration"), None);
        assert_eq!(
            js.declaration_kind("field_definition"),
            Some(SymbolKind::Property)
        );
    }

    #[test]
    fn test_unknown_language_has_no_support() {
        assert!(get_language_support(Language::Unknown).is_none());
    }
}
