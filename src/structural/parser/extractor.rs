use std::collections::{HashMap, HashSet};

use tree_sitter::{Node, Parser};

use crate::types::{Language, SymbolKind};

use super::languages::{get_language_support, LanguageSupport};

const IDENTIFIER_KINDS: &[&str] = &[
    "identifier",
    "type_identifier",
    "property_identifier",
    "private_property_identifier",
    "shorthand_property_identifier",
    "shorthand_property_identifier_pattern",
];

const SCOPE_KINDS: &[&str] = &[
    "program",
    "statement_block",
    "class_body",
    "for_statement",
    "for_in_statement",
    "catch_clause",
];

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
];

/// Half-open byte range `[start, end)` within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    fn of(node: Node) -> Self {
        Self {
            start: node.start_byte(),
            end: node.end_byte(),
        }
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub kind: SymbolKind,
    pub name_range: ByteRange,
    /// Start of the declaring node (e.g. the `class` keyword), used for outline spans.
    pub start: usize,
    pub parent: Option<usize>,
    /// Lexical region in which the name is visible.
    pub scope: ByteRange,
    /// For imports: the exported name being imported (`default`, `*` or an identifier).
    pub imported_name: Option<String>,
    pub in_outline: bool,
}

#[derive(Debug, Clone)]
pub struct Occurrence {
    pub name: String,
    pub range: ByteRange,
    pub is_write: bool,
    /// Set when this occurrence is the name of a declaration.
    pub declaration: Option<usize>,
    /// `obj.name` property positions; resolved against members, not lexical scope.
    pub member_access: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalResolution {
    Declared(usize),
    Member(String),
    Unresolved(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineTree {
    pub index: usize,
    pub children: Vec<OutlineTree>,
}

/// Everything the analysis layer needs from one parsed file.
#[derive(Debug, Clone, Default)]
pub struct FileSymbols {
    pub declarations: Vec<Declaration>,
    /// Sorted by start offset.
    pub occurrences: Vec<Occurrence>,
    root: ByteRange,
}

impl FileSymbols {
    pub fn occurrence_at(&self, offset: usize) -> Option<&Occurrence> {
        let idx = self
            .occurrences
            .partition_point(|o| o.range.start <= offset);
        let candidate = self.occurrences.get(idx.checked_sub(1)?)?;
        if candidate.range.contains(offset) || candidate.range.end == offset {
            Some(candidate)
        } else {
            None
        }
    }

    pub fn resolve_local(&self, occurrence: &Occurrence) -> LocalResolution {
        if let Some(idx) = occurrence.declaration {
            return LocalResolution::Declared(idx);
        }
        if occurrence.member_access {
            return LocalResolution::Member(occurrence.name.clone());
        }

        self.declarations
            .iter()
            .enumerate()
            .filter(|(_, d)| {
                d.name == occurrence.name
                    && !d.kind.is_member()
                    && d.scope.contains(occurrence.range.start)
            })
            .min_by_key(|(_, d)| d.scope.len())
            .map(|(i, _)| LocalResolution::Declared(i))
            .unwrap_or_else(|| LocalResolution::Unresolved(occurrence.name.clone()))
    }

    /// Declarations visible from other files: module-level, not imports.
    pub fn is_top_level(&self, idx: usize) -> bool {
        self.declarations.get(idx).is_some_and(|d| {
            d.parent.is_none()
                && d.scope == self.root
                && !matches!(d.kind, SymbolKind::Import | SymbolKind::Parameter)
        })
    }

    pub fn top_level_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = usize> + 'a {
        (0..self.declarations.len())
            .filter(move |&i| self.declarations[i].name == name && self.is_top_level(i))
    }

    pub fn members_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.declarations
            .iter()
            .enumerate()
            .filter(move |(_, d)| d.name == name && d.kind.is_member())
            .map(|(i, _)| i)
    }

    pub fn container_name(&self, idx: usize) -> String {
        self.declarations
            .get(idx)
            .and_then(|d| d.parent)
            .and_then(|p| self.declarations.get(p))
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    /// Outline declarations as a tree, siblings in source order.
    pub fn outline(&self) -> Vec<OutlineTree> {
        let mut roots = Vec::new();
        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();

        for (idx, decl) in self.declarations.iter().enumerate() {
            if !decl.in_outline {
                continue;
            }
            match self.outline_anchor(decl.parent) {
                Some(parent) => children.entry(parent).or_default().push(idx),
                None => roots.push(idx),
            }
        }

        fn build(idx: usize, children: &HashMap<usize, Vec<usize>>) -> OutlineTree {
            OutlineTree {
                index: idx,
                children: children
                    .get(&idx)
                    .map(|c| c.iter().map(|&i| build(i, children)).collect())
                    .unwrap_or_default(),
            }
        }

        roots.into_iter().map(|i| build(i, &children)).collect()
    }

    fn outline_anchor(&self, mut parent: Option<usize>) -> Option<usize> {
        while let Some(p) = parent {
            let decl = &self.declarations[p];
            if decl.in_outline {
                return Some(p);
            }
            parent = decl.parent;
        }
        None
    }
}

pub struct Extractor {
    parser: Parser,
    language: Language,
    support: Box<dyn LanguageSupport>,
}

impl Extractor {
    pub fn new(language: Language) -> Option<Self> {
        let support = get_language_support(language)?;
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&support.get_language()) {
            tracing::error!("Error loading grammar for {:?}: {}", language, e);
            return None;
        }

        Some(Self {
            parser,
            language,
            support,
        })
    }

    pub fn parse(&mut self, content: &str) -> FileSymbols {
        let tree = match self.parser.parse(content, None) {
            Some(t) => t,
            None => {
                tracing::warn!(language = ?self.language, "Parser produced no tree");
                return FileSymbols::default();
            }
        };

        let root = tree.root_node();
        let root_range = ByteRange::of(root);
        let mut walker = Walker {
            support: self.support.as_ref(),
            source: content.as_bytes(),
            symbols: FileSymbols {
                root: root_range,
                ..FileSymbols::default()
            },
            declared_names: HashSet::new(),
        };

        walker.visit(
            root,
            WalkCtx {
                parent: None,
                scope: root_range,
                function_scope: root_range,
                module_level: true,
            },
        );

        let mut symbols = walker.symbols;
        symbols.occurrences.sort_by_key(|o| o.range.start);
        symbols
    }
}

#[derive(Debug, Clone, Copy)]
struct WalkCtx {
    parent: Option<usize>,
    scope: ByteRange,
    function_scope: ByteRange,
    module_level: bool,
}

struct Walker<'a> {
    support: &'a dyn LanguageSupport,
    source: &'a [u8],
    symbols: FileSymbols,
    declared_names: HashSet<usize>,
}

impl Walker<'_> {
    fn visit(&mut self, node: Node, ctx: WalkCtx) {
        let kind = node.kind();

        let declared = match kind {
            "variable_declarator" => self.declare_variable(node, ctx),
            "import_specifier" => {
                self.declare_import_specifier(node, ctx);
                None
            }
            "import_clause" => {
                self.declare_default_import(node, ctx);
                None
            }
            "namespace_import" => {
                if let Some(name) = first_named_child_of_kind(node, "identifier") {
                    self.declare(node, name, SymbolKind::Import, ctx, false, Some("*".into()));
                }
                None
            }
            "property_identifier"
                if node.parent().is_some_and(|p| p.kind() == "enum_body") =>
            {
                let in_outline = self.parent_is_container(ctx);
                self.declare(node, node, SymbolKind::EnumMember, ctx, in_outline, None)
            }
            _ => self
                .support
                .declaration_kind(kind)
                .and_then(|symbol_kind| self.declare_named(node, symbol_kind, ctx)),
        };

        let range = ByteRange::of(node);
        let mut child_ctx = ctx;
        if SCOPE_KINDS.contains(&kind) {
            child_ctx.scope = range;
        }
        if FUNCTION_KINDS.contains(&kind) {
            child_ctx.scope = range;
            child_ctx.function_scope = range;
            child_ctx.module_level = false;
        }
        if let Some(idx) = declared {
            let decl_kind = self.symbols.declarations[idx].kind;
            if decl_kind != SymbolKind::Module {
                child_ctx.module_level = false;
            }
            if owns_children(decl_kind, node) {
                child_ctx.parent = Some(idx);
            }
        }

        match kind {
            "formal_parameters" => {
                let mut cursor = node.walk();
                let params: Vec<Node> = node.named_children(&mut cursor).collect();
                for param in params {
                    let binding = match param.kind() {
                        "required_parameter" | "optional_parameter" => {
                            param.child_by_field_name("pattern")
                        }
                        _ => Some(param),
                    };
                    if let Some(binding) = binding {
                        self.declare_binding(binding, SymbolKind::Parameter, child_ctx);
                    }
                }
            }
            "arrow_function" | "catch_clause" => {
                if let Some(param) = node.child_by_field_name("parameter") {
                    self.declare_binding(param, SymbolKind::Parameter, child_ctx);
                }
            }
            "for_in_statement" if node.child_by_field_name("kind").is_some() => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.declare_binding(left, SymbolKind::Variable, child_ctx);
                }
            }
            _ => {}
        }

        if IDENTIFIER_KINDS.contains(&kind) && !self.declared_names.contains(&node.id()) {
            if let Ok(name) = node.utf8_text(self.source) {
                self.symbols.occurrences.push(Occurrence {
                    name: name.to_string(),
                    range,
                    is_write: is_write_target(node),
                    declaration: None,
                    member_access: matches!(
                        kind,
                        "property_identifier" | "private_property_identifier"
                    ),
                });
            }
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child, child_ctx);
        }
    }

    fn declare_named(&mut self, node: Node, kind: SymbolKind, ctx: WalkCtx) -> Option<usize> {
        let name_node = node
            .child_by_field_name("name")
            .or_else(|| node.child_by_field_name("property"))?;

        let in_outline = match kind {
            SymbolKind::Function
            | SymbolKind::Class
            | SymbolKind::Interface
            | SymbolKind::Enum
            | SymbolKind::TypeAlias
            | SymbolKind::Module => true,
            SymbolKind::Method | SymbolKind::Property | SymbolKind::EnumMember => {
                self.parent_is_container(ctx)
            }
            _ => false,
        };

        self.declare(node, name_node, kind, ctx, in_outline, None)
    }

    fn declare_variable(&mut self, node: Node, ctx: WalkCtx) -> Option<usize> {
        let name_node = node.child_by_field_name("name")?;
        let declaration = node.parent();
        let is_var = declaration.is_some_and(|d| d.kind() == "variable_declaration");
        let scoped = WalkCtx {
            scope: if is_var { ctx.function_scope } else { ctx.scope },
            ..ctx
        };

        if name_node.kind() != "identifier" {
            self.declare_binding(name_node, SymbolKind::Variable, scoped);
            return None;
        }

        let is_const = declaration
            .and_then(|d| d.utf8_text(self.source).ok())
            .is_some_and(|text| text.trim_start().starts_with("const"));
        let kind = if is_const {
            SymbolKind::Constant
        } else {
            SymbolKind::Variable
        };

        self.declare(node, name_node, kind, scoped, ctx.module_level, None)
    }

    fn declare_import_specifier(&mut self, node: Node, ctx: WalkCtx) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let local = node.child_by_field_name("alias").unwrap_or(name);
        // With an alias the exported name stays a plain occurrence, so it
        // resolves to the exporting declaration rather than the local binding.
        let imported = name.utf8_text(self.source).ok().map(str::to_string);
        self.declare(node, local, SymbolKind::Import, ctx, false, imported);
    }

    fn declare_default_import(&mut self, node: Node, ctx: WalkCtx) {
        let mut cursor = node.walk();
        let defaults: Vec<Node> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "identifier")
            .collect();
        for ident in defaults {
            self.declare(node, ident, SymbolKind::Import, ctx, false, Some("default".into()));
        }
    }

    /// Declares every identifier bound by a (possibly destructuring) pattern.
    fn declare_binding(&mut self, node: Node, kind: SymbolKind, ctx: WalkCtx) {
        match node.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => {
                self.declare(node, node, kind, ctx, false, None);
            }
            "pair_pattern" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.declare_binding(value, kind, ctx);
                }
            }
            "assignment_pattern" | "object_assignment_pattern" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.declare_binding(left, kind, ctx);
                }
            }
            "object_pattern" | "array_pattern" | "rest_pattern" => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.declare_binding(child, kind, ctx);
                }
            }
            _ => {}
        }
    }

    fn declare(
        &mut self,
        node: Node,
        name_node: Node,
        kind: SymbolKind,
        ctx: WalkCtx,
        in_outline: bool,
        imported_name: Option<String>,
    ) -> Option<usize> {
        if self.declared_names.contains(&name_node.id()) {
            return None;
        }
        let name = name_node.utf8_text(self.source).ok()?.to_string();
        let idx = self.symbols.declarations.len();
        let name_range = ByteRange::of(name_node);

        self.symbols.declarations.push(Declaration {
            name: name.clone(),
            kind,
            name_range,
            start: statement_start(node),
            parent: ctx.parent,
            scope: ctx.scope,
            imported_name,
            in_outline,
        });
        self.symbols.occurrences.push(Occurrence {
            name,
            range: name_range,
            is_write: true,
            declaration: Some(idx),
            member_access: false,
        });
        self.declared_names.insert(name_node.id());

        Some(idx)
    }

    fn parent_is_container(&self, ctx: WalkCtx) -> bool {
        ctx.parent
            .and_then(|p| self.symbols.declarations.get(p))
            .is_some_and(|d| d.kind.is_container())
    }
}

fn owns_children(kind: SymbolKind, node: Node) -> bool {
    match kind {
        SymbolKind::Function
        | SymbolKind::Method
        | SymbolKind::Class
        | SymbolKind::Interface
        | SymbolKind::Enum
        | SymbolKind::Module => true,
        SymbolKind::Variable | SymbolKind::Constant => node
            .child_by_field_name("value")
            .is_some_and(|v| FUNCTION_KINDS.contains(&v.kind()) || v.kind() == "class"),
        _ => false,
    }
}

/// Start of the statement a declaration belongs to: an enclosing `export`
/// and any leading decorators are included.
fn statement_start(node: Node) -> usize {
    let anchor = node
        .parent()
        .filter(|p| p.kind() == "export_statement")
        .unwrap_or(node);

    let mut start = anchor.start_byte();
    let mut prev = anchor.prev_named_sibling();
    while let Some(sibling) = prev.filter(|p| p.kind() == "decorator") {
        start = sibling.start_byte();
        prev = sibling.prev_named_sibling();
    }
    start
}

fn first_named_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == kind);
    found
}

fn is_write_target(node: Node) -> bool {
    let mut target = node;
    if let Some(parent) = node.parent() {
        if parent.kind() == "member_expression"
            && parent.child_by_field_name("property") == Some(node)
        {
            target = parent;
        }
    }

    let Some(parent) = target.parent() else {
        return false;
    };
    match parent.kind() {
        "assignment_expression" | "augmented_assignment_expression" => {
            parent.child_by_field_name("left") == Some(target)
        }
        "update_expression" => parent.child_by_field_name("argument") == Some(target),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ts(content: &str) -> FileSymbols {
        Extractor::new(Language::TypeScript)
            .expect("typescript grammar")
            .parse(content)
    }

    fn names(symbols: &FileSymbols, tree: &[OutlineTree]) -> Vec<String> {
        tree.iter()
            .map(|t| symbols.declarations[t.index].name.clone())
            .collect()
    }

    #[test]
    fn test_outline_nesting_and_order() {
        let src = "class Greeter {\n  greet() { return 1; }\n}\nfunction helper() {}\n";
        let symbols = parse_ts(src);
        let outline = symbols.outline();

        assert_eq!(names(&symbols, &outline), vec!["Greeter", "helper"]);
        assert_eq!(names(&symbols, &outline[0].children), vec!["greet"]);
        assert!(outline[1].children.is_empty());
    }

    #[test]
    fn test_declaration_start_includes_export_and_decorators() {
        let src = "export class Circle {}\nexport function f() {}\nclass Panel {\n  @Input() @Bind() label() {}\n}\n";
        let symbols = parse_ts(src);
        let start_of = |name: &str| {
            symbols
                .declarations
                .iter()
                .find(|d| d.name == name)
                .map(|d| d.start)
                .unwrap()
        };

        assert_eq!(start_of("Circle"), 0);
        assert_eq!(start_of("f"), src.find("export function").unwrap());
        assert_eq!(start_of("label"), src.find("@Input").unwrap());
    }

    #[test]
    fn test_locals_are_not_in_outline() {
        let src = "function run(a: number) {\n  const inner = a + 1;\n  return inner;\n}\nconst top = 1;\n";
        let symbols = parse_ts(src);
        let outline = symbols.outline();

        assert_eq!(names(&symbols, &outline), vec!["run", "top"]);
        assert!(outline[0].children.is_empty());
    }

    #[test]
    fn test_local_shadowing_resolves_innermost() {
        let src = "const x = 1;\nfunction f(x: number) {\n  return x;\n}\n";
        let symbols = parse_ts(src);

        let use_offset = src.rfind("x;").unwrap();
        let occ = symbols.occurrence_at(use_offset).unwrap();
        let LocalResolution::Declared(idx) = symbols.resolve_local(occ) else {
            panic!("expected local resolution");
        };
        assert_eq!(symbols.declarations[idx].kind, SymbolKind::Parameter);
    }

    #[test]
    fn test_write_flags() {
        let src = "let count = 0;\ncount = count + 1;\ncount++;\n";
        let symbols = parse_ts(src);
        let flags: Vec<bool> = symbols
            .occurrences
            .iter()
            .filter(|o| o.name == "count")
            .map(|o| o.is_write)
            .collect();
        assert_eq!(flags, vec![true, true, false, true]);
    }

    #[test]
    fn test_import_alias_records_imported_name() {
        let src = "import { helper as h } from './util';\nh();\n";
        let symbols = parse_ts(src);
        let import = symbols
            .declarations
            .iter()
            .find(|d| d.kind == SymbolKind::Import)
            .unwrap();
        assert_eq!(import.name, "h");
        assert_eq!(import.imported_name.as_deref(), Some("helper"));
    }

    #[test]
    fn test_member_access_is_flagged() {
        let src = "const o = { a: 1 };\no.a;\n";
        let symbols = parse_ts(src);
        let access = symbols.occurrence_at(src.rfind("a;").unwrap()).unwrap();
        assert!(access.member_access);
        assert_eq!(
            symbols.resolve_local(access),
            LocalResolution::Member("a".into())
        );
    }

    #[test]
    fn test_occurrence_at_end_of_identifier() {
        let src = "const value = 1;";
        let symbols = parse_ts(src);
        let end = src.find("value").unwrap() + "value".len();
        assert_eq!(symbols.occurrence_at(end).unwrap().name, "value");
        assert!(symbols.occurrence_at(src.len()).is_none());
    }
}
