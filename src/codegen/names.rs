//! Name Rendering
//!
//! Converts schema identifiers (tags, field names, attribute names) into Rust
//! identifiers, and tracks the qualified path of nested tree types.
//!
//! Key principle: schema names are never altered semantically. Casing and
//! keyword escaping happen here and nowhere else, so every emitter agrees on
//! the identifier it refers to.

use std::fmt;

/// Rust keywords that cannot be used as plain identifiers
const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Keywords that cannot be raw identifiers either
const RESERVED_PATH_KEYWORDS: &[&str] = &["crate", "self", "Self", "super"];

/// Type names the generated files use or import, which a schema type must not shadow
const RESERVED_TYPE_NAMES: &[&str] = &[
    "Self", "String", "Vec", "Option", "Result", "Box", "Default", "From", "FixedText", "BTreeMap",
    "HashMap", "Element", "Column", "DecodeError", "Query", "Row", "StorageDescriptor",
];

// =============================================================================
// Casing
// =============================================================================

/// Split an identifier into words on separators and lower→upper transitions
fn words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in s.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
}

/// `member_list` / `member-list` / `memberList` → `MemberList`
pub fn pascal_case(s: &str) -> String {
    words(s)
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// `MemberList` / `member-list` → `member_list`
pub fn snake_case(s: &str) -> String {
    words(s)
        .iter()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Escape a Rust keyword as a raw identifier (`type` → `r#type`)
pub fn escape_keyword(ident: &str) -> String {
    if RESERVED_PATH_KEYWORDS.contains(&ident) {
        format!("{}_", ident)
    } else if KEYWORDS.contains(&ident) {
        format!("r#{}", ident)
    } else {
        ident.to_string()
    }
}

/// Identifier of a struct member or module for a schema name
pub fn member_ident(name: &str) -> String {
    let snake = snake_case(name);
    let snake = if snake.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", snake)
    } else {
        snake
    };
    escape_keyword(&snake)
}

/// Identifier of a struct for a schema name
pub fn type_ident(name: &str) -> String {
    let pascal = pascal_case(name);
    if pascal.starts_with(|c: char| c.is_ascii_digit()) {
        format!("T{}", pascal)
    } else if RESERVED_TYPE_NAMES.contains(&pascal.as_str()) {
        format!("{}_", pascal)
    } else {
        pascal
    }
}

// =============================================================================
// Qualified Path
// =============================================================================

/// Struct names from the root down to one tree node.
///
/// Threaded through tree walks instead of concatenating scope strings. Two
/// renderings matter:
/// - [`QualifiedPath`] `Display`: `Config::App`, used in diagnostics
/// - [`QualifiedPath::type_path`]: `config::App`, the Rust path of the
///   generated struct relative to the record module
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedPath {
    segments: Vec<String>,
}

impl QualifiedPath {
    pub fn root(struct_name: impl Into<String>) -> Self {
        Self {
            segments: vec![struct_name.into()],
        }
    }

    /// Path of a child struct
    pub fn child(&self, struct_name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(struct_name.into());
        Self { segments }
    }

    /// Struct name of the node itself
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Module that holds this node's children (`Config::App` → `app`)
    pub fn module_ident(&self) -> String {
        member_ident(self.name())
    }

    /// Rust path of the struct: ancestors become modules
    pub fn type_path(&self) -> String {
        let (name, ancestors) = match self.segments.split_last() {
            Some(split) => split,
            None => return String::new(),
        };
        ancestors
            .iter()
            .map(|ancestor| member_ident(ancestor))
            .chain(std::iter::once(name.clone()))
            .collect::<Vec<_>>()
            .join("::")
    }
}

impl fmt::Display for QualifiedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("::"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("member"), "Member");
        assert_eq!(pascal_case("member_list"), "MemberList");
        assert_eq!(pascal_case("member-list"), "MemberList");
        assert_eq!(pascal_case("memberList"), "MemberList");
        assert_eq!(pascal_case("Guild"), "Guild");
        assert_eq!(pascal_case("ip4"), "Ip4");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("MemberList"), "member_list");
        assert_eq!(snake_case("Guild"), "guild");
        assert_eq!(snake_case("max-level"), "max_level");
        assert_eq!(snake_case("level"), "level");
    }

    #[test]
    fn test_keyword_escaping() {
        assert_eq!(member_ident("type"), "r#type");
        assert_eq!(member_ident("match"), "r#match");
        assert_eq!(member_ident("self"), "self_");
        assert_eq!(member_ident("name"), "name");
        assert_eq!(member_ident("2nd"), "_2nd");
        assert_eq!(type_ident("3d"), "T3d");
    }

    #[test]
    fn test_type_ident_avoids_reserved_names() {
        assert_eq!(type_ident("self"), "Self_");
        assert_eq!(type_ident("string"), "String_");
        assert_eq!(type_ident("row"), "Row_");
        assert_eq!(type_ident("element"), "Element_");
        assert_eq!(type_ident("strings"), "Strings");
        assert_eq!(type_ident("guild"), "Guild");
    }

    #[test]
    fn test_qualified_path() {
        let root = QualifiedPath::root("Config");
        let app = root.child("App");
        let item = app.child("Item");

        assert_eq!(root.to_string(), "Config");
        assert_eq!(app.to_string(), "Config::App");
        assert_eq!(root.type_path(), "Config");
        assert_eq!(app.type_path(), "config::App");
        assert_eq!(item.type_path(), "config::app::Item");
        assert_eq!(app.module_ident(), "app");
    }
}
