//! Source locations attached to units, CFGs and nodes

use std::fmt;
use std::sync::Arc;
use syn::spanned::Spanned;

/// A position in a source file (1-based line and column)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodeLocation {
    pub file: Arc<str>,
    pub line: usize,
    pub column: usize,
}

impl CodeLocation {
    pub fn new(file: impl Into<Arc<str>>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Start of the span covering `node`
    pub fn of<T: Spanned + ?Sized>(file: &Arc<str>, node: &T) -> Self {
        let start = node.span().start();
        Self {
            file: Arc::clone(file),
            line: start.line,
            column: start.column + 1,
        }
    }
}

impl fmt::Display for CodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = CodeLocation::new("rect.rs", 3, 5);
        assert_eq!(loc.to_string(), "rect.rs:3:5");
    }

    #[test]
    fn test_location_of_span() {
        let file: Arc<str> = Arc::from("lib.rs");
        let item: syn::ItemFn = syn::parse_str("fn f() {}").unwrap();
        let loc = CodeLocation::of(&file, &item.sig.ident);
        assert_eq!(loc.line, 1);
        assert_eq!(loc.column, 4);
    }
}
