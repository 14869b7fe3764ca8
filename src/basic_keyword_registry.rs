use std::collections::HashMap;
use crate::basic_types::TokenKind;

/// Registry that defines all BASIC keywords and their corresponding tokens.
/// Keywords are stored upper-case; callers upper-case identifiers before lookup.
pub struct KeywordRegistry {
    keywords: HashMap<&'static str, TokenKind>,
}

impl KeywordRegistry {
    pub fn new() -> Self {
        let mut registry = KeywordRegistry {
            keywords: HashMap::new(),
        };
        registry.register_keywords();
        registry
    }

    fn register_keywords(&mut self) {
        self.keywords.insert("PRINT", TokenKind::Print);
        self.keywords.insert("LET", TokenKind::Let);
        self.keywords.insert("IF", TokenKind::If);
        self.keywords.insert("THEN", TokenKind::Then);
        self.keywords.insert("ELSE", TokenKind::Else);
        self.keywords.insert("GOTO", TokenKind::Goto);
        self.keywords.insert("GOSUB", TokenKind::Gosub);
        self.keywords.insert("RETURN", TokenKind::Return);
        self.keywords.insert("FOR", TokenKind::For);
        self.keywords.insert("TO", TokenKind::To);
        self.keywords.insert("STEP", TokenKind::Step);
        self.keywords.insert("NEXT", TokenKind::Next);
        self.keywords.insert("INPUT", TokenKind::Input);
        self.keywords.insert("REM", TokenKind::Rem);
        self.keywords.insert("END", TokenKind::End);
        self.keywords.insert("DIM", TokenKind::Dim);
        self.keywords.insert("AND", TokenKind::And);
        self.keywords.insert("OR", TokenKind::Or);
        self.keywords.insert("NOT", TokenKind::Not);
        self.keywords.insert("MOD", TokenKind::Mod);
    }

    /// Get all keyword names
    pub fn get_keyword_names(&self) -> Vec<&'static str> {
        self.keywords.keys().copied().collect()
    }

    /// Check if an upper-cased word is a keyword
    pub fn is_keyword(&self, name: &str) -> bool {
        self.keywords.contains_key(name)
    }

    /// Token kind for an identifier: the keyword's kind, or `Ident`.
    pub fn lookup_ident(&self, word: &str) -> TokenKind {
        self.get_token_for_keyword(&word.to_ascii_uppercase())
            .unwrap_or(TokenKind::Ident)
    }

    pub fn get_token_for_keyword(&self, name: &str) -> Option<TokenKind> {
        self.keywords.get(name).copied()
    }
}

impl Default for KeywordRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Global singleton instance
lazy_static::lazy_static! {
    pub static ref KEYWORD_REGISTRY: KeywordRegistry = KeywordRegistry::new();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keyword_registry_basic_functionality() {
        let registry = &*KEYWORD_REGISTRY;

        assert!(registry.is_keyword("LET"));
        assert!(registry.is_keyword("MOD"));
        assert!(!registry.is_keyword("STOP"));

        assert_eq!(registry.get_token_for_keyword("PRINT"), Some(TokenKind::Print));
        assert_eq!(registry.get_token_for_keyword("INVALID"), None);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = &*KEYWORD_REGISTRY;

        assert_eq!(registry.lookup_ident("print"), TokenKind::Print);
        assert_eq!(registry.lookup_ident("Gosub"), TokenKind::Gosub);
        assert_eq!(registry.lookup_ident("mod"), TokenKind::Mod);
        assert_eq!(registry.lookup_ident("counter"), TokenKind::Ident);
    }

    #[test]
    fn test_all_keywords_present() {
        let mut keywords = KEYWORD_REGISTRY.get_keyword_names();
        keywords.sort_unstable();

        let mut expected = vec![
            "PRINT", "LET", "IF", "THEN", "ELSE", "GOTO", "GOSUB", "RETURN", "FOR", "TO",
            "STEP", "NEXT", "INPUT", "REM", "END", "DIM", "AND", "OR", "NOT", "MOD",
        ];
        expected.sort_unstable();

        assert_eq!(keywords, expected);
    }
}
