/// Configuration constants for the BASIC dialect.
///
/// These are the knobs that differ between BASIC variants. The parser bakes
/// them into the AST, so the interpreter and the compiled program both see
/// the same values. Runtime value semantics live in `basic_runtime`.

// =============================================================================
// PROGRAM CONFIGURATION
// =============================================================================

/// Key under which a statement typed without a line number is stored.
/// There is only one such slot: a later immediate statement replaces it.
pub const IMMEDIATE_LINE: usize = 0;

// =============================================================================
// PRINT CONFIGURATION
// =============================================================================

/// Text written between two PRINT items separated by `;`
pub const PRINT_SEMICOLON_TEXT: &str = "";

/// Text written between two PRINT items separated by `,`
pub const PRINT_COMMA_TEXT: &str = "\t";

// =============================================================================
// LOOP CONFIGURATION
// =============================================================================

/// STEP used by a FOR statement that does not name one
pub const DEFAULT_FOR_STEP: f64 = 1.0;
