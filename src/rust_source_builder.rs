/// Text-based builder for Rust source. Tracks indentation and hands out
/// fresh temporary names (`t1`, `t2`, ...).
pub struct RustSourceBuilder {
    buffer: String,
    indent: usize,
    temp_counter: u32,
}

const INDENT: &str = "    ";

impl RustSourceBuilder {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            indent: 0,
            temp_counter: 0,
        }
    }

    pub fn build(&self) -> String {
        self.buffer.clone()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn line(&mut self, content: &str) {
        if content.is_empty() {
            self.buffer.push('\n');
            return;
        }
        for _ in 0..self.indent {
            self.buffer.push_str(INDENT);
        }
        self.buffer.push_str(content);
        self.buffer.push('\n');
    }

    pub fn blank(&mut self) {
        self.buffer.push('\n');
    }

    pub fn comment(&mut self, comment: &str) {
        let single_line: String = comment
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        self.line(&format!("// {}", single_line.trim_end()));
    }

    /// Appends text as-is, without indentation.
    pub fn raw(&mut self, text: &str) {
        self.buffer.push_str(text);
        if !text.ends_with('\n') {
            self.buffer.push('\n');
        }
    }

    /// Writes `header {` and indents what follows.
    pub fn open_block(&mut self, header: &str) {
        self.line(&format!("{} {{", header));
        self.indent += 1;
    }

    /// Closes a block opened with `open_block`, appending `suffix` after the brace.
    pub fn close_block(&mut self, suffix: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(&format!("}}{}", suffix));
    }

    /// Closes the current block and opens another at the same depth,
    /// e.g. `} else {`.
    pub fn continue_block(&mut self, header: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(&format!("}} {} {{", header));
        self.indent += 1;
    }

    pub fn next_temp(&mut self) -> String {
        self.temp_counter += 1;
        format!("t{}", self.temp_counter)
    }

    pub fn reset_temps(&mut self) {
        self.temp_counter = 0;
    }

    /// A Rust string literal denoting `s`.
    pub fn string_literal(s: &str) -> String {
        format!("{:?}", s)
    }

    /// A Rust `f64` expression denoting `value`.
    pub fn float_literal(value: f64) -> String {
        if value.is_nan() {
            "f64::NAN".to_string()
        } else if value.is_infinite() {
            if value > 0.0 { "f64::INFINITY" } else { "f64::NEG_INFINITY" }.to_string()
        } else {
            format!("{:?}_f64", value)
        }
    }
}

impl Default for RustSourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_blocks_indent() {
        let mut builder = RustSourceBuilder::new();
        builder.open_block("fn main()");
        builder.open_block("if x");
        builder.line("a();");
        builder.continue_block("else");
        builder.line("b();");
        builder.close_block("");
        builder.close_block("");

        assert_eq!(
            builder.build(),
            "fn main() {\n    if x {\n        a();\n    } else {\n        b();\n    }\n}\n"
        );
    }

    #[test]
    fn test_temp_counter() {
        let mut builder = RustSourceBuilder::new();
        assert_eq!(builder.next_temp(), "t1");
        assert_eq!(builder.next_temp(), "t2");
        builder.reset_temps();
        assert_eq!(builder.next_temp(), "t1");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(RustSourceBuilder::string_literal("plain"), "\"plain\"");
        assert_eq!(
            RustSourceBuilder::string_literal("say \"hi\"\t\\"),
            "\"say \\\"hi\\\"\\t\\\\\""
        );
    }

    #[test]
    fn test_float_literals() {
        assert_eq!(RustSourceBuilder::float_literal(1.0), "1.0_f64");
        assert_eq!(RustSourceBuilder::float_literal(0.1), "0.1_f64");
        assert_eq!(RustSourceBuilder::float_literal(1e300), "1e300_f64");
        assert_eq!(RustSourceBuilder::float_literal(f64::INFINITY), "f64::INFINITY");
    }

    #[test]
    fn test_comment_stays_on_one_line() {
        let mut builder = RustSourceBuilder::new();
        builder.comment("REM a\nb");
        assert_eq!(builder.build(), "// REM a b\n");
    }
}
