//! Source map generation
//!
//! Modules are emitted untransformed, so every original line maps to column 0
//! of exactly one generated line. Wrapper and runtime lines stay unmapped.

use oxc_sourcemap::{SourceMap, SourceMapBuilder};

/// Accumulates generated code while tracking where each line came from
#[derive(Default)]
pub struct MappedWriter {
    code: String,
    line: u32,
    builder: SourceMapBuilder,
}

impl MappedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append generated text that has no original source
    pub fn push_generated(&mut self, text: &str) {
        for line in text.lines() {
            self.push_line(line);
        }
    }

    /// Append a module's source, mapping each line back to `source`
    pub fn push_source(&mut self, source: &str, content: &str) {
        let source_id = self.builder.add_source_and_content(source, content);

        for (original_line, line) in (0u32..).zip(content.lines()) {
            self.builder
                .add_token(self.line, 0, original_line, 0, Some(source_id), None);
            self.push_line(line);
        }
    }

    fn push_line(&mut self, line: &str) {
        self.code.push_str(line);
        self.code.push('\n');
        self.line += 1;
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Consume the writer, returning the code and its source map
    pub fn finish(mut self, file: &str) -> (String, SourceMap) {
        self.builder.set_file(file);
        (self.code, self.builder.into_sourcemap())
    }
}
