//! Shader Builder
//!
//! Expands a shader blueprint's macro language into final shader source.
//!
//! # Stages
//!
//! | Stage | Directives | Output |
//! |-------|------------|--------|
//! | math       | `@pset @padd @psub @pmul @pdiv @pmod @pmin @pmax` | invisible, mutates properties |
//! | foreach    | `@foreach(count[, var[, start]]) ... @end`        | body repeated, `@var` replaced |
//! | properties | `@property(expr) ... [@else ...] @end`           | selected branch |
//! | pieces     | `@piece(name) ... @end`                          | collected, removed |
//! | insert     | `@insertpiece(name)`                             | piece text |
//! | counter    | `@counter @value` / `@set @add ... @max`          | value text / invisible |
//!
//! Each stage rescans the full output of the previous one. Math, foreach and
//! properties run first; pieces are then collected and inserted, and the
//! first three stages run again over the inserted text until no piece
//! directive remains. Counters run last, followed by the native
//! [`ShaderPreprocessor`].
//!
//! # Errors
//!
//! Syntax errors are logged and collected, never fatal. A structural error
//! (missing `)`, missing `@end`) stops the stage that hit it: the rest of the
//! text is passed through unexpanded.
//!
//! A builder is single threaded scratch state. Run one builder per worker.

mod expression;
mod scan;

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::errors::{CompileError, ShaderSyntaxError, SyntaxErrorKind};
use crate::renderer::preprocessor::{PassThroughPreprocessor, ShaderPreprocessor};
use crate::resources::{ShaderBlueprint, ShaderProperties, ShaderResourceProvider};
use crate::settings::ShaderBuilderSettings;
use crate::utils::hash::{FNV1A_INITIAL_HASH_64, fnv1a_64_seeded};
use crate::utils::{AssetId, ShaderPropertyId, StringId};

use scan::{
    contains_directive, find_block_end, find_directive, line_number, paren_span, parse_literal,
    split_arguments,
};

/// Piece name → piece text, scoped to one build.
pub type DynamicShaderPieces = FxHashMap<StringId, String>;

const MATH_KEYWORDS: [&str; 8] = [
    "pset", "padd", "psub", "pmul", "pdiv", "pmod", "pmin", "pmax",
];
const COUNTER_KEYWORDS: [&str; 10] = [
    "counter", "value", "set", "add", "sub", "mul", "div", "mod", "min", "max",
];
const PIECE_KEYWORDS: [&str; 2] = ["piece", "insertpiece"];
const STRAY_KEYWORDS: [&str; 2] = ["end", "else"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithmeticOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
}

impl ArithmeticOp {
    /// Same order as the keyword tables.
    const ALL: [ArithmeticOp; 8] = [
        ArithmeticOp::Set,
        ArithmeticOp::Add,
        ArithmeticOp::Sub,
        ArithmeticOp::Mul,
        ArithmeticOp::Div,
        ArithmeticOp::Mod,
        ArithmeticOp::Min,
        ArithmeticOp::Max,
    ];

    /// `None` on division or modulo by zero.
    fn apply(self, lhs: i32, rhs: i32) -> Option<i32> {
        match self {
            ArithmeticOp::Set => Some(rhs),
            ArithmeticOp::Add => Some(lhs.wrapping_add(rhs)),
            ArithmeticOp::Sub => Some(lhs.wrapping_sub(rhs)),
            ArithmeticOp::Mul => Some(lhs.wrapping_mul(rhs)),
            ArithmeticOp::Div => (rhs != 0).then(|| lhs.wrapping_div(rhs)),
            ArithmeticOp::Mod => (rhs != 0).then(|| lhs.wrapping_rem(rhs)),
            ArithmeticOp::Min => Some(lhs.min(rhs)),
            ArithmeticOp::Max => Some(lhs.max(rhs)),
        }
    }
}

/// Result of [`ShaderBuilder::create_source_code`].
#[derive(Debug, Clone, Default)]
pub struct BuildShader {
    pub source_code: String,
    /// Every asset that contributed text: include pieces first, blueprint last.
    pub asset_ids: SmallVec<[AssetId; 8]>,
    /// FNV-1a 64 folded over the file hash of each contributing asset.
    pub combined_asset_file_hashes: u64,
    pub syntax_errors: Vec<ShaderSyntaxError>,
    /// Set when the native preprocessor rejected the expanded text.
    pub preprocessor_error: Option<CompileError>,
}

impl BuildShader {
    #[inline]
    #[must_use]
    pub fn has_syntax_error(&self) -> bool {
        !self.syntax_errors.is_empty()
    }
}

/// The macro engine.
pub struct ShaderBuilder {
    settings: ShaderBuilderSettings,
    preprocessor: Arc<dyn ShaderPreprocessor>,
    properties: ShaderProperties,
    pieces: DynamicShaderPieces,
    syntax_errors: Vec<ShaderSyntaxError>,
    /// Set by a stage that stopped on a structural error.
    halted: bool,
}

impl Default for ShaderBuilder {
    fn default() -> Self {
        Self::new(ShaderBuilderSettings::default())
    }
}

impl ShaderBuilder {
    #[must_use]
    pub fn new(settings: ShaderBuilderSettings) -> Self {
        Self::with_preprocessor(settings, Arc::new(PassThroughPreprocessor))
    }

    #[must_use]
    pub fn with_preprocessor(
        settings: ShaderBuilderSettings,
        preprocessor: Arc<dyn ShaderPreprocessor>,
    ) -> Self {
        Self {
            settings,
            preprocessor,
            properties: ShaderProperties::new(),
            pieces: DynamicShaderPieces::default(),
            syntax_errors: Vec::new(),
            halted: false,
        }
    }

    /// The property environment, including changes made by math and counter macros.
    #[inline]
    #[must_use]
    pub fn shader_properties(&self) -> &ShaderProperties {
        &self.properties
    }

    #[inline]
    #[must_use]
    pub fn dynamic_shader_pieces(&self) -> &DynamicShaderPieces {
        &self.pieces
    }

    #[inline]
    #[must_use]
    pub fn syntax_errors(&self) -> &[ShaderSyntaxError] {
        &self.syntax_errors
    }

    #[inline]
    #[must_use]
    pub fn has_syntax_error(&self) -> bool {
        !self.syntax_errors.is_empty()
    }

    /// Start a new build from a copy of `properties`.
    pub fn reset(&mut self, properties: &ShaderProperties) {
        self.properties.clone_from(properties);
        self.pieces.clear();
        self.syntax_errors.clear();
        self.halted = false;
    }

    /// Builds the final source of `blueprint`.
    ///
    /// Include pieces are processed first so their `@piece` definitions and
    /// property changes are visible to the blueprint.
    pub fn create_source_code(
        &mut self,
        resources: &dyn ShaderResourceProvider,
        blueprint: &ShaderBlueprint,
        properties: &ShaderProperties,
    ) -> BuildShader {
        self.reset(properties);

        let mut asset_ids: SmallVec<[AssetId; 8]> = SmallVec::new();
        let mut combined_asset_file_hashes = FNV1A_INITIAL_HASH_64;
        let mut fold_asset = |asset_id: AssetId| {
            asset_ids.push(asset_id);
            match resources.asset_file_hash(asset_id) {
                Some(file_hash) => {
                    combined_asset_file_hashes =
                        fnv1a_64_seeded(&file_hash.to_le_bytes(), combined_asset_file_hashes);
                }
                None => log::warn!("Shader builder: no file hash known for asset {asset_id}"),
            }
        };

        for &piece_id in blueprint.include_shader_piece_resource_ids() {
            if let Some(piece) = resources.shader_piece(piece_id) {
                fold_asset(piece.asset_id());
                self.process_include_piece(piece.source_code());
            } else {
                log::warn!("Shader builder: include piece {piece_id} is not registered");
            }
        }
        fold_asset(blueprint.asset_id());

        let expanded = self.expand(blueprint.source_code());
        let expanded = self.finish(&expanded);

        let (source_code, preprocessor_error) = match self.preprocessor.preprocess(&expanded) {
            Ok(source_code) => (source_code, None),
            Err(err) => {
                log::error!("Shader builder: {err}");
                (expanded, Some(err))
            }
        };

        BuildShader {
            source_code,
            asset_ids,
            combined_asset_file_hashes,
            syntax_errors: std::mem::take(&mut self.syntax_errors),
            preprocessor_error,
        }
    }

    /// Runs every macro stage over raw `source`, without include pieces and
    /// without the native preprocessor.
    pub fn process(&mut self, source: &str, properties: &ShaderProperties) -> String {
        self.reset(properties);
        let expanded = self.expand(source);
        self.finish(&expanded)
    }

    /// Collects the identifiers `source` uses as shader properties.
    ///
    /// Values in the returned set are zero; only membership matters.
    #[must_use]
    pub fn referenced_shader_properties(source: &str) -> ShaderProperties {
        let mut referenced = ShaderProperties::new();
        let mut add = |arg: &str| {
            if parse_literal(arg).is_none() {
                referenced.set_property_value(ShaderPropertyId::from_name(arg), 0);
            }
        };

        let mut keywords: Vec<&str> = vec!["property", "foreach"];
        keywords.extend(MATH_KEYWORDS);
        keywords.extend(COUNTER_KEYWORDS);

        let mut cursor = 0;
        while let Some(found) = find_directive(source, cursor, &keywords) {
            cursor = found.end;
            let keyword = keywords[found.keyword];
            let Ok(span) = paren_span(source, found.end, "property") else {
                continue;
            };
            let inner = &source[span.inner.clone()];
            match keyword {
                "property" => inner
                    .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .filter(|name| !name.is_empty())
                    .for_each(&mut add),
                // The loop variable is not a property.
                "foreach" => {
                    if let Ok(args) = split_arguments(inner, "foreach") {
                        for (i, &arg) in args.iter().enumerate() {
                            if i != 1 {
                                add(arg);
                            }
                        }
                    }
                }
                _ => {
                    if let Ok(args) = split_arguments(inner, "counter") {
                        for &arg in &args {
                            add(arg);
                        }
                    }
                }
            }
        }
        referenced
    }

    // ── Pipeline ─────────────────────────────────────────────────────────────

    /// Math, foreach and properties, then pieces until none remain.
    fn expand(&mut self, source: &str) -> String {
        let mut text = self.parse_math(source);
        text = self.parse_for_each(&text);
        text = self.parse_properties(&text);

        let mut passes = 0;
        while !self.halted && contains_directive(&text, &PIECE_KEYWORDS) {
            passes += 1;
            if passes > self.settings.max_expansion_passes {
                let offset = find_directive(&text, 0, &PIECE_KEYWORDS).map_or(0, |d| d.start);
                self.report(
                    &text,
                    offset,
                    SyntaxErrorKind::ExpansionLimitExceeded {
                        directive: "insertpiece",
                        passes: self.settings.max_expansion_passes,
                    },
                );
                break;
            }

            let collected = self.collect_pieces(&text);
            let inserted = self.insert_pieces(&collected);
            if inserted == text {
                break;
            }
            text = self.parse_math(&inserted);
            text = self.parse_for_each(&text);
            text = self.parse_properties(&text);
        }
        text
    }

    /// Counters, then leftover block terminators.
    fn finish(&mut self, expanded: &str) -> String {
        let text = self.parse_counter(expanded);
        if !self.halted {
            let mut cursor = 0;
            while let Some(found) = find_directive(&text, cursor, &STRAY_KEYWORDS) {
                self.report(
                    &text,
                    found.start,
                    SyntaxErrorKind::StrayBlockEnd(STRAY_KEYWORDS[found.keyword]),
                );
                cursor = found.end;
            }
        }
        text
    }

    /// Include pieces contribute piece definitions and property changes only.
    fn process_include_piece(&mut self, source: &str) {
        let mut text = self.parse_math(source);
        text = self.parse_for_each(&text);
        text = self.parse_properties(&text);
        let collected = self.collect_pieces(&text);
        drop(self.parse_counter(&collected));
    }

    // ── Stages ───────────────────────────────────────────────────────────────

    /// `@pset(dst[, src], operand)` and friends. Emits nothing.
    pub fn parse_math(&mut self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut cursor = 0;

        while let Some(found) = find_directive(input, cursor, &MATH_KEYWORDS) {
            out.push_str(&input[cursor..found.start]);
            let directive = MATH_KEYWORDS[found.keyword];

            let span = match paren_span(input, found.end, directive) {
                Ok(span) => span,
                Err(kind) => {
                    self.halt(input, found.start, kind);
                    cursor = found.start;
                    break;
                }
            };
            cursor = span.end;

            match split_arguments(&input[span.inner.clone()], directive) {
                Ok(args) => self.apply_arithmetic(
                    input,
                    found.start,
                    directive,
                    ArithmeticOp::ALL[found.keyword],
                    &args,
                ),
                Err(kind) => self.report(input, found.start, kind),
            }
        }

        out.push_str(&input[cursor..]);
        out
    }

    /// `@foreach(count[, var[, start]]) ... @end`, repeated until no nested
    /// loop remains.
    pub fn parse_for_each(&mut self, input: &str) -> String {
        self.expand_to_fixed_point(input, "foreach", Self::for_each_pass)
    }

    /// `@property(expr) ... [@else ...] @end`, repeated until no nested
    /// conditional remains.
    pub fn parse_properties(&mut self, input: &str) -> String {
        self.expand_to_fixed_point(input, "property", Self::properties_pass)
    }

    /// Moves every `@piece(name) ... @end` into the piece table.
    pub fn collect_pieces(&mut self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut cursor = 0;

        while let Some(found) = find_directive(input, cursor, &["piece"]) {
            out.push_str(&input[cursor..found.start]);

            let found_block = paren_span(input, found.end, "piece").and_then(|span| {
                find_block_end(input, span.end, false, "piece")
                    .map(|block| (span, block))
                    .map_err(|(kind, _)| kind)
            });
            let (span, block) = match found_block {
                Ok(found_block) => found_block,
                Err(kind) => {
                    self.halt(input, found.start, kind);
                    cursor = found.start;
                    break;
                }
            };
            cursor = block.end;

            let args = match split_arguments(&input[span.inner.clone()], "piece") {
                Ok(args) if args.len() == 1 => args,
                Ok(args) => {
                    self.report(
                        input,
                        found.start,
                        SyntaxErrorKind::ArgumentCount {
                            directive: "piece",
                            expected: "1",
                            got: args.len(),
                        },
                    );
                    continue;
                }
                Err(kind) => {
                    self.report(input, found.start, kind);
                    continue;
                }
            };

            let id = StringId::new(args[0]);
            if self.pieces.contains_key(&id) {
                self.report(
                    input,
                    found.start,
                    SyntaxErrorKind::DuplicatePiece(args[0].to_owned()),
                );
            } else {
                self.pieces.insert(id, input[block.body].to_owned());
            }
        }

        out.push_str(&input[cursor..]);
        out
    }

    /// Replaces `@insertpiece(name)` with the collected piece text.
    pub fn insert_pieces(&mut self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut cursor = 0;

        while let Some(found) = find_directive(input, cursor, &["insertpiece"]) {
            out.push_str(&input[cursor..found.start]);

            let span = match paren_span(input, found.end, "insertpiece") {
                Ok(span) => span,
                Err(kind) => {
                    self.halt(input, found.start, kind);
                    cursor = found.start;
                    break;
                }
            };
            cursor = span.end;

            let args = match split_arguments(&input[span.inner.clone()], "insertpiece") {
                Ok(args) if args.len() == 1 => args,
                Ok(args) => {
                    self.report(
                        input,
                        found.start,
                        SyntaxErrorKind::ArgumentCount {
                            directive: "insertpiece",
                            expected: "1",
                            got: args.len(),
                        },
                    );
                    continue;
                }
                Err(kind) => {
                    self.report(input, found.start, kind);
                    continue;
                }
            };

            if let Some(piece) = self.pieces.get(&StringId::new(args[0])) {
                out.push_str(piece);
            } else {
                self.report(
                    input,
                    found.start,
                    SyntaxErrorKind::UnknownPiece(args[0].to_owned()),
                );
            }
        }

        out.push_str(&input[cursor..]);
        out
    }

    /// `@counter(p)` and `@value(p)` emit the current value (`@counter` then
    /// increments it); `@set`..`@max` behave like the math macros.
    pub fn parse_counter(&mut self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut cursor = 0;

        while let Some(found) = find_directive(input, cursor, &COUNTER_KEYWORDS) {
            out.push_str(&input[cursor..found.start]);
            let directive = COUNTER_KEYWORDS[found.keyword];

            let span = match paren_span(input, found.end, directive) {
                Ok(span) => span,
                Err(kind) => {
                    self.halt(input, found.start, kind);
                    cursor = found.start;
                    break;
                }
            };
            cursor = span.end;

            let args = match split_arguments(&input[span.inner.clone()], directive) {
                Ok(args) => args,
                Err(kind) => {
                    self.report(input, found.start, kind);
                    continue;
                }
            };

            match found.keyword {
                0 | 1 => {
                    if args.len() != 1 {
                        self.report(
                            input,
                            found.start,
                            SyntaxErrorKind::ArgumentCount {
                                directive,
                                expected: "1",
                                got: args.len(),
                            },
                        );
                        continue;
                    }
                    let id = ShaderPropertyId::from_name(args[0]);
                    let value = self.properties.get_property_value_or(id, 0);
                    out.push_str(&value.to_string());
                    if found.keyword == 0 {
                        self.properties.set_property_value(id, value.wrapping_add(1));
                    }
                }
                keyword => self.apply_arithmetic(
                    input,
                    found.start,
                    directive,
                    ArithmeticOp::ALL[keyword - 2],
                    &args,
                ),
            }
        }

        out.push_str(&input[cursor..]);
        out
    }

    // ── Passes ───────────────────────────────────────────────────────────────

    /// Runs `pass` until `directive` no longer occurs, bounded by the
    /// configured pass budget.
    fn expand_to_fixed_point(
        &mut self,
        input: &str,
        directive: &'static str,
        pass: fn(&mut Self, &str) -> String,
    ) -> String {
        let mut text = pass(self, input);
        let mut passes = 1;

        while !self.halted && contains_directive(&text, &[directive]) {
            if passes >= self.settings.max_expansion_passes {
                let offset = find_directive(&text, 0, &[directive]).map_or(0, |d| d.start);
                self.report(
                    &text,
                    offset,
                    SyntaxErrorKind::ExpansionLimitExceeded {
                        directive,
                        passes: self.settings.max_expansion_passes,
                    },
                );
                break;
            }
            text = pass(self, &text);
            passes += 1;
        }
        text
    }

    fn for_each_pass(&mut self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut cursor = 0;

        while let Some(found) = find_directive(input, cursor, &["foreach"]) {
            out.push_str(&input[cursor..found.start]);

            let found_block = paren_span(input, found.end, "foreach").and_then(|span| {
                find_block_end(input, span.end, false, "foreach")
                    .map(|block| (span, block))
                    .map_err(|(kind, _)| kind)
            });
            let (span, block) = match found_block {
                Ok(found_block) => found_block,
                Err(kind) => {
                    self.halt(input, found.start, kind);
                    cursor = found.start;
                    break;
                }
            };
            cursor = block.end;

            let args = match split_arguments(&input[span.inner.clone()], "foreach") {
                Ok(args) if args.len() <= 3 => args,
                Ok(args) => {
                    self.report(
                        input,
                        found.start,
                        SyntaxErrorKind::ArgumentCount {
                            directive: "foreach",
                            expected: "1 to 3",
                            got: args.len(),
                        },
                    );
                    continue;
                }
                Err(kind) => {
                    self.report(input, found.start, kind);
                    continue;
                }
            };

            let count = self.resolve(args[0]);
            let start = args.get(2).map_or(0, |arg| self.resolve(arg));
            let counter = args.get(1).map(|name| format!("@{name}"));
            let body = &input[block.body];

            for index in start..count {
                match &counter {
                    Some(counter) => out.push_str(&body.replace(counter, &index.to_string())),
                    None => out.push_str(body),
                }
            }
        }

        out.push_str(&input[cursor..]);
        out
    }

    fn properties_pass(&mut self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut cursor = 0;

        while let Some(found) = find_directive(input, cursor, &["property"]) {
            out.push_str(&input[cursor..found.start]);

            let found_block = paren_span(input, found.end, "property").and_then(|span| {
                find_block_end(input, span.end, true, "property")
                    .map(|block| (span, block))
                    .map_err(|(kind, _)| kind)
            });
            let (span, block) = match found_block {
                Ok(found_block) => found_block,
                Err(kind) => {
                    self.halt(input, found.start, kind);
                    cursor = found.start;
                    break;
                }
            };
            cursor = block.end;

            match expression::evaluate(&input[span.inner], &self.properties) {
                Ok(true) => out.push_str(&input[block.body]),
                Ok(false) => {
                    if let Some(else_body) = block.else_body {
                        out.push_str(&input[else_body]);
                    }
                }
                Err(kind) => self.report(input, found.start, kind),
            }
        }

        out.push_str(&input[cursor..]);
        out
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    /// Integer literal, else the value of the property with that name (0 if unset).
    fn resolve(&self, arg: &str) -> i32 {
        parse_literal(arg).unwrap_or_else(|| {
            self.properties
                .get_property_value_or(ShaderPropertyId::from_name(arg), 0)
        })
    }

    fn apply_arithmetic(
        &mut self,
        text: &str,
        offset: usize,
        directive: &'static str,
        op: ArithmeticOp,
        args: &[&str],
    ) {
        if !(2..=3).contains(&args.len()) {
            self.report(
                text,
                offset,
                SyntaxErrorKind::ArgumentCount {
                    directive,
                    expected: "2 or 3",
                    got: args.len(),
                },
            );
            return;
        }

        let destination = ShaderPropertyId::from_name(args[0]);
        let (source, operand) = if args.len() == 3 {
            (args[1], args[2])
        } else {
            (args[0], args[1])
        };

        match op.apply(self.resolve(source), self.resolve(operand)) {
            Some(value) => self.properties.set_property_value(destination, value),
            None => self.report(text, offset, SyntaxErrorKind::DivisionByZero(directive)),
        }
    }

    fn report(&mut self, text: &str, offset: usize, kind: SyntaxErrorKind) {
        let error = ShaderSyntaxError {
            line: line_number(text, offset),
            kind,
        };
        log::error!("Shader builder: {error}");
        self.syntax_errors.push(error);
    }

    fn halt(&mut self, text: &str, offset: usize, kind: SyntaxErrorKind) {
        self.report(text, offset, kind);
        self.halted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(source: &str, properties: &[(&str, i32)]) -> (String, ShaderBuilder) {
        let mut builder = ShaderBuilder::default();
        let output = builder.process(source, &ShaderProperties::from(properties));
        (output, builder)
    }

    #[test]
    fn test_arithmetic_ops() {
        assert_eq!(ArithmeticOp::Sub.apply(7, 3), Some(4));
        assert_eq!(ArithmeticOp::Div.apply(-7, 2), Some(-3));
        assert_eq!(ArithmeticOp::Mod.apply(-7, 2), Some(-1));
        assert_eq!(ArithmeticOp::Div.apply(1, 0), None);
        assert_eq!(ArithmeticOp::Mod.apply(1, 0), None);
        assert_eq!(ArithmeticOp::Set.apply(1, 9), Some(9));
    }

    #[test]
    fn test_math_two_and_three_arguments() {
        let (output, builder) = build("a@padd(X, 4)b@pmul(Y, X, 3)c", &[("X", 1)]);
        assert_eq!(output, "abc");
        assert_eq!(builder.shader_properties().get("X"), Some(5));
        assert_eq!(builder.shader_properties().get("Y"), Some(15));
        assert!(!builder.has_syntax_error());
    }

    #[test]
    fn test_division_by_zero_leaves_property_untouched() {
        let (output, builder) = build("@pdiv(X, 0)", &[("X", 6)]);
        assert_eq!(output, "");
        assert_eq!(builder.shader_properties().get("X"), Some(6));
        assert!(matches!(
            builder.syntax_errors()[0].kind,
            SyntaxErrorKind::DivisionByZero("pdiv")
        ));
    }

    #[test]
    fn test_foreach_with_start_and_property_count() {
        let (output, _) = build("@foreach(N, k, 1)[@k]@end", &[("N", 4)]);
        assert_eq!(output, "[1][2][3]");
    }

    #[test]
    fn test_nested_foreach() {
        let (output, builder) = build("@foreach(2, i)@foreach(2, j)@i@j @end@end", &[]);
        assert_eq!(output, "00 01 10 11 ");
        assert!(!builder.has_syntax_error());
    }

    #[test]
    fn test_foreach_counter_inside_longer_token() {
        let (output, builder) = build("@foreach(2, i)v@i_x @end", &[]);
        assert_eq!(output, "v0_x v1_x ");
        assert!(!builder.has_syntax_error());
    }

    #[test]
    fn test_piece_end_followed_by_expanded_text() {
        // The loop expands to "@piece(P)p@end0@insertpiece(P)1@insertpiece(P)".
        let (output, builder) = build("@piece(P)p@end@foreach(2, n)@n@insertpiece(P)@end", &[]);
        assert_eq!(output, "0p1p");
        assert!(!builder.has_syntax_error());
    }

    #[test]
    fn test_nested_properties() {
        let source = "@property(A)a@property(B)b@else!b@end@end";
        assert_eq!(build(source, &[("A", 1), ("B", 1)]).0, "ab");
        assert_eq!(build(source, &[("A", 1)]).0, "a!b");
        assert_eq!(build(source, &[("B", 1)]).0, "");
    }

    #[test]
    fn test_unterminated_block_stops_stage() {
        let (output, builder) = build("x @property(A) y", &[("A", 1)]);
        assert_eq!(output, "x @property(A) y");
        assert!(matches!(
            builder.syntax_errors()[0].kind,
            SyntaxErrorKind::UnterminatedBlock("property")
        ));
    }

    #[test]
    fn test_error_line_numbers() {
        let (_, builder) = build("line1\nline2\n@insertpiece(Nope)\n", &[]);
        assert_eq!(builder.syntax_errors().len(), 1);
        assert_eq!(builder.syntax_errors()[0].line, 3);
    }

    #[test]
    fn test_stray_end_is_reported() {
        let (output, builder) = build("a @end b", &[]);
        assert_eq!(output, "a @end b");
        assert!(matches!(
            builder.syntax_errors()[0].kind,
            SyntaxErrorKind::StrayBlockEnd("end")
        ));
    }

    #[test]
    fn test_counter_set_forms() {
        let (output, builder) = build("@set(L, 3)@add(L, 2)@value(L) @counter(L)@value(L)", &[]);
        assert_eq!(output, "5 56");
        assert_eq!(builder.shader_properties().get("L"), Some(6));
    }

    #[test]
    fn test_referenced_shader_properties() {
        let source = "@property(A && !(B || C)) x @end\n\
                      @foreach(COUNT, i, START) y @end\n\
                      @padd(D, E, 2) @counter(F) @piece(NotAProperty) z @end";
        let referenced = ShaderBuilder::referenced_shader_properties(source);
        for name in ["A", "B", "C", "COUNT", "START", "D", "E", "F"] {
            assert!(
                referenced.has_property_value(ShaderPropertyId::from_name(name)),
                "{name} should be referenced"
            );
        }
        assert!(!referenced.has_property_value(ShaderPropertyId::from_name("i")));
        assert!(!referenced.has_property_value(ShaderPropertyId::from_name("NotAProperty")));
        assert_eq!(referenced.len(), 8);
    }
}
