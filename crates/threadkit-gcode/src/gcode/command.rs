//! G-Code line model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of a single G-Code argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgValue {
    /// Numeric value, e.g. `X10.5`
    Number(f64),
    /// Bare letter, e.g. `X` in `G28 X Y`
    Flag,
    /// Free text, e.g. the message of `M117`
    Text(String),
}

/// One argument of a G-Code line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcodeArg {
    /// Axis/parameter letter, `None` for free text
    pub letter: Option<char>,
    /// Argument value
    pub value: ArgValue,
}

impl GcodeArg {
    /// Numeric argument
    pub fn number(letter: char, value: f64) -> Self {
        Self {
            letter: Some(letter),
            value: ArgValue::Number(value),
        }
    }

    /// Bare letter argument
    pub fn flag(letter: char) -> Self {
        Self {
            letter: Some(letter),
            value: ArgValue::Flag,
        }
    }

    /// Free text argument
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            letter: None,
            value: ArgValue::Text(text.into()),
        }
    }
}

impl fmt::Display for GcodeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(letter) = self.letter {
            write!(f, "{}", letter)?;
        }
        match &self.value {
            ArgValue::Number(v) => write!(f, "{}", format_number(*v)),
            ArgValue::Flag => Ok(()),
            ArgValue::Text(t) => write!(f, "{}", t),
        }
    }
}

/// Format a number rounded to 5 decimals without trailing zeros
pub fn format_number(value: f64) -> String {
    let s = format!("{:.5}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// A single line of G-Code.
///
/// Lines read from a file keep their original text and are reproduced
/// verbatim until modified. Lines created by threadkit are `synthetic` and
/// carry no line number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcodeLine {
    /// Line number in the source file (1-based)
    pub line_number: Option<u32>,
    /// Command code, e.g. `G1`, `M117`, `T0`
    pub code: Option<String>,
    /// Arguments in source order
    pub args: Vec<GcodeArg>,
    /// Comment text after `;`
    pub comment: Option<String>,
    /// Created by threadkit rather than read from input
    pub synthetic: bool,
    /// Extrusion performed by this line relative to the previous one
    pub relative_extrude: Option<f64>,
    /// Modal feedrate in effect for this line
    pub feedrate: Option<f64>,
    raw: Option<String>,
}

impl GcodeLine {
    /// Line parsed from input text
    pub fn parsed(
        line_number: u32,
        raw: impl Into<String>,
        code: Option<String>,
        args: Vec<GcodeArg>,
        comment: Option<String>,
    ) -> Self {
        Self {
            line_number: Some(line_number),
            code,
            args,
            comment,
            synthetic: false,
            relative_extrude: None,
            feedrate: None,
            raw: Some(raw.into()),
        }
    }

    /// New synthetic command with numeric arguments
    pub fn synthetic(code: &str, args: &[(char, f64)], comment: Option<&str>) -> Self {
        Self {
            line_number: None,
            code: Some(code.to_string()),
            args: args.iter().map(|(l, v)| GcodeArg::number(*l, *v)).collect(),
            comment: comment.map(str::to_string),
            synthetic: true,
            relative_extrude: None,
            feedrate: None,
            raw: None,
        }
    }

    /// Synthetic comment-only line
    pub fn comment_line(text: impl Into<String>) -> Self {
        Self {
            line_number: None,
            code: None,
            args: Vec::new(),
            comment: Some(text.into()),
            synthetic: true,
            relative_extrude: None,
            feedrate: None,
            raw: None,
        }
    }

    /// True if the code matches `code`
    pub fn is_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }

    /// Numeric value of an argument
    pub fn arg(&self, letter: char) -> Option<f64> {
        self.args.iter().find_map(|a| match (a.letter, &a.value) {
            (Some(l), ArgValue::Number(v)) if l == letter => Some(*v),
            _ => None,
        })
    }

    /// True if the argument letter is present, with or without a value
    pub fn has_arg(&self, letter: char) -> bool {
        self.args.iter().any(|a| a.letter == Some(letter))
    }

    /// Comment text, trimmed
    pub fn comment_text(&self) -> Option<&str> {
        self.comment.as_deref().map(str::trim)
    }

    /// `G0` or `G1`
    pub fn is_move(&self) -> bool {
        self.is_code("G0") || self.is_code("G1")
    }

    /// Move in the XY plane
    pub fn is_xymove(&self) -> bool {
        self.is_move() && (self.has_arg('X') || self.has_arg('Y'))
    }

    /// Move with an `E` argument
    pub fn is_extrude(&self) -> bool {
        self.is_move() && self.has_arg('E')
    }

    /// XY move that deposits material
    pub fn is_xyextrude(&self) -> bool {
        self.is_xymove() && self.has_arg('E') && self.relative_extrude.map_or(true, |e| e > 0.0)
    }

    /// Copy with an argument set (replaced in place or appended)
    pub fn with_arg(&self, letter: char, value: f64) -> Self {
        let mut line = self.clone();
        line.raw = None;
        match line.args.iter_mut().find(|a| a.letter == Some(letter)) {
            Some(arg) => arg.value = ArgValue::Number(value),
            None => line.args.push(GcodeArg::number(letter, value)),
        }
        line
    }

    /// Copy with a bare letter argument appended, if not already present
    pub fn with_flag(&self, letter: char) -> Self {
        let mut line = self.clone();
        if !line.has_arg(letter) {
            line.raw = None;
            line.args.push(GcodeArg::flag(letter));
        }
        line
    }

    /// Copy with a different comment
    pub fn with_comment(&self, comment: impl Into<String>) -> Self {
        let mut line = self.clone();
        line.raw = None;
        line.comment = Some(comment.into());
        line
    }

    /// Copy without an argument
    pub fn without_arg(&self, letter: char) -> Self {
        let mut line = self.clone();
        line.raw = None;
        line.args.retain(|a| a.letter != Some(letter));
        line
    }

    /// Synthetic non-extruding `G0` to this line's XY(Z) target
    pub fn as_xymove(&self) -> Option<Self> {
        if !self.is_xymove() {
            return None;
        }
        let args: Vec<(char, f64)> = ['X', 'Y', 'Z']
            .into_iter()
            .filter_map(|l| self.arg(l).map(|v| (l, v)))
            .collect();
        Some(Self::synthetic("G0", &args, self.comment.as_deref()))
    }

    /// True if the line was modified or created after parsing
    pub fn is_modified(&self) -> bool {
        self.raw.is_none()
    }

    /// Render as G-Code text
    pub fn construct(&self) -> String {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        let mut parts: Vec<String> = Vec::with_capacity(self.args.len() + 1);
        if let Some(code) = &self.code {
            parts.push(code.clone());
        }
        parts.extend(self.args.iter().map(|a| a.to_string()));
        let body = parts.join(" ");
        match (&self.comment, body.is_empty()) {
            (Some(c), true) => format!(";{}", c),
            (Some(c), false) => format!("{} ;{}", body, c),
            (None, _) => body,
        }
    }
}

impl fmt::Display for GcodeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.construct())
    }
}
