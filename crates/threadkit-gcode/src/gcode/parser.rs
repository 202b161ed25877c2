//! G-Code parser with extrusion bookkeeping
//!
//! Tokenizes `code args ; comment` lines and tracks the extrusion mode
//! (M82/M83), `G92 E` resets and the modal feedrate, so each line knows how
//! much filament it deposits relative to the line before.

use regex::Regex;
use serde::{Deserialize, Serialize};
use threadkit_core::GcodeError;
use tracing::debug;

use super::command::{GcodeArg, GcodeLine};

/// Extruder positioning mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtrusionMode {
    /// `M82`: E values are absolute positions
    #[default]
    Absolute,
    /// `M83`: E values are deltas
    Relative,
}

impl std::fmt::Display for ExtrusionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absolute => write!(f, "absolute"),
            Self::Relative => write!(f, "relative"),
        }
    }
}

/// Extrusion state tracked while reading a file
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ParserState {
    /// Current extrusion mode
    pub extrusion_mode: ExtrusionMode,
    /// Last absolute E position
    pub e_position: f64,
    /// Modal feedrate
    pub feedrate: Option<f64>,
}

/// G-Code line parser
#[derive(Debug, Default)]
pub struct GcodeParser {
    state: ParserState,
}

fn code_regex() -> &'static Regex {
    static CODE_REGEX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    CODE_REGEX.get_or_init(|| Regex::new(r"^([GMTgmt])(\d+)(\.\d+)?$").expect("invalid regex pattern"))
}

fn arg_regex() -> &'static Regex {
    static ARG_REGEX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    ARG_REGEX.get_or_init(|| Regex::new(r"^([A-Za-z])(.*)$").expect("invalid regex pattern"))
}

impl GcodeParser {
    /// Create a parser in absolute extrusion mode
    pub fn new() -> Self {
        Self::default()
    }

    /// Current extrusion state
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Parse one line of text
    pub fn parse(&mut self, text: &str, line_number: u32) -> Result<GcodeLine, GcodeError> {
        let (body, comment) = match text.find(';') {
            Some(idx) => (&text[..idx], Some(text[idx + 1..].to_string())),
            None => (text, None),
        };

        let mut tokens = body.split_whitespace();
        let code = match tokens.next() {
            None => None,
            Some(tok) => match code_regex().captures(tok) {
                Some(caps) => {
                    // G01 and G1 are the same command
                    let number: u32 = caps[2].parse().map_err(|_| GcodeError::InvalidSyntax {
                        line_number,
                        reason: format!("bad command number in '{}'", tok),
                    })?;
                    let suffix = caps.get(3).map_or("", |m| m.as_str());
                    Some(format!("{}{}{}", caps[1].to_uppercase(), number, suffix))
                }
                None => {
                    return Err(GcodeError::InvalidSyntax {
                        line_number,
                        reason: format!("unknown command '{}'", tok),
                    })
                }
            },
        };

        let mut args = Vec::new();
        if code.as_deref() == Some("M117") {
            let message = body.trim_start();
            let message = message[message.find(char::is_whitespace).unwrap_or(message.len())..].trim();
            if !message.is_empty() {
                args.push(GcodeArg::text(message));
            }
        } else {
            for tok in tokens {
                let caps = arg_regex().captures(tok).ok_or_else(|| GcodeError::InvalidSyntax {
                    line_number,
                    reason: format!("bad argument '{}'", tok),
                })?;
                let letter = caps[1].to_ascii_uppercase().chars().next().unwrap_or('?');
                let value = &caps[2];
                if value.is_empty() {
                    args.push(GcodeArg::flag(letter));
                } else {
                    let v: f64 = value.parse().map_err(|_| GcodeError::InvalidParameter {
                        line_number,
                        param: letter.to_string(),
                        reason: format!("'{}' is not a number", value),
                    })?;
                    args.push(GcodeArg::number(letter, v));
                }
            }
        }

        let mut line = GcodeLine::parsed(line_number, text, code, args, comment);
        self.update_state(&mut line);
        Ok(line)
    }

    /// Apply extrusion bookkeeping for `line` and annotate it
    fn update_state(&mut self, line: &mut GcodeLine) {
        match line.code.as_deref() {
            Some("M82") => self.state.extrusion_mode = ExtrusionMode::Absolute,
            Some("M83") => self.state.extrusion_mode = ExtrusionMode::Relative,
            Some("G92") => {
                if let Some(e) = line.arg('E') {
                    self.state.e_position = e;
                }
            }
            Some("G0") | Some("G1") => {
                if let Some(f) = line.arg('F') {
                    self.state.feedrate = Some(f);
                }
                line.feedrate = self.state.feedrate;
                if let Some(e) = line.arg('E') {
                    let relative = match self.state.extrusion_mode {
                        ExtrusionMode::Absolute => e - self.state.e_position,
                        ExtrusionMode::Relative => e,
                    };
                    self.state.e_position += relative;
                    line.relative_extrude = Some(relative);
                }
            }
            Some("G28") => debug!("home at line {:?}", line.line_number),
            _ => {}
        }
    }
}
