//! Command grammar
//!
//! A line is classified by the first trigger from [`TRIGGERS`] that appears
//! anywhere in it, then decoded once into a [`Command`]. Order matters when a
//! line mentions more than one trigger.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

pub const ASK: &str = "물어바라~";
pub const RECORD_INPUT: &str = "적어바라~";
pub const SELECT_OPERATION: &str = "연산을 선택해바라~";
pub const COMPUTE: &str = "계산해바라~";
pub const SAY: &str = "말해바라~";
pub const DECLARE: &str = "변수바라~";
pub const SAVE: &str = "저장바라~";

/// Variable names are word characters not starting with an ASCII digit
const NAME: &str = r"([^\W0-9]\w*)";

lazy_static! {
    static ref QUOTED: Regex = Regex::new(r#""\s*(.*?)\s*""#).unwrap();
    static ref RECORD_TARGET: Regex =
        Regex::new(&format!(r"{}\s*{}\s*\(.*?\)", regex::escape(RECORD_INPUT), NAME)).unwrap();
    static ref OPERATION: Regex = Regex::new(r#""\s*(덧셈|뺄셈|곱셈|나눗셈)\s*""#).unwrap();
    static ref DECLARE_TARGET: Regex =
        Regex::new(&format!(r"{}\s*{}", regex::escape(DECLARE), NAME)).unwrap();
    static ref SAVE_TARGET: Regex =
        Regex::new(&format!(r"{}\s*(\w+)\s*\(", regex::escape(SAVE))).unwrap();
}

/// Arithmetic operation picked with `연산을 선택해바라~`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl Operation {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "덧셈" => Some(Operation::Addition),
            "뺄셈" => Some(Operation::Subtraction),
            "곱셈" => Some(Operation::Multiplication),
            "나눗셈" => Some(Operation::Division),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Operation::Addition => "덧셈",
            Operation::Subtraction => "뺄셈",
            Operation::Multiplication => "곱셈",
            Operation::Division => "나눗셈",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show literal text
    AskText(String),
    /// Evaluate and show the result
    AskExpr(String),
    RecordInput { name: String, prompt: String },
    SelectOperation(Operation),
    Compute(String),
    Say(String),
    Declare(String),
    Save { name: String, content: String },
}

type Decoder = fn(&str) -> Result<Command, String>;

/// Triggers in the order they are tested
pub const TRIGGERS: [(&str, Decoder); 7] = [
    (ASK, decode_ask),
    (RECORD_INPUT, decode_record_input),
    (SELECT_OPERATION, decode_select_operation),
    (COMPUTE, decode_compute),
    (SAY, decode_say),
    (DECLARE, decode_declare),
    (SAVE, decode_save),
];

/// Decode a trimmed line. `Ok(None)` means no trigger is present.
pub fn decode(line: &str) -> Result<Option<Command>, String> {
    for (trigger, decoder) in TRIGGERS {
        if line.contains(trigger) {
            return decoder(line).map(Some);
        }
    }
    Ok(None)
}

/// First double-quoted span, trimmed inside the quotes
pub fn quoted(line: &str) -> Option<&str> {
    QUOTED
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Contents of the first `(` and its balancing `)`, trimmed
pub fn parenthesized(line: &str) -> Option<&str> {
    split_group(line).map(|(inner, _)| inner)
}

/// Trimmed contents of the first balanced group and the text after it
fn split_group(line: &str) -> Option<(&str, &str)> {
    let start = line.find('(')?;
    let mut depth = 0usize;
    for (i, c) in line[start..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + i;
                    return Some((line[start + 1..end].trim(), &line[end + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

/// A parenthesized expression that must end the line
fn expression_group<'a>(line: &'a str, trigger: &str) -> Result<Option<&'a str>, String> {
    let Some((inner, rest)) = split_group(line) else {
        return Ok(None);
    };
    match rest.trim() {
        "" => Ok(Some(inner)),
        trailing => Err(format!(
            "{} found `{}` after ({}); put the whole expression in parentheses",
            trigger, trailing, inner
        )),
    }
}

fn decode_ask(line: &str) -> Result<Command, String> {
    if let Some(text) = quoted(line) {
        return Ok(Command::AskText(text.to_string()));
    }
    expression_group(line, ASK)?
        .map(|expr| Command::AskExpr(expr.to_string()))
        .ok_or_else(|| format!("{} needs a quoted string or a parenthesized expression", ASK))
}

fn decode_record_input(line: &str) -> Result<Command, String> {
    let name = RECORD_TARGET
        .captures(line)
        .and_then(|c| c.get(1))
        .ok_or_else(|| format!("{} needs a variable name followed by (...)", RECORD_INPUT))?;
    let prompt =
        quoted(line).ok_or_else(|| format!("{} needs a quoted prompt", RECORD_INPUT))?;
    Ok(Command::RecordInput {
        name: name.as_str().to_string(),
        prompt: prompt.to_string(),
    })
}

fn decode_select_operation(line: &str) -> Result<Command, String> {
    OPERATION
        .captures(line)
        .and_then(|c| c.get(1))
        .and_then(|m| Operation::from_keyword(m.as_str()))
        .map(Command::SelectOperation)
        .ok_or_else(|| {
            format!(
                "{} needs one of \"덧셈\", \"뺄셈\", \"곱셈\", \"나눗셈\"",
                SELECT_OPERATION
            )
        })
}

fn decode_compute(line: &str) -> Result<Command, String> {
    expression_group(line, COMPUTE)?
        .map(|expr| Command::Compute(expr.to_string()))
        .ok_or_else(|| format!("{} needs a parenthesized expression", COMPUTE))
}

fn decode_say(line: &str) -> Result<Command, String> {
    quoted(line)
        .map(|text| Command::Say(text.to_string()))
        .ok_or_else(|| format!("{} needs a quoted string", SAY))
}

fn decode_declare(line: &str) -> Result<Command, String> {
    DECLARE_TARGET
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| Command::Declare(m.as_str().to_string()))
        .ok_or_else(|| format!("{} needs a variable name", DECLARE))
}

fn decode_save(line: &str) -> Result<Command, String> {
    let missing = || format!("{} needs a file name followed by (content)", SAVE);

    let caps = SAVE_TARGET.captures(line).ok_or_else(missing)?;
    let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
        return Err(missing());
    };
    // The match ends on the opening parenthesis
    let content = parenthesized(&line[whole.end() - 1..]).ok_or_else(missing)?;
    Ok(Command::Save {
        name: name.as_str().to_string(),
        content: content.to_string(),
    })
}
