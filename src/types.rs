//! Core types shared by the evaluator and the memory game.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Binary operator pending between two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl Operator {
    /// Display symbol used in history expressions.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "−",
            Self::Multiply => "×",
            Self::Divide => "÷",
            Self::Power => "^",
        }
    }

    /// Parse an input token (keyboard or button payload).
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "+" => Some(Self::Add),
            "-" => Some(Self::Subtract),
            "*" => Some(Self::Multiply),
            "/" => Some(Self::Divide),
            "**" | "^" => Some(Self::Power),
            _ => None,
        }
    }
}

/// Unary scientific function applied to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Function {
    /// Sine, argument in degrees.
    Sin,
    /// Cosine, argument in degrees.
    Cos,
    /// Tangent, argument in degrees.
    Tan,
    /// Base-10 logarithm, positive input only.
    Log,
    /// Square root, non-negative input only.
    Sqrt,
    Square,
    Cube,
    /// Factorial, non-negative integer input only.
    Factorial,
    /// 1/x, nonzero input only.
    Reciprocal,
}

impl Function {
    /// Parse a function name token.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Self::Sin),
            "cos" => Some(Self::Cos),
            "tan" => Some(Self::Tan),
            "log" => Some(Self::Log),
            "sqrt" => Some(Self::Sqrt),
            "square" => Some(Self::Square),
            "cube" => Some(Self::Cube),
            "factorial" => Some(Self::Factorial),
            "inverse" | "reciprocal" => Some(Self::Reciprocal),
            _ => None,
        }
    }
}

/// Mathematical constant insertable into the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constant {
    Pi,
    E,
}

impl Constant {
    pub fn value(self) -> f64 {
        match self {
            Self::Pi => std::f64::consts::PI,
            Self::E => std::f64::consts::E,
        }
    }

    /// Display glyph used in history expressions.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Pi => "π",
            Self::E => "e",
        }
    }
}

/// One entry in the evaluator's bounded history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub expression: String,
    pub result: f64,
    pub timestamp: DateTime<Utc>,
}

/// Memory game difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Easy
    }
}

impl Difficulty {
    /// Number of symbol pairs in the deck.
    pub fn pair_count(self) -> usize {
        match self {
            Self::Easy => 8,
            Self::Medium => 12,
            Self::Hard => 18,
        }
    }
}

/// Memory game lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Idle,
    Running,
    Won,
}

impl Default for GameStatus {
    fn default() -> Self {
        Self::Idle
    }
}

/// One card in the memory game deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub symbol: char,
    pub face_up: bool,
    pub matched: bool,
}

impl Card {
    pub fn new(symbol: char) -> Self {
        Self {
            symbol,
            face_up: false,
            matched: false,
        }
    }
}

/// Format elapsed seconds as zero-padded mm:ss.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
