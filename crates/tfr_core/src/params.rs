//! Hyperparameter Records
//!
//! Recovers the typed training parameters of a run from the one-line
//! `< name: value >, ` dump the training process writes next to its logs,
//! and renders records back into that exact format.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use thiserror::Error;
use tracing::debug;

/// Literal the writer emits for an unset value.
const NONE_LITERAL: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Str,
    Int,
    Float,
    /// Int when the literal is integral, Float otherwise
    Number,
    Bool,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamKind::Str => "string",
            ParamKind::Int => "integer",
            ParamKind::Float => "float",
            ParamKind::Number => "number",
            ParamKind::Bool => "boolean",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("`{raw}` is not a valid {kind}")]
pub struct CoerceError {
    pub kind: ParamKind,
    pub raw: String,
}

impl ParamKind {
    pub fn coerce(self, raw: &str) -> Result<ParamValue, CoerceError> {
        let fail = || CoerceError {
            kind: self,
            raw: raw.to_string(),
        };
        match self {
            ParamKind::Str => Ok(ParamValue::Str(raw.to_string())),
            ParamKind::Int => raw.parse().map(ParamValue::Int).map_err(|_| fail()),
            ParamKind::Float => raw.parse().map(ParamValue::Float).map_err(|_| fail()),
            ParamKind::Number => raw
                .parse()
                .map(ParamValue::Int)
                .or_else(|_| raw.parse().map(ParamValue::Float))
                .map_err(|_| fail()),
            ParamKind::Bool => match raw {
                "True" | "true" => Ok(ParamValue::Bool(true)),
                "False" | "false" => Ok(ParamValue::Bool(false)),
                _ => Err(fail()),
            },
        }
    }
}

/// A single typed hyperparameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Declared field whose default is "no value"
    Unset,
}

impl ParamValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

/// Formats values the way the training process prints them.
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(v) => f.write_str(v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => f.write_str(&python_float(*v)),
            ParamValue::Bool(true) => f.write_str("True"),
            ParamValue::Bool(false) => f.write_str("False"),
            ParamValue::Unset => f.write_str(NONE_LITERAL),
        }
    }
}

/// Shortest round-trip float text with exponent notation outside
/// `[1e-4, 1e16)`, e.g. `0.001`, `1000.0`, `1e-05`.
pub fn python_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let abs = v.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let sci = format!("{:e}", v);
        return match sci.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(d) => ('-', d),
                    None => ('+', exp),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => sci,
        };
    }

    if v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// One declared parameter: its name, type and default value.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: ParamValue,
}

impl FieldSpec {
    fn new(name: &'static str, kind: ParamKind, default: ParamValue) -> Self {
        Self {
            name,
            kind,
            default,
        }
    }
}

/// Why a fragment of the dump was left out of the record.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoSeparator,
    UnknownName(String),
    NoneLiteral,
    Coerce(CoerceError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFragment {
    pub fragment: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseReport {
    pub record: HyperparameterRecord,
    pub skipped: Vec<SkippedFragment>,
}

/// The table of recognized parameters, built once.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Parameters written by the RL training runs.
    pub fn training() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            use ParamKind::*;
            use ParamValue as V;
            let s = |v: &str| V::Str(v.to_string());
            Schema::new(vec![
                FieldSpec::new("env_name", Str, s("Ant-v4")),
                FieldSpec::new("agent_name", Str, s("CountinuousDQN")),
                FieldSpec::new("num_episodes", Int, V::Int(1000)),
                FieldSpec::new("test_group_label", Str, V::Unset),
                FieldSpec::new("save_every_n", Int, V::Int(20)),
                FieldSpec::new("buffer_size", Int, V::Int(10_000)),
                FieldSpec::new("batch_size", Int, V::Int(4)),
                FieldSpec::new("update_every", Int, V::Int(4)),
                FieldSpec::new("update_every_eps", Int, V::Int(1)),
                FieldSpec::new("update_steps", Int, V::Int(10)),
                FieldSpec::new("hidden_size", Int, V::Int(256)),
                FieldSpec::new("sample_size", Int, V::Int(10)),
                FieldSpec::new("epsilon", Float, V::Float(0.9)),
                FieldSpec::new("epsilon_decay", Float, V::Float(0.99)),
                FieldSpec::new("epsilon_min", Float, V::Float(0.0)),
                FieldSpec::new("epsilon_decay_start", Int, V::Int(10)),
                FieldSpec::new("slack", Float, V::Float(0.001)),
                FieldSpec::new("learning_rate", Float, V::Float(1e-3)),
                FieldSpec::new("lambda_lr_2", Float, V::Float(0.05)),
                FieldSpec::new("alpha", Number, V::Int(1)),
                FieldSpec::new("beta", Float, V::Float(0.95)),
                FieldSpec::new("no_cuda", Bool, V::Bool(true)),
                FieldSpec::new("num_test", Int, V::Int(200)),
                FieldSpec::new("reward_size", Int, V::Int(2)),
                FieldSpec::new("constraint", Float, V::Float(0.1)),
                FieldSpec::new("constraints", Str, s("[(0.3, 0.5), (0.0, 0.1)]")),
                FieldSpec::new("lextab_on_policy", Bool, V::Bool(false)),
            ])
        })
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn defaults(&self) -> HyperparameterRecord {
        HyperparameterRecord {
            values: self
                .fields
                .iter()
                .map(|f| (f.name, f.default.clone()))
                .collect(),
        }
    }

    pub fn parse(&self, text: &str) -> HyperparameterRecord {
        self.parse_with_report(text).record
    }

    /// Parses the first line of `text`, skipping (and reporting) fragments that
    /// are malformed, unknown, `None` or of the wrong type.
    pub fn parse_with_report(&self, text: &str) -> ParseReport {
        let mut record = self.defaults();
        let mut skipped = Vec::new();
        let line = text.lines().next().unwrap_or("");

        for raw in split_fragments(line) {
            let fragment = raw.trim_matches(|c| c == '<' || c == '>' || c == ' ');
            if fragment.trim().is_empty() {
                continue;
            }

            match self.resolve(fragment) {
                Ok((name, value)) => {
                    record.values.insert(name, value);
                }
                Err(reason) => {
                    debug!("Skipping parameter fragment {:?}: {:?}", fragment, reason);
                    skipped.push(SkippedFragment {
                        fragment: fragment.to_string(),
                        reason,
                    });
                }
            }
        }

        ParseReport { record, skipped }
    }

    fn resolve(&self, fragment: &str) -> Result<(&'static str, ParamValue), SkipReason> {
        let (name, value) = fragment.split_once(':').ok_or(SkipReason::NoSeparator)?;
        let (name, value) = (name.trim(), value.trim());

        let spec = self
            .field(name)
            .ok_or_else(|| SkipReason::UnknownName(name.to_string()))?;
        if value == NONE_LITERAL {
            return Err(SkipReason::NoneLiteral);
        }
        let value = spec.kind.coerce(value).map_err(SkipReason::Coerce)?;
        Ok((spec.name, value))
    }
}

/// Splits on commas that close a `< ... >` fragment, so commas inside values
/// (e.g. `[(0.3, 0.5), (0.0, 0.1)]`) survive. Bracket-less lines split on
/// every comma.
fn split_fragments(line: &str) -> Vec<&str> {
    if !line.contains('>') {
        return line.split(',').collect();
    }

    let mut fragments = Vec::new();
    let mut start = 0;
    for (idx, c) in line.char_indices() {
        if c == ',' && line[start..idx].trim_end().ends_with('>') {
            fragments.push(&line[start..idx]);
            start = idx + 1;
        }
    }
    fragments.push(&line[start..]);
    fragments
}

/// Typed training parameters of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperparameterRecord {
    values: BTreeMap<&'static str, ParamValue>,
}

impl Default for HyperparameterRecord {
    fn default() -> Self {
        Schema::training().defaults()
    }
}

impl HyperparameterRecord {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ParamValue::as_int)
    }

    pub fn hidden_size(&self) -> i64 {
        self.int("hidden_size").unwrap_or_default()
    }

    pub fn batch_size(&self) -> i64 {
        self.int("batch_size").unwrap_or_default()
    }

    /// Fields in alphabetical order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParamValue)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    /// Byte-compatible with the dump the training process writes.
    pub fn render_to_string(&self) -> String {
        self.iter()
            .map(|(name, value)| format!(" < {}: {} >, ", name, value))
            .collect()
    }

    /// `name : value` rows for the session info view.
    pub fn info_lines(&self) -> Vec<String> {
        self.iter()
            .map(|(name, value)| format!("{} : {}", name, value))
            .collect()
    }
}
