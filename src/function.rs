//! Column transformation functions.
//!
//! Functions are read from configuration trees:
//!
//! ```text
//! Anrede(IF(STRCMP(VALUE "Geschlecht" "w") THEN "Frau" ELSE "Herr"))
//! Name(CAT(VALUE "Vorname" " " VALUE "Nachname"))
//! ```
//!
//! Every function yields a string. Booleans are the strings `true` and `false`.
//! When evaluation fails the result is [`ERROR`], which propagates through every
//! enclosing function.
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::dataset::{Dataset, DatasetRef};
use crate::error::{ColumnNotFound, Result, WolldbError};
use crate::thingy::Thingy;

/// Result of a function whose evaluation failed.
pub const ERROR: &str = "!¤£!FEHLERHAFTE DATEN!¤£!";

/// Named values a function reads through `VALUE`.
pub trait Values {
    fn has_value(&self, id: &str) -> bool;
    /// The value of `id`, or an empty string.
    fn string(&self, id: &str) -> String;
}

pub trait Function: fmt::Debug + Send + Sync {
    /// Names of all values the function reads.
    fn parameters(&self) -> Vec<String>;
    fn string(&self, values: &dyn Values) -> String;
    fn boolean(&self, values: &dyn Values) -> bool {
        self.string(values).eq_ignore_ascii_case("true")
    }
}

#[derive(Debug)]
enum Expr {
    Literal(String),
    Value(String),
    Cat(Vec<Expr>),
    Match(Box<Expr>, Regex),
    Replace(Box<Expr>, Regex, String),
    If {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Strcmp(Vec<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Vec<Expr>),
}

fn boolean_str(b: bool) -> String {
    if b { "true".to_string() } else { "false".to_string() }
}

impl Expr {
    fn eval(&self, values: &dyn Values) -> String {
        match self {
            Expr::Literal(s) => s.clone(),
            Expr::Value(id) => {
                if values.has_value(id) {
                    values.string(id)
                } else {
                    ERROR.to_string()
                }
            }
            Expr::Cat(parts) => {
                let mut result = String::new();
                for part in parts {
                    let s = part.eval(values);
                    if s == ERROR {
                        return s;
                    }
                    result.push_str(&s);
                }
                result
            }
            Expr::Match(input, regex) => {
                let s = input.eval(values);
                if s == ERROR {
                    return s;
                }
                boolean_str(regex.is_match(&s))
            }
            Expr::Replace(input, regex, replacement) => {
                let s = input.eval(values);
                if s == ERROR {
                    return s;
                }
                regex.replace_all(&s, replacement.as_str()).into_owned()
            }
            Expr::If {
                condition,
                then,
                otherwise,
            } => {
                let c = condition.eval(values);
                if c == ERROR {
                    return c;
                }
                if c.eq_ignore_ascii_case("true") {
                    then.eval(values)
                } else {
                    otherwise.eval(values)
                }
            }
            Expr::Strcmp(args) => {
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    let s = arg.eval(values);
                    if s == ERROR {
                        return s;
                    }
                    evaluated.push(s);
                }
                boolean_str(evaluated.windows(2).all(|w| w[0] == w[1]))
            }
            Expr::And(args) | Expr::Or(args) | Expr::Not(args) => {
                let mut all = true;
                let mut any = false;
                for arg in args {
                    let s = arg.eval(values);
                    if s == ERROR {
                        return s;
                    }
                    let b = s.eq_ignore_ascii_case("true");
                    all &= b;
                    any |= b;
                }
                match self {
                    Expr::And(_) => boolean_str(all),
                    Expr::Or(_) => boolean_str(any),
                    _ => boolean_str(!all),
                }
            }
        }
    }

    fn collect_parameters(&self, into: &mut Vec<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Value(id) => {
                if !into.contains(id) {
                    into.push(id.clone());
                }
            }
            Expr::Match(input, _) | Expr::Replace(input, _, _) => input.collect_parameters(into),
            Expr::If {
                condition,
                then,
                otherwise,
            } => {
                condition.collect_parameters(into);
                then.collect_parameters(into);
                otherwise.collect_parameters(into);
            }
            Expr::Cat(args)
            | Expr::Strcmp(args)
            | Expr::And(args)
            | Expr::Or(args)
            | Expr::Not(args) => args.iter().for_each(|a| a.collect_parameters(into)),
        }
    }
}

#[derive(Debug)]
struct ParsedFunction {
    expr: Expr,
}
impl Function for ParsedFunction {
    fn parameters(&self) -> Vec<String> {
        let mut parameters = Vec::new();
        self.expr.collect_parameters(&mut parameters);
        parameters
    }
    fn string(&self, values: &dyn Values) -> String {
        self.expr.eval(values)
    }
}

/// Parses the children of `conf` as one function. Several children are
/// concatenated, no children yield the empty string.
pub fn parse_children(conf: &Thingy) -> Result<Arc<dyn Function>> {
    Ok(Arc::new(ParsedFunction {
        expr: children(conf)?,
    }))
}

/// Parses `conf` itself as a function, e.g. the node `CAT(...)`.
pub fn parse(conf: &Thingy) -> Result<Arc<dyn Function>> {
    Ok(Arc::new(ParsedFunction { expr: expr(conf)? }))
}

fn children(conf: &Thingy) -> Result<Expr> {
    let mut exprs = conf.iter().map(expr).collect::<Result<Vec<_>>>()?;
    Ok(match exprs.len() {
        0 => Expr::Literal(String::new()),
        1 => exprs.remove(0),
        _ => Expr::Cat(exprs),
    })
}

fn regex_arg(conf: &Thingy, function: &str) -> Result<Regex> {
    let pattern = conf.last_child()?.to_string();
    // anchored, a MATCH must cover the whole input
    let anchored = if function == "MATCH" {
        format!("^(?:{})$", pattern)
    } else {
        pattern
    };
    Regex::new(&anchored).map_err(|e| {
        WolldbError::config(format!("Invalid regex in {}: {}", function, e))
    })
}

fn expr(conf: &Thingy) -> Result<Expr> {
    if conf.is_leaf() {
        return Ok(Expr::Literal(conf.name().to_string()));
    }
    let args: Vec<&Thingy> = conf.iter().collect();
    let arity = |n: usize| -> Result<()> {
        if args.len() != n {
            return Err(WolldbError::config(format!(
                "{} needs {} arguments, found {}",
                conf.name(),
                n,
                args.len()
            )));
        }
        Ok(())
    };
    let list = || args.iter().map(|a| expr(a)).collect::<Result<Vec<_>>>();
    Ok(match conf.name() {
        "VALUE" => Expr::Value(conf.to_string()),
        "CAT" => Expr::Cat(list()?),
        "MATCH" => {
            arity(2)?;
            Expr::Match(Box::new(expr(args[0])?), regex_arg(conf, "MATCH")?)
        }
        "REPLACE" => {
            arity(3)?;
            Expr::Replace(
                Box::new(expr(args[0])?),
                Regex::new(&args[1].to_string()).map_err(|e| {
                    WolldbError::config(format!("Invalid regex in REPLACE: {}", e))
                })?,
                args[2].to_string(),
            )
        }
        "IF" => {
            let mut condition = None;
            let mut then = Expr::Literal(String::new());
            let mut otherwise = Expr::Literal(String::new());
            for arg in &args {
                match arg.name() {
                    "THEN" if !arg.is_leaf() => then = children(arg)?,
                    "ELSE" if !arg.is_leaf() => otherwise = children(arg)?,
                    _ if condition.is_none() => condition = Some(expr(arg)?),
                    _ => {
                        return Err(WolldbError::config(
                            "IF takes exactly one condition besides THEN and ELSE",
                        ));
                    }
                }
            }
            let condition = condition
                .ok_or_else(|| WolldbError::config("IF without condition"))?;
            Expr::If {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            }
        }
        "STRCMP" => {
            if args.len() < 2 {
                return Err(WolldbError::config("STRCMP needs at least two arguments"));
            }
            Expr::Strcmp(list()?)
        }
        "AND" => Expr::And(list()?),
        "OR" => Expr::Or(list()?),
        "NOT" => Expr::Not(list()?),
        // an anonymous list groups like CAT
        "" => children(conf)?,
        other => {
            return Err(WolldbError::config(format!("Unknown function \"{}\"", other)));
        }
    })
}

// ------------- ColumnTransformer -------------
/// Values of a dataset as seen by a function. `null` reads as an empty string,
/// a column the dataset does not know is not a value at all.
struct DatasetValues<'a>(&'a dyn Dataset);
impl Values for DatasetValues<'_> {
    fn has_value(&self, id: &str) -> bool {
        self.0.get(id).is_ok()
    }
    fn string(&self, id: &str) -> String {
        self.0.get(id).ok().flatten().unwrap_or_default()
    }
}

/// Maps column names to functions computing them.
#[derive(Debug, Clone, Default)]
pub struct ColumnTransformer {
    columns: Vec<(String, Arc<dyn Function>)>,
}
impl ColumnTransformer {
    pub fn new() -> Self {
        Self::default()
    }
    /// Reads every section named `section` below `conf`. Each child of a section
    /// defines one column, a later definition of the same column replaces an
    /// earlier one.
    pub fn from_config(conf: &Thingy, section: &str) -> Result<Self> {
        let mut transformer = Self::new();
        for node in conf.query(section) {
            for column in node {
                transformer.insert(column.name(), parse_children(column)?);
            }
        }
        Ok(transformer)
    }
    pub fn insert(&mut self, column: impl Into<String>, function: Arc<dyn Function>) {
        let column = column.into();
        match self.columns.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = function,
            None => self.columns.push((column, function)),
        }
    }
    pub fn function(&self, column: &str) -> Option<&Arc<dyn Function>> {
        self.columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, f)| f)
    }
    /// The computed column names in definition order.
    pub fn schema(&self) -> Vec<String> {
        self.columns.iter().map(|(c, _)| c.clone()).collect()
    }
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
    /// Wraps every dataset so that computed columns are evaluated on access.
    pub fn transform(transformer: &Arc<Self>, datasets: Vec<DatasetRef>) -> Vec<DatasetRef> {
        datasets
            .into_iter()
            .map(|inner| {
                Arc::new(TransformedDataset {
                    inner,
                    transformer: Arc::clone(transformer),
                }) as DatasetRef
            })
            .collect()
    }
}

#[derive(Debug)]
struct TransformedDataset {
    inner: DatasetRef,
    transformer: Arc<ColumnTransformer>,
}
impl Dataset for TransformedDataset {
    fn key(&self) -> &str {
        self.inner.key()
    }
    fn get(&self, column: &str) -> std::result::Result<Option<String>, ColumnNotFound> {
        match self.transformer.function(column) {
            Some(function) => Ok(Some(function.string(&DatasetValues(self.inner.as_ref())))),
            None => self.inner.get(column),
        }
    }
}
