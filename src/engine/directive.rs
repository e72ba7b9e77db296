//! Custom directives
//!
//! A directive handler receives the raw argument text of `@name(args)`
//! together with the scope it appears in, and returns markup that is
//! inserted as-is. Handlers are responsible for escaping what they print.
//!
//! Three directives are registered on every engine:
//!
//! - `@json(expr[, pretty])` prints a value as JSON, safe for `<script>` blocks
//! - `@class({ name: condition, ... })` joins the names whose condition holds
//! - `@date(expr[, 'format'])` formats a date, timestamp or `null` (now)

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::context::Context;
use crate::engine::error::DirectiveError;
use crate::expr::literal::{split_top_level, string_literal};
use crate::expr::Evaluator;
use crate::value::{escape_html, Value};

/// Default `@date` format
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Handler for a custom `@name(args)` directive
pub trait Directive: Send + Sync {
    fn call(&self, args: &DirectiveArgs<'_>) -> Result<String, DirectiveError>;
}

impl<F> Directive for F
where
    F: Fn(&DirectiveArgs<'_>) -> Result<String, DirectiveError> + Send + Sync,
{
    fn call(&self, args: &DirectiveArgs<'_>) -> Result<String, DirectiveError> {
        self(args)
    }
}

/// Arguments of a directive invocation, evaluated on demand
pub struct DirectiveArgs<'a> {
    name: &'a str,
    raw: &'a str,
    ctx: &'a Context<'a>,
    evaluator: &'a Evaluator,
}

impl<'a> DirectiveArgs<'a> {
    pub fn new(name: &'a str, raw: &'a str, ctx: &'a Context<'a>, evaluator: &'a Evaluator) -> Self {
        Self {
            name,
            raw,
            ctx,
            evaluator,
        }
    }

    /// Directive name without the `@`
    pub fn name(&self) -> &str {
        self.name
    }

    /// Argument text between the parentheses
    pub fn raw(&self) -> &str {
        self.raw
    }

    pub fn context(&self) -> &Context<'a> {
        self.ctx
    }

    /// Top-level comma-separated argument texts
    pub fn parts(&self) -> Vec<&'a str> {
        split_top_level(self.raw, ',')
    }

    pub fn len(&self) -> usize {
        self.parts().len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts().is_empty()
    }

    /// Evaluate the argument at `index`; object literals become objects
    pub fn value(&self, index: usize) -> Option<Value> {
        self.parts()
            .get(index)
            .map(|part| self.evaluator.evaluate_value(part, self.ctx))
    }

    /// Evaluate every argument
    pub fn values(&self) -> Vec<Value> {
        self.parts()
            .into_iter()
            .map(|part| self.evaluator.evaluate_value(part, self.ctx))
            .collect()
    }

    /// Evaluate the argument at `index`, failing when it is absent
    pub fn required(&self, index: usize) -> Result<Value, DirectiveError> {
        self.value(index).ok_or_else(|| DirectiveError::MissingArgument {
            directive: self.name.to_string(),
            index,
        })
    }

    /// Argument at `index` as text: a quoted literal verbatim, otherwise the
    /// display form of its value
    pub fn string(&self, index: usize) -> Option<String> {
        let part = *self.parts().get(index)?;
        match string_literal(part) {
            Some(literal) => Some(literal),
            None => Some(self.evaluator.evaluate(part, self.ctx).to_string()),
        }
    }

    /// Evaluate an arbitrary expression in the directive's scope
    pub fn evaluate(&self, expr: &str) -> Value {
        self.evaluator.evaluate(expr, self.ctx)
    }
}

/// `@json(expr[, pretty])`
pub fn json(args: &DirectiveArgs<'_>) -> Result<String, DirectiveError> {
    let value = args.required(0)?.to_json();
    let pretty = args.value(1).is_some_and(|v| v.is_truthy());
    let text = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .map_err(|e| DirectiveError::Failed(e.to_string()))?;

    // Keep the output inert inside HTML and <script> elements
    Ok(text
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\'', "\\u0027"))
}

/// `@class({ active: isActive, 'text-muted': !enabled })`
pub fn class(args: &DirectiveArgs<'_>) -> Result<String, DirectiveError> {
    let classes = match args.required(0)? {
        Value::Object(map) => map
            .into_iter()
            .filter(|(_, on)| on.is_truthy())
            .map(|(name, _)| name)
            .collect::<Vec<_>>(),
        Value::Array(items) => items
            .into_iter()
            .filter(|item| item.is_truthy())
            .map(|item| item.to_string())
            .collect(),
        other => {
            return Err(DirectiveError::InvalidArgument {
                directive: args.name().to_string(),
                message: format!("expected an object, got {}", other),
            })
        }
    };
    Ok(escape_html(&classes.join(" ")))
}

/// `@date(value[, 'format'])`
pub fn date(args: &DirectiveArgs<'_>) -> Result<String, DirectiveError> {
    let value = args.value(0).unwrap_or_default();
    let format = args
        .string(1)
        .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());

    let moment = to_datetime(&value).ok_or_else(|| DirectiveError::InvalidArgument {
        directive: args.name().to_string(),
        message: format!("not a date: {}", value),
    })?;

    let mut out = String::new();
    write!(out, "{}", moment.format(&format)).map_err(|_| DirectiveError::InvalidArgument {
        directive: args.name().to_string(),
        message: format!("invalid date format: {}", format),
    })?;
    Ok(escape_html(&out))
}

/// Interpret a value as a moment in time
///
/// `null` means now, numbers are Unix timestamps in seconds, and strings may
/// be RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`.
fn to_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Null => Some(Utc::now()),
        Value::Number(secs) => DateTime::from_timestamp(*secs as i64, 0),
        Value::String(text) | Value::Safe(text) => {
            let text = text.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
                return Some(dt.and_utc());
            }
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(
        handler: fn(&DirectiveArgs<'_>) -> Result<String, DirectiveError>,
        name: &str,
        raw: &str,
        data: serde_json::Value,
    ) -> Result<String, DirectiveError> {
        let ctx = Context::from_value(Value::from(data));
        let evaluator = Evaluator::new();
        handler(&DirectiveArgs::new(name, raw, &ctx, &evaluator))
    }

    #[test]
    fn test_args_access() {
        let ctx = Context::from_value(Value::from(serde_json::json!({"user": {"name": "Ada"}})));
        let evaluator = Evaluator::new();
        let args = DirectiveArgs::new("greet", "user.name, 'hi, there', { a: 1 }", &ctx, &evaluator);

        assert_eq!(args.len(), 3);
        assert_eq!(args.value(0), Some(Value::from("Ada")));
        assert_eq!(args.string(1), Some("hi, there".to_string()));
        assert_eq!(args.value(2).and_then(|v| v.get("a").cloned()), Some(Value::Number(1.0)));
        assert!(args.value(3).is_none());
        assert!(matches!(
            args.required(5),
            Err(DirectiveError::MissingArgument { index: 5, .. })
        ));
    }

    #[test]
    fn test_json() {
        let out = call(json, "json", "data", serde_json::json!({"data": {"a": [1, 2], "b": "</script>"}}))
            .expect("Should render json");
        assert_eq!(out, r#"{"a":[1,2],"b":"\u003c/script\u003e"}"#);
    }

    #[test]
    fn test_json_requires_argument() {
        assert!(call(json, "json", "", serde_json::json!({})).is_err());
    }

    #[test]
    fn test_class() {
        let out = call(
            class,
            "class",
            "{ btn: true, active: isActive, 'btn-lg': large }",
            serde_json::json!({"isActive": true, "large": false}),
        )
        .expect("Should render class");
        assert_eq!(out, "active btn");
    }

    #[test]
    fn test_class_rejects_scalars() {
        assert!(matches!(
            call(class, "class", "'btn'", serde_json::json!({})),
            Err(DirectiveError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_date_formats() {
        let data = serde_json::json!({"published": "2024-03-09", "stamp": 0});
        assert_eq!(
            call(date, "date", "published, '%d/%m/%Y'", data.clone()).expect("Should format"),
            "09/03/2024"
        );
        assert_eq!(
            call(date, "date", "stamp", data.clone()).expect("Should format"),
            "1970-01-01"
        );
        assert_eq!(
            call(date, "date", "'2024-03-09T10:30:00Z', '%H:%M'", data).expect("Should format"),
            "10:30"
        );
    }

    #[test]
    fn test_date_rejects_garbage() {
        assert!(call(date, "date", "'yesterday-ish'", serde_json::json!({})).is_err());
    }
}
