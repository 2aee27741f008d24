//! Expression-based selector compiled against the fixed field projection.

use crate::error::SelectorError;
use crate::fields::{MessageFields, FILTERABLE_FIELDS};
use crate::message::Delivery;
use crate::selectors::Selector;
use evalexpr::{
    build_operator_tree, Context, ContextWithMutableVariables, EvalexprError, HashMapContext,
    Node, Value,
};

#[cfg(test)]
#[path = "expression_tests.rs"]
mod tests;

/// Selector evaluating a boolean filter expression per message.
///
/// The expression is compiled once at construction; identifiers are checked
/// against [`FILTERABLE_FIELDS`] so that a reference to an unprojected field
/// (including `body`) fails at setup time with an unknown-name error.
/// A per-message evaluation that does not yield a boolean is a selection
/// failure and aborts the whole operation.
///
/// Headers are addressed by dotted paths (`headers.someField`,
/// `headers.outer.inner`); regex matching uses the built-in
/// `str::regex_matches(field, pattern)` function.
#[derive(Debug)]
pub struct ExpressionSelector {
    program: Node,
    /// Dotted `headers.*` identifiers the expression references; absent ones
    /// are bound to the empty value before each evaluation.
    header_identifiers: Vec<String>,
}

impl ExpressionSelector {
    pub fn new(filter_expr: &str) -> Result<Self, SelectorError> {
        if filter_expr.trim().is_empty() {
            return Err(SelectorError::Compile {
                message: "empty filter expression".to_string(),
            });
        }

        let program = build_operator_tree(filter_expr).map_err(|err| SelectorError::Compile {
            message: err.to_string(),
        })?;

        let mut header_identifiers = Vec::new();
        for identifier in program.iter_variable_identifiers() {
            if identifier.starts_with("headers.") {
                header_identifiers.push(identifier.to_string());
            } else if !FILTERABLE_FIELDS.contains(&identifier) {
                return Err(SelectorError::UnknownName {
                    name: identifier.to_string(),
                });
            }
        }
        header_identifiers.sort();
        header_identifiers.dedup();

        let selector = Self {
            program,
            header_identifiers,
        };

        // An incomplete expression such as `type == ` still parses into a
        // tree, with operators missing arguments; a trial evaluation against
        // empty fields surfaces that now instead of on the first message.
        // Other trial failures (e.g. type mismatches on absent headers) stay
        // per-message, since real messages may carry the right values.
        let ctx = selector.build_context(&MessageFields::default())?;
        if let Err(err) = selector.program.eval_with_context(&ctx) {
            if matches!(
                err,
                EvalexprError::WrongOperatorArgumentAmount { .. }
                    | EvalexprError::WrongFunctionArgumentAmount { .. }
            ) {
                return Err(SelectorError::Compile {
                    message: err.to_string(),
                });
            }
        }

        Ok(selector)
    }

    fn build_context(&self, fields: &MessageFields) -> Result<HashMapContext, SelectorError> {
        let mut ctx = HashMapContext::new();

        let scalars = [
            ("contentType", &fields.content_type),
            ("contentEncoding", &fields.content_encoding),
            ("correlationID", &fields.correlation_id),
            ("replyTo", &fields.reply_to),
            ("expiration", &fields.expiration),
            ("messageID", &fields.message_id),
            ("timestamp", &fields.timestamp),
            ("type", &fields.kind),
            ("userID", &fields.user_id),
            ("appID", &fields.app_id),
            ("exchange", &fields.exchange),
            ("routingKey", &fields.routing_key),
        ];
        for (name, value) in scalars {
            let value = value.clone().unwrap_or_default();
            ctx.set_value(name.to_string(), Value::String(value))?;
        }
        ctx.set_value(
            "deliveryMode".to_string(),
            Value::Int(i64::from(fields.delivery_mode.unwrap_or(0))),
        )?;
        ctx.set_value(
            "priority".to_string(),
            Value::Int(i64::from(fields.priority.unwrap_or(0))),
        )?;
        ctx.set_value(
            "redelivered".to_string(),
            Value::Boolean(fields.redelivered),
        )?;
        ctx.set_value("headers".to_string(), Value::Empty)?;

        flatten_headers("headers", &fields.headers, &mut ctx)?;

        // Referenced headers missing from this message evaluate as empty.
        for identifier in &self.header_identifiers {
            if ctx.get_value(identifier).is_none() {
                ctx.set_value(identifier.clone(), Value::Empty)?;
            }
        }

        Ok(ctx)
    }
}

impl Selector for ExpressionSelector {
    fn is_selected(&self, delivery: &Delivery) -> Result<bool, SelectorError> {
        let fields = MessageFields::from_delivery(delivery);
        let ctx = self.build_context(&fields)?;
        match self.program.eval_with_context(&ctx)? {
            Value::Boolean(selected) => Ok(selected),
            other => Err(SelectorError::NotBoolean {
                found: format!("{other:?}"),
            }),
        }
    }
}

fn flatten_headers(
    prefix: &str,
    headers: &serde_json::Map<String, serde_json::Value>,
    ctx: &mut HashMapContext,
) -> Result<(), SelectorError> {
    for (key, value) in headers {
        let path = format!("{prefix}.{key}");
        match value {
            serde_json::Value::Object(nested) => flatten_headers(&path, nested, ctx)?,
            other => {
                ctx.set_value(path, json_to_expr_value(other))?;
            }
        }
    }
    Ok(())
}

fn json_to_expr_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Empty,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => {
            Value::Tuple(items.iter().map(json_to_expr_value).collect())
        }
        // Nested objects are flattened into dotted paths before we get here;
        // an object inside an array has no addressable path.
        serde_json::Value::Object(_) => Value::Empty,
    }
}
