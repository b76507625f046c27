//! Operator-authored JavaScript transforms applied to each match.
//!
//! Scripts are trusted as much as the operator who wrote them: they run with
//! the interpreter's default globals, bounded only by loop and recursion
//! limits. Any compile or runtime error leaves the match unchanged.
use crate::config::TransformConfig;
use boa_engine::{Context, JsNativeError, JsObject, JsResult, JsString, JsValue};
use log::{debug, warn};

/// Result of applying a transform to one match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    Replace(String),
    Discard,
}

/// A compiled transform bound to one interpreter context.
///
/// The context is not `Send`, so evaluators are built and dropped between
/// suspension points.
pub struct TransformEvaluator {
    context: Context,
    function: Option<JsObject>,
}

impl TransformEvaluator {
    /// Compile `script` as the body of a one-argument function named `match`,
    /// passing matches through unchanged if it does not compile.
    pub fn compile(script: &str, limits: &TransformConfig) -> Self {
        match Self::try_compile(script, limits) {
            Ok(evaluator) => evaluator,
            Err(err) => {
                warn!("Transform script failed to compile, matches pass through unchanged: {err}");
                Self {
                    context: Context::default(),
                    function: None,
                }
            }
        }
    }

    /// Compile `script` through the `Function` constructor, so the body is
    /// parsed on its own and cannot close or escape its wrapper.
    pub fn try_compile(script: &str, limits: &TransformConfig) -> JsResult<Self> {
        let mut context = Context::default();
        context
            .runtime_limits_mut()
            .set_loop_iteration_limit(limits.loop_iteration_limit);
        context
            .runtime_limits_mut()
            .set_recursion_limit(limits.recursion_limit);

        let constructor = context
            .global_object()
            .get(JsString::from("Function"), &mut context)?;
        let constructor = constructor.as_constructor().cloned().ok_or_else(|| {
            JsNativeError::typ().with_message("Function is not a constructor")
        })?;
        let function = constructor.construct(
            &[
                JsValue::from(JsString::from("match")),
                JsValue::from(JsString::from(script)),
            ],
            None,
            &mut context,
        )?;

        Ok(Self {
            context,
            function: Some(function),
        })
    }

    pub fn is_compiled(&self) -> bool {
        self.function.is_some()
    }

    /// Run the transform on `value`.
    ///
    /// `null`/`undefined` discards the match, other values are stringified.
    pub fn apply(&mut self, value: &str) -> TransformOutcome {
        let Some(function) = &self.function else {
            return TransformOutcome::Replace(value.to_string());
        };

        let argument = JsValue::from(JsString::from(value));
        let result = function
            .call(&JsValue::undefined(), &[argument], &mut self.context)
            .and_then(|result| {
                if result.is_null_or_undefined() {
                    Ok(None)
                } else {
                    result
                        .to_string(&mut self.context)
                        .map(|s| Some(s.to_std_string_escaped()))
                }
            });

        match result {
            Ok(Some(transformed)) => TransformOutcome::Replace(transformed),
            Ok(None) => TransformOutcome::Discard,
            Err(err) => {
                debug!("Transform failed, keeping original value: {err}");
                TransformOutcome::Replace(value.to_string())
            }
        }
    }
}

/// One-shot helper: `None` means the match should be discarded.
pub fn apply_transform(value: &str, script: &str, limits: &TransformConfig) -> Option<String> {
    match TransformEvaluator::compile(script, limits).apply(value) {
        TransformOutcome::Replace(transformed) => Some(transformed),
        TransformOutcome::Discard => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> TransformConfig {
        TransformConfig {
            loop_iteration_limit: 10_000,
            recursion_limit: 64,
        }
    }

    #[test]
    fn test_uppercase() {
        assert_eq!(
            apply_transform("example.com", "return match.toUpperCase();", &limits()),
            Some("EXAMPLE.COM".to_string())
        );
    }

    #[test]
    fn test_null_and_undefined_discard() {
        assert_eq!(apply_transform("a", "return null;", &limits()), None);
        assert_eq!(apply_transform("a", "", &limits()), None);
        assert_eq!(
            apply_transform("keep", "if (match.startsWith('k')) return match;", &limits()),
            Some("keep".to_string())
        );
        assert_eq!(
            apply_transform("drop", "if (match.startsWith('k')) return match;", &limits()),
            None
        );
    }

    #[test]
    fn test_non_string_is_stringified() {
        assert_eq!(
            apply_transform("abcd", "return match.length;", &limits()),
            Some("4".to_string())
        );
        assert_eq!(
            apply_transform("a,b", "return match.split(',');", &limits()),
            Some("a,b".to_string())
        );
    }

    #[test]
    fn test_errors_fail_open() {
        let evaluator = TransformEvaluator::compile("return match.(;", &limits());
        assert!(!evaluator.is_compiled());
        assert_eq!(
            apply_transform("orig", "return match.(;", &limits()),
            Some("orig".to_string())
        );
        assert_eq!(
            apply_transform("orig", "throw new Error('nope');", &limits()),
            Some("orig".to_string())
        );
        assert_eq!(
            apply_transform("orig", "while (true) {}", &limits()),
            Some("orig".to_string())
        );
    }

    #[test]
    fn test_body_cannot_close_its_wrapper() {
        assert!(TransformEvaluator::try_compile("}, function () {", &limits()).is_err());
        assert_eq!(
            apply_transform("orig", "}, function () {", &limits()),
            Some("orig".to_string())
        );
        assert_eq!(
            apply_transform("orig", "}); (function () { return 'x';", &limits()),
            Some("orig".to_string())
        );
    }

    #[test]
    fn test_evaluator_is_reusable() {
        let mut evaluator = TransformEvaluator::compile("return match + '!';", &limits());
        assert_eq!(evaluator.apply("a"), TransformOutcome::Replace("a!".into()));
        assert_eq!(evaluator.apply("b"), TransformOutcome::Replace("b!".into()));
    }
}
