//! Abstract model of the bytecode instrumentation layer (SPEC_FULL.md
//! §4.3).
//!
//! There is no real classfile rewriter in this crate: the target runtime's
//! actual bytecode is out of reach from a Rust process. What lives here is
//! the decision logic a rewriter would consult — which methods get which
//! advice, and the operand-stack bookkeeping that keeps a conditional-jump
//! rewrite verifiable — expressed over a generic instruction stream so it
//! can be exercised and tested without a real classfile library.

use crate::probe::class_filter::ClassFilter;

/// One method as seen by the instrumenter, stripped to the properties the
/// decision logic needs.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub class_name: String,
    pub method_name: String,
    pub is_abstract: bool,
    pub is_native: bool,
    pub is_synthetic: bool,
    pub returns_boolean: bool,
}

impl MethodDescriptor {
    #[must_use]
    pub const fn is_instrumentable(&self) -> bool {
        !self.is_abstract && !self.is_native && !self.is_synthetic
    }
}

/// A single instruction in the abstract stream a method body is modeled
/// as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// A line-number directive. `0` or negative is never emitted as a hit.
    LineMarker(i64),
    /// A conditional jump; `operand_count` is 1 for unary comparisons
    /// (null/non-null checks) and 2 for binary ones.
    ConditionalJump { operand_count: u8 },
    /// Any other instruction, carried through unchanged.
    Other,
    /// A `return` of the declared type.
    Return,
}

/// One emitted advice call, in program order, produced by instrumenting a
/// method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advice {
    MethodEntryHit {
        class: String,
        method: String,
    },
    LineHit {
        class: String,
        method: String,
        line: i64,
    },
    BranchDecisionQuery {
        class: String,
        method: String,
        line: i64,
        /// Number of original operands the wrapper must discard before
        /// branching on the decision, preserving stack balance.
        operands_to_discard: u8,
    },
    BooleanReturnOverrideQuery {
        class: String,
        method: String,
    },
}

/// Decides which instrumentation layers to install on a method, per
/// §4.3's "for each loaded class accepted by the Class Filter, install on
/// every non-abstract, non-native, non-synthetic method" rule.
#[must_use]
pub fn plan_method_advice(
    filter: &ClassFilter,
    method: &MethodDescriptor,
    body: &[Instruction],
) -> Vec<Advice> {
    if !filter.is_instrumentable(&method.class_name) || !method.is_instrumentable() {
        return Vec::new();
    }

    let mut advice = Vec::with_capacity(body.len() + 1);
    advice.push(Advice::MethodEntryHit {
        class: method.class_name.clone(),
        method: method.method_name.clone(),
    });

    let mut current_line: i64 = 0;
    for instruction in body {
        match instruction {
            Instruction::LineMarker(line) => {
                current_line = *line;
                if *line > 0 {
                    advice.push(Advice::LineHit {
                        class: method.class_name.clone(),
                        method: method.method_name.clone(),
                        line: *line,
                    });
                }
            }
            Instruction::ConditionalJump { operand_count } => {
                advice.push(Advice::BranchDecisionQuery {
                    class: method.class_name.clone(),
                    method: method.method_name.clone(),
                    line: current_line,
                    operands_to_discard: *operand_count,
                });
            }
            Instruction::Other | Instruction::Return => {}
        }
    }

    if method.returns_boolean {
        advice.push(Advice::BooleanReturnOverrideQuery {
            class: method.class_name.clone(),
            method: method.method_name.clone(),
        });
    }

    advice
}

/// A transform failure for one class. Per §4.3's failure policy this is
/// logged and does not block other classes; callers collect these rather
/// than aborting the whole instrumentation pass.
#[derive(Debug, Clone)]
pub struct TransformError {
    pub class_name: String,
    pub message: String,
}

/// Instruments every method of a class, skipping ones the decision logic
/// rejects, and reporting (rather than propagating) any per-method failure.
pub fn instrument_class(
    filter: &ClassFilter,
    class_name: &str,
    methods: &[(MethodDescriptor, Vec<Instruction>)],
) -> Result<Vec<Advice>, TransformError> {
    if !filter.is_instrumentable(class_name) {
        return Ok(Vec::new());
    }
    let mut all_advice = Vec::new();
    for (method, body) in methods {
        if method.class_name != class_name {
            return Err(TransformError {
                class_name: class_name.to_string(),
                message: format!(
                    "method descriptor for {} does not belong to class {class_name}",
                    method.method_name
                ),
            });
        }
        all_advice.extend(plan_method_advice(filter, method, body));
    }
    Ok(all_advice)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ClassFilter {
        ClassFilter::new(&["com.example.**".to_string()], &[])
    }

    fn method(returns_boolean: bool) -> MethodDescriptor {
        MethodDescriptor {
            class_name: "com.example.Service".to_string(),
            method_name: "doWork".to_string(),
            is_abstract: false,
            is_native: false,
            is_synthetic: false,
            returns_boolean,
        }
    }

    #[test]
    fn method_entry_advice_always_first() {
        let advice = plan_method_advice(&filter(), &method(false), &[]);
        assert_eq!(
            advice[0],
            Advice::MethodEntryHit {
                class: "com.example.Service".to_string(),
                method: "doWork".to_string(),
            }
        );
    }

    #[test]
    fn line_hit_skipped_for_non_positive_line() {
        let body = vec![Instruction::LineMarker(0), Instruction::Other];
        let advice = plan_method_advice(&filter(), &method(false), &body);
        assert_eq!(advice.len(), 1);
    }

    #[test]
    fn conditional_jump_carries_current_line_and_operand_count() {
        let body = vec![
            Instruction::LineMarker(10),
            Instruction::ConditionalJump { operand_count: 2 },
        ];
        let advice = plan_method_advice(&filter(), &method(false), &body);
        assert_eq!(
            advice[2],
            Advice::BranchDecisionQuery {
                class: "com.example.Service".to_string(),
                method: "doWork".to_string(),
                line: 10,
                operands_to_discard: 2,
            }
        );
    }

    #[test]
    fn boolean_return_gets_override_query_appended_last() {
        let advice = plan_method_advice(&filter(), &method(true), &[]);
        assert_eq!(
            advice.last(),
            Some(&Advice::BooleanReturnOverrideQuery {
                class: "com.example.Service".to_string(),
                method: "doWork".to_string(),
            })
        );
    }

    #[test]
    fn non_boolean_return_gets_no_override_query() {
        let advice = plan_method_advice(&filter(), &method(false), &[]);
        assert!(!advice
            .iter()
            .any(|a| matches!(a, Advice::BooleanReturnOverrideQuery { .. })));
    }

    #[test]
    fn abstract_methods_are_skipped() {
        let mut m = method(false);
        m.is_abstract = true;
        let advice = plan_method_advice(&filter(), &m, &[]);
        assert!(advice.is_empty());
    }

    #[test]
    fn excluded_class_yields_no_advice() {
        let m = MethodDescriptor {
            class_name: "com.other.Service".to_string(),
            ..method(false)
        };
        let advice = plan_method_advice(&filter(), &m, &[]);
        assert!(advice.is_empty());
    }

    #[test]
    fn mismatched_class_name_reports_transform_error() {
        let m = method(false);
        let result = instrument_class(&filter(), "com.example.Other", &[(m, vec![])]);
        assert!(result.is_err());
    }
}
