//! Derived-field evaluator
//!
//! [`compute_derived`] evaluates a single spec against the current values.
//! [`DerivedPlan`] orders every derived field of a form so one pass reaches
//! the fixed point: a field is computed after all derived fields it reads.
//! Fields on a dependency cycle are reported, not evaluated.

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::domain::aggregates::FieldDescriptor;
use crate::domain::value_objects::{DerivedSpec, FieldId};
use crate::expression::{self, EvaluationError, Scope};

/// Compute a derived value from its parents' current values.
///
/// A parent with no current value reads as `null`.
pub fn compute_derived(spec: &DerivedSpec, values: &HashMap<FieldId, Value>) -> Result<Value, EvaluationError> {
    compute_derived_at(spec, values, chrono::Utc::now().date_naive())
}

/// [`compute_derived`] with a fixed date for `today()`
pub fn compute_derived_at(
    spec: &DerivedSpec,
    values: &HashMap<FieldId, Value>,
    today: NaiveDate,
) -> Result<Value, EvaluationError> {
    let bindings: Vec<(&str, &Value)> = spec
        .parents
        .iter()
        .map(|p| (p.as_str(), values.get(p).unwrap_or(&Value::Null)))
        .collect();
    let source = expression::substitute_parents(&spec.expression, &bindings);
    expression::evaluate(&source, &Scope::new(today))?.to_json()
}

/// Evaluation order for the derived fields of one form
#[derive(Debug, Clone, Default)]
pub struct DerivedPlan {
    /// Indices into the field list, parents before children
    order: Vec<usize>,
    /// Fields on a cycle, with the cycle members in form order
    cyclic: Vec<(usize, Vec<FieldId>)>,
    /// Fields naming a parent the form does not contain
    missing: HashMap<usize, FieldId>,
}

impl DerivedPlan {
    pub fn build(fields: &[FieldDescriptor]) -> Self {
        let index: HashMap<&str, usize> = fields.iter().enumerate().map(|(i, f)| (f.id.as_str(), i)).collect();
        let derived: Vec<usize> = (0..fields.len()).filter(|&i| fields[i].is_derived()).collect();

        let mut missing = HashMap::new();
        // derived parents of each derived field
        let mut upstream: HashMap<usize, Vec<usize>> = HashMap::new();
        for &i in &derived {
            let spec = fields[i].derived_spec().map(|s| s.parents.as_slice()).unwrap_or_default();
            let mut parents = Vec::new();
            for parent in spec {
                match index.get(parent.as_str()) {
                    Some(&j) if fields[j].is_derived() => parents.push(j),
                    Some(_) => {}
                    None => {
                        missing.entry(i).or_insert_with(|| parent.clone());
                    }
                }
            }
            upstream.insert(i, parents);
        }

        let reach: HashMap<usize, BTreeSet<usize>> =
            derived.iter().map(|&i| (i, reachable(i, &upstream))).collect();
        let on_cycle = |i: usize| reach[&i].contains(&i);

        let cyclic = derived
            .iter()
            .filter(|&&i| on_cycle(i))
            .map(|&i| {
                let members = derived
                    .iter()
                    .filter(|&&j| reach[&i].contains(&j) && reach[&j].contains(&i))
                    .map(|&j| fields[j].id.clone())
                    .collect();
                (i, members)
            })
            .collect();

        // Kahn over the acyclic remainder, ties broken by form position
        let acyclic: Vec<usize> = derived.iter().copied().filter(|&i| !on_cycle(i)).collect();
        let mut pending: HashMap<usize, usize> = acyclic
            .iter()
            .map(|&i| (i, upstream[&i].iter().filter(|&&j| !on_cycle(j)).count()))
            .collect();
        let mut ready: BTreeSet<usize> = pending.iter().filter(|&(_, &n)| n == 0).map(|(&i, _)| i).collect();
        let mut order = Vec::with_capacity(acyclic.len());
        while let Some(i) = ready.pop_first() {
            order.push(i);
            for &child in &acyclic {
                let edges = upstream[&child].iter().filter(|&&p| p == i).count();
                if edges == 0 {
                    continue;
                }
                if let Some(n) = pending.get_mut(&child) {
                    *n -= edges;
                    if *n == 0 {
                        ready.insert(child);
                    }
                }
            }
        }

        Self { order, cyclic, missing }
    }

    /// Derived field indices in evaluation order; cyclic fields excluded
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty() && self.cyclic.is_empty()
    }

    /// Recompute every derived field in place.
    ///
    /// A failing field keeps its previous value and gets an entry in the
    /// returned map; the others still compute.
    pub fn recompute(
        &self,
        fields: &[FieldDescriptor],
        values: &mut HashMap<FieldId, Value>,
        today: NaiveDate,
    ) -> BTreeMap<FieldId, EvaluationError> {
        let mut errors = BTreeMap::new();

        for (i, members) in &self.cyclic {
            let field = &fields[*i];
            let error = EvaluationError::Cycle {
                field: field.id.to_string(),
                members: members.iter().map(FieldId::to_string).collect(),
            };
            warn!(field = %field.id, %error, "derived field not computed");
            errors.insert(field.id.clone(), error);
        }

        for &i in &self.order {
            let field = &fields[i];
            let Some(spec) = field.derived_spec() else { continue };
            let result = match self.missing.get(&i) {
                Some(parent) => Err(EvaluationError::MissingParent(parent.to_string())),
                None => compute_derived_at(spec, values, today),
            };
            match result {
                Ok(value) => {
                    debug!(field = %field.id, %value, "derived field computed");
                    values.insert(field.id.clone(), value);
                }
                Err(error) => {
                    warn!(field = %field.id, %error, "derived field evaluation failed");
                    errors.insert(field.id.clone(), error);
                }
            }
        }
        errors
    }
}

/// Derived fields reachable from `start` by following parent links
fn reachable(start: usize, upstream: &HashMap<usize, Vec<usize>>) -> BTreeSet<usize> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<usize> = upstream.get(&start).cloned().unwrap_or_default();
    while let Some(node) = stack.pop() {
        if seen.insert(node) {
            if let Some(next) = upstream.get(&node) {
                stack.extend(next.iter().copied());
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::FieldType;
    use serde_json::json;

    fn id(s: &str) -> FieldId {
        FieldId::new(s).unwrap()
    }

    fn input(name: &str) -> FieldDescriptor {
        FieldDescriptor::new(id(name), FieldType::Number)
    }

    fn derived(name: &str, parents: &[&str], expr: &str) -> FieldDescriptor {
        input(name).with_derived(DerivedSpec::new(parents.iter().map(|p| id(p)).collect(), expr))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_sum_of_parents() {
        let spec = DerivedSpec::new(vec![id("a"), id("b")], "a + b");
        let values = HashMap::from([(id("a"), json!(2)), (id("b"), json!(3))]);
        assert_eq!(compute_derived(&spec, &values).unwrap(), json!(5));
    }

    #[test]
    fn test_absent_parent_reads_null() {
        let spec = DerivedSpec::new(vec![id("a")], "a == null ? 'none' : a");
        assert_eq!(compute_derived(&spec, &HashMap::new()).unwrap(), json!("none"));
    }

    #[test]
    fn test_unlisted_identifier_fails() {
        let spec = DerivedSpec::new(vec![id("a")], "a + b");
        let values = HashMap::from([(id("a"), json!(1))]);
        assert_eq!(
            compute_derived(&spec, &values),
            Err(EvaluationError::UnknownIdentifier("b".into()))
        );
    }

    #[test]
    fn test_chained_fields_in_dependency_order() {
        // declared child-first; the plan must still compute `double` before `quad`
        let fields = vec![
            derived("quad", &["double"], "double * 2"),
            derived("double", &["x"], "x * 2"),
            input("x"),
        ];
        let plan = DerivedPlan::build(&fields);
        assert_eq!(plan.order(), &[1, 0]);

        let mut values = HashMap::from([(id("x"), json!(3))]);
        let errors = plan.recompute(&fields, &mut values, today());
        assert!(errors.is_empty());
        assert_eq!(values["double"], json!(6));
        assert_eq!(values["quad"], json!(12));
    }

    #[test]
    fn test_cycle_reported_for_both_fields() {
        let fields = vec![derived("a", &["b"], "b + 1"), derived("b", &["a"], "a + 1")];
        let plan = DerivedPlan::build(&fields);
        assert!(plan.order().is_empty());

        let mut values = HashMap::new();
        let errors = plan.recompute(&fields, &mut values, today());
        assert_eq!(errors.len(), 2);
        for name in ["a", "b"] {
            assert_eq!(
                errors[name],
                EvaluationError::Cycle { field: name.into(), members: vec!["a".into(), "b".into()] }
            );
        }
        assert!(values.is_empty());
    }

    #[test]
    fn test_downstream_of_cycle_still_computes() {
        let fields = vec![
            derived("a", &["b"], "b"),
            derived("b", &["a"], "a"),
            derived("c", &["a", "x"], "x + 1"),
            input("x"),
        ];
        let plan = DerivedPlan::build(&fields);
        let mut values = HashMap::from([(id("x"), json!(1))]);
        let errors = plan.recompute(&fields, &mut values, today());
        assert_eq!(errors.len(), 2);
        assert_eq!(values["c"], json!(2));
    }

    #[test]
    fn test_failures_are_isolated() {
        let fields = vec![
            input("x"),
            derived("broken", &["x"], "x +"),
            derived("ghost", &["nowhere"], "nowhere"),
            derived("fine", &["x"], "x * 10"),
        ];
        let plan = DerivedPlan::build(&fields);
        let mut values = HashMap::from([(id("x"), json!(4)), (id("broken"), json!("old"))]);
        let errors = plan.recompute(&fields, &mut values, today());

        assert!(matches!(errors["broken"], EvaluationError::Parse { .. }));
        assert_eq!(errors["ghost"], EvaluationError::MissingParent("nowhere".into()));
        assert_eq!(values["broken"], json!("old"));
        assert_eq!(values["fine"], json!(40));
    }

    #[test]
    fn test_parent_name_inside_string_stays_literal() {
        let spec = DerivedSpec::new(vec![id("a")], "'a' + a");
        let values = HashMap::from([(id("a"), json!(1))]);
        assert_eq!(compute_derived_at(&spec, &values, today()), Ok(json!("a1")));
    }

    #[test]
    fn test_deep_nesting_fails_only_that_field() {
        let deep = format!("{}x{}", "(".repeat(5000), ")".repeat(5000));
        let fields = vec![input("x"), derived("deep", &["x"], &deep), derived("fine", &["x"], "x + 1")];
        let mut values = HashMap::from([(id("x"), json!(1))]);
        let errors = DerivedPlan::build(&fields).recompute(&fields, &mut values, today());

        assert_eq!(errors.len(), 1);
        assert!(matches!(errors["deep"], EvaluationError::Parse { .. }));
        assert_eq!(values["fine"], json!(2));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let fields = vec![derived("a", &["a"], "a + 1")];
        let errors = DerivedPlan::build(&fields).recompute(&fields, &mut HashMap::new(), today());
        assert!(matches!(errors["a"], EvaluationError::Cycle { .. }));
    }

    #[test]
    fn test_inactive_specs_ignored() {
        let fields = vec![input("x"), derived("blank", &["x"], "  ")];
        assert!(DerivedPlan::build(&fields).is_empty());
    }
}
