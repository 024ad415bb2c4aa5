//! Instance values, goals, schemas and the shared-arena `InstanceStore`.
//!
//! A store is an index view over an arena of instances. Cloning a store
//! copies only the index view: the feature vectors, goals and weights stay
//! shared between all clones, so a value written through one handle is seen
//! through every other. Deep isolation is never provided.
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// One attribute of a structured feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attribute {
    Number(f64),
    Nominal(usize),
    Text(String),
    Missing,
}

impl Attribute {
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Attribute::Number(v) => Some(v),
            Attribute::Nominal(v) => Some(v as f64),
            Attribute::Text(_) | Attribute::Missing => None,
        }
    }
}

/// Feature vector of an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstanceValue {
    Numeric(Vec<f64>),
    Structured(Vec<Attribute>),
}

impl Default for InstanceValue {
    fn default() -> Self {
        InstanceValue::Numeric(Vec::new())
    }
}

impl InstanceValue {
    pub fn len(&self) -> usize {
        match self {
            InstanceValue::Numeric(v) => v.len(),
            InstanceValue::Structured(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric view of attribute `i`, if it has one.
    pub fn get(&self, i: usize) -> Option<f64> {
        match self {
            InstanceValue::Numeric(v) => v.get(i).copied(),
            InstanceValue::Structured(v) => v.get(i).and_then(Attribute::as_f64),
        }
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            InstanceValue::Numeric(v) => Some(v),
            InstanceValue::Structured(_) => None,
        }
    }
}

/// Target of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Goal {
    Class(usize),
    Value(f64),
    /// Structured goal carrying both a class and a value within that class.
    ClassValue { class: usize, value: f64 },
}

impl Goal {
    pub fn class(&self) -> Option<usize> {
        match *self {
            Goal::Class(c) | Goal::ClassValue { class: c, .. } => Some(c),
            Goal::Value(_) => None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match *self {
            Goal::Value(v) | Goal::ClassValue { value: v, .. } => Some(v),
            Goal::Class(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    /// Categorical goal.
    Class,
    /// Continuous goal.
    Value,
}

/// Shape of a dataset as seen by validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub attribute_count: usize,
    /// Which attribute is the goal, when the goal is stored alongside the features.
    pub goal_index: Option<usize>,
    pub goal_kind: GoalKind,
    /// Number of goal classes (or expected clusters for unsupervised data).
    pub num_classes: usize,
    /// Whether instances carry a goal.
    pub supervised: bool,
}

impl Schema {
    pub fn classification(attribute_count: usize, num_classes: usize) -> Self {
        Self {
            attribute_count,
            goal_index: None,
            goal_kind: GoalKind::Class,
            num_classes,
            supervised: true,
        }
    }

    pub fn regression(attribute_count: usize) -> Self {
        Self {
            attribute_count,
            goal_index: None,
            goal_kind: GoalKind::Value,
            num_classes: 0,
            supervised: true,
        }
    }

    /// Data without a goal; `num_clusters` may be 0 when unknown.
    pub fn unsupervised(attribute_count: usize, num_clusters: usize) -> Self {
        Self {
            attribute_count,
            goal_index: None,
            goal_kind: GoalKind::Class,
            num_classes: num_clusters,
            supervised: false,
        }
    }
}

#[derive(Debug, Default)]
struct Arena {
    features: Vec<Rc<InstanceValue>>,
    goals: Vec<Option<Goal>>,
    weights: Vec<f64>,
}

impl Arena {
    fn push(&mut self, value: InstanceValue, goal: Option<Goal>, weight: f64) -> usize {
        self.features.push(Rc::new(value));
        self.goals.push(goal);
        self.weights.push(weight);
        self.features.len() - 1
    }
}

/// In-memory table of instances with random access and index-only reordering.
#[derive(Debug, Clone, Default)]
pub struct InstanceStore {
    arena: Rc<RefCell<Arena>>,
    index: Vec<usize>,
    cursor: Cell<usize>,
}

impl InstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store of numeric instances with unit weights.
    pub fn from_numeric(features: Vec<Vec<f64>>, goals: Vec<Goal>) -> Result<Self> {
        if features.len() != goals.len() {
            return Err(EvalError::configuration(format!(
                "{} feature vectors but {} goals",
                features.len(),
                goals.len()
            )));
        }
        let mut store = Self::new();
        for (x, y) in features.into_iter().zip(goals) {
            store.push(InstanceValue::Numeric(x), Some(y), 1.0)?;
        }
        Ok(store)
    }

    /// Build a store of goal-less numeric instances.
    pub fn from_unlabeled(features: Vec<Vec<f64>>) -> Self {
        let mut store = Self::new();
        {
            let mut arena = store.arena.borrow_mut();
            for x in features {
                let slot = arena.push(InstanceValue::Numeric(x), None, 1.0);
                store.index.push(slot);
            }
        }
        store
    }

    /// Append an instance to the arena and to this view. Returns its position.
    pub fn push(&mut self, value: InstanceValue, goal: Option<Goal>, weight: f64) -> Result<usize> {
        check_weight(weight)?;
        let slot = self.arena.borrow_mut().push(value, goal, weight);
        self.index.push(slot);
        Ok(self.index.len() - 1)
    }

    /// Allocate `n` empty instances and make them the content of this view.
    ///
    /// Other stores sharing the arena keep their own views.
    pub fn make_instances(&mut self, n: usize) {
        let mut arena = self.arena.borrow_mut();
        self.index = (0..n)
            .map(|_| arena.push(InstanceValue::default(), None, 1.0))
            .collect();
        self.cursor.set(0);
    }

    pub fn count(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Arena slots referenced by this view, in order.
    pub fn indices(&self) -> &[usize] {
        &self.index
    }

    fn slot(&self, i: usize) -> Result<usize> {
        self.index
            .get(i)
            .copied()
            .ok_or(EvalError::IndexOutOfRange {
                index: i,
                count: self.index.len(),
            })
    }

    pub fn instance(&self, i: usize) -> Result<Rc<InstanceValue>> {
        let slot = self.slot(i)?;
        Ok(Rc::clone(&self.arena.borrow().features[slot]))
    }

    pub fn set_instance(&self, i: usize, value: InstanceValue) -> Result<()> {
        let slot = self.slot(i)?;
        self.arena.borrow_mut().features[slot] = Rc::new(value);
        Ok(())
    }

    pub fn goal(&self, i: usize) -> Result<Option<Goal>> {
        let slot = self.slot(i)?;
        Ok(self.arena.borrow().goals[slot])
    }

    pub fn set_goal(&self, i: usize, goal: Option<Goal>) -> Result<()> {
        let slot = self.slot(i)?;
        self.arena.borrow_mut().goals[slot] = goal;
        Ok(())
    }

    pub fn weight(&self, i: usize) -> Result<f64> {
        let slot = self.slot(i)?;
        Ok(self.arena.borrow().weights[slot])
    }

    pub fn set_weight(&self, i: usize, weight: f64) -> Result<()> {
        check_weight(weight)?;
        let slot = self.slot(i)?;
        self.arena.borrow_mut().weights[slot] = weight;
        Ok(())
    }

    /// Rebuild the view from positions of the current view, in the given order.
    ///
    /// The result may be smaller than the current view and may repeat
    /// positions. No instance data is copied.
    pub fn reorder(&mut self, positions: &[usize]) -> Result<()> {
        let index = positions
            .iter()
            .map(|&p| self.slot(p))
            .collect::<Result<Vec<_>>>()?;
        self.index = index;
        self.cursor.set(0);
        Ok(())
    }

    /// Circular scan for an instance whose goal has class `class`.
    pub fn index_with_goal_class(&self, class: usize) -> Result<usize> {
        self.scan(|g| g.class() == Some(class))
            .ok_or_else(|| EvalError::NotFound(format!("goal class {}", class)))
    }

    /// Circular scan for an instance whose goal value equals `value`.
    pub fn index_with_goal_value(&self, value: f64) -> Result<usize> {
        self.scan(|g| g.value() == Some(value))
            .ok_or_else(|| EvalError::NotFound(format!("goal value {}", value)))
    }

    pub fn index_with_goal_class_value(&self, class: usize, value: f64) -> Result<usize> {
        self.scan(|g| g.class() == Some(class) && g.value() == Some(value))
            .ok_or_else(|| EvalError::NotFound(format!("goal class {} with value {}", class, value)))
    }

    /// Starts right after the last hit and gives up after one full circuit.
    fn scan<F>(&self, matches: F) -> Option<usize>
    where
        F: Fn(&Goal) -> bool,
    {
        let n = self.index.len();
        if n == 0 {
            return None;
        }
        let arena = self.arena.borrow();
        let start = self.cursor.get();
        for step in 1..=n {
            let pos = (start + step) % n;
            if let Some(goal) = &arena.goals[self.index[pos]] {
                if matches(goal) {
                    self.cursor.set(pos);
                    return Some(pos);
                }
            }
        }
        None
    }

    /// Instance count per goal class; goals outside `0..num_classes` are ignored.
    pub fn class_histogram(&self, num_classes: usize) -> Vec<usize> {
        let arena = self.arena.borrow();
        let mut counts = vec![0; num_classes];
        for &slot in &self.index {
            if let Some(c) = arena.goals[slot].and_then(|g| g.class()) {
                if c < num_classes {
                    counts[c] += 1;
                }
            }
        }
        counts
    }

    /// Distinct goal values among instances of `class`, in first-seen order.
    pub fn distinct_goal_values(&self, class: usize) -> Vec<f64> {
        let arena = self.arena.borrow();
        let mut values: Vec<f64> = Vec::new();
        for &slot in &self.index {
            if let Some(goal) = arena.goals[slot] {
                if goal.class() == Some(class) {
                    if let Some(v) = goal.value() {
                        if !values.contains(&v) {
                            values.push(v);
                        }
                    }
                }
            }
        }
        values
    }

    /// Whether both stores view the same arena.
    pub fn shares_arena_with(&self, other: &InstanceStore) -> bool {
        Rc::ptr_eq(&self.arena, &other.arena)
    }
}

fn check_weight(weight: f64) -> Result<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(EvalError::configuration(format!(
            "instance weight must be finite and non-negative, got {}",
            weight
        )))
    }
}

/// Something that can hand out instances: a plain store, or a sampler drawing
/// batches from one.
pub trait InstanceSource {
    fn store(&self) -> &InstanceStore;

    /// Direct mutable access, for sources that allow reordering in place.
    fn store_mut(&mut self) -> Option<&mut InstanceStore> {
        None
    }

    /// Refresh the instances from wherever they come from.
    fn reload(&mut self) -> Result<()> {
        Ok(())
    }

    /// Index-level copy isolating a validation run's view.
    fn duplicate(&self) -> Result<InstanceStore>;
}

impl InstanceSource for InstanceStore {
    fn store(&self) -> &InstanceStore {
        self
    }

    fn store_mut(&mut self) -> Option<&mut InstanceStore> {
        Some(self)
    }

    fn duplicate(&self) -> Result<InstanceStore> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(n: usize) -> InstanceStore {
        let features = (0..n).map(|i| vec![i as f64]).collect();
        let goals = (0..n).map(|i| Goal::Class(i % 2)).collect();
        InstanceStore::from_numeric(features, goals).unwrap()
    }

    #[test]
    fn clone_shares_values_but_not_order() {
        let store = labeled(4);
        let mut view = store.clone();
        view.reorder(&[3, 1]).unwrap();

        assert_eq!(view.count(), 2);
        assert_eq!(store.count(), 4);
        assert!(view.shares_arena_with(&store));

        view.set_weight(0, 2.5).unwrap();
        assert_eq!(store.weight(3).unwrap(), 2.5);
    }

    #[test]
    fn reorder_rejects_out_of_range() {
        let mut store = labeled(3);
        assert!(matches!(
            store.reorder(&[0, 5]),
            Err(EvalError::IndexOutOfRange { index: 5, count: 3 })
        ));
        assert_eq!(store.count(), 3);
    }

    #[test]
    fn goal_scan_is_circular() {
        let store = labeled(5);
        assert_eq!(store.index_with_goal_class(0).unwrap(), 2);
        assert_eq!(store.index_with_goal_class(0).unwrap(), 4);
        assert_eq!(store.index_with_goal_class(0).unwrap(), 0);
        assert!(matches!(
            store.index_with_goal_class(7),
            Err(EvalError::NotFound(_))
        ));
    }

    #[test]
    fn goal_value_scans() {
        let mut store = InstanceStore::new();
        for goal in [
            Goal::Value(1.0),
            Goal::Value(2.0),
            Goal::ClassValue { class: 1, value: 1.0 },
            Goal::Class(0),
        ] {
            store.push(InstanceValue::default(), Some(goal), 1.0).unwrap();
        }

        assert_eq!(store.index_with_goal_value(1.0).unwrap(), 2);
        assert_eq!(store.index_with_goal_value(1.0).unwrap(), 0);
        assert!(matches!(
            store.index_with_goal_value(5.0),
            Err(EvalError::NotFound(_))
        ));
        assert_eq!(store.index_with_goal_class_value(1, 1.0).unwrap(), 2);
        assert!(store.index_with_goal_class_value(0, 1.0).is_err());
    }

    #[test]
    fn make_instances_allocates_empty_slots() {
        let mut store = labeled(2);
        let original = store.clone();
        store.make_instances(3);
        assert_eq!(store.count(), 3);
        assert!(store.instance(0).unwrap().is_empty());
        assert_eq!(store.goal(2).unwrap(), None);
        assert_eq!(original.count(), 2);
    }

    #[test]
    fn negative_weight_rejected() {
        let store = labeled(1);
        assert!(store.set_weight(0, -1.0).is_err());
        assert!(store.set_weight(0, f64::NAN).is_err());
    }

    #[test]
    fn structured_values_expose_numbers() {
        let v = InstanceValue::Structured(vec![
            Attribute::Number(1.5),
            Attribute::Text("abc".into()),
            Attribute::Nominal(2),
        ]);
        assert_eq!(v.get(0), Some(1.5));
        assert_eq!(v.get(1), None);
        assert_eq!(v.get(2), Some(2.0));
        assert!(v.as_numeric().is_none());
    }
}
