//! Property store shared with the host view layer.
//!
//! Timelines write animated values here; the view reads them when it renders. Targets and
//! properties are plain strings (`"left_panel"`, `"x_percent"`) so choreographies can be
//! declared in JSON.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

pub type SharedStage = Rc<RefCell<Stage>>;

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct Stage {
    values: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStage {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn set(&mut self, target: &str, property: &str, value: f64) {
        match self.values.get_mut(target) {
            Some(props) => {
                props.insert(property.to_owned(), value);
            }
            None => {
                let mut props = BTreeMap::new();
                props.insert(property.to_owned(), value);
                self.values.insert(target.to_owned(), props);
            }
        }
    }

    pub fn get(&self, target: &str, property: &str) -> Option<f64> {
        self.values.get(target)?.get(property).copied()
    }

    /// All animated properties of `target`.
    pub fn target(&self, target: &str) -> Option<&BTreeMap<String, f64>> {
        self.values.get(target)
    }

    /// Forget a target, used when its subtree unmounts.
    pub fn clear_target(&mut self, target: &str) {
        self.values.remove(target);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
