//! Bidirectional mapping between class names and label ids.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use crate::{Error, Result};

/// Default name of the background class.
pub const BACKGROUND: &str = "background";

/// Maps class names to small integer ids and back.
///
/// When a background class is present it always owns id 0 and the remaining
/// classes follow in insertion order. The same `ClassMap` is expected to be
/// shared (usually through an `Arc`) by every record of an evaluation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ClassMapSpec", into = "ClassMapSpec")]
pub struct ClassMap {
    id2class: Vec<String>,
    class2id: HashMap<String, usize>,
    background: Option<usize>,
}

#[derive(Serialize, Deserialize)]
struct ClassMapSpec {
    classes: Vec<String>,
    background: Option<String>,
}

impl TryFrom<ClassMapSpec> for ClassMap {
    type Error = Error;

    fn try_from(spec: ClassMapSpec) -> Result<Self> {
        ClassMap::new(spec.classes, spec.background.as_deref())
    }
}

impl From<ClassMap> for ClassMapSpec {
    fn from(map: ClassMap) -> Self {
        let background = map.background.map(|id| map.id2class[id].clone());
        let classes = map
            .id2class
            .into_iter()
            .enumerate()
            .filter(|(id, _)| Some(*id) != map.background)
            .map(|(_, name)| name)
            .collect();
        Self { classes, background }
    }
}

impl ClassMap {
    /// Create a new class map.
    ///
    /// # Arguments
    /// * `classes` - Class names, assigned consecutive ids in order
    /// * `background` - Optional background class name, inserted at id 0
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if a class name appears twice.
    pub fn new<I, S>(classes: I, background: Option<&str>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self {
            id2class: Vec::new(),
            class2id: HashMap::new(),
            background: None,
        };

        if let Some(name) = background {
            map.push(name.to_string())?;
            map.background = Some(0);
        }

        for name in classes {
            map.push(name.into())?;
        }

        Ok(map)
    }

    /// Create a class map with the default `"background"` class at id 0.
    pub fn with_background<I, S>(classes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(classes, Some(BACKGROUND))
    }

    fn push(&mut self, name: String) -> Result<usize> {
        if self.class2id.contains_key(&name) {
            return Err(Error::InvalidConfig(format!(
                "duplicate class name '{}' in class map",
                name
            )));
        }
        let id = self.id2class.len();
        self.class2id.insert(name.clone(), id);
        self.id2class.push(name);
        Ok(id)
    }

    /// Add a class name, returning its id. Existing names keep their id.
    pub fn add_name(&mut self, name: &str) -> usize {
        match self.class2id.get(name) {
            Some(&id) => id,
            None => {
                let id = self.id2class.len();
                self.class2id.insert(name.to_string(), id);
                self.id2class.push(name.to_string());
                id
            }
        }
    }

    /// Get the class name for an id.
    pub fn get_by_id(&self, id: usize) -> Option<&str> {
        self.id2class.get(id).map(String::as_str)
    }

    /// Get the id for a class name.
    pub fn get_by_name(&self, name: &str) -> Option<usize> {
        self.class2id.get(name).copied()
    }

    /// Number of classes, background included.
    pub fn num_classes(&self) -> usize {
        self.id2class.len()
    }

    /// Id of the background class, if the map has one.
    pub fn background_id(&self) -> Option<usize> {
        self.background
    }

    /// Whether `id` names a known class.
    pub fn contains_id(&self, id: usize) -> bool {
        id < self.id2class.len()
    }

    /// All label ids in id order.
    pub fn label_ids(&self) -> Vec<usize> {
        (0..self.id2class.len()).collect()
    }

    /// Class names in id order.
    pub fn id_to_class(&self) -> &[String] {
        &self.id2class
    }

    /// `(name, id)` pairs in id order.
    pub fn class_to_id_mapping(&self) -> Vec<(&str, usize)> {
        self.id2class
            .iter()
            .enumerate()
            .map(|(id, name)| (name.as_str(), id))
            .collect()
    }
}
