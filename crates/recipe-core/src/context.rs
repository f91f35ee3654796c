// crates/recipe-core/src/context.rs
use crate::error::ContextError;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// A single variable held by the recipe context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContextValue {
    /// Raw text, e.g. a step output that was not parsed.
    Text(String),
    /// Structured data produced by the output interpreter or seeded by the caller.
    Structured(Value),
    /// Placeholder written by a dry run in place of real output.
    Unparsed { placeholder: String },
}

impl ContextValue {
    pub fn unparsed(placeholder: impl Into<String>) -> Self {
        ContextValue::Unparsed {
            placeholder: placeholder.into(),
        }
    }

    /// Converts a seeded value (recipe defaults, caller overrides) into a context
    /// value. JSON strings become plain text so they behave like step output.
    pub fn from_seed(value: Value) -> Self {
        match value {
            Value::String(text) => ContextValue::Text(text),
            other => ContextValue::Structured(other),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ContextValue::Structured(_))
    }

    /// Human readable description used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ContextValue::Text(_) => "a plain string",
            ContextValue::Structured(value) => json_kind(value),
            ContextValue::Unparsed { .. } => "an unparsed placeholder",
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ContextValue::Text(text) => Value::String(text.clone()),
            ContextValue::Structured(value) => value.clone(),
            ContextValue::Unparsed { placeholder } => Value::String(placeholder.clone()),
        }
    }

    /// Text substituted into templates.
    pub fn render(&self) -> String {
        match self {
            ContextValue::Text(text) => text.clone(),
            ContextValue::Structured(value) => render_json(value),
            ContextValue::Unparsed { placeholder } => placeholder.clone(),
        }
    }
}

impl From<String> for ContextValue {
    fn from(text: String) -> Self {
        ContextValue::Text(text)
    }
}

impl From<&str> for ContextValue {
    fn from(text: &str) -> Self {
        ContextValue::Text(text.to_string())
    }
}

impl From<Value> for ContextValue {
    fn from(value: Value) -> Self {
        ContextValue::Structured(value)
    }
}

/// Strings render without quotes, everything else as compact JSON.
pub fn render_json(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Ordered variable store shared by the steps of one run.
///
/// Values are only ever inserted or overwritten, never removed: the store is
/// seeded once and then written by successful step outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RecipeContext {
    values: IndexMap<String, ContextValue>,
}

impl RecipeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the context for a run: recipe defaults first, caller values
    /// override them.
    pub fn seeded<I>(defaults: &IndexMap<String, Value>, overrides: I) -> Self
    where
        I: IntoIterator<Item = (String, ContextValue)>,
    {
        let mut context = Self::new();
        for (name, value) in defaults {
            context.set(name.clone(), ContextValue::from_seed(value.clone()));
        }
        for (name, value) in overrides {
            context.set(name, value);
        }
        context
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ContextValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ContextValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContextValue)> {
        self.values.iter()
    }

    /// Resolves a dotted path such as `review.findings.0.severity`.
    ///
    /// A missing root, a missing field, or any step into a value that is not
    /// structured is an error. There is no default value.
    pub fn lookup(&self, path: &str) -> Result<Value, ContextError> {
        let mut segments = path.split('.');
        let root = segments.next().unwrap_or_default();
        let value = self
            .values
            .get(root)
            .ok_or_else(|| ContextError::MissingVariable(root.to_string()))?;

        let mut current = match value {
            ContextValue::Structured(structured) => structured,
            other => {
                return match segments.next() {
                    None => Ok(other.to_json()),
                    Some(field) => Err(ContextError::NotStructured {
                        path: root.to_string(),
                        field: field.to_string(),
                        found: other.kind_name(),
                    }),
                }
            }
        };

        let mut walked = root.to_string();
        for field in segments {
            current = match current {
                Value::Object(map) => map.get(field),
                Value::Array(items) => field.parse::<usize>().ok().and_then(|i| items.get(i)),
                scalar => {
                    return Err(ContextError::NotStructured {
                        path: walked,
                        field: field.to_string(),
                        found: json_kind(scalar),
                    })
                }
            }
            .ok_or_else(|| ContextError::MissingField {
                path: walked.clone(),
                field: field.to_string(),
            })?;
            walked.push('.');
            walked.push_str(field);
        }

        Ok(current.clone())
    }
}

impl IntoIterator for RecipeContext {
    type Item = (String, ContextValue);
    type IntoIter = indexmap::map::IntoIter<String, ContextValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl FromIterator<(String, ContextValue)> for RecipeContext {
    fn from_iter<I: IntoIterator<Item = (String, ContextValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
