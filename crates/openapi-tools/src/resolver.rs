//! Local `$ref` resolution.
//!
//! `openapiv3` models references as `ReferenceOr<T>` without resolving them. Generation works on
//! the raw JSON form of the document, so every local reference (`#/...`) is a JSON pointer into
//! that value. References into other documents are not followed; schemas keep them as `$ref`.

use crate::error::{OpenApiToolsError, Result};
use openapiv3::ReferenceOr;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy)]
pub struct RefResolver<'a> {
    root: &'a Value,
}

impl<'a> RefResolver<'a> {
    #[must_use]
    pub fn new(root: &'a Value) -> Self {
        Self { root }
    }

    /// Follow a chain of references until an item is reached.
    ///
    /// # Errors
    ///
    /// Returns an error for external or dangling references, cycles, and targets that do not
    /// deserialize as `T`.
    pub fn resolve<T>(&self, item: &ReferenceOr<T>) -> Result<T>
    where
        T: Clone + DeserializeOwned,
    {
        let mut seen: HashSet<String> = HashSet::new();
        let mut cur = item.clone();
        loop {
            match cur {
                ReferenceOr::Item(item) => return Ok(item),
                ReferenceOr::Reference { reference } => {
                    if !seen.insert(reference.clone()) {
                        return Err(OpenApiToolsError::OpenApi(format!(
                            "Cyclic $ref detected while resolving: {reference}"
                        )));
                    }
                    let target = self.lookup(&reference)?;
                    cur = serde_json::from_value(target.clone()).map_err(|e| {
                        OpenApiToolsError::OpenApi(format!(
                            "Referenced value '{reference}' has an unexpected shape: {e}"
                        ))
                    })?;
                }
            }
        }
    }

    /// Look up a local reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference is not local or the pointer does not exist.
    pub fn lookup(&self, reference: &str) -> Result<&'a Value> {
        let Some(pointer) = reference.strip_prefix('#') else {
            return Err(OpenApiToolsError::OpenApi(format!(
                "Unsupported external $ref '{reference}'"
            )));
        };
        if pointer.is_empty() {
            return Ok(self.root);
        }
        self.root.pointer(pointer).ok_or_else(|| {
            OpenApiToolsError::OpenApi(format!("Unresolved $ref '{reference}'"))
        })
    }

    /// Inline every resolvable local `$ref` inside a JSON schema.
    ///
    /// A reference that points back into its own expansion is left as `$ref`, as are external
    /// and dangling references.
    #[must_use]
    pub fn inline_schema(&self, schema: &Value) -> Value {
        let mut stack: Vec<String> = Vec::new();
        self.inline(schema, &mut stack)
    }

    fn inline(&self, value: &Value, stack: &mut Vec<String>) -> Value {
        match value {
            Value::Object(obj) => {
                if let Some(reference) = obj.get("$ref").and_then(Value::as_str)
                    && !stack.iter().any(|r| r == reference)
                    && let Ok(target) = self.lookup(reference)
                {
                    stack.push(reference.to_string());
                    let mut expanded = self.inline(target, stack);
                    stack.pop();
                    // Sibling keywords next to `$ref` (e.g. `description`) override the target.
                    if let Value::Object(out) = &mut expanded {
                        for (k, v) in obj.iter().filter(|(k, _)| k.as_str() != "$ref") {
                            out.insert(k.clone(), self.inline(v, stack));
                        }
                    }
                    return expanded;
                }
                let mut out = Map::with_capacity(obj.len());
                for (k, v) in obj {
                    out.insert(k.clone(), self.inline(v, stack));
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(|v| self.inline(v, stack)).collect()),
            other => other.clone(),
        }
    }
}
