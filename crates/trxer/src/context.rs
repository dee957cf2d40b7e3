//! Variable scopes used while rendering a report template.

use crate::error::{Result, TrxerError};
use crate::value::Value;
use std::collections::HashMap;
use trxer_template::Location;

pub struct Context {
    root: HashMap<String, Value>,
    local_stack: Vec<HashMap<String, Value>>,
}

impl Context {
    /// Create a context from the root render data, which must be an object
    pub fn new(root_data: Value) -> Result<Self> {
        let Value::Object(root) = root_data else {
            return Err(TrxerError::template(format!(
                "Render data must be an object, got {}",
                root_data.type_name()
            )));
        };
        Ok(Self {
            root,
            local_stack: Vec::new(),
        })
    }

    /// Resolve a dotted path such as `run.times.start`
    pub fn resolve(&self, path: &[String], location: Location) -> Result<&Value> {
        let Some((name, rest)) = path.split_first() else {
            return Err(undefined("<empty path>", location));
        };

        let mut value = self.resolve_name(name, location)?;
        for segment in rest {
            value = match value {
                Value::Object(obj) => obj
                    .get(segment)
                    .ok_or_else(|| undefined(segment, location))?,
                other => {
                    return Err(TrxerError::TemplateCompileError {
                        message: format!(
                            "Cannot access property '{segment}' on {} value",
                            other.type_name()
                        ),
                        location,
                    })
                }
            };
        }
        Ok(value)
    }

    /// Push loop bindings; a binding may not hide a name already in scope
    pub fn push_scope(&mut self, bindings: HashMap<String, Value>, location: Location) -> Result<()> {
        if let Some(name) = bindings.keys().find(|name| self.name_exists(name)) {
            return Err(TrxerError::TemplateCompileError {
                message: format!("Loop variable '{name}' shadows an existing name"),
                location,
            });
        }
        self.local_stack.push(bindings);
        Ok(())
    }

    /// Push partial arguments; these may hide outer names
    pub fn push_include_scope(&mut self, bindings: HashMap<String, Value>) {
        self.local_stack.push(bindings);
    }

    pub fn pop_scope(&mut self) {
        self.local_stack.pop();
    }

    fn resolve_name(&self, name: &str, location: Location) -> Result<&Value> {
        self.local_stack
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.root.get(name))
            .ok_or_else(|| undefined(name, location))
    }

    fn name_exists(&self, name: &str) -> bool {
        self.local_stack.iter().any(|scope| scope.contains_key(name)) || self.root.contains_key(name)
    }
}

fn undefined(name: &str, location: Location) -> TrxerError {
    TrxerError::TemplateCompileError {
        message: format!("Undefined variable '{name}'"),
        location,
    }
}
