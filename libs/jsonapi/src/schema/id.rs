use std::sync::Arc;

use serde_json::Value;

use super::Getter;
use crate::capability::Model;
use crate::context::Context;
use crate::error::Error;

/// How a resource reads its id and whether clients may supply one.
#[derive(Clone)]
pub struct Id {
    property: String,
    getter: Option<Getter>,
    client_generated: bool,
}

impl Default for Id {
    fn default() -> Self {
        Self {
            property: "id".to_string(),
            getter: None,
            client_generated: false,
        }
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Id")
            .field("property", &self.property)
            .field("client_generated", &self.client_generated)
            .finish_non_exhaustive()
    }
}

impl Id {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.property = property.into();
        self
    }

    pub fn get<F>(mut self, f: F) -> Self
    where
        F: Fn(&Model, &Context<'_>) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.getter = Some(Arc::new(f));
        self
    }

    pub fn client_generated(mut self) -> Self {
        self.client_generated = true;
        self
    }

    pub fn property_name(&self) -> &str {
        &self.property
    }

    pub fn allows_client_ids(&self) -> bool {
        self.client_generated
    }

    /// Ids are strings on the wire; numeric ids are rendered in decimal.
    pub fn read(&self, model: &Model, ctx: &Context<'_>) -> Result<String, Error> {
        let raw = match &self.getter {
            Some(getter) => getter(model, ctx)?,
            None => model.get(&self.property).cloned().unwrap_or(Value::Null),
        };
        match raw {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(Error::internal(format!(
                "model id '{}' must be a string or number, got {other}",
                self.property
            ))),
        }
    }

    /// Store a client-supplied id on a new model.
    pub fn write(&self, model: &mut Model, id: String) -> Result<(), Error> {
        match model {
            Value::Object(map) => {
                map.insert(self.property.clone(), Value::String(id));
                Ok(())
            }
            _ => Err(Error::internal("cannot set id on a non-object model")),
        }
    }
}
