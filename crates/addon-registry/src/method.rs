//! Method chains and dispatch.
//!
//! Each model method is a stack of implementations, one per contribution that
//! provided it, with the declaring module at the bottom. A call runs the top
//! implementation, which receives a [`Super`] handle for the rest of the
//! stack and decides whether to delegate.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::MethodError;

/// Body of a method implementation.
pub type MethodBody =
    Arc<dyn Fn(&CallContext, Super<'_>, &[Value]) -> Result<Value, MethodError> + Send + Sync>;

/// Request-scoped values passed into every model operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CallContext {
    pub user: String,
    pub company: Option<String>,
    pub lang: String,
    pub values: BTreeMap<String, Value>,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new("__system__")
    }
}

impl CallContext {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            company: None,
            lang: "en_US".to_string(),
            values: BTreeMap::new(),
        }
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// A method body as contributed by a module.
#[derive(Clone)]
pub struct MethodDef {
    pub name: String,
    pub body: MethodBody,
}

impl MethodDef {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&CallContext, Super<'_>, &[Value]) -> Result<Value, MethodError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Arc::new(body),
        }
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef").field("name", &self.name).finish_non_exhaustive()
    }
}

/// One layer of a chain: the module that provided it and its body.
#[derive(Clone)]
pub struct MethodImpl {
    pub module: String,
    pub body: MethodBody,
}

impl fmt::Debug for MethodImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodImpl").field("module", &self.module).finish_non_exhaustive()
    }
}

/// Layers compare by providing module; bodies are opaque.
impl PartialEq for MethodImpl {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module
    }
}

/// Implementations of one method, bottom (declaration) first.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodChain {
    model: String,
    method: String,
    layers: Vec<MethodImpl>,
}

impl MethodChain {
    pub fn new(model: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            method: method.into(),
            layers: Vec::new(),
        }
    }

    pub fn push(&mut self, module: impl Into<String>, body: MethodBody) {
        self.layers.push(MethodImpl {
            module: module.into(),
            body,
        });
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.method
    }

    /// Providing modules, bottom first.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|layer| layer.module.as_str())
    }

    /// Run the most recent implementation.
    pub fn call(&self, ctx: &CallContext, args: &[Value]) -> Result<Value, MethodError> {
        self.handle(self.layers.len()).call(ctx, args)
    }

    fn handle(&self, depth: usize) -> Super<'_> {
        Super {
            model: &self.model,
            method: &self.method,
            below: &self.layers[..depth],
        }
    }
}

/// Access to the implementations below the running one.
#[derive(Clone, Copy)]
pub struct Super<'a> {
    model: &'a str,
    method: &'a str,
    below: &'a [MethodImpl],
}

impl<'a> Super<'a> {
    /// Invoke the next implementation down the chain.
    ///
    /// # Errors
    ///
    /// `MethodError::NoSuper` when called from the bottom of the chain.
    pub fn call(self, ctx: &CallContext, args: &[Value]) -> Result<Value, MethodError> {
        let Some((top, rest)) = self.below.split_last() else {
            return Err(MethodError::NoSuper {
                model: self.model.to_string(),
                method: self.method.to_string(),
            });
        };
        let next = Super { below: rest, ..self };
        (top.body)(ctx, next, args)
    }

    /// Whether there is an implementation to delegate to.
    pub fn exists(&self) -> bool {
        !self.below.is_empty()
    }

    /// Module providing the next implementation down.
    pub fn module(&self) -> Option<&'a str> {
        self.below.last().map(|layer| layer.module.as_str())
    }

    pub fn model(&self) -> &'a str {
        self.model
    }

    pub fn method(&self) -> &'a str {
        self.method
    }
}

impl fmt::Debug for Super<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Super")
            .field("model", &self.model)
            .field("method", &self.method)
            .field("depth", &self.below.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body<F>(f: F) -> MethodBody
    where
        F: Fn(&CallContext, Super<'_>, &[Value]) -> Result<Value, MethodError> + Send + Sync + 'static,
    {
        Arc::new(f)
    }

    #[test]
    fn calls_top_first_and_delegates_down() {
        let mut chain = MethodChain::new("partner", "display");
        chain.push("base", body(|_, _, _| Ok(json!(["base"]))));
        chain.push(
            "extra",
            body(|ctx, sup, args| {
                let mut below = sup.call(ctx, args)?;
                if let Value::Array(items) = &mut below {
                    items.push(json!("extra"));
                }
                Ok(below)
            }),
        );

        let result = chain.call(&CallContext::default(), &[]).unwrap();
        assert_eq!(result, json!(["base", "extra"]));
        assert_eq!(chain.modules().collect::<Vec<_>>(), vec!["base", "extra"]);
    }

    #[test]
    fn super_at_bottom_is_an_error() {
        let mut chain = MethodChain::new("partner", "write");
        chain.push("base", body(|ctx, sup, args| sup.call(ctx, args)));

        let err = chain.call(&CallContext::default(), &[]).unwrap_err();
        assert!(matches!(
            err,
            MethodError::NoSuper { ref model, ref method } if model == "partner" && method == "write"
        ));
    }

    #[test]
    fn context_reaches_every_layer() {
        let mut chain = MethodChain::new("partner", "whoami");
        chain.push("base", body(|ctx, _, _| Ok(json!(ctx.user))));
        chain.push(
            "l10n",
            body(|ctx, sup, args| {
                let user = sup.call(ctx, args)?;
                Ok(json!(format!("{}@{}", user.as_str().unwrap_or_default(), ctx.lang)))
            }),
        );

        let ctx = CallContext::new("alice").with_lang("fr_BE");
        assert_eq!(chain.call(&ctx, &[]).unwrap(), json!("alice@fr_BE"));
    }
}
