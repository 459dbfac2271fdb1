//! Module results handed out of the sandbox.

use std::cell::RefCell;
use std::fmt;

use boa_engine::{js_string, Context, JsResult, JsValue};

/// A module's exported value together with the realm it lives in, so it can
/// still be inspected after evaluation finished.
pub struct Value {
    value: JsValue,
    context: RefCell<Context>,
}

impl Value {
    pub(crate) fn new(value: JsValue, context: Context) -> Self {
        Self {
            value,
            context: RefCell::new(context),
        }
    }

    pub fn as_js(&self) -> &JsValue {
        &self.value
    }

    pub fn is_undefined(&self) -> bool {
        self.value.is_undefined()
    }

    /// The value as `JSON.stringify` sees it. Values with no JSON form
    /// (`undefined`, functions, cycles) become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut context = self.context.borrow_mut();
        match stringify(&self.value, &mut context) {
            Ok(Some(text)) => serde_json::from_str(&text).unwrap_or(serde_json::Value::Null),
            Ok(None) | Err(_) => serde_json::Value::Null,
        }
    }

    /// `String(value)`.
    pub fn display(&self) -> String {
        let mut context = self.context.borrow_mut();
        self.value
            .to_string(&mut context)
            .map(|s| s.to_std_string_escaped())
            .unwrap_or_else(|_| self.value.display().to_string())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Value").field(&self.to_json()).finish()
    }
}

fn stringify(value: &JsValue, context: &mut Context) -> JsResult<Option<String>> {
    let global = context.global_object();
    let json = global.get(js_string!("JSON"), context)?;
    let Some(json_object) = json.as_object() else {
        return Ok(None);
    };
    let stringify = json_object.get(js_string!("stringify"), context)?;
    let Some(stringify) = stringify.as_callable() else {
        return Ok(None);
    };
    let text = stringify.call(&json, &[value.clone()], context)?;
    if text.is_undefined() {
        return Ok(None);
    }
    Ok(Some(text.to_string(context)?.to_std_string_escaped()))
}
