//! Isolated evaluation contexts for CommonJS modules.
//!
//! A [`SandboxContext`] owns one engine realm. Besides the intrinsics,
//! scripts see the globals `module`, `exports` and `require`. Each
//! context's `require` is bound to the [`ModuleHost`] it was created with,
//! so a function defined in one module keeps resolving against that module
//! even when another module calls it.

use std::cell::RefCell;
use std::rc::Rc;

use boa_engine::property::Attribute;
use boa_engine::{
    js_string, Context, JsError, JsNativeError, JsObject, JsResult, JsValue, NativeFunction,
    Script, Source,
};
use tracing::{debug, debug_span, trace};

use crate::error::{HostError, SandboxError};
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

/// Answers `require(specifier)` calls made by sandboxed code.
///
/// A host is captured by script functions for as long as they live, so it
/// must not hold engine values itself.
pub trait ModuleHost {
    fn require(&self, specifier: &str) -> Result<JsValue, HostError>;
}

/// Limits applied to a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxOptions {
    /// Nested script calls allowed before evaluation is aborted.
    pub max_call_depth: usize,
}

impl SandboxOptions {
    pub const DEFAULT_MAX_CALL_DEPTH: usize = 512;
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            max_call_depth: Self::DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// State behind one context's `require` function.
struct RequireBinding {
    host: Rc<dyn ModuleHost>,
    /// Host failure most recently thrown into script code, keyed by the
    /// rendered error it was thrown as.
    failure: RefCell<Option<(String, HostError)>>,
}

impl RequireBinding {
    fn call(&self, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
        let specifier = args
            .first()
            .cloned()
            .unwrap_or_default()
            .to_string(context)?
            .to_std_string_escaped();
        trace!(specifier = %specifier, "require");

        self.host.require(&specifier).map_err(|err| {
            let thrown = JsNativeError::error().with_message(err.to_string());
            *self.failure.borrow_mut() = Some((thrown.to_string(), err));
            thrown.into()
        })
    }

    fn take_failure(&self, rendered: &str) -> Option<HostError> {
        let (thrown, err) = self.failure.borrow_mut().take()?;
        (thrown == rendered).then_some(err)
    }
}

pub struct SandboxContext {
    context: Context,
    require: Rc<RequireBinding>,
    /// Label of the last evaluated code, used for errors raised afterwards
    label: String,
}

impl SandboxContext {
    pub fn new(host: Rc<dyn ModuleHost>, options: SandboxOptions) -> Result<Self, SandboxError> {
        let mut context = Context::default();
        context
            .runtime_limits_mut()
            .set_recursion_limit(options.max_call_depth);

        let binding = Rc::new(RequireBinding {
            host,
            failure: RefCell::new(None),
        });
        let require = {
            let binding = binding.clone();
            // SAFETY: the closure owns an `Rc<RequireBinding>`, which holds
            // no garbage-collected values.
            unsafe {
                NativeFunction::from_closure(move |_this, args, context| {
                    binding.call(args, context)
                })
            }
        };

        let module = JsObject::with_object_proto(context.intrinsics());
        let module_exports = JsObject::with_object_proto(context.intrinsics());
        let exports = JsObject::with_object_proto(context.intrinsics());
        let attribute = Attribute::WRITABLE | Attribute::ENUMERABLE | Attribute::CONFIGURABLE;

        module
            .set(js_string!("exports"), module_exports, true, &mut context)
            .map_err(setup_error)?;
        context
            .register_global_property(js_string!("module"), module, attribute)
            .map_err(setup_error)?;
        context
            .register_global_property(js_string!("exports"), exports, attribute)
            .map_err(setup_error)?;
        context
            .register_global_callable(js_string!("require"), 1, require)
            .map_err(setup_error)?;

        Ok(Self {
            context,
            require: binding,
            label: String::new(),
        })
    }

    /// Parses and runs `code` as a script. `label` names the code in errors
    /// and traces.
    pub fn evaluate(&mut self, label: &str, code: &str) -> Result<(), SandboxError> {
        let _span = debug_span!("evaluate", label = %label).entered();
        self.label = label.to_string();

        let parsed = ensure_sufficient_stack(|| {
            Script::parse(Source::from_bytes(code), None, &mut self.context)
        });
        let script = match parsed {
            Ok(script) => script,
            Err(err) => {
                return Err(SandboxError::Syntax {
                    label: label.to_string(),
                    message: error_message(&err, &mut self.context),
                })
            }
        };

        match ensure_sufficient_stack(|| script.evaluate(&mut self.context)) {
            Ok(_) => {
                debug!("evaluated");
                Ok(())
            }
            Err(err) => Err(self.uncaught(err)),
        }
    }

    /// The module's result: `module.exports` when the script set it to
    /// something with content, the `exports` global otherwise. The two are
    /// never merged.
    pub fn exported_value(&mut self) -> Result<JsValue, SandboxError> {
        match self.read_exports() {
            Ok(value) => Ok(value),
            Err(err) => Err(self.uncaught(err)),
        }
    }

    /// Consumes the context, keeping its realm alive behind the result.
    pub fn into_value(mut self) -> Result<Value, SandboxError> {
        let value = self.exported_value()?;
        Ok(Value::new(value, self.context))
    }

    fn read_exports(&mut self) -> JsResult<JsValue> {
        let context = &mut self.context;
        let global = context.global_object();

        let module = global.get(js_string!("module"), context)?;
        let module_exports = match module.as_object() {
            Some(module) => module.get(js_string!("exports"), context)?,
            None => JsValue::undefined(),
        };
        if has_content(&module_exports, context)? {
            return Ok(module_exports);
        }
        // a script may rebind `exports` itself
        global.get(js_string!("exports"), context)
    }

    fn uncaught(&mut self, err: JsError) -> SandboxError {
        if let Ok(native) = err.try_native(&mut self.context) {
            if let Some(host) = self.require.take_failure(&native.to_string()) {
                debug!(error = %host, "host error escaped");
                return SandboxError::Host(host);
            }
        }
        let message = error_message(&err, &mut self.context);
        debug!(%message, "uncaught exception");
        SandboxError::Uncaught {
            label: self.label.clone(),
            message,
        }
    }
}

/// Primitives and functions always count. Objects count once they have an
/// own enumerable property.
fn has_content(value: &JsValue, context: &mut Context) -> JsResult<bool> {
    let Some(object) = value.as_object() else {
        return Ok(!value.is_undefined());
    };
    if object.is_callable() {
        return Ok(true);
    }

    let constructor = context.intrinsics().constructors().object().constructor();
    let keys = constructor.get(js_string!("keys"), context)?;
    let Some(keys) = keys.as_callable() else {
        return Ok(true);
    };
    let list = keys.call(&JsValue::from(constructor.clone()), &[value.clone()], context)?;
    let length = match list.as_object() {
        Some(list) => list.get(js_string!("length"), context)?.to_number(context)?,
        None => 0.0,
    };
    Ok(length > 0.0)
}

/// `Name: message` for errors, `String(value)` for anything else thrown.
fn error_message(err: &JsError, context: &mut Context) -> String {
    if let Ok(native) = err.try_native(context) {
        return native.to_string();
    }
    err.to_opaque(context)
        .to_string(context)
        .map(|s| s.to_std_string_escaped())
        .unwrap_or_else(|_| err.to_string())
}

fn setup_error(err: JsError) -> SandboxError {
    SandboxError::Setup {
        message: err.to_string(),
    }
}
