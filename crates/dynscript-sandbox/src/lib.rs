//! # dynscript sandbox
//!
//! [`SandboxContext`] runs the CommonJS JavaScript the transpiler produces
//! inside a `boa_engine` realm of its own. Script code sees the intrinsics
//! and the module globals, nothing from the host process.
//!
//! ```text
//! code ──Script::parse──► evaluate ──► module.exports / exports
//!                            │
//!                     require(specifier)
//!                            ▼
//!                        ModuleHost
//! ```
//!
//! Engine values are garbage collected per thread; a context and every
//! value taken out of it stay on the thread that created them.

mod context;
mod error;
mod stack;
mod value;

pub use boa_engine::JsValue;
pub use context::{ModuleHost, SandboxContext, SandboxOptions};
pub use error::{HostError, SandboxError};
pub use value::Value;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use boa_engine::js_string;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::rc::Rc;

    /// Knows two modules and fails every other specifier the way the
    /// driver does.
    struct StubHost;

    impl ModuleHost for StubHost {
        fn require(&self, specifier: &str) -> Result<JsValue, HostError> {
            match specifier {
                "answer" => Ok(JsValue::new(42)),
                "greeting" => Ok(JsValue::from(js_string!("hello"))),
                other => Err(format!("no path found for module {}", other).into()),
            }
        }
    }

    fn context(max_call_depth: usize) -> SandboxContext {
        SandboxContext::new(Rc::new(StubHost), SandboxOptions { max_call_depth }).unwrap()
    }

    fn run(code: &str) -> serde_json::Value {
        let mut ctx = context(SandboxOptions::DEFAULT_MAX_CALL_DEPTH);
        if let Err(err) = ctx.evaluate("test.js", code) {
            panic!("evaluation failed: {}", err);
        }
        ctx.into_value().unwrap().to_json()
    }

    fn run_err(code: &str) -> SandboxError {
        let mut ctx = context(SandboxOptions::DEFAULT_MAX_CALL_DEPTH);
        match ctx.evaluate("test.js", code) {
            Ok(()) => panic!("expected evaluation to fail"),
            Err(err) => err,
        }
    }

    #[test]
    fn test_module_exports_wins_over_exports() {
        assert_eq!(
            run("module.exports = { a: 1 }; exports.b = 2;"),
            json!({ "a": 1 })
        );
    }

    #[test]
    fn test_exports_container_when_module_exports_untouched() {
        assert_eq!(run("exports.b = 2;"), json!({ "b": 2 }));
        assert_eq!(run(""), json!({}));
    }

    #[test]
    fn test_primitive_and_function_module_exports_count_as_set() {
        assert_eq!(run("module.exports = 42;"), json!(42));
        assert_eq!(run("module.exports = 'text';"), json!("text"));

        let mut ctx = context(SandboxOptions::DEFAULT_MAX_CALL_DEPTH);
        ctx.evaluate("fn.js", "module.exports = function () {}; exports.x = 1;")
            .unwrap();
        assert!(ctx.exported_value().unwrap().is_callable());
    }

    #[test]
    fn test_empty_module_exports_falls_back() {
        assert_eq!(run("module.exports = {}; exports.x = 1;"), json!({ "x": 1 }));
    }

    #[test]
    fn test_rebinding_exports() {
        assert_eq!(run("exports = { rebound: true };"), json!({ "rebound": true }));
    }

    #[test]
    fn test_transpiled_prologue_keeps_exports() {
        let code = "\"use strict\";\nObject.defineProperty(exports, \"__esModule\", { value: true });\nexports.x = 1;\n";
        assert_eq!(run(code), json!({ "x": 1 }));
    }

    #[test]
    fn test_require_goes_through_host() {
        assert_eq!(
            run("const a = require('answer'); module.exports = { a, g: require('greeting') };"),
            json!({ "a": 42, "g": "hello" })
        );
    }

    #[test]
    fn test_host_error_escapes_unchanged() {
        match run_err("const x = require('missing');") {
            SandboxError::Host(inner) => {
                assert_eq!(inner.to_string(), "no path found for module missing");
            }
            other => panic!("expected host error, got {}", other),
        }
    }

    #[test]
    fn test_host_error_is_catchable() {
        let code = r#"
            try {
                require("missing");
            } catch (e) {
                exports.message = e.message;
                exports.isError = e instanceof Error;
            }
        "#;
        assert_eq!(
            run(code),
            json!({ "message": "no path found for module missing", "isError": true })
        );
    }

    #[test]
    fn test_uncaught_exception_message() {
        match run_err("throw new TypeError('bad input');") {
            SandboxError::Uncaught { label, message } => {
                assert_eq!(label, "test.js");
                assert_eq!(message, "TypeError: bad input");
            }
            other => panic!("expected uncaught exception, got {}", other),
        }

        match run_err("const o = undefined;\no.foo;") {
            SandboxError::Uncaught { message, .. } => assert!(message.starts_with("TypeError")),
            other => panic!("expected uncaught exception, got {}", other),
        }

        match run_err("throw 'plain';") {
            SandboxError::Uncaught { message, .. } => assert_eq!(message, "plain"),
            other => panic!("expected uncaught exception, got {}", other),
        }
    }

    #[test]
    fn test_recursion_within_default_limit() {
        let code = r#"
            function f(n) { if (n > 0) return f(n - 1); return 0; }
            exports.shallow = f(80);
            exports.deep = f(400);
        "#;
        assert_eq!(run(code), json!({ "shallow": 0, "deep": 0 }));
    }

    #[test]
    fn test_recursion_through_native_callbacks() {
        let code = r#"
            function g(n) { return n > 0 ? [n - 1].map(g)[0] + 1 : 0; }
            exports.v = g(200);
        "#;
        assert_eq!(run(code), json!({ "v": 200 }));
    }

    #[test]
    fn test_runaway_recursion_is_uncaught() {
        let err = run_err("function f(n) { return f(n + 1); }\nf(0);");
        assert!(matches!(err, SandboxError::Uncaught { .. }), "got {}", err);

        let mut ctx = context(16);
        let err = ctx
            .evaluate("shallow.js", "function f(n) { return n > 0 ? f(n - 1) : 0; }\nf(64);")
            .unwrap_err();
        assert!(matches!(err, SandboxError::Uncaught { .. }), "got {}", err);
    }

    #[test]
    fn test_deeply_nested_code_does_not_overflow() {
        let depth = 1000;
        let code = format!("exports.v = {}1{};", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(run(&code), json!({ "v": 1 }));
    }

    #[test]
    fn test_module_syntax_is_a_syntax_error() {
        assert!(matches!(
            run_err("export const x = 1;"),
            SandboxError::Syntax { .. }
        ));
        assert!(matches!(
            run_err("import x from './x';"),
            SandboxError::Syntax { .. }
        ));
    }

    #[test]
    fn test_syntax_error() {
        match run_err("const = 5;") {
            SandboxError::Syntax { label, message } => {
                assert_eq!(label, "test.js");
                assert!(message.starts_with("SyntaxError"));
            }
            other => panic!("expected syntax error, got {}", other),
        }
    }

    #[test]
    fn test_no_ambient_capabilities() {
        let code = r#"
            exports.console = typeof console;
            exports.process = typeof process;
            exports.globalRequire = typeof globalThis.process;
            exports.require = typeof require;
            exports.module = typeof module;
        "#;
        assert_eq!(
            run(code),
            json!({
                "console": "undefined",
                "process": "undefined",
                "globalRequire": "undefined",
                "require": "function",
                "module": "object"
            })
        );
    }

    #[test]
    fn test_language_features() {
        let code = r#"
            class Animal {
                constructor(name) { this.name = name; }
                speak() { return this.name + " makes a sound"; }
            }
            class Dog extends Animal {
                speak() { return super.speak() + " (woof)"; }
            }
            const { a, ...rest } = { a: 1, b: 2 };
            function* count() { yield 1; yield 2; }
            module.exports = {
                speech: new Dog("Rex").speak(),
                rest,
                generated: [...count()],
                boxed: typeof new String("x"),
                sorted: [3, 1, 2].sort((x, y) => x - y),
            };
        "#;
        assert_eq!(
            run(code),
            json!({
                "speech": "Rex makes a sound (woof)",
                "rest": { "b": 2 },
                "generated": [1, 2],
                "boxed": "object",
                "sorted": [1, 2, 3]
            })
        );
    }

    #[test]
    fn test_contexts_are_isolated() {
        let mut first = context(SandboxOptions::DEFAULT_MAX_CALL_DEPTH);
        first
            .evaluate("a.js", "Array.prototype.extra = 1; var shared = 1;")
            .unwrap();
        let mut second = context(SandboxOptions::DEFAULT_MAX_CALL_DEPTH);
        second
            .evaluate("b.js", "exports.extra = typeof [].extra; exports.shared = typeof shared;")
            .unwrap();
        assert_eq!(
            second.into_value().unwrap().to_json(),
            json!({ "extra": "undefined", "shared": "undefined" })
        );

        first.evaluate("a2.js", "exports.shared = shared;").unwrap();
        assert_eq!(first.into_value().unwrap().to_json(), json!({ "shared": 1 }));
    }

    #[test]
    fn test_value_debug_and_display() {
        let mut ctx = context(SandboxOptions::DEFAULT_MAX_CALL_DEPTH);
        ctx.evaluate("v.js", "module.exports = [1, 'two'];").unwrap();
        let value = ctx.into_value().unwrap();
        assert_eq!(value.to_json(), json!([1, "two"]));
        assert!(format!("{:?}", value).starts_with("Value("));
        assert_eq!(value.display(), "1,two");
        assert!(!value.is_undefined());
    }
}
