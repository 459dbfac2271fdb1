//! End-to-end tests: on-disk projects loaded through `Project` and the
//! `dynscript` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use dynscript_driver::{LoaderError, Project, ScriptState};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    dir
}

fn dynscript(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dynscript"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run dynscript")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// =============================================================================
// Library
// =============================================================================

#[test]
fn test_lazy_execution_through_chain() {
    let dir = project(&[
        (
            "a.ts",
            "import { describe } from './b';\nimport type { Answer } from './c';\nconst c: Answer = require('./c');\nmodule.exports = c;",
        ),
        ("b.ts", "import * as c from './c';\nexport function describe() { return 'c is ' + c; }"),
        ("c.ts", "export type Answer = number;\nmodule.exports = 42;"),
    ]);
    let project = Project::open(dir.path()).unwrap();

    let script = project.prepare("a.ts").unwrap();
    let b = &script.dependencies()[0];
    assert_eq!(b.path().basename(), "b.ts");
    assert!(b.is_transpiled());

    let value = script.execute(project.resolver()).unwrap();
    assert_eq!(value.to_json(), json!(42));
    assert_eq!(b.state(), ScriptState::Unexecuted);
    assert_eq!(script.dependencies()[1].state(), ScriptState::Executed);
}

#[test]
fn test_typescript_project() {
    let dir = project(&[
        ("tsconfig.json", r#"{"compilerOptions": {"target": "ES2020", "module": "CommonJS"}}"#),
        (
            "src/main.ts",
            r#"
import { Stack } from "./stack";
import greet, { Greeting } from "./greet";
import * as math from "./lib/math";

enum Mode { Fast, Careful }

const stack = new Stack<number>();
[3, 4, 5].forEach((n) => stack.push(math.square(n)));

const message: Greeting = greet("sandbox");

export const summary = {
    total: stack.items().reduce((sum, n) => sum + n, 0),
    top: stack.peek(),
    message,
    mode: Mode[Mode.Careful],
};
"#,
        ),
        (
            "src/stack.ts",
            r#"
export class Stack<T> {
    private readonly values: T[] = [];

    push(value: T): void {
        this.values.push(value);
    }

    peek(): T | undefined {
        return this.values[this.values.length - 1];
    }

    items(): readonly T[] {
        return this.values.slice();
    }
}
"#,
        ),
        (
            "src/greet.ts",
            r#"
export interface Greeting { text: string }
export default function greet(name: string): Greeting {
    return { text: `hello, ${name}` };
}
"#,
        ),
        ("src/lib/math/index.ts", "export const square = (n: number): number => n * n;"),
    ]);

    let project = Project::open(dir.path()).unwrap();
    let value = project.run("src/main").unwrap();
    assert_eq!(
        value.to_json(),
        json!({
            "summary": {
                "total": 50,
                "top": 25,
                "message": { "text": "hello, sandbox" },
                "mode": "Careful"
            }
        })
    );
}

#[test]
fn test_export_rules() {
    let dir = project(&[
        ("both.js", "module.exports = { a: 1 };\nexports.b = 2;"),
        ("exports-only.js", "exports.b = 2;"),
        ("rebound.js", "exports = { c: 3 };"),
        ("nothing.js", "var unused = 1;"),
    ]);
    let project = Project::open(dir.path()).unwrap();

    assert_eq!(project.run("both.js").unwrap().to_json(), json!({ "a": 1 }));
    assert_eq!(project.run("exports-only.js").unwrap().to_json(), json!({ "b": 2 }));
    assert_eq!(project.run("rebound.js").unwrap().to_json(), json!({ "c": 3 }));
    assert_eq!(project.run("nothing.js").unwrap().to_json(), json!({}));
}

#[test]
fn test_require_outside_the_graph() {
    let dir = project(&[
        ("main.js", "module.exports = require('./helper');"),
        ("helper.js", "module.exports = 'help';"),
    ]);
    let project = Project::open(dir.path()).unwrap();

    match project.run("main.js") {
        Err(LoaderError::MissingRuntimeDependency { specifier, from }) => {
            assert_eq!(specifier, "./helper");
            assert_eq!(from.absolute_path(), dir.path().join("main.js"));
        }
        other => panic!("expected MissingRuntimeDependency, got {other:?}"),
    }
}

#[test]
fn test_unresolved_import() {
    let dir = project(&[("main.ts", "import { x } from './nowhere';\nexport const y = x;")]);
    let project = Project::open(dir.path()).unwrap();

    let err = project.prepare("main.ts").unwrap_err();
    assert!(matches!(err, LoaderError::UnresolvedDependency { .. }));
    assert_eq!(
        err.to_string(),
        format!(
            "Missing dependency path for module ./nowhere referenced from {}",
            dir.path().join("main.ts").display()
        )
    );
}

#[test]
fn test_packages_from_node_modules() {
    let dir = project(&[
        ("package.json", r#"{"name": "app", "dependencies": {"pad": "1.0.0"}}"#),
        ("node_modules/pad/package.json", r#"{"name": "pad", "main": "lib/pad.js"}"#),
        (
            "node_modules/pad/lib/pad.js",
            "module.exports = function pad(s, n) { return s.padStart(n, '0'); };",
        ),
        (
            "main.ts",
            "import * as pad from 'pad';\nexport const padded = (pad as any)('7', 3);",
        ),
    ]);
    let project = Project::open(dir.path()).unwrap();

    assert_eq!(project.run("main.ts").unwrap().to_json(), json!({ "padded": "007" }));
}

#[test]
fn test_uncaught_exception_in_dependency() {
    let dir = project(&[
        ("main.ts", "import { boom } from './boom';\nexport const x = boom;"),
        ("boom.ts", "export const boom = (null as any).field;"),
    ]);
    let project = Project::open(dir.path()).unwrap();

    match project.run("main.ts") {
        Err(LoaderError::Execution { path, message }) => {
            assert_eq!(path.basename(), "boom.ts");
            assert!(message.starts_with("TypeError: "), "{message}");
        }
        other => panic!("expected Execution, got {other:?}"),
    }
}

#[test]
fn test_runaway_recursion_is_contained() {
    let dir = project(&[
        ("tsconfig.json", r#"{"dynscript": {"maxCallDepth": 32}}"#),
        ("main.js", "function f(n) { return f(n + 1); }\nf(0);"),
    ]);
    let project = Project::open(dir.path()).unwrap();

    match project.run("main.js") {
        Err(LoaderError::Execution { path, .. }) => assert_eq!(path.basename(), "main.js"),
        other => panic!("expected Execution, got {other:?}"),
    }
}

#[test]
fn test_exported_function_resolves_against_its_own_module() {
    let dir = project(&[
        ("main.ts", "import * as b from './lib/b';\nmodule.exports = b.get();"),
        ("lib/b.ts", "import './c';\nexport function get() { return require('./c'); }"),
        ("lib/c.ts", "module.exports = 42;"),
    ]);
    let project = Project::open(dir.path()).unwrap();
    assert_eq!(project.run("main.ts").unwrap().to_json(), json!(42));
}

#[test]
fn test_default_limits_survive_recursion_and_nesting() {
    let nested = format!("exports.v = {}1{};", "(".repeat(3000), ")".repeat(3000));
    let dir = project(&[
        ("recurse.js", "function f(n) { if (n > 0) return f(n - 1); return 0; }\nexports.v = f(80);"),
        ("nested.js", nested.as_str()),
        ("block.ts", "if (true) { import './inner'; }\nexport const ok = true;"),
        ("inner.ts", ""),
    ]);
    let project = Project::open(dir.path()).unwrap();

    assert_eq!(project.run("recurse.js").unwrap().to_json(), json!({ "v": 0 }));
    assert!(matches!(project.run("nested.js"), Err(LoaderError::Parse { .. })));
    assert_eq!(project.run("block.ts").unwrap().to_json(), json!({ "ok": true }));
}

// =============================================================================
// CLI
// =============================================================================

#[test]
fn test_cli_run_prints_json() {
    let dir = project(&[
        ("main.ts", "import { add } from './math';\nexport const sum = add(2, 3);"),
        ("math.ts", "export function add(a: number, b: number): number { return a + b; }"),
    ]);
    let output = dynscript(&["run", "main.ts"], dir.path());

    assert!(output.status.success(), "{}", stderr(&output));
    let printed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(printed, json!({ "sum": 5 }));
}

#[test]
fn test_cli_run_reports_errors() {
    let dir = project(&[("main.ts", "import './missing';")]);
    let output = dynscript(&["run", "main.ts"], dir.path());

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Missing dependency path for module ./missing"));
}

#[test]
fn test_cli_detect_cycles() {
    let dir = project(&[("a.ts", "import './b';"), ("b.ts", "import './a';")]);
    let output = dynscript(&["run", "a.ts", "--detect-cycles"], dir.path());

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Circular dependency detected"));
}

#[test]
fn test_cli_transpile() {
    let dir = project(&[("m.ts", "export const x: number = 1;")]);
    let output = dynscript(&["transpile", "m.ts", "--target", "es2015"], dir.path());

    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "\"use strict\";\nObject.defineProperty(exports, \"__esModule\", { value: true });\nconst x = 1;\nexports.x = x;\n"
    );
}

#[test]
fn test_cli_transpile_parse_error_is_rendered() {
    let dir = project(&[("bad.ts", "let = ;")]);
    let output = dynscript(&["transpile", "bad.ts"], dir.path());

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("E1000"), "{err}");
    assert!(err.contains("bad.ts"), "{err}");
}

#[test]
fn test_cli_deps_and_graph() {
    let dir = project(&[
        ("main.ts", "import './a';\nimport type { T } from './types';"),
        ("a.ts", "import './types';"),
        ("types.ts", "export type T = string;"),
    ]);

    let output = dynscript(&["deps", "main.ts"], dir.path());
    assert!(output.status.success());
    assert_eq!(stdout(&output), "./a\n./types\n");

    let output = dynscript(&["graph", "main.ts"], dir.path());
    assert!(output.status.success(), "{}", stderr(&output));
    let modules: Vec<String> = stdout(&output)
        .lines()
        .filter(|line| !line.starts_with("  "))
        .map(|line| Path::new(line).file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(modules, vec!["types.ts", "a.ts", "main.ts"]);
}

#[test]
fn test_cli_lex_reports_errors() {
    let dir = project(&[("s.ts", "let s = 'open")]);
    let output = dynscript(&["lex", "s.ts"], dir.path());

    assert!(!output.status.success());
    assert!(stdout(&output).contains("Lexer errors found: 1"));
    assert!(stderr(&output).contains("E0001"));
}
