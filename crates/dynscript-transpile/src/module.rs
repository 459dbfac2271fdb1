//! Module syntax: imports, exports and namespaces.
//!
//! With a CommonJS module kind every import becomes a `require` call and
//! every export an assignment on `exports`. Bindings are copied at the point
//! of import, not kept live.

use dynscript_ast::*;

use crate::analysis::{type_only_names, value_references};
use crate::emitter::{member_access, quote_string, Emitter, PREC_ASSIGN};

/// Where `export` declarations in the current body are attached.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ExportTarget {
    /// Module top level, lowered to `exports.x = x;`
    CommonJs,
    /// Module top level, `export` syntax kept
    EsModule,
    /// Inside a namespace IIFE: `NS.x = x;`
    Namespace(String),
}

impl ExportTarget {
    fn object(&self) -> Option<&str> {
        match self {
            ExportTarget::CommonJs => Some("exports"),
            ExportTarget::Namespace(name) => Some(name.as_str()),
            ExportTarget::EsModule => None,
        }
    }
}

/// Name given to anonymous `export default function`/`class` declarations.
const DEFAULT_EXPORT_NAME: &str = "default_1";

impl Emitter<'_> {
    pub(crate) fn emit_program(&mut self, program: &Program) {
        self.value_refs = value_references(program);
        self.type_names = type_only_names(program);

        let target = self.module_target();

        if program.is_module() {
            self.line("\"use strict\";");
            if target == ExportTarget::CommonJs {
                self.line("Object.defineProperty(exports, \"__esModule\", { value: true });");
                self.emit_hoisted_function_exports(program);
            }
        }

        for item in &program.items {
            self.emit_module_item(item, &target);
        }
    }

    fn module_target(&self) -> ExportTarget {
        if self.options.module.lowers_to_commonjs() {
            ExportTarget::CommonJs
        } else {
            ExportTarget::EsModule
        }
    }

    /// Function declarations are hoisted, so their exports are assigned
    /// before any other code runs.
    fn emit_hoisted_function_exports(&mut self, program: &Program) {
        for item in &program.items {
            let ModuleItem::Export(export) = &item.value else {
                continue;
            };
            match export {
                ExportDecl::Decl(decl) => {
                    if let Decl::Function(func) = &decl.value {
                        if let (false, Some(name)) = (decl.value.is_type_only(), &func.name) {
                            let name = &name.value.name;
                            self.line(format!("{} = {};", member_access("exports", name), name));
                        }
                    }
                }
                ExportDecl::DefaultDecl(decl) => {
                    if let Decl::Function(func) = &decl.value {
                        if !decl.value.is_type_only() {
                            let name = func
                                .name
                                .as_ref()
                                .map(|n| n.value.name.as_str())
                                .unwrap_or(DEFAULT_EXPORT_NAME);
                            self.line(format!("exports.default = {};", name));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    pub(crate) fn emit_module_item(&mut self, item: &Node<ModuleItem>, target: &ExportTarget) {
        match &item.value {
            ModuleItem::Stmt(stmt) => self.emit_stmt(stmt),
            ModuleItem::Import(import) => self.emit_import(import, target),
            ModuleItem::Export(export) => self.emit_export(export, target),
        }
    }

    // =========================================================================
    // Imports
    // =========================================================================

    /// Imports inside blocks and function bodies lower like top-level ones.
    pub(crate) fn emit_nested_import(&mut self, import: &ImportDecl) {
        let target = self.module_target();
        self.emit_import(import, &target);
    }

    fn emit_import(&mut self, import: &ImportDecl, target: &ExportTarget) {
        if import.type_only {
            return;
        }
        let kept: Vec<&ImportSpecifier> = import
            .specifiers
            .iter()
            .filter(|s| !matches!(s, ImportSpecifier::Named { type_only: true, .. }))
            .filter(|s| self.value_refs.contains(s.local_name()))
            .collect();
        // Every binding was type-only or unused: the whole import goes
        if !import.specifiers.is_empty() && kept.is_empty() {
            return;
        }

        let source = quote_string(&import.source);
        if *target == ExportTarget::EsModule {
            self.emit_es_import(&kept, &source);
            return;
        }

        let require = format!("require({})", source);
        match kept.as_slice() {
            [] => self.line(format!("{};", require)),
            [ImportSpecifier::Default(local)] => {
                self.line(format!("var {} = {}.default;", local.value, require));
            }
            [ImportSpecifier::Namespace(local)] => {
                self.line(format!("var {} = {};", local.value, require));
            }
            specifiers => {
                // One require per statement, shared by all the bindings
                let holder = match specifiers
                    .iter()
                    .find(|s| matches!(s, ImportSpecifier::Namespace(_)))
                {
                    Some(namespace) => {
                        let name = namespace.local_name().to_string();
                        self.line(format!("var {} = {};", name, require));
                        name
                    }
                    None => {
                        let temp = self.fresh_temp(&temp_base(&import.source));
                        self.line(format!("var {} = {};", temp, require));
                        temp
                    }
                };
                for specifier in specifiers {
                    match specifier {
                        ImportSpecifier::Default(local) => {
                            self.line(format!("var {} = {}.default;", local.value, holder));
                        }
                        ImportSpecifier::Named { imported, .. } => {
                            self.line(format!(
                                "var {} = {};",
                                specifier.local_name(),
                                member_access(&holder, &imported.value.name)
                            ));
                        }
                        ImportSpecifier::Namespace(_) => {}
                    }
                }
            }
        }
    }

    fn emit_es_import(&mut self, specifiers: &[&ImportSpecifier], source: &str) {
        if specifiers.is_empty() {
            self.line(format!("import {};", source));
            return;
        }
        let mut clauses = Vec::new();
        let mut named = Vec::new();
        for specifier in specifiers {
            match specifier {
                ImportSpecifier::Default(local) => clauses.push(local.value.name.clone()),
                ImportSpecifier::Namespace(local) => clauses.push(format!("* as {}", local.value)),
                ImportSpecifier::Named { imported, local, .. } => match local {
                    Some(local) if local.value.name != imported.value.name => {
                        named.push(format!("{} as {}", imported.value, local.value));
                    }
                    _ => named.push(imported.value.name.clone()),
                },
            }
        }
        if !named.is_empty() {
            clauses.push(format!("{{ {} }}", named.join(", ")));
        }
        self.line(format!("import {} from {};", clauses.join(", "), source));
    }

    // =========================================================================
    // Exports
    // =========================================================================

    fn emit_export(&mut self, export: &ExportDecl, target: &ExportTarget) {
        match export {
            ExportDecl::Decl(decl) => self.emit_export_decl(&decl.value, target),
            ExportDecl::Default(expr) => {
                let value = self.expr(expr, PREC_ASSIGN);
                match target.object() {
                    Some(object) => self.line(format!("{}.default = {};", object, value)),
                    None => self.line(format!("export default {};", value)),
                }
            }
            ExportDecl::DefaultDecl(decl) => self.emit_export_default_decl(&decl.value, target),
            ExportDecl::Named {
                specifiers,
                source,
                type_only,
            } => {
                if *type_only {
                    return;
                }
                let kept: Vec<&ExportSpecifier> = specifiers
                    .iter()
                    .filter(|s| !s.type_only)
                    .filter(|s| source.is_some() || !self.type_names.contains(&s.local.value.name))
                    .collect();
                if kept.is_empty() && !specifiers.is_empty() {
                    return;
                }
                self.emit_export_specifiers(&kept, source.as_deref(), target);
            }
            ExportDecl::All {
                source,
                as_name,
                type_only,
            } => {
                if *type_only {
                    return;
                }
                let quoted = quote_string(source);
                let Some(object) = target.object() else {
                    match as_name {
                        Some(name) => self.line(format!("export * as {} from {};", name.value, quoted)),
                        None => self.line(format!("export * from {};", quoted)),
                    }
                    return;
                };
                let object = object.to_string();
                match as_name {
                    Some(name) => self.line(format!(
                        "{} = require({});",
                        member_access(&object, &name.value.name),
                        quoted
                    )),
                    None => {
                        let temp = self.fresh_temp(&temp_base(source));
                        self.line(format!("var {} = require({});", temp, quoted));
                        self.line(format!(
                            "Object.keys({temp}).forEach(function (k) {{ if (k !== \"default\" && !(k in {object})) {object}[k] = {temp}[k]; }});"
                        ));
                    }
                }
            }
        }
    }

    fn emit_export_decl(&mut self, decl: &Decl, target: &ExportTarget) {
        if decl.is_type_only() {
            return;
        }
        let Some(object) = target.object() else {
            let text = self.capture_decl(decl);
            self.line(format!("export {}", text));
            return;
        };
        let object = object.to_string();
        self.emit_decl(decl);
        // Top-level function exports were already assigned up front
        if matches!(decl, Decl::Function(_)) && *target == ExportTarget::CommonJs {
            return;
        }
        for name in decl.bound_names() {
            self.line(format!("{} = {};", member_access(&object, name), name));
        }
    }

    fn emit_export_default_decl(&mut self, decl: &Decl, target: &ExportTarget) {
        if decl.is_type_only() {
            return;
        }
        match (decl, target.object()) {
            (Decl::Function(func), Some(_)) => {
                let name = if func.name.is_some() {
                    None
                } else {
                    Some(DEFAULT_EXPORT_NAME)
                };
                let text = self.function_text(func, name);
                self.line(text);
            }
            (Decl::Class(class), Some(object)) => {
                let object = object.to_string();
                let name = class
                    .name
                    .as_ref()
                    .map(|n| n.value.name.clone())
                    .unwrap_or_else(|| DEFAULT_EXPORT_NAME.to_string());
                let text = self.class_text(class, Some(&name));
                self.line(text);
                self.line(format!("{}.default = {};", object, name));
            }
            (Decl::Function(func), None) => {
                let text = self.function_text(func, None);
                self.line(format!("export default {}", text));
            }
            (Decl::Class(class), None) => {
                let text = self.class_text(class, None);
                self.line(format!("export default {}", text));
            }
            // `export default interface` and friends were erased above
            (other, _) => self.emit_decl(other),
        }
    }

    fn emit_export_specifiers(
        &mut self,
        specifiers: &[&ExportSpecifier],
        source: Option<&str>,
        target: &ExportTarget,
    ) {
        let Some(object) = target.object() else {
            let names: Vec<String> = specifiers
                .iter()
                .map(|s| {
                    if s.exported_name() == s.local.value.name {
                        s.local.value.name.clone()
                    } else {
                        format!("{} as {}", s.local.value, s.exported_name())
                    }
                })
                .collect();
            let clause = if names.is_empty() {
                "{}".to_string()
            } else {
                format!("{{ {} }}", names.join(", "))
            };
            match source {
                Some(source) => self.line(format!("export {} from {};", clause, quote_string(source))),
                None => self.line(format!("export {};", clause)),
            }
            return;
        };
        let object = object.to_string();

        let holder = match source {
            Some(source) => {
                if specifiers.is_empty() {
                    return;
                }
                let temp = self.fresh_temp(&temp_base(source));
                self.line(format!("var {} = require({});", temp, quote_string(source)));
                Some(temp)
            }
            None => None,
        };
        for specifier in specifiers {
            let value = match &holder {
                Some(holder) => member_access(holder, &specifier.local.value.name),
                None => specifier.local.value.name.clone(),
            };
            self.line(format!(
                "{} = {};",
                member_access(&object, specifier.exported_name()),
                value
            ));
        }
    }

    /// A declaration's text with its leading indentation removed.
    fn capture_decl(&mut self, decl: &Decl) -> String {
        let text = self.capture(|e| e.emit_decl(decl));
        text.trim_start().trim_end_matches('\n').to_string()
    }

    // =========================================================================
    // Namespaces
    // =========================================================================

    /// `namespace NS { ... }` becomes an IIFE populating `NS`. `parent` is
    /// the enclosing namespace for dotted names (`namespace A.B {}`).
    pub(crate) fn emit_namespace(&mut self, module: &ModuleDecl, parent: Option<&str>) {
        if module.is_declare || !module.has_runtime_content() {
            return;
        }
        let ModuleName::Ident(ident) = &module.name else {
            return;
        };
        let name = ident.value.name.clone();

        self.line(format!("var {};", name));
        self.line(format!("(function ({}) {{", name));
        self.indented(|e| match &module.body {
            ModuleBody::Block(items) => {
                let target = ExportTarget::Namespace(name.clone());
                for item in items {
                    e.emit_module_item(item, &target);
                }
            }
            ModuleBody::Namespace(inner) => e.emit_namespace(&inner.value, Some(name.as_str())),
            ModuleBody::None => {}
        });
        let argument = match parent {
            Some(parent) => format!(
                "{name} = {parent}.{name} || ({parent}.{name} = {{}})"
            ),
            None => format!("{name} || ({name} = {{}})"),
        };
        self.line(format!("}})({});", argument));
    }
}

/// Base for generated temporaries: the specifier's file stem, reduced to
/// identifier characters. `"./utils/math-helpers.ts"` → `math_helpers`.
fn temp_base(specifier: &str) -> String {
    let last = specifier
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(specifier);
    let stem = match last.rfind('.') {
        Some(dot) if dot > 0 => &last[..dot],
        _ => last,
    };
    let mut base: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if base.is_empty() || base.starts_with(|c: char| c.is_ascii_digit()) {
        base.insert(0, '_');
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_base() {
        assert_eq!(temp_base("./utils"), "utils");
        assert_eq!(temp_base("./utils/math-helpers.ts"), "math_helpers");
        assert_eq!(temp_base("lodash"), "lodash");
        assert_eq!(temp_base("@scope/pkg"), "pkg");
        assert_eq!(temp_base("../"), "_");
        assert_eq!(temp_base("./2d"), "_2d");
    }
}
