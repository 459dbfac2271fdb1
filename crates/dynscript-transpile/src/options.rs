//! Compiler options accepted by the transpiler.
//!
//! Names follow `tsconfig.json` and are matched case-insensitively, so
//! `"es5"`, `"ES5"` and `"Es5"` all select [`ScriptTarget::ES5`].

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::TranspileError;

/// Language level of the emitted JavaScript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum ScriptTarget {
    ES3,
    #[default]
    ES5,
    ES2015,
    ES2016,
    ES2017,
    ES2018,
    ES2019,
    ES2020,
    ES2021,
    ES2022,
    ES2023,
    ESNext,
}

impl ScriptTarget {
    /// Targets without block scoping, arrows or template literals.
    pub fn is_es5_or_lower(self) -> bool {
        self <= ScriptTarget::ES5
    }
}

impl FromStr for ScriptTarget {
    type Err = TranspileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let target = match s.to_ascii_lowercase().as_str() {
            "es3" => ScriptTarget::ES3,
            "es5" => ScriptTarget::ES5,
            "es6" | "es2015" => ScriptTarget::ES2015,
            "es2016" => ScriptTarget::ES2016,
            "es2017" => ScriptTarget::ES2017,
            "es2018" => ScriptTarget::ES2018,
            "es2019" => ScriptTarget::ES2019,
            "es2020" => ScriptTarget::ES2020,
            "es2021" => ScriptTarget::ES2021,
            "es2022" => ScriptTarget::ES2022,
            "es2023" => ScriptTarget::ES2023,
            "esnext" => ScriptTarget::ESNext,
            _ => {
                return Err(TranspileError::UnknownOption {
                    option: "target",
                    value: s.to_string(),
                })
            }
        };
        Ok(target)
    }
}

impl TryFrom<String> for ScriptTarget {
    type Error = TranspileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ScriptTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScriptTarget::ES3 => "ES3",
            ScriptTarget::ES5 => "ES5",
            ScriptTarget::ES2015 => "ES2015",
            ScriptTarget::ES2016 => "ES2016",
            ScriptTarget::ES2017 => "ES2017",
            ScriptTarget::ES2018 => "ES2018",
            ScriptTarget::ES2019 => "ES2019",
            ScriptTarget::ES2020 => "ES2020",
            ScriptTarget::ES2021 => "ES2021",
            ScriptTarget::ES2022 => "ES2022",
            ScriptTarget::ES2023 => "ES2023",
            ScriptTarget::ESNext => "ESNext",
        };
        write!(f, "{}", name)
    }
}

/// Module format of the emitted JavaScript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum ModuleKind {
    /// No module system requested. Import/export syntax is still lowered to
    /// CommonJS so the output stays runnable.
    None,
    #[default]
    CommonJs,
    /// `ES2015`, `ES2020`, `ESNext` and friends: import/export is kept.
    EsModule,
}

impl ModuleKind {
    pub fn lowers_to_commonjs(self) -> bool {
        !matches!(self, ModuleKind::EsModule)
    }
}

impl FromStr for ModuleKind {
    type Err = TranspileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.to_ascii_lowercase().as_str() {
            "none" => ModuleKind::None,
            "commonjs" => ModuleKind::CommonJs,
            "es6" | "es2015" | "es2020" | "es2022" | "esnext" => ModuleKind::EsModule,
            _ => {
                return Err(TranspileError::UnknownOption {
                    option: "module",
                    value: s.to_string(),
                })
            }
        };
        Ok(kind)
    }
}

impl TryFrom<String> for ModuleKind {
    type Error = TranspileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::None => write!(f, "None"),
            ModuleKind::CommonJs => write!(f, "CommonJS"),
            ModuleKind::EsModule => write!(f, "ESNext"),
        }
    }
}

/// The `compilerOptions` subset the transpiler honours. Unknown
/// `tsconfig.json` keys are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerOptions {
    pub target: ScriptTarget,
    pub module: ModuleKind,
}

impl CompilerOptions {
    pub fn new(target: ScriptTarget, module: ModuleKind) -> Self {
        Self { target, module }
    }
}

/// Per-call options for [`crate::transpile_module`].
#[derive(Debug, Clone, Default)]
pub struct TranspileOptions {
    pub compiler_options: CompilerOptions,
    /// Labels the output and trace spans. Never changes the emitted code.
    pub module_name: Option<String>,
}

impl TranspileOptions {
    pub fn new(compiler_options: CompilerOptions) -> Self {
        Self {
            compiler_options,
            module_name: None,
        }
    }

    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_es5_commonjs() {
        let options = CompilerOptions::default();
        assert_eq!(options.target, ScriptTarget::ES5);
        assert_eq!(options.module, ModuleKind::CommonJs);
    }

    #[test]
    fn test_names_are_case_insensitive() {
        assert_eq!("es2017".parse::<ScriptTarget>().unwrap(), ScriptTarget::ES2017);
        assert_eq!("ESNEXT".parse::<ScriptTarget>().unwrap(), ScriptTarget::ESNext);
        assert_eq!("commonjs".parse::<ModuleKind>().unwrap(), ModuleKind::CommonJs);
        assert_eq!("EsNext".parse::<ModuleKind>().unwrap(), ModuleKind::EsModule);
        assert_eq!("None".parse::<ModuleKind>().unwrap(), ModuleKind::None);
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = "es1999".parse::<ScriptTarget>().unwrap_err();
        assert_eq!(err.to_string(), "unknown target 'es1999'");
        assert!("amd".parse::<ModuleKind>().is_err());
    }

    #[test]
    fn test_target_ordering() {
        assert!(ScriptTarget::ES3.is_es5_or_lower());
        assert!(ScriptTarget::ES5.is_es5_or_lower());
        assert!(!ScriptTarget::ES2015.is_es5_or_lower());
        assert!(ScriptTarget::ES2020 < ScriptTarget::ESNext);
    }

    #[test]
    fn test_deserialize_from_tsconfig_section() {
        let options: CompilerOptions = serde_json::from_str(
            r#"{ "target": "es2019", "module": "CommonJS", "strict": true, "outDir": "dist" }"#,
        )
        .unwrap();
        assert_eq!(options, CompilerOptions::new(ScriptTarget::ES2019, ModuleKind::CommonJs));

        let partial: CompilerOptions = serde_json::from_str(r#"{ "module": "esnext" }"#).unwrap();
        assert_eq!(partial.target, ScriptTarget::ES5);
        assert_eq!(partial.module, ModuleKind::EsModule);

        assert!(serde_json::from_str::<CompilerOptions>(r#"{ "target": "ES4" }"#).is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for target in [ScriptTarget::ES3, ScriptTarget::ES2015, ScriptTarget::ESNext] {
            assert_eq!(target.to_string().parse::<ScriptTarget>().unwrap(), target);
        }
        assert_eq!(ModuleKind::CommonJs.to_string(), "CommonJS");
    }
}
