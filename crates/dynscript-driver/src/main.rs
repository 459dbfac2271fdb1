use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use dynscript_lexer::{Lexer, TokenKind};
use dynscript_transpile::{transpile_module, ModuleKind, ScriptTarget, TranspileError, TranspileOptions};
use tracing_subscriber::EnvFilter;

use dynscript_driver::diagnostics::{self, Diagnostic};
use dynscript_driver::{scan, LoaderError, Project, ProjectConfig, ScriptPath};

#[derive(Parser)]
#[command(
    name = "dynscript",
    version,
    about = "Load TypeScript/JavaScript modules and run them in a sandbox",
    long_about = "Resolves an entry module's static imports, transpiles the whole graph\nto CommonJS and executes it in isolated sandbox realms."
)]
struct Cli {
    /// Raise the log level (-v info, -vv debug, -vvv trace). RUST_LOG wins.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare and execute an entry module, printing its exports as JSON
    Run {
        entry: PathBuf,

        /// Project root holding tsconfig.json (defaults to the entry's directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Fail on circular imports before preparing the graph
        #[arg(long)]
        detect_cycles: bool,

        /// Nested script calls allowed before execution is aborted
        #[arg(long)]
        max_call_depth: Option<usize>,
    },

    /// Transpile one file and print the JavaScript
    Transpile {
        file: PathBuf,

        /// ES3, ES5, ES2015 ... ESNext
        #[arg(long)]
        target: Option<ScriptTarget>,

        /// CommonJS, ESNext or None
        #[arg(long)]
        module: Option<ModuleKind>,
    },

    /// Print the import specifiers of one file
    Deps { file: PathBuf },

    /// Print every module reachable from an entry, dependencies first
    Graph {
        entry: PathBuf,

        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Lex a file and show tokens (debug)
    Lex {
        input: PathBuf,

        /// Show token positions
        #[arg(short, long)]
        positions: bool,
    },

    /// Parse a file and show the AST (debug)
    Parse { input: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            entry,
            root,
            detect_cycles,
            max_call_depth,
        } => run_command(entry, root, detect_cycles, max_call_depth),
        Commands::Transpile {
            file,
            target,
            module,
        } => transpile_command(file, target, module),
        Commands::Deps { file } => deps_command(file),
        Commands::Graph { entry, root } => graph_command(entry, root),
        Commands::Lex { input, positions } => lex_command(input, positions),
        Commands::Parse { input } => parse_command(input),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn open_project(entry: &Path, root: Option<PathBuf>) -> Result<(Project, ScriptPath), LoaderError> {
    let entry = ScriptPath::new(entry);
    let root = root.unwrap_or_else(|| entry.dir().to_path_buf());
    Ok((Project::open(root)?, entry))
}

fn run_command(
    entry: PathBuf,
    root: Option<PathBuf>,
    detect_cycles: bool,
    max_call_depth: Option<usize>,
) -> ExitCode {
    let result = open_project(&entry, root).and_then(|(mut project, entry)| {
        let config: &mut ProjectConfig = project.config_mut();
        config.detect_cycles |= detect_cycles;
        if let Some(depth) = max_call_depth {
            config.sandbox.max_call_depth = depth.max(1);
        }
        project.run(entry.absolute_path())
    });

    match result {
        Ok(value) if value.is_undefined() => {
            println!("undefined");
            ExitCode::SUCCESS
        }
        Ok(value) => match serde_json::to_string_pretty(&value.to_json()) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(err) => report_loader_error(&err),
    }
}

fn transpile_command(
    file: PathBuf,
    target: Option<ScriptTarget>,
    module: Option<ModuleKind>,
) -> ExitCode {
    let source = match read_source_file(&file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let path = ScriptPath::new(&file);

    let mut compiler_options = match ProjectConfig::load(path.dir()) {
        Ok(config) => config.compiler_options,
        Err(err) => return report_loader_error(&err),
    };
    if let Some(target) = target {
        compiler_options.target = target;
    }
    if let Some(module) = module {
        compiler_options.module = module;
    }

    let options = TranspileOptions::new(compiler_options).with_module_name(path.basename());
    match transpile_module(&source, &options) {
        Ok(output) => {
            print!("{}", output.code);
            ExitCode::SUCCESS
        }
        Err(TranspileError::Parse { errors, .. }) => {
            print_diagnostics(&diagnostics::parse_diagnostics(&errors), &path.to_string(), &source);
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn deps_command(file: PathBuf) -> ExitCode {
    let source = match read_source_file(&file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let path = ScriptPath::new(&file);

    match scan(&path, &source, ScriptTarget::default()) {
        Ok(specifiers) => {
            for specifier in specifiers {
                println!("{}", specifier);
            }
            ExitCode::SUCCESS
        }
        Err(err) => report_loader_error(&err),
    }
}

fn graph_command(entry: PathBuf, root: Option<PathBuf>) -> ExitCode {
    let result = open_project(&entry, root).and_then(|(project, entry)| {
        let graph = project.graph(entry.absolute_path())?;
        let order = graph.topological_sort()?;
        Ok((graph, order))
    });

    match result {
        Ok((graph, order)) => {
            for path in &order {
                println!("{}", path);
                if let Some(node) = graph.get_module(path) {
                    for (specifier, dependency) in node.specifiers.iter().zip(&node.dependencies) {
                        println!("  {} -> {}", specifier, dependency);
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => report_loader_error(&err),
    }
}

fn lex_command(input: PathBuf, positions: bool) -> ExitCode {
    let source = match read_source_file(&input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filename = input.to_string_lossy().to_string();

    let mut lexer = Lexer::new(&source);
    let tokens = lexer.tokenize();

    println!("Tokens for {}:\n", filename);
    println!("{}", "=".repeat(80));

    for (i, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Eof {
            println!("\n{:4} | {:?}", i, token.kind);
            break;
        }

        if positions {
            println!(
                "{:4} | {:20?} | {:?} | {}..{}",
                i, token.kind, token.value, token.span.start, token.span.end
            );
        } else {
            println!("{:4} | {:20?} | {:?}", i, token.kind, token.value);
        }
    }

    println!("{}", "=".repeat(80));
    println!("\nTotal tokens: {}", tokens.len());

    let errors = diagnostics::lexer_diagnostics(&tokens);
    if !errors.is_empty() {
        println!("\nLexer errors found: {}", errors.len());
        print_diagnostics(&errors, &filename, &source);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn parse_command(input: PathBuf) -> ExitCode {
    let source = match read_source_file(&input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filename = input.to_string_lossy().to_string();

    let tokens = Lexer::new(&source).tokenize();
    let lexer_errors = diagnostics::lexer_diagnostics(&tokens);
    if !lexer_errors.is_empty() {
        print_diagnostics(&lexer_errors, &filename, &source);
        return ExitCode::FAILURE;
    }

    let mut parser = dynscript_parser::Parser::new(tokens);
    match parser.parse_program() {
        Ok(program) => {
            println!("{:#?}", program);
            ExitCode::SUCCESS
        }
        Err(errors) => {
            print_diagnostics(&diagnostics::parse_diagnostics(&errors), &filename, &source);
            ExitCode::FAILURE
        }
    }
}

// Helper functions

fn read_source_file(path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
}

fn print_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    let color = io::stderr().is_terminal();
    eprint!("{}", diagnostics::render(diagnostics, filename, source, color));
}

fn report_loader_error(err: &LoaderError) -> ExitCode {
    match diagnostics::render_loader_error(err, io::stderr().is_terminal()) {
        Some(rendered) => eprint!("{}", rendered),
        None => eprintln!("error: {}", err),
    }
    ExitCode::FAILURE
}
