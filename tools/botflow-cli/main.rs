use botflow::artifact::ScriptArtifact;
use botflow::compiler::{Compiler, NodeRegistry};
use botflow::graph::{GraphStore, Rehydrated};
use clap::{Parser, Subcommand};
use std::fs;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Compiles chatbot automation graphs into runtime scripts
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Map a foreign kind tag onto a built-in kind, as `user=builtin`
    #[arg(long = "alias", value_name = "USER=BUILTIN", global = true)]
    aliases: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate and compile a graph into a script
    Compile {
        /// Path to the graph JSON file
        graph_path: String,
        /// Write the script here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
        /// Also write a bincode script artifact
        #[arg(long)]
        artifact: Option<String>,
        /// Prefix every step with a comment carrying its label
        #[arg(long)]
        comments: bool,
    },
    /// Check a graph for structural and configuration errors
    Validate {
        /// Path to the graph JSON file
        graph_path: String,
    },
    /// Rehydrate a graph and print its canonical JSON form
    Normalize {
        /// Path to the graph JSON file
        graph_path: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let registry = Arc::new(build_registry(&cli.aliases));
    match cli.command {
        Command::Compile {
            graph_path,
            output,
            artifact,
            comments,
        } => run_compile(&graph_path, output, artifact, comments, registry),
        Command::Validate { graph_path } => run_validate(&graph_path, registry),
        Command::Normalize { graph_path } => run_normalize(&graph_path, registry),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_registry(aliases: &[String]) -> NodeRegistry {
    aliases
        .iter()
        .fold(NodeRegistry::builder(), |builder, alias| {
            match alias.split_once('=') {
                Some((user, builtin)) => builder.with_kind_alias(user.trim(), builtin.trim()),
                None => exit_with_error(&format!("Invalid alias '{}', expected USER=BUILTIN", alias)),
            }
        })
        .build()
}

fn load(graph_path: &str, registry: Arc<NodeRegistry>) -> Rehydrated {
    let json = fs::read_to_string(graph_path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read graph file '{}': {}", graph_path, e))
    });
    let rehydrated = GraphStore::from_json(&json, registry)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load graph: {}", e)));
    for problem in &rehydrated.unbound {
        eprintln!("  warning: {}", problem);
    }
    rehydrated
}

fn run_compile(
    graph_path: &str,
    output: Option<String>,
    artifact_path: Option<String>,
    comments: bool,
    registry: Arc<NodeRegistry>,
) {
    let start = Instant::now();
    let Rehydrated { store, .. } = load(graph_path, registry.clone());

    let compiled = Compiler::builder(store.snapshot())
        .with_registry(registry)
        .with_step_comments(comments)
        .build()
        .compile()
        .unwrap_or_else(|report| {
            for error in &report.errors {
                eprintln!("  error: {}", error);
            }
            exit_with_error("Compilation blocked by configuration errors")
        });
    for diagnostic in &compiled.diagnostics {
        eprintln!("  warning: {}", diagnostic);
    }

    match output {
        Some(path) => {
            fs::write(&path, &compiled.script).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to write script to '{}': {}", path, e))
            });
            eprintln!("  -> Wrote script to '{}'", path);
        }
        None => print!("{}", compiled.script),
    }

    if let Some(path) = artifact_path {
        ScriptArtifact::new(&compiled)
            .save(&path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to write artifact: {}", e)));
        eprintln!("  -> Wrote artifact to '{}'", path);
    }

    eprintln!(
        "Compiled {} nodes into {} bytes in {:?}",
        store.graph().nodes().len(),
        compiled.script.len(),
        start.elapsed()
    );
}

fn run_validate(graph_path: &str, registry: Arc<NodeRegistry>) {
    let Rehydrated { store, unbound } = load(graph_path, registry.clone());
    let compiler = Compiler::builder(store.snapshot()).with_registry(registry).build();
    match compiler.validate() {
        Ok(()) => println!(
            "Graph is valid: {} nodes, {} edges, {} unbound",
            store.graph().nodes().len(),
            store.graph().edges().len(),
            unbound.len()
        ),
        Err(report) => {
            for error in &report.errors {
                eprintln!("  error: {}", error);
            }
            exit_with_error(&format!("{} configuration error(s)", report.errors.len()));
        }
    }
}

fn run_normalize(graph_path: &str, registry: Arc<NodeRegistry>) {
    let Rehydrated { store, .. } = load(graph_path, registry);
    let json = store
        .to_json()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize graph: {}", e)));
    println!("{}", json);
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
