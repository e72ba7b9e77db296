//! brindle CLI
//!
//! Usage:
//!   brindle [OPTIONS] [TEMPLATE]
//!
//! Options:
//!   -d, --dir <DIR>        Template directory; every `.tpl` file is registered
//!   -D, --data <FILE>      JSON file with render data
//!   -c, --config <FILE>    Engine configuration (TOML format)
//!       --deps             Print the components TEMPLATE depends on
//!       --check            Report template syntax problems and exit
//!   -h, --help             Print help
//!
//! TEMPLATE is a template name, a path to a template file, or omitted to
//! read template source from stdin.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use brindle::template::FileSystemLoader;
use brindle::{Engine, EngineConfig, Value};

#[derive(Parser)]
#[command(name = "brindle")]
#[command(about = "Render directive-annotated text templates")]
struct Cli {
    /// Template name or file (reads from stdin if not provided)
    template: Option<String>,

    /// Template directory; names map to paths (`pages.home` -> pages/home.tpl)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// JSON file with render data
    #[arg(short = 'D', long)]
    data: Option<PathBuf>,

    /// Engine configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the components the template depends on instead of rendering
    #[arg(long)]
    deps: bool,

    /// Report template syntax problems instead of rendering
    #[arg(long)]
    check: bool,
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "brindle=warn".into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match EngineConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let mut engine = Engine::with_config(config);

    if let Some(dir) = &cli.dir {
        let loader = FileSystemLoader::new(dir);
        match loader.load_all() {
            Ok(templates) => {
                for (name, source) in templates {
                    engine.register_template(name, source);
                }
            }
            Err(e) => {
                eprintln!("Error loading templates: {}", e);
                std::process::exit(1);
            }
        }
        engine.set_loader(loader);
    }

    let data = match &cli.data {
        Some(path) => match read_data(path) {
            Ok(value) => value,
            Err(message) => {
                eprintln!("Error reading data '{}': {}", path.display(), message);
                std::process::exit(1);
            }
        },
        None => Value::Null,
    };

    // A name already known to the engine wins over a file of the same name
    let reference = match cli.template {
        Some(reference) if engine.template(&reference).is_some() => reference,
        Some(path) => match fs::read_to_string(&path) {
            Ok(source) => {
                engine.register_template(path.clone(), source);
                path
            }
            Err(e) => {
                eprintln!("Error reading template '{}': {}", path, e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buffer) {
                eprintln!("Error reading from stdin: {}", e);
                std::process::exit(1);
            }
            engine.register_template("stdin", buffer);
            "stdin".to_string()
        }
    };

    if cli.check {
        std::process::exit(check(&engine));
    }

    if cli.deps {
        let graph = engine.dependency_graph(&reference);
        for component in &graph.components {
            println!("{}", component);
        }
        for missing in &graph.missing {
            eprintln!("warning: unresolved reference '{}'", missing);
        }
        return;
    }

    match engine.render(&reference, data) {
        Ok(output) => print!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn read_data(path: &Path) -> Result<Value, String> {
    let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let json: serde_json::Value = serde_json::from_str(&content).map_err(|e| e.to_string())?;
    Ok(Value::from(json))
}

/// Print diagnostics for every registered template; returns the exit code
fn check(engine: &Engine) -> i32 {
    let mut problems = 0;
    for name in engine.templates().names() {
        let Some(template) = engine.templates().get(name) else {
            continue;
        };
        if !template.diagnostics.is_empty() {
            problems += template.diagnostics.len();
            eprintln!("{}", template.report());
        }
    }
    if problems == 0 {
        eprintln!("No problems found");
        0
    } else {
        eprintln!("{} problem(s) found", problems);
        1
    }
}
