//! textforge CLI
//!
//! Usage:
//!   textforge [OPTIONS] <TEMPLATE>
//!
//! Options:
//!   -m, --model <FILE>       Typed data model (TOML or JSON) bound as `name` / `types`
//!   -p, --params <FILE>      Generic bindings document (TOML or JSON)
//!       --set <KEY=VALUE>    Bind a string value, may be repeated
//!   -t, --template <NAME>    Template to render (default: first defined)
//!   -c, --config <FILE>      Render configuration (TOML format)
//!   -o, --output <FILE>      Write output here instead of stdout
//!   -h, --help               Print help

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use textforge::{
    load_bindings, parse_module, Bindings, DataModel, RenderConfig, Renderer, Value,
};

#[derive(Parser)]
#[command(name = "textforge")]
#[command(about = "Render directive-annotated text templates")]
struct Cli {
    /// Template file
    template: PathBuf,

    /// Typed data model (TOML or JSON) bound as `name` and `types`
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Generic bindings document (TOML or JSON); top-level keys become names
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Bind KEY to the string VALUE
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    set: Vec<(String, String)>,

    /// Template to render (default: the first one defined)
    #[arg(short = 't', long = "template")]
    template_name: Option<String>,

    /// Render configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directive line prefix, overrides the config file
    #[arg(long)]
    prefix: Option<String>,

    /// Substitution placeholder character, overrides the config file
    #[arg(long)]
    placeholder: Option<char>,

    /// Output file (writes to stdout if not provided)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip data model validation
    #[arg(long)]
    no_validate: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_key_value(arg: &str) -> Result<(String, String), String> {
    arg.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", arg))
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "textforge=warn",
        1 => "textforge=debug",
        _ => "textforge=trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load configuration, then apply flag overrides
    let mut config = match &cli.config {
        Some(path) => RenderConfig::from_file(path).unwrap_or_else(|e| {
            fail(format!("loading config '{}': {}", path.display(), e))
        }),
        None => RenderConfig::default(),
    };
    if let Some(prefix) = &cli.prefix {
        config.syntax.directive_prefix = prefix.clone();
    }
    if let Some(placeholder) = cli.placeholder {
        config.syntax.placeholder = placeholder;
    }
    if let Some(name) = &cli.template_name {
        config.template = Some(name.clone());
    }
    if let Err(e) = config.syntax.validate() {
        fail(e);
    }

    let bindings = collect_bindings(&cli);
    let filename = cli.template.display().to_string();
    let source = fs::read_to_string(&cli.template)
        .unwrap_or_else(|e| fail(format!("reading file '{}': {}", filename, e)));

    let module = match parse_module(&source, &config.syntax) {
        Ok(module) => module,
        Err(e) => {
            eprint!("{}", e.format(&source, &filename));
            std::process::exit(1);
        }
    };
    debug!(templates = ?module.names().collect::<Vec<_>>(), "parsed module");

    let renderer = Renderer::new(&module).with_indent(config.indent.clone());
    let result = match &config.template {
        Some(name) => renderer.render_template(name, &bindings),
        None => renderer.render(&bindings),
    };
    let text = match result {
        Ok(text) => text,
        Err(e) => {
            eprint!("{}", e.format(&source, &filename));
            std::process::exit(1);
        }
    };

    if let Err(e) = write_output(cli.output.as_deref(), &text) {
        fail(format!("writing output: {}", e));
    }
}

fn collect_bindings(cli: &Cli) -> Bindings {
    let mut bindings = Bindings::new();

    if let Some(path) = &cli.model {
        let mut model = DataModel::from_file(path)
            .unwrap_or_else(|e| fail(format!("loading model '{}': {}", path.display(), e)));
        model.normalize();
        if !cli.no_validate {
            if let Err(e) = model.validate() {
                fail(format!("invalid model '{}': {}", path.display(), e));
            }
        }
        bindings.extend(model.to_bindings());
    }

    if let Some(path) = &cli.params {
        let params = load_bindings(path)
            .unwrap_or_else(|e| fail(format!("loading params '{}': {}", path.display(), e)));
        bindings.extend(params);
    }

    for (key, value) in &cli.set {
        bindings.insert(key.clone(), Value::from(value.as_str()));
    }
    bindings
}

fn write_output(path: Option<&Path>, text: &str) -> io::Result<()> {
    match path {
        Some(path) => fs::write(path, text),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("name=game"),
            Ok(("name".to_string(), "game".to_string()))
        );
        assert_eq!(
            parse_key_value("expr=a=b"),
            Ok(("expr".to_string(), "a=b".to_string()))
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
