use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use gtml_lexer::{Stage, StageRecorder, Token, TracingSink};
use gtml_parser::{Attribute, Node, ParserConfig, TextPolicy};
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gtml")]
#[command(about = "GTML template compiler front end: inspect token streams and trees")]
#[command(version)]
struct Cli {
    /// Log more (-v debug, -vv trace). GTML_LOG overrides this.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the token stream of a template
    Tokens {
        /// Input .html template
        path: String,

        /// Pipeline stage to print
        #[arg(long, value_enum, default_value_t = StageArg::Refined)]
        stage: StageArg,

        /// Print JSON instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Print the tree built from a template
    Tree {
        /// Input .html template
        path: String,

        #[arg(long)]
        json: bool,

        /// Element wrapped around templates with several top-level nodes
        #[arg(long, default_value = "span")]
        wrapper_tag: String,

        /// Deepest element nesting accepted
        #[arg(long, default_value_t = 256)]
        max_depth: usize,

        #[arg(long, value_enum, default_value_t = TextPolicyArg::Concatenate)]
        text_policy: TextPolicyArg,
    },

    /// Check a template for errors without printing anything
    Check {
        /// Input .html template
        path: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StageArg {
    Raw,
    Classified,
    Refined,
}

impl From<StageArg> for Stage {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::Raw => Stage::Raw,
            StageArg::Classified => Stage::Classified,
            StageArg::Refined => Stage::Refined,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TextPolicyArg {
    Concatenate,
    Siblings,
}

impl From<TextPolicyArg> for TextPolicy {
    fn from(arg: TextPolicyArg) -> Self {
        match arg {
            TextPolicyArg::Concatenate => TextPolicy::Concatenate,
            TextPolicyArg::Siblings => TextPolicy::Siblings,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Tokens { path, stage, json } => cmd_tokens(&path, stage.into(), json),
        Command::Tree {
            path,
            json,
            wrapper_tag,
            max_depth,
            text_policy,
        } => {
            let config = ParserConfig::default()
                .with_wrapper_tag(wrapper_tag)
                .with_max_depth(max_depth)
                .with_text_policy(text_policy.into());
            cmd_tree(&path, config, json)
        }
        Command::Check { path } => cmd_check(&path),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("GTML_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(path: &str) -> String {
    let p = Path::new(path);
    if !p.exists() {
        eprintln!("Error: file not found: {path}");
        std::process::exit(1);
    }
    match std::fs::read_to_string(p) {
        Ok(source) => {
            tracing::debug!(path, chars = source.chars().count(), "read template");
            source
        }
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error encoding JSON: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_tokens(path: &str, stage: Stage, json: bool) {
    let source = read_source(path);

    let mut recorder = StageRecorder::default();
    if let Err(e) = gtml_lexer::tokenize_stages(&source, &mut recorder) {
        eprintln!("Lexer error: {e}");
        std::process::exit(1);
    }
    let tokens = recorder.get(stage).unwrap_or_default();

    if json {
        print_json(tokens);
    } else {
        for token in tokens {
            println!("{}", format_token(token));
        }
    }
}

fn cmd_tree(path: &str, config: ParserConfig, json: bool) {
    let source = read_source(path);

    let root = match gtml_parser::Parser::new(config).parse_with(&source, &mut TracingSink) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("Parse error: {e}");
            std::process::exit(1);
        }
    };

    if json {
        print_json(&root);
    } else {
        print!("{}", render_tree(&root));
    }
}

fn cmd_check(path: &str) {
    let source = read_source(path);

    if let Err(e) = gtml_parser::Parser::parse(&source) {
        eprintln!("Parse error: {e}");
        std::process::exit(1);
    }

    eprintln!("OK: {path}");
}

fn format_token(token: &Token) -> String {
    format!(
        "{:>4}:{:<4} {:<16} {:?}",
        token.span.line,
        token.span.column,
        token.kind.name(),
        token.lexeme
    )
}

fn format_attributes(attributes: &[Attribute]) -> String {
    let mut out = String::new();
    for attribute in attributes {
        out.push(' ');
        out.push_str(&attribute.name);
        if let Some(value) = &attribute.value {
            out.push_str(&format!("={value:?}"));
        }
    }
    out
}

/// One line per node, indented two spaces per level below the root.
fn render_tree(root: &Node) -> String {
    let mut out = String::new();
    root.walk(&mut |node, _, depth| {
        let indent = "  ".repeat(depth.saturating_sub(1));
        let line = match node {
            Node::Root { .. } => return,
            Node::Element(el) => format!("<{}{}>", el.tag, format_attributes(&el.attributes)),
            Node::VoidElement(el) => format!("<{}{} />", el.tag, format_attributes(&el.attributes)),
            Node::Text(text) => format!("{text:?}"),
            Node::ElseMarker => "::?".to_string(),
        };
        out.push_str(&format!("{indent}{line}\n"));
    });
    out
}
