use anyhow::Context;
use bstr::ByteSlice;
use clap::Parser;
use microprolog::{parse_program, Config, Engine, QueryOutcome, Strategy};
use std::io::Read;
use std::path::PathBuf;

/// Consult a program of facts and queries and print every query's answers.
#[derive(Parser, Debug)]
#[command(name = "microprolog", version)]
struct Cli {
    /// Program to consult; standard input when omitted
    file: Option<PathBuf>,
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Maximum number of arguments of a fact or goal
    #[arg(long)]
    max_params: Option<usize>,
    /// Walk every fact of a predicate instead of using symbol occurrences
    #[arg(long)]
    scan: bool,
    /// Print the syntax tree
    #[arg(long)]
    ast: bool,
    /// Print the fact database after loading
    #[arg(long)]
    dump: bool,
    /// Print answers as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read `{}`", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("invalid configuration in `{}`", path.display()))?
            }
            None => Config::default(),
        };
        if let Some(max_params) = self.max_params {
            config.max_params = max_params;
        }
        if self.scan {
            config.strategy = Strategy::Scan;
        }
        Ok(config)
    }

    fn input_name(&self) -> String {
        self.file
            .as_ref()
            .map_or_else(|| "<stdin>".to_string(), |path| path.display().to_string())
    }

    fn read_input(&self) -> anyhow::Result<Vec<u8>> {
        match &self.file {
            Some(path) => {
                std::fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))
            }
            None => {
                let mut bytes = Vec::new();
                std::io::stdin()
                    .read_to_end(&mut bytes)
                    .context("failed to read standard input")?;
                Ok(bytes)
            }
        }
    }
}

fn print_outcome(outcome: &QueryOutcome) {
    println!("?- {}.", outcome.query);
    match &outcome.answer {
        Ok(results) if results.is_empty() => println!("false."),
        Ok(results) => {
            for result in results {
                println!("{result}.");
            }
        }
        Err(err) => println!("error: {err}"),
    }
}

fn outcome_json(outcome: &QueryOutcome) -> serde_json::Value {
    match &outcome.answer {
        Ok(results) => serde_json::json!({ "query": outcome.query, "solutions": results }),
        Err(err) => serde_json::json!({ "query": outcome.query, "error": err.to_string() }),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::builder().parse_env("MICROPROLOG_LOG").init();
    let cli = Cli::parse();
    let config = cli.config()?;
    let name = cli.input_name();

    let bytes = cli.read_input()?;
    let source = bytes
        .to_str()
        .map_err(microprolog::Error::from)
        .with_context(|| format!("failed to decode {name}"))?;
    let program = parse_program(source).with_context(|| format!("failed to parse {name}"))?;
    if cli.ast {
        print!("{program}");
    }

    let mut engine = Engine::with_config(config);
    let report = engine.load(&program);
    for err in &report.rejected_facts {
        eprintln!("{name}: skipped fact: {err}");
    }
    if cli.dump {
        print!("{}", engine.database());
    }

    if cli.json {
        let answers: Vec<serde_json::Value> = report.queries.iter().map(outcome_json).collect();
        println!("{}", serde_json::to_string_pretty(&answers)?);
    } else {
        for outcome in &report.queries {
            print_outcome(outcome);
        }
    }
    Ok(())
}
