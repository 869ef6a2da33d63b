mod builtins;
mod config;
mod env;
mod error;
mod eval;
mod heap;
mod printer;
mod reader;
mod runtime;
mod symbol;
mod value;

use clap::Parser;
use config::{VERSION, WELCOME_FOOTER, WELCOME_MESSAGE, WELCOME_SUBTITLE};
use reader::{ReadResult, Reader};
use runtime::Runtime;
use rustyline::error::ReadlineError;
use rustyline::{Config, Editor};
use std::path::PathBuf;
use value::Value;

/// A tree-walking Scheme-flavored Lisp interpreter
#[derive(Parser, Debug)]
#[command(name = "pebble-lisp")]
#[command(version = VERSION)]
#[command(about = "A Scheme-flavored Lisp interpreter with a tracing garbage collector")]
struct CliArgs {
    /// Script file to execute (optional — if not provided, starts a REPL)
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let mut rt = Runtime::new();

    if let Some(script_path) = args.script {
        return run_script(&mut rt, &script_path);
    }

    run_repl(&mut rt)
}

fn run_script(rt: &mut Runtime, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read script file {}: {}", path.display(), e))?;

    let forms = reader::read_all(&contents, rt).map_err(|e| format!("parse error: {}", e))?;
    let top = rt.top_level;

    // `forms` holds the whole file's parsed AST in a bare Rust Vec, outside
    // any environment the collector already traces — root it for the
    // duration of the loop so a collection triggered mid-evaluation can't
    // reclaim a form that hasn't run yet.
    rt.root_many(&forms);
    for form in &forms {
        if let Err(e) = eval::eval(rt, top, *form) {
            rt.unroot(forms.len());
            return Err(format!("evaluation error: {}", e).into());
        }
    }
    rt.unroot(forms.len());
    Ok(())
}

fn run_repl(rt: &mut Runtime) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::builder().auto_add_history(true).build();
    let mut rl: Editor<(), rustyline::history::DefaultHistory> =
        Editor::with_config(config).map_err(|e| format!("failed to initialize REPL: {}", e))?;

    let history_file = ".pebble_lisp_history";
    let _ = rl.load_history(history_file);

    println!("{}", WELCOME_MESSAGE);
    println!("{}", WELCOME_SUBTITLE);
    println!("{}", WELCOME_FOOTER);

    loop {
        match rl.readline(">>> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                if matches!(line.trim(), "(quit)" | "(exit)") {
                    break;
                }
                eval_repl_line(rt, &line);
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(history_file);
    Ok(())
}

fn eval_repl_line(rt: &mut Runtime, line: &str) {
    let top = rt.top_level;
    let form = {
        let mut reader = Reader::new(line, rt);
        match reader.read_form() {
            Ok(ReadResult::Form(v)) => v,
            Ok(ReadResult::Eof) => return,
            Err(e) => {
                eprintln!("Parse error: {}", e);
                return;
            }
        }
    };

    match rt.eval(top, form) {
        Value::Exception => rt.print_exception(),
        result => match printer::display(rt, result) {
            Ok(text) => println!("=> {}", text),
            Err(e) => eprintln!("Error: {}", e),
        },
    }
}
