use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use schemelet::Error;
use schemelet::ast::Expr;
use schemelet::environment::Environment;
use schemelet::evaluator;
use schemelet::parser::{ParseConfig, is_complete_with_config};
use schemelet::{diagnostic, eval_buffer_with_config};
use std::process;

const PROMPT: &str = "schemelet> ";
const CONTINUATION_PROMPT: &str = "       ... ";

fn main() {
    env_logger::init();

    println!("Schemelet - a small lexically-scoped Scheme");
    println!("Enter S-expressions like: (+ 1 2)");
    println!("Multi-line input is collected until the parentheses balance.");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("Could not initialize REPL: {err}");
            process::exit(1);
        }
    };

    let mut env = evaluator::create_global_env();

    // Also callable from user code for demonstration purposes
    env.register_builtin_operation::<(), Expr, _>("help", help);

    let config = ParseConfig {
        handle_comments: true,
    };
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() {
            PROMPT
        } else {
            CONTINUATION_PROMPT
        };

        match rl.readline(prompt) {
            Ok(line) => {
                if buffer.is_empty() {
                    let command = line.trim();
                    if command.is_empty() {
                        continue;
                    }
                    match command {
                        ":help" => {
                            print_help();
                            continue;
                        }
                        ":env" => {
                            print_environment(&env);
                            continue;
                        }
                        ":quit" | ":exit" => {
                            println!("Goodbye!");
                            break;
                        }
                        _ => {}
                    }
                }

                buffer.push_str(&line);
                buffer.push('\n');
                if !is_complete_with_config(&buffer, &config) {
                    continue;
                }

                let _ = rl.add_history_entry(buffer.trim_end());
                match eval_buffer_with_config(&buffer, &mut env, &config) {
                    Ok(Some(value)) => println!("{value}"),
                    Ok(None) => {}
                    Err(err) => println!("{}", diagnostic(&err)),
                }
                println!();
                buffer.clear();
            }

            Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

/// `(help)` from user code
fn help() -> Result<Expr, Error> {
    print_help();
    Ok(Expr::List(vec![]))
}

fn print_help() {
    println!("Schemelet commands:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+C     - Exit the interpreter");
    println!();
    println!("Syntax:");
    println!("  Integers: 42, -5     Strings: \"text\"     Booleans: #t, #f");
    println!("  Lists: (1 2 3)      Quote: 'x or (quote x)");
    println!("  Comments: ; to end of line");
    println!();
    println!("Special forms: quote, if, cond, define, set!, lambda");
    println!("Primitives: + - * < > = car cdr cons null? list list? symbol? not do");
    println!();
    println!("Examples:");
    println!("  (define fact (lambda (n) (if (= n 0) 1 (* n (fact (- n 1))))))");
    println!("  (fact 5)");
    println!("  (cond ((> 1 2) \"no\") (else \"yes\"))");
    println!();
}

fn print_environment(env: &Environment) {
    let bindings = env.get_all_bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Environment bindings ({} total):", bindings.len());
    println!();

    let mut primitives = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in bindings {
        match value {
            Expr::Primitive { .. } => primitives.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !primitives.is_empty() {
        println!("Primitives ({}):", primitives.len());
        for row in primitives.chunks(4) {
            for name in row {
                print!("  {name:<15}");
            }
            println!();
        }
        println!();
    }

    if !user_defined.is_empty() {
        println!("User-defined values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}
