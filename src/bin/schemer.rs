use std::{
    io::{self, BufRead, Write},
    process,
};

use schemer::{Context, Error};

struct Options {
    eval: Vec<String>,
    interactive: bool,
    files: Vec<String>,
}

fn print_help() {
    println!("Usage: schemer [options] [files...]");
    println!("Options:");
    println!("  -h, --help: Print this help message");
    println!("  -e, --eval <expr>: Evaluate <expr> and print its value; may be repeated");
    println!("  -i, --interactive: Read lines from stdin after loading files");
    println!();
    println!("Set RUST_LOG=debug or RUST_LOG=trace to see evaluation logs.");
}

fn parse_options() -> Result<Options, String> {
    let mut args = pico_args::Arguments::from_env();

    if args.contains(["-h", "--help"]) {
        print_help();
        process::exit(0);
    }

    let eval = args
        .values_from_str::<_, String>(["-e", "--eval"])
        .map_err(|e| e.to_string())?;
    let interactive = args.contains(["-i", "--interactive"]);

    let mut files = vec![];
    for arg in args.finish() {
        let arg = arg
            .into_string()
            .map_err(|arg| format!("invalid file name: {:?}", arg))?;
        if arg.starts_with('-') {
            return Err(format!("unknown option: {}", arg));
        }
        files.push(arg);
    }

    Ok(Options {
        // nothing to do otherwise.
        interactive: interactive || (files.is_empty() && eval.is_empty()),
        eval,
        files,
    })
}

fn run(ctx: &mut Context, options: &Options) -> Result<(), Error> {
    for file in &options.files {
        ctx.eval_file(file)?;
    }
    for expr in &options.eval {
        println!("{}", ctx.eval_string(expr)?);
    }
    Ok(())
}

fn repl(ctx: &mut Context) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()?;
    for line in stdin.lock().lines() {
        for output in ctx.repl_line(&line?) {
            if output.is_error() {
                eprintln!("{}", output.text);
            } else {
                writeln!(stdout, "{}", output.text)?;
            }
        }
        write!(stdout, "> ")?;
        stdout.flush()?;
    }
    writeln!(stdout)
}

fn main() {
    env_logger::init();

    let options = match parse_options() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            print_help();
            process::exit(2);
        }
    };

    let mut ctx = Context::new();

    if let Err(e) = run(&mut ctx, &options) {
        eprint!("{}", e.format(&ctx));
        process::exit(-1);
    }

    if options.interactive {
        if let Err(e) = repl(&mut ctx) {
            eprintln!("{}", e);
            process::exit(-1);
        }
    }
}
