use std::path::Path;

use clap::Parser as _;
use color_print::cprintln;

use asmtowasm::{Emitter, Error, Lifter, Parser};

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(
    name = "asmtowasm",
    version,
    about = "Translates AT&T-flavored assembly to WebAssembly through an SSA IR",
    disable_version_flag = true,
    help_template = HELP_TEMPLATE
)]
struct Args {
    /// Input assembly file
    input: Option<String>,

    /// Output file for the WebAssembly binary
    #[clap(long, value_name = "FILE")]
    wasm: Option<String>,

    /// Output file for the WebAssembly text form
    #[clap(long, value_name = "FILE")]
    wast: Option<String>,

    /// Output file for the SSA IR dump
    #[clap(short, long, value_name = "FILE")]
    output: Option<String>,

    /// Accepted for compatibility; the full lifter is always used
    #[clap(long)]
    lifter: bool,

    /// Print version information
    #[clap(short = 'v', long = "version")]
    version: bool,
}

fn main() {
    // Exit 0 for -h/-v, 1 for anything invalid (clap's default would be 2).
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    if args.version {
        println!("asmtowasm {}", env!("CARGO_PKG_VERSION"));
        return;
    }
    let Some(input) = args.input.clone() else {
        cprintln!("<red,bold>error</>: no input file");
        std::process::exit(1);
    };
    if let Err(err) = run(&input, &args) {
        cprintln!("<red,bold>error</>: {}", err);
        if let Error::Parse(parse) = &err {
            if let Some(line) = parse.line() {
                print_diag(&input, line);
            }
        }
        std::process::exit(1);
    }
}

fn run(input: &str, args: &Args) -> Result<(), Error> {
    println!("1. Parse: {}", input);
    let (instructions, labels) = Parser::parse_file(input).map_err(Error::Parse)?;
    println!("  - {} instruction(s), {} label(s)", instructions.len(), labels.len());

    println!("2. Lift to SSA IR");
    let module = Lifter::lift(&instructions)?;
    if let Some(path) = &args.output {
        println!("  > {}", path);
        write_file(path, module.to_string().as_bytes())?;
    }

    println!("3. Emit WebAssembly");
    let wasm = Emitter::emit(&module)?;

    let (wasm_path, wast_path) = match (&args.wasm, &args.wast) {
        // With no explicit output, both artifacts derive from the input stem.
        (None, None) => (
            Some(derive_output(input, "wasm")),
            Some(derive_output(input, "wat")),
        ),
        (w, t) => (w.clone(), t.clone()),
    };
    if let Some(path) = wasm_path {
        println!("  > {}", path);
        write_file(&path, &wasm.to_bytes())?;
    }
    if let Some(path) = wast_path {
        println!("  > {}", path);
        write_file(&path, wasm.to_wat().as_bytes())?;
    }
    Ok(())
}

fn write_file(path: &str, bytes: &[u8]) -> Result<(), Error> {
    use std::io::Write;
    let mut file =
        std::fs::File::create(path).map_err(|e| Error::FileCreate(path.to_string(), e))?;
    file.write_all(bytes)
        .map_err(|e| Error::FileWrite(path.to_string(), e))
}

fn derive_output(input: &str, ext: &str) -> String {
    Path::new(input)
        .with_extension(ext)
        .to_string_lossy()
        .into_owned()
}

/// Rustc-style location snippet for parse errors.
fn print_diag(path: &str, line: usize) {
    cprintln!("     <blue>--></> <underline>{}:{}</>", path, line);
    let Ok(text) = std::fs::read_to_string(path) else {
        return;
    };
    let Some(content) = text.lines().nth(line.saturating_sub(1)) else {
        return;
    };
    cprintln!("      <blue>|</>");
    cprintln!(" <blue>{:>4} |</> {}", line, content);
    cprintln!("      <blue>|</>");
}
