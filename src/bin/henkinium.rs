use clap::Parser;
use henkinium::{
    cegar::Cegar,
    cli::{self, Options},
    dqcnf::DQCNF,
    dqdimacs::{DqdimacsParser, ExtendedParseError},
    SolverResult,
};
use miette::Result;
use std::io::Cursor;
use tracing_subscriber::EnvFilter;

fn main() -> Result<SolverResult> {
    let options = Options::parse();
    let default_filter = if options.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let contents = cli::read_input(&options)?;
    let reader = Cursor::new(&contents);

    let dqcnf: DQCNF = match DqdimacsParser::new(reader).parse() {
        Ok(parsed) => parsed,
        Err(err) => Err(ExtendedParseError { source_code: contents, related: vec![err] })?,
    };
    let (instance, counter) = dqcnf.instantiate();
    let mut solver: Cegar = Cegar::new(instance, Some(counter))?;

    if options.info {
        print!("{}", solver.statistics());
        for (existential, deps) in &dqcnf.existentials {
            let deps: Vec<String> = deps.iter().map(ToString::to_string).collect();
            println!("{existential} depends on [{}]", deps.join(", "));
        }
        std::process::exit(0);
    }

    if options.detect_equiv {
        let classes = solver.detect_equivalent_existentials()?;
        for (representative, members) in &classes {
            let names: Vec<String> =
                members.iter().map(|&var| solver.variables().display_name(var)).collect();
            println!("{}: [{}]", solver.variables().display_name(*representative), names.join(", "));
        }
        std::process::exit(0);
    }

    let result = solver.solve()?;
    println!("result status: {result}");

    Ok(result)
}
