mod cli;
mod commands;
mod pbm;
mod tracer;

use std::process::ExitCode;

use cli::build_cli;
use commands::assemble::AssembleArgs;
use commands::disasm::DisasmArgs;
use commands::draw::DrawArgs;
use commands::run::RunArgs;

fn main() -> ExitCode {
    let matches = build_cli().get_matches();

    let result = match matches.subcommand() {
        Some(("assemble", m)) => commands::assemble::run(AssembleArgs::from_matches(m)),
        Some(("run", m)) => commands::run::run(RunArgs::from_matches(m)),
        Some(("draw", m)) => commands::draw::run(DrawArgs::from_matches(m)),
        Some(("disasm", m)) => commands::disasm::run(DisasmArgs::from_matches(m)),
        _ => unreachable!("clap should have caught this"),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
