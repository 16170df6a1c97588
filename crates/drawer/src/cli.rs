//! Command line definition.
//!
//! Arg builders are shared between subcommands; each command's `*Args`
//! struct is filled from the parsed matches here.

use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use turtle_machine::machine::DEFAULT_MAX_STEPS;

use crate::commands::ExecOptions;
use crate::commands::assemble::AssembleArgs;
use crate::commands::disasm::DisasmArgs;
use crate::commands::draw::DrawArgs;
use crate::commands::run::RunArgs;

pub fn build_cli() -> Command {
    Command::new("drawer")
        .about("Assemble and run turtle graphics programs")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(assemble_command())
        .subcommand(run_command())
        .subcommand(draw_command())
        .subcommand(disasm_command())
}

fn assemble_command() -> Command {
    Command::new("assemble")
        .about("Assemble a source file into a program image")
        .arg(source_arg())
        .arg(output_arg("Program image to write"))
}

fn run_command() -> Command {
    Command::new("run")
        .about("Run a program image and write the canvas as PBM")
        .arg(image_arg())
        .arg(output_arg("PBM file to write"))
        .arg(max_steps_arg())
        .arg(trace_arg())
        .arg(no_header_arg())
}

fn draw_command() -> Command {
    Command::new("draw")
        .about("Assemble and run a source file in one go")
        .arg(source_arg())
        .arg(output_arg("PBM file to write"))
        .arg(max_steps_arg())
        .arg(trace_arg())
}

fn disasm_command() -> Command {
    Command::new("disasm")
        .about("List the instructions of a program image")
        .arg(image_arg())
        .arg(no_header_arg())
}

/// Assembly source (positional).
fn source_arg() -> Arg {
    Arg::new("source")
        .value_name("SOURCE")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Assembly source file")
}

/// Program image (positional).
fn image_arg() -> Arg {
    Arg::new("image")
        .value_name("IMAGE")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Program image file")
}

fn output_arg(help: &'static str) -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help(help)
}

fn max_steps_arg() -> Arg {
    Arg::new("max_steps")
        .long("max-steps")
        .value_name("N")
        .default_value("10000000")
        .value_parser(value_parser!(u64))
        .help("Fault after executing this many instructions")
}

fn trace_arg() -> Arg {
    Arg::new("trace")
        .long("trace")
        .action(ArgAction::SetTrue)
        .help("Print every executed instruction to stderr")
}

fn no_header_arg() -> Arg {
    Arg::new("no_header")
        .long("no-header")
        .action(ArgAction::SetTrue)
        .help("Treat the image as a bare instruction stream on a 512x512 canvas")
}

fn path(m: &ArgMatches, id: &str) -> PathBuf {
    m.get_one::<PathBuf>(id).cloned().unwrap_or_default()
}

fn exec_options(m: &ArgMatches) -> ExecOptions {
    ExecOptions {
        max_steps: m
            .get_one::<u64>("max_steps")
            .copied()
            .unwrap_or(DEFAULT_MAX_STEPS),
        trace: m.get_flag("trace"),
    }
}

impl AssembleArgs {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            source: path(m, "source"),
            output: path(m, "output"),
        }
    }
}

impl RunArgs {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            image: path(m, "image"),
            output: path(m, "output"),
            no_header: m.get_flag("no_header"),
            exec: exec_options(m),
        }
    }
}

impl DrawArgs {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            source: path(m, "source"),
            output: path(m, "output"),
            exec: exec_options(m),
        }
    }
}

impl DisasmArgs {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            image: path(m, "image"),
            no_header: m.get_flag("no_header"),
        }
    }
}
