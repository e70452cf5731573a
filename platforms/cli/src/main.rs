use clap::Parser;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use tapestack::{
    Driver, Mode, ProgramLoader, Snapshot, Speed, Status, TapeView, TuringMachineError,
};
use tracing::Level;

type CharSnapshot = Snapshot<String, char>;

#[derive(Parser)]
#[clap(author, version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// The JSON program file to execute
    #[clap(short, long)]
    program: PathBuf,

    /// Replaces the initial content of the tapes, in order
    #[clap(short, long)]
    input: Vec<String>,

    /// Execution speed in steps per second, unlimited when omitted
    #[clap(short, long)]
    speed: Option<NonZeroU32>,

    /// Pop stacks only when a transition matches
    #[clap(long)]
    atomic: bool,

    /// Print each step of the execution
    #[clap(short = 'd', long)]
    debug: bool,

    /// Log engine and driver events to stderr
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, TuringMachineError> {
    let mut program = ProgramLoader::load_program(&cli.program)?;
    program.set_tapes(&cli.input)?;
    if cli.atomic {
        program.mode = Mode::Atomic;
    }

    let machine = program.build()?;
    let blank = program.blank;
    let speed = cli.speed.map_or(Speed::Unlimited, Speed::StepsPerSecond);

    let mut driver = Driver::new(machine, speed)?;
    let (tx, rx) = mpsc::channel();
    driver.start(move |snapshot: CharSnapshot| {
        let _ = tx.send(snapshot);
    })?;

    // The channel closes when the worker drops the observer
    let mut last = None;
    for snapshot in rx {
        if cli.debug {
            print_step(&snapshot);
        }
        last = Some(snapshot);
    }
    driver.join()?;

    let Some(last) = last else {
        return Ok(ExitCode::FAILURE);
    };

    if cli.debug {
        println!("\nFinal tapes:");
    }
    for tape in &last.tapes {
        println!("{}", tape.cells.iter().collect::<String>().trim_matches(blank));
    }

    match last.status {
        Status::Errored(e) => {
            eprintln!("\nMachine error: {}", e);
            Ok(ExitCode::FAILURE)
        }
        _ => Ok(ExitCode::SUCCESS),
    }
}

fn print_step(snapshot: &CharSnapshot) {
    let tapes = snapshot
        .tapes
        .iter()
        .map(render_tape)
        .collect::<Vec<_>>()
        .join(", ");
    let stacks = snapshot
        .stacks
        .iter()
        .map(|stack| stack.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(", ");
    let action = snapshot
        .action
        .map_or_else(|| "-".to_string(), |id| id.to_string());

    println!(
        "Step: {}, State: {}, Action: {}, Tapes: [{}], Stacks: [{}]",
        snapshot.step, snapshot.state, action, tapes, stacks
    );

    match &snapshot.status {
        Status::Running => {}
        Status::Halted => println!("\nMachine halted."),
        Status::Cancelled => println!("\nMachine cancelled."),
        Status::Errored(_) => println!("\nMachine stopped on error."),
    }
}

/// Renders a tape with the cell under the head in brackets, e.g. `10[1]0`.
fn render_tape(tape: &TapeView<char>) -> String {
    tape.cells
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i == tape.head {
                format!("[{}]", c)
            } else {
                c.to_string()
            }
        })
        .collect()
}
