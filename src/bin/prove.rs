// Proves (or refutes) a single CNF/iCNF matrix file against the classical or
// a non-classical connection calculus.
//
// The translation step (shelling out to external logic translators to
// produce a prefixed matrix from a richer source format) is not implemented
// here; --translate is accepted only so the flag surface is complete, and
// exits nonzero with a note naming what it would have called.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use connect_tableau::environment::Environment;
use connect_tableau::parser::{read_classical_cnf, read_prefixed_cnf};
use connect_tableau::settings::{Domain, Logic, Settings};

#[derive(Parser)]
#[command(about = "A connection-tableau theorem prover for first-order clausal logic")]
struct Args {
    #[arg(long, default_value = "classical")]
    logic: String,

    #[arg(long, default_value = "constant")]
    domain: String,

    /// Run the external shell-based logic translators first. Out of scope
    /// for this binary; accepted only so this flag surface matches the rest.
    #[arg(long)]
    translate: bool,

    /// Print a progress line every N steps. 0 (the default) prints nothing.
    #[arg(long = "print-ratio", default_value_t = 0)]
    print_ratio: u64,

    #[arg(long = "max-steps")]
    max_steps: Option<u64>,

    #[arg(short = 'v', long)]
    verbose: bool,

    input: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.translate {
        eprintln!(
            "--translate would shell out to the external CNF/iCNF translators; \
             those are not part of this crate."
        );
        return ExitCode::FAILURE;
    }

    let logic = match Logic::parse(&args.logic) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let domain = match Domain::parse(&args.domain) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut settings = Settings::default();
    settings.logic = logic;
    settings.domain = domain;
    if let Err(e) = settings.validate() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let matrix = if logic.is_classical() {
        read_classical_cnf(&args.input)
    } else {
        read_prefixed_cnf(&args.input)
    };
    let matrix = match matrix {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut env = Environment::new(matrix, settings, args.max_steps);
    env.state_mut().verbose = args.verbose;

    let mut steps = 0u64;
    let outcome = loop {
        if env.is_done() {
            break env.state().outcome().cloned().unwrap_or(
                connect_tableau::engine::Outcome::Unknown,
            );
        }
        let actions = env.action_space();
        if actions.is_empty() {
            break connect_tableau::engine::Outcome::Unknown;
        }
        let (_, done, outcome) = env.step(actions[0]);
        steps += 1;
        if args.print_ratio > 0 && steps % args.print_ratio == 0 {
            println!("... {steps} steps taken");
        }
        if done {
            break outcome;
        }
    };

    println!("{outcome}");
    ExitCode::SUCCESS
}
