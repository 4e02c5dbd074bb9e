// Proves a single matrix file and prints the accepted action sequence.
//
// A debugging aid, the CLI equivalent of what a caller embedding the engine
// would inspect on a successful `Environment::run_to_completion` — not a
// second user-facing surface.

const USAGE: &str = "cargo run --release --bin=search <matrix file> [logic]";

use connect_tableau::action::Action;
use connect_tableau::environment::Environment;
use connect_tableau::engine::Outcome;
use connect_tableau::parser::{read_classical_cnf, read_prefixed_cnf};
use connect_tableau::settings::{Logic, Settings};

fn main() {
    let mut args = std::env::args().skip(1);
    let path = args.next().expect(USAGE);
    let logic = match args.next() {
        Some(s) => Logic::parse(&s).expect(USAGE),
        None => Logic::Classical,
    };

    let mut settings = Settings::default();
    settings.logic = logic;

    let matrix = if logic.is_classical() {
        read_classical_cnf(path.as_ref())
    } else {
        read_prefixed_cnf(path.as_ref())
    }
    .unwrap_or_else(|e| panic!("{e}"));

    let mut env = Environment::new(matrix, settings, None);
    env.state_mut().verbose = true;
    let outcome = env.run_to_completion();

    match &outcome {
        Outcome::Theorem => {
            println!("proof found in {} actions:", env.state().proof_sequence().len());
            for (goal, action) in env.state().proof_sequence() {
                match action {
                    Action::Start { clause_idx, .. } => {
                        println!("  goal {goal}: start from clause {clause_idx:?}")
                    }
                    Action::Extension {
                        clause_idx, lit_idx, ..
                    } => println!("  goal {goal}: extend against clause {clause_idx} lit {lit_idx}"),
                    Action::Reduction { path_node, .. } => {
                        println!("  goal {goal}: reduce against ancestor {path_node}")
                    }
                    Action::Backtrack => println!("  goal {goal}: backtrack"),
                }
            }
        }
        other => println!("no proof: {other}"),
    }
}
