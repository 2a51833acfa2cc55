//! A simple CLI tool for rendering poll results.
//! This reads the JSON returned by the results endpoint, checks each rendered
//! tally against its vote count, and prints the results as text.

use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgAction, ArgMatches, Command};
use rocket::serde::json::serde_json;

use polls_backend::model::{api::question::QuestionResults, common::ChoiceId};

const PROGRAM_NAME: &str = "polls-results";

const ABOUT_TEXT: &str = "Render the results of a poll question as text.

EXIT CODES:
     0: Results rendered.
   255: Ran successfully, but a tally summary disagrees with its vote count.
 Other: Error.";

const RESULTS_PATH: &str = "RESULTS_PATH";

const RESULTS_PATH_HELP: &str = "The path to a JSON dump of a question's results,\n\
as returned by `GET /polls/<question_id>/results`";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME).about(ABOUT_TEXT).arg(
        Arg::new(RESULTS_PATH)
            .help(RESULTS_PATH_HELP)
            .action(ArgAction::Set)
            .required(true),
    )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the JSON dump.
    Format(String),
    /// The summary of this choice does not match its votes.
    Inconsistent { choice_id: ChoiceId, summary: String },
}

/// Load the results and check every summary.
fn load(path: &str) -> Result<QuestionResults, Error> {
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    let results: QuestionResults =
        serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))?;

    for choice in &results.choices {
        let expected = format!(
            "{} -- {}",
            choice.text,
            polls_backend::model::api::question::vote_count(choice.votes)
        );
        if choice.summary != expected {
            return Err(Error::Inconsistent {
                choice_id: choice.id,
                summary: choice.summary.clone(),
            });
        }
    }

    Ok(results)
}

/// Render the results, report any problem, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let path: &String = args.get_one(RESULTS_PATH).unwrap(); // Required argument is guaranteed to be present.
    match load(path) {
        Ok(results) => {
            print!("{results}");
            0
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {msg}");
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid JSON: {msg}");
            1
        }
        Err(Error::Inconsistent { choice_id, summary }) => {
            println!("Choice {choice_id} has an inconsistent summary: {summary:?}");
            255
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
