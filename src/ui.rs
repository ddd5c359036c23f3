// UI layer: the interactive prompt loop built on `dialoguer`.
// Each turn re-reads the configuration, runs the full upload/generate
// pipeline and prints the answer. Failures are printed and the loop goes
// on to the next prompt.

use crate::api::{GeminiClient, LocalFile, Phase, UploadMode};
use crate::config::Settings;
use crate::transport::Transport;
use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::Input;
use std::path::PathBuf;

/// Instruction prepended to every user prompt so answers render well in a
/// terminal.
pub const SYSTEM_PROMPT: &str = "This is running on a terminal so format it to look good, no markdown \
formatting like bolds with double asterisk because the response is viewed in a terminal where no \
markdown formatting will work, also format it with colors with ANSI format like this \\033[97m";

/// Typing this at the prompt ends the session.
pub const EXIT_WORD: &str = "0";

/// Everything a turn needs besides the client.
pub struct Session {
    pub config_path: PathBuf,
    pub file: LocalFile,
    pub mode: UploadMode,
}

/// Combine the fixed system prompt with what the user typed.
pub fn compose_prompt(user_prompt: &str) -> String {
    format!("System Prompt: {}\nUser Prompt: {}", SYSTEM_PROMPT, user_prompt)
}

/// Ask for the file to upload when none was given on the command line.
pub fn ask_file_path() -> Result<PathBuf> {
    let path: String = Input::new().with_prompt("File path (.png, .jpg, .jpeg, .pdf)").interact_text()?;
    Ok(PathBuf::from(path.trim()))
}

/// Run one turn and return the answer text.
pub fn run_once<T: Transport>(client: &mut GeminiClient<T>, session: &Session, user_prompt: &str) -> Result<String> {
    // Failures before the pipeline starts must not carry the previous turn's phase.
    client.reset();
    // Re-read so a fixed configuration file is picked up without a restart.
    let settings = Settings::load(&session.config_path)?;
    client.set_endpoints(settings.require()?);
    let result = client.run_turn(&session.file, &compose_prompt(user_prompt), session.mode)?;
    Ok(result.text)
}

/// Prompt until the user enters the exit word.
pub fn prompt_loop<T: Transport>(client: &mut GeminiClient<T>, session: &Session) -> Result<()> {
    loop {
        let input: String = Input::new()
            .with_prompt(format!("Enter your prompt [enter {} to exit]", EXIT_WORD))
            .allow_empty(true)
            .interact_text()?;
        let input = input.trim();
        if input == EXIT_WORD {
            println!("Exited");
            break;
        }
        if input.is_empty() {
            continue;
        }

        match run_once(client, session, input) {
            Ok(text) => print_response(&text),
            Err(e) => println!("{}", failure_message(client.failed_in(), &e)),
        }
    }
    Ok(())
}

/// Describe a failed turn, naming the step only when the pipeline ran.
pub fn failure_message(failed_in: Option<Phase>, error: &anyhow::Error) -> String {
    match failed_in {
        Some(phase) => format!("Request failed while {}: {:#}", phase, error),
        None => format!("Request failed: {:#}", error),
    }
}

/// Print the model's answer under a highlighted header.
pub fn print_response(text: &str) {
    println!("{}\n{}", "Gemini response:".white().bold(), text);
}
