use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "golearn", about = "Browse Go courses and run lesson code from the terminal", version)]
pub struct Cli {
    /// Execution backend (remote|sandbox). Overrides EXECUTION_BACKEND.
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Course service base URL. Overrides COURSE_API_URL.
    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,

    /// Read courses from a local JSON catalog instead of the course service.
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Log debug details (to the log file in `learn` mode).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List available courses.
    Courses,

    /// Show a course and its ordered lessons.
    Course {
        /// Course id.
        id: String,
    },

    /// Print a lesson's text, hint count and expected output.
    Lesson {
        /// `<course_id>?lesson=<lesson_id>`
        locator: String,
    },

    /// Run code for a lesson and compare with its expected output.
    ///
    /// Source comes from --file, else piped stdin, else the lesson's starter code.
    Run {
        /// `<course_id>?lesson=<lesson_id>`
        locator: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Run a built-in example or any file, without an expected output.
    Playground {
        /// Built-in example (hello, fibonacci, loop).
        #[arg(long, short)]
        example: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        /// List built-in examples.
        #[arg(long)]
        list: bool,
    },

    /// Open the interactive lesson view.
    Learn {
        /// `<course_id>` or `<course_id>?lesson=<lesson_id>`
        locator: String,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "golearn", "run", "go-basics?lesson=hello", "--backend", "sandbox", "--file", "main.go",
        ])
        .unwrap();
        assert_eq!(cli.backend.as_deref(), Some("sandbox"));
        match cli.command {
            Command::Run { locator, file } => {
                assert_eq!(locator, "go-basics?lesson=hello");
                assert_eq!(file, Some(PathBuf::from("main.go")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn playground_defaults() {
        let cli = Cli::try_parse_from(["golearn", "playground"]).unwrap();
        assert!(matches!(cli.command, Command::Playground { example: None, file: None, list: false }));
    }
}
