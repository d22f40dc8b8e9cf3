use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};

use voicetutor::config::{Config, load_config};
use voicetutor::lessons::LessonStore;
use voicetutor::session::LanguageFamily;
use voicetutor::speech::{AudioHints, GoogleSpeechClient, GoogleTtsClient};
use voicetutor::{VoiceError, VoicePipeline};

/// Subcommand names, for the unknown-command hint
pub const COMMAND_NAMES: [&str; 8] = [
    "version",
    "chat",
    "transcribe",
    "speak",
    "lessons",
    "quiz",
    "lesson",
    "help",
];

#[derive(Parser)]
#[command(name = "voicetutor")]
#[command(about = "voicetutor - voice tutoring backend")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file (default: ~/.voicetutor/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Gemini model override
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Language code, e.g. bn-BD or en-US
    #[arg(short, long, global = true)]
    pub language: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Display version information
    Version,

    /// Send one text message in chat mode
    Chat {
        /// Message text
        text: String,
    },

    /// Transcribe an audio file
    Transcribe {
        /// Audio file (.wav or .webm; other formats are auto-detected)
        file: PathBuf,

        /// Write the transcript to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Sample rate hint in Hz
        #[arg(long)]
        rate: Option<u32>,
    },

    /// Synthesize speech to a WAV file
    Speak {
        /// Text to speak
        text: String,

        /// Output file (default: output.wav)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available lessons
    Lessons,

    /// Show the quiz for a lesson
    Quiz {
        /// Lesson id
        topic: String,
    },

    /// Start a lesson and optionally ask a follow-up question
    Lesson {
        /// Lesson id
        topic: String,

        /// Follow-up question asked after the introduction
        #[arg(long)]
        ask: Option<String>,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    if let Commands::Version = command {
        print_version();
        return Ok(());
    }

    let config = load_config(cli.model, cli.language, cli.config)?;
    let language = config.default_language.clone();

    match command {
        // Printed before the config is loaded
        Commands::Version => {}
        Commands::Chat { text } => {
            let pipeline = build_pipeline(&config)?;
            let reply = block_on(pipeline.chat_text(&text, &language))??;
            println!("{}", reply);
        }
        Commands::Transcribe { file, output, rate } => {
            let hints = transcribe_hints(&file, rate);
            let client = speech_client(&config)?;
            let transcript = block_on(client.transcribe_file(
                &file,
                hints,
                &language,
                output.as_deref(),
            ))?
            .map_err(VoiceError::transcription)?;

            if transcript.is_empty() {
                println!("No speech detected.");
            } else {
                println!("{}", transcript);
            }
        }
        Commands::Speak { text, output } => {
            let client = tts_client(&config)?;
            let path = block_on(client.synthesize_to_file(&text, &language, output.as_deref()))?
                .map_err(VoiceError::synthesis)?;
            println!("Audio saved to {}", path.display());
        }
        Commands::Lessons => {
            let store = LessonStore::new(&config.lessons_dir);
            let lessons = store.list_lessons().map_err(VoiceError::from)?;
            if lessons.is_empty() {
                println!("No lessons found in {}", config.lessons_dir.display());
            }
            for lesson in lessons {
                println!("{:<24} {} / {}", lesson.id, lesson.title_en, lesson.title_bn);
            }
        }
        Commands::Quiz { topic } => {
            let store = LessonStore::new(&config.lessons_dir);
            let quiz = store.quiz(&topic).map_err(VoiceError::from)?;
            let family = LanguageFamily::from_code(&language);
            for (index, question) in quiz.iter().enumerate() {
                println!("{}. {}", index + 1, question.question(family));
                for option in question.options(family) {
                    println!("   - {}", option);
                }
                println!("   Answer: {}", question.correct_answer(family));
            }
        }
        Commands::Lesson { topic, ask } => {
            let pipeline = build_pipeline(&config)?;
            block_on(async {
                let intro = pipeline.start_lesson_text(&topic, &language).await?;
                println!("{}", intro);
                if let Some(question) = ask {
                    let answer = pipeline.lesson_text(&question, &topic, &language).await?;
                    println!();
                    println!("{}", answer);
                }
                Ok::<(), VoiceError>(())
            })??;
        }
    }

    Ok(())
}

fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    Ok(runtime.block_on(future))
}

fn build_pipeline(config: &Config) -> Result<VoicePipeline> {
    Ok(VoicePipeline::from_config(config)?)
}

fn speech_client(config: &Config) -> Result<GoogleSpeechClient> {
    config
        .speech
        .validate()
        .and_then(|_| GoogleSpeechClient::try_from_config(&config.speech))
        .map_err(|e| VoiceError::config(e.to_string()).into())
}

fn tts_client(config: &Config) -> Result<GoogleTtsClient> {
    config
        .speech
        .validate()
        .and_then(|_| GoogleTtsClient::try_from_config(&config.speech))
        .map_err(|e| VoiceError::config(e.to_string()).into())
}

/// Hints from the file extension; `--rate` overrides the sample rate
fn transcribe_hints(file: &std::path::Path, rate: Option<u32>) -> AudioHints {
    let mut hints = AudioHints::detect(file.file_name().and_then(|n| n.to_str()), None);
    if rate.is_some() {
        hints.sample_rate_hertz = rate;
    }
    hints
}

pub fn extract_command_from_error(error_msg: &str) -> String {
    // Error messages look like "error: unrecognized subcommand 'foo'"
    if let Some(start) = error_msg.find('\'') {
        if let Some(end) = error_msg[start + 1..].find('\'') {
            return error_msg[start + 1..start + 1 + end].to_string();
        }
    }
    "unknown".to_string()
}

fn print_version() {
    println!("voicetutor {}", env!("CARGO_PKG_VERSION"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use voicetutor::speech::AudioEncoding;

    #[test]
    fn test_version_string_format() {
        let version = env!("CARGO_PKG_VERSION");
        let parts: Vec<&str> = version.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.parse::<u32>().is_ok()));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "voicetutor",
            "chat",
            "hello",
            "--language",
            "en-US",
            "--model",
            "gemini-2.5-flash",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.language.as_deref(), Some("en-US"));
        assert_eq!(cli.model.as_deref(), Some("gemini-2.5-flash"));
        assert!(matches!(cli.command, Some(Commands::Chat { ref text }) if text == "hello"));
    }

    #[test]
    fn test_parse_lesson_with_question() {
        let cli = Cli::try_parse_from(["voicetutor", "lesson", "plants", "--ask", "Why green?"]).unwrap();
        match cli.command {
            Some(Commands::Lesson { topic, ask }) => {
                assert_eq!(topic, "plants");
                assert_eq!(ask.as_deref(), Some("Why green?"));
            }
            _ => panic!("expected lesson command"),
        }
    }

    #[test]
    fn test_transcribe_hints() {
        let hints = transcribe_hints(Path::new("/tmp/clip.wav"), None);
        assert_eq!(hints, AudioHints::wav());

        let hints = transcribe_hints(Path::new("/tmp/clip.wav"), Some(44_100));
        assert_eq!(hints.encoding, AudioEncoding::Linear16);
        assert_eq!(hints.sample_rate_hertz, Some(44_100));

        let hints = transcribe_hints(Path::new("clip.webm"), None);
        assert_eq!(hints.sample_rate_hertz, None);
    }

    #[test]
    fn test_extract_command_from_error() {
        assert_eq!(
            extract_command_from_error("error: unrecognized subcommand 'foo_bar'"),
            "foo_bar"
        );
        assert_eq!(extract_command_from_error("no command here"), "unknown");
    }

    #[test]
    fn test_command_names_match_definition() {
        let command = Cli::command();
        for sub in command.get_subcommands() {
            assert!(COMMAND_NAMES.contains(&sub.get_name()));
        }
    }
}
