//! CLI for Editify - image editing with Gemini.

use clap::{Args, Parser, Subcommand};
use editify::bridge::{EditOutcome, GenerationBridge};
use editify::config::{parse_timeout_secs, Config};
use editify::image::providers::{GeminiEditor, GeminiModel};
use editify::session::{EditorSession, NoticeLevel, Screen, DOWNLOAD_FILE_NAME};
use editify::store::FileStore;
use editify::{ApiKey, ImageEditor, SourceImage};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "editify")]
#[command(about = "Edit images with natural-language instructions via Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Seconds to wait for the vendor before giving up
    #[arg(long, global = true, value_name = "SECS", value_parser = parse_timeout_secs)]
    timeout: Option<Duration>,

    /// Gemini model identifier
    #[arg(long, global = true)]
    model: Option<GeminiModel>,

    /// API endpoint override
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Directory holding the stored API key
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and store an API key
    Login(LoginArgs),

    /// Forget the stored API key
    Logout,

    /// Show whether an API key is stored
    Status,

    /// Edit one image and save the result
    Edit(EditArgs),

    /// Interactive editor
    Shell,
}

#[derive(Args)]
struct LoginArgs {
    /// The API key (read from stdin when omitted)
    key: Option<String>,

    /// Also check the key against the API
    #[arg(long)]
    verify: bool,
}

#[derive(Args)]
struct EditArgs {
    /// What to change in the image
    instruction: String,

    /// Image to edit (at most 1 MiB)
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path
    #[arg(short, long, conflicts_with = "dir")]
    output: Option<PathBuf>,

    /// Directory to save the result in, as gemini-generated-image.jpg
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Key to use instead of the stored one
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

type Session = EditorSession<GeminiEditor, FileStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = build_config(&cli)?;

    match cli.command {
        Commands::Login(args) => login(&config, args, cli.json).await?,
        Commands::Logout => logout(&config, cli.json)?,
        Commands::Status => status(&config, cli.json)?,
        Commands::Edit(args) => edit(&config, args, cli.json).await?,
        Commands::Shell => run_shell(&config).await?,
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "editify=warn",
        1 => "editify=info",
        _ => "editify=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(timeout) = cli.timeout {
        config = config.with_timeout(timeout);
    }
    if let Some(model) = &cli.model {
        config = config.with_model(model.clone());
    }
    if let Some(url) = &cli.base_url {
        config = config.with_base_url(url);
    }
    if let Some(dir) = &cli.state_dir {
        config = config.with_state_dir(dir);
    }
    Ok(config)
}

fn open_session(config: &Config) -> anyhow::Result<Session> {
    Ok(EditorSession::new(
        config.build_bridge()?,
        config.credential_store()?,
    )?)
}

async fn login(config: &Config, args: LoginArgs, json_output: bool) -> anyhow::Result<()> {
    let input = match args.key {
        Some(key) => key,
        None => {
            eprint!("Enter your Gemini API key: ");
            std::io::stderr().flush()?;
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            line
        }
    };

    let mut session = open_session(config)?;

    if args.verify {
        let key = ApiKey::parse(&input)?;
        session.bridge().editor().health_check(&key).await?;
    }

    if let Err(err) = session.submit_credential(&input) {
        anyhow::bail!(session
            .credential_error()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string()));
    }

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "key": session.api_key().map(ApiKey::masked),
            "verified": args.verify,
            "state_file": config.state_file()?.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for notice in session.drain_notices() {
            println!("{}", notice.message);
        }
    }
    Ok(())
}

fn logout(config: &Config, json_output: bool) -> anyhow::Result<()> {
    let mut session = open_session(config)?;
    session.logout()?;

    if json_output {
        println!("{}", serde_json::json!({ "success": true }));
    } else {
        println!("Stored API key removed.");
    }
    Ok(())
}

fn status(config: &Config, json_output: bool) -> anyhow::Result<()> {
    let session = open_session(config)?;
    let key = session.api_key().map(ApiKey::masked);
    let state_file = config.state_file()?;

    if json_output {
        let result = serde_json::json!({
            "screen": session.screen(),
            "key": key,
            "model": config.model.as_str(),
            "timeout_secs": config.timeout.as_secs(),
            "state_file": state_file.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        match key {
            Some(key) => println!("API key: {key}"),
            None => println!("No API key stored. Run `editify login`."),
        }
        println!("Model: {}", config.model);
        println!("Timeout: {}s", config.timeout.as_secs());
        println!("State file: {}", state_file.display());
    }
    Ok(())
}

async fn edit(config: &Config, args: EditArgs, json_output: bool) -> anyhow::Result<()> {
    let key = match args.api_key {
        Some(key) => key,
        None => match config.credential_store()?.load()? {
            Some(key) => key.expose().to_string(),
            None => anyhow::bail!("No API key stored. Run `editify login` or set GEMINI_API_KEY."),
        },
    };

    let image = SourceImage::from_path(&args.input)?;
    let bridge: GenerationBridge<GeminiEditor> = config.build_bridge()?;
    let outcome = bridge
        .generate(&key, image.to_base64(), &args.instruction)
        .await;

    let edited = match &outcome {
        EditOutcome::Success(edited) => edited,
        EditOutcome::Failure(err) => {
            if json_output {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                if let Some(text) = err.text() {
                    eprintln!("{text}");
                }
                if err.is_retryable() {
                    eprintln!("This may work if you try again.");
                }
            }
            anyhow::bail!("{err}");
        }
    };

    let output = match (args.output, args.dir) {
        (Some(path), _) => path,
        (None, Some(dir)) => dir.join(DOWNLOAD_FILE_NAME),
        (None, None) => PathBuf::from(DOWNLOAD_FILE_NAME),
    };
    edited.save(&output)?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "output": output.display().to_string(),
            "text": edited.text,
            "model": edited.model,
            "duration_ms": edited.duration_ms,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        if let Some(text) = &edited.text {
            println!("{text}");
        }
        println!("Edited image: {}", output.display());
        if let Some(duration) = edited.duration_ms {
            println!("Duration: {duration}ms");
        }
    }
    Ok(())
}

/// One line of shell input.
#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Key(String),
    Open(PathBuf),
    Edit(String),
    Save(Option<PathBuf>),
    New,
    Logout,
    Status,
    Help,
    Quit,
}

impl ShellCommand {
    fn parse(line: &str) -> Result<Self, String> {
        let (word, rest) = match line.trim().split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line.trim(), ""),
        };
        let required = |what: &str| {
            if rest.is_empty() {
                Err(format!("usage: {word} <{what}>"))
            } else {
                Ok(rest.to_string())
            }
        };

        match word.to_lowercase().as_str() {
            "key" => required("api-key").map(Self::Key),
            "open" => required("path").map(|p| Self::Open(PathBuf::from(p))),
            "edit" => required("instruction").map(Self::Edit),
            "save" => Ok(Self::Save((!rest.is_empty()).then(|| PathBuf::from(rest)))),
            "new" => Ok(Self::New),
            "logout" => Ok(Self::Logout),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command `{other}`, try `help`")),
        }
    }
}

const SHELL_HELP: &str = "\
Commands:
  key <API_KEY>       enter your Gemini API key
  open <PATH>         select an image (max 1 MiB)
  edit <INSTRUCTION>  edit the selected image
  save [DIR]          save the result as gemini-generated-image.jpg
  new                 clear image and result
  logout              forget the API key
  status              show current state
  quit                leave";

async fn run_shell(config: &Config) -> anyhow::Result<()> {
    let mut session = open_session(config)?;
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    println!("Editify image editor. Type `help` for commands.");
    print_status(&session);
    prompt(&session)?;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            prompt(&session)?;
            continue;
        }

        match ShellCommand::parse(&line) {
            Ok(ShellCommand::Quit) => break,
            Ok(command) => run_shell_command(&mut session, command).await,
            Err(msg) => println!("{msg}"),
        }

        for notice in session.drain_notices() {
            let marker = match notice.level {
                NoticeLevel::Success => "✓",
                NoticeLevel::Error => "✗",
                NoticeLevel::Info => "•",
            };
            println!("{marker} {}", notice.message);
        }
        prompt(&session)?;
    }
    Ok(())
}

async fn run_shell_command(session: &mut Session, command: ShellCommand) {
    // Failures already produce a notice or are reported here; the shell keeps going.
    let result = match command {
        ShellCommand::Key(key) => session.submit_credential(&key),
        ShellCommand::Open(path) => session.open_image(path).map(|()| {
            if let Some(image) = session.source_image() {
                println!("Selected image ({} bytes)", image.size());
            }
        }),
        ShellCommand::Edit(instruction) => {
            println!("Generating…");
            session.generate(&instruction).await.map(|outcome| {
                if let Some(text) = outcome.text() {
                    println!("{text}");
                }
            })
        }
        ShellCommand::Save(dir) => {
            let dir = dir.unwrap_or_else(|| PathBuf::from("."));
            session.save_result(dir).map(|_| ())
        }
        ShellCommand::New => session.reset(),
        ShellCommand::Logout => session.logout(),
        ShellCommand::Status => {
            print_status(session);
            Ok(())
        }
        ShellCommand::Help => {
            println!("{SHELL_HELP}");
            Ok(())
        }
        ShellCommand::Quit => Ok(()),
    };

    if let Err(err) = result {
        let reported = session
            .notices()
            .last()
            .is_some_and(|n| n.level == NoticeLevel::Error);
        if !reported {
            println!("✗ {err}");
        }
    }
}

fn print_status(session: &Session) {
    match session.screen() {
        Screen::CredentialEntry => {
            println!("Enter your API key with `key <API_KEY>`.");
            println!("Get one from Google AI Studio: https://aistudio.google.com/app/apikey");
        }
        Screen::Editing => {
            if let Some(key) = session.api_key() {
                println!("Using API key {key}");
            }
            match session.source_image() {
                Some(image) => println!(
                    "Image: {} ({} bytes)",
                    image.file_name().unwrap_or("<memory>"),
                    image.size()
                ),
                None => println!("No image selected. Use `open <PATH>`."),
            }
            if let Some(result) = session.result() {
                println!(
                    "Result ready ({} base64 chars). Use `save [DIR]`.",
                    result.image_data.len()
                );
            }
        }
    }
}

fn prompt(session: &Session) -> std::io::Result<()> {
    let label = match session.screen() {
        Screen::CredentialEntry => "key",
        Screen::Editing => "edit",
    };
    print!("{label}> ");
    std::io::stdout().flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shell_commands() {
        assert_eq!(
            ShellCommand::parse("edit add a llama"),
            Ok(ShellCommand::Edit("add a llama".into()))
        );
        assert_eq!(
            ShellCommand::parse("  open  photos/cat.jpg "),
            Ok(ShellCommand::Open(PathBuf::from("photos/cat.jpg")))
        );
        assert_eq!(ShellCommand::parse("save"), Ok(ShellCommand::Save(None)));
        assert_eq!(
            ShellCommand::parse("save out"),
            Ok(ShellCommand::Save(Some(PathBuf::from("out"))))
        );
        assert_eq!(ShellCommand::parse("EXIT"), Ok(ShellCommand::Quit));
    }

    #[test]
    fn test_parse_shell_errors() {
        assert_eq!(
            ShellCommand::parse("edit"),
            Err("usage: edit <instruction>".to_string())
        );
        assert!(ShellCommand::parse("dance").is_err());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();

        let cli = Cli::try_parse_from([
            "editify", "edit", "-i", "in.jpg", "-d", "out", "add a llama", "--timeout", "10",
        ])
        .unwrap();
        assert_eq!(cli.timeout, Some(Duration::from_secs(10)));
        assert!(matches!(cli.command, Commands::Edit(ref a) if a.instruction == "add a llama"));
    }

    #[test]
    fn test_cli_rejects_bad_values() {
        for bad in ["0", "soon"] {
            let err = Cli::try_parse_from(["editify", "--timeout", bad, "status"]);
            assert!(err.is_err(), "{bad:?}");
        }
        assert!(Cli::try_parse_from(["editify", "--model", "", "status"]).is_err());

        let cli =
            Cli::try_parse_from(["editify", "--model", "gemini-2.5-flash-image", "status"]).unwrap();
        assert_eq!(cli.model, Some(GeminiModel::FlashImage));
    }
}
