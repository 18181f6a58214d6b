use std::{
   fs,
   io::{
      self,
      Read as _,
      Write as _,
   },
   path::PathBuf,
};

use clap::Parser as _;
use kiln::{
   Config,
   error::{
      self,
      Contextful as _,
   },
   runtime::{
      self,
      Context,
      DirPath,
      Path,
      RunState,
      Sink,
      Source,
      value::pipe::{
         JsonSink,
         JsonSource,
      },
   },
   syntax,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const FAIL_STDOUT: &str = "failed to write to stdout";

#[derive(clap::Parser)]
#[command(version, about)]
struct Cli {
   /// Path to the configuration file.
   #[arg(long, global = true)]
   config: Option<PathBuf>,

   #[command(subcommand)]
   command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
enum Command {
   /// Evaluate a script, then call its main.
   Run {
      /// The script to run.
      path: PathBuf,
   },

   /// Various commands related to debugging.
   Dump {
      #[command(subcommand)]
      command: Dump,

      /// The file to dump. If set to '-', stdin is read.
      #[arg(default_value = "-", global = true)]
      path: PathBuf,
   },
}

#[derive(clap::Subcommand, Debug, Clone, Copy)]
enum Dump {
   /// Dump the provided file's tokens.
   Tokens,

   /// Dump the provided file's forms, one per line.
   Forms,
}

#[tokio::main]
async fn main() -> error::Termination {
   let cli = Cli::parse();

   start(cli).await.into()
}

async fn start(cli: Cli) -> error::Result<()> {
   let config = Config::load(cli.config.as_deref())?;

   let filter = EnvFilter::try_from_env("KILN_LOG")
      .or_else(|_| EnvFilter::try_new(config.log.as_deref().unwrap_or("warn")))
      .context("invalid log filter")?;

   tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(io::stderr)
      .init();

   match cli.command {
      Command::Run { path } => run(config, path).await,
      Command::Dump { command, path } => dump(command, &path),
   }
}

async fn run(config: Config, path: PathBuf) -> error::Result<()> {
   let cancellation = CancellationToken::new();

   tokio::spawn({
      let cancellation = cancellation.clone();

      async move {
         if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling evaluation");
            cancellation.cancel();
         }
      }
   });

   let evaluation = tokio::task::spawn_blocking(move || -> error::Result<()> {
      let dir = path
         .parent()
         .map_or(Some(""), |parent| parent.to_str())
         .context("script path is not valid UTF-8")?;

      let state = RunState::builder()
         .dir(Path::Dir(DirPath::new(if dir.is_empty() { "." } else { dir })))
         .env(config.env_scope())
         .stdin(Source::new(JsonSource::new("stdin", io::stdin())))
         .stdout(Sink::new(JsonSink::new("stdout", io::stdout())))
         .build();

      let context = Context::with_cancellation(cancellation);
      let scope = state.scope(&runtime::ground::new());

      runtime::eval_file(&context, &scope, &path).with_context(|| {
         format!("failed to evaluate '{path}'", path = path.display())
      })?;

      runtime::run_main(&context, &scope).context("main failed")?;

      Ok(())
   });

   evaluation.await.context("evaluation task panicked")?
}

fn dump(command: Dump, path: &std::path::Path) -> error::Result<()> {
   let source = if path.as_os_str() == "-" {
      let mut source = String::new();
      io::stdin()
         .read_to_string(&mut source)
         .context("failed to read stdin")?;
      source
   } else {
      fs::read_to_string(path)
         .with_context(|| format!("failed to read '{path}'", path = path.display()))?
   };

   let out = &mut io::stdout().lock();

   match command {
      Dump::Tokens => {
         for token in syntax::tokenize(&source) {
            let syntax::Token {
               kind,
               text,
               position,
            } = token.context("failed to tokenize")?;

            writeln!(out, "{position} {kind:?} {text:?}").context(FAIL_STDOUT)?;
         }
      },

      Dump::Forms => {
         for form in runtime::Reader::new(source.as_bytes()) {
            let form = form.context("failed to read")?;

            writeln!(out, "{form}").context(FAIL_STDOUT)?;
         }
      },
   }

   out.flush().context(FAIL_STDOUT)
}
