use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use transmem::{
    DeepLProvider, DispatchPolicy, MachineTranslator, MockMode, MockTranslator, OutputTargets,
    Pipeline, PipelineConfig, PipelineError, applied_path, apply_token_map,
};

#[derive(Parser, Debug)]
#[command(
    name = "transmem",
    version,
    about = "Translate block/segment JSON documents through a persistent translation memory"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a document, reusing and growing the translation memory
    Translate(TranslateArgs),
    /// Merge a token map export back into the original document
    Apply(ApplyArgs),
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Input document (block id → { text, segments })
    #[arg(short, long)]
    input: PathBuf,

    /// Translated document
    #[arg(short, long, default_value = "translations.json")]
    output: PathBuf,

    /// Target language code (e.g. FR, DE, EN-GB)
    #[arg(short = 'l', long = "lang")]
    target_lang: String,

    /// Source language to translate from; others pass through
    #[arg(long)]
    primary_lang: Option<String>,

    /// Second accepted source language
    #[arg(long)]
    secondary_lang: Option<String>,

    /// Directory holding translation_memory_<lang>.json
    #[arg(short = 'm', long, default_value = "translation_memory")]
    memory_dir: PathBuf,

    /// Also write translated_<input name> next to the input
    #[arg(short, long)]
    apply: bool,

    /// Export segment id → text
    #[arg(short, long)]
    segments: Option<PathBuf>,

    /// Export the flat token → text map
    #[arg(long = "tokens")]
    token_map: Option<PathBuf>,

    /// Write reused/added strings
    #[arg(long)]
    usage: Option<PathBuf>,

    /// Do nothing beyond writing outputs when every string is cached
    #[arg(long)]
    skip_if_cached: bool,

    #[arg(long, value_enum, default_value_t = DispatchPolicy::DetectThenTranslate)]
    policy: DispatchPolicy,

    #[arg(long, default_value_t = transmem::dispatch::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Refuse documents with more characters of text than this
    #[arg(long)]
    max_chars: Option<usize>,

    /// Use the mock translator instead of DeepL
    #[arg(long)]
    mock: bool,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Original document
    #[arg(long)]
    original: PathBuf,

    /// Token map produced by `translate --tokens`
    #[arg(long)]
    translations: PathBuf,

    #[arg(short, long)]
    output: PathBuf,
}

impl TranslateArgs {
    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            target_lang: self.target_lang.clone(),
            primary_lang: self.primary_lang.clone(),
            secondary_lang: self.secondary_lang.clone(),
            memory_dir: self.memory_dir.clone(),
            policy: self.policy,
            batch_size: self.batch_size,
            max_chars: self.max_chars,
            skip_if_cached: self.skip_if_cached,
            outputs: OutputTargets {
                output: self.output.clone(),
                segments: self.segments.clone(),
                token_map: self.token_map.clone(),
                usage: self.usage.clone(),
                applied: self.apply.then(|| applied_path(&self.input)),
            },
            ..PipelineConfig::default()
        }
    }
}

async fn translate(args: TranslateArgs) -> Result<(), PipelineError> {
    // Credentials are checked before touching any file
    let translator: Box<dyn MachineTranslator> = if args.mock {
        Box::new(MockTranslator::new(MockMode::Suffix))
    } else {
        Box::new(DeepLProvider::from_env()?)
    };

    let pipeline = Pipeline::new(args.config(), translator.as_ref())?;
    let summary = pipeline.run(&args.input).await?;

    info!(
        "{} strings: {} from memory, {} translated, {} passed through ({} of {} batches failed)",
        summary.tokens,
        summary.cached,
        summary.translated,
        summary.passed_through,
        summary.failed_batches,
        summary.batches
    );
    println!("Translation written to {}", args.output.display());
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Translate(args) => translate(args).await,
        Command::Apply(args) => {
            apply_token_map(&args.original, &args.translations, &args.output).map(|_| ())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            if let PipelineError::Backend(mt) = &e {
                if mt.is_config() {
                    eprintln!("Set {} or use --mock", transmem::mt::deepl::AUTH_KEY_VAR);
                }
            }
            ExitCode::FAILURE
        }
    }
}
