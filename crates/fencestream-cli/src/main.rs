use anyhow::{Context, Result};
use fencestream_config::{Config, DrawLookupSetting, OutputFormat};
use fencestream_engine::{
    BlockParser, DrawLookup, Message, MessageKind, MessageResolver, ParserOptions, Session,
};
use std::{
    env,
    io::{self, Read},
    process,
};

struct Args {
    input: Option<String>,
    chunk_size: Option<usize>,
    output: Option<OutputFormat>,
}

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {program} [transcript-file|-] [--chunk-size N] [--output messages|actions|json]"
    );
    process::exit(1);
}

fn parse_args(args: &[String]) -> Args {
    let program = args.first().map(String::as_str).unwrap_or("fencestream-cli");
    let mut parsed = Args {
        input: None,
        chunk_size: None,
        output: None,
    };

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--chunk-size" => {
                let Some(value) = rest.next() else {
                    usage(program)
                };
                match value.parse::<usize>() {
                    Ok(n) if n > 0 => parsed.chunk_size = Some(n),
                    _ => {
                        eprintln!("Error: --chunk-size expects a positive integer, got '{value}'");
                        process::exit(1);
                    }
                }
            }
            "--output" => {
                let Some(value) = rest.next() else {
                    usage(program)
                };
                match value.parse::<OutputFormat>() {
                    Ok(format) => parsed.output = Some(format),
                    Err(e) => {
                        eprintln!("Error: {e}");
                        process::exit(1);
                    }
                }
            }
            "-h" | "--help" => usage(program),
            other if other.starts_with("--") => {
                eprintln!("Error: unknown option '{other}'");
                usage(program)
            }
            other => {
                if parsed.input.is_some() {
                    usage(program)
                }
                parsed.input = Some(other.to_string());
            }
        }
    }
    parsed
}

fn read_transcript(input: Option<&str>) -> Result<String> {
    match input {
        None | Some("-") => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read transcript from stdin")?;
            Ok(text)
        }
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read transcript file '{path}'")),
    }
}

/// Splits on character boundaries so multi-byte text survives chunking.
fn chunk_chars(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

fn build_session(config: &Config) -> Session {
    let options = ParserOptions {
        max_block_bytes: config.parser.max_block_bytes,
        reject_malformed_heads: config.parser.reject_malformed_heads,
    };
    let draw_lookup = match config.parser.draw_lookup {
        DrawLookupSetting::LastMessage => DrawLookup::LastMessage,
        DrawLookupSetting::RunningForPage => DrawLookup::RunningForPage,
    };
    Session::new(
        BlockParser::new(options),
        MessageResolver::new().with_draw_lookup(draw_lookup),
    )
}

fn describe(message: &Message) -> String {
    let page = message.page.as_deref().unwrap_or("-");
    let running = if message.running { " (running)" } else { "" };
    let body = match &message.kind {
        MessageKind::User { content, .. } | MessageKind::Assistant { content } => {
            format!(": {content:?}")
        }
        MessageKind::Page { page_type } => format!(": {page_type}"),
        MessageKind::Draw { input, result } => match result {
            Some(result) => format!(": {input:?} -> {result:?}"),
            None => format!(": {input:?}"),
        },
        _ => String::new(),
    };
    format!("[{}] {page}{running}{body}", message.kind.label())
}

fn print_session(session: &Session, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Messages => {
            for message in session.messages() {
                println!("{}", describe(message));
            }
        }
        OutputFormat::Actions => {
            for action in session.actions() {
                println!("{}", serde_json::to_string(action)?);
            }
        }
        OutputFormat::Json => {
            let snapshot = serde_json::json!({
                "messages": session.messages(),
                "pages": session.board().pages(),
            });
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    let parsed = parse_args(&args);

    let config = match Config::load() {
        Ok(Some(config)) => {
            log::info!("Loaded config from {}", Config::config_path().display());
            config
        }
        Ok(None) => Config::default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let chunk_size = parsed.chunk_size.unwrap_or(config.replay.chunk_size);
    let output = parsed.output.unwrap_or(config.replay.output);

    let transcript = read_transcript(parsed.input.as_deref())?;
    let chunks = chunk_chars(&transcript, chunk_size);
    log::info!(
        "Replaying {} chars in {} chunks of {chunk_size}",
        transcript.chars().count(),
        chunks.len()
    );

    let mut session = build_session(&config);
    for chunk in &chunks {
        if let Err(e) = session.push_chunk(chunk) {
            log::warn!("{e}");
        }
    }
    if let Err(e) = session.finish() {
        log::warn!("{e}");
    }

    print_session(&session, output)
}
