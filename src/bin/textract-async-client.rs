use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::io::{self, Write};
use std::time::Duration;

use aws_sdk_textract::operation::get_document_analysis::GetDocumentAnalysisOutput;
use aws_sdk_textract::types::BlockType;
use tracing_subscriber::EnvFilter;

use textract_async_client::{
    AnalysisQuery, CancelToken, NonMatchingPolicy, NotificationResources, ProcessType,
    ProcessorConfig, TextractJobClient, WaitOptions, WatchEvent,
};

const DOTS_PER_LINE: usize = 40;

fn cli() -> Command {
    Command::new("textract-async-client")
        .arg(
            Arg::new("role-arn")
                .long("role-arn")
                .env("TEXTRACT_ROLE_ARN")
                .required(true),
        )
        .arg(
            Arg::new("bucket")
                .long("bucket")
                .env("TEXTRACT_BUCKET")
                .required(true),
        )
        .arg(
            Arg::new("document")
                .long("document")
                .env("TEXTRACT_DOCUMENT")
                .required(true),
        )
        .arg(
            Arg::new("region")
                .long("region")
                .env("AWS_REGION")
                .required(true),
        )
        .arg(
            Arg::new("access-key-id")
                .long("access-key-id")
                .env("AWS_ACCESS_KEY_ID")
                .required(false),
        )
        .arg(
            Arg::new("secret-access-key")
                .long("secret-access-key")
                .env("AWS_SECRET_ACCESS_KEY")
                .hide_env_values(true)
                .required(false),
        )
        .arg(
            Arg::new("poll-interval-secs")
                .long("poll-interval-secs")
                .default_value("5")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("timeout-secs")
                .long("timeout-secs")
                .required(false)
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("delete-unmatched")
                .long("delete-unmatched")
                .help("Delete notifications of other jobs instead of leaving them on the queue")
                .action(ArgAction::SetTrue),
        )
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand(
            Command::new("analyze").arg(
                Arg::new("query")
                    .long("query")
                    .help("Query text, optionally followed by =ALIAS")
                    .action(ArgAction::Append)
                    .value_parser(value_parser!(AnalysisQuery))
                    .required(true),
            ),
        )
        .subcommand(Command::new("provision"))
        .subcommand(
            Command::new("teardown")
                .arg(Arg::new("topic-arn").long("topic-arn").required(true))
                .arg(
                    Arg::new("queue-url")
                        .long("queue-url")
                        .value_parser(value_parser!(url::Url))
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("results").arg(Arg::new("job-id").long("job-id").required(true)),
        )
}

fn config_from_matches(matches: &ArgMatches) -> ProcessorConfig {
    let get = |name: &str| {
        matches
            .get_one::<String>(name)
            .cloned()
            .expect("required arg")
    };
    let mut config = ProcessorConfig::new(get("role-arn"), get("bucket"), get("document"), get("region"));
    config.access_key_id = matches.get_one::<String>("access-key-id").cloned();
    config.secret_access_key = matches.get_one::<String>("secret-access-key").cloned();
    config
}

fn options_from_matches(matches: &ArgMatches) -> WaitOptions {
    let poll_interval = matches
        .get_one::<u64>("poll-interval-secs")
        .expect("poll-interval-secs has a default value");
    WaitOptions {
        poll_interval: Duration::from_secs(*poll_interval),
        timeout: matches
            .get_one::<u64>("timeout-secs")
            .map(|s| Duration::from_secs(*s)),
        non_matching: if matches.get_flag("delete-unmatched") {
            NonMatchingPolicy::Delete
        } else {
            NonMatchingPolicy::Leave
        },
        ..WaitOptions::default()
    }
}

fn summarize(job_id: &str, pages: &[GetDocumentAnalysisOutput]) -> serde_json::Value {
    let query_results: Vec<serde_json::Value> = pages
        .iter()
        .flat_map(|p| p.blocks())
        .filter(|b| b.block_type() == Some(&BlockType::QueryResult))
        .map(|b| {
            serde_json::json!({
                "text": b.text(),
                "confidence": b.confidence(),
                "page": b.page(),
            })
        })
        .collect();

    serde_json::json!({
        "job_id": job_id,
        "job_status": pages.last().and_then(|p| p.job_status()).map(|s| s.as_str()),
        "result_pages": pages.len(),
        "document_pages": pages.first().and_then(|p| p.document_metadata()).and_then(|m| m.pages()),
        "blocks": pages.iter().map(|p| p.blocks().len()).sum::<usize>(),
        "query_results": query_results,
    })
}

fn progress_printer() -> impl FnMut(&WatchEvent<'_>) {
    let mut dot_line = 0;
    move |event| {
        if let WatchEvent::Idle = event {
            let mut err = io::stderr();
            if dot_line < DOTS_PER_LINE {
                let _ = write!(err, ".");
                dot_line += 1;
            } else {
                let _ = writeln!(err);
                dot_line = 0;
            }
            let _ = err.flush();
        }
    }
}

/// Prefers the processing error over the cleanup error, but never drops a
/// failed cleanup silently: the leaked resources are logged so they can be
/// removed with `teardown`.
fn after_cleanup<T>(
    processed: textract_async_client::Result<T>,
    teardown: textract_async_client::Result<()>,
    resources: &NotificationResources,
) -> textract_async_client::Result<T> {
    if let Err(e) = &teardown {
        tracing::error!(
            topic_arn = %resources.topic_arn,
            queue_url = %resources.queue_url,
            "failed to delete notification topic and queue: {}",
            e
        );
    }
    let value = processed?;
    teardown?;
    Ok(value)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let matches = cli().get_matches();
    let client =
        TextractJobClient::with_options(config_from_matches(&matches), options_from_matches(&matches))?;
    let cancel = CancelToken::new();
    client.cancel_on_ctrl_c(cancel.clone());

    let output: serde_json::Value;

    if let Some(matches) = matches.subcommand_matches("analyze") {
        let queries: Vec<AnalysisQuery> = matches
            .get_many::<AnalysisQuery>("query")
            .expect("query is required")
            .cloned()
            .collect();

        let resources = client.create_topic_and_queue()?;
        tracing::info!(
            topic_arn = %resources.topic_arn,
            queue_url = %resources.queue_url,
            "created notification resources"
        );
        let processed = client.start_document_analysis(ProcessType::Analysis, &queries, &resources).and_then(
            |session| {
                client
                    .wait_for_job_result(&session, &cancel, progress_printer())
                    .map(|pages| (session.job_id, pages))
            },
        );
        eprintln!();

        // the caller owns the topic and queue, so clean up even on failure
        let teardown = client.delete_topic_and_queue(&resources.topic_arn, &resources.queue_url);
        let (job_id, pages) = after_cleanup(processed, teardown, &resources)?;
        output = summarize(&job_id, &pages);
    } else if matches.subcommand_matches("provision").is_some() {
        output = serde_json::to_value(client.create_topic_and_queue()?)?;
    } else if let Some(matches) = matches.subcommand_matches("teardown") {
        let topic_arn = matches
            .get_one::<String>("topic-arn")
            .expect("topic-arn is required");
        let queue_url = matches
            .get_one::<url::Url>("queue-url")
            .expect("queue-url is required");
        client.delete_topic_and_queue(topic_arn, queue_url.as_str())?;
        output = serde_json::json!({ "deleted": { "topic_arn": topic_arn, "queue_url": queue_url.as_str() } });
    } else if let Some(matches) = matches.subcommand_matches("results") {
        let job_id = matches
            .get_one::<String>("job-id")
            .expect("job-id is required");
        let pages = client.get_results(job_id, &cancel)?;
        output = summarize(job_id, &pages);
    } else {
        unreachable!("subcommand is required");
    }

    Ok(serde_json::to_writer_pretty(io::stdout(), &output)?)
}
