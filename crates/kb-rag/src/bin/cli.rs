//! kb-rag command-line tool
//!
//! Run with: cargo run -p kb-rag -- query --kb-id HBPKZNSUMS

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kb_rag::admin::{diagnose, update_generation_model, wait_for_status, UpdateStatus};
use kb_rag::config::{KbRagConfig, RdsConfig};
use kb_rag::generation::{format_references, format_search_results};
use kb_rag::inspection::check_pdf;
use kb_rag::providers::aws::{
    foundation_model_arn, parse_s3_uri, AwsAuth, BedrockAgentClient, BedrockKnowledgeBase,
    vector_table_queries, BedrockRuntime, RdsDataClient, S3ObjectStore, StatementResult,
    KB_VECTOR_TABLE,
};
use kb_rag::providers::KnowledgeBaseAdmin;
use kb_rag::retrieval::RetrievalAdapter;
use kb_rag::types::{RetrievalQuery, SearchType};
use kb_rag::{PipelineOutcome, QueryAnswerPipeline};

#[derive(Parser)]
#[command(
    name = "kb-rag",
    version,
    about = "Query and administer Amazon Bedrock knowledge bases"
)]
struct Cli {
    /// Config file (defaults to <config dir>/kb-rag/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// AWS region override
    #[arg(long, global = true)]
    region: Option<String>,

    /// Verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a question from the knowledge base (interactive without --query)
    Query {
        #[arg(long)]
        kb_id: Option<String>,
        /// Generation model ID
        #[arg(long)]
        model_id: Option<String>,
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        max_results: Option<usize>,
        /// hybrid or semantic
        #[arg(long)]
        search_type: Option<SearchType>,
        /// Skip the domain check
        #[arg(long)]
        no_validate: bool,
        /// Domain questions must be about
        #[arg(long)]
        domain: Option<String>,
    },

    /// Show ranked passages without generating an answer
    Retrieve {
        query: String,
        #[arg(long)]
        kb_id: Option<String>,
        #[arg(long)]
        max_results: Option<usize>,
        #[arg(long)]
        search_type: Option<SearchType>,
    },

    /// Let Bedrock retrieve and generate in one call
    Ask {
        query: String,
        #[arg(long)]
        kb_id: Option<String>,
        /// Model ID or ARN
        #[arg(long)]
        model_id: Option<String>,
        #[arg(long)]
        max_results: Option<usize>,
    },

    /// Run a SQL statement through the RDS Data API
    Sql {
        #[arg(required_unless_present = "inspect_kb_table")]
        sql: Option<String>,
        /// Describe a knowledge-base vector table (schema.table)
        #[arg(
            long,
            num_args = 0..=1,
            default_missing_value = KB_VECTOR_TABLE,
            conflicts_with = "sql"
        )]
        inspect_kb_table: Option<String>,
        #[arg(long)]
        database: Option<String>,
        #[arg(long)]
        resource_arn: Option<String>,
        #[arg(long)]
        secret_arn: Option<String>,
    },

    /// Check whether a PDF has extractable text
    CheckPdf {
        /// s3://bucket/key
        uri: Option<String>,
        #[arg(long, conflicts_with = "uri")]
        bucket: Option<String>,
        #[arg(long, requires = "bucket")]
        key: Option<String>,
        /// Local file instead of S3
        #[arg(long, conflicts_with_all = ["uri", "bucket"])]
        file: Option<PathBuf>,
    },

    /// Point a knowledge base at a different generation model
    UpdateModel {
        /// Model ID or ARN
        model: String,
        #[arg(long)]
        kb_id: Option<String>,
        /// Return right after submitting the update
        #[arg(long)]
        no_wait: bool,
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Print status, data sources and ingestion jobs of a knowledge base
    Describe {
        #[arg(long)]
        kb_id: Option<String>,
        /// Also list every knowledge base in the region
        #[arg(long)]
        list: bool,
    },
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "kb_rag=info",
        1 => "kb_rag=debug",
        _ => "kb_rag=trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn rule(c: char) -> String {
    c.to_string().repeat(80)
}

fn load_config(cli: &Cli) -> anyhow::Result<KbRagConfig> {
    let mut config = KbRagConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(region) = &cli.region {
        config.aws.region = region.clone();
    }
    Ok(config)
}

fn knowledge_base_id(config: &mut KbRagConfig, kb_id: Option<String>) -> anyhow::Result<String> {
    if let Some(id) = kb_id {
        config.knowledge_base.id = id;
    }
    Ok(config.require_knowledge_base()?.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(&cli)?;

    match cli.command {
        Command::Query {
            kb_id,
            model_id,
            query,
            max_results,
            search_type,
            no_validate,
            domain,
        } => {
            let kb_id = knowledge_base_id(&mut config, kb_id)?;
            if let Some(model_id) = model_id {
                config.generation.model_id = model_id;
            }
            if let Some(max_results) = max_results {
                config.knowledge_base.max_results = max_results;
            }
            if let Some(search_type) = search_type {
                config.knowledge_base.search_type = search_type;
            }
            if let Some(domain) = domain {
                config.validation.domain = domain;
            }
            if no_validate {
                config.validation.enabled = false;
            }
            config.validate()?;

            let auth = Arc::new(AwsAuth::from_config(&config.aws)?);
            let pipeline = QueryAnswerPipeline::new(
                Arc::new(BedrockKnowledgeBase::new(auth.clone(), &config.http)?),
                Arc::new(BedrockRuntime::new(auth, &config.http)?),
                &config,
            );

            match query {
                Some(query) => run_query(&pipeline, &config, &query, &kb_id).await?,
                None => interactive(&pipeline, &config, &kb_id).await?,
            }
        }

        Command::Retrieve {
            query,
            kb_id,
            max_results,
            search_type,
        } => {
            let kb_id = knowledge_base_id(&mut config, kb_id)?;
            let auth = Arc::new(AwsAuth::from_config(&config.aws)?);
            let mut adapter = RetrievalAdapter::new(
                Arc::new(BedrockKnowledgeBase::new(auth, &config.http)?),
                &config.knowledge_base,
            );
            if let Some(search_type) = search_type {
                adapter = adapter.with_search_type(search_type);
            }

            let pb = spinner("Searching knowledge base...");
            let outcome = adapter.retrieve(&query, &kb_id, max_results).await?;
            pb.finish_and_clear();

            if let Some(error) = outcome.error {
                bail!("Error querying knowledge base: {}", error);
            }
            println!("{}", format_search_results(&outcome.passages));
        }

        Command::Ask {
            query,
            kb_id,
            model_id,
            max_results,
        } => {
            let kb_id = knowledge_base_id(&mut config, kb_id)?;
            let auth = Arc::new(AwsAuth::from_config(&config.aws)?);
            let model_arn = foundation_model_arn(
                auth.region(),
                model_id.as_deref().unwrap_or(&config.generation.model_id),
            );
            let kb = BedrockKnowledgeBase::new(auth, &config.http)?;
            let request = RetrievalQuery {
                text: query,
                knowledge_base_id: kb_id,
                max_results: max_results.unwrap_or(config.knowledge_base.max_results),
                search_type: config.knowledge_base.search_type,
            };
            if request.max_results == 0 {
                bail!("--max-results must be at least 1");
            }

            let pb = spinner("Querying knowledge base...");
            let answer = kb.retrieve_and_generate(&request, &model_arn).await;
            pb.finish_and_clear();
            let answer = answer.context("RetrieveAndGenerate failed")?;

            println!("{}", rule('='));
            println!("{}", style("RESPONSE:").bold());
            println!("{}", rule('-'));
            println!("{}", answer.text.trim());
            println!("\n{}", style("REFERENCES:").bold());
            println!("{}", rule('-'));
            println!("{}", format_references(&answer.passages));
            println!("{}", rule('='));
        }

        Command::Sql {
            sql,
            inspect_kb_table,
            database,
            resource_arn,
            secret_arn,
        } => {
            let mut target = match (resource_arn, secret_arn, config.rds.clone()) {
                (Some(resource_arn), Some(secret_arn), _) => RdsConfig {
                    resource_arn,
                    secret_arn,
                    database: database.clone().unwrap_or_default(),
                },
                (resource_arn, secret_arn, Some(mut rds)) => {
                    if let Some(arn) = resource_arn {
                        rds.resource_arn = arn;
                    }
                    if let Some(arn) = secret_arn {
                        rds.secret_arn = arn;
                    }
                    rds
                }
                _ => config.require_rds()?.clone(),
            };
            if let Some(database) = database {
                target.database = database;
            }
            if target.database.is_empty() {
                bail!("No database given (set rds.database or --database)");
            }

            let auth = Arc::new(AwsAuth::from_config(&config.aws)?);
            let client = RdsDataClient::new(auth, &config.http)?;

            let statements = match (inspect_kb_table, sql) {
                (Some(table), _) => vector_table_queries(&table)?
                    .into_iter()
                    .map(|(label, sql)| (Some(label), sql))
                    .collect(),
                (None, Some(sql)) => vec![(None, sql)],
                (None, None) => bail!("No SQL statement given"),
            };

            for (label, sql) in statements {
                match label {
                    Some(label) => println!("\n{}", style(format!("=== {} ===", label)).bold()),
                    None => println!("Executing query: {}", sql.trim()),
                }
                print_statement_result(client.execute_statement(&sql, &target).await?)?;
            }
        }

        Command::CheckPdf {
            uri,
            bucket,
            key,
            file,
        } => {
            let (name, bytes) = match (file, uri, bucket, key) {
                (Some(path), _, _, _) => {
                    let bytes = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    (path.display().to_string(), bytes)
                }
                (None, Some(uri), _, _) => {
                    let (bucket, key) = parse_s3_uri(&uri)
                        .with_context(|| format!("Not an s3://bucket/key URI: {}", uri))?;
                    (uri.clone(), download(&config, bucket, key).await?)
                }
                (None, None, Some(bucket), Some(key)) => {
                    let bytes = download(&config, &bucket, &key).await?;
                    (format!("s3://{}/{}", bucket, key), bytes)
                }
                _ => bail!("Give an s3:// URI, --bucket with --key, or --file"),
            };

            let report = tokio::task::spawn_blocking(move || check_pdf(&name, &bytes)).await??;

            println!("\n=== PDF Information ===");
            println!("Number of pages: {}", report.page_count);
            println!("\n=== First 500 characters of text ===");
            println!("{}", report.first_page_preview);
            if report.extractable {
                println!(
                    "\n{}",
                    style("Text extraction successful. PDF appears to contain extractable text.").green()
                );
            } else {
                println!(
                    "\n{}",
                    style("WARNING: Very little text extracted. This might be a scanned PDF.").yellow()
                );
            }
        }

        Command::UpdateModel {
            model,
            kb_id,
            no_wait,
            timeout_secs,
        } => {
            let kb_id = knowledge_base_id(&mut config, kb_id)?;
            let auth = Arc::new(AwsAuth::from_config(&config.aws)?);
            let model_arn = foundation_model_arn(auth.region(), &model);
            let admin = BedrockAgentClient::new(auth, &config.http)?;

            println!("Updating knowledge base {} to use model {}", kb_id, model_arn);
            let status = update_generation_model(&admin, &kb_id, &model_arn).await?;
            println!(
                "Update initiated. Knowledge base status: {}",
                status.as_deref().unwrap_or("N/A")
            );
            if no_wait {
                return Ok(());
            }

            let timeout = Duration::from_secs(timeout_secs.unwrap_or(config.admin.update_timeout_secs));
            let interval = Duration::from_secs(config.admin.poll_interval_secs);
            let pb = spinner("Waiting for update to complete...");
            let result = wait_for_status(&admin, &kb_id, timeout, interval, |s| {
                pb.set_message(format!("Knowledge base status: {}", s));
            })
            .await;
            pb.finish_and_clear();

            match result? {
                UpdateStatus::Active => {
                    println!("{}", style("Knowledge base successfully updated!").green())
                }
                UpdateStatus::Failed(status) => {
                    bail!("Knowledge base update failed with status: {}", status)
                }
                UpdateStatus::TimedOut { last_status } => bail!(
                    "Timed out waiting for the update (last status: {}). Check the AWS console.",
                    last_status.as_deref().unwrap_or("N/A")
                ),
            }
        }

        Command::Describe { kb_id, list } => {
            let auth = Arc::new(AwsAuth::from_config(&config.aws)?);
            let admin = BedrockAgentClient::new(auth, &config.http)?;

            if list {
                println!("{}", style("=== Available Knowledge Bases ===").bold());
                let kbs = admin.list_knowledge_bases().await?;
                if kbs.is_empty() {
                    println!("No knowledge bases found.");
                }
                for (i, kb) in kbs.iter().enumerate() {
                    println!(
                        "{}. ID: {}, Name: {}, Status: {}",
                        i + 1,
                        kb.knowledge_base_id,
                        kb.name.as_deref().unwrap_or("N/A"),
                        kb.status.as_deref().unwrap_or("N/A")
                    );
                }
                if kb_id.is_none() && config.knowledge_base.id.trim().is_empty() {
                    return Ok(());
                }
                println!();
            }

            let kb_id = knowledge_base_id(&mut config, kb_id)?;
            let pb = spinner("Collecting knowledge base details...");
            let report = diagnose(&admin, &kb_id).await;
            pb.finish_and_clear();
            print!("{}", report?);
        }
    }

    Ok(())
}

fn print_statement_result(result: StatementResult) -> anyhow::Result<()> {
    match result {
        StatementResult::Rows { columns, rows } => {
            let body = serde_json::json!({ "columns": columns, "rows": rows });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        StatementResult::Affected { records_updated } => {
            println!("{} record(s) updated", records_updated);
        }
    }
    Ok(())
}

async fn download(config: &KbRagConfig, bucket: &str, key: &str) -> anyhow::Result<Vec<u8>> {
    let auth = Arc::new(AwsAuth::from_config(&config.aws)?);
    let store = S3ObjectStore::new(auth, &config.http);
    let pb = spinner(format!("Downloading {} from {}...", key, bucket));
    let bytes = store.get_object(bucket, key).await;
    pb.finish_and_clear();
    Ok(bytes?)
}

async fn run_query(
    pipeline: &QueryAnswerPipeline,
    config: &KbRagConfig,
    query: &str,
    kb_id: &str,
) -> anyhow::Result<()> {
    let pb = spinner("Searching knowledge base...");
    let outcome = pipeline.answer(query, kb_id).await;
    pb.finish_and_clear();

    match outcome? {
        PipelineOutcome::Rejected { .. } => println!(
            "{}",
            style(format!(
                "This question doesn't seem to be related to {}. Please try a different question.",
                config.validation.domain
            ))
            .yellow()
        ),
        PipelineOutcome::NoResults => println!("No results found for your query."),
        PipelineOutcome::RetrievalFailed { error } => {
            eprintln!("{} {}", style("Error querying knowledge base:").red(), error);
            eprintln!("Troubleshooting tips:");
            eprintln!("  1. Verify the knowledge base ID is correct");
            eprintln!("  2. Check that the knowledge base is ACTIVE (kb-rag describe)");
            eprintln!("  3. Verify the credentials allow bedrock:Retrieve");
            eprintln!("  4. Check that the data source has been synced");
        }
        PipelineOutcome::Answered(answer) => {
            println!("\n{}", rule('='));
            println!("{}", style("RESPONSE:").bold());
            println!("{}", rule('-'));
            println!("{}", answer.answer);
            println!("\n{}", rule('='));
            println!("\n{}", style("REFERENCES:").bold());
            println!("{}", rule('-'));
            println!("{}", answer.references);
            println!("{}", rule('='));
            tracing::debug!("Answered with {} in {}ms", answer.model_id, answer.elapsed_ms);
        }
    }

    Ok(())
}

/// Await `work` unless `interrupt` resolves first
async fn unless_interrupted<F, I>(work: F, interrupt: Pin<&mut I>) -> Option<F::Output>
where
    F: Future,
    I: Future,
{
    tokio::select! {
        output = work => Some(output),
        _ = interrupt => None,
    }
}

async fn interactive(
    pipeline: &QueryAnswerPipeline,
    config: &KbRagConfig,
    kb_id: &str,
) -> anyhow::Result<()> {
    println!("{}", style("=== Bedrock Knowledge Base Query Tool ===").bold().cyan());
    println!("Knowledge Base ID: {}", kb_id);
    println!("Model: {}", pipeline.model_id());
    println!("Type 'exit' or 'quit' to leave");
    println!("{}", "-".repeat(40));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    // Shared by the prompt and the running query
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        print!("\nEnter your question: ");
        std::io::stdout().flush()?;

        let Some(line) = unless_interrupted(lines.next_line(), ctrl_c.as_mut()).await else {
            println!("\nExiting...");
            break;
        };
        let Some(line) = line? else {
            println!();
            break;
        };

        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }

        match unless_interrupted(run_query(pipeline, config, query, kb_id), ctrl_c.as_mut()).await {
            Some(Ok(())) => {}
            Some(Err(e)) => eprintln!("{} {:#}", style("Error:").red(), e),
            None => {
                println!("\nExiting...");
                break;
            }
        }
    }

    Ok(())
}
