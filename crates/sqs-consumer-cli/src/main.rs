use clap::{Parser, Subcommand};
use sqs_consumer::SqsQueue;

mod consume;
mod send;

#[tokio::main]
pub async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = cli.run().await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

#[derive(Debug, Parser)]
#[command(name = "sqs-consumer")]
#[command(about = "consume aws sqs queues with a pool of workers", long_about = None)]
pub struct Cli {
    /// Use LocalStack with its static test credentials
    #[arg(long, global = true)]
    local: bool,

    /// Override the SQS endpoint url
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[arg(long, global = true)]
    region: Option<String>,

    /// Increase log verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List all queue urls
    List,
    /// Consume a queue until interrupted
    Consume(consume::ConsumeArgs),
    /// Send lines from stdin as messages
    Send { queue_url: String },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Commands::List => {
                let sqs = self.queue().await;
                for url in sqs.list().await? {
                    println!("{}", url);
                }
            }
            Commands::Consume(ref args) => {
                // reject bad settings before touching aws
                let config = args.config()?;
                let sqs = self.queue().await;
                consume::run(sqs, config, &args.exec).await?;
            }
            Commands::Send { ref queue_url } => {
                let sqs = self.queue().await;
                let sent = send::run(&sqs, queue_url).await?;
                log::info!("sent {sent} messages to {queue_url}");
            }
        };

        Ok(())
    }

    async fn queue(&self) -> SqsQueue {
        if self.local {
            return SqsQueue::local(self.endpoint.as_deref(), self.region.as_deref()).await;
        }

        let mut loader = aws_config::from_env();
        if let Some(endpoint) = &self.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(region) = &self.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        SqsQueue::from_config(loader.load().await)
    }
}
