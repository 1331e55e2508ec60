//! Send a batch of messages through a System V queue and read them back.
//!
//! ```text
//! cargo run --example ping -- --path /tmp --count 5 --message "Hello World"
//! RUST_LOG=sysv_mq=trace cargo run --example ping -- --key 0x12345 --destroy
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use sysv_mq::{MessageQueue, MsgFlags, QueueConfig, TypeSelector};
use tracing::info;

/// Round-trip messages through a System V message queue
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Args {
    /// Queue key, decimal or 0x-prefixed hex (takes precedence over --path)
    #[clap(short = 'k', long, value_parser = parse_key)]
    key: Option<i32>,

    /// File used to derive the key with ftok(3)
    #[clap(short = 'p', long, default_value = "/tmp")]
    path: PathBuf,

    /// Project id for key derivation
    #[clap(long, default_value_t = sysv_mq::defaults::PROJECT_ID)]
    project_id: i32,

    /// JSON queue configuration; overrides the options above
    #[clap(long)]
    config: Option<PathBuf>,

    /// Largest message size in bytes
    #[clap(short = 's', long, default_value_t = sysv_mq::defaults::MAX_SIZE)]
    max_size: usize,

    /// Message to send
    #[clap(short = 'm', long, default_value = "Hello World")]
    message: String,

    /// Number of messages to send and receive
    #[clap(short = 'c', long, default_value_t = 1)]
    count: usize,

    /// Message type tag
    #[clap(short = 't', long, default_value_t = 1)]
    msg_type: i64,

    /// Remove the queue when done
    #[clap(long, default_value_t = false)]
    destroy: bool,
}

fn parse_key(s: &str) -> Result<i32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).map(|k| k as i32),
        None => s.parse::<i32>(),
    };
    parsed.map_err(|e| format!("Invalid key '{}': {}", s, e))
}

fn main() -> Result<()> {
    sysv_mq::logging::init("sysv_mq=debug,ping=info");
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => QueueConfig::from_json_file(path)?,
        None => match args.key {
            Some(key) => QueueConfig::with_key(key),
            None => QueueConfig::with_path(&args.path, args.project_id),
        }
        .create()
        .max_size(args.max_size),
    };

    let mut mq = MessageQueue::open(config).context("opening message queue")?;
    info!("Connected to queue key={:#x} id={:?}", mq.key(), mq.id());

    for _ in 0..args.count {
        mq.send_str(&args.message, args.msg_type as _, MsgFlags::empty())
            .context("sending message")?;
    }
    info!("Queued {} messages ({} bytes)", mq.count()?, mq.size()?);

    for i in 0..args.count {
        let (message, mtype) = mq
            .receive_string(TypeSelector::Exact(args.msg_type as _), MsgFlags::NOWAIT)
            .context("receiving message")?;
        info!("#{} type={} {:?}", i, mtype, message);
    }

    let stats = mq.stat()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    if args.destroy {
        mq.destroy()?;
        info!("Queue removed");
    } else {
        mq.close();
    }
    Ok(())
}
