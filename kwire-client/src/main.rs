use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand, ValueEnum};
use kwire_client::protocol::message_set::MAGIC_V1;
use kwire_client::protocol::messages::{EARLIEST_TIMESTAMP, LATEST_TIMESTAMP};
use kwire_client::protocol::{error_string, CompressionType, Message};
use kwire_client::{ClientConfig, Connection};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 9092)]
    port: u16,

    #[arg(long, default_value = "kwire-client")]
    client_id: String,

    /// Response timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Log every request and response
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show brokers and partition leaders
    Metadata {
        /// Topics to describe; all topics when empty
        topics: Vec<String>,
    },
    /// Show the earliest or latest offset of a partition
    Offsets {
        #[arg(short, long)]
        topic: String,
        #[arg(short, long, default_value = "0")]
        partition: i32,
        #[arg(long)]
        earliest: bool,
    },
    /// Fetch messages from a partition
    Fetch {
        #[arg(short, long)]
        topic: String,
        #[arg(short, long, default_value = "0")]
        partition: i32,
        #[arg(short, long, default_value = "0")]
        offset: i64,
        #[arg(long, default_value = "1048576")]
        max_bytes: i32,
    },
    /// Produce a message to a partition
    Produce {
        #[arg(short, long)]
        topic: String,
        #[arg(short, long, default_value = "0")]
        partition: i32,
        #[arg(short, long)]
        key: Option<String>,
        #[arg(short, long)]
        message: String,
        #[arg(long, default_value = "1")]
        acks: i16,
        #[arg(long, value_enum, default_value = "none")]
        compression: Codec,
    },
    /// Find the coordinator of a consumer group
    Coordinator {
        #[arg(short, long)]
        group: String,
    },
    /// Inspect consumer groups
    Groups {
        #[command(subcommand)]
        subcmd: GroupCommands,
    },
    /// Show a group's committed offsets
    Committed {
        #[arg(short, long)]
        group: String,
        #[arg(short, long)]
        topic: String,
        #[arg(short, long, default_values_t = vec![0])]
        partitions: Vec<i32>,
    },
}

#[derive(Subcommand, Debug)]
enum GroupCommands {
    /// List the groups known to the broker
    List,
    /// Describe groups and their members
    Describe { groups: Vec<String> },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Codec {
    None,
    Gzip,
    Snappy,
    Lz4,
}

impl From<Codec> for CompressionType {
    fn from(codec: Codec) -> Self {
        match codec {
            Codec::None => CompressionType::None,
            Codec::Gzip => CompressionType::Gzip,
            Codec::Snappy => CompressionType::Snappy,
            Codec::Lz4 => CompressionType::Lz4,
        }
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(-1)
}

fn describe(code: i16) -> String {
    if code == 0 {
        "ok".to_string()
    } else {
        format!("{} ({})", error_string(code), code)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    kwire_common::logging::init_logging(level);

    let config = ClientConfig {
        client_id: args.client_id,
        response_timeout: Duration::from_millis(args.timeout_ms),
        ..Default::default()
    };
    let mut conn = Connection::open(&args.host, args.port, config)?;

    match args.command {
        Commands::Metadata { topics } => {
            let topics: Vec<&str> = topics.iter().map(String::as_str).collect();
            let metadata = conn.metadata(&topics)?;
            for broker in &metadata.brokers {
                println!("Broker {}: {}:{}", broker.node_id, broker.host, broker.port);
            }
            for topic in &metadata.topics {
                println!("Topic {}: {}", topic.topic, describe(topic.error_code));
                for p in &topic.partitions {
                    println!(
                        "  partition {} leader {} replicas {:?} isr {:?} {}",
                        p.partition,
                        p.leader,
                        p.replicas,
                        p.isr,
                        describe(p.error_code)
                    );
                }
            }
        }
        Commands::Offsets {
            topic,
            partition,
            earliest,
        } => {
            let timestamp = if earliest {
                EARLIEST_TIMESTAMP
            } else {
                LATEST_TIMESTAMP
            };
            let response = conn.list_offsets(&topic, partition, timestamp)?;
            match response.find(&topic, partition) {
                Some(p) if p.error_code != 0 => bail!("{}", describe(p.error_code)),
                Some(p) => println!("{}/{}: {}", topic, partition, p.offset),
                None => bail!("broker returned no offset for {}/{}", topic, partition),
            }
        }
        Commands::Fetch {
            topic,
            partition,
            offset,
            max_bytes,
        } => {
            let response = conn.fetch(&topic, partition, offset, max_bytes)?;
            for block in &response.topics {
                for p in &block.partitions {
                    if p.error_code != 0 {
                        println!("{}/{}: {}", block.topic, p.partition, describe(p.error_code));
                        continue;
                    }
                    println!(
                        "{}/{} high watermark {}",
                        block.topic, p.partition, p.high_watermark
                    );
                    for msg in p.message_set.flatten()? {
                        println!(
                            "  offset {} key {:?} value {:?}",
                            msg.offset,
                            String::from_utf8_lossy(msg.key_bytes()),
                            String::from_utf8_lossy(msg.value_bytes())
                        );
                    }
                }
            }
        }
        Commands::Produce {
            topic,
            partition,
            key,
            message,
            acks,
            compression,
        } => {
            let timestamp = now_ms();
            let value = Bytes::from(message);
            let msg = match key {
                Some(key) => Message::new(MAGIC_V1, 0, timestamp, key, value),
                None => Message::keyless(MAGIC_V1, 0, timestamp, value),
            };
            let codec = CompressionType::from(compression);
            let msg = if codec == CompressionType::None {
                msg
            } else {
                Message::wrap_compressed(codec, MAGIC_V1, timestamp, &[msg])?
            };
            let Some(response) = conn.produce(&topic, partition, acks, vec![msg])? else {
                println!("{}/{}: sent without acknowledgement", topic, partition);
                conn.close();
                return Ok(());
            };
            for block in &response.topics {
                for p in &block.partitions {
                    println!(
                        "{}/{}: base offset {} {}",
                        block.topic,
                        p.partition,
                        p.base_offset,
                        describe(p.error_code)
                    );
                }
            }
        }
        Commands::Coordinator { group } => {
            let response = conn.group_coordinator(&group)?;
            if response.error_code != 0 {
                bail!("{}", describe(response.error_code));
            }
            println!(
                "Coordinator for {}: broker {} at {}:{}",
                group, response.coordinator_id, response.host, response.port
            );
        }
        Commands::Groups { subcmd } => match subcmd {
            GroupCommands::List => {
                let response = conn.list_groups()?;
                if response.error_code != 0 {
                    bail!("{}", describe(response.error_code));
                }
                for group in &response.groups {
                    println!("{} ({})", group.group_id, group.protocol_type);
                }
            }
            GroupCommands::Describe { groups } => {
                let groups: Vec<&str> = groups.iter().map(String::as_str).collect();
                let response = conn.describe_groups(&groups)?;
                for group in &response.groups {
                    println!(
                        "Group {}: state {} protocol {} {}",
                        group.group_id,
                        group.state,
                        group.protocol,
                        describe(group.error_code)
                    );
                    for member in &group.members {
                        println!(
                            "  {} ({} from {})",
                            member.member_id, member.client_id, member.client_host
                        );
                        for assigned in &member.assignment.topics {
                            println!("    {} {:?}", assigned.topic, assigned.partitions);
                        }
                    }
                }
            }
        },
        Commands::Committed {
            group,
            topic,
            partitions,
        } => {
            let response = conn.offset_fetch(&group, &topic, &partitions)?;
            for block in &response.topics {
                for p in &block.partitions {
                    println!(
                        "{}/{}: {} {}",
                        block.topic,
                        p.partition,
                        p.offset,
                        describe(p.error_code)
                    );
                }
            }
        }
    }

    conn.close();
    Ok(())
}
