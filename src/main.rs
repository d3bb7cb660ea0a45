#![warn(clippy::all, clippy::pedantic)]

use std::{
    io::{Error, Result},
    path::PathBuf,
};

use clap::{Parser, Subcommand, ValueEnum};
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncWriteExt},
    sync::mpsc,
};
use tracing_subscriber::EnvFilter;
use wust_message::{
    Config, Event, Message, MessageReader,
    frames::{Opcode, encode_data},
    recv_loop,
    role::{Client, RolePolicy, Server},
};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the wire frames of one message to stdout
    Encode {
        /// Message text
        message: String,

        /// Send as a BINARY message instead of TEXT
        #[arg(short, long)]
        binary: bool,

        /// Which side is sending; clients mask their frames
        #[arg(short, long, value_enum, default_value_t = Side::Client)]
        role: Side,

        /// Maximum payload bytes per frame
        #[arg(short, long, default_value_t = 125)]
        frame_size: usize,
    },
    /// Reassemble messages from captured frames and print each event
    Decode {
        /// Capture file, stdin if omitted
        path: Option<PathBuf>,

        /// Which side is reading; servers expect masked frames
        #[arg(short, long, value_enum, default_value_t = Side::Server)]
        role: Side,

        /// Reject frames with larger payloads
        #[arg(long)]
        max_frame_payload: Option<usize>,

        /// Reject messages with larger payloads
        #[arg(long)]
        max_message_size: Option<usize>,
    },
}

#[derive(Copy, Clone, ValueEnum)]
enum Side {
    Client,
    Server,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wust_message=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    match Args::parse().command {
        Command::Encode {
            message,
            binary,
            role,
            frame_size,
        } => {
            let opcode = if binary { Opcode::Bin } else { Opcode::Text };
            let frames = match role {
                Side::Client => encode_data::<Client>(message.as_bytes(), opcode, frame_size),
                Side::Server => encode_data::<Server>(message.as_bytes(), opcode, frame_size),
            };

            let mut out = tokio::io::stdout();
            for frame in frames {
                out.write_all(&frame).await?;
            }
            out.flush().await
        }
        Command::Decode {
            path,
            role,
            max_frame_payload,
            max_message_size,
        } => {
            let mut config = Config::default();
            if let Some(len) = max_frame_payload {
                config = config.with_max_frame_payload(len);
            }
            if let Some(len) = max_message_size {
                config = config.with_max_message_size(len);
            }

            let input: Box<dyn AsyncRead + Unpin + Send> = match path {
                Some(path) => Box::new(File::open(path).await?),
                None => Box::new(tokio::io::stdin()),
            };

            match role {
                Side::Server => decode::<Server>(input, config).await,
                Side::Client => decode::<Client>(input, config).await,
            }
        }
    }
}

// a protocol violation ends the run with an error naming the close code
async fn decode<R: RolePolicy>(
    input: Box<dyn AsyncRead + Unpin + Send>,
    config: Config,
) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::channel(64);
    tokio::spawn(recv_loop(input, MessageReader::<R>::new(config), event_tx));

    while let Some(event) = event_rx.recv().await {
        match event {
            Event::Message(Message::Text(s)) => println!("TEXT {}: {s}", s.len()),
            Event::Message(Message::Binary(b)) => println!("BINARY {}: {b:02x?}", b.len()),
            Event::Ping(p) => println!("PING {p:?}"),
            Event::Pong(p) => println!("PONG {p:?}"),
            Event::Close { reason, text } => println!("CLOSE {reason:?} {text:?}"),
            Event::Error(reason) => {
                return Err(Error::other(format!("peer must be closed with {reason}")));
            }
            Event::Closed => break,
        }
    }
    Ok(())
}
