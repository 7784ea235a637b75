//! EmberKV CLI Client
//!
//! Command-line interface for interacting with EmberKV.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::process::ExitCode;

use bytes::Bytes;
use clap::{Parser, Subcommand};
use emberkv::protocol::{read_response, write_command, Command, Response, Status};
use emberkv::Result;

/// EmberKV CLI
#[derive(Parser, Debug)]
#[command(name = "emberkv-cli")]
#[command(about = "CLI for EmberKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key to a value
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Ping the server
    Ping,
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Get { key } => Command::Get { key },
            Commands::Set { key, value } => Command::Set {
                key,
                value: Bytes::from(value),
            },
            Commands::Del { key } => Command::Delete { key },
            Commands::Ping => Command::Ping,
        }
    }
}

fn call(server: &str, command: &Command) -> Result<Response> {
    let stream = TcpStream::connect(server)?;
    let mut writer = BufWriter::new(stream.try_clone()?);
    let mut reader = BufReader::new(stream);

    write_command(&mut writer, command)?;
    read_response(&mut reader)
}

fn main() -> ExitCode {
    let args = Args::parse();
    let command = Command::from(args.command);

    let response = match call(&args.server, &command) {
        Ok(response) => response,
        Err(e) => {
            eprintln!("Could not issue command: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match response.status {
        Status::Ok => {
            if !response.payload.is_empty() {
                println!("{}", String::from_utf8_lossy(&response.payload));
            }
            ExitCode::SUCCESS
        }
        Status::NotFound => {
            println!("(not found)");
            ExitCode::SUCCESS
        }
        Status::Error => {
            eprintln!("error: {}", response.error_message().unwrap_or_default());
            ExitCode::FAILURE
        }
    }
}
