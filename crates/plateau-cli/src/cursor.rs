//! `plateau cursor` — encode and decode page cursors.

use anyhow::Result;
use clap::{Args, Subcommand};

use plateau_core::{PageCursor, Timestamp};

#[derive(Args, Debug)]
pub struct CursorArgs {
    #[command(subcommand)]
    pub command: CursorCommand,
}

#[derive(Subcommand, Debug)]
pub enum CursorCommand {
    /// Encode an RFC 3339 timestamp (or `now`) as a cursor.
    Encode {
        timestamp: String,
    },
    /// Decode a cursor to its UTC timestamp.
    Decode {
        token: String,
    },
}

pub fn run_cursor(args: &CursorArgs) -> Result<u8> {
    match &args.command {
        CursorCommand::Encode { timestamp } => {
            println!("{}", encode(timestamp)?);
        }
        CursorCommand::Decode { token } => {
            println!("{}", decode(token)?);
        }
    }
    Ok(0)
}

fn encode(timestamp: &str) -> Result<String> {
    let ts = if timestamp == "now" {
        Timestamp::now()
    } else {
        Timestamp::parse(timestamp)?
    };
    Ok(PageCursor::new(ts).encode())
}

fn decode(token: &str) -> Result<String> {
    Ok(PageCursor::decode(token)?.timestamp().to_rfc3339_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_pair() {
        let token = encode("2024-01-02T03:04:05.123+02:00").unwrap();
        assert_eq!(decode(&token).unwrap(), "2024-01-02T01:04:05.123Z");
    }

    #[test]
    fn encode_rejects_garbage() {
        assert!(encode("yesterday").is_err());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode("%%%").is_err());
    }
}
