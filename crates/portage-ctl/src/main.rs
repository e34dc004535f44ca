//! portage-ctl: command-line interface for the Portage receiver.

mod cmd;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 8480;

fn print_usage() {
    println!("Usage: portage-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status                                  Show receiver status");
    println!("  keygen                                  Generate signing and recipient keys");
    println!("  deliver <file> [--user <guid>] [--legacy]");
    println!("                                          Replay a captured payload");
    println!();
    println!("Options:");
    println!("  --port <port>   Receiver port (default: {})", DEFAULT_PORT);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut port = DEFAULT_PORT;
    let mut user: Option<&str> = None;
    let mut legacy = false;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                port = args
                    .get(i)
                    .context("--port requires a value")?
                    .parse()
                    .context("--port must be a number")?;
            }
            "--user" => {
                i += 1;
                user = Some(args.get(i).context("--user requires a guid")?.as_str());
            }
            "--legacy" => legacy = true,
            other => remaining.push(other),
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | [] => cmd::status::cmd_status(port).await,
        ["keygen"] => cmd::keygen::cmd_keygen(),
        ["deliver", path] => cmd::deliver::cmd_deliver(port, path, user, legacy).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
