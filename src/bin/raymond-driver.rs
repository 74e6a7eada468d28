// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interactive command driver, in the style of `omicron`'s `dev-tools/*`
//! binaries: builds a tree, spawns one actor per node, and reads
//! `REQUEST <id>` / `CRASH <id>` / `QUIT` lines from stdin until the user
//! asks it to stop, either by typing `QUIT`/`EXIT`, closing stdin, or
//! hitting Ctrl-C.

use clap::Parser;
use raymond_mutex::message::{Bootstrap, UserCommand};
use raymond_mutex::node::NodeId;
use raymond_mutex::{actor, tree::Tree, Config};
use slog::{o, Drain};
use std::io::Write;
use std::time::Duration;
use tokio::io::{self, AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "raymond-driver", about = "Run a Raymond tree-mutex simulation")]
struct Args {
    /// Topology: "line" or "star".
    #[arg(long, default_value = "line")]
    topology: String,

    /// Number of nodes (line: total nodes; star: center + this many leaves).
    #[arg(long, default_value_t = 3)]
    nodes: u32,

    #[arg(long, default_value_t = 50)]
    bootstrap_delay_ms: u64,

    #[arg(long, default_value_t = 200)]
    critical_section_ms: u64,

    #[arg(long, default_value_t = 500)]
    crash_ms: u64,
}

fn build_logger() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, o!())
}

fn build_tree(args: &Args) -> Tree {
    match args.topology.as_str() {
        "star" => {
            let leaves: Vec<NodeId> = (1..args.nodes).map(NodeId).collect();
            Tree::star(NodeId(0), &leaves).expect("valid star topology")
        }
        _ => Tree::line(args.nodes, NodeId(0)).expect("valid line topology"),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let log = build_logger();
    let tree = build_tree(&args);

    let config = Config {
        bootstrap_delay: Duration::from_millis(args.bootstrap_delay_ms),
        critical_section_time: Duration::from_millis(args.critical_section_ms),
        crash_time: Duration::from_millis(args.crash_ms),
    };

    let bootstraps: Vec<(NodeId, Bootstrap)> = tree
        .nodes()
        .map(|id| {
            (
                id,
                Bootstrap {
                    neighbors: tree.neighbors(id).to_vec(),
                    is_starter: tree.is_starter(id),
                },
            )
        })
        .collect();

    slog::info!(log, "starting tree"; "topology" => &args.topology, "nodes" => args.nodes);
    let handles = actor::spawn_tree(bootstraps, config, &log);

    println!("Tree running. Commands: REQUEST <id> | CRASH <id> | QUIT");
    print!("> ");
    std::io::stdout().flush().ok();

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                let line = line.trim();
                if line.is_empty() {
                    print!("> ");
                    std::io::stdout().flush().ok();
                    continue;
                }

                let mut parts = line.split_whitespace();
                match parts.next().map(|s| s.to_ascii_uppercase()).as_deref() {
                    Some("QUIT") | Some("EXIT") => break,
                    Some("REQUEST") => {
                        dispatch_command(&handles, parts.next(), UserCommand::Request)
                    }
                    Some("CRASH") => dispatch_command(&handles, parts.next(), UserCommand::Crash),
                    _ => eprintln!("unrecognized command: {line}"),
                }

                print!("> ");
                std::io::stdout().flush().ok();
            }
            _ = tokio::signal::ctrl_c() => {
                slog::info!(log, "received ctrl-c");
                break;
            }
        }
    }

    slog::info!(log, "driver shutting down");
}

fn dispatch_command(
    handles: &[actor::NodeHandle],
    id_str: Option<&str>,
    cmd: UserCommand,
) {
    let Some(id_str) = id_str else {
        eprintln!("missing node id");
        return;
    };
    let Ok(id) = id_str.parse::<u32>() else {
        eprintln!("invalid node id: {id_str}");
        return;
    };
    let id = NodeId(id);
    match handles.iter().find(|h| h.id == id) {
        Some(handle) => handle.peer.send_user(cmd),
        None => eprintln!("no such node: {id}"),
    }
}
