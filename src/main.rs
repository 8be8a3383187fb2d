use anyhow::{Context, Result, anyhow};
use clap::Parser;
use sexpr_tree::{Atom, Element, List, TransactionToken, TreeConfig, TreeError};
use std::thread;
use std::time::Duration;
use tracing::{info, info_span, warn};
use tracing_subscriber::EnvFilter;

/// Two threads editing nested lists of one shared tree under transactions.
#[derive(Parser, Debug)]
#[command(name = "sexpr-tree")]
#[command(about = "Transactional S-expression tree demo")]
struct Cli {
    /// How long the first thread keeps its transaction open
    #[arg(long, default_value_t = 900)]
    hold_ms: u64,

    /// Attempts at starting a transaction before giving up
    #[arg(long, default_value_t = 40)]
    retries: u32,

    /// Pause between attempts
    #[arg(long, default_value_t = 50)]
    backoff_ms: u64,

    /// Fail out-of-range insert/remove instead of ignoring them
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = TreeConfig::from_env().context("invalid tree configuration")?;
    if cli.strict {
        config = config.strict();
    }

    let root = List::with_config(config);
    root.add(Atom::new("hello"))?;
    root.add(Atom::new("world"))?;

    let top = root.root();
    let sublist = List::with_root(&top);
    root.add(&sublist)?;
    sublist.add(Atom::new("nested"))?;
    sublist.add(Atom::new("list"))?;

    let sublist2 = List::with_root(&top);
    sublist.add(&sublist2)?;
    sublist2.add(Atom::new("nested2"))?;
    sublist2.add(Atom::new("list2"))?;

    let hold = Duration::from_millis(cli.hold_ms);
    let backoff = Duration::from_millis(cli.backoff_ms);

    let first = {
        let sublist = sublist.clone();
        let retries = cli.retries;
        thread::spawn(move || -> Result<()> {
            let _span = info_span!("worker", id = 1).entered();
            start_with_retry(&sublist, retries, backoff)?;
            sublist.add(Atom::new("thread 1"))?;
            thread::sleep(hold);
            sublist.add(Atom::new("thread 1"))?;
            println!("Print after 1 thread: {}", sublist.root().print()?);
            sublist.transaction_rollback()?;
            info!("rolled back");
            Ok(())
        })
    };

    let second = {
        let sublist2 = sublist2.clone();
        let top = top.clone();
        let retries = cli.retries;
        thread::spawn(move || -> Result<()> {
            let _span = info_span!("worker", id = 2).entered();
            sublist2.add(Atom::new("from"))?;
            start_with_retry(&sublist2, retries, backoff)?;

            let sublist3 = List::with_root(&top);
            sublist3.add(Atom::new("thread2list3"))?;
            sublist2.add(&sublist3)?;
            sublist3.remove(0)?;
            sublist3.insert(0, Atom::new("thread2list4"))?;
            sublist2.add(Atom::new("thread 2"))?;

            println!("Print after 2 thread: {}", sublist2.root().print()?);
            sublist2.transaction_commit()?;
            info!("committed");
            Ok(())
        })
    };

    join(first, "first")?;
    join(second, "second")?;

    println!("Print after all threads: {}", Element::from(&sublist).root().print()?);
    Ok(())
}

/// Retry `transaction_start` while the subtree is held by someone else.
fn start_with_retry(list: &List, retries: u32, backoff: Duration) -> Result<TransactionToken> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match list.transaction_start() {
            Ok(token) => {
                info!(%token, attempt, "transaction started");
                return Ok(token);
            }
            Err(err @ TreeError::TransactionConflict(_)) if attempt < retries => {
                warn!(%err, attempt, "subtree busy, backing off");
                thread::sleep(backoff);
            }
            Err(err) => return Err(err).context("could not start transaction"),
        }
    }
}

fn join(handle: thread::JoinHandle<Result<()>>, name: &str) -> Result<()> {
    handle
        .join()
        .map_err(|_| anyhow!("{} worker panicked", name))?
        .with_context(|| format!("{} worker failed", name))
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sexpr_tree=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
