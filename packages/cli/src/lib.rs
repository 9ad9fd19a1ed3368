//! # zoneview-cli
//!
//! A demo driver for zoneview. It builds an in-process cluster, runs one
//! thread per participant, and has every participant open a
//! [`RuntimeView`] and take part in a few collectives.
//!
//! ## Usage
//!
//! ```bash
//! # Four participants with 2 GiB each
//! zoneview --participants 4 --memory 2147483648
//!
//! # Cluster layout from a file, summary as JSON
//! zoneview --config cluster.json --json
//! ```

use std::io::Write;
use std::sync::Arc;
use std::thread;

use serde::Serialize;
use zoneview_comm::{CommError, LocalBackend, LocalCluster, LocalConfig};
use zoneview_runtime::{CommHandle, ReduceOp, RuntimeView};

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Runtime error: {0}")]
    Runtime(#[from] zoneview_runtime::Error),

    #[error("Cluster error: {0}")]
    Comm(#[from] CommError),

    #[error("Participant {0} panicked")]
    Participant(usize),

    #[error("No participant produced a summary")]
    NoRoot,
}

/// What the root participant learned from the collectives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Number of participants in the world.
    pub participants: usize,
    /// Sum of every participant's rank.
    pub rank_sum: u64,
    /// Memory of each participant, gathered in rank order.
    pub memory: Vec<u64>,
    /// Label of each participant, gathered in rank order.
    pub labels: Vec<String>,
    /// Participants whose RAM matches the root's.
    pub like_root: usize,
}

/// Run the demo on a cluster described by `config`.
pub fn run(config: LocalConfig, args: &[String]) -> Result<Summary, CliError> {
    let cluster = LocalCluster::new(config)?;
    tracing::info!(participants = cluster.size(), "starting local cluster");

    let args = Arc::new(args.to_vec());
    let threads: Vec<_> = cluster
        .into_backends()
        .into_iter()
        .map(|backend| {
            let args = Arc::clone(&args);
            let rank = backend.rank();
            (rank, thread::spawn(move || participant(backend, &args)))
        })
        .collect();

    let mut summary = None;
    for (rank, handle) in threads {
        let outcome = handle.join().map_err(|_| CliError::Participant(rank))?;
        if let Some(found) = outcome? {
            summary = Some(found);
        }
    }
    summary.ok_or(CliError::NoRoot)
}

fn participant(backend: Arc<LocalBackend>, args: &[String]) -> Result<Option<Summary>, CliError> {
    let view = RuntimeView::with_backend(backend, args, CommHandle::WORLD)?;
    let me = view.my_resource_set()?;
    tracing::debug!(rank = me.rank(), "participant ready");

    writeln!(
        view.progress_logger()?,
        "zoneview: {} participants, runtime started here: {}",
        view.size(),
        view.did_i_start_runtime()
    )
    .map_err(zoneview_runtime::Error::from)?;

    let rank_sum = view.reduce(me.rank() as u64, ReduceOp::Sum)?;
    let memory = view.gather(me.ram().total_space())?;
    let labels = view.gather_serialized(&format!("rank-{}", me.rank()))?;
    let like_root = view.count(view.at(0)?.ram())?;

    let summary = match (rank_sum, memory, labels) {
        (Some(rank_sum), Some(memory), Some(labels)) => Some(Summary {
            participants: view.size(),
            rank_sum,
            memory,
            labels,
            like_root,
        }),
        _ => None,
    };

    if let Some(summary) = &summary {
        writeln!(view.progress_logger()?, "zoneview: rank sum {}", summary.rank_sum)
            .map_err(zoneview_runtime::Error::from)?;
    }
    Ok(summary)
}
