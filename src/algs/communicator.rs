//! Thin façade over the blocking collectives the numbering pass needs.
//!
//! Payloads are *contiguous byte slices*. Every call blocks until the
//! collective completes on all ranks, and every rank must issue the same
//! sequence of collectives or the run deadlocks.
//!
//! Backends:
//! - [`NoComm`]: a single serial rank.
//! - [`LocalComm`]: several ranks on OS threads of one process.
//! - `MpiComm` (feature `mpi-support`): one rank per MPI process.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::DashMap;

use crate::algs::wire::{WireStatus, cast_slice, cast_slice_mut, decode_u64s, encode_u64s};
use crate::mesh_error::MeshNumberingError;

/// Blocking collective interface (minimal by design).
pub trait Communicator {
    /// Rank of the calling process.
    fn rank(&self) -> usize;
    /// Number of participating processes.
    fn size(&self) -> usize;
    /// True when more than one process participates.
    fn is_active(&self) -> bool {
        self.size() > 1
    }
    fn barrier(&self) -> Result<(), MeshNumberingError>;
    /// Gather `sendbuf` from every rank into `recvbuf`, rank-major.
    ///
    /// `recvbuf.len()` must be `sendbuf.len() * size()`.
    fn allgather(&self, sendbuf: &[u8], recvbuf: &mut [u8]) -> Result<(), MeshNumberingError>;
    /// Broadcast a variable-length payload from `root`.
    ///
    /// Only the root's `buf` is read; every rank, root included, gets a copy.
    fn broadcast(&self, root: usize, buf: &[u8]) -> Result<Vec<u8>, MeshNumberingError>;
}

/// Typed collectives layered on any [`Communicator`].
pub trait CollectiveExt: Communicator {
    /// Gather one `u64` per rank.
    fn allgather_u64(&self, value: u64) -> Result<Vec<u64>, MeshNumberingError> {
        let send = encode_u64s(&[value]);
        let mut recv = vec![0u8; send.len() * self.size()];
        self.allgather(&send, &mut recv)?;
        decode_u64s(&recv, self.rank())
    }

    /// Broadcast a `u64` sequence from `root`.
    fn broadcast_u64s(&self, root: usize, values: &[u64]) -> Result<Vec<u64>, MeshNumberingError> {
        let raw = self.broadcast(root, &encode_u64s(values))?;
        decode_u64s(&raw, root)
    }

    /// Returns the lowest rank that reported `failed`, if any.
    ///
    /// Every rank must call this at the same point so local failures never
    /// leave peers blocked in a later collective.
    fn agree_on_failure(&self, failed: bool) -> Result<Option<usize>, MeshNumberingError> {
        if !self.is_active() {
            return Ok(failed.then_some(self.rank()));
        }
        let status = WireStatus {
            failed: u8::from(failed),
        };
        let mut all = vec![WireStatus::default(); self.size()];
        self.allgather(cast_slice(std::slice::from_ref(&status)), cast_slice_mut(&mut all))?;
        Ok(all.iter().position(|s| s.failed != 0))
    }
}

impl<C: Communicator + ?Sized> CollectiveExt for C {}

fn check_gather_len(
    sendbuf: &[u8],
    recvbuf: &[u8],
    size: usize,
    rank: usize,
) -> Result<(), MeshNumberingError> {
    let expected = sendbuf.len() * size;
    if recvbuf.len() != expected {
        return Err(MeshNumberingError::BufferSizeMismatch {
            neighbor: rank,
            expected,
            got: recvbuf.len(),
        });
    }
    Ok(())
}

fn check_root(root: usize, size: usize) -> Result<(), MeshNumberingError> {
    if root >= size {
        return Err(MeshNumberingError::comm(
            root,
            format!("broadcast root {root} outside communicator of size {size}"),
        ));
    }
    Ok(())
}

/// Serial communicator: rank 0 of 1.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) -> Result<(), MeshNumberingError> {
        Ok(())
    }

    fn allgather(&self, sendbuf: &[u8], recvbuf: &mut [u8]) -> Result<(), MeshNumberingError> {
        check_gather_len(sendbuf, recvbuf, 1, 0)?;
        recvbuf.copy_from_slice(sendbuf);
        Ok(())
    }

    fn broadcast(&self, root: usize, buf: &[u8]) -> Result<Vec<u8>, MeshNumberingError> {
        check_root(root, 1)?;
        Ok(buf.to_vec())
    }
}

// --- LocalComm: intra-process / one thread per rank ---
type Key = (usize, usize, u64); // (src, dst, seq)

/// In-process communicator; each rank runs on its own thread.
///
/// Handles created by [`LocalComm::world`] share one mailbox. Each handle
/// counts its collectives, so the n-th collective on one rank only ever
/// matches the n-th collective on its peers.
#[derive(Debug)]
pub struct LocalComm {
    rank: usize,
    size: usize,
    mailbox: Arc<DashMap<Key, Bytes>>,
    seq: AtomicU64,
}

impl LocalComm {
    /// One handle per rank of an `n`-rank world.
    pub fn world(n: usize) -> Vec<LocalComm> {
        let mailbox = Arc::new(DashMap::new());
        (0..n.max(1))
            .map(|rank| LocalComm {
                rank,
                size: n.max(1),
                mailbox: Arc::clone(&mailbox),
                seq: AtomicU64::new(0),
            })
            .collect()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn post(&self, dst: usize, seq: u64, data: Bytes) {
        self.mailbox.insert((self.rank, dst, seq), data);
    }

    fn take(&self, src: usize, seq: u64) -> Bytes {
        let key = (src, self.rank, seq);
        loop {
            if let Some((_, bytes)) = self.mailbox.remove(&key) {
                return bytes;
            }
            std::thread::yield_now();
        }
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) -> Result<(), MeshNumberingError> {
        self.allgather(&[], &mut [])
    }

    fn allgather(&self, sendbuf: &[u8], recvbuf: &mut [u8]) -> Result<(), MeshNumberingError> {
        check_gather_len(sendbuf, recvbuf, self.size, self.rank)?;
        let seq = self.next_seq();
        let payload = Bytes::copy_from_slice(sendbuf);
        for dst in (0..self.size).filter(|&d| d != self.rank) {
            self.post(dst, seq, payload.clone());
        }
        let n = sendbuf.len();
        let mut maybe_err = None;
        for src in 0..self.size {
            let chunk = &mut recvbuf[src * n..(src + 1) * n];
            if src == self.rank {
                chunk.copy_from_slice(sendbuf);
                continue;
            }
            // drain every peer even after a mismatch so the mailbox stays in step
            let data = self.take(src, seq);
            if data.len() == n {
                chunk.copy_from_slice(&data);
            } else if maybe_err.is_none() {
                maybe_err = Some(MeshNumberingError::BufferSizeMismatch {
                    neighbor: src,
                    expected: n,
                    got: data.len(),
                });
            }
        }
        match maybe_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn broadcast(&self, root: usize, buf: &[u8]) -> Result<Vec<u8>, MeshNumberingError> {
        check_root(root, self.size)?;
        let seq = self.next_seq();
        if self.rank == root {
            let payload = Bytes::copy_from_slice(buf);
            for dst in (0..self.size).filter(|&d| d != root) {
                self.post(dst, seq, payload.clone());
            }
            Ok(buf.to_vec())
        } else {
            Ok(self.take(root, seq).to_vec())
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::{Communicator as _, CommunicatorCollectives as _, Root as _};

    /// One rank per MPI process on `MPI_COMM_WORLD`.
    ///
    /// MPI is finalized when the handle is dropped.
    pub struct MpiComm {
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
        _universe: Universe,
    }

    impl MpiComm {
        /// Initialize MPI; fails if it was already initialized in this process.
        pub fn new() -> Result<Self, MeshNumberingError> {
            let universe = mpi::initialize()
                .ok_or_else(|| MeshNumberingError::comm(0, "MPI is already initialized"))?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                world,
                rank,
                size,
                _universe: universe,
            })
        }
    }

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn barrier(&self) -> Result<(), MeshNumberingError> {
            self.world.barrier();
            Ok(())
        }

        fn allgather(&self, sendbuf: &[u8], recvbuf: &mut [u8]) -> Result<(), MeshNumberingError> {
            check_gather_len(sendbuf, recvbuf, self.size, self.rank)?;
            self.world.all_gather_into(sendbuf, recvbuf);
            Ok(())
        }

        fn broadcast(&self, root: usize, buf: &[u8]) -> Result<Vec<u8>, MeshNumberingError> {
            check_root(root, self.size)?;
            let root_process = self.world.process_at_rank(root as i32);
            let mut len = if self.rank == root { buf.len() as u64 } else { 0 };
            root_process.broadcast_into(&mut len);
            let mut out = if self.rank == root {
                buf.to_vec()
            } else {
                vec![0u8; len as usize]
            };
            root_process.broadcast_into(&mut out[..]);
            Ok(out)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
