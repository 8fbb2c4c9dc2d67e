// demos/number_two_ranks.rs
// cargo mpirun -n 2 --features mpi-support --example number_two_ranks
// Numbers a 1D line of 8 nodes split over two MPI ranks. Each rank owns half
// the nodes and holds the first node of its neighbour as a ghost. Each rank
// prints its local global ids and owners for manual inspection.

#[cfg(feature = "mpi-support")]
fn main() {
    use mesh_numbering::prelude::*;

    let comm = match MpiComm::new() {
        Ok(comm) => comm,
        Err(e) => {
            eprintln!("MPI init failed: {e}");
            return;
        }
    };
    let (rank, size) = (comm.rank(), comm.size());
    if size != 2 {
        if rank == 0 {
            eprintln!("Run with exactly 2 MPI ranks");
        }
        return;
    }

    // rank 0 owns x = 0..4 and ghosts x = 4; rank 1 owns x = 4..8 and ghosts x = 3
    let owned = if rank == 0 { 0..4 } else { 4..8 };
    let ghost = if rank == 0 { 4 } else { 3 };
    let mut nodes = Entities::try_new(1).expect("dimension");
    for x in owned {
        nodes.try_push(&[x as f64], false).expect("push");
    }
    nodes.try_push(&[ghost as f64], true).expect("push");

    let mut mesh = Mesh::from_nodes(nodes);
    let config = NumberingConfig {
        debug: true,
        combined: false,
    };
    match GlobalNumbering::nodes_only(config).execute(&mut mesh, &comm) {
        Ok(report) => {
            println!("[rank {rank}] {report:?}");
            println!("[rank {rank}] glb_idx: {:?}", mesh.nodes.glb_idx());
            println!("[rank {rank}] owners:  {:?}", mesh.nodes.rank());
        }
        Err(e) => eprintln!("[rank {rank}] numbering failed: {e}"),
    }
}

#[cfg(not(feature = "mpi-support"))]
fn main() {
    eprintln!("This demo requires the `mpi-support` feature");
}
