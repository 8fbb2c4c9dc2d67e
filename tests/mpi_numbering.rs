#![cfg(feature = "mpi-support")]
//! cargo mpirun -n 2 --features mpi-support --test mpi_numbering

use mesh_numbering::prelude::*;

#[test]
fn mpi_two_rank_scenario() {
    let comm = MpiComm::new().expect("MPI init");
    if comm.size() != 2 {
        return;
    }

    let rows: &[([f64; 2], bool)] = if comm.rank() == 0 {
        &[([0.0, 0.0], false), ([1.0, 0.0], false), ([2.0, 0.0], false)]
    } else {
        &[([3.0, 0.0], false), ([1.0, 0.0], true), ([4.0, 0.0], false)]
    };
    let mut nodes = Entities::try_new(2).unwrap();
    for (xy, ghost) in rows {
        nodes.try_push(xy, *ghost).unwrap();
    }
    let mut mesh = Mesh::from_nodes(nodes);
    let config = NumberingConfig {
        debug: true,
        combined: true,
    };
    let report = GlobalNumbering::new(config)
        .execute(&mut mesh, &comm)
        .expect("numbering");

    assert_eq!(report.nodes.total, 5);
    if comm.rank() == 0 {
        assert_eq!(mesh.nodes.glb_idx(), &[0, 1, 2]);
        assert_eq!(mesh.nodes.rank(), &[0, 0, 0]);
    } else {
        assert_eq!(mesh.nodes.glb_idx(), &[3, 1, 4]);
        assert_eq!(mesh.nodes.rank(), &[1, 0, 1]);
    }
    comm.barrier().unwrap();
}
