use mesh_numbering::prelude::*;

fn line(n: usize) -> Entities {
    let mut nodes = Entities::try_new(1).unwrap();
    for i in 0..n {
        nodes.try_push(&[i as f64 / n as f64], false).unwrap();
    }
    nodes
}

#[test]
fn single_rank_numbers_zero_to_n() {
    let mut mesh = Mesh::from_nodes(line(10));
    let report = GlobalNumbering::new(NumberingConfig::default())
        .execute(&mut mesh, &NoComm)
        .unwrap();
    assert_eq!(mesh.nodes.glb_idx(), &(0..10).collect::<Vec<u64>>()[..]);
    assert!(mesh.nodes.rank().iter().all(|&r| r == 0));
    assert_eq!(report.nodes.total, 10);
    assert_eq!(report.cells.unwrap().total, 0);
}

#[test]
fn single_rank_ignores_coordinate_order() {
    let mut nodes = Entities::try_new(2).unwrap();
    for xy in [[5.0, 5.0], [-1.0, 2.0], [0.0, 0.0]] {
        nodes.try_push(&xy, false).unwrap();
    }
    let mut mesh = Mesh::from_nodes(nodes);
    GlobalNumbering::new(NumberingConfig::default())
        .execute(&mut mesh, &NoComm)
        .unwrap();
    assert_eq!(mesh.nodes.glb_idx(), &[0, 1, 2]);
}

#[test]
fn collision_scenario_names_duplicate_index() {
    let mut nodes = Entities::try_new(2).unwrap();
    nodes.try_push(&[0.0, 0.0], false).unwrap();
    nodes.try_push(&[0.0, 0.0], false).unwrap();
    let mut mesh = Mesh::from_nodes(nodes);
    let config = NumberingConfig {
        debug: true,
        ..Default::default()
    };
    let err = GlobalNumbering::new(config)
        .execute(&mut mesh, &NoComm)
        .unwrap_err();
    assert!(matches!(err, MeshNumberingError::DuplicateEntity { index: 1, .. }));
    assert!(err.to_string().contains("entity 1 is duplicated"));
}

#[test]
fn hash_attribute_matches_hasher() {
    use mesh_numbering::algs::numbering::hash::hash_coordinates;
    let mut nodes = line(4);
    number_nodes(&mut nodes, false, &NoComm).unwrap();
    let hashes = nodes.fields().attribute(GLB_NODE_HASH).unwrap();
    for (row, &h) in nodes.coordinates().rows().zip(hashes) {
        assert_eq!(h, hash_coordinates(row));
    }
}

#[test]
fn invalid_connectivity_is_rejected_before_numbering() {
    let mut cells = Cells::default();
    cells.push(&[0, 7], false);
    let mut mesh = Mesh::new(line(3), cells);
    let err = GlobalNumbering::new(NumberingConfig::default())
        .execute(&mut mesh, &NoComm)
        .unwrap_err();
    assert!(matches!(
        err,
        MeshNumberingError::EntityIndexOutOfBounds { index: 7, len: 3 }
    ));
    assert!(!mesh.nodes.fields().is_numbered());
}

#[test]
fn flipping_an_owned_cell_to_ghost_drops_its_numbering() {
    let mut cells = Cells::default();
    cells.push(&[0, 1, 2], false);
    let mut mesh = Mesh::new(line(3), cells);
    let action = GlobalNumbering::new(NumberingConfig::default());
    action.execute(&mut mesh, &NoComm).unwrap();
    assert_eq!(mesh.nodes.glb_idx(), &[0, 1, 2]);
    assert_eq!(mesh.cells.glb_idx(), &[3]);

    mesh.cells.fields_mut().set_ghost(0, true).unwrap();
    assert!(!mesh.cells.fields().is_numbered());
    let err = action.execute(&mut mesh, &NoComm).unwrap_err();
    assert!(matches!(err, MeshNumberingError::UnresolvedEntity { index: 0 }));
    assert!(mesh.cells.glb_idx().is_empty());
    // nodes keep the numbering of the last successful pass
    assert_eq!(mesh.nodes.glb_idx(), &[0, 1, 2]);
}

/// Rank 0 of a two-rank world whose peer mirrors every contribution; one
/// collective kind can be made to fail.
struct FailingComm {
    fail_allgather: bool,
    fail_broadcast: bool,
}

impl Communicator for FailingComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        2
    }

    fn barrier(&self) -> Result<(), MeshNumberingError> {
        Ok(())
    }

    fn allgather(&self, sendbuf: &[u8], recvbuf: &mut [u8]) -> Result<(), MeshNumberingError> {
        if self.fail_allgather {
            return Err(MeshNumberingError::comm(1, "allgather interrupted"));
        }
        for chunk in recvbuf.chunks_exact_mut(sendbuf.len().max(1)) {
            chunk.copy_from_slice(&sendbuf[..chunk.len()]);
        }
        Ok(())
    }

    fn broadcast(&self, root: usize, buf: &[u8]) -> Result<Vec<u8>, MeshNumberingError> {
        if self.fail_broadcast {
            return Err(MeshNumberingError::comm(root, "broadcast interrupted"));
        }
        Ok(if root == 0 { buf.to_vec() } else { Vec::new() })
    }
}

#[test]
fn failed_allgather_is_a_fatal_comm_error() {
    let comm = FailingComm {
        fail_allgather: true,
        fail_broadcast: false,
    };
    let mut nodes = line(4);
    let err = number_nodes(&mut nodes, false, &comm).unwrap_err();
    assert!(matches!(err, MeshNumberingError::CommError { neighbor: 1, .. }));
    assert!(!nodes.fields().is_numbered());
    assert!(nodes.fields().attribute(GLB_NODE_HASH).is_none());
}

#[test]
fn failed_broadcast_is_a_fatal_comm_error() {
    let comm = FailingComm {
        fail_allgather: false,
        fail_broadcast: true,
    };
    let mut nodes = line(4);
    let err = number_nodes(&mut nodes, true, &comm).unwrap_err();
    assert!(matches!(err, MeshNumberingError::CommError { neighbor: 0, .. }));
    assert!(err.to_string().contains("rank 0"));
    assert!(!nodes.fields().is_numbered());
}
