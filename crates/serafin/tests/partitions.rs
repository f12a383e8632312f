//! Integration tests for domain-decomposed result sets

mod common;

use common::{grid_header, value, write_file};

use slftools_serafin::{partition_file_name, Encoding, Error, SerafinOptions};

#[test]
fn partitions_open_from_the_base_name() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("T2DRES");
    let times = [0.0, 1.0, 2.0];

    // partitions of different sizes, written out of order
    for (index, nx) in [(1, 5), (0, 3)] {
        let header = grid_header(nx, 2);
        write_file(
            &partition_file_name(&base, 2, index),
            &header,
            Encoding::default(),
            &times,
        );
    }

    let mut slf = SerafinOptions::new().parallel(true).open(&base).unwrap();
    assert!(slf.is_parallel());
    assert_eq!(slf.partitions().len(), 2);
    assert_eq!(slf.header().npoin, 6);
    assert_eq!(slf.partition(1).unwrap().header.npoin, 10);
    assert_eq!(slf.time_values().unwrap(), times);

    let frame = slf.read_partition(1, 2.0, &[]).unwrap();
    assert_eq!(frame.values[0].len(), 10);
    assert_eq!(frame.values[2][9], value(2, 2, 9));

    // appending is limited to single files
    let values = vec![vec![0.0; 6]; 3];
    assert!(matches!(slf.append_frame(3.0, &values), Err(Error::ReadOnly)));
}

#[test]
fn missing_partitions() {
    let dir = tempfile::tempdir().unwrap();
    let result = SerafinOptions::new()
        .parallel(true)
        .open(dir.path().join("T2DRES"));
    assert!(matches!(result, Err(Error::PartitionsNotFound(_))));
}
