#![cfg(test)]

use std::thread;

use num_complex::Complex64;

use super::communicator::{in_process_group, Communicator};

#[test]
fn serial_communicator_is_identity() {
    let comm = Communicator::serial();
    assert_eq!(comm.rank(), 0);
    assert_eq!(comm.size(), 1);
    assert!(comm.is_serial());
    assert_eq!(comm.sum(2.5_f64), 2.5);
    assert_eq!(comm.sum(7_usize), 7);
    assert_eq!(comm.sum(Complex64::new(1.0, -2.0)), Complex64::new(1.0, -2.0));
    assert_eq!(comm.squared_norm(&[3.0, 4.0]), 25.0);
    assert_eq!(comm.dot(&[1.0, 2.0], &[3.0, 4.0]), 11.0);
}

#[test]
fn in_process_group_sums_across_threads() {
    let comms = in_process_group(4);
    let handles: Vec<_> = comms
        .into_iter()
        .map(|comm| {
            thread::spawn(move || {
                let rank = comm.rank();
                let real = comm.sum(rank as f64 + 0.5);
                let int = comm.sum(rank as i64 - 1);
                let count = comm.sum(1_usize);
                (rank, comm.size(), real, int, count)
            })
        })
        .collect();
    let mut ranks = Vec::new();
    for handle in handles {
        let (rank, size, real, int, count) = handle.join().unwrap();
        ranks.push(rank);
        assert_eq!(size, 4);
        assert_eq!(real, 8.0);
        assert_eq!(int, 2);
        assert_eq!(count, 4);
    }
    ranks.sort_unstable();
    assert_eq!(ranks, vec![0, 1, 2, 3]);
}

#[test]
fn every_rank_receives_identical_bits() {
    let comms = in_process_group(3);
    let values = [0.1_f64, 0.2, 0.3];
    let handles: Vec<_> = comms
        .into_iter()
        .map(|comm| {
            let value = values[comm.rank()];
            thread::spawn(move || comm.sum(value).to_bits())
        })
        .collect();
    let bits: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(bits.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn any_flag_is_seen_by_every_rank() {
    assert!(Communicator::serial().any(true));
    assert!(!Communicator::serial().any(false));

    let handles: Vec<_> = in_process_group(3)
        .into_iter()
        .map(|comm| {
            thread::spawn(move || {
                let one_set = comm.any(comm.rank() == 2);
                let none_set = comm.any(false);
                (one_set, none_set)
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), (true, false));
    }
}
