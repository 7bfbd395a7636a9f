//! Integration tests for partition streaming.
//!
//! These build a small dataset with a well-formed index file and check that
//! the named partitions split it into disjoint pieces that cover every record.

use data_loader::partition::{self, count_partitions, validate_alignment};
use data_loader::{DataPaths, Partition, Rating, Result, stream_all_records, stream_partition};
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

fn create_test_setup() -> (TempDir, DataPaths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    fs::create_dir_all(&paths.data_dir).unwrap();

    let mut data = String::new();
    let mut index = String::new();
    // 53 records, codes cycling through all five partitions unevenly
    for i in 0..53u32 {
        data.push_str(&format!("{} {} {} {}\n", i / 7, i % 11, 2000 + i, 1 + i % 5));
        let code = match i % 9 {
            0..=3 => 1,
            4 => 2,
            5 => 3,
            6 | 7 => 4,
            _ => 5,
        };
        index.push_str(&format!("{}\n", code));
    }
    fs::write(&paths.all_data_file, data).unwrap();
    fs::write(&paths.all_index_file, index).unwrap();

    (dir, paths)
}

fn key(rating: &Rating) -> (u32, u32, u32) {
    (rating.user_id, rating.movie_id, rating.timestamp)
}

#[test]
fn test_partitions_are_a_disjoint_cover() {
    let (_dir, paths) = create_test_setup();

    let all: Vec<Rating> = stream_all_records(&paths.all_data_file)
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();

    let mut seen: HashMap<(u32, u32, u32), usize> = HashMap::new();
    for p in Partition::ALL {
        for record in stream_partition(&paths, p.code()).unwrap() {
            *seen.entry(key(&record.unwrap())).or_insert(0) += 1;
        }
    }

    assert_eq!(seen.len(), all.len());
    for record in &all {
        assert_eq!(seen.get(&key(record)), Some(&1), "record {:?}", record);
    }
}

#[test]
fn test_counts_agree_with_streams() {
    let (_dir, paths) = create_test_setup();

    let counts = count_partitions(&paths).unwrap();
    assert_eq!(counts.total, validate_alignment(&paths).unwrap());
    assert_eq!(counts.unassigned(), 0);

    let streamed = [
        (Partition::Base, partition::base_points(&paths).unwrap().count()),
        (Partition::Valid, partition::valid_points(&paths).unwrap().count()),
        (Partition::Hidden, partition::hidden_points(&paths).unwrap().count()),
        (Partition::Probe, partition::probe_points(&paths).unwrap().count()),
        (Partition::Qual, partition::qual_points(&paths).unwrap().count()),
    ];

    let mut sum = 0;
    for (p, n) in streamed {
        assert_eq!(counts.get(p), n, "partition {}", p);
        sum += n;
    }
    assert_eq!(sum, counts.total);
}

#[test]
fn test_streams_restart_from_the_top() {
    let (_dir, paths) = create_test_setup();

    let first: Vec<Rating> = partition::probe_points(&paths)
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    let second: Vec<Rating> = partition::probe_points(&paths)
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();

    assert!(!first.is_empty());
    assert_eq!(first, second);
}
