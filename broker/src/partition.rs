use xxhash_rust::xxh64::xxh64;

/// Stream holding partition `partition` of `topic`.
pub fn stream_name(topic: &str, partition: u32) -> String {
    format!("{}:{}", topic, partition)
}

/// Every partition stream of `topic`, in partition order.
pub fn stream_names(topic: &str, partitions: u32) -> Vec<String> {
    (0..partitions.max(1)).map(|p| stream_name(topic, p)).collect()
}

/// Stable partition for a message key.
pub fn partition_for(key: &[u8], partitions: u32) -> u32 {
    if partitions <= 1 {
        return 0;
    }
    (xxh64(key, 0) % u64::from(partitions)) as u32
}
